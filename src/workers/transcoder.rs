use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use std::time::Duration;
use tracing::{error, info};

use crate::infrastructure::queue::rabbitmq::TRANSCODE_QUEUE;
use crate::modules::catalog::repository::TrackRepository;
use crate::modules::pipeline::job::{PgJobStore, TranscodeJob};
use crate::modules::pipeline::process::SystemRunner;
use crate::modules::pipeline::Pipeline;
use crate::state::AppState;

pub async fn start_transcoder_worker(state: AppState) {
    info!("Starting transcoder worker...");

    let channel = state.queue.get_channel().await;
    let channel_guard = channel.lock().await;

    let _queue = channel_guard
        .queue_declare(
            TRANSCODE_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .expect("Failed to declare queue");

    let mut consumer = channel_guard
        .basic_consume(
            TRANSCODE_QUEUE,
            "transcoder_worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .expect("Failed to create consumer");

    drop(channel_guard);

    info!("Transcoder worker listening on '{}'", TRANSCODE_QUEUE);

    // Jobs are handled one at a time; a single ffmpeg already saturates
    // its share of the CPU, and jobs for different tracks never contend
    // on paths anyway.
    while let Some(delivery) = consumer.next().await {
        if let Ok(delivery) = delivery {
            match serde_json::from_slice::<TranscodeJob>(&delivery.data) {
                Ok(job) => handle_job(&state, job).await,
                Err(e) => error!("Failed to parse job payload: {}", e),
            }

            if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                error!("Failed to ack message: {}", e);
            }
        }
    }
}

async fn handle_job(state: &AppState, job: TranscodeJob) {
    info!("Received transcoding job for track {} (attempt {})", job.track_id, job.attempt);

    let jobs = PgJobStore::new(state.db.clone());
    if let Err(e) = jobs.ensure_job(job.track_id).await {
        error!("Could not record job for {}: {}", job.track_id, e);
    }

    let track = match TrackRepository::get_by_id(&state.db, job.track_id).await {
        Ok(Some(track)) => track,
        Ok(None) => {
            error!("Track not found: {}", job.track_id);
            return;
        }
        Err(e) => {
            error!("Could not load track {}: {}", job.track_id, e);
            return;
        }
    };

    if let Err(e) = jobs.mark_started(job.track_id, job.attempt + 1).await {
        error!("Could not mark job started for {}: {}", job.track_id, e);
    }
    if let Err(e) = TrackRepository::mark_processing(&state.db, track.id).await {
        error!("Could not mark track {} processing: {}", track.id, e);
    }

    let runner = SystemRunner;
    let pipeline = Pipeline::new(&state.config, &state.storage, &runner);

    match pipeline.run(&track, &jobs).await {
        Ok(outcome) => {
            if let Err(e) = jobs.record_success(track.id).await {
                error!("Could not record job success for {}: {}", track.id, e);
            }
            if let Err(e) = TrackRepository::mark_approved(
                &state.db,
                track.id,
                &outcome.manifest_key,
                outcome.duration_secs,
            )
            .await
            {
                error!("Could not approve track {}: {}", track.id, e);
            }
            info!(
                "Job completed for track {}: {} ({:?})",
                track.id, outcome.manifest_key, outcome.qualities
            );
        }
        Err(err) => {
            error!("Processing failed for track {}: {}", track.id, err);

            if let Err(e) = pipeline.quarantine_failure(&track, &err.to_string()).await {
                error!("Quarantine failed for track {}: {}", track.id, e);
            }
            if let Err(e) = jobs.record_failure(track.id, &err.to_string()).await {
                error!("Could not record job failure for {}: {}", track.id, e);
            }
            let notes = format!("Processing failed: {}", err);
            if let Err(e) = TrackRepository::mark_rejected(&state.db, track.id, &notes).await {
                error!("Could not reject track {}: {}", track.id, e);
            }

            if !err.is_retryable() {
                info!("Not retrying track {}: {}", track.id, err);
                return;
            }

            let next = job.next_attempt();
            if next.attempt >= state.config.max_attempts {
                error!(
                    "Track {} permanently failed after {} attempts; flagged for manual review",
                    track.id, next.attempt
                );
                return;
            }

            schedule_retry(state, next);
        }
    }
}

/// Republish the job after an exponential backoff delay without blocking
/// the consumer loop.
fn schedule_retry(state: &AppState, job: TranscodeJob) {
    let delay = backoff_delay(state.config.retry_base_secs, job.attempt);
    info!(
        "Scheduling retry #{} for track {} in {:?}",
        job.attempt, job.track_id, delay
    );

    let queue = state.queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match serde_json::to_vec(&job) {
            Ok(payload) => {
                if let Err(e) = queue.publish(TRANSCODE_QUEUE, &payload).await {
                    error!("Failed to republish job for {}: {}", job.track_id, e);
                }
            }
            Err(e) => error!("Failed to serialize retry job: {}", e),
        }
    });
}

fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    // attempt is 1-based here; doubling is capped to keep delays sane.
    let exponent = attempt.saturating_sub(1).min(6);
    Duration::from_secs(base_secs.saturating_mul(1 << exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(60, 1), Duration::from_secs(60));
        assert_eq!(backoff_delay(60, 2), Duration::from_secs(120));
        assert_eq!(backoff_delay(60, 3), Duration::from_secs(240));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_delay(60, 50), Duration::from_secs(60 * 64));
    }
}
