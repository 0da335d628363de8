use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

use super::process::{CommandRunner, RunLimits, ToolInvocation};
use super::profile::QualityProfile;

pub const SUB_PLAYLIST: &str = "playlist.m3u8";
/// Zero-padded so segment names are deterministic and sort correctly.
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

#[derive(Debug, PartialEq, Eq)]
pub enum EncodeOutcome {
    Success,
    Failed,
    TimedOut,
}

/// Encode `input` into one segmented HLS rendition under `out_dir`.
///
/// Each quality gets its own invocation and its own directory; nothing is
/// shared between renditions. Tool-level failure is reported as a value,
/// with the captured stderr logged for diagnosis.
pub async fn encode_quality<R: CommandRunner>(
    runner: &R,
    ffmpeg_bin: &str,
    input: &Path,
    out_dir: &Path,
    profile: &QualityProfile,
    segment_duration: u32,
    limits: RunLimits,
) -> io::Result<EncodeOutcome> {
    fs::create_dir_all(out_dir).await?;

    let playlist = out_dir.join(SUB_PLAYLIST);
    let segments = out_dir.join(SEGMENT_PATTERN);

    let invocation = ToolInvocation::new(ffmpeg_bin)
        .arg("-i")
        .arg(input.to_string_lossy())
        .arg("-c:a")
        .arg("aac")
        .arg("-b:a")
        .arg(profile.bitrate)
        .arg("-ar")
        .arg(profile.sample_rate.to_string())
        .arg("-f")
        .arg("hls")
        .arg("-hls_time")
        .arg(segment_duration.to_string())
        .arg("-hls_playlist_type")
        .arg("vod")
        .arg("-hls_segment_filename")
        .arg(segments.to_string_lossy())
        .arg("-y")
        .arg(playlist.to_string_lossy());

    let output = runner.run(&invocation, limits).await?;

    if output.timed_out {
        error!(quality = profile.name, "ffmpeg killed after exceeding time limit");
        return Ok(EncodeOutcome::TimedOut);
    }

    if !output.success() {
        error!(
            quality = profile.name,
            "ffmpeg exited with {:?}: {}",
            output.code,
            output.stderr_lossy()
        );
        return Ok(EncodeOutcome::Failed);
    }

    info!(quality = profile.name, "created HLS rendition in {}", out_dir.display());
    Ok(EncodeOutcome::Success)
}

/// Re-encode the original as a single 320k AAC file next to the renditions,
/// kept as a download/archival copy of the upload.
pub async fn encode_archive_copy<R: CommandRunner>(
    runner: &R,
    ffmpeg_bin: &str,
    input: &Path,
    output: &Path,
    limits: RunLimits,
) -> io::Result<EncodeOutcome> {
    let invocation = ToolInvocation::new(ffmpeg_bin)
        .arg("-i")
        .arg(input.to_string_lossy())
        .arg("-c:a")
        .arg("aac")
        .arg("-b:a")
        .arg("320k")
        .arg("-y")
        .arg(output.to_string_lossy());

    let result = runner.run(&invocation, limits).await?;

    if result.timed_out {
        error!("archive copy killed after exceeding time limit");
        return Ok(EncodeOutcome::TimedOut);
    }

    if !result.success() {
        error!("archive copy failed with {:?}: {}", result.code, result.stderr_lossy());
        return Ok(EncodeOutcome::Failed);
    }

    Ok(EncodeOutcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::process::ToolOutput;
    use super::super::profile::QUALITY_PROFILES;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Pretends to be ffmpeg: records the invocation and writes the
    /// playlist plus one segment where the arguments point.
    struct FakeFfmpeg {
        invocations: Mutex<Vec<ToolInvocation>>,
        exit_code: i32,
    }

    impl FakeFfmpeg {
        fn new(exit_code: i32) -> Self {
            Self { invocations: Mutex::new(Vec::new()), exit_code }
        }
    }

    impl CommandRunner for FakeFfmpeg {
        async fn run(&self, invocation: &ToolInvocation, _: RunLimits) -> io::Result<ToolOutput> {
            self.invocations.lock().unwrap().push(invocation.clone());

            if self.exit_code == 0 {
                let playlist = invocation.args.last().unwrap();
                std::fs::write(playlist, "#EXTM3U\n")?;
                if let Some(pos) = invocation.args.iter().position(|a| a == "-hls_segment_filename") {
                    let segment = invocation.args[pos + 1].replace("%03d", "000");
                    std::fs::write(segment, b"ts-data")?;
                }
            }

            Ok(ToolOutput {
                code: Some(self.exit_code),
                stdout: Vec::new(),
                stderr: b"fake stderr".to_vec(),
                timed_out: false,
            })
        }
    }

    fn limits() -> RunLimits {
        RunLimits::new(Duration::from_secs(5), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn successful_encode_produces_playlist_and_segment() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("high");
        let runner = FakeFfmpeg::new(0);

        let outcome = encode_quality(
            &runner,
            "ffmpeg",
            Path::new("input.mp3"),
            &out_dir,
            &QUALITY_PROFILES[0],
            10,
            limits(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, EncodeOutcome::Success);
        assert!(out_dir.join(SUB_PLAYLIST).exists());
        assert!(out_dir.join("segment_000.ts").exists());

        let invocations = runner.invocations.lock().unwrap();
        let args = &invocations[0].args;
        assert!(args.windows(2).any(|w| w == ["-b:a", "320k"]));
        assert!(args.windows(2).any(|w| w == ["-ar", "48000"]));
        assert!(args.windows(2).any(|w| w == ["-hls_playlist_type", "vod"]));
    }

    #[tokio::test]
    async fn tool_failure_is_reported_not_thrown() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("low");
        let runner = FakeFfmpeg::new(1);

        let outcome = encode_quality(
            &runner,
            "ffmpeg",
            Path::new("input.mp3"),
            &out_dir,
            &QUALITY_PROFILES[2],
            10,
            limits(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, EncodeOutcome::Failed);
        assert!(!out_dir.join(SUB_PLAYLIST).exists());
    }
}
