use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use super::process::{CommandRunner, RunLimits, ToolInvocation};

/// Technical attributes probed from the raw upload.
///
/// All fields default to zero/empty: probing is best-effort and a track is
/// never rejected just because ffprobe could not describe it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AudioMetadata {
    pub duration: f64,
    pub bitrate: u64,
    pub sample_rate: u32,
    pub channels: u32,
    pub codec: String,
    pub format: String,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize, Default)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    format_name: Option<String>,
}

#[derive(Deserialize, Default)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

/// Run ffprobe against `input` and parse its JSON report.
///
/// Tool failure, missing file or unparsable output all degrade to
/// `AudioMetadata::default()`.
pub async fn probe_audio<R: CommandRunner>(
    runner: &R,
    ffprobe_bin: &str,
    input: &Path,
    limits: RunLimits,
) -> AudioMetadata {
    let invocation = ToolInvocation::new(ffprobe_bin)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(input.to_string_lossy());

    let output = match runner.run(&invocation, limits).await {
        Ok(output) => output,
        Err(e) => {
            warn!("ffprobe could not be invoked: {}; proceeding without metadata", e);
            return AudioMetadata::default();
        }
    };

    if !output.success() {
        warn!(
            "ffprobe exited with {:?}; proceeding without metadata: {}",
            output.code,
            output.stderr_lossy()
        );
        return AudioMetadata::default();
    }

    match parse_probe_json(&output.stdout) {
        Some(metadata) => metadata,
        None => {
            warn!("ffprobe produced unparsable output; proceeding without metadata");
            AudioMetadata::default()
        }
    }
}

fn parse_probe_json(data: &[u8]) -> Option<AudioMetadata> {
    let probe: ProbeOutput = serde_json::from_slice(data).ok()?;

    let audio_stream = probe
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .unwrap_or_default();

    Some(AudioMetadata {
        duration: probe
            .format
            .duration
            .and_then(|d| d.parse().ok())
            .unwrap_or_default(),
        bitrate: probe
            .format
            .bit_rate
            .and_then(|b| b.parse().ok())
            .unwrap_or_default(),
        sample_rate: audio_stream
            .sample_rate
            .and_then(|r| r.parse().ok())
            .unwrap_or_default(),
        channels: audio_stream.channels.unwrap_or_default(),
        codec: audio_stream.codec_name.unwrap_or_default(),
        format: probe.format.format_name.unwrap_or_default(),
    })
}
