//! Video stream inspection with `ffprobe -print_format json`.

use super::tools::ffprobe_path;
use super::{FrameRate, MediaError, VideoInfo};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    tags: Option<ProbeTags>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy
    /// `rotate` tag.
    fn rotation(&self) -> i64 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .map(|r| r.round() as i64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Run ffprobe on a file.
pub fn probe(path: &Path) -> Result<VideoInfo, MediaError> {
    let ffprobe = ffprobe_path();
    let output = Command::new(&ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::ToolNotFound {
                tool: "ffprobe",
                path: ffprobe.clone(),
            },
            _ => MediaError::Probe(format!("Failed to run ffprobe: {}", e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::Probe(format!(
            "ffprobe rejected {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

/// Extract [`VideoInfo`] from ffprobe's JSON output.
pub fn parse_probe_output(json: &[u8]) -> Result<VideoInfo, MediaError> {
    let parsed: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| MediaError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::Probe("No video stream found".to_string()))?;

    let (coded_width, coded_height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MediaError::Probe(
                "Video stream has no frame size".to_string(),
            ))
        }
    };

    // ffmpeg autorotates while decoding, so frames arrive at display size
    let rotation = video.rotation();
    let (width, height) = if rotation.rem_euclid(180) == 90 {
        (coded_height, coded_width)
    } else {
        (coded_width, coded_height)
    };

    let frame_rate = guess_frame_rate(
        video.r_frame_rate.as_deref().and_then(parse_frame_rate),
        video.avg_frame_rate.as_deref().and_then(parse_frame_rate),
    )
    .unwrap_or_else(|| {
        tracing::warn!("Frame rate unknown, assuming 30 fps");
        FrameRate::new(30, 1)
    });

    let duration_secs = video
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoInfo {
        width,
        height,
        duration_secs,
        frame_rate,
        has_audio,
    })
}

/// Pick the rate ffmpeg decodes at: the base rate, unless it is a container
/// timebase (above 210) while the average is a plausible frame rate (below 70).
fn guess_frame_rate(base: Option<FrameRate>, average: Option<FrameRate>) -> Option<FrameRate> {
    match (base, average) {
        (Some(base), Some(average)) if base.as_f64() > 210.0 && average.as_f64() < 70.0 => {
            Some(average)
        }
        (base, average) => base.or(average),
    }
}

/// Parse a rate such as `30000/1001` or `25`.
fn parse_frame_rate(rate: &str) -> Option<FrameRate> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.trim().parse().ok()?, den.trim().parse().ok()?),
        None => (rate.trim().parse().ok()?, 1),
    };

    if num == 0 || den == 0 {
        return None;
    }
    Some(FrameRate::new(num, den))
}
