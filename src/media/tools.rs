//! ffmpeg / ffprobe executable resolution.
//!
//! Resolution order:
//! 1. `VIDMARK_FFMPEG_PATH` / `VIDMARK_FFPROBE_PATH` when they point at an
//!    existing file
//! 2. The bare tool name, looked up on `PATH` when spawned

use super::MediaError;
use std::env;
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub const FFMPEG_ENV: &str = "VIDMARK_FFMPEG_PATH";
pub const FFPROBE_ENV: &str = "VIDMARK_FFPROBE_PATH";

fn resolve_tool(env_key: &str, default_name: &str) -> PathBuf {
    if let Ok(value) = env::var(env_key) {
        let path = PathBuf::from(&value);
        if path.is_file() {
            return path;
        }
        tracing::warn!(
            variable = env_key,
            value = %value,
            "Tool override does not point at a file, falling back to PATH"
        );
    }

    PathBuf::from(default_name)
}

pub fn ffmpeg_path() -> PathBuf {
    resolve_tool(FFMPEG_ENV, "ffmpeg")
}

pub fn ffprobe_path() -> PathBuf {
    resolve_tool(FFPROBE_ENV, "ffprobe")
}

/// Whether `<path> -version` runs successfully.
pub fn is_tool_available(path: &std::path::Path) -> bool {
    Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Check that both ffmpeg and ffprobe can be run.
pub fn check_tools() -> Result<(), MediaError> {
    let ffprobe = ffprobe_path();
    if !is_tool_available(&ffprobe) {
        return Err(MediaError::ToolNotFound {
            tool: "ffprobe",
            path: ffprobe,
        });
    }

    let ffmpeg = ffmpeg_path();
    if !is_tool_available(&ffmpeg) {
        return Err(MediaError::ToolNotFound {
            tool: "ffmpeg",
            path: ffmpeg,
        });
    }

    Ok(())
}
