//! ffmpeg-backed decoding and encoding.
//!
//! Frames travel as raw RGBA over the child processes' stdout (decoder) and
//! stdin (encoder). Both handles own their child process and kill and reap it
//! on drop, so an abandoned job never leaves ffmpeg running.

use super::probe::probe;
use super::tools::ffmpeg_path;
use super::{Decoder, Encoder, EncoderSettings, MediaBackend, MediaError, VideoInfo};
use image::RgbaImage;
use std::ffi::OsString;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

/// [`MediaBackend`] running the ffmpeg and ffprobe executables.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self {
            ffmpeg: ffmpeg_path(),
        }
    }

    fn spawn(&self, args: Vec<OsString>, stdin: Stdio, stdout: Stdio) -> Result<Child, MediaError> {
        Command::new(&self.ffmpeg)
            .args(args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => MediaError::ToolNotFound {
                    tool: "ffmpeg",
                    path: self.ffmpeg.clone(),
                },
                _ => MediaError::Io(e),
            })
    }
}

impl MediaBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>, MediaError> {
        let info = probe(path)?;
        tracing::debug!(
            source = %path.display(),
            width = info.width,
            height = info.height,
            duration_secs = info.duration_secs,
            frame_rate = %info.frame_rate,
            has_audio = info.has_audio,
            "Opening video"
        );

        let args = decode_args(path, &info);
        let mut child = self.spawn(args, Stdio::null(), Stdio::piped())?;
        let stderr = collect_stderr(&mut child);
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut child);
                return Err(MediaError::Decode("ffmpeg stdout was not captured".to_string()));
            }
        };

        Ok(Box::new(FfmpegDecoder {
            info,
            source: path.to_path_buf(),
            child,
            stdout,
            stderr,
            done: false,
        }))
    }

    fn create(
        &self,
        output: &Path,
        source: &Path,
        info: &VideoInfo,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn Encoder>, MediaError> {
        let args = encode_args(output, source, info, settings);
        let mut child = self.spawn(args, Stdio::piped(), Stdio::null())?;
        let stderr = collect_stderr(&mut child);
        let stdin = child.stdin.take();
        if stdin.is_none() {
            reap(&mut child);
            return Err(MediaError::Encode("ffmpeg stdin was not captured".to_string()));
        }

        Ok(Box::new(FfmpegEncoder {
            output: output.to_path_buf(),
            frame_dims: (info.width, info.height),
            child,
            stdin,
            stderr,
            done: false,
        }))
    }
}

/// Arguments decoding `source` to raw RGBA on stdout.
///
/// Frames are rotated to display orientation and emitted at the probed
/// constant rate, matching the size and rate the encoder is given.
pub fn decode_args(source: &Path, info: &VideoInfo) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-nostdin", "-loglevel", "error", "-autorotate", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(source.as_os_str().to_owned());
    args.push("-map".into());
    args.push("0:v:0".into());
    args.push("-r".into());
    args.push(info.frame_rate.to_string().into());
    args.extend(
        ["-f", "rawvideo", "-pix_fmt", "rgba", "-"]
            .iter()
            .map(OsString::from),
    );
    args
}

/// Video and audio codecs for an output container.
///
/// WebM cannot hold H.264 or AAC, so the defaults switch to VP9 and Opus
/// there. Explicitly configured codecs are kept as given.
pub fn codecs_for(output: &Path, settings: &EncoderSettings) -> (String, String) {
    let is_webm = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("webm"))
        .unwrap_or(false);

    let defaults = EncoderSettings::default();
    if is_webm {
        let video = if settings.video_codec == defaults.video_codec {
            "libvpx-vp9".to_string()
        } else {
            settings.video_codec.clone()
        };
        let audio = if settings.audio_codec == defaults.audio_codec {
            "libopus".to_string()
        } else {
            settings.audio_codec.clone()
        };
        return (video, audio);
    }

    (settings.video_codec.clone(), settings.audio_codec.clone())
}

/// Arguments encoding raw RGBA frames from stdin to `output`, taking audio
/// from `source`.
pub fn encode_args(
    output: &Path,
    source: &Path,
    info: &VideoInfo,
    settings: &EncoderSettings,
) -> Vec<OsString> {
    let (video_codec, audio_codec) = codecs_for(output, settings);

    let base: Vec<String> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", info.width, info.height),
        "-r".into(),
        info.frame_rate.to_string(),
        "-i".into(),
        "-".into(),
    ];

    let mut args: Vec<OsString> = base.into_iter().map(OsString::from).collect();
    if info.has_audio {
        args.push("-i".into());
        args.push(source.as_os_str().to_owned());
    }

    args.push("-map".into());
    args.push("0:v:0".into());
    if info.has_audio {
        args.push("-map".into());
        args.push("1:a:0?".into());
    }

    // yuv420p needs even dimensions
    if info.width % 2 != 0 || info.height % 2 != 0 {
        args.push("-vf".into());
        args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".into());
    }

    args.push("-c:v".into());
    args.push(video_codec.into());
    args.push("-pix_fmt".into());
    args.push("yuv420p".into());

    if info.has_audio {
        args.push("-c:a".into());
        args.push(audio_codec.into());
        args.push("-shortest".into());
    }

    args.push("-threads".into());
    args.push(settings.threads.max(1).to_string().into());
    args.push(output.as_os_str().to_owned());
    args
}

/// Drain a child's stderr on a background thread.
fn collect_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut text = String::new();
        let _ = stderr.read_to_string(&mut text);
        text
    }))
}

fn stderr_text(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn reap(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Read until `buf` is full or the stream ends. Returns bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Frames decoded by an ffmpeg child process.
pub struct FfmpegDecoder {
    info: VideoInfo,
    source: PathBuf,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    done: bool,
}

impl FfmpegDecoder {
    fn end_of_stream(&mut self) -> Result<(), MediaError> {
        self.done = true;
        let status = self.child.wait()?;
        if !status.success() {
            return Err(MediaError::Decode(format!(
                "ffmpeg exited with {} while decoding {}: {}",
                status,
                self.source.display(),
                stderr_text(self.stderr.take())
            )));
        }
        Ok(())
    }
}

impl Decoder for FfmpegDecoder {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbaImage>, MediaError> {
        if self.done {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.info.frame_len()];
        let filled = read_full(&mut self.stdout, &mut buffer)?;

        if filled == 0 {
            self.end_of_stream()?;
            return Ok(None);
        }
        if filled < buffer.len() {
            self.end_of_stream()?;
            return Err(MediaError::Decode(format!(
                "Truncated frame from {} ({} of {} bytes)",
                self.source.display(),
                filled,
                buffer.len()
            )));
        }

        RgbaImage::from_raw(self.info.width, self.info.height, buffer)
            .map(Some)
            .ok_or_else(|| MediaError::Decode("Frame buffer has the wrong size".to_string()))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        reap(&mut self.child);
    }
}

/// Frames encoded by an ffmpeg child process.
pub struct FfmpegEncoder {
    output: PathBuf,
    frame_dims: (u32, u32),
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    done: bool,
}

impl Encoder for FfmpegEncoder {
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<(), MediaError> {
        if frame.dimensions() != self.frame_dims {
            return Err(MediaError::Encode(format!(
                "Frame is {:?}, encoder expects {:?}",
                frame.dimensions(),
                self.frame_dims
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::Encode("Encoder input already closed".to_string()))?;

        stdin.write_all(frame.as_raw()).map_err(|e| match e.kind() {
            ErrorKind::BrokenPipe => MediaError::Encode(format!(
                "ffmpeg stopped accepting frames for {}",
                self.output.display()
            )),
            _ => MediaError::Io(e),
        })
    }

    fn finish(mut self: Box<Self>) -> Result<(), MediaError> {
        // Closing stdin signals end of input
        drop(self.stdin.take());
        let status = self.child.wait()?;
        self.done = true;

        if !status.success() {
            return Err(MediaError::Encode(format!(
                "ffmpeg exited with {} while writing {}: {}",
                status,
                self.output.display(),
                stderr_text(self.stderr.take())
            )));
        }

        tracing::debug!(output = %self.output.display(), "Encoder finished");
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if !self.done {
            drop(self.stdin.take());
            reap(&mut self.child);
        }
    }
}
