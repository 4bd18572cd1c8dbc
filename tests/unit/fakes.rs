// In-memory media backend for exercising the batch pipeline without ffmpeg.
//
// A "video" is a text file reading `fake-video <W>x<H> <seconds> <fps>`.
// Anything else fails to probe, like a corrupt container would.

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use vidmark::media::{
    Decoder, Encoder, EncoderSettings, FrameRate, MediaBackend, MediaError, VideoInfo,
};

pub const BACKGROUND: Rgba<u8> = Rgba([40, 40, 40, 255]);

/// Write a fake video file.
pub fn write_fake_video(
    dir: &Path,
    name: impl AsRef<Path>,
    width: u32,
    height: u32,
    secs: u32,
    fps: u32,
) {
    let body = format!("fake-video {}x{} {} {}", width, height, secs, fps);
    std::fs::write(dir.join(name), body).unwrap();
}

fn parse_fake_video(text: &str) -> Option<VideoInfo> {
    let mut parts = text.split_whitespace();
    if parts.next()? != "fake-video" {
        return None;
    }
    let (w, h) = parts.next()?.split_once('x')?;
    let secs: u32 = parts.next()?.parse().ok()?;
    let fps: u32 = parts.next()?.parse().ok()?;

    Some(VideoInfo {
        width: w.parse().ok()?,
        height: h.parse().ok()?,
        duration_secs: secs as f64,
        frame_rate: FrameRate::new(fps, 1),
        has_audio: false,
    })
}

/// What an encoder received.
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub output: PathBuf,
    pub source: PathBuf,
    pub frames: u64,
    pub settings: EncoderSettings,
    /// Bounding box `(min_x, min_y, max_x, max_y)` of pixels differing from
    /// the background in the first frame.
    pub changed_region: Option<(u32, u32, u32, u32)>,
    pub finished: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeMedia {
    pub encoded: Arc<Mutex<Vec<EncodedVideo>>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoded(&self) -> Vec<EncodedVideo> {
        self.encoded.lock().unwrap().clone()
    }
}

impl MediaBackend for FakeMedia {
    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>, MediaError> {
        let text = std::fs::read_to_string(path).unwrap_or_default();
        let info = parse_fake_video(&text)
            .ok_or_else(|| MediaError::Probe(format!("{} is not a video", path.display())))?;
        let remaining = (info.duration_secs as u64) * info.frame_rate.num as u64;

        Ok(Box::new(FakeDecoder { info, remaining }))
    }

    fn create(
        &self,
        output: &Path,
        source: &Path,
        _info: &VideoInfo,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn Encoder>, MediaError> {
        std::fs::write(output, b"encoding")?;

        let index = {
            let mut encoded = self.encoded.lock().unwrap();
            encoded.push(EncodedVideo {
                output: output.to_path_buf(),
                source: source.to_path_buf(),
                frames: 0,
                settings: settings.clone(),
                changed_region: None,
                finished: false,
            });
            encoded.len() - 1
        };

        Ok(Box::new(FakeEncoder {
            index,
            log: Arc::clone(&self.encoded),
        }))
    }
}

struct FakeDecoder {
    info: VideoInfo,
    remaining: u64,
}

impl Decoder for FakeDecoder {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbaImage>, MediaError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(RgbaImage::from_pixel(
            self.info.width,
            self.info.height,
            BACKGROUND,
        )))
    }
}

struct FakeEncoder {
    index: usize,
    log: Arc<Mutex<Vec<EncodedVideo>>>,
}

fn changed_region(frame: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut region: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in frame.enumerate_pixels() {
        if *pixel == BACKGROUND {
            continue;
        }
        region = Some(match region {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    region
}

impl Encoder for FakeEncoder {
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<(), MediaError> {
        let mut log = self.log.lock().unwrap();
        let entry = &mut log[self.index];
        if entry.frames == 0 {
            entry.changed_region = changed_region(frame);
        }
        entry.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), MediaError> {
        let mut log = self.log.lock().unwrap();
        let entry = &mut log[self.index];
        entry.finished = true;
        std::fs::write(&entry.output, format!("encoded {} frames", entry.frames))?;
        Ok(())
    }
}

#[test]
fn test_parse_fake_video() {
    let info = parse_fake_video("fake-video 640x360 3 24").unwrap();
    assert_eq!((info.width, info.height), (640, 360));
    assert_eq!(info.frame_rate, FrameRate::new(24, 1));
    assert!(parse_fake_video("garbage").is_none());
}
