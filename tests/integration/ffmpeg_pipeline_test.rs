// End-to-end watermarking through real ffmpeg / ffprobe processes

use std::path::Path;
use std::process::Command;
use vidmark::config::{Config, LoggingConfig};
use vidmark::media::probe::probe;
use vidmark::media::tools::{check_tools, ffmpeg_path};
use vidmark::media::{FfmpegBackend, MediaBackend};
use vidmark::watermark::Anchor;
use vidmark::Watermarker;

/// Generate a test pattern clip, optionally with a sine tone.
fn generate_clip(path: &Path, size: &str, secs: u32, with_audio: bool) {
    let mut cmd = Command::new(ffmpeg_path());
    cmd.args(["-y", "-loglevel", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={}:rate=10:duration={}", size, secs));
    if with_audio {
        cmd.args(["-f", "lavfi", "-i"])
            .arg(format!("sine=frequency=440:duration={}", secs))
            .args(["-c:a", "aac"]);
    }
    cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]).arg(path);

    let status = cmd.status().expect("Failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not generate {}", path.display());
}

fn config(input: &Path, output: &Path) -> Config {
    Config {
        output_dir: Some(output.to_path_buf()),
        logging: LoggingConfig {
            to_file: false,
            ..Default::default()
        },
        ..Config::for_input(input)
    }
}

#[test]
#[ignore] // Requires ffmpeg and ffprobe on PATH
fn test_tools_are_available() {
    check_tools().expect("ffmpeg and ffprobe should be runnable");
}

#[test]
#[ignore] // Requires ffmpeg and ffprobe on PATH
fn test_probe_generated_clip() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");
    generate_clip(&clip, "320x240", 2, true);

    let info = probe(&clip).unwrap();
    assert_eq!((info.width, info.height), (320, 240));
    assert!(info.has_audio);
    assert!((info.duration_secs - 2.0).abs() < 0.2);
}

#[test]
#[ignore] // Requires ffmpeg and ffprobe on PATH
fn test_decoder_yields_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");
    generate_clip(&clip, "160x120", 1, false);

    let mut decoder = FfmpegBackend::new().open(&clip).unwrap();
    let mut frames = 0;
    while let Some(frame) = decoder.next_frame().unwrap() {
        assert_eq!(frame.dimensions(), (160, 120));
        frames += 1;
    }
    assert_eq!(frames, 10);
}

#[test]
#[ignore] // Requires ffmpeg and ffprobe on PATH
fn test_watermark_directory_with_ffmpeg() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    generate_clip(&input.path().join("with_audio.mp4"), "640x360", 1, true);
    generate_clip(&input.path().join("silent.mkv"), "320x240", 1, false);
    std::fs::write(input.path().join("broken.mov"), b"not a movie").unwrap();

    let mut cfg = config(input.path(), output.path());
    cfg.watermark.position = Anchor::BottomRight;

    let marker = Watermarker::new(&cfg).unwrap();
    let report = marker.process_directory(&cfg.job_settings()).unwrap();

    assert_eq!(report.counts(), (2, 1));
    assert!(!output.path().join("broken.mov").exists());

    let with_audio = probe(&output.path().join("with_audio.mp4")).unwrap();
    assert_eq!((with_audio.width, with_audio.height), (640, 360));
    assert!(with_audio.has_audio);

    let silent = probe(&output.path().join("silent.mkv")).unwrap();
    assert_eq!((silent.width, silent.height), (320, 240));
    assert!(!silent.has_audio);
}

#[test]
#[ignore] // Requires ffmpeg and ffprobe on PATH
fn test_watermark_changes_marked_corner_most() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    generate_clip(&input.path().join("clip.mp4"), "640x360", 1, false);

    let mut cfg = config(input.path(), output.path());
    cfg.watermark.position = Anchor::TopLeft;
    cfg.watermark.transparency = 0.0;
    cfg.watermark.scale = 0.5;

    let marker = Watermarker::new(&cfg).unwrap();
    marker.process_directory(&cfg.job_settings()).unwrap();

    let backend = FfmpegBackend::new();
    let mut original = backend.open(&input.path().join("clip.mp4")).unwrap();
    let mut marked = backend.open(&output.path().join("clip.mp4")).unwrap();
    let a = original.next_frame().unwrap().unwrap();
    let b = marked.next_frame().unwrap().unwrap();

    // 320x107 text mark at (10, 10); compare against a same-sized patch
    // in the opposite corner
    let mean_diff = |x0: u32, y0: u32| {
        let mut total = 0u64;
        for y in y0..y0 + 107 {
            for x in x0..x0 + 320 {
                let (p, q) = (a.get_pixel(x, y), b.get_pixel(x, y));
                total += (0..3).map(|c| (p[c] as i64 - q[c] as i64).unsigned_abs()).sum::<u64>();
            }
        }
        total as f64 / (320.0 * 107.0 * 3.0)
    };
    assert!(mean_diff(10, 10) > mean_diff(310, 243));
}
