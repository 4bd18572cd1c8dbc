// Batch pipeline tests against the in-memory media backend

use super::fakes::{write_fake_video, FakeMedia};
use std::path::Path;
use vidmark::config::{Config, LoggingConfig};
use vidmark::job::{JobError, JobSettings};
use vidmark::watermark::{Anchor, AssetSource, FrameSize, Placement, RasterOps};
use vidmark::{VidmarkError, Watermarker};

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

fn watermarker(config: &Config, media: &FakeMedia) -> Watermarker {
    Watermarker::with_backends(config, Box::new(media.clone()), Box::new(RasterOps::new())).unwrap()
}

fn frame_1080p() -> FrameSize {
    FrameSize {
        width: 1920,
        height: 1080,
    }
}

#[test]
fn test_end_to_end_text_mark_bottom_right() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_fake_video(input.path(), "clip.mp4", 1920, 1080, 5, 2);

    let mut cfg = config(input.path(), output.path());
    cfg.logging.to_file = true;
    cfg.watermark.position = Anchor::BottomRight;

    let media = FakeMedia::new();
    let marker = watermarker(&cfg, &media);
    assert!(matches!(
        marker.asset().map(|a| a.source()),
        Some(AssetSource::Text(_))
    ));

    let settings = cfg.job_settings();
    let overlay = marker.overlay_for(frame_1080p(), &settings).unwrap();
    assert_eq!(overlay.image().dimensions(), (192, 64));
    assert_eq!(overlay.position(), Placement::new(1718, 1006));

    let report = marker.process_directory(&settings).unwrap();
    assert_eq!(report.counts(), (1, 0));

    let expected_output = output.path().join("clip.mp4");
    assert_eq!(
        report.outcomes()[0].result.as_ref().unwrap(),
        &expected_output
    );
    assert!(expected_output.exists());

    let encoded = media.encoded();
    assert_eq!(encoded.len(), 1);
    assert_eq!(encoded[0].frames, 10);
    assert!(encoded[0].finished);
    assert_eq!(encoded[0].source, input.path().join("clip.mp4"));

    // Only pixels under the overlay changed
    let (x0, y0, x1, y1) = encoded[0].changed_region.unwrap();
    assert!(x0 >= 1718 && x1 < 1718 + 192);
    assert!(y0 >= 1006 && y1 < 1006 + 64);

    let log_file = marker.log_file().unwrap().to_path_buf();
    assert!(log_file.starts_with(output.path()));
    let log = std::fs::read_to_string(log_file).unwrap();
    assert!(log.contains("Processing complete. Successful: 1, Failed: 0"));
}

#[test]
fn test_corrupt_video_fails_without_output() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("broken.mp4"), b"\x00\x01 not a video").unwrap();

    let media = FakeMedia::new();
    let marker = watermarker(&config(input.path(), output.path()), &media);
    let report = marker.process_directory(&JobSettings::default()).unwrap();

    assert_eq!(report.successful(), 0);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.outcomes()[0].result,
        Err(JobError::Media(_))
    ));
    assert!(!output.path().join("broken.mp4").exists());
    assert!(media.encoded().is_empty());
}

#[test]
fn test_failure_does_not_stop_batch() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("a_broken.mp4"), b"junk").unwrap();
    write_fake_video(input.path(), "b_good.mov", 640, 360, 1, 3);

    let media = FakeMedia::new();
    let marker = watermarker(&config(input.path(), output.path()), &media);
    let report = marker.process_directory(&JobSettings::default()).unwrap();

    assert_eq!(report.counts(), (1, 1));
    assert_eq!(report.outcomes()[0].filename, "a_broken.mp4");
    assert!(report.outcomes()[0].result.is_err());
    assert!(output.path().join("b_good.mov").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_file_name_is_processed() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let name = OsStr::from_bytes(b"clip\xfe.mp4");
    write_fake_video(input.path(), name, 320, 240, 1, 2);

    let media = FakeMedia::new();
    let marker = watermarker(&config(input.path(), output.path()), &media);
    let report = marker.process_directory(&JobSettings::default()).unwrap();

    assert_eq!(report.counts(), (1, 0));
    assert_eq!(report.outcomes()[0].filename, "clip\u{FFFD}.mp4");
    assert!(output.path().join(name).exists());
}

#[test]
fn test_zero_frame_video_fails() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_fake_video(input.path(), "empty.mp4", 320, 240, 0, 30);

    let media = FakeMedia::new();
    let marker = watermarker(&config(input.path(), output.path()), &media);
    let result = marker.process_video("empty.mp4", &JobSettings::default());

    assert!(matches!(result, Err(JobError::Media(_))));
    assert!(!output.path().join("empty.mp4").exists());
}

#[test]
fn test_unknown_position_uses_top_right() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let marker = watermarker(&config(input.path(), output.path()), &FakeMedia::new());
    let settings = JobSettings::new(0.1, "somewhere-else", 0.5);
    let overlay = marker.overlay_for(frame_1080p(), &settings).unwrap();

    assert_eq!(overlay.position(), Placement::new(1920 - 192 - 10, 10));
}

#[test]
fn test_missing_logo_fails_every_video() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_fake_video(input.path(), "one.mp4", 320, 240, 1, 1);
    write_fake_video(input.path(), "two.mkv", 320, 240, 1, 1);

    let mut cfg = config(input.path(), output.path());
    cfg.logo_path = Some(input.path().join("no_such_logo.png"));

    let media = FakeMedia::new();
    let marker = watermarker(&cfg, &media);
    assert!(marker.asset().is_none());

    let report = marker.process_directory(&cfg.job_settings()).unwrap();
    assert_eq!(report.counts(), (0, 2));
    for outcome in report.outcomes() {
        assert!(matches!(outcome.result, Err(JobError::MissingWatermark)));
    }
    assert!(media.encoded().is_empty());
}

#[test]
fn test_logo_watermark_is_used() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let logo_dir = tempfile::tempdir().unwrap();
    let logo = logo_dir.path().join("logo.png");
    image::RgbaImage::from_pixel(100, 50, image::Rgba([255, 0, 0, 255]))
        .save(&logo)
        .unwrap();
    write_fake_video(input.path(), "clip.mp4", 1280, 720, 1, 2);

    let mut cfg = config(input.path(), output.path());
    cfg.logo_path = Some(logo.clone());
    cfg.watermark.position = Anchor::TopLeft;
    cfg.watermark.transparency = 0.0;

    let media = FakeMedia::new();
    let marker = watermarker(&cfg, &media);
    assert_eq!(marker.asset().unwrap().source(), &AssetSource::Logo(logo));

    let report = marker.process_directory(&cfg.job_settings()).unwrap();
    assert_eq!(report.counts(), (1, 0));

    // 128x64 opaque mark at (10, 10)
    let region = media.encoded()[0].changed_region.unwrap();
    assert_eq!(region, (10, 10, 10 + 128 - 1, 10 + 64 - 1));
}

#[test]
fn test_extension_filtering() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_fake_video(input.path(), "a.mp4", 64, 64, 1, 1);
    write_fake_video(input.path(), "b.txt", 64, 64, 1, 1);
    write_fake_video(input.path(), "c.MOV", 64, 64, 1, 1);
    write_fake_video(input.path(), "d.png", 64, 64, 1, 1);
    write_fake_video(input.path(), "e.webm", 64, 64, 1, 1);

    let marker = watermarker(&config(input.path(), output.path()), &FakeMedia::new());
    let report = marker.process_directory(&JobSettings::default()).unwrap();

    let attempted: Vec<&str> = report
        .outcomes()
        .iter()
        .map(|o| o.filename.as_str())
        .collect();
    assert_eq!(attempted, vec!["a.mp4", "c.MOV", "e.webm"]);
    assert_eq!(report.counts(), (3, 0));
}

#[test]
fn test_processing_is_deterministic() {
    let input = tempfile::tempdir().unwrap();
    write_fake_video(input.path(), "clip.mp4", 800, 600, 1, 1);

    let regions: Vec<_> = (0..2)
        .map(|_| {
            let output = tempfile::tempdir().unwrap();
            let media = FakeMedia::new();
            let marker = watermarker(&config(input.path(), output.path()), &media);
            marker.process_directory(&JobSettings::default()).unwrap();
            media.encoded()[0].changed_region
        })
        .collect();

    assert!(regions[0].is_some());
    assert_eq!(regions[0], regions[1]);
}

#[test]
fn test_encoder_settings_reach_backend() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_fake_video(input.path(), "clip.mp4", 320, 240, 1, 1);

    let mut cfg = config(input.path(), output.path());
    cfg.encoder.threads = 2;

    let media = FakeMedia::new();
    let marker = watermarker(&cfg, &media);
    marker.process_directory(&cfg.job_settings()).unwrap();

    assert_eq!(media.encoded()[0].settings.threads, 2);
}

#[test]
fn test_default_output_dir_is_created() {
    let input = tempfile::tempdir().unwrap();
    let mut cfg = Config::for_input(input.path());
    cfg.logging.to_file = false;

    let marker = watermarker(&cfg, &FakeMedia::new());

    let expected = input.path().join("watermarked");
    assert_eq!(marker.output_dir(), expected.as_path());
    assert!(expected.is_dir());
}

#[test]
fn test_output_dir_equal_to_input_is_rejected() {
    let input = tempfile::tempdir().unwrap();
    let cfg = config(input.path(), input.path());

    let result = Watermarker::with_backends(
        &cfg,
        Box::new(FakeMedia::new()),
        Box::new(RasterOps::new()),
    );
    assert!(matches!(result, Err(VidmarkError::Config(_))));
}

#[test]
fn test_missing_input_dir_is_rejected() {
    let output = tempfile::tempdir().unwrap();
    let cfg = config(Path::new("/definitely/not/an/input/dir"), output.path());

    let result = Watermarker::with_backends(
        &cfg,
        Box::new(FakeMedia::new()),
        Box::new(RasterOps::new()),
    );
    assert!(matches!(result, Err(VidmarkError::Config(_))));
}
