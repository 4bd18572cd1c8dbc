//! Batch watermarking of a directory of videos.

use crate::config::Config;
use crate::error::VidmarkError;
use crate::job::{build_overlay, CompositeJob, JobError, JobSettings};
use crate::logging::LogSession;
use crate::media::{FfmpegBackend, MediaBackend};
use crate::watermark::{FrameSize, ImageOps, Overlay, RasterOps, WatermarkAsset};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Video extensions picked up from the input directory (case-insensitive).
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

/// Whether a path has a supported video extension.
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Supported video files directly inside `dir`, sorted by name.
///
/// Names are kept as `OsString`, so files whose names are not valid UTF-8
/// are still processed.
pub fn list_videos(dir: &Path) -> std::io::Result<Vec<OsString>> {
    let mut names = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && is_supported_video(&path) {
            names.push(entry.file_name());
        }
    }

    names.sort();
    Ok(names)
}

/// Result for one input file.
#[derive(Debug)]
pub struct FileOutcome {
    /// File name, lossily converted for display.
    pub filename: String,
    pub result: Result<PathBuf, JobError>,
}

/// Outcomes of a batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.successful()
    }

    /// `(successful, failed)`
    pub fn counts(&self) -> (usize, usize) {
        (self.successful(), self.failed())
    }
}

/// Applies one watermark to every video of an input directory.
pub struct Watermarker {
    input_dir: PathBuf,
    output_dir: PathBuf,
    asset: Option<WatermarkAsset>,
    media: Box<dyn MediaBackend>,
    ops: Box<dyn ImageOps>,
    log: LogSession,
}

impl std::fmt::Debug for Watermarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watermarker")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("asset", &self.asset.as_ref().map(|a| a.source()))
            .field("log", &self.log)
            .finish()
    }
}

impl Watermarker {
    /// Watermarker using ffmpeg for video and the raster crates for images.
    pub fn new(config: &Config) -> Result<Self, VidmarkError> {
        Self::with_backends(
            config,
            Box::new(FfmpegBackend::new()),
            Box::new(RasterOps::with_font(config.font_path.clone())),
        )
    }

    /// Validate the config, create the output directory, start logging and
    /// build the watermark.
    ///
    /// A watermark that cannot be built is logged and left empty; every
    /// video then fails with [`JobError::MissingWatermark`].
    pub fn with_backends(
        config: &Config,
        media: Box<dyn MediaBackend>,
        ops: Box<dyn ImageOps>,
    ) -> Result<Self, VidmarkError> {
        config.validate().map_err(VidmarkError::Config)?;

        let input_dir = config
            .input_dir
            .clone()
            .ok_or_else(|| VidmarkError::Config("Input directory is required".to_string()))?;
        let output_dir = config
            .resolved_output_dir()
            .ok_or_else(|| VidmarkError::Config("Output directory is unknown".to_string()))?;

        std::fs::create_dir_all(&output_dir).map_err(|e| {
            VidmarkError::Config(format!(
                "Cannot create output directory '{}': {}",
                output_dir.display(),
                e
            ))
        })?;

        let log = LogSession::start(&output_dir, &config.logging)?;

        tracing::info!(
            input_dir = %input_dir.display(),
            output_dir = %output_dir.display(),
            "Watermarker initialized"
        );

        let asset = match WatermarkAsset::build(config.logo_path.as_deref(), ops.as_ref()) {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::error!(error = %e, "Error creating watermark");
                None
            }
        };

        Ok(Self {
            input_dir,
            output_dir,
            asset,
            media,
            ops,
            log,
        })
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn asset(&self) -> Option<&WatermarkAsset> {
        self.asset.as_ref()
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log.log_file()
    }

    /// The overlay a video of the given frame size would receive.
    pub fn overlay_for(&self, frame: FrameSize, settings: &JobSettings) -> Result<Overlay, JobError> {
        let asset = self.asset.as_ref().ok_or(JobError::MissingWatermark)?;
        build_overlay(asset, frame, settings, self.ops.as_ref())
    }

    /// Watermark `<input_dir>/<filename>` into `<output_dir>/<filename>`.
    ///
    /// Failures are logged with the file name and returned.
    pub fn process_video(
        &self,
        filename: impl AsRef<OsStr>,
        settings: &JobSettings,
    ) -> Result<PathBuf, JobError> {
        let filename = filename.as_ref();
        let display_name = filename.to_string_lossy();
        let span = tracing::info_span!("video", file = %display_name);
        let _enter = span.enter();

        let source = self.input_dir.join(filename);
        let output = self.output_dir.join(filename);

        match self.run_job(&source, &output, settings) {
            Ok(frames) => {
                tracing::info!(
                    output = %output.display(),
                    frames,
                    "Successfully processed {}",
                    display_name
                );
                Ok(output)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing video {}", display_name);
                Err(e)
            }
        }
    }

    fn run_job(&self, source: &Path, output: &Path, settings: &JobSettings) -> Result<u64, JobError> {
        let asset = self.asset.as_ref().ok_or(JobError::MissingWatermark)?;
        let job = CompositeJob::prepare(
            source,
            output,
            asset,
            settings,
            self.media.as_ref(),
            self.ops.as_ref(),
        )?;
        job.run(self.media.as_ref(), &settings.encoder)
    }

    /// Watermark every supported video in the input directory, one at a
    /// time, in name order.
    pub fn process_directory(&self, settings: &JobSettings) -> Result<BatchReport, VidmarkError> {
        let videos = list_videos(&self.input_dir)?;
        tracing::info!(count = videos.len(), "Found videos to process");

        let mut report = BatchReport::default();
        for name in videos {
            let result = self.process_video(&name, settings);
            report.push(FileOutcome {
                filename: name.to_string_lossy().into_owned(),
                result,
            });
        }

        let (successful, failed) = report.counts();
        tracing::info!(
            "Processing complete. Successful: {}, Failed: {}",
            successful,
            failed
        );

        Ok(report)
    }
}
