//! Per-run logging.
//!
//! A [`LogSession`] installs a tracing subscriber for the current thread for
//! as long as it lives. Events go to the console and, when enabled, to
//! `video_watermark_log_<YYYYmmdd_HHMMSS>.log` in the output directory.
//!
//! The subscriber is scoped with [`tracing::subscriber::set_default`] rather
//! than installed globally, so several sessions can run in one process one
//! after another.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use vidmark::config::LoggingConfig;
//! use vidmark::logging::LogSession;
//!
//! let session = LogSession::start(Path::new("/tmp/out"), &LoggingConfig::default()).unwrap();
//! tracing::info!("Batch started");
//! println!("logging to {:?}", session.log_file());
//! ```

use crate::config::LoggingConfig;
use crate::error::VidmarkError;
use chrono::{DateTime, Local};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Log file name for a run started at `started`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("video_watermark_log_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// An active logging scope. Dropping it restores the previous subscriber.
pub struct LogSession {
    log_file: Option<PathBuf>,
    _guard: DefaultGuard,
}

impl std::fmt::Debug for LogSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSession")
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl LogSession {
    /// Install the subscriber. `output_dir` must already exist when file
    /// logging is enabled.
    pub fn start(output_dir: &Path, config: &LoggingConfig) -> Result<Self, VidmarkError> {
        // RUST_LOG wins over the configured level
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .map_err(|e| VidmarkError::Config(format!("Invalid log level: {}", e)))?;

        let mut layers: Vec<BoxedLayer> = Vec::new();

        if config.json {
            layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
        } else {
            layers.push(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .boxed(),
            );
        }

        let log_file = if config.to_file {
            let path = output_dir.join(log_file_name(Local::now()));
            let file = File::create(&path)?;
            layers.push(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            );
            Some(path)
        } else {
            None
        };

        let subscriber = Registry::default().with(filter).with(layers);
        let guard = tracing::subscriber::set_default(subscriber);

        if let Some(path) = &log_file {
            tracing::debug!(log_file = %path.display(), "Logging to file");
        }

        Ok(Self {
            log_file,
            _guard: guard,
        })
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
