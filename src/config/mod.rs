// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::job::JobSettings;
use crate::media::EncoderSettings;
use crate::watermark::{Anchor, DEFAULT_PADDING, MAX_PADDING};

/// Name of the output directory created inside the input directory when
/// none is configured.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "watermarked";

/// Batch configuration.
///
/// Every field can come from a YAML file; the command line overrides
/// individual values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub encoder: EncoderSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_scale() -> f64 {
    0.1
}

fn default_transparency() -> f32 {
    0.5
}

fn default_padding() -> u32 {
    DEFAULT_PADDING
}

/// Watermark geometry and opacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Watermark width as a fraction of the video width, in (0, 1].
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub position: Anchor,
    /// 0.0 is opaque, 1.0 is invisible.
    #[serde(default = "default_transparency")]
    pub transparency: f32,
    #[serde(default = "default_padding")]
    pub padding: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            position: Anchor::default(),
            transparency: default_transparency(),
            padding: default_padding(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON formatted console output.
    #[serde(default)]
    pub json: bool,
    /// Write a timestamped log file into the output directory.
    #[serde(default = "default_true")]
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            to_file: true,
        }
    }
}

impl Config {
    /// Config for an input directory with every other value defaulted.
    pub fn for_input(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: Some(input_dir.into()),
            ..Default::default()
        }
    }

    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        let input_dir = self
            .input_dir
            .as_ref()
            .ok_or_else(|| "Input directory is required".to_string())?;

        if !input_dir.is_dir() {
            return Err(format!(
                "Input directory '{}' does not exist or is not a directory",
                input_dir.display()
            ));
        }

        let scale = self.watermark.scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(format!("Scale must be in (0, 1], got {}", scale));
        }

        let transparency = self.watermark.transparency;
        if !(0.0..=1.0).contains(&transparency) {
            return Err(format!(
                "Transparency must be in [0, 1], got {}",
                transparency
            ));
        }

        if self.watermark.padding > MAX_PADDING {
            return Err(format!(
                "Padding must be at most {}, got {}",
                MAX_PADDING, self.watermark.padding
            ));
        }

        if self.encoder.threads == 0 {
            return Err("Encoder threads must be at least 1".to_string());
        }

        if self.encoder.video_codec.trim().is_empty() || self.encoder.audio_codec.trim().is_empty()
        {
            return Err("Encoder codecs cannot be empty".to_string());
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(format!("Unknown log level '{}'", self.logging.level));
        }

        if let Some(output_dir) = &self.output_dir {
            if same_directory(input_dir, output_dir) {
                return Err(format!(
                    "Output directory '{}' must differ from the input directory",
                    output_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Configured output directory, or `<input>/watermarked`.
    pub fn resolved_output_dir(&self) -> Option<PathBuf> {
        self.output_dir.clone().or_else(|| {
            self.input_dir
                .as_ref()
                .map(|input| input.join(DEFAULT_OUTPUT_SUBDIR))
        })
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            scale: self.watermark.scale,
            anchor: self.watermark.position,
            transparency: self.watermark.transparency,
            padding: self.watermark.padding,
            encoder: self.encoder.clone(),
        }
    }
}

/// Compare two directories, resolving symlinks and `..` when both exist.
fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
