use anyhow::Context;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Parser;
use std::path::PathBuf;
use vidmark::config::Config;
use vidmark::media::tools::check_tools;
use vidmark::watermark::Anchor;
use vidmark::Watermarker;

/// vidmark - add a logo or text watermark to every video in a directory
#[derive(Parser, Debug)]
#[command(name = "vidmark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory containing the input videos
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory for watermarked videos [default: <input-dir>/watermarked]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Watermark image; a text mark is generated when omitted
    #[arg(long)]
    logo_path: Option<PathBuf>,

    /// Watermark width as a fraction of the video width [default: 0.1]
    #[arg(long)]
    scale: Option<f64>,

    /// Watermark position [default: top-right]
    #[arg(
        long,
        value_parser = PossibleValuesParser::new(Anchor::NAMES).map(|s| Anchor::from_name(&s))
    )]
    position: Option<Anchor>,

    /// 0 is opaque, 1 is invisible [default: 0.5]
    #[arg(long)]
    transparency: Option<f32>,

    /// Distance from the frame edge in pixels [default: 10]
    #[arg(long)]
    padding: Option<u32>,

    /// Encoder thread bound [default: 4]
    #[arg(long)]
    threads: Option<u32>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Font for the generated text mark
    #[arg(long)]
    font_path: Option<PathBuf>,

    /// JSON formatted console logs
    #[arg(long)]
    json_logs: bool,

    /// Debug level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command line values on top of the config file.
    fn apply_to(self, config: &mut Config) {
        if let Some(dir) = self.input_dir {
            config.input_dir = Some(dir);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = Some(dir);
        }
        if let Some(path) = self.logo_path {
            config.logo_path = Some(path);
        }
        if let Some(path) = self.font_path {
            config.font_path = Some(path);
        }
        if let Some(scale) = self.scale {
            config.watermark.scale = scale;
        }
        if let Some(position) = self.position {
            config.watermark.position = position;
        }
        if let Some(transparency) = self.transparency {
            config.watermark.transparency = transparency;
        }
        if let Some(padding) = self.padding {
            config.watermark.padding = padding;
        }
        if let Some(threads) = self.threads {
            config.encoder.threads = threads;
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

fn load_config(args: Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    args.apply_to(&mut config);
    Ok(config)
}

fn run(config: Config) -> anyhow::Result<()> {
    let watermarker = Watermarker::new(&config).context("Failed to initialize watermarker")?;

    if let Err(e) = check_tools() {
        tracing::warn!(error = %e, "Video tools unavailable, every video will fail");
    }

    let report = watermarker
        .process_directory(&config.job_settings())
        .context("Failed to process input directory")?;

    tracing::debug!(
        successful = report.successful(),
        failed = report.failed(),
        "Batch finished"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    let config = load_config(args).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = run(config) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
