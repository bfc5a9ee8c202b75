//! Run the pipeline in-process on a local video file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vidisnap_models::{is_supported_video_filename, UploadedVideo};
use vidisnap_pipeline::{Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "vidisnap-analyze", about = "Classify the first frame of a video")]
struct Cli {
    /// Video file to analyze
    video: PathBuf,

    /// Write the decoded JPEG thumbnail here
    #[arg(long)]
    thumbnail_out: Option<PathBuf>,

    /// Pretty-print the JSON response
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries only the response.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let filename = cli
        .video
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .context("video path has no file name")?;
    if !is_supported_video_filename(&filename) {
        bail!("unsupported file type: {}", filename);
    }

    let bytes = tokio::fs::read(&cli.video)
        .await
        .with_context(|| format!("failed to read {}", cli.video.display()))?;

    let pipeline = Pipeline::from_config(PipelineConfig::from_env())
        .context("failed to load classifier")?;
    let response = pipeline.analyze(UploadedVideo::new(bytes, filename)).await?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", json);

    if let Some(path) = cli.thumbnail_out {
        let jpeg = STANDARD
            .decode(&response.thumbnail_b64)
            .context("thumbnail is not valid base64")?;
        tokio::fs::write(&path, jpeg)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("thumbnail written to {}", path.display());
    }

    Ok(())
}
