use std::path::Path;

use vidisnap_classifier::Vocabulary;
use vidisnap_media::{check_ffmpeg, check_ffprobe};
use vidisnap_pipeline::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env();

    println!(
        "vidisnap-selfcheck: starting with work_dir={}",
        config.store.root.display()
    );
    ensure_workdir(&config.store.root).await?;
    ensure_ffmpeg()?;
    ensure_model(&config.classifier.model_path, &config.classifier.labels_path)?;

    println!("vidisnap-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let marker = path.join(".selfcheck");
    tokio::fs::write(&marker, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("work dir {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&marker).await?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    println!(
        "vidisnap-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

fn ensure_model(model_path: &Path, labels_path: &Path) -> anyhow::Result<()> {
    if !model_path.exists() {
        return Err(anyhow::anyhow!("model not found at {}", model_path.display()));
    }
    let vocabulary = Vocabulary::load(labels_path)?;
    println!(
        "vidisnap-selfcheck: model={} labels={}",
        model_path.display(),
        vocabulary.len()
    );
    Ok(())
}
