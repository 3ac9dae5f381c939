//! Normalize a raw capture from the command line.
//!
//! Usage: `netramaya <raw-capture-file> [output-dir] [declared-seconds]`

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use netramaya_lib::processing::{
    download_file_name, DirectoryDownloads, DownloadSink, FfmpegNormalizer, NoShareSurface,
    VideoProcessor,
};
use netramaya_lib::recorder::RawCapture;
use netramaya_lib::SessionConfig;

fn mime_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") | Some("m4v") | Some("mov") => "video/mp4",
        _ => "video/webm",
    }
}

fn load_config() -> Result<SessionConfig> {
    match std::env::var_os("NETRAMAYA_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            SessionConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => Ok(SessionConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    netramaya_lib::init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        bail!("usage: netramaya <raw-capture-file> [output-dir] [declared-seconds]");
    };
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let declared_seconds = match args.next() {
        Some(s) => s
            .parse::<u64>()
            .with_context(|| format!("Invalid duration: {}", s))?,
        None => 0,
    };

    let config = load_config()?;
    tracing::info!("Starting Netramaya v{}", env!("CARGO_PKG_VERSION"));

    let data = tokio::fs::read(&input)
        .await
        .with_context(|| format!("Failed to read {:?}", input))?;
    let raw = RawCapture::new(data, mime_for_path(&input), declared_seconds, true);

    let processor = VideoProcessor::new(
        Arc::new(FfmpegNormalizer::new()),
        Arc::new(NoShareSurface),
        config.processing.clone(),
    );
    let downloads = DirectoryDownloads::new(&output_dir);

    let result = processor
        .process_video(&raw, declared_seconds, |progress| {
            println!("[{:>3}%] {}", progress.percent, progress.message);
        })
        .await;

    match result {
        Ok(file) => {
            let path = downloads.save(&file.file_name, &file.data).await?;
            println!("Saved {}", path.display());
        }
        Err(e) => {
            eprintln!("Processing failed: {}", e);
            let path = downloads
                .save(&download_file_name(&raw.mime_type), &raw.data)
                .await?;
            println!("Saved original capture to {}", path.display());
        }
    }

    Ok(())
}
