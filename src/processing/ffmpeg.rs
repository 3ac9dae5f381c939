//! FFmpeg normalizer
//!
//! Re-encodes a raw capture into a widely playable container by running the
//! `ffmpeg` binary over a private temporary copy of the bytes.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::handoff::extension_for_mime;
use super::pipeline::{ProgressReporter, VideoNormalizer};
use super::types::{OutputFormat, ProcessingError, ProcessingOptions, ProcessingProgress};
use crate::recorder::RawCapture;

/// Bytes of FFmpeg stderr kept for error messages
const STDERR_TAIL: usize = 2000;

/// A parsed line of `-progress` output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLine {
    /// Media time encoded so far, in milliseconds
    OutTime(u64),
    /// `progress=end`
    End,
}

/// Parse one `key=value` line from `ffmpeg -progress pipe:1`
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is also microseconds despite its name
        "out_time_us" | "out_time_ms" => value
            .parse::<u64>()
            .ok()
            .map(|us| ProgressLine::OutTime(us / 1000)),
        "progress" if value == "end" => Some(ProgressLine::End),
        _ => None,
    }
}

/// Build the FFmpeg argument list for normalizing `input` into `output`
pub fn build_args(
    input: &Path,
    output: &Path,
    options: &ProcessingOptions,
    has_audio: bool,
) -> Vec<String> {
    let crf = options.quality.crf();
    let mut args: Vec<String> = vec![
        "-hide_banner".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        // H.264 with yuv420p needs even dimensions
        "-vf".to_string(),
        "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
        "-c:v".to_string(),
        options.format.video_codec().to_string(),
    ];

    match options.format {
        OutputFormat::Mp4 => {
            args.extend([
                "-preset".to_string(),
                options.quality.h264_preset().to_string(),
                "-crf".to_string(),
                crf.to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-movflags".to_string(),
                "+faststart".to_string(),
            ]);
        }
        OutputFormat::Webm => {
            args.extend([
                "-crf".to_string(),
                crf.to_string(),
                "-b:v".to_string(),
                "0".to_string(),
            ]);
        }
    }

    if has_audio {
        args.extend([
            "-c:a".to_string(),
            options.format.audio_codec().to_string(),
            "-b:a".to_string(),
            options.audio_bitrate.clone(),
        ]);
    } else {
        args.push("-an".to_string());
    }

    // Progress output for tracking
    args.extend([
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
    ]);

    args.push(output.to_string_lossy().into_owned());
    args
}

fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim_end();
    if trimmed.len() <= STDERR_TAIL {
        return trimmed;
    }
    let mut start = trimmed.len() - STDERR_TAIL;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}

/// [`VideoNormalizer`] backed by the `ffmpeg` executable
#[derive(Debug, Default, Clone)]
pub struct FfmpegNormalizer;

impl FfmpegNormalizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VideoNormalizer for FfmpegNormalizer {
    async fn normalize(
        &self,
        raw: &RawCapture,
        duration_secs: u64,
        options: &ProcessingOptions,
        progress: &ProgressReporter,
    ) -> Result<Vec<u8>, ProcessingError> {
        if raw.is_empty() {
            return Err(ProcessingError::EmptyCapture);
        }

        progress.report(ProcessingProgress::loading());

        let workdir = tempfile::tempdir()?;
        let input = workdir
            .path()
            .join(format!("input.{}", extension_for_mime(&raw.mime_type)));
        let output = workdir
            .path()
            .join(format!("output.{}", options.format.extension()));
        tokio::fs::write(&input, &raw.data[..]).await?;

        let args = build_args(&input, &output, options, raw.has_audio);
        tracing::info!("Starting FFmpeg normalization: {:?}", args);

        let mut child = Command::new(&options.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessingError::Ffmpeg(format!("Failed to start FFmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessingError::Ffmpeg("Failed to capture FFmpeg stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessingError::Ffmpeg("Failed to capture FFmpeg stderr".to_string()))?;

        // Drain stderr concurrently so a chatty encoder cannot fill the pipe
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text).await;
            text
        });

        progress.report(ProcessingProgress::encoding(0, duration_secs * 1000));

        let total_ms = duration_secs * 1000;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_progress_line(&line) {
                Some(ProgressLine::OutTime(ms)) => {
                    progress.report(ProcessingProgress::encoding(ms, total_ms));
                }
                Some(ProgressLine::End) => {
                    progress.report(ProcessingProgress::finalizing());
                }
                None => {}
            }
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            tracing::error!("FFmpeg exited with {}", status);
            return Err(ProcessingError::Ffmpeg(format!(
                "FFmpeg exited with {}: {}",
                status,
                stderr_tail(&stderr_text)
            )));
        }

        let data = tokio::fs::read(&output).await?;
        if data.is_empty() {
            return Err(ProcessingError::Encoding(
                "FFmpeg produced an empty file".to_string(),
            ));
        }

        tracing::info!(
            "FFmpeg normalization complete: {} -> {} bytes",
            raw.len(),
            data.len()
        );
        Ok(data)
    }
}
