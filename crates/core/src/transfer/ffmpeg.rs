//! FFmpeg-based remuxer.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use crate::config::TransferConfig;

use super::error::TransferError;
use super::traits::Remuxer;

const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

pub struct FfmpegRemuxer {
    ffmpeg_path: PathBuf,
    log_level: String,
    timeout_secs: u64,
}

impl FfmpegRemuxer {
    pub fn new(config: &TransferConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            log_level: config.ffmpeg_log_level.clone(),
            timeout_secs: config.remux_timeout_secs,
        }
    }

    /// Builds the raw `-headers` block: one `Name: value\r\n` line per header.
    pub fn header_block(headers: &[(String, String)]) -> String {
        headers
            .iter()
            .map(|(k, v)| format!("{}: {}\r\n", k, v))
            .collect()
    }

    fn build_args(&self, playlist_url: &str, headers: &[(String, String)], output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
        ];

        // Input options must come before -i.
        if !headers.is_empty() {
            args.extend(["-headers".to_string(), Self::header_block(headers)]);
        }

        args.extend([
            "-i".to_string(),
            playlist_url.to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-bsf:a".to_string(),
            "aac_adtstoasc".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            output.to_string_lossy().to_string(),
        ]);
        args
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn remux(
        &self,
        playlist_url: &str,
        headers: &[(String, String)],
        output: &Path,
    ) -> Result<PathBuf, TransferError> {
        let start = Instant::now();
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(playlist_url, headers, output);
        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TransferError::FfmpegNotFound {
                        path: self.ffmpeg_path.clone(),
                    }
                } else {
                    TransferError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransferError::remux_failed("stderr not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let time_regex = Regex::new(r"out_time_ms=(\d+)").ok();
        let size_regex = Regex::new(r"total_size=(\d+)").ok();

        let result = timeout(Duration::from_secs(self.timeout_secs), async {
            let mut last_log = Instant::now();
            let mut out_secs = 0.0;
            let mut total_size: u64 = 0;
            let mut error_output = String::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                if let Some(caps) = time_regex.as_ref().and_then(|re| re.captures(&line)) {
                    if let Ok(us) = caps[1].parse::<f64>() {
                        out_secs = us / 1_000_000.0;
                    }
                }
                if let Some(caps) = size_regex.as_ref().and_then(|re| re.captures(&line)) {
                    if let Ok(size) = caps[1].parse::<u64>() {
                        total_size = size;
                    }
                }

                if last_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                    debug!(out_secs, total_size, "Remux progress");
                    last_log = Instant::now();
                }
            }

            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(TransferError::remux_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        (!error_output.is_empty()).then_some(error_output),
                    ));
                }
            }
            Ok(Err(e)) => return Err(TransferError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(TransferError::Timeout {
                    timeout_secs: self.timeout_secs,
                });
            }
        }

        if tokio::fs::metadata(output).await.is_err() {
            return Err(TransferError::remux_failed("Output file not created", None));
        }

        info!(
            output = %output.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Remux complete"
        );
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_block_format() {
        let headers = vec![
            ("Cookie".to_string(), "a=1; b=2".to_string()),
            ("Referer".to_string(), "https://x/".to_string()),
        ];
        assert_eq!(
            FfmpegRemuxer::header_block(&headers),
            "Cookie: a=1; b=2\r\nReferer: https://x/\r\n"
        );
    }

    #[test]
    fn test_build_args_headers_before_input() {
        let remuxer = FfmpegRemuxer::new(&TransferConfig::default());
        let headers = vec![("Cookie".to_string(), "a=1".to_string())];
        let args = remuxer.build_args("https://cdn/m.m3u8", &headers, Path::new("/tmp/out.mp4"));

        let headers_pos = args.iter().position(|a| a == "-headers").unwrap();
        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(headers_pos < input_pos);
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn test_build_args_without_headers() {
        let remuxer = FfmpegRemuxer::new(&TransferConfig::default());
        let args = remuxer.build_args("https://cdn/m.m3u8", &[], Path::new("out.mp4"));
        assert!(!args.iter().any(|a| a == "-headers"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let config = TransferConfig {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg-lectern"),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = FfmpegRemuxer::new(&config)
            .remux("https://cdn/m.m3u8", &[], &dir.path().join("o.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::FfmpegNotFound { .. }));
    }
}
