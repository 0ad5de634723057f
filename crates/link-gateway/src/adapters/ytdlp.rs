//! `yt-dlp` adapter for the [`LinkExtractor`] port.
//!
//! Runs the executable once per request in metadata-only mode and reads the
//! single JSON document it prints on stdout.

use crate::domain::config::ExtractorConfig;
use crate::domain::{ExtractError, ExtractedMedia};
use crate::ports::LinkExtractor;
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

/// Arguments placed before the URL on every invocation
const BASE_ARGS: [&str; 5] = [
    "--skip-download",
    "--quiet",
    "--no-warnings",
    "--no-playlist",
    "--dump-single-json",
];

/// Link extractor backed by the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout,
        }
    }

    /// Resolve the configured executable on `PATH`.
    ///
    /// A missing executable is not fatal: requests fail with
    /// `extractor_unavailable` until it is installed.
    pub fn locate(config: &ExtractorConfig) -> Self {
        let mut extractor = Self::new(config);
        match which::which(&config.binary) {
            Ok(resolved) => {
                info!(path = %resolved.display(), "Using yt-dlp executable");
                extractor.binary = resolved;
            }
            Err(e) => {
                warn!(
                    binary = %config.binary.display(),
                    error = %e,
                    "yt-dlp executable not found; extraction requests will fail"
                );
            }
        }
        extractor
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, url: &Url) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(BASE_ARGS)
            .arg("--")
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl LinkExtractor for YtDlpExtractor {
    async fn extract(&self, url: &Url) -> Result<ExtractedMedia, ExtractError> {
        debug!(url = %url, binary = %self.binary.display(), "Spawning yt-dlp");

        let child = self.command(url).spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ExtractError::NotInstalled(self.binary.display().to_string())
            } else {
                ExtractError::Spawn(e)
            }
        })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(ExtractError::Spawn)?,
            Err(_) => {
                warn!(url = %url, timeout_ms = self.timeout.as_millis() as u64, "yt-dlp timed out");
                return Err(ExtractError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            let message = failure_message(&output.stderr, output.status);
            debug!(url = %url, status = ?output.status.code(), %message, "yt-dlp failed");
            return Err(ExtractError::Failed { message });
        }

        let media = parse_info(&output.stdout)?;
        debug!(
            url = %url,
            extractor = media.extractor.as_deref().unwrap_or("unknown"),
            title = media.title.as_deref().unwrap_or(""),
            "yt-dlp finished"
        );
        Ok(media)
    }
}

/// Subset of the yt-dlp info dictionary this service reads
#[derive(Deserialize)]
struct InfoDict {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extractor: Option<String>,
}

fn parse_info(stdout: &[u8]) -> Result<ExtractedMedia, ExtractError> {
    let info: InfoDict = serde_json::from_slice(stdout)?;
    Ok(ExtractedMedia {
        url: info.url.unwrap_or_default(),
        title: info.title,
        extractor: info.extractor,
    })
}

/// Pick the most useful error text from yt-dlp's stderr
fn failure_message(stderr: &[u8], status: ExitStatus) -> String {
    let stderr = String::from_utf8_lossy(stderr);

    if let Some(line) = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with("ERROR:"))
    {
        return line.to_string();
    }

    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    match status.code() {
        Some(code) => format!("yt-dlp exited with status {}", code),
        None => "yt-dlp terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info() {
        let media = parse_info(
            br#"{"id": "x", "url": "https://cdn.example.com/v.mp4", "title": "clip", "extractor": "generic"}"#,
        )
        .unwrap();
        assert_eq!(media.url, "https://cdn.example.com/v.mp4");
        assert_eq!(media.title.as_deref(), Some("clip"));
        assert_eq!(media.extractor.as_deref(), Some("generic"));
    }

    #[test]
    fn test_parse_info_null_url() {
        let media = parse_info(br#"{"url": null, "title": "merged formats"}"#).unwrap();
        assert_eq!(media.direct_url(), None);
    }

    #[test]
    fn test_parse_info_garbage() {
        assert!(matches!(
            parse_info(b"not json"),
            Err(ExtractError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_command_arguments() {
        let extractor = YtDlpExtractor::new(&ExtractorConfig::default());
        let url = Url::parse("https://example.com/watch?v=1").unwrap();
        let cmd = extractor.command(&url);
        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--skip-download",
                "--quiet",
                "--no-warnings",
                "--no-playlist",
                "--dump-single-json",
                "--",
                "https://example.com/watch?v=1",
            ]
        );
        assert_eq!(cmd.as_std().get_program(), "yt-dlp");
    }

    #[test]
    fn test_locate_missing_binary_keeps_configured_path() {
        let config = ExtractorConfig {
            binary: PathBuf::from("/nonexistent/dir/yt-dlp"),
            ..Default::default()
        };
        let extractor = YtDlpExtractor::locate(&config);
        assert_eq!(extractor.binary(), Path::new("/nonexistent/dir/yt-dlp"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_installed() {
        let extractor = YtDlpExtractor::new(&ExtractorConfig {
            binary: PathBuf::from("/nonexistent/dir/yt-dlp"),
            timeout: Duration::from_secs(5),
        });
        let url = Url::parse("https://example.com/v").unwrap();
        assert!(matches!(
            extractor.extract(&url).await,
            Err(ExtractError::NotInstalled(_))
        ));
    }

    #[cfg(unix)]
    mod script {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Write an executable stand-in for yt-dlp
        fn fake_ytdlp(body: &str, timeout: Duration) -> (TempDir, YtDlpExtractor) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("yt-dlp");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            let extractor = YtDlpExtractor::new(&ExtractorConfig {
                binary: path,
                timeout,
            });
            (dir, extractor)
        }

        fn page() -> Url {
            Url::parse("https://example.com/watch?v=abc").unwrap()
        }

        #[tokio::test]
        async fn test_success_passes_url_last() {
            // $7 is the URL: five base flags, then "--"
            let (_dir, extractor) = fake_ytdlp(
                r#"printf '{"url":"%s","title":"clip","extractor":"generic"}' "$7""#,
                Duration::from_secs(10),
            );
            let media = extractor.extract(&page()).await.unwrap();
            assert_eq!(media.url, "https://example.com/watch?v=abc");
            assert_eq!(media.extractor.as_deref(), Some("generic"));
        }

        #[tokio::test]
        async fn test_failure_uses_error_line() {
            let (_dir, extractor) = fake_ytdlp(
                "echo 'WARNING: something odd' >&2\necho 'ERROR: [generic] Unsupported URL: https://example.com' >&2\nexit 1",
                Duration::from_secs(10),
            );
            match extractor.extract(&page()).await {
                Err(ExtractError::Failed { message }) => {
                    assert_eq!(
                        message,
                        "ERROR: [generic] Unsupported URL: https://example.com"
                    );
                }
                other => panic!("expected Failed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_failure_without_stderr() {
            let (_dir, extractor) = fake_ytdlp("exit 3", Duration::from_secs(10));
            match extractor.extract(&page()).await {
                Err(ExtractError::Failed { message }) => {
                    assert_eq!(message, "yt-dlp exited with status 3");
                }
                other => panic!("expected Failed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_timeout() {
            let (_dir, extractor) = fake_ytdlp("sleep 5", Duration::from_millis(200));
            assert!(matches!(
                extractor.extract(&page()).await,
                Err(ExtractError::Timeout(_))
            ));
        }

        #[tokio::test]
        async fn test_malformed_output() {
            let (_dir, extractor) = fake_ytdlp("echo nope", Duration::from_secs(10));
            assert!(matches!(
                extractor.extract(&page()).await,
                Err(ExtractError::MalformedOutput(_))
            ));
        }
    }
}
