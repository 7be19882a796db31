use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scratch: ScratchConfig,
    /// Named keyed batch sources (name -> JSON file).
    #[serde(default)]
    pub sources: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// DevTools websocket endpoint of an already running browser.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Persistent profile directory used when launching a browser.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,
    /// Explicit browser executable for launch mode.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Launch without a visible window.
    #[serde(default)]
    pub headless: bool,
    /// Upper bound for one page's whole lifetime, in seconds.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
    /// Timeout for a single navigation, in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            profile_dir: None,
            executable: None,
            headless: false,
            page_timeout_secs: default_page_timeout(),
            navigation_timeout_secs: default_navigation_timeout(),
        }
    }
}

fn default_page_timeout() -> u64 {
    120
}

fn default_navigation_timeout() -> u64 {
    45
}

/// Resource resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Regex matching viewer links on the video platform.
    #[serde(default = "default_viewer_pattern")]
    pub viewer_pattern: String,
    /// URL fragment identifying the delivery manifest response.
    #[serde(default = "default_delivery_endpoint")]
    pub delivery_endpoint: String,
    /// How long to wait for the delivery manifest, in seconds.
    #[serde(default = "default_manifest_timeout")]
    pub manifest_timeout_secs: u64,
    /// Regex for generic titles that should not become filenames.
    #[serde(default = "default_placeholder_pattern")]
    pub placeholder_pattern: String,
    /// Extensions that get the forced-download query parameter.
    #[serde(default = "default_forced_extensions")]
    pub forced_download_extensions: Vec<String>,
    /// Name of the forced-download query parameter.
    #[serde(default = "default_force_param")]
    pub force_download_param: String,
    /// CSS selector for breadcrumb entries on landing pages.
    #[serde(default = "default_breadcrumb_selector")]
    pub breadcrumb_selector: String,
    /// URL substrings marking landing pages that embed a viewer link.
    #[serde(default = "default_landing_patterns")]
    pub landing_patterns: Vec<String>,
    /// Fall back to the HLS stream (remuxed) when no direct stream exists.
    #[serde(default)]
    pub allow_hls_fallback: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            viewer_pattern: default_viewer_pattern(),
            delivery_endpoint: default_delivery_endpoint(),
            manifest_timeout_secs: default_manifest_timeout(),
            placeholder_pattern: default_placeholder_pattern(),
            forced_download_extensions: default_forced_extensions(),
            force_download_param: default_force_param(),
            breadcrumb_selector: default_breadcrumb_selector(),
            landing_patterns: default_landing_patterns(),
            allow_hls_fallback: false,
        }
    }
}

fn default_viewer_pattern() -> String {
    r"(?i)panopto[^\s]*/Pages/(Viewer|Embed)\.aspx".to_string()
}

fn default_delivery_endpoint() -> String {
    "DeliveryInfo.aspx".to_string()
}

fn default_manifest_timeout() -> u64 {
    30
}

fn default_placeholder_pattern() -> String {
    r"(?i)^\s*resource\s*\d*\s*$".to_string()
}

fn default_forced_extensions() -> Vec<String> {
    ["mp4", "mov", "mkv", "avi", "ppsm", "pptx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_force_param() -> String {
    "forcedownload".to_string()
}

fn default_breadcrumb_selector() -> String {
    ".breadcrumb li, nav[aria-label='Navigation bar'] li".to_string()
}

fn default_landing_patterns() -> Vec<String> {
    vec!["/mod/page/view.php".to_string(), "/mod/url/view.php".to_string()]
}

/// Transfer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// Timeout for a single buffered fetch, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// User agent sent with fetches. Browser default when unset.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Write fetched bodies to a scratch file before uploading.
    #[serde(default = "default_true")]
    pub spool_to_disk: bool,
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// FFmpeg log level.
    #[serde(default = "default_ffmpeg_log_level")]
    pub ffmpeg_log_level: String,
    /// Timeout for one remux, in seconds.
    #[serde(default = "default_remux_timeout")]
    pub remux_timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            user_agent: None,
            spool_to_disk: true,
            ffmpeg_path: default_ffmpeg_path(),
            ffmpeg_log_level: default_ffmpeg_log_level(),
            remux_timeout_secs: default_remux_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    1800
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffmpeg_log_level() -> String {
    "warning".to_string()
}

fn default_remux_timeout() -> u64 {
    7200 // 2 hours
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Group used for flat lists and single fetches when none is given.
    #[serde(default = "default_prefix")]
    pub default_prefix: String,
    /// Insert the landing page breadcrumb trail between group and filename.
    #[serde(default = "default_true")]
    pub breadcrumb_prefix: bool,
    /// Artifacts at or above this size use multipart upload.
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold_bytes: u64,
    /// Part size for multipart uploads.
    #[serde(default = "default_part_size")]
    pub part_size_bytes: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            default_prefix: default_prefix(),
            breadcrumb_prefix: true,
            multipart_threshold_bytes: default_multipart_threshold(),
            part_size_bytes: default_part_size(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_prefix() -> String {
    "downloads".to_string()
}

fn default_multipart_threshold() -> u64 {
    64 * 1024 * 1024
}

fn default_part_size() -> u64 {
    16 * 1024 * 1024
}

/// Rate-limit retry configuration for uploads.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper bound of the uniform random jitter added to each delay.
    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            jitter_ms: default_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    500
}

fn default_jitter() -> u64 {
    250
}

/// Local scratch space configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScratchConfig {
    #[serde(default = "default_scratch_root")]
    pub root: PathBuf,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: default_scratch_root(),
        }
    }
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("lectern")
}

/// Metrics output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write Prometheus text format here at the end of a run.
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub session_mode: String,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub credentials_configured: bool,
    pub scratch_root: PathBuf,
    pub sources: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let session_mode = match (&config.session.endpoint, &config.session.profile_dir) {
            (Some(_), _) => "remote".to_string(),
            (None, Some(_)) => "launch".to_string(),
            (None, None) => "unconfigured".to_string(),
        };
        Self {
            session_mode,
            bucket: config.storage.bucket.clone(),
            region: config.storage.region.clone(),
            endpoint: config.storage.endpoint.clone(),
            credentials_configured: config.storage.access_key_id.is_some()
                && config.storage.secret_access_key.is_some(),
            scratch_root: config.scratch.root.clone(),
            sources: config.sources.keys().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.session.endpoint.is_none());
        assert_eq!(config.session.navigation_timeout_secs, 45);
        assert_eq!(config.resolver.delivery_endpoint, "DeliveryInfo.aspx");
        assert_eq!(config.resolver.manifest_timeout_secs, 30);
        assert_eq!(config.resolver.force_download_param, "forcedownload");
        assert!(config
            .resolver
            .forced_download_extensions
            .contains(&"pptx".to_string()));
        assert!(!config.resolver.allow_hls_fallback);
        assert!(config.transfer.spool_to_disk);
        assert_eq!(config.storage.default_prefix, "downloads");
        assert_eq!(config.storage.retry.max_attempts, 5);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_deserialize_full_sections() {
        let toml = r#"
[session]
endpoint = "ws://127.0.0.1:9222/devtools/browser/abc"

[storage]
bucket = "lectures"
region = "eu-west-3"
multipart_threshold_bytes = 1048576

[storage.retry]
max_attempts = 3
base_delay_ms = 100

[sources]
math = "sources/math.json"

[logging]
format = "json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.session.endpoint.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/browser/abc")
        );
        assert_eq!(config.storage.bucket.as_deref(), Some("lectures"));
        assert_eq!(config.storage.multipart_threshold_bytes, 1048576);
        assert_eq!(config.storage.retry.max_attempts, 3);
        assert_eq!(config.storage.retry.base_delay_ms, 100);
        assert_eq!(config.storage.retry.jitter_ms, 250); // default
        assert_eq!(
            config.sources.get("math"),
            Some(&PathBuf::from("sources/math.json"))
        );
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_sanitized_config_hides_secret() {
        let mut config = Config::default();
        config.session.profile_dir = Some(PathBuf::from("/home/u/.config/chromium"));
        config.storage.access_key_id = Some("AKIA".to_string());
        config.storage.secret_access_key = Some("very-secret".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.session_mode, "launch");
        assert!(sanitized.credentials_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("very-secret"));
    }
}
