//! Configuration module for feedmerge.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::{FeedmergeError, Result};

/// Build metadata, constructed once in `main` and passed to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    /// Machine-friendly id, used for default file names and feed id.
    pub app_id: String,
    /// Human-friendly title.
    pub app_title: String,
    /// Crate version.
    pub version: String,
}

impl BuildInfo {
    /// Metadata of the current build.
    pub fn current() -> Self {
        Self {
            app_id: env!("CARGO_PKG_NAME").to_string(),
            app_title: "FeedMerge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Default `User-Agent` header for outgoing requests.
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.app_title, self.version)
    }
}

/// Publish server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address (`host:port`).
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Request path serving the merged feed.
    #[serde(default = "default_path")]
    pub path: String,
    /// `Content-Type` of the served feed.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Upper bound for every wait during shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_addr() -> String {
    "127.0.0.1:13742".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_content_type() -> String {
    "application/atom+xml".to_string()
}

fn default_shutdown_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            path: default_path(),
            content_type: default_content_type(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

/// Output feed identity and location.
///
/// Empty strings are replaced by [`Config::resolve_defaults`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedConfig {
    /// Atom `<id>` of the merged feed.
    #[serde(default)]
    pub id: String,
    /// Atom `<title>` of the merged feed.
    #[serde(default)]
    pub title: String,
    /// Atom `rel="self"` link.
    #[serde(default)]
    pub self_link: String,
    /// Where the merged feed is persisted.
    #[serde(default)]
    pub file: String,
}

/// Outgoing HTTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// `User-Agent` header; empty means `<title>/<version>`.
    #[serde(default)]
    pub user_agent: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum accepted body size.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

/// Polling schedule shared by all watchers.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Stagger between the first fetch of consecutive sources.
    #[serde(default = "default_initial_pause")]
    pub initial_pause_secs: u64,
    /// Lower bound (inclusive) of the poll interval.
    #[serde(default = "default_min_interval")]
    pub min_interval_mins: u64,
    /// Upper bound (exclusive) of the poll interval.
    #[serde(default = "default_max_interval")]
    pub max_interval_mins: u64,
}

fn default_initial_pause() -> u64 {
    1
}

fn default_min_interval() -> u64 {
    3 * 60
}

fn default_max_interval() -> u64 {
    4 * 60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_pause_secs: default_initial_pause(),
            min_interval_mins: default_min_interval(),
            max_interval_mins: default_max_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; empty logs to the console only.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

fn default_max_items() -> usize {
    666
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Source locators: feed URLs or video channel URLs.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Maximum number of items kept in the merged feed.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Publish server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Output feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Outgoing HTTP configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Polling schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            max_items: default_max_items(),
            server: ServerConfig::default(),
            feed: FeedConfig::default(),
            fetch: FetchConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedmergeError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedmergeError::Config(format!("config parse error: {e}")))
    }

    /// Fill every empty identity field with its default.
    ///
    /// The persisted file defaults to `<data dir>/<app id>/<app id>.xml`,
    /// which fails when no data directory can be determined.
    pub fn resolve_defaults(&mut self, info: &BuildInfo) -> Result<()> {
        if self.feed.id.is_empty() {
            self.feed.id = info.app_id.clone();
        }
        if self.feed.title.is_empty() {
            self.feed.title = info.app_title.clone();
        }
        if self.feed.self_link.is_empty() {
            self.feed.self_link = format!("http://{}{}", self.server.addr, self.server.path);
        }
        if self.fetch.user_agent.is_empty() {
            self.fetch.user_agent = info.user_agent();
        }
        if self.feed.file.is_empty() {
            let root = data_root_dir().ok_or_else(|| {
                FeedmergeError::Config(
                    "cannot determine a data directory; set feed.file explicitly".to_string(),
                )
            })?;
            self.feed.file = default_feed_file(&root, &info.app_id)
                .to_string_lossy()
                .into_owned();
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(FeedmergeError::Config(
                "no sources specified; add feed URLs to the \"sources\" array".to_string(),
            ));
        }
        if self.max_items == 0 {
            return Err(FeedmergeError::Config(
                "max_items must be greater than zero".to_string(),
            ));
        }
        if self.schedule.min_interval_mins == 0 {
            return Err(FeedmergeError::Config(
                "schedule.min_interval_mins must be at least 1".to_string(),
            ));
        }
        if self.schedule.min_interval_mins > self.schedule.max_interval_mins {
            return Err(FeedmergeError::Config(format!(
                "schedule.min_interval_mins ({}) is greater than schedule.max_interval_mins ({})",
                self.schedule.min_interval_mins, self.schedule.max_interval_mins
            )));
        }
        self.listen_addr()?;
        if !self.server.path.starts_with('/') {
            return Err(FeedmergeError::Config(format!(
                "server.path must start with '/': {}",
                self.server.path
            )));
        }
        if self.server.path == "/health" {
            return Err(FeedmergeError::Config(
                "server.path cannot be /health".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server.addr.parse().map_err(|e| {
            FeedmergeError::Config(format!("invalid server.addr {}: {e}", self.server.addr))
        })
    }
}

fn default_feed_file(root: &Path, app_id: &str) -> PathBuf {
    root.join(app_id).join(format!("{app_id}.xml"))
}

/// Per-user data directory of the current platform.
pub fn data_root_dir() -> Option<PathBuf> {
    data_root_from(
        std::env::consts::OS,
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("APPDATA").map(PathBuf::from),
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from),
    )
}

fn data_root_from(
    os: &str,
    xdg_data_home: Option<PathBuf>,
    app_data: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    let non_empty = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty());

    match os {
        "windows" => non_empty(app_data)
            .or_else(|| non_empty(home).map(|h| h.join("AppData").join("Roaming"))),
        "macos" => non_empty(home).map(|h| h.join("Library").join("Application Support")),
        _ => non_empty(xdg_data_home)
            .or_else(|| non_empty(home).map(|h| h.join(".local").join("share"))),
    }
}
