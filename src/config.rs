//! Configuration constants and runtime settings.

use std::time::Duration;

use url::Url;

/// Base URL of the Hanser eLibrary catalog.
pub const CATALOG_URL: &str = "https://www.hanser-elibrary.com";

/// Request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// User agent string identifying this tool.
pub const USER_AGENT: &str = concat!("isbn2pdf/", env!("CARGO_PKG_VERSION"));

/// Runtime settings shared by the resolver and the downloader.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chapter links are resolved against this URL.
    pub base_url: Url,
    pub timeout: Duration,
}

impl Config {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self { base_url, timeout }
    }

    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout = Duration::from_secs_f64(seconds);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        #[allow(clippy::expect_used)] // Constant URL that is guaranteed to parse
        let base_url = Url::parse(CATALOG_URL).expect("valid catalog URL");
        Self {
            base_url,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        }
    }
}
