use serde::Deserialize;

/// Main configuration structure for Pagesweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub output: OutputConfig,
}

/// The listing site being scraped and the selectors that describe its markup
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Base listing URL; page 1 is fetched from exactly this URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Query parameter carrying the page number for pages 2..N
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Selector matching one listing card
    #[serde(rename = "card-selector")]
    pub card_selector: String,

    /// Selector matching the row sub-elements inside a card
    #[serde(rename = "row-selector")]
    pub row_selector: String,

    /// Selector matching the pagination counter ("current / total")
    #[serde(rename = "counter-selector")]
    pub counter_selector: String,
}

/// Which session implementation drives page loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Plain HTTP with a persistent cookie store
    Http,
    /// A Chrome session driven over the WebDriver protocol
    Webdriver,
}

/// Session behaviour: backend choice and bounded waits
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_backend")]
    pub backend: SessionBackend,

    /// WebDriver server endpoint (only used by the webdriver backend)
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Upper bound for navigation, readiness and visibility waits (seconds)
    #[serde(rename = "load-timeout-secs", default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    /// Pause after scrolling so lazy-loaded content can settle (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub browser: BrowserOptions,
}

/// Browser launch options recognised by the webdriver backend
///
/// Unknown keys are rejected so a typo never silently changes how the browser starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserOptions {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(rename = "disable-gpu", default = "default_true")]
    pub disable_gpu: bool,

    #[serde(rename = "no-sandbox", default)]
    pub no_sandbox: bool,

    #[serde(rename = "disable-dev-shm-usage", default)]
    pub disable_dev_shm_usage: bool,

    /// Window size as "WIDTH,HEIGHT"
    #[serde(rename = "window-size", default = "default_window_size")]
    pub window_size: String,

    /// Accept-Language for the browser, e.g. "hu-HU"
    #[serde(default)]
    pub lang: Option<String>,

    #[serde(default)]
    pub platform: Platform,
}

/// Host platform, used to add the flags a headless Chrome needs there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Auto,
    Linux,
    Windows,
    Macos,
}

/// Run report rendering policy
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Failure entries shown in the error summary before the overflow line
    #[serde(rename = "max-shown", default = "default_max_shown")]
    pub max_shown: usize,

    /// Maximum characters of detail text per failure entry
    #[serde(rename = "max-entry-chars", default = "default_max_entry_chars")]
    pub max_entry_chars: usize,

    /// Whether the report carries every extracted record or only the counts
    #[serde(rename = "include-records", default = "default_true")]
    pub include_records: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding stored run reports
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Fixed offset used for the local view of report timestamps
    #[serde(rename = "local-utc-offset", default = "default_local_utc_offset")]
    pub local_utc_offset: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_page_param() -> String {
    "page".to_string()
}
fn default_backend() -> SessionBackend {
    SessionBackend::Http
}
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_load_timeout_secs() -> u64 {
    30
}
fn default_settle_delay_ms() -> u64 {
    1500
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}
fn default_true() -> bool {
    true
}
fn default_window_size() -> String {
    "1920,1080".to_string()
}
fn default_max_shown() -> usize {
    10
}
fn default_max_entry_chars() -> usize {
    500
}
fn default_local_utc_offset() -> String {
    "+01:00".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            webdriver_url: default_webdriver_url(),
            load_timeout_secs: default_load_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            user_agent: default_user_agent(),
            browser: BrowserOptions::default(),
        }
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            disable_gpu: true,
            no_sandbox: false,
            disable_dev_shm_usage: false,
            window_size: default_window_size(),
            lang: None,
            platform: Platform::Auto,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_shown: default_max_shown(),
            max_entry_chars: default_max_entry_chars(),
            include_records: true,
        }
    }
}

impl Platform {
    /// Resolves `Auto` to the platform this binary was built for
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(target_os = "linux") => Self::Linux,
            Self::Auto if cfg!(target_os = "windows") => Self::Windows,
            Self::Auto if cfg!(target_os = "macos") => Self::Macos,
            other => other,
        }
    }
}

impl BrowserOptions {
    /// Translates the options into Chrome command-line arguments
    pub fn to_args(&self, user_agent: &str) -> Vec<String> {
        let mut args = Vec::new();

        if self.headless {
            args.push("--headless=new".to_string());
        }
        if self.disable_gpu {
            args.push("--disable-gpu".to_string());
        }

        // Containers and CI hosts on Linux need these for Chrome to start at all
        let linux = self.platform.resolve() == Platform::Linux;
        if self.no_sandbox || linux {
            args.push("--no-sandbox".to_string());
        }
        if self.disable_dev_shm_usage || linux {
            args.push("--disable-dev-shm-usage".to_string());
        }
        if self.platform.resolve() == Platform::Windows {
            args.push("--disable-features=RendererCodeIntegrity".to_string());
        }

        args.push(format!("--window-size={}", self.window_size));
        if let Some(lang) = &self.lang {
            args.push(format!("--lang={}", lang));
        }
        args.push(format!("--user-agent={}", user_agent));

        args
    }
}
