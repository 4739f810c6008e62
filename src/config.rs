//! Client configuration.
//!
//! A [`Config`] is loaded once (from defaults, a TOML file, and optional environment overrides)
//! and then handed to [`Client`](crate::Client) or [`HttpSession`](crate::HttpSession). It is
//! read-only afterwards.
//!
//! ```toml
//! base_url = "https://www.emailnator.com"
//! timeout = 15
//! use_http2 = true
//! generation_modes = ["dotGmail", "plusGmail"]
//! proxy = "socks5://127.0.0.1:9050"
//! ```

use crate::{Error, Result};
use reqwest::Url;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default Emailnator landing page.
pub const DEFAULT_BASE_URL: &str = "https://www.emailnator.com";
/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
/// Default browser-like user agent.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0";

const ENV_BASE_URL: &str = "EMAILNATOR_BASE_URL";
const ENV_TIMEOUT: &str = "EMAILNATOR_TIMEOUT";
const ENV_PROXY: &str = "EMAILNATOR_PROXY";
const ENV_USER_AGENT: &str = "EMAILNATOR_USER_AGENT";

/// Address flavours Emailnator can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationMode {
    /// An address on one of Emailnator's own domains.
    #[serde(rename = "domain")]
    Domain,
    /// A Gmail address with a `+tag` suffix.
    #[serde(rename = "plusGmail")]
    PlusGmail,
    /// A Gmail address with dots inserted in the local part.
    #[serde(rename = "dotGmail")]
    DotGmail,
    /// A `@googlemail.com` address.
    #[serde(rename = "googleMail")]
    GoogleMail,
}

impl GenerationMode {
    /// The flag name sent to the vendor.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Domain => "domain",
            GenerationMode::PlusGmail => "plusGmail",
            GenerationMode::DotGmail => "dotGmail",
            GenerationMode::GoogleMail => "googleMail",
        }
    }
}

/// Typed client settings.
///
/// Build one with [`Config::default`], [`Config::from_file`], or [`Config::load`], then adjust
/// it with the `with_*` methods. Proxy values that mean "no proxy" (`""`, `"None"`, `"null"`)
/// are normalised to `None` here so they never reach the HTTP layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "BASE_URL")]
    base_url: String,
    #[serde(alias = "TIMEOUT", deserialize_with = "deserialize_timeout")]
    timeout: Duration,
    #[serde(alias = "USE_HTTP2")]
    use_http2: bool,
    #[serde(alias = "USER_AGENT")]
    user_agent: String,
    #[serde(alias = "PROXY", deserialize_with = "deserialize_proxy")]
    proxy: Option<String>,
    #[serde(alias = "GMAIL_CONFIG", deserialize_with = "deserialize_modes")]
    generation_modes: Vec<GenerationMode>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_http2: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            generation_modes: vec![GenerationMode::DotGmail, GenerationMode::PlusGmail],
        }
    }
}

impl Config {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading configuration file");
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Load configuration with precedence:
    /// 1. `EMAILNATOR_*` environment variables
    /// 2. the configuration file, when given and present
    /// 3. defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = path {
            if path.exists() {
                info!(path = %path.display(), "loading configuration from file");
                config = Self::from_file(path)?;
            } else {
                warn!(path = %path.display(), "configuration file not found, using defaults");
            }
        }

        let config = config.with_env_overrides()?;
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Apply `EMAILNATOR_BASE_URL`, `EMAILNATOR_TIMEOUT`, `EMAILNATOR_PROXY` and
    /// `EMAILNATOR_USER_AGENT` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::Config(format!("invalid {ENV_TIMEOUT} `{timeout}`: {e}")))?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(proxy) = lookup(ENV_PROXY) {
            self.proxy = normalize_proxy(Some(proxy));
        }
        if let Some(user_agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = user_agent;
        }
        Ok(self)
    }

    /// Check that the settings can be turned into a working HTTP client.
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base_url `{}`: {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base_url must be http or https, got `{}`",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        if self.generation_modes.is_empty() {
            return Err(Error::Config(
                "generation_modes must name at least one mode".into(),
            ));
        }
        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(Error::Config(
                "user_agent contains characters not allowed in a header".into(),
            ));
        }
        if let Some(proxy) = &self.proxy {
            Url::parse(proxy)
                .map_err(|e| Error::Config(format!("invalid proxy `{proxy}`: {e}")))?;
        }
        Ok(())
    }

    /// Vendor base URL (landing page and API root).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Timeout applied to every request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether HTTP/2 may be negotiated.
    pub fn use_http2(&self) -> bool {
        self.use_http2
    }

    /// User agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Proxy URL, or `None` for a direct connection.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Modes posted to the address-generation endpoint.
    pub fn generation_modes(&self) -> &[GenerationMode] {
        &self.generation_modes
    }

    /// Override the vendor base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable HTTP/2.
    pub fn with_http2(mut self, enabled: bool) -> Self {
        self.use_http2 = enabled;
        self
    }

    /// Override the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Route all requests through a proxy. `"None"` and `""` clear it.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = normalize_proxy(Some(proxy.into()));
        self
    }

    /// Connect directly.
    pub fn without_proxy(mut self) -> Self {
        self.proxy = None;
        self
    }

    /// Override the generation modes.
    pub fn with_generation_modes(
        mut self,
        modes: impl IntoIterator<Item = GenerationMode>,
    ) -> Self {
        self.generation_modes = modes.into_iter().collect();
        self
    }
}

fn normalize_proxy(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("null")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn deserialize_proxy<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_proxy(Option::<String>::deserialize(deserializer)?))
}

fn deserialize_timeout<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Duration::from_secs(u64::deserialize(deserializer)?))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(GenerationMode),
    Many(Vec<GenerationMode>),
}

fn deserialize_modes<'de, D>(deserializer: D) -> std::result::Result<Vec<GenerationMode>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(mode) => vec![mode],
        OneOrMany::Many(modes) => modes,
    })
}
