//! Process configuration for the query server, the page fetcher and the client.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `CINWIKI_*` environment variables, then command-line flags (applied by
//! `main.rs`). Every section may be omitted from the file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::cinwiki::ConfigError;
use crate::wire::framing::Framing;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BASE_URL: &str = "https://pet.cin.ufpe.br/~pet/wiki/";
/// Receive buffer assumed by the single-read protocol.
pub const DEFAULT_BUFFER_BYTES: usize = 8192;
/// Silence that ends a raw message once its first bytes have arrived.
pub const DEFAULT_RAW_IDLE_MILLIS: u64 = 100;
/// Upper bound on every timeout setting.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fetcher: FetcherConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for receiving a request once a connection is accepted.
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// Outer bound on fetching and parsing one page, whatever the page source.
    pub fetch_timeout_secs: u64,
    pub max_request_bytes: usize,
    /// Raw framing only: a pause this long after the first request bytes ends
    /// the request, for peers that never half-close.
    pub raw_idle_millis: u64,
    pub framing: Framing,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout_secs: 10,
            write_timeout_secs: 10,
            fetch_timeout_secs: 20,
            max_request_bytes: DEFAULT_BUFFER_BYTES,
            raw_idle_millis: DEFAULT_RAW_IDLE_MILLIS,
            framing: Framing::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn raw_idle(&self) -> Duration {
        Duration::from_millis(self.raw_idle_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Page URL prefix; the course code is appended verbatim.
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
            user_agent: concat!("cinwiki/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Covers connect, send and receive together.
    pub timeout_secs: u64,
    pub max_response_bytes: usize,
    pub raw_idle_millis: u64,
    pub framing: Framing,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_secs: 10,
            max_response_bytes: DEFAULT_BUFFER_BYTES,
            raw_idle_millis: DEFAULT_RAW_IDLE_MILLIS,
            framing: Framing::default(),
        }
    }
}

impl ClientConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn raw_idle(&self) -> Duration {
        Duration::from_millis(self.raw_idle_millis)
    }
}

impl AppConfig {
    /// Defaults, overlaid with `path` if given, then with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => AppConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `CINWIKI_HOST`, `CINWIKI_PORT`, `CINWIKI_BASE_URL` and
    /// `CINWIKI_FRAMING`. Host, port and framing apply to both ends of the link.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("CINWIKI_HOST") {
            self.set_host(&host);
        }
        if let Some(port) = var("CINWIKI_PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid(format!("CINWIKI_PORT={port:?}: {e}")))?;
            self.set_port(port);
        }
        if let Some(base_url) = var("CINWIKI_BASE_URL") {
            self.fetcher.base_url = base_url;
        }
        if let Some(framing) = var("CINWIKI_FRAMING") {
            let framing = framing.parse::<Framing>().map_err(ConfigError::Invalid)?;
            self.set_framing(framing);
        }
        Ok(())
    }

    pub fn set_host(&mut self, host: &str) {
        self.server.host = host.to_string();
        self.client.host = host.to_string();
    }

    pub fn set_port(&mut self, port: u16) {
        self.server.port = port;
        self.client.port = port;
    }

    pub fn set_framing(&mut self, framing: Framing) {
        self.server.framing = framing;
        self.client.framing = framing;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = url::Url::parse(&self.fetcher.base_url).map_err(|e| {
            ConfigError::Invalid(format!("base_url {:?}: {e}", self.fetcher.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url {:?} must be http or https",
                self.fetcher.base_url
            )));
        }
        if !self.fetcher.base_url.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "base_url {:?} must end with '/'",
                self.fetcher.base_url
            )));
        }
        if self.server.port == 0 || self.client.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        let timeouts = [
            ("server.read_timeout_secs", self.server.read_timeout_secs),
            ("server.write_timeout_secs", self.server.write_timeout_secs),
            ("server.fetch_timeout_secs", self.server.fetch_timeout_secs),
            ("fetcher.timeout_secs", self.fetcher.timeout_secs),
            ("client.timeout_secs", self.client.timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 || value > MAX_TIMEOUT_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and {MAX_TIMEOUT_SECS}, got {value}"
                )));
            }
        }
        let idle = [
            ("server.raw_idle_millis", self.server.raw_idle_millis),
            ("client.raw_idle_millis", self.client.raw_idle_millis),
        ];
        for (name, value) in idle {
            if value == 0 || value > MAX_TIMEOUT_SECS * 1000 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and {}, got {value}",
                    MAX_TIMEOUT_SECS * 1000
                )));
            }
        }
        if self.server.max_request_bytes == 0 || self.client.max_response_bytes == 0 {
            return Err(ConfigError::Invalid("buffer sizes must be non-zero".to_string()));
        }
        Ok(())
    }
}
