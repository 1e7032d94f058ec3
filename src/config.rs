//! Configuration types for the IRAC summary service.
//!
//! Every knob lives in [`ServerConfig`], built via [`ServerConfigBuilder`].
//! The defaults reproduce the service's documented behaviour: port 5002,
//! `gpt-4o` at temperature 0.2 with a 2 000-token cap, and per-client quotas
//! of 100/day and 30/hour plus 10/minute on the summary endpoint.

use crate::error::StartupError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default listening port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 5002;

/// Configuration for the IRAC summary server.
///
/// Built via [`ServerConfig::builder()`] or using [`ServerConfig::default()`].
///
/// # Example
/// ```rust
/// use irac_brief::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .port(8080)
///     .summary_per_minute(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.socket_addr().port(), 8080);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind. Default: 0.0.0.0.
    pub host: IpAddr,

    /// TCP port. Default: 5002.
    pub port: u16,

    /// Directory where uploads are persisted while their text is extracted.
    /// Created at startup. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Directory holding `index.html`, served at `/`. Default: `static`.
    pub static_dir: PathBuf,

    /// Largest accepted request body in bytes. Default: 32 MiB.
    pub max_upload_bytes: usize,

    /// Completion settings.
    pub completion: CompletionSettings,

    /// Per-client request quotas.
    pub limits: RateLimits,

    /// PDFium shared library file, or the directory containing it. If None,
    /// the working directory and then the system library path are searched.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: 32 * 1024 * 1024,
            completion: CompletionSettings::default(),
            limits: RateLimits::default(),
            pdfium_lib_path: None,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parameters of every completion request.
///
/// These are fixed per process: callers of the HTTP API cannot change them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSettings {
    /// Provider name understood by `edgequake_llm::ProviderFactory`. Default: "openai".
    pub provider: String,

    /// Model identifier. Default: "gpt-4o".
    pub model: String,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2000.
    pub max_tokens: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            max_tokens: 2000,
        }
    }
}

/// Per-client-address request quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    /// Requests per day, across all routes. Default: 100.
    pub per_day: u32,
    /// Requests per hour, across all routes. Default: 30.
    pub per_hour: u32,
    /// Requests per minute to `POST /api/generate_irac`. Default: 10.
    pub summary_per_minute: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_day: 100,
            per_hour: 30,
            summary_per_minute: 10,
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.config.completion.provider = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.completion.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.completion.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.completion.max_tokens = n;
        self
    }

    pub fn per_day(mut self, n: u32) -> Self {
        self.config.limits.per_day = n;
        self
    }

    pub fn per_hour(mut self, n: u32) -> Self {
        self.config.limits.per_hour = n;
        self
    }

    pub fn summary_per_minute(mut self, n: u32) -> Self {
        self.config.limits.summary_per_minute = n;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, StartupError> {
        let c = &self.config;
        let l = &c.limits;
        if l.per_day == 0 || l.per_hour == 0 || l.summary_per_minute == 0 {
            return Err(StartupError::InvalidConfig(format!(
                "rate limits must be ≥ 1, got {}/day, {}/hour, {}/minute",
                l.per_day, l.per_hour, l.summary_per_minute
            )));
        }
        if !(0.0..=2.0).contains(&c.completion.temperature) {
            return Err(StartupError::InvalidConfig(format!(
                "temperature must be 0.0–2.0, got {}",
                c.completion.temperature
            )));
        }
        if c.completion.max_tokens == 0 {
            return Err(StartupError::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        if c.completion.model.trim().is_empty() || c.completion.provider.trim().is_empty() {
            return Err(StartupError::InvalidConfig(
                "provider and model must not be empty".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(StartupError::InvalidConfig(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5002);
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.temperature, 0.2);
        assert_eq!(config.completion.max_tokens, 2000);
        assert_eq!(
            config.limits,
            RateLimits {
                per_day: 100,
                per_hour: 30,
                summary_per_minute: 10
            }
        );
    }

    #[test]
    fn builder_overrides_fields() {
        let config = ServerConfig::builder()
            .port(9000)
            .model("gpt-4.1-mini")
            .summary_per_minute(3)
            .upload_dir("/tmp/irac")
            .build()
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.completion.model, "gpt-4.1-mini");
        assert_eq!(config.limits.summary_per_minute, 3);
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/irac"));
    }

    #[test]
    fn zero_quota_is_rejected() {
        let err = ServerConfig::builder().per_hour(0).build().unwrap_err();
        assert!(err.to_string().contains("rate limits"), "got: {err}");
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        assert!(ServerConfig::builder().temperature(3.5).build().is_err());
        assert!(ServerConfig::builder().temperature(-0.1).build().is_err());
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        assert!(ServerConfig::builder().max_tokens(0).build().is_err());
    }
}
