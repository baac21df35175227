//! Configuration structures for binding to a directory.
//!
//! A [`DirectoryConfig`] carries everything the root factory needs: where the directory lives,
//! whether to upgrade the connection with StartTLS, the bind credentials and the base DN the
//! tree is rooted at. It can be built in code, loaded from a TOML file, and overridden from
//! `SURFDAP_*` environment variables.

use crate::{Error, Result, SearchLimits};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;
use validator::Validate;

/// Default LDAP port.
pub const DEFAULT_PORT: u16 = 389;
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;

/// Environment variable overriding the host.
pub const ENV_HOST: &str = "SURFDAP_HOST";
/// Environment variable overriding the port.
pub const ENV_PORT: &str = "SURFDAP_PORT";
/// Environment variable overriding the base DN.
pub const ENV_BASE: &str = "SURFDAP_BASE";
/// Environment variable enabling StartTLS.
pub const ENV_TLS: &str = "SURFDAP_TLS";
/// Environment variable overriding the bind DN.
pub const ENV_BIND_DN: &str = "SURFDAP_BIND_DN";
/// Environment variable overriding the bind password.
pub const ENV_BIND_PW: &str = "SURFDAP_BIND_PW";

/// Configuration for binding a root node.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectoryConfig {
    /// Directory host name or address
    #[validate(length(min = 1))]
    pub host: String,

    /// Directory port
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upgrade the connection with StartTLS before binding
    #[serde(default)]
    pub use_starttls: bool,

    /// Accept any server certificate during the StartTLS upgrade.
    ///
    /// This disables certificate validation entirely and is only meant for lab directories
    /// with self-signed certificates.
    #[serde(default)]
    pub allow_insecure_tls: bool,

    /// Optional path to a custom CA certificate (PEM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Bind DN; empty means anonymous
    #[serde(default)]
    pub bind_dn: String,

    /// Bind password
    #[serde(default, skip_serializing)]
    pub bind_password: Option<SecretString>,

    /// DN of the entry the tree is rooted at; empty roots the tree at the root DSE
    pub base_dn: String,

    /// Default limits applied to every search
    #[validate(nested)]
    #[serde(default)]
    pub limits: SearchLimits,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Client-side timeout per operation in seconds; `0` disables it
    #[serde(default)]
    pub operation_timeout_secs: u64,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

impl DirectoryConfig {
    /// Create a new configuration with the required parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if validation fails.
    pub fn new(host: impl Into<String>, port: u16, base_dn: impl Into<String>) -> Result<Self> {
        let config = Self {
            host: host.into(),
            port,
            base_dn: base_dn.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the document is malformed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SURFDAP_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if an override holds an unparsable value.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `SURFDAP_*` overrides resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if an override holds an unparsable value.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            debug!(variable = ENV_HOST, "applying environment override");
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            debug!(variable = ENV_PORT, "applying environment override");
            self.port = port
                .trim()
                .parse()
                .map_err(|e| Error::ConfigError(format!("invalid {ENV_PORT} `{port}`: {e}")))?;
        }
        if let Some(base) = lookup(ENV_BASE) {
            debug!(variable = ENV_BASE, "applying environment override");
            self.base_dn = base;
        }
        if let Some(tls) = lookup(ENV_TLS) {
            debug!(variable = ENV_TLS, "applying environment override");
            self.use_starttls = parse_flag(ENV_TLS, &tls)?;
        }
        if let Some(bind_dn) = lookup(ENV_BIND_DN) {
            debug!(variable = ENV_BIND_DN, "applying environment override");
            self.bind_dn = bind_dn;
        }
        if let Some(password) = lookup(ENV_BIND_PW) {
            debug!(variable = ENV_BIND_PW, "applying environment override");
            self.bind_password = Some(SecretString::from(password));
        }
        Ok(self)
    }

    /// Validate a configuration assembled from several layers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the invalid fields.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Set the bind credentials.
    #[must_use]
    pub fn with_bind(mut self, bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_dn = bind_dn.into();
        self.bind_password = Some(SecretString::from(password.into()));
        self
    }

    /// Enable or disable the StartTLS upgrade.
    #[must_use]
    pub const fn with_starttls(mut self, enabled: bool) -> Self {
        self.use_starttls = enabled;
        self
    }

    /// Accept unverified server certificates during StartTLS.
    #[must_use]
    pub const fn with_insecure_tls(mut self, allow: bool) -> Self {
        self.allow_insecure_tls = allow;
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Set the default search limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Set the per-operation timeout in seconds (`0` disables it).
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }

    /// Returns true if no bind DN is configured.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.bind_dn.trim().is_empty()
    }

    /// Get the bind password, empty if none is configured.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password
            .as_ref()
            .map_or("", |secret| secret.expose_secret())
    }

    /// Get the connection timeout as a Duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the per-operation timeout, if one is configured.
    #[must_use]
    pub const fn operation_timeout(&self) -> Option<Duration> {
        if self.operation_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.operation_timeout_secs))
        }
    }

    /// Build the `ldap://host:port` URL for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the host cannot form a valid URL.
    pub fn ldap_url(&self) -> Result<Url> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Ok(Url::parse(&format!("ldap://{host}:{}", self.port))?)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_port(),
            use_starttls: false,
            allow_insecure_tls: false,
            tls_ca_cert: None,
            bind_dn: String::new(),
            bind_password: None,
            base_dn: String::new(),
            limits: SearchLimits::default(),
            connection_timeout_secs: default_connection_timeout_secs(),
            operation_timeout_secs: 0,
        }
    }
}

fn parse_flag(variable: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::ConfigError(format!(
            "invalid {variable} `{other}`: expected a boolean"
        ))),
    }
}
