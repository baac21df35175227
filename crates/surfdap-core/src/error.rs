//! Error types for SurfDAP operations.
//!
//! Every failure raised while binding a root node or navigating the tree is terminal for the
//! operation that raised it. Nothing here is retried internally; callers decide what to do.

use thiserror::Error;

/// Main error type for SurfDAP operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The directory host could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// The StartTLS upgrade failed
    #[error("Security negotiation failed: {0}")]
    SecurityNegotiation(String),

    /// The bind was rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The configured base DN did not resolve to exactly one entry
    #[error("unable to resolve base DN `{dn}`: expected exactly one entry, found {matches}")]
    BaseDnResolution {
        /// The base DN that was requested
        dn: String,
        /// Number of entries the directory returned
        matches: usize,
    },

    /// A search failed at the protocol level
    #[error("Search failed: {0}")]
    Search(String),

    /// Attribute materialization of a single node did not match exactly one entry
    #[error("unable to look up `{dn}`: expected exactly one entry, found {matches}")]
    AttributeLookup {
        /// The node's distinguished name
        dn: String,
        /// Number of entries the directory returned
        matches: usize,
    },

    /// Unknown search scope token
    #[error("Invalid scope `{0}`: must be one of `base`, `one` or `sub`")]
    InvalidScope(String),

    /// Malformed distinguished name
    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Specialized result type for SurfDAP operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::SecurityNegotiation(_) => "SECURITY_NEGOTIATION_ERROR",
            Self::Authentication(_) => "AUTHENTICATION_ERROR",
            Self::BaseDnResolution { .. } => "BASE_DN_RESOLUTION_ERROR",
            Self::Search(_) => "SEARCH_ERROR",
            Self::AttributeLookup { .. } => "ATTRIBUTE_LOOKUP_INCONSISTENCY",
            Self::InvalidScope(_) => "INVALID_SCOPE",
            Self::InvalidDn(_) => "INVALID_DN",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::Timeout(_) => "TIMEOUT",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::SecurityNegotiation(_) | Self::ConfigError(_)
        )
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError(format!("failed to parse config file: {err}"))
    }
}
