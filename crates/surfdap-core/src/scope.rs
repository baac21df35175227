//! Search scope and per-request search limits.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Breadth of a directory search relative to its base entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchScope {
    /// The base entry only.
    #[serde(rename = "base")]
    Base,
    /// Immediate children of the base entry.
    #[serde(rename = "one")]
    OneLevel,
    /// The base entry and all of its descendants.
    #[serde(rename = "sub")]
    Subtree,
}

impl SearchScope {
    /// Command-line token for this scope.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::OneLevel => "one",
            Self::Subtree => "sub",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Base),
            "one" => Ok(Self::OneLevel),
            "sub" => Ok(Self::Subtree),
            other => Err(Error::InvalidScope(other.to_string())),
        }
    }
}

/// Server-side limits attached to every search request.
///
/// A value of `0` means "no limit". Limits travel with each request instead of living in
/// process-wide state, so two connections can search with different limits side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SearchLimits {
    /// Maximum number of entries the server should return
    #[validate(range(min = 0))]
    #[serde(default)]
    pub size_limit: i32,

    /// Maximum number of seconds the server should spend on the search
    #[validate(range(min = 0))]
    #[serde(default)]
    pub time_limit: i32,
}

impl SearchLimits {
    /// Limits that impose no restriction.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            size_limit: 0,
            time_limit: 0,
        }
    }

    /// Set the size limit.
    #[must_use]
    pub const fn with_size_limit(mut self, size_limit: i32) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// Set the time limit in seconds.
    #[must_use]
    pub const fn with_time_limit(mut self, time_limit: i32) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Returns true if neither limit is set.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.size_limit == 0 && self.time_limit == 0
    }
}
