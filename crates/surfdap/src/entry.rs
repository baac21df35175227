//! Directory entries and attribute selection.

use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;

/// Attribute map of an entry.
///
/// Attribute names are sorted; each attribute keeps its values in the order the directory
/// returned them.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// LDAP attribute selector meaning "return no attributes".
pub const NO_ATTRIBUTES: &str = "1.1";

/// LDAP attribute selector meaning "return all user attributes".
pub const ALL_ATTRIBUTES: &str = "*";

/// A single directory object returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map.
    pub attributes: Attributes,
}

impl DirectoryEntry {
    /// Creates an entry without attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Attributes::new(),
        }
    }

    /// Adds values for an attribute, appending to any already present.
    #[must_use]
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes.get(attribute).map(Vec::as_slice)
    }
}

/// Which attributes a search asks the directory to return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AttributeSelection {
    /// Only the DN is needed; the directory is asked for no attributes.
    #[default]
    IdentityOnly,
    /// All user attributes.
    All,
    /// The named attributes.
    Named(Vec<String>),
}

impl AttributeSelection {
    /// Selects the named attributes; an empty list selects identity only.
    #[must_use]
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            Self::IdentityOnly
        } else {
            Self::Named(names)
        }
    }

    /// Attribute list to put on the wire.
    #[must_use]
    pub fn to_request_list(&self) -> Vec<String> {
        match self {
            Self::IdentityOnly => vec![NO_ATTRIBUTES.to_string()],
            Self::All => vec![ALL_ATTRIBUTES.to_string()],
            Self::Named(names) => names.clone(),
        }
    }
}

impl From<&[&str]> for AttributeSelection {
    fn from(names: &[&str]) -> Self {
        Self::named(names.iter().copied())
    }
}

impl FromStr for AttributeSelection {
    type Err = Infallible;

    /// Parses a comma-separated list: empty selects identity only, a lone `*` selects all.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let names: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if names == [ALL_ATTRIBUTES] {
            return Ok(Self::All);
        }
        Ok(Self::named(names))
    }
}
