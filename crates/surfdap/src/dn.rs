//! Distinguished Name parsing for directory entries.
//!
//! Values are decoded per RFC 4514: `\,` style escapes yield the escaped character and `\XX`
//! hex pairs yield raw bytes, which are reassembled as UTF-8. The canonical form re-escapes
//! only the characters that need it, so differently escaped spellings of one name compare equal.

use std::fmt;
use thiserror::Error;

use surfdap_core::Error as CoreError;

/// Errors that can occur when parsing distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the attribute name to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
    /// Hex escapes in a value did not decode to UTF-8.
    #[error("distinguished name value `{0}` is not valid UTF-8 once unescaped")]
    InvalidUtf8(String),
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::InvalidDn(err.to_string())
    }
}

/// One `attribute=value` assertion of an RDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeDistinguishedName {
    attribute: String,
    value: String,
}

impl RelativeDistinguishedName {
    /// Attribute portion of the RDN (e.g. `ou`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Decoded attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this RDN matches the provided attribute name (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }

    fn canonical(&self) -> String {
        format!("{}={}", self.attribute, escape_value(&self.value))
    }
}

/// Parsed distinguished name.
///
/// The first RDN set is the leaf (the entry itself), the last one is the top of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    canonical: String,
    rdns: Vec<Vec<RelativeDistinguishedName>>,
}

impl DistinguishedName {
    /// Parses a distinguished name.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the name is empty or malformed.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DistinguishedNameError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let rdns = split_unescaped(input, ',')?
            .into_iter()
            .map(|set| {
                split_unescaped(set, '+')?
                    .into_iter()
                    .map(parse_assertion)
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            canonical: join_rdns(&rdns),
            rdns,
        })
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// RDN sets from leaf to top; each set holds the `+`-joined assertions.
    #[must_use]
    pub fn rdns(&self) -> &[Vec<RelativeDistinguishedName>] {
        &self.rdns
    }

    /// Canonical form of the leaf RDN set, e.g. `ou=People` for `ou=People,dc=example,dc=com`.
    #[must_use]
    pub fn leaf(&self) -> String {
        join_rdns(&self.rdns[..1])
    }

    /// Decoded value of the first assertion on `attribute` (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .flatten()
            .find(|rdn| rdn.matches_attribute(attribute))
            .map(RelativeDistinguishedName::value)
    }

    /// Returns true if both names denote the same entry.
    ///
    /// Compares the canonical forms case-insensitively, so `OU=People, DC=Example` matches
    /// `ou=people,dc=example` and `cn=a\2Cb` matches `cn=a\,b`.
    #[must_use]
    pub fn matches(&self, other: &DistinguishedName) -> bool {
        self.canonical.eq_ignore_ascii_case(&other.canonical)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Returns true if two DN strings denote the same entry.
///
/// Falls back to a case-insensitive comparison of the trimmed input when either side does not
/// parse (this covers the empty root DSE name).
pub(crate) fn same_dn(left: &str, right: &str) -> bool {
    match (DistinguishedName::parse(left), DistinguishedName::parse(right)) {
        (Ok(left), Ok(right)) => left.matches(&right),
        _ => left.trim().eq_ignore_ascii_case(right.trim()),
    }
}

/// Splits on `delimiter` outside escapes, leaving escapes in place for the next stage.
fn split_unescaped(
    input: &str,
    delimiter: char,
) -> std::result::Result<Vec<&str>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, ch) in input.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            _ if ch == delimiter => {
                parts.push(input[start..i].trim());
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    if escaped {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }
    parts.push(input[start..].trim());

    if parts.iter().any(|part| part.is_empty()) {
        return Err(DistinguishedNameError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

fn parse_assertion(
    part: &str,
) -> std::result::Result<RelativeDistinguishedName, DistinguishedNameError> {
    let (attribute, value) = part
        .split_once('=')
        .ok_or_else(|| DistinguishedNameError::InvalidComponent(part.to_string()))?;
    let attribute = attribute.trim();
    let value = value.trim_start();

    if attribute.is_empty() {
        return Err(DistinguishedNameError::MissingAttribute(part.to_string()));
    }
    if value.is_empty() {
        return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
    }

    Ok(RelativeDistinguishedName {
        attribute: attribute.to_string(),
        value: unescape_value(value)?,
    })
}

fn unescape_value(value: &str) -> std::result::Result<String, DistinguishedNameError> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            push_char(&mut bytes, ch);
            continue;
        }

        let first = chars.next().ok_or(DistinguishedNameError::UnterminatedEscape)?;
        let hex_pair = first
            .to_digit(16)
            .zip(chars.peek().and_then(|next| next.to_digit(16)));
        match hex_pair {
            Some((high, low)) => {
                chars.next();
                let byte = u8::try_from((high << 4) | low)
                    .map_err(|_| DistinguishedNameError::InvalidComponent(value.to_string()))?;
                bytes.push(byte);
            }
            None => push_char(&mut bytes, first),
        }
    }

    String::from_utf8(bytes).map_err(|_| DistinguishedNameError::InvalidUtf8(value.to_string()))
}

fn push_char(bytes: &mut Vec<u8>, ch: char) {
    let mut buf = [0; 4];
    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());

    for (i, ch) in value.chars().enumerate() {
        let special = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=');
        let leading = i == 0 && matches!(ch, ' ' | '#');
        let trailing = i == last && ch == ' ';
        if special || leading || trailing {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn join_rdns(rdns: &[Vec<RelativeDistinguishedName>]) -> String {
    rdns.iter()
        .map(|set| {
            set.iter()
                .map(RelativeDistinguishedName::canonical)
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_dn() {
        let dn = DistinguishedName::parse("ou=a, ou=People, dc=example, dc=com").unwrap();
        assert_eq!(dn.get("ou"), Some("a"));
        assert_eq!(dn.get("DC"), Some("example"));
        assert_eq!(dn.rdns().len(), 4);
        assert_eq!(dn.to_string(), "ou=a,ou=People,dc=example,dc=com");
        assert_eq!(dn.leaf(), "ou=a");
    }

    #[test]
    fn parse_dn_with_escape() {
        let dn = DistinguishedName::parse("cn=Smith\\, John,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("Smith, John"));
        assert_eq!(dn.rdns().len(), 4);
        assert_eq!(dn.leaf(), "cn=Smith\\, John");
    }

    #[test]
    fn parse_dn_with_hex_escapes() {
        let dn = DistinguishedName::parse("cn=Smith\\2C John,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("Smith, John"));
        assert_eq!(dn.leaf(), "cn=Smith\\, John");

        let dn = DistinguishedName::parse("cn=Ren\\C3\\A9,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("René"));

        assert_eq!(
            DistinguishedName::parse("cn=\\C3,dc=example,dc=com").unwrap_err(),
            DistinguishedNameError::InvalidUtf8("\\C3".to_string())
        );
    }

    #[test]
    fn parse_multi_valued_rdn() {
        let dn = DistinguishedName::parse("cn=John+uid=1234,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.rdns()[0].len(), 2);
        assert_eq!(dn.get("uid"), Some("1234"));
        assert_eq!(dn.leaf(), "cn=John+uid=1234");
    }

    #[test]
    fn invalid_dns() {
        assert_eq!(
            DistinguishedName::parse("  ").unwrap_err(),
            DistinguishedNameError::Empty
        );
        assert!(matches!(
            DistinguishedName::parse("cn=John,").unwrap_err(),
            DistinguishedNameError::InvalidComponent(_)
        ));
        assert!(matches!(
            DistinguishedName::parse("=John").unwrap_err(),
            DistinguishedNameError::MissingAttribute(_)
        ));
        assert!(matches!(
            DistinguishedName::parse("cn=").unwrap_err(),
            DistinguishedNameError::MissingValue(_)
        ));
        assert_eq!(
            DistinguishedName::parse("cn=John\\").unwrap_err(),
            DistinguishedNameError::UnterminatedEscape
        );
    }

    #[test]
    fn matching_ignores_case_and_spacing() {
        let left = DistinguishedName::parse("OU=People, DC=Example, DC=com").unwrap();
        let right = DistinguishedName::parse("ou=people,dc=example,dc=com").unwrap();
        assert!(left.matches(&right));
        assert!(same_dn("OU=People, DC=Example, DC=com", "ou=people,dc=example,dc=com"));
        assert!(!same_dn("ou=a,dc=example,dc=com", "ou=b,dc=example,dc=com"));
    }

    #[test]
    fn matching_ignores_escape_spelling() {
        assert!(same_dn(
            "cn=Smith\\2C John,dc=example,dc=com",
            "cn=Smith\\, John,dc=example,dc=com"
        ));
        assert!(same_dn("cn=Ren\\C3\\A9,dc=example,dc=com", "cn=René,dc=example,dc=com"));
        assert!(!same_dn("cn=Ren\\C3\\A9,dc=example,dc=com", "cn=Rene,dc=example,dc=com"));
    }

    #[test]
    fn empty_names_match_each_other() {
        assert!(same_dn("", " "));
        assert!(!same_dn("", "dc=example,dc=com"));
    }

    #[test]
    fn converts_into_core_error() {
        let err: CoreError = DistinguishedNameError::Empty.into();
        assert!(matches!(err, CoreError::InvalidDn(_)));
    }
}
