//! Text rendering of entries and search results.

use crate::entry::DirectoryEntry;
use surfdap_core::SearchScope;

/// Renders one entry block: a `dn:` line, one `name: value` line per value, and a blank line.
#[must_use]
pub fn format_entry(entry: &DirectoryEntry) -> String {
    let mut out = entry_lines(entry);
    out.push('\n');
    out
}

/// Renders a search result.
///
/// A base-scope result is one block: the entry lines followed by a single blank line. One-level
/// and subtree results are a sequence of blocks, each closed by a blank line, followed by one
/// more blank line.
#[must_use]
pub fn format_results(scope: SearchScope, entries: &[DirectoryEntry]) -> String {
    let mut out = String::new();
    match scope {
        SearchScope::Base => {
            for entry in entries {
                out.push_str(&entry_lines(entry));
            }
        }
        SearchScope::OneLevel | SearchScope::Subtree => {
            for entry in entries {
                out.push_str(&format_entry(entry));
            }
        }
    }
    out.push('\n');
    out
}

/// Renders entries as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns the serializer error if rendering fails.
pub fn format_json(entries: &[DirectoryEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(entries)
}

fn entry_lines(entry: &DirectoryEntry) -> String {
    let mut out = format!("dn: {}\n", entry.dn);
    for (name, values) in &entry.attributes {
        for value in values {
            out.push_str(&format!("{name}: {value}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(uid: &str) -> DirectoryEntry {
        DirectoryEntry::new(format!("uid={uid},ou=People,dc=example,dc=com"))
            .with_attribute("uid", [uid])
            .with_attribute("objectClass", ["top", "person"])
    }

    #[test]
    fn single_entry_block() {
        assert_eq!(
            format_entry(&person("jdoe")),
            "dn: uid=jdoe,ou=People,dc=example,dc=com\n\
             objectClass: top\n\
             objectClass: person\n\
             uid: jdoe\n\
             \n"
        );
    }

    #[test]
    fn base_scope_is_one_block() {
        assert_eq!(
            format_results(SearchScope::Base, &[person("jdoe")]),
            format_entry(&person("jdoe"))
        );
    }

    #[test]
    fn multi_scope_separates_blocks_and_adds_trailing_blank() {
        let rendered = format_results(SearchScope::OneLevel, &[person("a"), person("b")]);
        assert_eq!(
            rendered,
            "dn: uid=a,ou=People,dc=example,dc=com\n\
             objectClass: top\n\
             objectClass: person\n\
             uid: a\n\
             \n\
             dn: uid=b,ou=People,dc=example,dc=com\n\
             objectClass: top\n\
             objectClass: person\n\
             uid: b\n\
             \n\
             \n"
        );
        assert_eq!(
            format_results(SearchScope::Subtree, &[person("a"), person("b")]),
            rendered
        );
    }

    #[test]
    fn empty_results() {
        assert_eq!(format_results(SearchScope::Base, &[]), "\n");
        assert_eq!(format_results(SearchScope::Subtree, &[]), "\n");
    }

    #[test]
    fn json_rendering() {
        let json = format_json(&[person("jdoe")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["dn"], "uid=jdoe,ou=People,dc=example,dc=com");
        assert_eq!(value[0]["attributes"]["objectClass"][1], "person");
    }
}
