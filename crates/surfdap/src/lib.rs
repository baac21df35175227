//! Navigate an LDAP directory tree as a graph of lightweight nodes.
//!
//! A [`Directory`] connects, binds and verifies the configured base DN, then hands out the
//! root [`Node`]. From there, [`Node::search`] and [`Node::children`] produce derived nodes that
//! share the root's connection and remember their parent. Nodes never cache attributes;
//! [`CachedNode`] is the opt-in variant that keeps the payload a search returned.
//!
//! ```no_run
//! # async fn run() -> surfdap::Result<()> {
//! use surfdap::{AttributeSelection, Directory, DirectoryConfig, SearchScope, MATCH_ALL_FILTER};
//!
//! let config = DirectoryConfig::new("ldap.example.com", 389, "dc=example,dc=com")?
//!     .with_bind("cn=reader,dc=example,dc=com", "secret");
//! let root = Directory::new(config).bind_root().await?;
//!
//! for child in root.children(MATCH_ALL_FILTER, AttributeSelection::IdentityOnly).await? {
//!     println!("{} -> {:?}", child.dn(), child.attributes().await?.get("description"));
//! }
//!
//! let people = root
//!     .search(SearchScope::Subtree, "(objectClass=person)", AttributeSelection::IdentityOnly)
//!     .await?;
//! println!("{} people", people.len());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

mod cached;
mod connection;
mod directory;
mod dn;
mod entry;
mod format;
mod node;
mod session;

pub use cached::CachedNode;
pub use connection::Connection;
pub use directory::Directory;
pub use dn::{DistinguishedName, DistinguishedNameError, RelativeDistinguishedName};
pub use entry::{AttributeSelection, Attributes, DirectoryEntry, ALL_ATTRIBUTES, NO_ATTRIBUTES};
pub use format::{format_entry, format_json, format_results};
pub use node::{Node, MATCH_ALL_FILTER};
pub use session::{LdapConnector, LdapSession, RealLdapConnector, SearchRequest};
pub use surfdap_core::{DirectoryConfig, Error, SearchLimits, SearchScope};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = surfdap_core::Result<T>;
