//! Nodes of a directory tree.
//!
//! A [`Node`] is a locator, not a cache: it remembers a distinguished name, the connection it
//! was found through, and where it sits in the lineage of the tree. Its attributes are read
//! from the directory every time they are asked for.

use crate::connection::Connection;
use crate::dn::DistinguishedName;
use crate::entry::{AttributeSelection, Attributes, DirectoryEntry};
use crate::session::SearchRequest;
use crate::Result;
use std::fmt;
use std::sync::Arc;
use surfdap_core::{Error, SearchLimits, SearchScope};

/// Filter matching every entry.
pub const MATCH_ALL_FILTER: &str = "(objectClass=*)";

/// A directory entry bound to a connection and a position in the tree.
///
/// Cloning is cheap and keeps identity: clones compare equal, while two nodes for the same DN
/// obtained by separate searches do not (use [`Node::same_entry`] for that).
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    dn: String,
    connection: Connection,
    /// `None` on the root itself.
    root: Option<Node>,
    parent: Option<Node>,
}

impl Node {
    /// Creates a root node. The root is its own root and has no parent.
    pub(crate) fn new_root(dn: impl Into<String>, connection: Connection) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                dn: dn.into(),
                connection,
                root: None,
                parent: None,
            }),
        }
    }

    /// Creates a node found by a search issued from this one.
    pub(crate) fn derive(&self, dn: String) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                dn,
                connection: self.inner.connection.clone(),
                root: Some(self.root()),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Distinguished name of the entry.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.inner.dn
    }

    /// Parsed form of the distinguished name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDn`] if the name does not parse.
    pub fn distinguished_name(&self) -> Result<DistinguishedName> {
        Ok(DistinguishedName::parse(self.dn())?)
    }

    /// Leaf component of the DN (`ou=a` for `ou=a,dc=example,dc=com`), or the whole DN when
    /// it cannot be parsed.
    #[must_use]
    pub fn rdn(&self) -> String {
        self.distinguished_name()
            .map_or_else(|_| self.dn().to_string(), |dn| dn.leaf())
    }

    /// Connection shared by every node of this tree.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// The node originally returned by the root factory.
    #[must_use]
    pub fn root(&self) -> Node {
        self.inner.root.clone().unwrap_or_else(|| self.clone())
    }

    /// The node whose search produced this one; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<&Node> {
        self.inner.parent.as_ref()
    }

    /// Returns true for the root node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.root.is_none()
    }

    /// Number of search hops between the root and this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Parent chain from the immediate parent up to and including the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Node> + '_ {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Returns true if both nodes locate the same directory entry.
    #[must_use]
    pub fn same_entry(&self, other: &Node) -> bool {
        crate::dn::same_dn(self.dn(), other.dn())
    }

    /// Reads the entry's attributes from the directory.
    ///
    /// Every call issues a fresh base-scope search; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttributeLookup`] unless exactly one entry comes back, or the search
    /// error unchanged.
    pub async fn attributes(&self) -> Result<Attributes> {
        Ok(self.entry().await?.attributes)
    }

    /// Reads the entry (DN and attributes) from the directory.
    ///
    /// # Errors
    ///
    /// Same as [`Node::attributes`].
    pub async fn entry(&self) -> Result<DirectoryEntry> {
        self.lookup(AttributeSelection::All).await
    }

    /// Base-scope lookup of this node's own entry with the given selection.
    pub(crate) async fn lookup(&self, attributes: AttributeSelection) -> Result<DirectoryEntry> {
        let mut entries = self
            .search_entries(SearchScope::Base, MATCH_ALL_FILTER, attributes)
            .await?;
        if entries.len() != 1 {
            return Err(Error::AttributeLookup {
                dn: self.dn().to_string(),
                matches: entries.len(),
            });
        }
        Ok(entries.remove(0))
    }

    /// Runs a search relative to this node and returns one derived node per result.
    ///
    /// Results keep the directory's order. Each derived node shares this node's connection
    /// and root, and has this node as its parent.
    ///
    /// # Errors
    ///
    /// Returns the search error unchanged.
    pub async fn search(
        &self,
        scope: SearchScope,
        filter: &str,
        attributes: AttributeSelection,
    ) -> Result<Vec<Node>> {
        self.search_with_limits(scope, filter, attributes, self.connection().limits())
            .await
    }

    /// Like [`Node::search`], with explicit limits for this request.
    ///
    /// # Errors
    ///
    /// Returns the search error unchanged.
    pub async fn search_with_limits(
        &self,
        scope: SearchScope,
        filter: &str,
        attributes: AttributeSelection,
        limits: SearchLimits,
    ) -> Result<Vec<Node>> {
        let entries = self
            .search_entries_with_limits(scope, filter, attributes, limits)
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| self.derive(entry.dn))
            .collect())
    }

    /// Lists the immediate children of this node (a one-level search).
    ///
    /// # Errors
    ///
    /// Returns the search error unchanged.
    pub async fn children(&self, filter: &str, attributes: AttributeSelection) -> Result<Vec<Node>> {
        self.search(SearchScope::OneLevel, filter, attributes).await
    }

    /// Runs a search relative to this node and returns the raw entries.
    ///
    /// # Errors
    ///
    /// Returns the search error unchanged.
    pub async fn search_entries(
        &self,
        scope: SearchScope,
        filter: &str,
        attributes: AttributeSelection,
    ) -> Result<Vec<DirectoryEntry>> {
        self.search_entries_with_limits(scope, filter, attributes, self.connection().limits())
            .await
    }

    async fn search_entries_with_limits(
        &self,
        scope: SearchScope,
        filter: &str,
        attributes: AttributeSelection,
        limits: SearchLimits,
    ) -> Result<Vec<DirectoryEntry>> {
        let request =
            SearchRequest::new(self.dn(), scope, filter, attributes).with_limits(limits);
        self.connection().search(&request).await
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("dn", &self.inner.dn)
            .field("root", &self.root().dn())
            .field("parent", &self.parent().map(Node::dn))
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MockLdapSession;

    const BASE: &str = "dc=example,dc=com";

    fn root_with(session: MockLdapSession) -> Node {
        Node::new_root(
            BASE,
            Connection::new(Box::new(session), SearchLimits::unlimited()),
        )
    }

    fn entries(dns: &[&str]) -> Vec<DirectoryEntry> {
        dns.iter().map(|dn| DirectoryEntry::new(*dn)).collect()
    }

    #[test]
    fn root_is_its_own_root() {
        let root = root_with(MockLdapSession::new());
        assert_eq!(root.root(), root);
        assert!(root.parent().is_none());
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
    }

    #[tokio::test]
    async fn search_preserves_order_and_lineage() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|request| {
                request.base == BASE
                    && request.scope == SearchScope::Subtree
                    && request.filter == "(ou=*)"
                    && request.attributes == AttributeSelection::IdentityOnly
            })
            .times(1)
            .returning(|_| {
                Ok(entries(&[
                    "ou=c,dc=example,dc=com",
                    "ou=a,dc=example,dc=com",
                    "ou=b,dc=example,dc=com",
                ]))
            });
        let root = root_with(session);

        let nodes = root
            .search(SearchScope::Subtree, "(ou=*)", AttributeSelection::IdentityOnly)
            .await
            .unwrap();

        let dns: Vec<&str> = nodes.iter().map(Node::dn).collect();
        assert_eq!(
            dns,
            [
                "ou=c,dc=example,dc=com",
                "ou=a,dc=example,dc=com",
                "ou=b,dc=example,dc=com"
            ]
        );
        for node in &nodes {
            assert_eq!(node.root(), root);
            assert_eq!(node.parent(), Some(&root));
            assert!(node.connection().same_session(root.connection()));
            assert!(!node.is_root());
        }
    }

    #[tokio::test]
    async fn grandchildren_keep_the_original_root() {
        let mut session = MockLdapSession::new();
        let mut sequence = mockall::Sequence::new();
        session
            .expect_search()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(entries(&["ou=People,dc=example,dc=com"])));
        session
            .expect_search()
            .withf(|request| request.base == "ou=People,dc=example,dc=com")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(entries(&["uid=jdoe,ou=People,dc=example,dc=com"])));
        let root = root_with(session);

        let people = root
            .children(MATCH_ALL_FILTER, AttributeSelection::IdentityOnly)
            .await
            .unwrap();
        let users = people[0]
            .children(MATCH_ALL_FILTER, AttributeSelection::IdentityOnly)
            .await
            .unwrap();

        let user = &users[0];
        assert_eq!(user.root(), root);
        assert_eq!(user.parent(), Some(&people[0]));
        assert_eq!(user.depth(), 2);
        let lineage: Vec<&str> = user.ancestors().map(Node::dn).collect();
        assert_eq!(lineage, ["ou=People,dc=example,dc=com", BASE]);
        assert_eq!(user.rdn(), "uid=jdoe");
    }

    #[tokio::test]
    async fn children_search_one_level() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|request| request.scope == SearchScope::OneLevel && request.base == BASE)
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let root = root_with(session);

        let children = root
            .children(MATCH_ALL_FILTER, AttributeSelection::IdentityOnly)
            .await
            .unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn attributes_issue_base_search_every_time() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|request| {
                request.scope == SearchScope::Base
                    && request.base == BASE
                    && request.attributes == AttributeSelection::All
            })
            .times(2)
            .returning(|_| {
                Ok(vec![DirectoryEntry::new(BASE)
                    .with_attribute("objectClass", ["top", "domain"])
                    .with_attribute("dc", ["example"])])
            });
        let root = root_with(session);

        let first = root.attributes().await.unwrap();
        let second = root.attributes().await.unwrap();
        assert_eq!(first["objectClass"], ["top", "domain"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn attributes_require_exactly_one_entry() {
        let mut session = MockLdapSession::new();
        let mut sequence = mockall::Sequence::new();
        session
            .expect_search()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Vec::new()));
        session
            .expect_search()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(entries(&[BASE, BASE])));
        let root = root_with(session);

        assert_eq!(
            root.attributes().await.unwrap_err(),
            Error::AttributeLookup {
                dn: BASE.to_string(),
                matches: 0
            }
        );
        assert_eq!(
            root.attributes().await.unwrap_err(),
            Error::AttributeLookup {
                dn: BASE.to_string(),
                matches: 2
            }
        );
    }

    #[tokio::test]
    async fn search_errors_surface_unchanged() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .times(1)
            .returning(|_| Err(Error::Search("invalid filter".to_string())));
        let root = root_with(session);

        let result = root
            .search(SearchScope::Subtree, "(broken", AttributeSelection::All)
            .await;
        assert_eq!(result.unwrap_err(), Error::Search("invalid filter".to_string()));
    }

    #[tokio::test]
    async fn connection_limits_apply_unless_overridden() {
        let mut session = MockLdapSession::new();
        let mut sequence = mockall::Sequence::new();
        session
            .expect_search()
            .withf(|request| request.limits.size_limit == 25)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Vec::new()));
        session
            .expect_search()
            .withf(|request| request.limits.size_limit == 1 && request.limits.time_limit == 3)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Vec::new()));
        let root = Node::new_root(
            BASE,
            Connection::new(
                Box::new(session),
                SearchLimits::unlimited().with_size_limit(25),
            ),
        );

        root.search(SearchScope::Subtree, MATCH_ALL_FILTER, AttributeSelection::All)
            .await
            .unwrap();
        root.search_with_limits(
            SearchScope::Subtree,
            MATCH_ALL_FILTER,
            AttributeSelection::All,
            SearchLimits::unlimited().with_size_limit(1).with_time_limit(3),
        )
        .await
        .unwrap();
    }

    #[test]
    fn equality_is_identity() {
        let connection = Connection::new(Box::new(MockLdapSession::new()), SearchLimits::unlimited());
        let left = Node::new_root(BASE, connection.clone());
        let right = Node::new_root(BASE, connection);
        assert_ne!(left, right);
        assert!(left.same_entry(&right));
        assert_eq!(left, left.clone());
    }
}
