//! Opt-in eager variant of [`Node`].

use crate::entry::{AttributeSelection, Attributes, DirectoryEntry};
use crate::node::Node;
use crate::Result;
use std::ops::Deref;
use surfdap_core::SearchScope;

/// A [`Node`] together with the entry payload its search returned.
///
/// Attribute reads answer from the captured payload without directory traffic, so they may
/// be stale. Call [`CachedNode::refresh`] to re-read the entry. The wrapped node is still
/// available (through `Deref` or [`CachedNode::node`]) and keeps its lazy semantics.
#[derive(Debug, Clone)]
pub struct CachedNode {
    node: Node,
    entry: DirectoryEntry,
    selection: AttributeSelection,
}

impl CachedNode {
    /// Reads all attributes of `node` once and keeps them.
    ///
    /// # Errors
    ///
    /// Same as [`Node::entry`].
    pub async fn load(node: Node) -> Result<Self> {
        let selection = AttributeSelection::All;
        let entry = node.lookup(selection.clone()).await?;
        Ok(Self {
            node,
            entry,
            selection,
        })
    }

    /// The wrapped lazy node.
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Unwraps into the lazy node.
    #[must_use]
    pub fn into_node(self) -> Node {
        self.node
    }

    /// Captured entry.
    #[must_use]
    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    /// Captured attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.entry.attributes
    }

    /// Attribute selection the payload was captured with.
    #[must_use]
    pub fn selection(&self) -> &AttributeSelection {
        &self.selection
    }

    /// Re-reads the entry with the same attribute selection it was captured with.
    ///
    /// # Errors
    ///
    /// Same as [`Node::attributes`].
    pub async fn refresh(&mut self) -> Result<()> {
        self.entry = self.node.lookup(self.selection.clone()).await?;
        Ok(())
    }

    /// Searches relative to this node, keeping each result's payload.
    ///
    /// # Errors
    ///
    /// Returns the search error unchanged.
    pub async fn search(
        &self,
        scope: SearchScope,
        filter: &str,
        attributes: AttributeSelection,
    ) -> Result<Vec<CachedNode>> {
        self.node.search_cached(scope, filter, attributes).await
    }

    /// Lists immediate children, keeping each result's payload.
    ///
    /// # Errors
    ///
    /// Returns the search error unchanged.
    pub async fn children(
        &self,
        filter: &str,
        attributes: AttributeSelection,
    ) -> Result<Vec<CachedNode>> {
        self.search(SearchScope::OneLevel, filter, attributes).await
    }
}

impl Deref for CachedNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl Node {
    /// Like [`Node::search`], but keeps the payload each result came back with.
    ///
    /// # Errors
    ///
    /// Returns the search error unchanged.
    pub async fn search_cached(
        &self,
        scope: SearchScope,
        filter: &str,
        attributes: AttributeSelection,
    ) -> Result<Vec<CachedNode>> {
        let entries = self
            .search_entries(scope, filter, attributes.clone())
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| CachedNode {
                node: self.derive(entry.dn.clone()),
                entry,
                selection: attributes.clone(),
            })
            .collect())
    }
}
