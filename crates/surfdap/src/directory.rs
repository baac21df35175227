//! Root factory: connect, secure, bind, and verify the base DN.

use crate::connection::Connection;
use crate::dn::{same_dn, DistinguishedName};
use crate::entry::AttributeSelection;
use crate::node::{Node, MATCH_ALL_FILTER};
use crate::session::{LdapConnector, RealLdapConnector};
use crate::Result;
use std::sync::Arc;
use surfdap_core::{DirectoryConfig, Error, SearchScope};
use tracing::{debug, info};

/// Builds bound root nodes from a [`DirectoryConfig`].
pub struct Directory {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
}

impl Directory {
    /// Creates a directory that connects with `ldap3`.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self { config, connector }
    }

    /// Creates a directory with a custom connector.
    #[must_use]
    pub fn with_connector(config: DirectoryConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// The configuration roots are built from.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Connects, binds, and returns the verified root node.
    ///
    /// An empty bind DN skips the bind and proceeds anonymously. An empty base DN roots the
    /// tree at the root DSE. Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDn`] if a non-empty base DN is malformed (before any network activity)
    /// - [`Error::Transport`] / [`Error::SecurityNegotiation`] if connecting fails
    /// - [`Error::Authentication`] if the bind is rejected
    /// - [`Error::BaseDnResolution`] unless the base DN resolves to exactly one entry
    pub async fn bind_root(&self) -> Result<Node> {
        if !self.config.base_dn.trim().is_empty() {
            DistinguishedName::parse(&self.config.base_dn)?;
        }

        let mut session = self.connector.connect().await?;

        if self.config.is_anonymous() {
            debug!("no bind DN configured, continuing anonymously");
        } else {
            session
                .simple_bind(&self.config.bind_dn, self.config.bind_password())
                .await?;
            info!(bind_dn = %self.config.bind_dn, "bound to directory");
        }

        let connection = Connection::new(session, self.config.limits);
        let root = Node::new_root(self.config.base_dn.clone(), connection);
        verify_base(&root).await?;

        info!(base_dn = %root.dn(), "root node ready");
        Ok(root)
    }
}

async fn verify_base(root: &Node) -> Result<()> {
    let entries = root
        .search_entries(
            SearchScope::Base,
            MATCH_ALL_FILTER,
            AttributeSelection::IdentityOnly,
        )
        .await?;

    match entries.as_slice() {
        [entry] if same_dn(&entry.dn, root.dn()) => Ok(()),
        _ => Err(Error::BaseDnResolution {
            dn: root.dn().to_string(),
            matches: entries
                .iter()
                .filter(|entry| same_dn(&entry.dn, root.dn()))
                .count(),
        }),
    }
}
