//! Shared handle to one authenticated directory session.

use crate::entry::DirectoryEntry;
use crate::session::{LdapSession, SearchRequest};
use crate::Result;
use std::fmt;
use std::sync::Arc;
use surfdap_core::SearchLimits;
use tokio::sync::Mutex;
use tracing::debug;

/// Cloneable handle to a bound session.
///
/// Every node of a tree holds a clone of the same handle. Requests from concurrent tasks are
/// serialized on the session's mutex; the session stays open until [`Connection::unbind`] is
/// called or the last handle is dropped.
#[derive(Clone)]
pub struct Connection {
    session: Arc<Mutex<Box<dyn LdapSession>>>,
    limits: SearchLimits,
}

impl Connection {
    /// Wraps a bound session. `limits` apply to every request that does not carry its own.
    #[must_use]
    pub fn new(session: Box<dyn LdapSession>, limits: SearchLimits) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            limits,
        }
    }

    /// Default limits attached to searches issued through this handle.
    #[must_use]
    pub const fn limits(&self) -> SearchLimits {
        self.limits
    }

    /// Executes a search on the shared session.
    ///
    /// # Errors
    ///
    /// Propagates the session's error unchanged.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        debug!(
            base = %request.base,
            scope = %request.scope,
            filter = %request.filter,
            size_limit = request.limits.size_limit,
            time_limit = request.limits.time_limit,
            "directory search"
        );
        let mut session = self.session.lock().await;
        let entries = session.search(request).await?;
        debug!(base = %request.base, entries = entries.len(), "directory search complete");
        Ok(entries)
    }

    /// Ends the session. Nodes sharing this handle fail on their next request afterwards.
    ///
    /// # Errors
    ///
    /// Propagates the session's error unchanged.
    pub async fn unbind(&self) -> Result<()> {
        self.session.lock().await.unbind().await
    }

    /// Returns true if both handles share one session.
    #[must_use]
    pub fn same_session(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("handles", &Arc::strong_count(&self.session))
            .field("limits", &self.limits)
            .finish()
    }
}
