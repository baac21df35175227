//! Directory session seam and its `ldap3` implementation.

use crate::entry::{AttributeSelection, DirectoryEntry};
use crate::Result;
use async_trait::async_trait;
use ldap3::{
    LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Scope, SearchEntry, SearchOptions,
    SearchResult,
};
use native_tls::{Certificate, TlsConnector};
use std::fmt;
use std::fs;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use surfdap_core::{DirectoryConfig, Error, SearchLimits, SearchScope};
use tokio::time::timeout;
use tracing::{debug, warn};

const TIME_LIMIT_EXCEEDED: u32 = 3;
const SIZE_LIMIT_EXCEEDED: u32 = 4;
const NO_SUCH_OBJECT: u32 = 32;

/// A fully specified search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// DN the search is relative to.
    pub base: String,
    /// Search breadth.
    pub scope: SearchScope,
    /// LDAP filter, passed through uninterpreted.
    pub filter: String,
    /// Attributes to return.
    pub attributes: AttributeSelection,
    /// Server-side limits for this request.
    pub limits: SearchLimits,
}

impl SearchRequest {
    /// Creates a request with no limits.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        scope: SearchScope,
        filter: impl Into<String>,
        attributes: AttributeSelection,
    ) -> Self {
        Self {
            base: base.into(),
            scope,
            filter: filter.into(),
            attributes,
            limits: SearchLimits::unlimited(),
        }
    }

    /// Attaches limits to the request.
    #[must_use]
    pub const fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// An established session with a directory server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapSession: Send {
    /// Authenticates the session. An empty DN performs an anonymous bind.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;

    /// Executes a search and returns the entries in directory order.
    ///
    /// A search the server stops at a size or time limit yields the entries received up to
    /// that point. A missing base yields no entries.
    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>>;

    /// Ends the session.
    async fn unbind(&mut self) -> Result<()>;
}

/// Opens sessions, performing the StartTLS upgrade when configured.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapConnector: Send + Sync {
    /// Opens a new session.
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<DirectoryConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(&self.config)?;
        let url = self.config.ldap_url()?;
        debug!(%url, starttls = self.config.use_starttls, "connecting to directory");

        let (conn, ldap) = LdapConnAsync::with_settings(settings, url.as_str())
            .await
            .map_err(|err| map_connect_error(err, self.config.use_starttls))?;
        ldap3::drive!(conn);

        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Option<Duration>,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        with_timeout(
            self.operation_timeout,
            "bind",
            self.inner.simple_bind(dn, password),
        )
        .await
        .map_err(|err| bind_error(dn, &err))?
        .and_then(LdapResult::success)
        .map_err(|err| bind_error(dn, &err))?;
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        let options = SearchOptions::new()
            .sizelimit(request.limits.size_limit)
            .timelimit(request.limits.time_limit);
        let attributes = request.attributes.to_request_list();

        let SearchResult(entries, result) = with_timeout(
            self.operation_timeout,
            "search",
            self.inner.with_search_options(options).search(
                &request.base,
                ldap_scope(request.scope),
                &request.filter,
                attributes,
            ),
        )
        .await?
        .map_err(map_search_error)?;

        let rc = result.rc;
        match search_outcome(result)? {
            SearchOutcome::Complete => {}
            SearchOutcome::Truncated => warn!(
                base = %request.base,
                rc,
                entries = entries.len(),
                "search stopped at a server limit, returning partial results"
            ),
            SearchOutcome::NoSuchObject => return Ok(Vec::new()),
        }

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(into_directory_entry)
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        with_timeout(self.operation_timeout, "unbind", self.inner.unbind())
            .await?
            .map_err(|err| Error::Transport(err.to_string()))?;
        Ok(())
    }
}

async fn with_timeout<F, T>(limit: Option<Duration>, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    match limit {
        Some(limit) => timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(format!("directory {operation} timed out"))),
        None => Ok(fut.await),
    }
}

fn ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn into_directory_entry(entry: SearchEntry) -> DirectoryEntry {
    let mut converted = DirectoryEntry::new(entry.dn);
    converted.attributes.extend(entry.attrs);
    // Values that are not valid UTF-8 arrive separately; keep them in lossy form.
    for (name, values) in entry.bin_attrs {
        converted
            .attributes
            .entry(name)
            .or_default()
            .extend(
                values
                    .iter()
                    .map(|value| String::from_utf8_lossy(value).into_owned()),
            );
    }
    converted
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new()
        .set_conn_timeout(config.connection_timeout())
        .set_starttls(config.use_starttls);

    if !config.use_starttls {
        return Ok(settings);
    }

    if config.allow_insecure_tls {
        warn!(
            host = %config.host,
            "TLS certificate verification is disabled for this directory connection"
        );
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert.as_ref() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::ConfigError(format!("failed to load CA certificate: {err}")))?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn map_connect_error(err: LdapError, starttls: bool) -> Error {
    match err {
        LdapError::Io { .. } => Error::Transport(err.to_string()),
        _ if starttls => Error::SecurityNegotiation(err.to_string()),
        _ => Error::Transport(err.to_string()),
    }
}

fn map_search_error(err: LdapError) -> Error {
    Error::Search(err.to_string())
}

fn bind_error(dn: &str, err: &dyn fmt::Display) -> Error {
    Error::Authentication(format!("bind as `{dn}` failed: {err}"))
}

/// How the final result of a search is interpreted.
#[derive(Debug, PartialEq, Eq)]
enum SearchOutcome {
    Complete,
    /// Stopped by a size or time limit; the entries so far are kept.
    Truncated,
    NoSuchObject,
}

fn search_outcome(result: LdapResult) -> Result<SearchOutcome> {
    match result.rc {
        TIME_LIMIT_EXCEEDED | SIZE_LIMIT_EXCEEDED => Ok(SearchOutcome::Truncated),
        NO_SUCH_OBJECT => Ok(SearchOutcome::NoSuchObject),
        _ => result
            .success()
            .map(|_| SearchOutcome::Complete)
            .map_err(map_search_error),
    }
}
