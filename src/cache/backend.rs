//! Graph stores the semantic cache can live in.
//!
//! The cache only needs SPARQL SELECT and SPARQL UPDATE. [`RemoteSparqlStore`]
//! speaks the SPARQL 1.1 protocol to a networked triple store (Blazegraph,
//! Fuseki, oxigraph-server); [`LocalSparqlStore`] runs the same text against an
//! embedded oxigraph store. Neither retries: one call, one round trip.

use std::time::Duration;

use oxigraph::store::Store;

use crate::error::{CacheError, CacheResult};
use crate::sparql::{self, Bindings};

/// SPARQL SELECT/UPDATE access to the store holding cache records.
pub trait CacheBackend: Send + Sync {
    /// Run a SELECT and return its solution rows.
    fn select(&self, query: &str) -> CacheResult<Vec<Bindings>>;

    /// Run an UPDATE request.
    fn update(&self, update: &str) -> CacheResult<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

fn unavailable(message: impl Into<String>) -> CacheError {
    CacheError::Unavailable {
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Embedded store
// ---------------------------------------------------------------------------

/// Cache records in an embedded oxigraph store.
pub struct LocalSparqlStore {
    store: Store,
}

impl LocalSparqlStore {
    /// A new in-memory store (lost on exit).
    pub fn in_memory() -> CacheResult<Self> {
        let store = Store::new().map_err(|e| unavailable(format!("failed to create store: {e}")))?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at `path`.
    pub fn open(path: &std::path::Path) -> CacheResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            unavailable(format!("failed to create {}: {e}", path.display()))
        })?;
        let store = Store::open(path)
            .map_err(|e| unavailable(format!("failed to open store at {}: {e}", path.display())))?;
        Ok(Self { store })
    }

    /// Number of triples currently stored.
    pub fn len(&self) -> usize {
        self.store.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for LocalSparqlStore {
    fn select(&self, query: &str) -> CacheResult<Vec<Bindings>> {
        let results = self
            .store
            .query(query)
            .map_err(|e| unavailable(format!("SPARQL query failed: {e}")))?;
        sparql::collect_solutions(results).map_err(unavailable)
    }

    fn update(&self, update: &str) -> CacheResult<()> {
        self.store
            .update(update)
            .map_err(|e| unavailable(format!("SPARQL update failed: {e}")))
    }

    fn describe(&self) -> String {
        "embedded oxigraph".into()
    }
}

impl std::fmt::Debug for LocalSparqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSparqlStore").finish()
    }
}

// ---------------------------------------------------------------------------
// Remote store
// ---------------------------------------------------------------------------

/// Cache records in a remote SPARQL 1.1 endpoint.
#[derive(Debug)]
pub struct RemoteSparqlStore {
    endpoint: String,
    http: ureq::Agent,
}

impl RemoteSparqlStore {
    /// Talk to `endpoint` with the given per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn post_form(&self, field: &str, body: &str, accept: &str) -> CacheResult<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .set("Accept", accept)
            .send_form(&[(field, body)]);
        match response {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| unavailable(format!("failed to read response: {e}"))),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let preview: String = body.chars().take(300).collect();
                Err(unavailable(format!(
                    "{} answered HTTP {code}: {preview}",
                    self.endpoint
                )))
            }
            Err(ureq::Error::Transport(transport)) => Err(unavailable(format!(
                "cannot reach {}: {transport}",
                self.endpoint
            ))),
        }
    }
}

impl CacheBackend for RemoteSparqlStore {
    fn select(&self, query: &str) -> CacheResult<Vec<Bindings>> {
        let body = self.post_form("query", query, "application/sparql-results+json")?;
        sparql::parse_results_json(&body).map_err(unavailable)
    }

    fn update(&self, update: &str) -> CacheResult<()> {
        self.post_form("update", update, "*/*").map(|_| ())
    }

    fn describe(&self) -> String {
        format!("SPARQL endpoint {}", self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_store_runs_update_then_select() {
        let store = LocalSparqlStore::in_memory().unwrap();
        store
            .update(r#"INSERT DATA { <urn:k> <urn:v> "1" }"#)
            .unwrap();
        let rows = store.select("SELECT ?v WHERE { <urn:k> <urn:v> ?v }").unwrap();
        assert_eq!(rows[0]["v"], "1");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn local_store_syntax_error_is_unavailable() {
        let store = LocalSparqlStore::in_memory().unwrap();
        assert!(matches!(
            store.update("INSERT GARBAGE").unwrap_err(),
            CacheError::Unavailable { .. }
        ));
    }

    #[test]
    fn local_store_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = LocalSparqlStore::open(dir.path()).unwrap();
            store.update(r#"INSERT DATA { <urn:k> <urn:v> "1" }"#).unwrap();
        }
        let store = LocalSparqlStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unreachable_remote_is_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments.
        let store = RemoteSparqlStore::new("http://127.0.0.1:9/sparql", Duration::from_millis(500));
        let err = store.select("SELECT * WHERE { ?s ?p ?o }").unwrap_err();
        assert!(matches!(err, CacheError::Unavailable { .. }));
    }
}
