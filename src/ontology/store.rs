//! In-memory mapping store backed by oxigraph.
//!
//! Each API variant gets one store, parsed from a Turtle document and then
//! only ever queried.

use oxigraph::io::RdfFormat;
use oxigraph::store::Store;

use crate::error::{OntologyError, OntologyResult};
use crate::sparql::{self, Bindings};

/// Read-only SPARQL view over one API's concept mappings.
pub struct MappingStore {
    api: String,
    store: Store,
}

impl MappingStore {
    /// Parse a Turtle document into a fresh in-memory store.
    pub fn from_turtle(api: &str, turtle: &str) -> OntologyResult<Self> {
        let load_err = |message: String| OntologyError::MappingLoad {
            api: api.to_string(),
            message,
        };
        let store = Store::new().map_err(|e| load_err(format!("failed to create store: {e}")))?;
        store
            .load_from_reader(RdfFormat::Turtle, turtle.as_bytes())
            .map_err(|e| load_err(format!("invalid Turtle: {e}")))?;
        let store = Self {
            api: api.to_string(),
            store,
        };
        tracing::debug!(api, triples = store.len(), "loaded mapping store");
        Ok(store)
    }

    /// Read and parse a Turtle file.
    pub fn from_path(api: &str, path: &std::path::Path) -> OntologyResult<Self> {
        let turtle = std::fs::read_to_string(path).map_err(|e| OntologyError::MappingLoad {
            api: api.to_string(),
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_turtle(api, &turtle)
    }

    /// Run a SELECT and return its solutions in discovery order.
    pub fn select(&self, query: &str) -> OntologyResult<Vec<Bindings>> {
        let query_err = |message: String| OntologyError::Query {
            api: self.api.clone(),
            message,
        };
        let results = self
            .store
            .query(query)
            .map_err(|e| query_err(format!("SPARQL query failed: {e}")))?;
        sparql::collect_solutions(results).map_err(query_err)
    }

    /// Number of triples in the store.
    pub fn len(&self) -> usize {
        self.store.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingStore")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}
