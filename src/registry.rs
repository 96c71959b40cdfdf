//! API registry: variant tag → profile.
//!
//! A profile bundles everything that differs between upstream GraphQL APIs:
//! the mapping store, the query template, the endpoint and its auth. Shared
//! code looks profiles up here instead of branching on the tag. Tags are
//! normalized to lowercase for case-insensitive matching.

use std::collections::BTreeMap;

use crate::compiler::QueryTemplate;
use crate::error::CompileError;
use crate::ontology::OntologySource;

/// Everything needed to compile for and talk to one upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiProfile {
    /// Normalized variant tag.
    pub name: String,
    /// Query shape emitted for this API.
    pub template: QueryTemplate,
    /// Concept mapping document.
    pub ontology: OntologySource,
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Bearer token sent as `Authorization`, if the API needs one.
    pub bearer_token: Option<String>,
}

impl ApiProfile {
    pub fn new(
        name: &str,
        template: QueryTemplate,
        ontology: OntologySource,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_lowercase(),
            template,
            ontology,
            endpoint: endpoint.into(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// The public GitHub GraphQL API with the bundled mapping.
    pub fn github() -> Self {
        Self::new(
            "github",
            QueryTemplate::PaginatedConnection,
            OntologySource::Bundled("github".into()),
            "https://api.github.com/graphql",
        )
    }

    /// The public countries GraphQL API with the bundled mapping.
    pub fn countries() -> Self {
        Self::new(
            "countries",
            QueryTemplate::SimpleNested,
            OntologySource::Bundled("countries".into()),
            "https://countries.trevorblades.com/",
        )
    }
}

/// Immutable table of registered API profiles.
#[derive(Debug, Clone, Default)]
pub struct ApiRegistry {
    profiles: BTreeMap<String, ApiProfile>,
}

impl ApiRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the two built-in profiles.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ApiProfile::github());
        registry.register(ApiProfile::countries());
        registry
    }

    /// Register a profile, replacing any previous profile with the same tag.
    pub fn register(&mut self, profile: ApiProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Look up a profile by tag (case-insensitive).
    pub fn profile(&self, api: &str) -> Result<&ApiProfile, CompileError> {
        self.profiles
            .get(&api.to_lowercase())
            .ok_or_else(|| CompileError::UnsupportedApi {
                api: api.to_string(),
                known: self.names().join(", "),
            })
    }

    /// Registered tags in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ApiProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
