//! Ontology resolver: concept label → GraphQL field/argument mappings.
//!
//! Every API variant has its own mapping store, a Turtle document of labeled
//! concepts:
//!
//! - **target** concepts carry `ex:mapsToField` and `ex:identifierArgument`
//! - **sub-entity** concepts carry `ex:mapsToField` and `ex:mapsToGraphQLType`
//!
//! Both predicates are required, so a target lookup never matches a
//! sub-entity concept and vice versa.
//! - **constraint** concepts carry `ex:mapsToArgumentField`,
//!   `ex:mapsToOrderingField` and `ex:defaultDirection`
//!
//! Lookups are exact `rdfs:label` matches. An unknown label is not an error:
//! it resolves to empty strings and the compiler emits a reduced query.
//!
//! Stores are parsed at most once per variant. The first request for a variant
//! loads it behind a [`OnceLock`]; everyone after that shares the same
//! immutable [`MappingStore`].

pub mod store;
pub mod vocab;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::error::{OntologyError, OntologyResult};
use crate::intent::Intent;
use crate::registry::ApiRegistry;
use crate::sparql::{literal, Bindings};

pub use store::MappingStore;

const GITHUB_TTL: &str = include_str!("../../data/ontology/github.ttl");
const COUNTRIES_TTL: &str = include_str!("../../data/ontology/countries.ttl");

/// Mapping document compiled into the binary for `name`, if any.
pub fn bundled(name: &str) -> Option<&'static str> {
    match name {
        "github" => Some(GITHUB_TTL),
        "countries" => Some(COUNTRIES_TTL),
        _ => None,
    }
}

/// Where a variant's mapping document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OntologySource {
    /// A document bundled via `include_str!`, by name.
    Bundled(String),
    /// A Turtle file on disk.
    File(PathBuf),
    /// Turtle text held in memory.
    Inline(String),
}

impl OntologySource {
    fn load(&self, api: &str) -> OntologyResult<MappingStore> {
        match self {
            Self::Bundled(name) => {
                let turtle = bundled(name).ok_or_else(|| OntologyError::MappingLoad {
                    api: api.to_string(),
                    message: format!("no bundled mapping named \"{name}\""),
                })?;
                MappingStore::from_turtle(api, turtle)
            }
            Self::File(path) => MappingStore::from_path(api, path),
            Self::Inline(turtle) => MappingStore::from_turtle(api, turtle),
        }
    }
}

/// Mapping for the root entity of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub field: String,
    pub identifier_argument: String,
}

/// Mapping for the nested entity, joined with the optional constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSubEntity {
    pub field: String,
    pub graphql_type: String,
    pub argument_field: String,
    pub ordering_field: String,
    pub default_direction: String,
}

/// A complete ordering clause; exists only when all parts are non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering<'a> {
    pub argument_field: &'a str,
    pub ordering_field: &'a str,
    pub direction: &'a str,
}

impl ResolvedSubEntity {
    /// The ordering clause, or `None` if any of its three parts is missing.
    pub fn ordering(&self) -> Option<Ordering<'_>> {
        if self.argument_field.is_empty()
            || self.ordering_field.is_empty()
            || self.default_direction.is_empty()
        {
            return None;
        }
        Some(Ordering {
            argument_field: &self.argument_field,
            ordering_field: &self.ordering_field,
            direction: &self.default_direction,
        })
    }
}

/// Target and sub-entity resolutions for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub target: ResolvedTarget,
    pub sub_entity: ResolvedSubEntity,
}

struct MappingSlot {
    source: OntologySource,
    store: OnceLock<Result<Arc<MappingStore>, String>>,
}

/// Resolves concept labels against per-API mapping stores.
pub struct OntologyResolver {
    slots: BTreeMap<String, MappingSlot>,
}

impl OntologyResolver {
    /// An empty resolver with no registered variants.
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// A resolver with one slot per profile in `registry`.
    pub fn from_registry(registry: &ApiRegistry) -> Self {
        let mut resolver = Self::new();
        for profile in registry.profiles() {
            resolver.register(&profile.name, profile.ontology.clone());
        }
        resolver
    }

    /// Register (or replace) the mapping source for `api`.
    pub fn register(&mut self, api: &str, source: OntologySource) {
        self.slots.insert(
            api.to_lowercase(),
            MappingSlot {
                source,
                store: OnceLock::new(),
            },
        );
    }

    /// The mapping store for `api`, loading it on first use.
    ///
    /// A failed load is remembered: mapping documents are static
    /// configuration, so retrying within the same process cannot help.
    pub fn store(&self, api: &str) -> OntologyResult<Arc<MappingStore>> {
        let key = api.to_lowercase();
        let slot = self.slots.get(&key).ok_or_else(|| OntologyError::MappingLoad {
            api: api.to_string(),
            message: "no mapping store registered for this api".into(),
        })?;
        let loaded = slot.store.get_or_init(|| {
            slot.source
                .load(&key)
                .map(Arc::new)
                .map_err(|e| match e {
                    OntologyError::MappingLoad { message, .. } => message,
                    other => other.to_string(),
                })
        });
        loaded.clone().map_err(|message| OntologyError::MappingLoad {
            api: api.to_string(),
            message,
        })
    }

    /// Look up a target concept by label.
    pub fn resolve_target(&self, label: &str, api: &str) -> OntologyResult<ResolvedTarget> {
        let store = self.store(api)?;
        let query = format!(
            "{prefixes}SELECT ?field ?identifierArgument WHERE {{\n\
             \x20 ?concept rdfs:label {label} ;\n\
             \x20          ex:{field_p} ?field ;\n\
             \x20          ex:{ident_p} ?identifierArgument .\n\
             }} LIMIT 1",
            prefixes = vocab::prefixes(),
            label = literal(label),
            field_p = vocab::MAPS_TO_FIELD,
            ident_p = vocab::IDENTIFIER_ARGUMENT,
        );
        let resolved = match store.select(&query)?.into_iter().next() {
            Some(row) => ResolvedTarget {
                field: value(&row, "field"),
                identifier_argument: value(&row, "identifierArgument"),
            },
            None => {
                tracing::warn!(api, label, "unknown target concept");
                ResolvedTarget::default()
            }
        };
        Ok(resolved)
    }

    /// Look up a sub-entity concept, optionally joined with a constraint.
    ///
    /// A missing or unknown constraint leaves the three ordering attributes
    /// empty without failing the sub-entity lookup.
    pub fn resolve_sub_entity(
        &self,
        label: &str,
        constraint: Option<&str>,
        api: &str,
    ) -> OntologyResult<ResolvedSubEntity> {
        let store = self.store(api)?;
        let constraint_block = constraint
            .map(|c| {
                format!(
                    "\x20 OPTIONAL {{\n\
                     \x20   ?constraint rdfs:label {label} ;\n\
                     \x20               ex:{arg_p} ?argumentField ;\n\
                     \x20               ex:{ord_p} ?orderingField ;\n\
                     \x20               ex:{dir_p} ?defaultDirection .\n\
                     \x20 }}\n",
                    label = literal(c),
                    arg_p = vocab::MAPS_TO_ARGUMENT_FIELD,
                    ord_p = vocab::MAPS_TO_ORDERING_FIELD,
                    dir_p = vocab::DEFAULT_DIRECTION,
                )
            })
            .unwrap_or_default();
        let query = format!(
            "{prefixes}SELECT ?field ?graphqlType ?argumentField ?orderingField ?defaultDirection WHERE {{\n\
             \x20 ?concept rdfs:label {label} ;\n\
             \x20          ex:{field_p} ?field ;\n\
             \x20          ex:{type_p} ?graphqlType .\n\
             {constraint_block}\
             }} LIMIT 1",
            prefixes = vocab::prefixes(),
            label = literal(label),
            field_p = vocab::MAPS_TO_FIELD,
            type_p = vocab::MAPS_TO_GRAPHQL_TYPE,
        );
        let resolved = match store.select(&query)?.into_iter().next() {
            Some(row) => ResolvedSubEntity {
                field: value(&row, "field"),
                graphql_type: value(&row, "graphqlType"),
                argument_field: value(&row, "argumentField"),
                ordering_field: value(&row, "orderingField"),
                default_direction: value(&row, "defaultDirection"),
            },
            None => {
                tracing::warn!(api, label, "unknown sub-entity concept");
                ResolvedSubEntity::default()
            }
        };
        if let Some(c) = constraint {
            if resolved.ordering().is_none() {
                tracing::debug!(api, constraint = c, "constraint did not resolve to an ordering");
            }
        }
        Ok(resolved)
    }

    /// Resolve everything an intent needs from its API's mapping store.
    pub fn resolve(&self, intent: &Intent) -> OntologyResult<ResolvedMapping> {
        let target = self.resolve_target(&intent.target, &intent.api)?;
        let sub_entity = self.resolve_sub_entity(
            &intent.sub_entity,
            intent.primary_constraint(),
            &intent.api,
        )?;
        Ok(ResolvedMapping { target, sub_entity })
    }
}

impl Default for OntologyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OntologyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologyResolver")
            .field("apis", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn value(row: &Bindings, var: &str) -> String {
    row.get(var).cloned().unwrap_or_default()
}
