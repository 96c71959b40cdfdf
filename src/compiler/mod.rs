//! Query compiler: intent + resolved mappings → GraphQL text.
//!
//! Two templates exist and the API profile picks one:
//!
//! - [`QueryTemplate::SimpleNested`]: `target(arg: "id") { sub { fields } }`
//! - [`QueryTemplate::PaginatedConnection`]:
//!   `target(arg: "id") { sub(first: n[, orderBy: {...}]) { nodes { fields } } }`
//!
//! Compilation is pure and deterministic. The query is assembled as a
//! [`QueryDocument`] and printed once, so string values are always escaped.
//! Field and argument names come from the mapping stores and validated
//! intents and are printed verbatim.

pub mod ast;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::intent::Intent;
use crate::ontology::{ResolvedSubEntity, ResolvedTarget};
use crate::registry::ApiRegistry;

use ast::{Argument, QueryDocument, Selection, Value};

/// Pagination argument of connection-style APIs.
const FIRST_ARGUMENT: &str = "first";
/// Wrapper field holding connection items.
const NODES_FIELD: &str = "nodes";

/// Structural shape of the emitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryTemplate {
    /// Plain nesting; no pagination, no ordering.
    SimpleNested,
    /// Relay-style connection with `first:` and an optional ordering argument.
    PaginatedConnection,
}

impl std::fmt::Display for QueryTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SimpleNested => write!(f, "simple-nested"),
            Self::PaginatedConnection => write!(f, "paginated-connection"),
        }
    }
}

/// Compiles intents against the templates registered per API.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    registry: Arc<ApiRegistry>,
}

impl QueryCompiler {
    pub fn new(registry: Arc<ApiRegistry>) -> Self {
        Self { registry }
    }

    /// Compile `intent` using the template of its API profile.
    ///
    /// Fails with [`CompileError::UnsupportedApi`] before any template is
    /// chosen when the API tag is not registered.
    pub fn compile(
        &self,
        intent: &Intent,
        target: &ResolvedTarget,
        sub_entity: &ResolvedSubEntity,
    ) -> Result<String, CompileError> {
        let profile = self.registry.profile(&intent.api)?;
        let query = compile_with(profile.template, intent, target, sub_entity);
        tracing::debug!(
            api = %profile.name,
            template = %profile.template,
            bytes = query.len(),
            "compiled query"
        );
        Ok(query)
    }
}

/// Compile with an explicit template.
pub fn compile_with(
    template: QueryTemplate,
    intent: &Intent,
    target: &ResolvedTarget,
    sub_entity: &ResolvedSubEntity,
) -> String {
    build_document(template, intent, target, sub_entity).render()
}

/// Build the query AST without printing it.
pub fn build_document(
    template: QueryTemplate,
    intent: &Intent,
    target: &ResolvedTarget,
    sub_entity: &ResolvedSubEntity,
) -> QueryDocument {
    let projection = intent.fields.iter().map(Selection::field);

    let nested = match template {
        QueryTemplate::SimpleNested => {
            Selection::field(sub_entity.field.as_str()).with_children(projection)
        }
        QueryTemplate::PaginatedConnection => {
            let mut connection = Selection::field(sub_entity.field.as_str()).with_argument(
                Argument::new(FIRST_ARGUMENT, Value::Int(i64::from(intent.limit))),
            );
            if let Some(ordering) = sub_entity.ordering() {
                connection = connection.with_argument(Argument::new(
                    ordering.argument_field,
                    Value::Object(vec![
                        ("field".into(), Value::Enum(ordering.ordering_field.into())),
                        ("direction".into(), Value::Enum(ordering.direction.into())),
                    ]),
                ));
            }
            connection.with_child(Selection::field(NODES_FIELD).with_children(projection))
        }
    };

    let root = Selection::field(target.field.as_str())
        .with_argument(Argument::new(
            target.identifier_argument.as_str(),
            Value::String(intent.identifier.clone()),
        ))
        .with_child(nested);

    QueryDocument::new(vec![root])
}
