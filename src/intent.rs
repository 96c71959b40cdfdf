//! Intents: the structured form of a user request.
//!
//! An [`Intent`] is produced by the language-understanding collaborator and
//! arrives here as JSON. Once parsed and validated it is never mutated.

use serde::{Deserialize, Serialize};

use crate::error::{IntentError, IntentResult};

/// The only action the bridge understands today.
pub const ACTION_QUERY: &str = "QUERY";

/// A pre-parsed user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Requested operation; always `QUERY`.
    pub action: String,
    /// Label of the root entity, e.g. `user`.
    pub target: String,
    /// Value used to select the root entity, e.g. `octocat`.
    pub identifier: String,
    /// Label of the nested collection or object, e.g. `repositories`.
    pub sub_entity: String,
    /// Page size for connection-style APIs.
    pub limit: u32,
    /// Ordering/filter labels. Only the first is consulted.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Leaf fields to project, in output order.
    pub fields: Vec<String>,
    /// API variant tag.
    pub api: String,
}

impl Intent {
    /// Parse and validate an intent from its JSON wire form.
    pub fn from_json(raw: &str) -> IntentResult<Self> {
        let intent: Intent = serde_json::from_str(raw).map_err(|e| IntentError::Malformed {
            message: e.to_string(),
        })?;
        intent.validate()?;
        Ok(intent)
    }

    /// Check the invariants the compiler relies on.
    pub fn validate(&self) -> IntentResult<()> {
        if !self.action.eq_ignore_ascii_case(ACTION_QUERY) {
            return Err(IntentError::InvalidField {
                field: "action",
                message: format!("expected {ACTION_QUERY}, got \"{}\"", self.action),
            });
        }
        if self.limit == 0 {
            return Err(IntentError::InvalidField {
                field: "limit",
                message: "must be a positive integer".into(),
            });
        }
        if self.fields.is_empty() {
            return Err(IntentError::InvalidField {
                field: "fields",
                message: "at least one field must be projected".into(),
            });
        }
        if let Some(bad) = self.fields.iter().find(|f| !is_graphql_name(f)) {
            return Err(IntentError::InvalidField {
                field: "fields",
                message: format!("\"{bad}\" is not a GraphQL field name"),
            });
        }
        if self.api.trim().is_empty() {
            return Err(IntentError::InvalidField {
                field: "api",
                message: "api tag is empty".into(),
            });
        }
        Ok(())
    }

    /// The constraint label that drives ordering, if any.
    pub fn primary_constraint(&self) -> Option<&str> {
        self.constraints.first().map(String::as_str)
    }
}

/// `[_A-Za-z][_0-9A-Za-z]*`, the GraphQL `Name` production.
fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
