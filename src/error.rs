//! Rich diagnostic error types for the gait query bridge.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so operators can tell
//! which stage of a request failed and why.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the bridge.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the CLI.
#[derive(Debug, Error, Diagnostic)]
pub enum GaitError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Intent(#[from] IntentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Intent errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IntentError {
    #[error("malformed intent: {message}")]
    #[diagnostic(
        code(gait::intent::malformed),
        help(
            "An intent is a JSON object with the keys action, target, identifier, \
             subEntity, limit, constraints, fields and api. Check the upstream \
             language-understanding output."
        )
    )]
    Malformed { message: String },

    #[error("intent field `{field}` is invalid: {message}")]
    #[diagnostic(
        code(gait::intent::invalid_field),
        help("`fields` must be non-empty, `limit` must be positive and `action` must be QUERY.")
    )]
    InvalidField { field: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("failed to load mapping store for api \"{api}\": {message}")]
    #[diagnostic(
        code(gait::ontology::load),
        help(
            "The Turtle mapping document for this API could not be read or parsed. \
             Check the `ontology` path in the API profile, or remove it to use the \
             bundled mapping."
        )
    )]
    MappingLoad { api: String, message: String },

    #[error("mapping query failed for api \"{api}\": {message}")]
    #[diagnostic(
        code(gait::ontology::query),
        help("The mapping store rejected a lookup query. This usually indicates a bug.")
    )]
    Query { api: String, message: String },
}

// ---------------------------------------------------------------------------
// Compile errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("unsupported api: \"{api}\"")]
    #[diagnostic(
        code(gait::compile::unsupported_api),
        help("Register a profile for this API in the config file, or use one of: {known}.")
    )]
    UnsupportedApi { api: String, known: String },
}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("cache store unavailable: {message}")]
    #[diagnostic(
        code(gait::cache::unavailable),
        help(
            "The SPARQL cache store could not be reached or rejected the request. \
             Check `cache.endpoint`, or set `cache.on_failure = \"bypass\"` to keep \
             serving requests uncached."
        )
    )]
    Unavailable { message: String },
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error("upstream {api} returned HTTP {status}")]
    #[diagnostic(
        code(gait::dispatch::status),
        help("The GraphQL API rejected the query. Response body: {body}")
    )]
    Status { api: String, status: u16, body: String },

    #[error("upstream {api} unreachable: {message}")]
    #[diagnostic(
        code(gait::dispatch::transport),
        help("Check network access to the API endpoint configured for this profile.")
    )]
    Transport { api: String, message: String },
}

impl DispatchError {
    /// HTTP status of the failed call, if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(gait::config::no_home),
        help("Set the HOME environment variable or pass --config explicitly.")
    )]
    NoHome,

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(gait::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(gait::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid config: {message}")]
    #[diagnostic(code(gait::config::invalid), help("{message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning bridge results.
pub type GaitResult<T> = std::result::Result<T, GaitError>;

pub type IntentResult<T> = std::result::Result<T, IntentError>;
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;
pub type CacheResult<T> = std::result::Result<T, CacheError>;
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_error_converts_to_gait_error() {
        let err = CacheError::Unavailable {
            message: "connection refused".into(),
        };
        let gait: GaitError = err.into();
        assert!(matches!(gait, GaitError::Cache(CacheError::Unavailable { .. })));
    }

    #[test]
    fn dispatch_error_exposes_status() {
        let err = DispatchError::Status {
            api: "github".into(),
            status: 401,
            body: "Bad credentials".into(),
        };
        assert_eq!(err.status(), Some(401));
        let transport = DispatchError::Transport {
            api: "github".into(),
            message: "dns".into(),
        };
        assert_eq!(transport.status(), None);
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = CompileError::UnsupportedApi {
            api: "gitlab".into(),
            known: "countries, github".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("gitlab"));
    }
}
