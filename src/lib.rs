// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # gait
//!
//! Turns structured intents into GraphQL queries against typed upstream APIs,
//! using per-API ontologies to pick field names, argument keys and ordering,
//! and caches the result by prompt text for a bounded time.
//!
//! ## Architecture
//!
//! - **Ontology resolver** (`ontology`): exact-label SPARQL lookups over Turtle mapping stores
//! - **Query compiler** (`compiler`): GraphQL AST + printer, one template per API profile
//! - **Semantic cache** (`cache`): TTL-bounded records in a SPARQL graph store
//! - **Dispatcher** (`dispatch`): one JSON POST per query
//! - **Pipeline** (`pipeline`): cache → resolve → compile → store → dispatch
//!
//! ## Library usage
//!
//! ```no_run
//! use gait::config::GaitConfig;
//! use gait::pipeline::QueryPipeline;
//!
//! let pipeline = QueryPipeline::from_config(&GaitConfig::default()).unwrap();
//! let intent = r#"{"action":"QUERY","target":"country","identifier":"BR",
//!     "subEntity":"continent","limit":1,"fields":["name","code"],"api":"countries"}"#;
//! let outcome = pipeline.run("which continent is Brazil on?", intent).unwrap();
//! println!("{}", outcome.response);
//! ```

pub mod cache;
pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod nlu;
pub mod ontology;
pub mod pipeline;
pub mod registry;
pub mod sparql;
