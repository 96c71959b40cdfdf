//! Semantic cache: prompt text → compiled query (and upstream result).
//!
//! Records live in a graph store as one resource per prompt, addressed by
//! `urn:prompt:<percent-encoded prompt>`:
//!
//! ```text
//! <urn:prompt:...> a cache:CachedEntry ;
//!     cache:originalPrompt   "..." ;
//!     cache:hasNLPResponse   "..." ;   # raw intent JSON
//!     cache:hasGraphQLQuery  "..." ;
//!     cache:hasUpstreamResult "..." ;  # optional
//!     cache:createdAt "..."^^xsd:dateTime .
//! ```
//!
//! Keys are the literal prompt text: no case folding, no whitespace
//! normalization. Records expire after [`CACHE_TTL_SECS`]; expiry is lazy, checked
//! and enforced by [`SemanticCache::get`]. Writes always overwrite.

pub mod backend;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::error::CacheResult;
use crate::sparql::{literal, Bindings, XSD_NS};

pub use backend::{CacheBackend, LocalSparqlStore, RemoteSparqlStore};

/// Record vocabulary namespace.
pub const CACHE_NS: &str = "http://example.org/cache#";

/// Scheme prefix of record IRIs.
pub const PROMPT_URN_PREFIX: &str = "urn:prompt:";

/// Time-to-live of every record, in seconds.
pub const CACHE_TTL_SECS: i64 = 10 * 60;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Record IRI for a prompt.
pub fn prompt_key(prompt: &str) -> String {
    format!("{PROMPT_URN_PREFIX}{}", urlencoding::encode(prompt))
}

/// A cached compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Record IRI, see [`prompt_key`].
    pub key: String,
    /// Original prompt text.
    pub prompt: String,
    /// Raw intent JSON the query was compiled from.
    pub intent_raw: String,
    /// Compiled GraphQL query.
    pub compiled_query: String,
    /// Raw upstream response, if one was stored.
    pub result: Option<String>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Whether the record has outlived `ttl` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.created_at >= ttl
    }
}

/// TTL-bounded prompt cache over a SPARQL-capable store.
pub struct SemanticCache {
    backend: Box<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl SemanticCache {
    /// A cache using wall-clock time.
    pub fn new(backend: Box<dyn CacheBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// A cache using `clock` for timestamps and expiry.
    pub fn with_clock(backend: Box<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            ttl: TimeDelta::seconds(CACHE_TTL_SECS),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    /// Fetch the live record for `prompt`.
    ///
    /// An expired (or unreadable) record is deleted as part of this call and
    /// reported as a miss, so two reads around the TTL boundary may differ.
    pub fn get(&self, prompt: &str) -> CacheResult<Option<CacheRecord>> {
        let key = prompt_key(prompt);
        let rows = self.backend.select(&select_record(&key))?;
        let Some(row) = rows.into_iter().next() else {
            tracing::debug!(key = %key, "cache miss");
            return Ok(None);
        };

        let record = match record_from_row(&key, row) {
            Ok(record) => record,
            Err(message) => {
                tracing::warn!(key = %key, %message, "discarding unreadable cache record");
                self.backend.update(&delete_record(&key))?;
                return Ok(None);
            }
        };

        let now = self.clock.now();
        if record.is_expired(now, self.ttl) {
            tracing::debug!(
                key = %key,
                age_secs = (now - record.created_at).num_seconds(),
                "cache record expired"
            );
            self.backend.update(&delete_record(&key))?;
            return Ok(None);
        }

        tracing::debug!(key = %key, has_result = record.result.is_some(), "cache hit");
        Ok(Some(record))
    }

    /// Store a record for `prompt`, replacing any existing one.
    pub fn put(
        &self,
        prompt: &str,
        compiled_query: &str,
        intent_raw: &str,
        result: Option<&str>,
    ) -> CacheResult<CacheRecord> {
        let record = CacheRecord {
            key: prompt_key(prompt),
            prompt: prompt.to_string(),
            intent_raw: intent_raw.to_string(),
            compiled_query: compiled_query.to_string(),
            result: result.map(str::to_string),
            created_at: self.clock.now(),
        };
        self.backend.update(&insert_record(&record))?;
        tracing::debug!(key = %record.key, has_result = result.is_some(), "cache record stored");
        Ok(record)
    }

    /// Remove the record for `prompt`. Absent records are not an error.
    pub fn delete(&self, prompt: &str) -> CacheResult<()> {
        let key = prompt_key(prompt);
        self.backend.update(&delete_record(&key))?;
        tracing::debug!(key = %key, "cache record deleted");
        Ok(())
    }
}

impl std::fmt::Debug for SemanticCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticCache")
            .field("backend", &self.backend.describe())
            .field("ttl", &self.ttl)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SPARQL text
// ---------------------------------------------------------------------------

fn prefixes() -> String {
    format!("PREFIX cache: <{CACHE_NS}>\nPREFIX xsd: <{XSD_NS}>\n")
}

fn select_record(key: &str) -> String {
    format!(
        "{prefixes}SELECT ?prompt ?intent ?query ?createdAt ?result WHERE {{\n\
         \x20 <{key}> a cache:CachedEntry ;\n\
         \x20   cache:originalPrompt ?prompt ;\n\
         \x20   cache:hasNLPResponse ?intent ;\n\
         \x20   cache:hasGraphQLQuery ?query ;\n\
         \x20   cache:createdAt ?createdAt .\n\
         \x20 OPTIONAL {{ <{key}> cache:hasUpstreamResult ?result . }}\n\
         }} LIMIT 1",
        prefixes = prefixes(),
    )
}

fn delete_record(key: &str) -> String {
    format!("DELETE WHERE {{ <{key}> ?p ?o . }}")
}

fn insert_record(record: &CacheRecord) -> String {
    let key = &record.key;
    let result = record
        .result
        .as_deref()
        .map(|r| format!(" ;\n    cache:hasUpstreamResult {}", literal(r)))
        .unwrap_or_default();
    format!(
        "{prefixes}DELETE WHERE {{ <{key}> ?p ?o . }} ;\n\
         INSERT DATA {{\n\
         \x20 <{key}> a cache:CachedEntry ;\n\
         \x20   cache:originalPrompt {prompt} ;\n\
         \x20   cache:hasNLPResponse {intent} ;\n\
         \x20   cache:hasGraphQLQuery {query} ;\n\
         \x20   cache:createdAt \"{created}\"^^xsd:dateTime{result} .\n\
         }}",
        prefixes = prefixes(),
        prompt = literal(&record.prompt),
        intent = literal(&record.intent_raw),
        query = literal(&record.compiled_query),
        created = record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

fn record_from_row(key: &str, mut row: Bindings) -> Result<CacheRecord, String> {
    let result = row.remove("result");
    let mut take = |var: &str| {
        row.remove(var)
            .ok_or_else(|| format!("missing ?{var} in cache record"))
    };
    let created_raw = take("createdAt")?;
    let prompt = take("prompt")?;
    let intent_raw = take("intent")?;
    let compiled_query = take("query")?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map_err(|e| format!("bad createdAt \"{created_raw}\": {e}"))?
        .with_timezone(&Utc);
    Ok(CacheRecord {
        key: key.to_string(),
        prompt,
        intent_raw,
        compiled_query,
        result,
        created_at,
    })
}
