//! Request pipeline: prompt + intent → cached or freshly compiled query → upstream.
//!
//! Stages, in order:
//!
//! 1. parse and validate the intent
//! 2. look up the API profile
//! 3. check the semantic cache by prompt text
//! 4. on a miss, resolve mappings, compile, and store the record
//! 5. dispatch upstream (or answer from a cached result)
//!
//! A failure in stages 1, 2 or 4 aborts the request before anything is sent
//! upstream. Cache outages follow [`CacheFailurePolicy`].
//!
//! Concurrent requests for the same prompt are not coordinated: both may
//! miss, compile and write. Records are a pure function of their inputs, so
//! the second write only repeats the first.

use std::sync::Arc;

use crate::cache::{CacheRecord, LocalSparqlStore, RemoteSparqlStore, SemanticCache};
use crate::compiler::QueryCompiler;
use crate::config::{CacheBackendKind, CacheFailurePolicy, GaitConfig};
use crate::dispatch::{HttpDispatcher, Upstream};
use crate::error::{CacheError, CacheResult, GaitResult};
use crate::intent::Intent;
use crate::ontology::{OntologyResolver, ResolvedMapping};
use crate::registry::ApiRegistry;

/// How the cache participated in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// A live record supplied the compiled query.
    Hit,
    /// No live record; the query was compiled and stored.
    Miss,
    /// The cache store failed and the request went ahead without it.
    Bypassed,
    /// No cache is configured.
    Disabled,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
            Self::Bypassed => write!(f, "bypassed"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Cache behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub on_failure: CacheFailurePolicy,
    pub store_results: bool,
    pub reuse_cached_result: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            on_failure: CacheFailurePolicy::Bypass,
            store_results: true,
            reuse_cached_result: false,
        }
    }
}

/// Result of compiling (or recalling) the query for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub intent: Intent,
    pub compiled_query: String,
    pub cache: CacheStatus,
    /// Upstream response carried by the cache record, if any.
    pub cached_result: Option<String>,
}

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub compiled_query: String,
    /// Raw upstream response text.
    pub response: String,
    pub cache: CacheStatus,
    /// Whether `response` came from the cache instead of upstream.
    pub response_from_cache: bool,
}

/// The end-to-end request handler.
pub struct QueryPipeline {
    registry: Arc<ApiRegistry>,
    resolver: OntologyResolver,
    compiler: QueryCompiler,
    cache: Option<SemanticCache>,
    upstream: Box<dyn Upstream>,
    options: CacheOptions,
}

impl QueryPipeline {
    /// Assemble a pipeline from parts.
    pub fn new(
        registry: ApiRegistry,
        cache: Option<SemanticCache>,
        upstream: Box<dyn Upstream>,
        options: CacheOptions,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            resolver: OntologyResolver::from_registry(&registry),
            compiler: QueryCompiler::new(Arc::clone(&registry)),
            registry,
            cache,
            upstream,
            options,
        }
    }

    /// Build the pipeline a config file describes.
    pub fn from_config(config: &GaitConfig) -> GaitResult<Self> {
        let registry = config.registry()?;
        let cache = build_cache(config)?;
        let upstream = Box::new(HttpDispatcher::new(config.timeout()));
        let options = CacheOptions {
            on_failure: config.cache.on_failure,
            store_results: config.cache.store_results,
            reuse_cached_result: config.cache.reuse_cached_result,
        };
        tracing::info!(
            apis = ?registry.names(),
            cache = ?cache,
            on_failure = ?options.on_failure,
            "pipeline ready"
        );
        Ok(Self::new(registry, cache, upstream, options))
    }

    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &OntologyResolver {
        &self.resolver
    }

    pub fn cache(&self) -> Option<&SemanticCache> {
        self.cache.as_ref()
    }

    /// Resolve and compile without touching the cache or upstream.
    pub fn compile(&self, intent: &Intent) -> GaitResult<String> {
        self.registry.profile(&intent.api)?;
        let ResolvedMapping { target, sub_entity } = self.resolver.resolve(intent)?;
        Ok(self.compiler.compile(intent, &target, &sub_entity)?)
    }

    /// Stages 1–4: produce the compiled query for `prompt`.
    pub fn prepare(&self, prompt: &str, intent_raw: &str) -> GaitResult<Prepared> {
        let intent = Intent::from_json(intent_raw)?;
        self.registry.profile(&intent.api)?;

        let mut status = match &self.cache {
            Some(_) => CacheStatus::Miss,
            None => CacheStatus::Disabled,
        };

        if let Some(cache) = &self.cache {
            match self.guard(cache.get(prompt))? {
                Some(Some(record)) => {
                    tracing::info!(api = %intent.api, "cache hit, reusing compiled query");
                    let CacheRecord {
                        compiled_query,
                        result,
                        ..
                    } = record;
                    return Ok(Prepared {
                        intent,
                        compiled_query,
                        cache: CacheStatus::Hit,
                        cached_result: result,
                    });
                }
                Some(None) => {}
                None => status = CacheStatus::Bypassed,
            }
        }

        let compiled_query = self.compile(&intent)?;
        tracing::info!(api = %intent.api, cache = %status, "compiled fresh query");

        if status == CacheStatus::Miss {
            if let Some(cache) = &self.cache {
                if self
                    .guard(cache.put(prompt, &compiled_query, intent_raw, None))?
                    .is_none()
                {
                    status = CacheStatus::Bypassed;
                }
            }
        }

        Ok(Prepared {
            intent,
            compiled_query,
            cache: status,
            cached_result: None,
        })
    }

    /// Run the whole pipeline for one request.
    pub fn run(&self, prompt: &str, intent_raw: &str) -> GaitResult<PipelineOutcome> {
        let prepared = self.prepare(prompt, intent_raw)?;

        if self.options.reuse_cached_result {
            if let Some(response) = prepared.cached_result {
                tracing::info!(api = %prepared.intent.api, "answering from cached result");
                return Ok(PipelineOutcome {
                    compiled_query: prepared.compiled_query,
                    response,
                    cache: prepared.cache,
                    response_from_cache: true,
                });
            }
        }

        let profile = self.registry.profile(&prepared.intent.api)?;
        let response = self.upstream.dispatch(&prepared.compiled_query, profile)?;

        let mut cache_status = prepared.cache;
        // Only fresh records take a result; rewriting a hit would restart its TTL.
        if self.options.store_results && cache_status == CacheStatus::Miss {
            if let Some(cache) = &self.cache {
                let stored = cache.put(prompt, &prepared.compiled_query, intent_raw, Some(&response));
                if self.guard(stored)?.is_none() {
                    cache_status = CacheStatus::Bypassed;
                }
            }
        }

        Ok(PipelineOutcome {
            compiled_query: prepared.compiled_query,
            response,
            cache: cache_status,
            response_from_cache: false,
        })
    }

    /// Apply the failure policy: `Ok(None)` means "carry on without the cache".
    fn guard<T>(&self, result: CacheResult<T>) -> Result<Option<T>, CacheError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self.options.on_failure {
                CacheFailurePolicy::Fail => Err(err),
                CacheFailurePolicy::Bypass => {
                    tracing::warn!(error = %err, "cache unavailable, continuing uncached");
                    Ok(None)
                }
            },
        }
    }
}

impl std::fmt::Debug for QueryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPipeline")
            .field("apis", &self.registry.names())
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish()
    }
}

fn build_cache(config: &GaitConfig) -> GaitResult<Option<SemanticCache>> {
    let backend: Box<dyn crate::cache::CacheBackend> = match config.cache.backend {
        CacheBackendKind::Disabled => return Ok(None),
        CacheBackendKind::Remote => Box::new(RemoteSparqlStore::new(
            config.cache.endpoint.clone(),
            config.timeout(),
        )),
        CacheBackendKind::Embedded => match &config.cache.path {
            Some(path) => Box::new(LocalSparqlStore::open(path)?),
            None => Box::new(LocalSparqlStore::in_memory()?),
        },
    };
    Ok(Some(SemanticCache::new(backend)))
}
