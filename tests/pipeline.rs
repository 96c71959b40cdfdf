//! End-to-end pipeline tests: intent → cache → resolve → compile → dispatch.
//!
//! Upstream is replaced by a recorder and the cache lives in an embedded
//! oxigraph store, so these tests need no network.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};

use gait::cache::{CacheBackend, Clock, LocalSparqlStore, SemanticCache};
use gait::config::CacheFailurePolicy;
use gait::dispatch::Upstream;
use gait::error::{
    CacheError, CacheResult, CompileError, DispatchError, DispatchResult, GaitError, IntentError,
    OntologyError,
};
use gait::pipeline::{CacheOptions, CacheStatus, QueryPipeline};
use gait::registry::{ApiProfile, ApiRegistry};
use gait::sparql::Bindings;

const GITHUB_INTENT: &str = r#"{
    "action": "QUERY",
    "target": "user",
    "identifier": "octocat",
    "subEntity": "repositories",
    "limit": 5,
    "constraints": ["most starred"],
    "fields": ["name", "description", "stargazerCount"],
    "api": "github"
}"#;

const COUNTRIES_INTENT: &str = r#"{
    "action": "QUERY",
    "target": "country",
    "identifier": "BR",
    "subEntity": "continent",
    "limit": 1,
    "constraints": [],
    "fields": ["name", "code"],
    "api": "countries"
}"#;

const GITHUB_QUERY: &str = "query {
  user(login: \"octocat\") {
    repositories(first: 5, orderBy: { field: STARGAZERS, direction: DESC }) {
      nodes {
        name
        description
        stargazerCount
      }
    }
  }
}
";

const COUNTRIES_QUERY: &str = "query {
  country(code: \"BR\") {
    continent {
      name
      code
    }
  }
}
";

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail_with: Option<u16>,
}

impl Recorder {
    fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Upstream for Recorder {
    fn dispatch(&self, query: &str, profile: &ApiProfile) -> DispatchResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((profile.name.clone(), query.to_string()));
        match self.fail_with {
            Some(status) => Err(DispatchError::Status {
                api: profile.name.clone(),
                status,
                body: "upstream says no".into(),
            }),
            None => Ok(format!(r#"{{"data":{{"call":{}}}}}"#, self.calls.lock().unwrap().len())),
        }
    }
}

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc::now())))
    }

    fn advance(&self, by: TimeDelta) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// A cache store that is always down.
struct DownBackend;

impl CacheBackend for DownBackend {
    fn select(&self, _query: &str) -> CacheResult<Vec<Bindings>> {
        Err(CacheError::Unavailable {
            message: "connection refused".into(),
        })
    }

    fn update(&self, _update: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable {
            message: "connection refused".into(),
        })
    }

    fn describe(&self) -> String {
        "down".into()
    }
}

struct Harness {
    pipeline: QueryPipeline,
    upstream: Recorder,
    clock: Arc<ManualClock>,
}

fn harness_with(upstream: Recorder, options: CacheOptions) -> Harness {
    let clock = ManualClock::new();
    let cache = SemanticCache::with_clock(
        Box::new(LocalSparqlStore::in_memory().unwrap()),
        clock.clone(),
    );
    let pipeline = QueryPipeline::new(
        ApiRegistry::builtin(),
        Some(cache),
        Box::new(upstream.clone()),
        options,
    );
    Harness {
        pipeline,
        upstream,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(Recorder::default(), CacheOptions::default())
}

fn down_pipeline(policy: CacheFailurePolicy, upstream: &Recorder) -> QueryPipeline {
    QueryPipeline::new(
        ApiRegistry::builtin(),
        Some(SemanticCache::new(Box::new(DownBackend))),
        Box::new(upstream.clone()),
        CacheOptions {
            on_failure: policy,
            ..Default::default()
        },
    )
}

// ---------------------------------------------------------------------------
// Compilation through the full pipeline
// ---------------------------------------------------------------------------

#[test]
fn github_intent_compiles_to_connection_query() {
    let h = harness();
    let outcome = h.pipeline.run("top starred repos of octocat", GITHUB_INTENT).unwrap();
    assert_eq!(outcome.compiled_query, GITHUB_QUERY);
    assert_eq!(outcome.cache, CacheStatus::Miss);
    assert_eq!(
        h.upstream.calls(),
        vec![("github".to_string(), GITHUB_QUERY.to_string())]
    );
}

#[test]
fn countries_intent_compiles_to_simple_query() {
    let h = harness();
    let outcome = h.pipeline.run("continent of Brazil", COUNTRIES_INTENT).unwrap();
    assert_eq!(outcome.compiled_query, COUNTRIES_QUERY);
    assert!(!outcome.compiled_query.contains("first"));
}

#[test]
fn simple_api_ignores_constraints() {
    let h = harness();
    let intent = COUNTRIES_INTENT.replace(r#""constraints": []"#, r#""constraints": ["most starred"]"#);
    let query = h.pipeline.prepare("p", &intent).unwrap().compiled_query;
    assert!(!query.contains("first"));
    assert!(!query.contains("orderBy"));
    assert!(!query.contains("direction"));
}

#[test]
fn unknown_constraint_omits_ordering_clause() {
    let h = harness();
    let intent = GITHUB_INTENT.replace("most starred", "most forked");
    let query = h.pipeline.prepare("p", &intent).unwrap().compiled_query;
    assert!(query.contains("repositories(first: 5) {"));
    assert!(!query.contains("orderBy"));
}

#[test]
fn unknown_labels_still_produce_balanced_query() {
    let h = harness();
    let intent = GITHUB_INTENT
        .replace(r#""target": "user""#, r#""target": "wizard""#)
        .replace(r#""subEntity": "repositories""#, r#""subEntity": "spells""#);
    let outcome = h.pipeline.run("p", &intent).unwrap();
    let query = outcome.compiled_query;
    assert!(query.starts_with("query {"));
    assert_eq!(query.matches('{').count(), query.matches('}').count());
    assert_eq!(query.matches('(').count(), query.matches(')').count());
    assert!(query.contains("stargazerCount"));
    assert_eq!(h.upstream.calls().len(), 1);
}

#[test]
fn sub_entity_label_used_as_target_does_not_half_resolve() {
    let h = harness();
    let intent = COUNTRIES_INTENT
        .replace(r#""target": "country""#, r#""target": "continent""#)
        .replace(r#""subEntity": "continent""#, r#""subEntity": "languages""#);
    let query = h.pipeline.prepare("p", &intent).unwrap().compiled_query;
    assert_eq!(query, "query {\n  languages {\n    name\n    code\n  }\n}\n");
}

#[test]
fn invalid_field_names_never_reach_upstream() {
    let h = harness();
    for bad in [r#""""#, r#""name } }""#] {
        let intent = COUNTRIES_INTENT.replace(r#""code""#, bad);
        let err = h.pipeline.run("p", &intent).unwrap_err();
        assert!(matches!(
            err,
            GaitError::Intent(IntentError::InvalidField { field: "fields", .. })
        ));
    }
    assert!(h.upstream.calls().is_empty());
}

#[test]
fn compiling_twice_is_byte_identical() {
    let h = harness();
    let intent = gait::intent::Intent::from_json(GITHUB_INTENT).unwrap();
    assert_eq!(
        h.pipeline.compile(&intent).unwrap(),
        h.pipeline.compile(&intent).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Cache behaviour
// ---------------------------------------------------------------------------

#[test]
fn second_run_with_same_prompt_reuses_compiled_query() {
    let h = harness();
    let first = h.pipeline.run("P", GITHUB_INTENT).unwrap();
    assert_eq!(first.cache, CacheStatus::Miss);

    // A different intent under the same prompt text still gets the stored query.
    let other = GITHUB_INTENT.replace(r#""limit": 5"#, r#""limit": 50"#);
    h.clock.advance(TimeDelta::minutes(5));
    let second = h.pipeline.run("P", &other).unwrap();
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(second.compiled_query, first.compiled_query);
    assert!(second.compiled_query.contains("first: 5"));
    assert_eq!(h.upstream.calls().len(), 2);
}

#[test]
fn different_prompt_text_is_a_cold_miss() {
    let h = harness();
    h.pipeline.run("P", GITHUB_INTENT).unwrap();
    let outcome = h.pipeline.run("P ", GITHUB_INTENT).unwrap();
    assert_eq!(outcome.cache, CacheStatus::Miss);
    let outcome = h.pipeline.run("p", GITHUB_INTENT).unwrap();
    assert_eq!(outcome.cache, CacheStatus::Miss);
}

#[test]
fn record_expires_after_ten_minutes() {
    let h = harness();
    h.pipeline.run("P", GITHUB_INTENT).unwrap();
    h.clock.advance(TimeDelta::minutes(10) + TimeDelta::seconds(1));

    let cache = h.pipeline.cache().unwrap();
    assert!(cache.get("P").unwrap().is_none());
    h.clock.advance(-TimeDelta::minutes(5));
    assert!(cache.get("P").unwrap().is_none(), "expired record must be deleted");

    let outcome = h.pipeline.run("P", GITHUB_INTENT).unwrap();
    assert_eq!(outcome.cache, CacheStatus::Miss);
}

#[test]
fn upstream_result_is_stored_with_record() {
    let h = harness();
    let outcome = h.pipeline.run("P", COUNTRIES_INTENT).unwrap();
    let record = h.pipeline.cache().unwrap().get("P").unwrap().unwrap();
    assert_eq!(record.result.as_deref(), Some(outcome.response.as_str()));
    assert_eq!(record.compiled_query, COUNTRIES_QUERY);
    assert!(record.intent_raw.contains("\"countries\""));
}

#[test]
fn cached_result_answers_without_upstream_when_enabled() {
    let h = harness_with(
        Recorder::default(),
        CacheOptions {
            reuse_cached_result: true,
            ..Default::default()
        },
    );
    let first = h.pipeline.run("P", COUNTRIES_INTENT).unwrap();
    let second = h.pipeline.run("P", COUNTRIES_INTENT).unwrap();
    assert!(!first.response_from_cache);
    assert!(second.response_from_cache);
    assert_eq!(second.response, first.response);
    assert_eq!(h.upstream.calls().len(), 1);
}

#[test]
fn results_are_not_stored_when_disabled() {
    let h = harness_with(
        Recorder::default(),
        CacheOptions {
            store_results: false,
            ..Default::default()
        },
    );
    h.pipeline.run("P", COUNTRIES_INTENT).unwrap();
    let record = h.pipeline.cache().unwrap().get("P").unwrap().unwrap();
    assert_eq!(record.result, None);
}

#[test]
fn cache_outage_is_bypassed_by_default() {
    let upstream = Recorder::default();
    let pipeline = down_pipeline(CacheFailurePolicy::Bypass, &upstream);
    let outcome = pipeline.run("P", GITHUB_INTENT).unwrap();
    assert_eq!(outcome.cache, CacheStatus::Bypassed);
    assert_eq!(outcome.compiled_query, GITHUB_QUERY);
    assert_eq!(upstream.calls().len(), 1);
}

#[test]
fn cache_outage_fails_request_under_fail_policy() {
    let upstream = Recorder::default();
    let pipeline = down_pipeline(CacheFailurePolicy::Fail, &upstream);
    let err = pipeline.run("P", GITHUB_INTENT).unwrap_err();
    assert!(matches!(err, GaitError::Cache(CacheError::Unavailable { .. })));
    assert!(upstream.calls().is_empty());
}

#[test]
fn no_cache_means_disabled_status() {
    let upstream = Recorder::default();
    let pipeline = QueryPipeline::new(
        ApiRegistry::builtin(),
        None,
        Box::new(upstream.clone()),
        CacheOptions::default(),
    );
    let outcome = pipeline.run("P", COUNTRIES_INTENT).unwrap();
    assert_eq!(outcome.cache, CacheStatus::Disabled);
    assert_eq!(upstream.calls().len(), 1);
}

// ---------------------------------------------------------------------------
// Errors abort before anything is sent upstream
// ---------------------------------------------------------------------------

#[test]
fn malformed_intent_is_rejected() {
    let h = harness();
    let err = h.pipeline.run("P", r#"{"target": "user"}"#).unwrap_err();
    assert!(matches!(err, GaitError::Intent(IntentError::Malformed { .. })));
    assert!(h.upstream.calls().is_empty());
}

#[test]
fn unsupported_api_is_rejected() {
    let h = harness();
    let intent = GITHUB_INTENT.replace(r#""api": "github""#, r#""api": "gitlab""#);
    let err = h.pipeline.run("P", &intent).unwrap_err();
    assert!(matches!(err, GaitError::Compile(CompileError::UnsupportedApi { .. })));
    assert!(h.upstream.calls().is_empty());
    assert!(h.pipeline.cache().unwrap().get("P").unwrap().is_none());
}

#[test]
fn broken_mapping_store_aborts_request() {
    let upstream = Recorder::default();
    let mut registry = ApiRegistry::new();
    registry.register(ApiProfile::new(
        "broken",
        gait::compiler::QueryTemplate::SimpleNested,
        gait::ontology::OntologySource::Inline("@prefix ex: <oops".into()),
        "http://localhost/graphql",
    ));
    let pipeline = QueryPipeline::new(
        registry,
        None,
        Box::new(upstream.clone()),
        CacheOptions::default(),
    );
    let intent = COUNTRIES_INTENT.replace(r#""api": "countries""#, r#""api": "broken""#);
    let err = pipeline.run("P", &intent).unwrap_err();
    assert!(matches!(err, GaitError::Ontology(OntologyError::MappingLoad { .. })));
    assert!(upstream.calls().is_empty());
}

#[test]
fn upstream_error_is_surfaced_not_retried() {
    let h = harness_with(Recorder::failing(502), CacheOptions::default());
    let err = h.pipeline.run("P", GITHUB_INTENT).unwrap_err();
    match err {
        GaitError::Dispatch(e) => assert_eq!(e.status(), Some(502)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.upstream.calls().len(), 1);

    // The compiled query was cached before dispatch and stays reusable.
    let record = h.pipeline.cache().unwrap().get("P").unwrap().unwrap();
    assert_eq!(record.compiled_query, GITHUB_QUERY);
    assert_eq!(record.result, None);
}
