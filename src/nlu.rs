//! Language-understanding boundary.
//!
//! Turning free text into an [`Intent`](crate::intent::Intent) happens outside
//! this crate. [`IntentSource`] is the seam; [`FixtureIntentSource`] stands in
//! for the real service and returns one canned intent per API.

/// Produces raw intent JSON for a prompt.
pub trait IntentSource: Send + Sync {
    /// Return the intent JSON for `prompt`, targeting the API tagged `api`.
    fn intent_for(&self, prompt: &str, api: &str) -> String;
}

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

/// Canned intents keyed only by API; the prompt text is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureIntentSource;

impl IntentSource for FixtureIntentSource {
    fn intent_for(&self, prompt: &str, api: &str) -> String {
        tracing::debug!(api, prompt_len = prompt.len(), "using fixture intent");
        if api.eq_ignore_ascii_case("countries") {
            COUNTRIES_INTENT.to_string()
        } else {
            GITHUB_INTENT.to_string()
        }
    }
}
