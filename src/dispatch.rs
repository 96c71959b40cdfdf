//! Dispatcher: send a compiled query to its upstream GraphQL API.
//!
//! One POST per query, body `{"query": "..."}`, with the endpoint and bearer
//! token taken from the API profile. The response body is returned as raw
//! text; nothing here parses GraphQL results. Failures are not retried.

use std::time::Duration;

use crate::error::{DispatchError, DispatchResult};
use crate::registry::ApiProfile;

/// Maximum number of response-body characters kept in error diagnostics.
const ERROR_BODY_PREVIEW: usize = 500;

/// Something that can execute a compiled query for a profile.
pub trait Upstream: Send + Sync {
    /// Send `query` to the API described by `profile`; return the raw body.
    fn dispatch(&self, query: &str, profile: &ApiProfile) -> DispatchResult<String>;
}

/// Blocking HTTP dispatcher backed by `ureq`.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    http: ureq::Agent,
}

impl HttpDispatcher {
    /// A dispatcher whose calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Upstream for HttpDispatcher {
    fn dispatch(&self, query: &str, profile: &ApiProfile) -> DispatchResult<String> {
        let mut request = self
            .http
            .post(&profile.endpoint)
            .set("Accept", "application/json");
        if let Some(token) = &profile.bearer_token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        tracing::info!(api = %profile.name, endpoint = %profile.endpoint, "dispatching query");
        match request.send_json(serde_json::json!({ "query": query })) {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| DispatchError::Transport {
                        api: profile.name.clone(),
                        message: format!("HTTP {status} but failed to read body: {e}"),
                    })?;
                tracing::info!(api = %profile.name, status, bytes = body.len(), "upstream answered");
                Ok(body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                tracing::warn!(api = %profile.name, status, "upstream rejected query");
                Err(DispatchError::Status {
                    api: profile.name.clone(),
                    status,
                    body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(DispatchError::Transport {
                api: profile.name.clone(),
                message: transport.to_string(),
            }),
        }
    }
}
