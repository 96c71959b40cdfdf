//! Configuration: API profiles, cache store and degradation policy.
//!
//! Persisted as TOML, by default at `$XDG_CONFIG_HOME/gait/config.toml`.
//! Every field has a default, so an empty or missing file yields the built-in
//! `github` and `countries` profiles and a local Blazegraph cache.
//!
//! ```toml
//! timeout_secs = 10
//!
//! [cache]
//! backend = "remote"
//! endpoint = "http://localhost:9999/blazegraph/namespace/kb/sparql"
//! on_failure = "bypass"
//!
//! [[apis]]
//! name = "github"
//! template = "paginated-connection"
//! endpoint = "https://api.github.com/graphql"
//! token_env = "GITHUB_TOKEN"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compiler::QueryTemplate;
use crate::error::{ConfigError, ConfigResult};
use crate::ontology::{self, OntologySource};
use crate::registry::{ApiProfile, ApiRegistry};

/// What to do when the cache store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFailurePolicy {
    /// Log a warning and serve the request uncached.
    #[default]
    Bypass,
    /// Abort the request with the cache error.
    Fail,
}

/// Which store holds cache records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// A remote SPARQL 1.1 endpoint.
    #[default]
    Remote,
    /// An embedded oxigraph store (in memory unless `path` is set).
    Embedded,
    /// No caching at all.
    Disabled,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// SPARQL endpoint for the remote backend.
    #[serde(default = "default_cache_endpoint")]
    pub endpoint: String,
    /// Directory for a persistent embedded store.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub on_failure: CacheFailurePolicy,
    /// Write the upstream response back into the record after dispatch.
    #[serde(default = "default_true")]
    pub store_results: bool,
    /// Answer cache hits that carry a result without calling upstream.
    #[serde(default)]
    pub reuse_cached_result: bool,
}

fn default_cache_endpoint() -> String {
    "http://localhost:9999/blazegraph/namespace/kb/sparql".into()
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            endpoint: default_cache_endpoint(),
            path: None,
            on_failure: CacheFailurePolicy::default(),
            store_results: default_true(),
            reuse_cached_result: false,
        }
    }
}

/// One `[[apis]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Variant tag, matched case-insensitively against intents.
    pub name: String,
    pub template: QueryTemplate,
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Environment variable holding a bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Turtle mapping file; defaults to the bundled mapping of the same name.
    #[serde(default)]
    pub ontology: Option<PathBuf>,
}

impl ApiConfig {
    /// Build the runtime profile, reading the token from the environment.
    pub fn to_profile(&self) -> ConfigResult<ApiProfile> {
        let name = self.name.to_lowercase();
        let source = match &self.ontology {
            Some(path) => OntologySource::File(path.clone()),
            None if ontology::bundled(&name).is_some() => OntologySource::Bundled(name.clone()),
            None => {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "api \"{}\" has no bundled mapping; set `ontology` to a Turtle file",
                        self.name
                    ),
                });
            }
        };
        let mut profile = ApiProfile::new(&name, self.template, source, self.endpoint.clone());
        if let Some(var) = &self.token_env {
            match std::env::var(var) {
                Ok(token) if !token.is_empty() => profile = profile.with_bearer_token(token),
                _ => tracing::warn!(api = %name, env = %var, "bearer token variable is not set"),
            }
        }
        Ok(profile)
    }
}

fn default_apis() -> Vec<ApiConfig> {
    vec![
        ApiConfig {
            name: "github".into(),
            template: QueryTemplate::PaginatedConnection,
            endpoint: "https://api.github.com/graphql".into(),
            token_env: Some("GITHUB_TOKEN".into()),
            ontology: None,
        },
        ApiConfig {
            name: "countries".into(),
            template: QueryTemplate::SimpleNested,
            endpoint: "https://countries.trevorblades.com/".into(),
            token_env: None,
            ontology: None,
        },
    ]
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaitConfig {
    /// Timeout for every remote call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_apis")]
    pub apis: Vec<ApiConfig>,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            cache: CacheConfig::default(),
            apis: default_apis(),
        }
    }
}

impl GaitConfig {
    /// `$XDG_CONFIG_HOME/gait/config.toml`, falling back to `~/.config`.
    pub fn default_path() -> ConfigResult<PathBuf> {
        let config_home = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .map_err(|_| ConfigError::NoHome)?,
        };
        Ok(config_home.join("gait").join("config.toml"))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Load `path` if given, else the default location if it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default = Self::default_path()?;
        if default.exists() {
            Self::load(&default)
        } else {
            tracing::debug!(path = %default.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "timeout_secs must be > 0".into(),
            });
        }
        if self.apis.is_empty() {
            return Err(ConfigError::Invalid {
                message: "at least one [[apis]] entry is required".into(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for api in &self.apis {
            if !seen.insert(api.name.to_lowercase()) {
                return Err(ConfigError::Invalid {
                    message: format!("api \"{}\" is defined twice", api.name),
                });
            }
        }
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: format!("cannot serialize config: {e}"),
        })
    }

    /// Build the API registry described by `[[apis]]`.
    pub fn registry(&self) -> ConfigResult<ApiRegistry> {
        let mut registry = ApiRegistry::new();
        for api in &self.apis {
            registry.register(api.to_profile()?);
        }
        Ok(registry)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
