use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NovaError, Result};

/// Top-level Nova configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment label: development, staging, production, test.
    #[serde(default = "default_environment")]
    pub environment: String,
    pub model: ModelConfig,
    #[serde(default)]
    pub fallback_models: Vec<ModelConfig>,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

fn default_environment() -> String { "development".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Full chat-completions endpoint URL. Defaults to the Upstage Solar API.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_provider() -> String { "upstage".to_string() }
fn default_model_id() -> String { "solar-pro2".to_string() }
fn default_max_tokens() -> u32 { 1024 }
fn default_temperature() -> f32 { 0.7 }

/// Backoff schedule for retried LLM calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Persona shown to users and woven into the responder prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,
    /// Extra style instructions appended to the responder system prompt.
    #[serde(default)]
    pub style_prompt: Option<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            style_prompt: None,
        }
    }
}

fn default_persona_name() -> String { "Nova".to_string() }

/// Document retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

fn default_top_k() -> usize { 3 }

/// Session history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Max messages seeded into a run from session history.
    /// The store itself is unbounded.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> usize { 40 }

/// Storage backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file path (expand ~).
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String { "~/.nova/nova.db".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }

impl AppConfig {
    /// Read and parse a TOML config file. `${VAR}` references are substituted
    /// from the environment before parsing.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| NovaError::ConfigNotFound(path.display().to_string()))?;
        let expanded = expand_env_vars(&content);
        toml::from_str(&expanded).map_err(|e| NovaError::Config(e.to_string()))
    }

    /// Build a minimal config from environment variables, for running
    /// without a config file.
    pub fn from_env() -> Self {
        let model = ModelConfig {
            provider: default_provider(),
            model_id: std::env::var("NOVA_MODEL").unwrap_or_else(|_| default_model_id()),
            api_key: std::env::var("UPSTAGE_API_KEY").ok(),
            base_url: std::env::var("NOVA_BASE_URL").ok(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            retry: None,
        };

        Self {
            environment: default_environment(),
            model,
            fallback_models: Vec::new(),
            persona: PersonaConfig::default(),
            retrieval: RetrievalConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            gateway: None,
        }
    }

    /// Resolve the database path (expand ~).
    pub fn db_path(&self) -> PathBuf {
        expand_home(&self.storage.path)
    }
}

/// Expand a leading `~/` against $HOME.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Substitute `${VAR}` references with environment values. Unset variables
/// and unterminated references stay as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                match std::env::var(&after[..end]) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&rest[start..start + end + 3]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_reference_substitution() {
        std::env::set_var("TEST_NOVA_VAR", "sk-expanded");
        let result = expand_env_vars("api_key = \"${TEST_NOVA_VAR}\" # note");
        assert_eq!(result, "api_key = \"sk-expanded\" # note");
        std::env::remove_var("TEST_NOVA_VAR");
    }

    #[test]
    fn test_unset_env_reference_left_as_written() {
        let input = "api_key = \"${NONEXISTENT_NOVA_VAR}\"";
        assert_eq!(expand_env_vars(input), input);
    }

    #[test]
    fn test_unterminated_env_reference_left_as_written() {
        assert_eq!(expand_env_vars("tail = ${OOPS"), "tail = ${OOPS");
    }

    #[test]
    fn test_defaults_from_minimal_toml() {
        let toml_str = r#"
[model]
api_key = "sk-test"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.model.provider, "upstage");
        assert_eq!(config.model.model_id, "solar-pro2");
        assert_eq!(config.model.max_tokens, 1024);
        assert_eq!(config.persona.name, "Nova");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.session.history_limit, 40);
        assert!(config.gateway.is_none());
    }

    #[test]
    fn test_gateway_section_defaults() {
        let toml_str = r#"
[model]
model_id = "solar-pro2"

[gateway]
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let gw = config.gateway.unwrap();
        assert_eq!(gw.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_expand_home() {
        std::env::set_var("HOME", "/home/tester");
        let p = expand_home("~/.nova/nova.db");
        assert_eq!(p, PathBuf::from("/home/tester/.nova/nova.db"));
        let p = expand_home("/var/lib/nova.db");
        assert_eq!(p, PathBuf::from("/var/lib/nova.db"));
    }
}
