//! Gateway configuration. Load from TOML or env.

use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-20b";

/// Global application configuration (gateway identity + LLM routing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity shown by `/api/v1/status`.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// LLM mode: "mock" (canned responses, no network) or "live".
    pub llm_mode: String,
    /// Chat-completions endpoint (OpenAI-compatible). Default: Groq.
    #[serde(default = "default_llm_api_url")]
    pub llm_api_url: String,
    /// Model identifier sent to the completion endpoint.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
}

fn default_llm_api_url() -> String {
    DEFAULT_LLM_API_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "Haven Gateway".to_string(),
            port: 8000,
            llm_mode: "mock".to_string(),
            llm_api_url: default_llm_api_url(),
            llm_model: default_llm_model(),
        }
    }
}

impl CoreConfig {
    /// Load config from file and environment.
    /// Precedence: env `HAVEN_CONFIG` path > `config/gateway.toml` > defaults,
    /// with `HAVEN`-prefixed environment variables overriding either.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("HAVEN_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Haven Gateway")?
            .set_default("port", 8000_i64)?
            .set_default("llm_mode", "mock")?
            .set_default("llm_api_url", DEFAULT_LLM_API_URL)?
            .set_default("llm_model", DEFAULT_LLM_MODEL)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("HAVEN").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// True when chat requests should hit the live completion endpoint.
    pub fn llm_live(&self) -> bool {
        self.llm_mode.trim().eq_ignore_ascii_case("live")
    }
}
