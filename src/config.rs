use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from decision_assistant.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Settings for the upstream generative-AI service
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    /// Attach the search tool to report generation and return grounding sources
    pub grounding: bool,
    pub revision_temperature: f32,
    pub request_timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            grounding: false,
            revision_temperature: 0.6,
            request_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_bind: std::net::SocketAddr,
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind: std::net::SocketAddr::from(([127, 0, 0, 1], 8788)),
            cors_permissive: true,
        }
    }
}

/// Secrets loaded from environment variables, never from the TOML file
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            // GEMINI_SECRET_KEY is the deployed name; GEMINI_API_KEY is accepted for local runs
            api_key: std::env::var("GEMINI_SECRET_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses DECISION_ASSISTANT_CONFIG environment variable or defaults to "decision_assistant.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("ASSISTANT_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = std::env::var("DECISION_ASSISTANT_CONFIG")
            .unwrap_or_else(|_| "decision_assistant.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        if config.runtime.api_key.is_none() {
            tracing::warn!(
                "GEMINI_SECRET_KEY is not set; AI requests will fail until it is configured"
            );
        }

        Ok(config)
    }

    /// Env-first overrides for the TOML values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            self.gemini.model = model;
            tracing::debug!("GEMINI_MODEL env override applied");
        }
        if let Ok(base) = std::env::var("GEMINI_BASE_URL") {
            self.gemini.base_url = base;
            tracing::debug!("GEMINI_BASE_URL env override applied");
        }
        if let Ok(grounding) = std::env::var("GEMINI_GROUNDING") {
            self.gemini.grounding = grounding == "1" || grounding.eq_ignore_ascii_case("true");
        }
        if let Some(timeout) = std::env::var("GEMINI_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.gemini.request_timeout_ms = timeout;
        }
        if let Ok(v) = std::env::var("ASSISTANT_HTTP_BIND")
            && let Ok(bind) = v.parse::<std::net::SocketAddr>()
        {
            self.server.http_bind = bind;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=2.0).contains(&self.gemini.revision_temperature) {
            anyhow::bail!("gemini.revision_temperature must be between 0.0 and 2.0");
        }
        if self.gemini.request_timeout_ms == 0 {
            anyhow::bail!("gemini.request_timeout_ms must be > 0");
        }
        if !self.gemini.base_url.starts_with("http://")
            && !self.gemini.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "gemini.base_url '{}' must start with http:// or https://",
                self.gemini.base_url
            );
        }
        if self.gemini.model.trim().is_empty() {
            anyhow::bail!("gemini.model must not be empty");
        }
        Ok(())
    }
}
