use directories::BaseDirs;
use serde::Deserialize;
use std::{env, fmt, fs, path::PathBuf, time::Duration};
use tracing::warn;
use tutor_core::llm::DEFAULT_MODEL;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GroqFileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Per-request timeout for batch calls; idle limit between streamed bytes.
    pub timeout: Duration,
    /// Total attempts per call, including the first one.
    pub max_retries: u32,
    /// Backoff for attempt `n` (zero-based) is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    pub proxy: Option<String>,
}

impl fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl GroqConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            proxy: None,
        }
    }

    pub fn from_env_and_file() -> anyhow::Result<Self> {
        let api_key =
            env::var("GROQ_API_KEY").map_err(|_| anyhow::anyhow!("GROQ_API_KEY not set"))?;
        let mut cfg = Self::new(api_key);

        if let Some(path) = Self::config_path() {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(text) => match toml::from_str::<GroqFileConfig>(&text) {
                        Ok(file_cfg) => cfg.apply_file(file_cfg),
                        Err(e) => {
                            warn!(target: "providers::groq", "ignoring {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        warn!(target: "providers::groq", "cannot read {}: {}", path.display(), e)
                    }
                }
            }
        }

        if let Ok(url) = env::var("GROQ_BASE_URL") {
            cfg.base_url = url;
        }
        if let Ok(model) = env::var("GROQ_MODEL") {
            cfg.model = model;
        }
        cfg.proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("HTTP_PROXY").ok());

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_file(&mut self, file_cfg: GroqFileConfig) {
        if let Some(m) = file_cfg.model {
            self.model = m;
        }
        if let Some(u) = file_cfg.base_url {
            self.base_url = u;
        }
        if let Some(t) = file_cfg.timeout_secs {
            self.timeout = Duration::from_secs(t);
        }
        if let Some(r) = file_cfg.max_retries {
            self.max_retries = r;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("api key is empty");
        }
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("invalid base url {:?}: {}", self.base_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("base url must be http or https, got {}", url.scheme());
        }
        if self.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".tutor").join("config.toml")
        } else {
            base.config_dir().join("tutor").join("config.toml")
        };
        Some(p)
    }
}
