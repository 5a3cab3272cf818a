use std::env;
use std::path::PathBuf;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Substrings that mark an API key copied verbatim from a sample `.env`.
const PLACEHOLDER_KEY_MARKERS: &[&str] = &["your_groq_api_key", "your_api_key"];

/// Key/value source the config is read from. `std::env` in production,
/// a map in tests.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Reads profiled keys: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
struct Profiled<'a> {
    profile: &'a str,
    lookup: Lookup<'a>,
}

impl Profiled<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        let get = |k: &str| (self.lookup)(k).filter(|s| !s.is_empty());
        if !self.profile.is_empty() {
            if let Some(v) = get(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        get(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.opt(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub llm: LlmConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCQA_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_lookup("DOCQA_PROFILE").unwrap_or_default();
        Self::from_lookup(&profile, &env_lookup)
    }

    /// Build config for a named profile from an arbitrary key/value source.
    pub fn from_lookup(profile: &str, lookup: Lookup<'_>) -> Self {
        let p = profile.to_uppercase();
        let src = Profiled {
            profile: &p,
            lookup,
        };
        Self {
            profile: p.clone(),
            server: ServerConfig::from_source(&src),
            storage: StorageConfig::from_source(&src),
            limits: LimitsConfig::from_source(&src),
            llm: LlmConfig::from_source(&src),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:   {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  storage:  upload_dir={}, max_upload_bytes={}, retention_secs={}",
            self.storage.upload_dir.display(),
            self.storage.max_upload_bytes,
            self.storage.retention_secs
        );
        tracing::info!(
            "  limits:   upload_content={} chars, llm_context={} chars",
            self.limits.upload_content_max_chars,
            self.limits.llm_context_max_chars
        );
        tracing::info!(
            "  llm:      base_url={}, model={}, configured={}",
            self.llm.base_url,
            self.llm.model,
            self.llm.is_configured()
        );
    }

    /// Redacted view for operator output. Never includes the API key.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "storage": {
                "upload_dir": self.storage.upload_dir,
                "max_upload_bytes": self.storage.max_upload_bytes,
                "retention_secs": self.storage.retention_secs,
            },
            "limits": {
                "upload_content_max_chars": self.limits.upload_content_max_chars,
                "llm_context_max_chars": self.limits.llm_context_max_chars,
            },
            "llm": {
                "base_url": self.llm.base_url,
                "model": self.llm.model,
                "configured": self.llm.is_configured(),
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_source(src: &Profiled<'_>) -> Self {
        Self {
            host: src.or("HOST", "0.0.0.0"),
            port: src.parsed("PORT", 5001),
            cors_origin: src.or("CORS_ORIGIN", "*"),
        }
    }
}

// ── Upload storage ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Preferred upload directory. Falls back to the temp dir if it can't be created.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Uploaded files older than this are swept. 0 disables the sweeper.
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl StorageConfig {
    fn from_source(src: &Profiled<'_>) -> Self {
        Self {
            upload_dir: PathBuf::from(src.or("UPLOAD_DIR", "uploads")),
            max_upload_bytes: src.parsed("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            retention_secs: src.parsed("UPLOAD_RETENTION_SECS", 0),
            sweep_interval_secs: src.parsed("UPLOAD_SWEEP_INTERVAL_SECS", 300),
        }
    }
}

// ── Character budgets ─────────────────────────────────────────

/// The two budgets are independent: one bounds the upload response payload,
/// the other bounds the prompt sent upstream.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub upload_content_max_chars: usize,
    pub llm_context_max_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            upload_content_max_chars: 50_000,
            llm_context_max_chars: 30_000,
        }
    }
}

impl LimitsConfig {
    fn from_source(src: &Profiled<'_>) -> Self {
        let defaults = Self::default();
        Self {
            upload_content_max_chars: src
                .parsed("UPLOAD_CONTENT_MAX_CHARS", defaults.upload_content_max_chars),
            llm_context_max_chars: src
                .parsed("LLM_CONTEXT_MAX_CHARS", defaults.llm_context_max_chars),
        }
    }
}

// ── LLM (OpenAI-compatible chat completions) ──────────────────

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Request timeout in seconds. 0 keeps the HTTP client's default.
    pub timeout_secs: u64,
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.5,
            timeout_secs: 0,
            system_prompt: None,
        }
    }
}

impl LlmConfig {
    fn from_source(src: &Profiled<'_>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: src.opt("LLM_API_KEY").or_else(|| src.opt("GROQ_API_KEY")),
            base_url: src.or("LLM_BASE_URL", &defaults.base_url),
            model: src.or("LLM_MODEL", &defaults.model),
            temperature: src.parsed("LLM_TEMPERATURE", defaults.temperature),
            timeout_secs: src.parsed("LLM_TIMEOUT_SECS", defaults.timeout_secs),
            system_prompt: src.opt("LLM_SYSTEM_PROMPT"),
        }
    }

    /// The key, unless it is absent or still a sample-file placeholder.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !is_placeholder_key(key))
    }

    pub fn is_configured(&self) -> bool {
        self.usable_api_key().is_some()
    }
}

pub fn is_placeholder_key(key: &str) -> bool {
    let lower = key.trim().to_lowercase();
    lower.is_empty() || PLACEHOLDER_KEY_MARKERS.iter().any(|m| lower.contains(m))
}
