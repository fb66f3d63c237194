use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ArmGptConfig {
    pub server: ServerConfig,
    pub serial: SerialConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub index: IndexBuildConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    /// Pause between polls of an idle serial link.
    pub idle_sleep_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, or one of the aliases `usb` / `serial`.
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Wait after a line read before draining trailing bytes.
    pub settle_ms: u64,
    pub max_line_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub index_path: String,
    pub top_k: usize,
    /// Per-chunk character cap applied before the chunk enters the prompt. 0 disables.
    pub max_chunk_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// Reply sent when every tier is unavailable or fails.
    pub degraded_reply: String,
    /// Replaces the built-in persona preamble when set.
    pub system_prompt: Option<String>,
    /// Tiers in preference order.
    pub tiers: Vec<TierConfig>,
}

/// Which backend implementation a tier uses.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Openai,
    Ollama,
    LlamaCpp,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Ollama => "ollama",
            Self::LlamaCpp => "llama_cpp",
        }
    }
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TierConfig {
    pub name: String,
    pub kind: TierKind,
    pub url: String,
    #[serde(default)]
    pub model: String,
    /// Environment variable holding the bearer key (hosted tiers only).
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_tier_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl TierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexBuildConfig {
    pub docs_dir: String,
    pub chunk_words: usize,
    pub overlap_words: usize,
}

fn default_tier_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> usize {
    200
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            idle_sleep_ms: 10,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "serial".into(),
            baud_rate: 9600,
            read_timeout_ms: 2000,
            settle_ms: 100,
            max_line_bytes: 4096,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: "nomic-embed-text".into(),
            url: "http://localhost:11434".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_path: "data/arm_index.jsonl".into(),
            top_k: 5,
            max_chunk_chars: 800,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            degraded_reply:
                "Sorry, I couldn't generate a response right now. Please try again!".into(),
            system_prompt: None,
            tiers: vec![
                TierConfig {
                    name: "remote".into(),
                    kind: TierKind::Openai,
                    url: "https://api.openai.com/v1".into(),
                    model: "gpt-4o-mini".into(),
                    api_key_env: Some("OPENAI_API_KEY".into()),
                    timeout_secs: 30,
                    max_tokens: default_max_tokens(),
                    temperature: default_temperature(),
                },
                TierConfig {
                    name: "local".into(),
                    kind: TierKind::Ollama,
                    url: "http://localhost:11434".into(),
                    model: "qwen2.5:1.5b".into(),
                    api_key_env: None,
                    timeout_secs: 120,
                    max_tokens: default_max_tokens(),
                    temperature: default_temperature(),
                },
            ],
        }
    }
}

impl Default for IndexBuildConfig {
    fn default() -> Self {
        Self {
            docs_dir: "data/arm_docs".into(),
            chunk_words: 220,
            overlap_words: 40,
        }
    }
}

/// Returns `~/.armgpt/`
pub fn default_armgpt_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".armgpt")
}

/// Returns the default config file path: `~/.armgpt/config.toml`
pub fn default_config_path() -> PathBuf {
    default_armgpt_dir().join("config.toml")
}

impl ArmGptConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ArmGptConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (ARMGPT_PORT, ARMGPT_BAUD, ARMGPT_INDEX, ARMGPT_LOG_LEVEL, ARMGPT_OLLAMA_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ARMGPT_PORT") {
            self.serial.port = val;
        }
        if let Ok(val) = std::env::var("ARMGPT_BAUD") {
            match val.parse() {
                Ok(baud) => self.serial.baud_rate = baud,
                Err(_) => tracing::warn!(value = %val, "ignoring non-numeric ARMGPT_BAUD"),
            }
        }
        if let Ok(val) = std::env::var("ARMGPT_INDEX") {
            self.retrieval.index_path = val;
        }
        if let Ok(val) = std::env::var("ARMGPT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ARMGPT_OLLAMA_URL") {
            self.embedding.url = val.clone();
            for tier in &mut self.generation.tiers {
                if tier.kind == TierKind::Ollama {
                    tier.url = val.clone();
                }
            }
        }
    }

    /// Resolve the index path, expanding `~` if needed.
    pub fn resolved_index_path(&self) -> PathBuf {
        expand_tilde(&self.retrieval.index_path)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.server.idle_sleep_ms)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ArmGptConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.idle_sleep_ms, 10);
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.generation.tiers.len(), 2);
        assert_eq!(config.generation.tiers[0].kind, TierKind::Openai);
        assert_eq!(config.generation.tiers[1].kind, TierKind::Ollama);
        assert!(config.retrieval.index_path.ends_with("arm_index.jsonl"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[serial]
port = "usb"
baud_rate = 115200

[retrieval]
max_chunk_chars = 300

[[generation.tiers]]
name = "pi"
kind = "llama_cpp"
url = "http://127.0.0.1:8080"
timeout_secs = 90
"#;
        let config: ArmGptConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.serial.port, "usb");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.retrieval.max_chunk_chars, 300);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.serial.settle_ms, 100);

        assert_eq!(config.generation.tiers.len(), 1);
        let tier = &config.generation.tiers[0];
        assert_eq!(tier.kind, TierKind::LlamaCpp);
        assert_eq!(tier.timeout(), Duration::from_secs(90));
        assert_eq!(tier.max_tokens, 200);
        assert!(tier.api_key_env.is_none());
    }

    #[test]
    fn unknown_tier_kind_is_rejected() {
        let toml_str = r#"
[[generation.tiers]]
name = "mystery"
kind = "carrier_pigeon"
url = "http://localhost"
"#;
        assert!(toml::from_str::<ArmGptConfig>(toml_str).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ArmGptConfig::default();
        std::env::set_var("ARMGPT_PORT", "/dev/ttyAMA0");
        std::env::set_var("ARMGPT_BAUD", "19200");
        std::env::set_var("ARMGPT_INDEX", "/tmp/override.jsonl");
        std::env::set_var("ARMGPT_LOG_LEVEL", "trace");
        std::env::set_var("ARMGPT_OLLAMA_URL", "http://pi.local:11434");

        config.apply_env_overrides();

        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.retrieval.index_path, "/tmp/override.jsonl");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.embedding.url, "http://pi.local:11434");
        assert_eq!(config.generation.tiers[1].url, "http://pi.local:11434");
        // hosted tier untouched
        assert_eq!(config.generation.tiers[0].url, "https://api.openai.com/v1");

        // Clean up
        std::env::remove_var("ARMGPT_PORT");
        std::env::remove_var("ARMGPT_BAUD");
        std::env::remove_var("ARMGPT_INDEX");
        std::env::remove_var("ARMGPT_LOG_LEVEL");
        std::env::remove_var("ARMGPT_OLLAMA_URL");
    }
}
