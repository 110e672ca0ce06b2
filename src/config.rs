use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_PORT: u16 = 11434;
const DEFAULT_SPEECH_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// Cloud speech-recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub api_url: String,
    /// Google Cloud API key. Voice input is unavailable while empty.
    pub api_key: String,
    /// BCP-47 language code, e.g. "en-US"
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SPEECH_URL.into(),
            api_key: String::new(),
            language: "en-US".into(),
        }
    }
}

/// Read-aloud settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Words per minute
    pub rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self { rate: 175 }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama_url: String,
    /// Model picked last time, preferred after a model refresh.
    pub default_model: Option<String>,
    pub speech: SpeechConfig,
    pub tts: TtsConfig,
    /// `OLLAMA_HOST` for this run only. Never written back to disk.
    #[serde(skip)]
    host_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            default_model: None,
            speech: SpeechConfig::default(),
            tts: TtsConfig::default(),
            host_override: None,
        }
    }
}

impl Config {
    /// Directory: ~/.config/local-assistant/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("local-assistant");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    /// `OLLAMA_HOST` overrides the server URL for this run.
    pub fn load() -> Self {
        Self::load_from(&Self::path(), std::env::var("OLLAMA_HOST").ok())
    }

    fn load_from(path: &Path, host: Option<String>) -> Self {
        let mut config = match fs::read_to_string(path) {
            Ok(data) => Self::from_json(&data),
            Err(_) => Self::default(),
        };
        config.host_override = host
            .filter(|h| !h.trim().is_empty())
            .map(|h| normalize_host(&h));
        config
    }

    fn from_json(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config file: {e}");
            Self::default()
        })
    }

    /// Base URL of the inference server actually used.
    pub fn server_url(&self) -> &str {
        self.host_override.as_deref().unwrap_or(&self.ollama_url)
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        fs::create_dir_all(Self::dir())?;
        self.save_to(&Self::path())
    }

    fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Turn an `OLLAMA_HOST` value into a base URL without trailing slash.
/// Missing scheme means http, missing port means 11434.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let (scheme, rest) = match host.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", host),
    };
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let has_port = match authority.rfind(']') {
        // [::1] or [::1]:port
        Some(close) => authority[close..].contains(':'),
        None => authority.contains(':'),
    };
    if has_port {
        format!("{scheme}://{authority}{path}")
    } else {
        format!("{scheme}://{authority}:{DEFAULT_OLLAMA_PORT}{path}")
    }
}
