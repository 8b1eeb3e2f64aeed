//! Tutor configuration: defaults, optional TOML file, then `TUTOR__*` environment overrides.
//!
//! | Key | Env | Default |
//! |-----|-----|---------|
//! | host | TUTOR__HOST | 127.0.0.1 |
//! | port | TUTOR__PORT | 3000 |
//! | knowledge_path | TUTOR__KNOWLEDGE_PATH | ./data/knowledge.json |
//! | static_dir | TUTOR__STATIC_DIR | unset (bundled landing page only) |
//! | max_sessions | TUTOR__MAX_SESSIONS | 10000 |
//! | knowledge.tutor_policy | TUTOR__KNOWLEDGE__TUTOR_POLICY | substring |
//! | knowledge.open_mode_lookup | TUTOR__KNOWLEDGE__OPEN_MODE_LOOKUP | true |
//! | wikipedia.api_url | TUTOR__WIKIPEDIA__API_URL | https://en.wikipedia.org/w/api.php |
//! | wikipedia.strategy | TUTOR__WIKIPEDIA__STRATEGY | search_extract |
//! | wikipedia.sentences | TUTOR__WIKIPEDIA__SENTENCES | 20 (clamped to 10–20) |
//! | wikipedia.timeout_secs | TUTOR__WIKIPEDIA__TIMEOUT_SECS | 10 |
//! | wikipedia.chunk_chars | TUTOR__WIKIPEDIA__CHUNK_CHARS | 500 |
//! | media.timeout_secs | TUTOR__MEDIA__TIMEOUT_SECS | 60 |
//!
//! `media.illustration_command` and `media.speech_command` are argv arrays and are set in the
//! TOML file; when absent, media generation is disabled.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::knowledge::MatchPolicy;
use crate::wikipedia::ResolveStrategy;

pub const DEFAULT_CONFIG_PATH: &str = "config/tutor.toml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_KNOWLEDGE_PATH: &str = "./data/knowledge.json";
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_SENTENCES: u32 = 20;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CHUNK_CHARS: usize = 500;
pub const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 60;

fn default_user_agent() -> String {
    format!(
        "ai-tutor/{} (educational tutor widget; reqwest)",
        env!("CARGO_PKG_VERSION")
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    pub host: String,
    pub port: u16,
    pub knowledge_path: String,
    /// Directory served as the static fallback. Unset or missing => bundled landing page only.
    #[serde(default)]
    pub static_dir: Option<String>,
    pub max_sessions: usize,
    pub knowledge: KnowledgeSettings,
    pub wikipedia: WikipediaSettings,
    #[serde(default)]
    pub media: MediaSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSettings {
    /// Match policy for tutor mode (whole normalized query against keywords).
    pub tutor_policy: MatchPolicy,
    /// Check structured/keyword topics against the knowledge base (exact) before Wikipedia.
    pub open_mode_lookup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaSettings {
    pub api_url: String,
    pub strategy: ResolveStrategy,
    pub sentences: u32,
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub chunk_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSettings {
    /// argv of the illustration script, e.g. `["python3", "image_gen.py"]`.
    #[serde(default)]
    pub illustration_command: Option<Vec<String>>,
    /// argv of the speech script, e.g. `["python3", "tts_gen.py"]`.
    #[serde(default)]
    pub speech_command: Option<Vec<String>>,
    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_media_timeout_secs() -> u64 {
    DEFAULT_MEDIA_TIMEOUT_SECS
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            tutor_policy: MatchPolicy::Substring,
            open_mode_lookup: true,
        }
    }
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            api_url: WIKIPEDIA_API_URL.to_string(),
            strategy: ResolveStrategy::SearchExtract,
            sentences: DEFAULT_SENTENCES,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            chunk_chars: DEFAULT_CHUNK_CHARS,
        }
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            illustration_command: None,
            speech_command: None,
            timeout_secs: DEFAULT_MEDIA_TIMEOUT_SECS,
        }
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            knowledge_path: DEFAULT_KNOWLEDGE_PATH.to_string(),
            static_dir: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
            knowledge: KnowledgeSettings::default(),
            wikipedia: WikipediaSettings::default(),
            media: MediaSettings::default(),
        }
    }
}

impl TutorConfig {
    /// Load config from file and environment. Precedence: env `TUTOR__*` > file at `TUTOR_CONFIG`
    /// (default `config/tutor.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("TUTOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Same as [`TutorConfig::load`] with an explicit file path. A missing file is skipped.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT as i64)?
            .set_default("knowledge_path", DEFAULT_KNOWLEDGE_PATH)?
            .set_default("max_sessions", DEFAULT_MAX_SESSIONS as i64)?
            .set_default("knowledge.tutor_policy", "substring")?
            .set_default("knowledge.open_mode_lookup", true)?
            .set_default("wikipedia.api_url", WIKIPEDIA_API_URL)?
            .set_default("wikipedia.strategy", "search_extract")?
            .set_default("wikipedia.sentences", DEFAULT_SENTENCES as i64)?
            .set_default("wikipedia.timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS as i64)?
            .set_default("wikipedia.user_agent", default_user_agent())?
            .set_default("wikipedia.chunk_chars", DEFAULT_CHUNK_CHARS as i64)?
            .set_default("media.timeout_secs", DEFAULT_MEDIA_TIMEOUT_SECS as i64)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("TUTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.wikipedia.chunk_chars == 0 {
            return Err(config::ConfigError::Message(
                "wikipedia.chunk_chars must be greater than zero".into(),
            ));
        }
        if self.max_sessions == 0 {
            return Err(config::ConfigError::Message(
                "max_sessions must be greater than zero".into(),
            ));
        }
        for (key, cmd) in [
            ("media.illustration_command", &self.media.illustration_command),
            ("media.speech_command", &self.media.speech_command),
        ] {
            if matches!(cmd, Some(argv) if argv.is_empty()) {
                return Err(config::ConfigError::Message(format!(
                    "{} must name a program",
                    key
                )));
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl WikipediaSettings {
    /// Sentence cap for intro extracts, clamped to 10–20.
    pub fn sentence_limit(&self) -> u32 {
        self.sentences.clamp(10, 20)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl MediaSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
