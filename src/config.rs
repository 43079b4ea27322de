//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// System preamble sent with every assist query unless overridden.
pub const DEFAULT_ASSIST_PREAMBLE: &str = "\
You are the Medicaid Enrollment Assistant. You help people with high needs \
understand Medicaid eligibility, the enrollment steps, and which documents to \
prepare. Answer plainly and briefly. If you are unsure, say so and suggest \
contacting support@medicaidassist.com or (555) 123-4567.";

/// Server and intake configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Path to the libSQL database holding submissions and assist exchanges.
    pub db_path: PathBuf,
    /// HTTP port for the presentation API.
    pub port: u16,
    /// Text generation model name.
    pub model: String,
    /// API key for the text generation service. `None` disables assist features.
    pub api_key: Option<SecretString>,
    /// Sessions idle longer than this are discarded.
    pub session_idle_timeout: Duration,
    /// How often the idle-session sweep runs.
    pub sweep_interval: Duration,
    /// System preamble for assist queries. Empty string sends none.
    pub assist_preamble: Option<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/anchor-intake.db"),
            port: 8080,
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            session_idle_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            assist_preamble: Some(DEFAULT_ASSIST_PREAMBLE.to_string()),
        }
    }
}

impl IntakeConfig {
    /// Build the configuration from `ANCHOR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("ANCHOR_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let port = match lookup("ANCHOR_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "ANCHOR_PORT".into(),
                message: e.to_string(),
            })?,
            None => defaults.port,
        };

        let model = lookup("ANCHOR_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.model);

        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("GOOGLE_API_KEY"))
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let session_idle_timeout = match lookup("ANCHOR_SESSION_IDLE_MIN") {
            Some(raw) => {
                let minutes = raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    key: "ANCHOR_SESSION_IDLE_MIN".into(),
                    message: e.to_string(),
                })?;
                if minutes == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "ANCHOR_SESSION_IDLE_MIN".into(),
                        message: "must be at least 1 minute".into(),
                    });
                }
                Duration::from_secs(minutes * 60)
            }
            None => defaults.session_idle_timeout,
        };

        let assist_preamble = match lookup("ANCHOR_ASSIST_PREAMBLE") {
            Some(p) if p.trim().is_empty() => None,
            Some(p) => Some(p),
            None => defaults.assist_preamble,
        };

        Ok(Self {
            db_path,
            port,
            model,
            api_key,
            session_idle_timeout,
            sweep_interval: defaults.sweep_interval,
            assist_preamble,
        })
    }
}
