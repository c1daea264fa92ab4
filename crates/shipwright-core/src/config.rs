use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

const ENV_FILE: &str = ".env";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set (environment or .env)")]
    Missing(&'static str),
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read {path}: {source}")]
    EnvFile {
        path: String,
        source: dotenvy::Error,
    },
}

// ── Config ──

/// Evaluator retry settings as read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    pub base_secs: u64,
    pub multiplier: u32,
    pub attempts: u32,
    pub jitter: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            base_secs: 1,
            multiplier: 2,
            attempts: 5,
            jitter: false,
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub github_token: String,
    pub github_username: String,
    pub github_api_url: String,
    pub bind: String,
    pub port: u16,
    pub notify: NotifySettings,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &"[MASKED]")
            .field("github_username", &self.github_username)
            .field("github_api_url", &self.github_api_url)
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("notify", &self.notify)
            .finish()
    }
}

impl Config {
    /// Load from the process environment, falling back to `dir/.env`.
    /// Variables already present in the environment win over the file.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        Self::load_with(dir, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with the process environment replaced by `env`.
    pub fn load_with<E>(dir: &Path, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file_vars = read_env_file(&dir.join(ENV_FILE))?;
        Self::from_lookup(|key| env(key).or_else(|| file_vars.get(key).cloned()))
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let github_token = get("GITHUB_TOKEN").ok_or(ConfigError::Missing("GITHUB_TOKEN"))?;
        let github_username =
            get("GITHUB_USERNAME").ok_or(ConfigError::Missing("GITHUB_USERNAME"))?;
        let github_api_url = get("GITHUB_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let defaults = NotifySettings::default();
        let notify = NotifySettings {
            base_secs: parse_or("SHIPWRIGHT_NOTIFY_BASE_SECS", &get, defaults.base_secs)?,
            multiplier: parse_or("SHIPWRIGHT_NOTIFY_MULTIPLIER", &get, defaults.multiplier)?,
            attempts: parse_or("SHIPWRIGHT_NOTIFY_ATTEMPTS", &get, defaults.attempts)?,
            jitter: parse_bool("SHIPWRIGHT_NOTIFY_JITTER", &get, defaults.jitter)?,
        };
        if notify.attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "SHIPWRIGHT_NOTIFY_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        Ok(Self {
            github_token: github_token.trim().to_string(),
            github_username: github_username.trim().to_string(),
            github_api_url,
            bind: get("SHIPWRIGHT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: parse_or("SHIPWRIGHT_PORT", &get, DEFAULT_PORT)?,
            notify,
        })
    }
}

fn parse_or<T>(
    key: &'static str,
    get: &dyn Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(
    key: &'static str,
    get: &dyn Fn(&str) -> Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: v,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

// ── .env ──

/// Variables declared in `path`, without touching the process environment.
/// A missing file yields no variables.
fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let err = |source| ConfigError::EnvFile {
        path: path.display().to_string(),
        source,
    };
    let vars = dotenvy::from_path_iter(path)
        .map_err(err)?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map_err(err)?;
    tracing::debug!(path = %path.display(), count = vars.len(), "loaded env file");
    Ok(vars)
}
