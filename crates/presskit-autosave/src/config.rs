//! Configuration loading.
//!
//! Sources are merged field by field, later ones winning:
//! 1. Global config: `~/.config/presskit/presskit.json` (or `.jsonc`)
//! 2. Environment variable: `PRESSKIT_CONFIG_CONTENT`
//! 3. Project config: `presskit.jsonc` or `presskit.json` in the project directory
//! 4. Overrides: `PRESSKIT_AUTOSAVE_DELAY_MS`, `PRESSKIT_AUTOSAVE_ENABLED`,
//!    `PRESSKIT_AUTOSAVE_MAX_RETRIES`
//!
//! Files may contain `//` and `/* */` comments and `{env:VAR}` references.
//!
//! ```jsonc
//! {
//!   "log_level": "debug",
//!   "autosave": {
//!     "delay_ms": 800,          // slower typists
//!     "retry_snapshot": "latest"
//!   }
//! }
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::retry::{
    RetryPolicy, RetrySnapshot, RETRY_BACKOFF_FACTOR, RETRY_INITIAL_DELAY_MS, RETRY_MAX_ATTEMPTS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DELAY_MS: u64 = 500;
pub const DEFAULT_SUCCESS_INDICATOR_MS: u64 = 2000;

const CONFIG_CONTENT_VAR: &str = "PRESSKIT_CONFIG_CONTENT";
const DELAY_VAR: &str = "PRESSKIT_AUTOSAVE_DELAY_MS";
const ENABLED_VAR: &str = "PRESSKIT_AUTOSAVE_ENABLED";
const MAX_RETRIES_VAR: &str = "PRESSKIT_AUTOSAVE_MAX_RETRIES";

static ENV_REF: OnceLock<regex::Regex> = OnceLock::new();

fn env_ref() -> &'static regex::Regex {
    ENV_REF.get_or_init(|| {
        regex::Regex::new(r"\{env:([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Resolved auto-save settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoSaveConfig {
    pub enabled: bool,
    pub delay_ms: u64,
    pub max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_backoff_factor: u32,
    pub retry_snapshot: RetrySnapshot,
    pub success_indicator_ms: u64,
    pub show_success_indicator: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: DEFAULT_DELAY_MS,
            max_retries: RETRY_MAX_ATTEMPTS,
            retry_initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            retry_backoff_factor: RETRY_BACKOFF_FACTOR,
            retry_snapshot: RetrySnapshot::Original,
            success_indicator_ms: DEFAULT_SUCCESS_INDICATOR_MS,
            show_success_indicator: true,
        }
    }
}

impl AutoSaveConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn success_indicator(&self) -> Duration {
        Duration::from_millis(self.success_indicator_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.delay_ms == 0 {
            return Err(ConfigError::Validation {
                message: "autosave.delay_ms must be greater than 0".to_string(),
            });
        }
        if self.retry_backoff_factor == 0 {
            return Err(ConfigError::Validation {
                message: "autosave.retry_backoff_factor must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// The `autosave` section as written in a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_initial_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff_factor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_snapshot: Option<RetrySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_indicator_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_success_indicator: Option<bool>,
}

impl AutoSaveSection {
    /// Merge another section into this one (other takes precedence).
    pub fn merge(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            delay_ms: other.delay_ms.or(self.delay_ms),
            max_retries: other.max_retries.or(self.max_retries),
            retry_initial_delay_ms: other.retry_initial_delay_ms.or(self.retry_initial_delay_ms),
            retry_backoff_factor: other.retry_backoff_factor.or(self.retry_backoff_factor),
            retry_snapshot: other.retry_snapshot.or(self.retry_snapshot),
            success_indicator_ms: other.success_indicator_ms.or(self.success_indicator_ms),
            show_success_indicator: other.show_success_indicator.or(self.show_success_indicator),
        }
    }

    /// Fill unset fields with defaults.
    pub fn resolve(&self) -> AutoSaveConfig {
        let defaults = AutoSaveConfig::default();
        AutoSaveConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            delay_ms: self.delay_ms.unwrap_or(defaults.delay_ms),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_initial_delay_ms: self
                .retry_initial_delay_ms
                .unwrap_or(defaults.retry_initial_delay_ms),
            retry_backoff_factor: self
                .retry_backoff_factor
                .unwrap_or(defaults.retry_backoff_factor),
            retry_snapshot: self.retry_snapshot.unwrap_or(defaults.retry_snapshot),
            success_indicator_ms: self
                .success_indicator_ms
                .unwrap_or(defaults.success_indicator_ms),
            show_success_indicator: self
                .show_success_indicator
                .unwrap_or(defaults.show_success_indicator),
        }
    }

    /// Read the `PRESSKIT_AUTOSAVE_*` overrides through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            delay_ms: parse_var(&lookup, DELAY_VAR)?,
            enabled: parse_var(&lookup, ENABLED_VAR)?,
            max_retries: parse_var(&lookup, MAX_RETRIES_VAR)?,
            ..Self::default()
        })
    }

    pub fn from_env() -> ConfigResult<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> ConfigResult<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    let normalized = match trimmed {
        "1" | "yes" | "on" if name == ENABLED_VAR => "true",
        "0" | "no" | "off" if name == ENABLED_VAR => "false",
        other => other,
    };
    normalized
        .parse()
        .map(Some)
        .map_err(move |_| ConfigError::InvalidEnv {
            name: name.to_string(),
            value: raw,
        })
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Log level for the CLI (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Where drafts are stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub autosave: Option<AutoSaveSection>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Returns the merged config and the files it was read from.
    pub async fn load(project_dir: Option<&Path>) -> ConfigResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = presskit_util::path::config_dir() {
            if let Some(path) = first_existing(&global_dir, &["presskit.json", "presskit.jsonc"]) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Ok(content) = std::env::var(CONFIG_CONTENT_VAR) {
            let content = Self::substitute_variables(&content)?;
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            if let Some(path) = first_existing(dir, &["presskit.jsonc", "presskit.json"]) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        let overrides = AutoSaveSection::from_env()?;
        if overrides != AutoSaveSection::default() {
            config = config.merge(Config {
                autosave: Some(overrides),
                ..Config::default()
            });
        }

        debug!(sources = sources.len(), "Configuration loaded");
        Ok((config, sources))
    }

    pub async fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::substitute_variables(&content)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// The validated auto-save settings.
    pub fn autosave(&self) -> ConfigResult<AutoSaveConfig> {
        let resolved = self.autosave.clone().unwrap_or_default().resolve();
        resolved.validate()?;
        Ok(resolved)
    }

    pub fn parse_jsonc(content: &str, source: &str) -> ConfigResult<Self> {
        let stripped = Self::strip_comments(content);
        serde_json::from_str(&stripped).map_err(|e| ConfigError::InvalidJson {
            path: source.to_string(),
            message: e.to_string(),
        })
    }

    /// Remove `//` and `/* */` comments outside of string literals.
    fn strip_comments(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut in_string = false;
        let mut escaped = false;

        while let Some(c) = chars.next() {
            if in_string {
                result.push(c);
                match (escaped, c) {
                    (true, _) => escaped = false,
                    (false, '\\') => escaped = true,
                    (false, '"') => in_string = false,
                    _ => {}
                }
                continue;
            }

            match (c, chars.peek()) {
                ('"', _) => {
                    in_string = true;
                    result.push(c);
                }
                ('/', Some('/')) => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                ('/', Some('*')) => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        // Keep line numbers in parse errors accurate
                        if c == '\n' {
                            result.push('\n');
                        }
                        prev = c;
                    }
                }
                _ => result.push(c),
            }
        }

        result
    }

    /// Replace `{env:NAME}` with the variable's value.
    fn substitute_variables(content: &str) -> ConfigResult<String> {
        Self::substitute_with(content, |name| std::env::var(name).ok())
    }

    fn substitute_with<F>(content: &str, lookup: F) -> ConfigResult<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = None;
        let replaced = env_ref().replace_all(content, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match lookup(name) {
                Some(value) => value,
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(ConfigError::EnvVarNotFound { name }),
            None => Ok(replaced.into_owned()),
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        self.autosave = match (self.autosave, other.autosave) {
            (Some(base), Some(other)) => Some(base.merge(other)),
            (base, None) => base,
            (None, other) => other,
        };
        self
    }
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|p| p.exists())
}
