//! Bot configuration and gateway factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use calcbot_core::traits::ChatGateway;

use crate::telegram::TelegramGateway;

/// Top-level calcbot configuration.
///
/// Note: Custom Debug impl masks the bot token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token. May reference an env var as `${VAR}`.
    #[serde(default)]
    pub telegram_token: String,
    /// Chat that receives quiz results.
    #[serde(default)]
    pub admin_chat_id: Option<i64>,
    /// Bot API root, overridable for tests and self-hosted API servers.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Long-poll timeout for `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Back-off after a failed poll.
    #[serde(default = "default_poll_retry_delay")]
    pub poll_retry_delay_ms: u64,
    /// Upper bound on one function analysis.
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,
    /// Question bank file. The built-in bank is used when unset.
    #[serde(default)]
    pub questions_path: Option<PathBuf>,
    #[serde(default = "default_plot_width")]
    pub plot_width: u32,
    #[serde(default = "default_plot_height")]
    pub plot_height: u32,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.telegram_token.is_empty() {
            ""
        } else {
            "***"
        };
        f.debug_struct("BotConfig")
            .field("telegram_token", &token)
            .field("admin_chat_id", &self.admin_chat_id)
            .field("api_base_url", &self.api_base_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("poll_retry_delay_ms", &self.poll_retry_delay_ms)
            .field("analysis_timeout_secs", &self.analysis_timeout_secs)
            .field("questions_path", &self.questions_path)
            .field("plot_width", &self.plot_width)
            .field("plot_height", &self.plot_height)
            .finish()
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_poll_retry_delay() -> u64 {
    1000
}
fn default_analysis_timeout() -> u64 {
    10
}
fn default_plot_width() -> u32 {
    800
}
fn default_plot_height() -> u32 {
    600
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: String::new(),
            admin_chat_id: None,
            api_base_url: default_api_base_url(),
            poll_timeout_secs: default_poll_timeout(),
            poll_retry_delay_ms: default_poll_retry_delay(),
            analysis_timeout_secs: default_analysis_timeout(),
            questions_path: None,
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
pub(crate) fn resolve_env_vars(s: &str) -> String {
    expand_vars(s, |name| std::env::var(name).ok())
}

/// Single left-to-right pass: substituted values are copied verbatim and
/// never scanned again, so a value containing `${...}` cannot loop.
fn expand_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let name = &rest[start + 2..start + len];
        result.push_str(&lookup(name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `calcbot.toml` in the current directory
/// 2. `~/.config/calcbot/config.toml`
///
/// Environment variable overrides: `CALCBOT_TOKEN`, `CALCBOT_ADMIN_CHAT_ID`.
pub fn load_config() -> Result<BotConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<BotConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("calcbot.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<BotConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => BotConfig::default(),
    };

    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Apply env var overrides, then resolve `${VAR}` references.
fn apply_overrides(
    mut config: BotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BotConfig> {
    if let Some(token) = lookup("CALCBOT_TOKEN") {
        config.telegram_token = token;
    }
    if let Some(id) = lookup("CALCBOT_ADMIN_CHAT_ID") {
        let id = id
            .trim()
            .parse::<i64>()
            .with_context(|| format!("CALCBOT_ADMIN_CHAT_ID is not a chat id: {id}"))?;
        config.admin_chat_id = Some(id);
    }

    config.telegram_token = resolve_env_vars(&config.telegram_token);
    config.api_base_url = resolve_env_vars(&config.api_base_url);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("calcbot"))
}

/// Create the Telegram gateway described by `config`.
pub fn create_gateway(config: &BotConfig) -> Result<Box<dyn ChatGateway>> {
    if config.telegram_token.trim().is_empty() {
        anyhow::bail!(
            "telegram_token is not set (add it to calcbot.toml or set CALCBOT_TOKEN)"
        );
    }
    let gateway = TelegramGateway::new(
        &config.telegram_token,
        Some(config.api_base_url.clone()),
        config.poll_timeout_secs,
    )
    .context("failed to create Telegram gateway")?;
    Ok(Box::new(gateway))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_CALCBOT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_CALCBOT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_CALCBOT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no vars"), "no vars");
        std::env::remove_var("_CALCBOT_TEST_VAR");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let lookup = |name: &str| match name {
            "SELF" => Some("${SELF}".to_string()),
            "A" => Some("${B}".to_string()),
            "B" => Some("b".to_string()),
            _ => None,
        };
        assert_eq!(expand_vars("x${SELF}y", lookup), "x${SELF}y");
        assert_eq!(expand_vars("${A}-${B}", lookup), "${B}-b");
        assert_eq!(expand_vars("${MISSING}!", lookup), "!");
        assert_eq!(expand_vars("open ${A", lookup), "open ${A");
    }

    #[test]
    fn default_config() {
        let config = BotConfig::default();
        assert_eq!(config.api_base_url, "https://api.telegram.org");
        assert_eq!(config.poll_timeout_secs, 30);
        assert_eq!((config.plot_width, config.plot_height), (800, 600));
        assert!(config.admin_chat_id.is_none());
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
telegram_token = "123:abc"
admin_chat_id = -100200
questions_path = "questions.toml"
"#;
        let config: BotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.admin_chat_id, Some(-100200));
        assert_eq!(config.questions_path, Some(PathBuf::from("questions.toml")));
        assert_eq!(config.analysis_timeout_secs, 10);
    }

    #[test]
    fn debug_masks_token() {
        let config = BotConfig {
            telegram_token: "123:very-secret".into(),
            ..BotConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("CALCBOT_TOKEN", "from-env"),
            ("CALCBOT_ADMIN_CHAT_ID", " 42 "),
        ]
        .into_iter()
        .collect();
        let config = apply_overrides(BotConfig::default(), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.telegram_token, "from-env");
        assert_eq!(config.admin_chat_id, Some(42));
    }

    #[test]
    fn bad_admin_id_is_an_error() {
        let result = apply_overrides(BotConfig::default(), |k| {
            (k == "CALCBOT_ADMIN_CHAT_ID").then(|| "admin".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calcbot.toml");
        std::fs::write(&path, "poll_timeout_secs = 5\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.poll_timeout_secs, 5);

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn gateway_needs_a_token() {
        let err = create_gateway(&BotConfig::default()).err().unwrap();
        assert!(err.to_string().contains("telegram_token"));
    }
}
