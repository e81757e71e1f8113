use std::{env, fs, path::Path, time::Duration};

use crate::{domain::ChatId, errors::Error, progress::DEFAULT_PROGRESS_INTERVAL, Result};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Typed configuration loaded from the environment (and an optional `.env`).
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub chat_id: ChatId,
    /// Scheme and host of the Bot API, without trailing slash.
    pub api_base: String,
    pub progress_interval: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in `load`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let chat_id = lookup("TELEGRAM_CHAT_ID")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_CHAT_ID environment variable is required".to_string())
            })?;
        let chat_id = chat_id
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|e| Error::Config(format!("TELEGRAM_CHAT_ID is not a number: {e}")))?;

        let api_base = lookup("TGFILE_API_BASE")
            .and_then(non_empty)
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let progress_interval = match lookup("TGFILE_PROGRESS_INTERVAL_MS").and_then(non_empty) {
            Some(raw) => {
                let ms = raw.trim().parse::<u64>().map_err(|e| {
                    Error::Config(format!("TGFILE_PROGRESS_INTERVAL_MS is not a number: {e}"))
                })?;
                if ms == 0 {
                    return Err(Error::Config(
                        "TGFILE_PROGRESS_INTERVAL_MS must be positive".to_string(),
                    ));
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_PROGRESS_INTERVAL,
        };

        Ok(Self {
            bot_token,
            chat_id,
            api_base,
            progress_interval,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100200300"),
        ]))
        .unwrap();
        assert_eq!(cfg.chat_id, ChatId(-100200300));
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.progress_interval, Duration::from_millis(25));
        assert!(!format!("{cfg:?}").contains("123:abc"));
    }

    #[test]
    fn overrides_are_normalized() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("TGFILE_API_BASE", "http://127.0.0.1:8081/"),
            ("TGFILE_PROGRESS_INTERVAL_MS", "100"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_base, "http://127.0.0.1:8081");
        assert_eq!(cfg.progress_interval, Duration::from_millis(100));
    }

    #[test]
    fn missing_or_invalid_values_fail() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("TELEGRAM_CHAT_ID", "1")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[
                ("TELEGRAM_BOT_TOKEN", "t"),
                ("TELEGRAM_CHAT_ID", "not-a-chat"),
            ])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[
                ("TELEGRAM_BOT_TOKEN", "t"),
                ("TELEGRAM_CHAT_ID", "1"),
                ("TGFILE_PROGRESS_INTERVAL_MS", "0"),
            ])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn dotenv_lines_parse() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_BOT_TOKEN=\"123:abc\"\n\nTELEGRAM_CHAT_ID = 5\nbroken line\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "123:abc".to_string()),
                ("TELEGRAM_CHAT_ID".to_string(), "5".to_string()),
            ]
        );
    }
}
