//! Environment-driven configuration.
//!
//! # Keys
//!
//! ```text
//! TRELLO_API_KEY, TRELLO_TOKEN        credentials (required)
//! BOARDSYNC_PAIRS                     name=<sourceBoardId>:<masterListId>,... (required)
//! BOARDSYNC_PRIORITY_LIST             default "Priority IV"
//! BOARDSYNC_PROGRESS_CHECKLIST        default "In-Progress"
//! BOARDSYNC_COMPLETED_LABEL           default "Completed"
//! BOARDSYNC_THRESHOLD                 default 0.75, within 0.0..=1.0
//! BOARDSYNC_TIMEOUT_SECS              default 30
//! BOARDSYNC_CALL_DELAY_MS             default 100
//! BOARDSYNC_API_BASE                  default https://api.trello.com/1
//! DRY_RUN                             true|false, default false
//! ```
//!
//! # API pattern
//!
//! - `load()`: reads the process environment plus `./.env`
//! - `load_at(dir, env)`: explicit directory and environment lookup
//! - `load_from(lookup)`: pure; used by tests
//!
//! Process environment values always win over `.env` values.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{BoardId, ListId};

pub const KEY_API_KEY: &str = "TRELLO_API_KEY";
pub const KEY_TOKEN: &str = "TRELLO_TOKEN";
pub const KEY_PAIRS: &str = "BOARDSYNC_PAIRS";
pub const KEY_PRIORITY_LIST: &str = "BOARDSYNC_PRIORITY_LIST";
pub const KEY_PROGRESS_CHECKLIST: &str = "BOARDSYNC_PROGRESS_CHECKLIST";
pub const KEY_COMPLETED_LABEL: &str = "BOARDSYNC_COMPLETED_LABEL";
pub const KEY_THRESHOLD: &str = "BOARDSYNC_THRESHOLD";
pub const KEY_TIMEOUT_SECS: &str = "BOARDSYNC_TIMEOUT_SECS";
pub const KEY_CALL_DELAY_MS: &str = "BOARDSYNC_CALL_DELAY_MS";
pub const KEY_API_BASE: &str = "BOARDSYNC_API_BASE";
pub const KEY_DRY_RUN: &str = "DRY_RUN";

pub const DEFAULT_PRIORITY_LIST: &str = "Priority IV";
pub const DEFAULT_PROGRESS_CHECKLIST: &str = "In-Progress";
pub const DEFAULT_COMPLETED_LABEL: &str = "Completed";
pub const DEFAULT_THRESHOLD: f64 = 0.75;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CALL_DELAY_MS: u64 = 100;
pub const DEFAULT_API_BASE: &str = "https://api.trello.com/1";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// API key + token pair. `Debug` never prints the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A source board and the master list its promoted cards are mirrored into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPair {
    pub name: String,
    pub source_board: BoardId,
    pub master_list: ListId,
}

/// Inputs to the eligibility rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionRules {
    pub priority_list: String,
    pub progress_checklist: String,
    pub completed_label: String,
    pub threshold: f64,
}

impl Default for PromotionRules {
    fn default() -> Self {
        Self {
            priority_list: DEFAULT_PRIORITY_LIST.to_string(),
            progress_checklist: DEFAULT_PROGRESS_CHECKLIST.to_string(),
            completed_label: DEFAULT_COMPLETED_LABEL.to_string(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub credentials: Credentials,
    pub pairs: Vec<BoardPair>,
    pub rules: PromotionRules,
    pub api_base: String,
    pub request_timeout: Duration,
    pub call_delay: Duration,
    pub dry_run: bool,
}

impl SyncConfig {
    /// Restrict the configured pairs to the one called `name`.
    pub fn only_pair(mut self, name: &str) -> Result<Self, ConfigError> {
        self.pairs.retain(|p| p.name == name);
        if self.pairs.is_empty() {
            return Err(ConfigError::Invalid {
                key: KEY_PAIRS,
                value: name.to_string(),
                reason: "no configured pair has this name".to_string(),
            });
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load from the process environment, falling back to `./.env`.
pub fn load() -> Result<SyncConfig, ConfigError> {
    let cwd = std::env::current_dir()?;
    load_at(&cwd, |key| std::env::var(key).ok())
}

/// Load with `env` taking precedence over `<dir>/.env`.
///
/// The process environment is never mutated.
pub fn load_at<F>(dir: &Path, env: F) -> Result<SyncConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = read_env_file(&dir.join(".env"))?;
    load_from(|key| env(key).or_else(|| file.get(key).cloned()))
}

/// Build a config from an arbitrary key lookup.
pub fn load_from<F>(lookup: F) -> Result<SyncConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let credentials = Credentials {
        api_key: get(KEY_API_KEY).ok_or(ConfigError::Missing { key: KEY_API_KEY })?,
        token: get(KEY_TOKEN).ok_or(ConfigError::Missing { key: KEY_TOKEN })?,
    };
    let pairs = parse_pairs(&get(KEY_PAIRS).ok_or(ConfigError::Missing { key: KEY_PAIRS })?)?;

    let threshold = match get(KEY_THRESHOLD) {
        Some(raw) => parse_threshold(&raw)?,
        None => DEFAULT_THRESHOLD,
    };
    let rules = PromotionRules {
        priority_list: get(KEY_PRIORITY_LIST).unwrap_or_else(|| DEFAULT_PRIORITY_LIST.into()),
        progress_checklist: get(KEY_PROGRESS_CHECKLIST)
            .unwrap_or_else(|| DEFAULT_PROGRESS_CHECKLIST.into()),
        completed_label: get(KEY_COMPLETED_LABEL)
            .unwrap_or_else(|| DEFAULT_COMPLETED_LABEL.into()),
        threshold,
    };

    let timeout_secs = parse_u64(KEY_TIMEOUT_SECS, get(KEY_TIMEOUT_SECS), DEFAULT_TIMEOUT_SECS)?;
    if timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            key: KEY_TIMEOUT_SECS,
            value: "0".into(),
            reason: "timeout must be at least one second".into(),
        });
    }
    let delay_ms = parse_u64(KEY_CALL_DELAY_MS, get(KEY_CALL_DELAY_MS), DEFAULT_CALL_DELAY_MS)?;

    let dry_run = match get(KEY_DRY_RUN) {
        Some(raw) => parse_bool(KEY_DRY_RUN, &raw)?,
        None => false,
    };

    Ok(SyncConfig {
        credentials,
        pairs,
        rules,
        api_base: get(KEY_API_BASE)
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.into()),
        request_timeout: Duration::from_secs(timeout_secs),
        call_delay: Duration::from_millis(delay_ms),
        dry_run,
    })
}

/// Parse `name=<board>:<list>,name=<board>:<list>`.
pub fn parse_pairs(raw: &str) -> Result<Vec<BoardPair>, ConfigError> {
    let invalid = |value: &str, reason: &str| ConfigError::Invalid {
        key: KEY_PAIRS,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut pairs = Vec::new();
    let mut seen = HashSet::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, ids) = entry
            .split_once('=')
            .ok_or_else(|| invalid(entry, "expected name=<sourceBoardId>:<masterListId>"))?;
        let (board, list) = ids
            .split_once(':')
            .ok_or_else(|| invalid(entry, "expected <sourceBoardId>:<masterListId>"))?;
        let (name, board, list) = (name.trim(), board.trim(), list.trim());
        if name.is_empty() || board.is_empty() || list.is_empty() {
            return Err(invalid(entry, "name, board id and list id must be non-empty"));
        }
        if !seen.insert(name.to_string()) {
            return Err(ConfigError::DuplicatePair {
                name: name.to_string(),
            });
        }
        pairs.push(BoardPair {
            name: name.to_string(),
            source_board: BoardId::from(board),
            master_list: ListId::from(list),
        });
    }

    if pairs.is_empty() {
        return Err(invalid(raw, "at least one board pair is required"));
    }
    Ok(pairs)
}

fn parse_threshold(raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw.parse().map_err(|_| ConfigError::Invalid {
        key: KEY_THRESHOLD,
        value: raw.to_string(),
        reason: "not a number".into(),
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid {
            key: KEY_THRESHOLD,
            value: raw.to_string(),
            reason: "must be between 0.0 and 1.0".into(),
        });
    }
    Ok(value)
}

fn parse_u64(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            reason: "not a non-negative integer".into(),
        }),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let env_err = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };
    let mut values = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(env_err)? {
        let (key, value) = item.map_err(env_err)?;
        values.insert(key, value);
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            (KEY_API_KEY, "key"),
            (KEY_TOKEN, "token"),
            (KEY_PAIRS, "proposals=board-p:list-p,papers=board-q:list-q"),
        ]
    }

    #[test]
    fn defaults_applied() {
        let config = load_from(lookup(&minimal())).expect("config");
        assert_eq!(config.rules, PromotionRules::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.call_delay, Duration::from_millis(100));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(!config.dry_run);
        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.pairs[1].source_board, BoardId::from("board-q"));
        assert_eq!(config.pairs[1].master_list, ListId::from("list-q"));
    }

    #[test]
    fn missing_token_is_reported_by_key() {
        let err = load_from(lookup(&[(KEY_API_KEY, "key"), (KEY_PAIRS, "a=b:c")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: KEY_TOKEN }), "got: {err}");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut vars = minimal();
        vars[0] = (KEY_API_KEY, "   ");
        let err = load_from(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: KEY_API_KEY }));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let mut vars = minimal();
        vars.push((KEY_THRESHOLD, "1.5"));
        let err = load_from(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: KEY_THRESHOLD, .. }));
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = minimal();
        vars.extend([
            (KEY_THRESHOLD, "0.5"),
            (KEY_PRIORITY_LIST, "Top"),
            (KEY_DRY_RUN, "TRUE"),
            (KEY_API_BASE, "http://localhost:9999/1/"),
        ]);
        let config = load_from(lookup(&vars)).expect("config");
        assert_eq!(config.rules.threshold, 0.5);
        assert_eq!(config.rules.priority_list, "Top");
        assert!(config.dry_run);
        assert_eq!(config.api_base, "http://localhost:9999/1");
    }

    #[test]
    fn malformed_pair_rejected() {
        let err = parse_pairs("proposals=board-only").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: KEY_PAIRS, .. }));
    }

    #[test]
    fn duplicate_pair_rejected() {
        let err = parse_pairs("a=b:c, a=d:e").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePair { ref name } if name == "a"));
    }

    #[test]
    fn empty_pairs_rejected() {
        assert!(parse_pairs(" , ").is_err());
    }

    #[test]
    fn only_pair_filters() {
        let config = load_from(lookup(&minimal())).expect("config");
        let narrowed = config.clone().only_pair("papers").expect("papers");
        assert_eq!(narrowed.pairs.len(), 1);
        assert!(config.only_pair("nope").is_err());
    }

    #[test]
    fn debug_redacts_credentials() {
        let creds = Credentials {
            api_key: "super-secret".into(),
            token: "also-secret".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret"));
    }
}
