//! CLI command handlers.

use std::time::Duration;

use anyhow::{Result, bail};
use postgrest_session::{PostgrestSessionStore, SessionPayload, StoreConfig};

pub mod destroy;
pub mod get;
pub mod prune;
pub mod set;
pub mod touch;
pub mod watch;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Store configuration after file and flag overrides.
    pub config: StoreConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Open a store for a single command. Background pruning stays off.
    pub fn one_shot_store(&self) -> Result<PostgrestSessionStore> {
        let config = self.config.clone().without_pruning();
        Ok(PostgrestSessionStore::new(config)?)
    }
}

/// Parse a session payload given on the command line.
pub fn parse_payload(raw: &str) -> Result<SessionPayload> {
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("session payload must be a JSON object, got {}", other),
    }
}

/// Convert a `--max-age` value in milliseconds.
pub fn max_age(millis: Option<u64>) -> Option<Duration> {
    millis.map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload_object() {
        let sess = parse_payload(r#"{"user":"ada","cookie":{"maxAge":1000}}"#).unwrap();
        assert_eq!(sess["user"], "ada");
    }

    #[test]
    fn test_parse_payload_rejects_non_object() {
        assert!(parse_payload("[1,2]").is_err());
        assert!(parse_payload("not json").is_err());
    }

    #[test]
    fn test_one_shot_store_disables_pruning() {
        let ctx = Context {
            config: StoreConfig::default(),
            json_output: false,
            verbose: false,
        };
        let store = ctx.one_shot_store().unwrap();
        assert!(!store.config().prune_session_interval.is_enabled());
    }
}
