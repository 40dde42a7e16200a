//! `SyncConfig` – layered configuration for the sync service.
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file,
//! then `LEDGER_SYNC_*` environment variables.  The client binary applies its
//! CLI flags on top.

use crate::error::SyncError;
use crate::poller::{DEFAULT_BOOTSTRAP_LIMIT, DEFAULT_PAGE_LIMIT};
use crate::types::{EntityIdentity, EventFilter};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Ledger package hosting the event type.
    pub package_id: String,
    /// Module emitting the state events.
    pub event_module: String,
    /// Event struct name.
    pub event_name: String,
    /// Events requested while bootstrapping.
    pub bootstrap_limit: usize,
    /// Events requested per page once resumed.
    pub page_limit: usize,
    /// Delay between the starts of two poll cycles.
    pub poll_interval_ms: u64,
    /// Overrides the identity provider when set.
    pub local_identity: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            package_id: "0x0".into(),
            event_module: "playerstate_module".into(),
            event_name: "PlayerStateUpdatedEvent".into(),
            bootstrap_limit: DEFAULT_BOOTSTRAP_LIMIT,
            page_limit: DEFAULT_PAGE_LIMIT,
            poll_interval_ms: 250,
            local_identity: None,
        }
    }
}

impl SyncConfig {
    /// Load defaults, then `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SyncError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix("LEDGER_SYNC").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        for (key, value) in [
            ("package_id", &self.package_id),
            ("event_module", &self.event_module),
            ("event_name", &self.event_name),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("{} must not be empty", key)));
            }
        }
        if self.bootstrap_limit == 0 || self.page_limit == 0 {
            return Err(SyncError::Config("fetch limits must be at least 1".into()));
        }
        Ok(())
    }

    /// The single event type followed by the poller.
    pub fn filter(&self) -> EventFilter {
        EventFilter::new(format!(
            "{}::{}::{}",
            self.package_id, self.event_module, self.event_name
        ))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn local_identity(&self) -> Option<EntityIdentity> {
        self.local_identity
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(EntityIdentity::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_follow_player_state_events() {
        let config = SyncConfig::default();
        assert_eq!(
            config.filter().move_event,
            "0x0::playerstate_module::PlayerStateUpdatedEvent"
        );
        assert_eq!(config.bootstrap_limit, 1);
        assert_eq!(config.page_limit, 20);
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!(
            "ledger-sync-settings-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "package_id = \"0xfeed\"\npage_limit = 5").unwrap();

        let config = SyncConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.package_id, "0xfeed");
        assert_eq!(config.page_limit, 5);
        assert_eq!(config.bootstrap_limit, 1);
    }

    #[test]
    fn empty_package_is_rejected() {
        let config = SyncConfig {
            package_id: " ".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }
}
