//! # Client Configuration
//!
//! Loaded from TOML. Every key is optional; missing keys take the
//! production defaults.
//!
//! ```toml
//! [server]
//! address = "127.0.0.1:61613"
//! player_id = 1
//!
//! [battle]
//! retry_delay_ms = 1000
//! turn_cap = 10
//! initial_hp = 100
//!
//! [draft]
//! backoff_base_ms = 1000
//! backoff_ceiling_ms = 10000
//! max_retries = 5
//! pick_cap = 4
//!
//! [reconciler]
//! stillness_threshold = 0.1
//! max_frames = 600
//! frame_dt = 0.016666668
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sortis_core::{BattleRules, PlayerId, DEFAULT_INITIAL_HP, DEFAULT_TURN_CAP};
use sortis_networking::{BattleSyncConfig, DraftSyncConfig};
use sortis_shared::constants::{
    BATTLE_RETRY_DELAY_MS, DEFAULT_SERVER_ADDR, DRAFT_BACKOFF_BASE_MS, DRAFT_BACKOFF_CEILING_MS,
    DRAFT_MAX_RETRIES, PICKS_PER_PLAYER,
};
use tracing::info;

use crate::error::{SortisError, SortisResult};
use crate::reconciler::ReconcilerConfig;

/// `[server]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Real-time endpoint.
    pub address: String,
    /// Player this client speaks for.
    pub player_id: PlayerId,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVER_ADDR.to_owned(),
            player_id: 1,
        }
    }
}

/// `[battle]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleSection {
    /// Fixed connect retry delay.
    pub retry_delay_ms: u64,
    /// Rounds before a draw.
    pub turn_cap: u32,
    /// Starting hp per side.
    pub initial_hp: u32,
}

impl Default for BattleSection {
    fn default() -> Self {
        Self {
            retry_delay_ms: BATTLE_RETRY_DELAY_MS,
            turn_cap: DEFAULT_TURN_CAP,
            initial_hp: DEFAULT_INITIAL_HP,
        }
    }
}

/// `[draft]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftSection {
    /// First backoff delay.
    pub backoff_base_ms: u64,
    /// Largest backoff delay.
    pub backoff_ceiling_ms: u64,
    /// Connect attempts before giving up.
    pub max_retries: u32,
    /// Skills per seat. Informational; the server enforces it.
    pub pick_cap: usize,
}

impl Default for DraftSection {
    fn default() -> Self {
        Self {
            backoff_base_ms: DRAFT_BACKOFF_BASE_MS,
            backoff_ceiling_ms: DRAFT_BACKOFF_CEILING_MS,
            max_retries: DRAFT_MAX_RETRIES,
            pick_cap: PICKS_PER_PLAYER,
        }
    }
}

/// Whole client config.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server endpoint.
    pub server: ServerSection,
    /// Battle settings.
    pub battle: BattleSection,
    /// Draft settings.
    pub draft: DraftSection,
    /// Dice animation settings.
    pub reconciler: ReconcilerConfig,
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SortisError::ConfigParse`] on bad TOML or
    /// [`SortisError::ConfigInvalid`] on unusable values.
    pub fn from_toml_str(text: &str) -> SortisResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SortisError::ConfigIo`] if the file cannot be read, plus
    /// everything [`ClientConfig::from_toml_str`] returns.
    pub fn load(path: impl AsRef<Path>) -> SortisResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SortisError::ConfigIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Serializes back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SortisError::ConfigParse`] if serialization fails.
    pub fn to_toml_string(&self) -> SortisResult<String> {
        toml::to_string_pretty(self).map_err(|e| SortisError::ConfigParse(e.to_string()))
    }

    fn validate(&self) -> SortisResult<()> {
        let invalid = |field, reason: &str| {
            Err(SortisError::ConfigInvalid {
                field,
                reason: reason.to_owned(),
            })
        };
        if self.server.address.parse::<SocketAddr>().is_err() {
            return invalid("server.address", "not a socket address");
        }
        if self.battle.turn_cap == 0 {
            return invalid("battle.turn_cap", "must be at least 1");
        }
        if self.battle.initial_hp == 0 {
            return invalid("battle.initial_hp", "must be at least 1");
        }
        if self.draft.backoff_base_ms > self.draft.backoff_ceiling_ms {
            return invalid("draft.backoff_base_ms", "exceeds backoff_ceiling_ms");
        }
        let threshold = self.reconciler.stillness_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return invalid("reconciler.stillness_threshold", "must be positive");
        }
        let dt = self.reconciler.frame_dt;
        if !dt.is_finite() || dt <= 0.0 {
            return invalid("reconciler.frame_dt", "must be positive");
        }
        if self.reconciler.max_frames == 0 {
            return invalid("reconciler.max_frames", "must be at least 1");
        }
        Ok(())
    }

    /// Parsed server address.
    ///
    /// # Errors
    ///
    /// Returns [`SortisError::ConfigInvalid`] for a bad address.
    pub fn server_addr(&self) -> SortisResult<SocketAddr> {
        self.server
            .address
            .parse()
            .map_err(|e: std::net::AddrParseError| SortisError::ConfigInvalid {
                field: "server.address",
                reason: e.to_string(),
            })
    }

    /// Battle rules.
    #[must_use]
    pub const fn battle_rules(&self) -> BattleRules {
        BattleRules {
            initial_hp: self.battle.initial_hp,
            turn_cap: self.battle.turn_cap,
        }
    }

    /// Battle synchronizer settings.
    #[must_use]
    pub const fn battle_sync(&self) -> BattleSyncConfig {
        BattleSyncConfig {
            retry_delay: Duration::from_millis(self.battle.retry_delay_ms),
        }
    }

    /// Draft synchronizer settings.
    #[must_use]
    pub const fn draft_sync(&self) -> DraftSyncConfig {
        DraftSyncConfig {
            backoff_base: Duration::from_millis(self.draft.backoff_base_ms),
            backoff_ceiling: Duration::from_millis(self.draft.backoff_ceiling_ms),
            max_retries: self.draft.max_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.battle_rules(), BattleRules::default());
        assert_eq!(config.draft_sync(), DraftSyncConfig::default());
        assert_eq!(config.battle_sync(), BattleSyncConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ClientConfig::from_toml_str(
            r#"
            [server]
            player_id = 42

            [draft]
            max_retries = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.server.player_id, 42);
        assert_eq!(config.server.address, DEFAULT_SERVER_ADDR);
        assert_eq!(config.draft.max_retries, 2);
        assert_eq!(config.draft.backoff_ceiling_ms, 10_000);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = ClientConfig::from_toml_str("[battle]\nturn_cap = 0\n");
        assert!(matches!(
            bad,
            Err(SortisError::ConfigInvalid {
                field: "battle.turn_cap",
                ..
            })
        ));
        let bad = ClientConfig::from_toml_str("[server]\naddress = \"nowhere\"\n");
        assert!(bad.is_err());
        let bad = ClientConfig::from_toml_str("[battle\n");
        assert!(matches!(bad, Err(SortisError::ConfigParse(_))));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = ClientConfig::default();
        config.reconciler.max_frames = 120;
        let text = config.to_toml_string().unwrap();
        assert_eq!(ClientConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SortisError::ConfigIo { .. }));
    }
}
