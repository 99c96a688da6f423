//! Engine configuration, loaded from JSON with a default for every field.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Who may ask the oracle to decrypt someone's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPolicy {
    /// Any caller, subject only to the target's cooldown.
    #[default]
    Open,
    /// Owner, providers, or the target entity itself.
    ProvidersOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
    #[serde(default = "default_domain_tag")]
    pub domain_tag: String,
    #[serde(default = "default_system_identity")]
    pub system_identity: String,
    #[serde(default = "default_request_ttl_seconds")]
    pub request_ttl_seconds: u64,
    #[serde(default)]
    pub request_policy: RequestPolicy,
    #[serde(default = "default_start_open")]
    pub start_open: bool,
}

fn default_cooldown_seconds() -> u64 {
    60
}

fn default_domain_tag() -> String {
    "fog-engine/decryption-snapshot/v1".to_string()
}

fn default_system_identity() -> String {
    "fog-engine:local".to_string()
}

fn default_request_ttl_seconds() -> u64 {
    3_600
}

fn default_start_open() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            domain_tag: default_domain_tag(),
            system_identity: default_system_identity(),
            request_ttl_seconds: default_request_ttl_seconds(),
            request_policy: RequestPolicy::default(),
            start_open: default_start_open(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(raw)
            .map_err(|e| EngineError::Config(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.cooldown_seconds == 0 {
            return Err(EngineError::Config("cooldown_seconds must be > 0".into()));
        }
        if self.request_ttl_seconds == 0 {
            return Err(EngineError::Config("request_ttl_seconds must be > 0".into()));
        }
        if self.domain_tag.is_empty() || self.system_identity.is_empty() {
            return Err(EngineError::Config(
                "domain_tag and system_identity must be non-empty".into(),
            ));
        }
        Ok(())
    }
}
