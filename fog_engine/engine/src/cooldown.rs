//! Per-entity, per-action rate limiting.
//!
//! Checking and recording are split: `check` hands out a [`CooldownPermit`] and only
//! `commit` consumes the window, so the caller commits after its own operation succeeded.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::types::{EntityId, Timestamp};

/// The two independently rate-limited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Keyed by the submitting entity.
    Submit,
    /// Keyed by the target of the request, not the requester.
    DecryptionRequest,
}

/// Proof that `check` passed for `(kind, entity)` at `at`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a permit only consumes the cooldown window once committed"]
pub struct CooldownPermit {
    kind: ActionKind,
    entity: EntityId,
    at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CooldownGuard {
    cooldown_seconds: u64,
    last: HashMap<(ActionKind, EntityId), Timestamp>,
}

impl CooldownGuard {
    pub fn new(cooldown_seconds: u64) -> EngineResult<Self> {
        Self::validate(cooldown_seconds)?;
        Ok(CooldownGuard {
            cooldown_seconds,
            last: HashMap::new(),
        })
    }

    pub fn cooldown_seconds(&self) -> u64 {
        self.cooldown_seconds
    }

    /// Authorization is the caller's job; this only validates the value.
    pub fn set_cooldown_seconds(&mut self, seconds: u64) -> EngineResult<()> {
        Self::validate(seconds)?;
        self.cooldown_seconds = seconds;
        Ok(())
    }

    pub fn last_action(&self, kind: ActionKind, entity: &EntityId) -> Option<Timestamp> {
        self.last.get(&(kind, entity.clone())).copied()
    }

    /// Earliest time at which `(kind, entity)` may act again.
    pub fn ready_at(&self, kind: ActionKind, entity: &EntityId) -> Timestamp {
        self.last_action(kind, entity)
            .map_or(0, |last| last.saturating_add(self.cooldown_seconds))
    }

    pub fn check(
        &self,
        kind: ActionKind,
        entity: &EntityId,
        now: Timestamp,
    ) -> EngineResult<CooldownPermit> {
        let ready_at = self.ready_at(kind, entity);
        if now < ready_at {
            return Err(EngineError::CooldownActive { ready_at });
        }
        Ok(CooldownPermit {
            kind,
            entity: entity.clone(),
            at: now,
        })
    }

    pub fn commit(&mut self, permit: CooldownPermit) {
        self.last.insert((permit.kind, permit.entity), permit.at);
    }

    fn validate(seconds: u64) -> EngineResult<()> {
        if seconds == 0 {
            return Err(EngineError::InvalidParameter(
                "cooldown_seconds must be > 0".into(),
            ));
        }
        Ok(())
    }
}
