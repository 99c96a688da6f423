//! This module will:
//!     Track the single owner
//!     Track which entities are providers
//!     Hold the global pause flag
//!
//! Every owner-only method checks the caller before touching state, so an
//! unauthorized call never mutates anything.

use std::collections::BTreeSet;

use crate::error::{EngineError, EngineResult};
use crate::types::EntityId;

#[derive(Debug, Clone)]
pub struct AccessControl {
    owner: EntityId,
    providers: BTreeSet<EntityId>,
    paused: bool,
}

impl AccessControl {
    pub fn new(owner: EntityId) -> Self {
        AccessControl {
            owner,
            providers: BTreeSet::new(),
            paused: false,
        }
    }

    pub fn owner(&self) -> &EntityId {
        &self.owner
    }

    pub fn is_owner(&self, id: &EntityId) -> bool {
        &self.owner == id
    }

    pub fn is_provider(&self, id: &EntityId) -> bool {
        self.providers.contains(id)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn require_owner(&self, caller: &EntityId) -> EngineResult<()> {
        if !self.is_owner(caller) {
            return Err(EngineError::Unauthorized(format!(
                "{caller} is not the owner"
            )));
        }
        Ok(())
    }

    /// Owner or provider.
    pub fn require_privileged(&self, caller: &EntityId) -> EngineResult<()> {
        if self.is_owner(caller) || self.is_provider(caller) {
            return Ok(());
        }
        Err(EngineError::Unauthorized(format!(
            "{caller} is neither owner nor provider"
        )))
    }

    pub fn require_not_paused(&self) -> EngineResult<()> {
        if self.paused {
            return Err(EngineError::SystemPaused);
        }
        Ok(())
    }

    /// Replace the owner. Returns the previous owner.
    pub fn transfer_owner(
        &mut self,
        caller: &EntityId,
        new_owner: EntityId,
    ) -> EngineResult<EntityId> {
        self.require_owner(caller)?;
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }

    /// Returns false (and changes nothing) if `id` already is a provider.
    pub fn add_provider(&mut self, caller: &EntityId, id: EntityId) -> EngineResult<bool> {
        self.require_owner(caller)?;
        Ok(self.providers.insert(id))
    }

    /// Returns false (and changes nothing) if `id` was not a provider.
    pub fn remove_provider(&mut self, caller: &EntityId, id: &EntityId) -> EngineResult<bool> {
        self.require_owner(caller)?;
        Ok(self.providers.remove(id))
    }

    pub fn set_paused(&mut self, caller: &EntityId, paused: bool) -> EngineResult<()> {
        self.require_owner(caller)?;
        self.paused = paused;
        Ok(())
    }
}
