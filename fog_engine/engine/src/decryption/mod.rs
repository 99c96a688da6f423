//! Pending decryption contexts and their lifecycle.
//!
//! `Requested -> Finalized` on a verified callback, or `Requested -> Expired` once the
//! owner expires an overdue request. Both are terminal.

pub mod cleartext;
pub mod snapshot;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::types::{EntityId, RequestId, SnapshotHash, Timestamp};
use crate::vault::RecordSnapshot;
use snapshot::SnapshotDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStatus {
    Requested,
    Finalized,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptionContext {
    pub epoch: u64,
    pub snapshot_hash: SnapshotHash,
    pub target_entity: EntityId,
    pub requested_at: Timestamp,
    pub deadline: Timestamp,
    pub status: ContextStatus,
}

impl DecryptionContext {
    pub fn processed(&self) -> bool {
        self.status == ContextStatus::Finalized
    }

    pub fn is_overdue(&self, now: Timestamp) -> bool {
        now >= self.deadline
    }
}

pub struct DecryptionProtocol {
    domain: SnapshotDomain,
    request_ttl_seconds: u64,
    contexts: HashMap<RequestId, DecryptionContext>,
}

impl DecryptionProtocol {
    pub fn new(domain: SnapshotDomain, request_ttl_seconds: u64) -> Self {
        DecryptionProtocol {
            domain,
            request_ttl_seconds,
            contexts: HashMap::new(),
        }
    }

    /// Hash of a record snapshot under this protocol's domain tag and system identity.
    pub fn binding_hash(&self, snapshot: &RecordSnapshot) -> SnapshotHash {
        self.domain.hash(&snapshot.canonical)
    }

    pub fn context(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.contexts.get(&request_id)
    }

    /// Ids still awaiting a callback, ascending.
    pub fn pending(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self
            .contexts
            .iter()
            .filter(|(_, ctx)| ctx.status == ContextStatus::Requested)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Insert a fresh `Requested` context. Ids are never reused, even after finalization.
    pub fn open_context(
        &mut self,
        request_id: RequestId,
        epoch: u64,
        snapshot_hash: SnapshotHash,
        target_entity: EntityId,
        now: Timestamp,
    ) -> EngineResult<&DecryptionContext> {
        if self.contexts.contains_key(&request_id) {
            return Err(EngineError::DuplicateRequestId(request_id.0));
        }
        let ctx = DecryptionContext {
            epoch,
            snapshot_hash,
            target_entity,
            requested_at: now,
            deadline: now.saturating_add(self.request_ttl_seconds),
            status: ContextStatus::Requested,
        };
        Ok(self.contexts.entry(request_id).or_insert(ctx))
    }

    /// First gate of a callback: the context exists and is still `Requested`.
    pub fn admit_callback(&self, request_id: RequestId) -> EngineResult<&DecryptionContext> {
        let ctx = self
            .contexts
            .get(&request_id)
            .ok_or(EngineError::UnknownRequest(request_id.0))?;
        match ctx.status {
            ContextStatus::Requested => Ok(ctx),
            ContextStatus::Finalized => Err(EngineError::ReplayDetected(request_id.0)),
            ContextStatus::Expired => Err(EngineError::RequestExpired(request_id.0)),
        }
    }

    /// The one-way `Requested -> Finalized` transition. Call only after `admit_callback`
    /// and every other check has passed.
    pub fn finalize(&mut self, request_id: RequestId) -> EngineResult<()> {
        self.admit_callback(request_id)?;
        if let Some(ctx) = self.contexts.get_mut(&request_id) {
            ctx.status = ContextStatus::Finalized;
        }
        Ok(())
    }

    /// `Requested -> Expired` for an overdue context. Returns the target entity.
    pub fn expire(&mut self, request_id: RequestId, now: Timestamp) -> EngineResult<EntityId> {
        let ctx = self
            .contexts
            .get_mut(&request_id)
            .ok_or(EngineError::UnknownRequest(request_id.0))?;
        if ctx.status != ContextStatus::Requested {
            return Err(EngineError::RequestClosed(request_id.0));
        }
        if !ctx.is_overdue(now) {
            return Err(EngineError::RequestNotOverdue(request_id.0));
        }
        ctx.status = ContextStatus::Expired;
        Ok(ctx.target_entity.clone())
    }
}
