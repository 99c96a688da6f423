//! The engine aggregate: owns every component and exposes the entry points.
//!
//! Each entry point runs all of its checks before the first mutation, so a rejected call
//! leaves state, cooldowns and the event log untouched. Time is always passed in.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audit::{EngineEvent, EventRecord, EventSink};
use crate::config::{EngineConfig, RequestPolicy};
use crate::cooldown::{ActionKind, CooldownGuard};
use crate::crypto::signing::ProofVerifier;
use crate::decryption::cleartext::decode_coordinates;
use crate::decryption::snapshot::SnapshotDomain;
use crate::decryption::{DecryptionContext, DecryptionProtocol};
use crate::epoch::BatchEpoch;
use crate::error::{EngineError, EngineResult};
use crate::oracle::DecryptionOracle;
use crate::registry::AccessControl;
use crate::types::{CiphertextHandle, EntityId, RequestId, Timestamp};
use crate::vault::backend::CiphertextBackend;
use crate::vault::{EncryptedRecord, EncryptedRecordStore};

/// External collaborators the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub ciphertexts: Arc<dyn CiphertextBackend>,
    pub oracle: Arc<dyn DecryptionOracle>,
    pub verifier: Arc<dyn ProofVerifier>,
}

pub struct FogEngine {
    access: AccessControl,
    cooldowns: CooldownGuard,
    epoch: BatchEpoch,
    records: EncryptedRecordStore,
    protocol: DecryptionProtocol,
    events: EventSink,
    policy: RequestPolicy,
    oracle: Arc<dyn DecryptionOracle>,
    verifier: Arc<dyn ProofVerifier>,
}

fn log_rejection(operation: &'static str, err: &EngineError) {
    warn!(operation, category = ?err.category(), error = %err, "operation rejected");
}

impl FogEngine {
    pub fn new(
        config: &EngineConfig,
        owner: EntityId,
        collaborators: Collaborators,
    ) -> EngineResult<Self> {
        config.validate()?;
        let domain = SnapshotDomain::new(config.domain_tag.clone(), config.system_identity.clone());

        info!(%owner, system = %config.system_identity, "fog engine initialized");
        Ok(FogEngine {
            access: AccessControl::new(owner),
            cooldowns: CooldownGuard::new(config.cooldown_seconds)?,
            epoch: BatchEpoch::new(config.start_open),
            records: EncryptedRecordStore::new(collaborators.ciphertexts),
            protocol: DecryptionProtocol::new(domain, config.request_ttl_seconds),
            events: EventSink::new(),
            policy: config.request_policy,
            oracle: collaborators.oracle,
            verifier: collaborators.verifier,
        })
    }

    // ======================
    // Access control
    // ======================

    pub fn transfer_owner(&mut self, caller: &EntityId, new_owner: EntityId) -> EngineResult<()> {
        let previous = self
            .access
            .transfer_owner(caller, new_owner.clone())
            .inspect_err(|e| log_rejection("transfer_owner", e))?;
        self.events.append(EngineEvent::OwnershipTransferred {
            previous,
            new_owner,
        });
        Ok(())
    }

    /// No event when `provider` already holds the role.
    pub fn add_provider(&mut self, caller: &EntityId, provider: EntityId) -> EngineResult<()> {
        let added = self
            .access
            .add_provider(caller, provider.clone())
            .inspect_err(|e| log_rejection("add_provider", e))?;
        if added {
            self.events.append(EngineEvent::ProviderAdded { provider });
        }
        Ok(())
    }

    pub fn remove_provider(&mut self, caller: &EntityId, provider: &EntityId) -> EngineResult<()> {
        let removed = self
            .access
            .remove_provider(caller, provider)
            .inspect_err(|e| log_rejection("remove_provider", e))?;
        if removed {
            self.events.append(EngineEvent::ProviderRemoved {
                provider: provider.clone(),
            });
        }
        Ok(())
    }

    pub fn set_paused(&mut self, caller: &EntityId, paused: bool) -> EngineResult<()> {
        self.access
            .set_paused(caller, paused)
            .inspect_err(|e| log_rejection("set_paused", e))?;
        self.events.append(EngineEvent::PauseChanged { paused });
        Ok(())
    }

    pub fn set_request_policy(&mut self, caller: &EntityId, policy: RequestPolicy) -> EngineResult<()> {
        self.access
            .require_owner(caller)
            .inspect_err(|e| log_rejection("set_request_policy", e))?;
        self.policy = policy;
        self.events.append(EngineEvent::RequestPolicyChanged { policy });
        Ok(())
    }

    // ======================
    // Cooldown + epoch
    // ======================

    pub fn set_cooldown_seconds(&mut self, caller: &EntityId, seconds: u64) -> EngineResult<()> {
        self.access
            .require_owner(caller)
            .and_then(|_| self.cooldowns.set_cooldown_seconds(seconds))
            .inspect_err(|e| log_rejection("set_cooldown_seconds", e))?;
        self.events.append(EngineEvent::CooldownChanged { seconds });
        Ok(())
    }

    pub fn open_next_epoch(&mut self, caller: &EntityId) -> EngineResult<u64> {
        self.access
            .require_owner(caller)
            .inspect_err(|e| log_rejection("open_next_epoch", e))?;
        let epoch = self.epoch.open_next();
        self.events.append(EngineEvent::EpochOpened { epoch });
        Ok(epoch)
    }

    pub fn close_epoch(&mut self, caller: &EntityId) -> EngineResult<u64> {
        self.access
            .require_owner(caller)
            .inspect_err(|e| log_rejection("close_epoch", e))?;
        let epoch = self.epoch.close();
        self.events.append(EngineEvent::EpochClosed { epoch });
        Ok(epoch)
    }

    // ======================
    // Records
    // ======================

    /// Replace `entity`'s record with two freshly sealed, not yet initialized handles.
    pub fn submit(
        &mut self,
        entity: &EntityId,
        encrypted_x: CiphertextHandle,
        encrypted_y: CiphertextHandle,
        public_flag: bool,
        party_flag: bool,
        now: Timestamp,
    ) -> EngineResult<()> {
        self.try_submit(entity, encrypted_x, encrypted_y, public_flag, party_flag, now)
            .inspect_err(|e| warn!(%entity, category = ?e.category(), error = %e, "submit rejected"))
    }

    fn try_submit(
        &mut self,
        entity: &EntityId,
        encrypted_x: CiphertextHandle,
        encrypted_y: CiphertextHandle,
        public_flag: bool,
        party_flag: bool,
        now: Timestamp,
    ) -> EngineResult<()> {
        self.access.require_not_paused()?;
        self.epoch.require_open()?;
        let permit = self.cooldowns.check(ActionKind::Submit, entity, now)?;

        self.records
            .submit(entity, encrypted_x, encrypted_y, public_flag, party_flag)?;
        self.cooldowns.commit(permit);

        info!(%entity, public_flag, party_flag, "record submitted");
        self.events.append(EngineEvent::RecordSubmitted {
            entity: entity.clone(),
            public_flag,
            party_flag,
        });
        Ok(())
    }

    // ======================
    // Decryption protocol
    // ======================

    /// Snapshot `target`'s record, hand its ciphertexts to the oracle and open a pending context.
    /// Returns immediately; the result arrives later via [`FogEngine::on_decryption_callback`].
    pub fn request_decryption(
        &mut self,
        caller: &EntityId,
        target: &EntityId,
        now: Timestamp,
    ) -> EngineResult<RequestId> {
        self.try_request_decryption(caller, target, now).inspect_err(|e| {
            warn!(%caller, %target, category = ?e.category(), error = %e, "decryption request rejected")
        })
    }

    fn try_request_decryption(
        &mut self,
        caller: &EntityId,
        target: &EntityId,
        now: Timestamp,
    ) -> EngineResult<RequestId> {
        if self.policy == RequestPolicy::ProvidersOnly && caller != target {
            self.access.require_privileged(caller)?;
        }
        self.access.require_not_paused()?;
        self.epoch.require_open()?;
        let permit = self
            .cooldowns
            .check(ActionKind::DecryptionRequest, target, now)?;

        let snapshot = self.records.snapshot(target)?;
        let snapshot_hash = self.protocol.binding_hash(&snapshot);
        debug!(%target, snapshot = %snapshot_hash, "snapshot bound");

        let request_id = self.oracle.submit_request(&snapshot.handles)?;
        let epoch = self.epoch.current();
        self.protocol
            .open_context(request_id, epoch, snapshot_hash, target.clone(), now)?;
        self.cooldowns.commit(permit);

        info!(request_id = request_id.0, %target, %caller, epoch, "decryption requested");
        self.events.append(EngineEvent::DecryptionRequested {
            request_id,
            target: target.clone(),
            epoch,
        });
        Ok(request_id)
    }

    /// Oracle entry point. Anyone may call it; only a matching `(request_id, proof)` succeeds.
    ///
    /// Check order: known request, not already finalized or expired, record unchanged since the
    /// request, proof valid, cleartext well-formed. Nothing is mutated until all pass, so any
    /// non-terminal rejection may be retried with a corrected payload.
    pub fn on_decryption_callback(
        &mut self,
        request_id: RequestId,
        cleartext: &[u8],
        proof: &[u8],
    ) -> EngineResult<(u32, u32)> {
        self.try_callback(request_id, cleartext, proof).inspect_err(|e| {
            warn!(request_id = request_id.0, category = ?e.category(), error = %e, "callback rejected")
        })
    }

    fn try_callback(
        &mut self,
        request_id: RequestId,
        cleartext: &[u8],
        proof: &[u8],
    ) -> EngineResult<(u32, u32)> {
        let ctx = self.protocol.admit_callback(request_id)?;
        let target = ctx.target_entity.clone();
        let expected = ctx.snapshot_hash;

        // A record that can no longer be snapshotted has drifted too.
        let current = match self.records.snapshot(&target) {
            Ok(snapshot) => self.protocol.binding_hash(&snapshot),
            Err(EngineError::NotInitialized) => {
                return Err(EngineError::StateMismatch(request_id.0));
            }
            Err(e) => return Err(e),
        };
        if current != expected {
            return Err(EngineError::StateMismatch(request_id.0));
        }

        if !self.verifier.verify(request_id, cleartext, proof) {
            return Err(EngineError::InvalidDecryptionProof(request_id.0));
        }
        let (x, y) = decode_coordinates(cleartext)?;

        self.protocol.finalize(request_id)?;

        info!(request_id = request_id.0, %target, "decryption completed");
        self.events.append(EngineEvent::DecryptionCompleted {
            request_id,
            target,
            x,
            y,
        });
        Ok((x, y))
    }

    /// Owner-only: abandon a request whose deadline has passed.
    pub fn expire(&mut self, caller: &EntityId, request_id: RequestId, now: Timestamp) -> EngineResult<()> {
        let target = self
            .access
            .require_owner(caller)
            .and_then(|_| self.protocol.expire(request_id, now))
            .inspect_err(|e| log_rejection("expire", e))?;
        self.oracle.cancel_request(request_id);

        info!(request_id = request_id.0, %target, "decryption request expired");
        self.events.append(EngineEvent::RequestExpired { request_id, target });
        Ok(())
    }

    // ======================
    // Queries
    // ======================

    pub fn read(&self, entity: &EntityId) -> Option<&EncryptedRecord> {
        self.records.read(entity)
    }

    pub fn visibility(&self, entity: &EntityId) -> Option<(bool, bool)> {
        self.records.visibility(entity)
    }

    pub fn context(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.protocol.context(request_id)
    }

    pub fn pending_requests(&self) -> Vec<RequestId> {
        self.protocol.pending()
    }

    /// Issued in the current epoch, and that epoch is still open.
    pub fn is_current(&self, request_id: RequestId) -> bool {
        self.epoch.is_open()
            && self
                .protocol
                .context(request_id)
                .is_some_and(|ctx| ctx.epoch == self.epoch.current())
    }

    pub fn owner(&self) -> &EntityId {
        self.access.owner()
    }

    pub fn is_provider(&self, id: &EntityId) -> bool {
        self.access.is_provider(id)
    }

    pub fn is_paused(&self) -> bool {
        self.access.is_paused()
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.current()
    }

    pub fn is_batch_open(&self) -> bool {
        self.epoch.is_open()
    }

    pub fn cooldown_seconds(&self) -> u64 {
        self.cooldowns.cooldown_seconds()
    }

    pub fn request_policy(&self) -> RequestPolicy {
        self.policy
    }

    pub fn events(&self) -> &[EventRecord] {
        self.events.events()
    }

    pub fn events_since(&self, seq: u64) -> &[EventRecord] {
        self.events.events_since(seq)
    }
}
