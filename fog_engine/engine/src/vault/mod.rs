//! Vault of encrypted positional records, one per entity.
//! Records are replaced wholesale by `submit`; there is no partial update and no delete.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::types::{CiphertextHandle, EntityId};
use crate::vault::backend::CiphertextBackend;

pub mod backend;

/// An entity's encrypted coordinates plus visibility metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedRecord {
    pub encrypted_x: CiphertextHandle,
    pub encrypted_y: CiphertextHandle,
    /// Owner opted into exposing decrypted coordinates broadly.
    pub public_flag: bool,
    /// Visible to co-members of a group. Carried as opaque metadata.
    pub party_flag: bool,
}

impl EncryptedRecord {
    /// Fixed order: x before y. Request and callback must both use this.
    pub fn ordered_ciphertexts(&self) -> [CiphertextHandle; 2] {
        [self.encrypted_x, self.encrypted_y]
    }
}

/// Handles and canonical bytes of a record, read at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    pub handles: [CiphertextHandle; 2],
    pub canonical: [Vec<u8>; 2],
}

pub struct EncryptedRecordStore {
    records: HashMap<EntityId, EncryptedRecord>,
    backend: Arc<dyn CiphertextBackend>,
}

impl EncryptedRecordStore {
    pub fn new(backend: Arc<dyn CiphertextBackend>) -> Self {
        EncryptedRecordStore {
            records: HashMap::new(),
            backend,
        }
    }

    /// Bind two fresh handles to `entity`, replacing any previous record.
    ///
    /// Pause, epoch and cooldown gating happen in the engine; this only enforces
    /// that both handles are fresh. Nothing is bound unless both pass.
    pub fn submit(
        &mut self,
        entity: &EntityId,
        encrypted_x: CiphertextHandle,
        encrypted_y: CiphertextHandle,
        public_flag: bool,
        party_flag: bool,
    ) -> EngineResult<()> {
        if encrypted_x == encrypted_y {
            return Err(EngineError::AlreadyInitialized);
        }
        for handle in [&encrypted_x, &encrypted_y] {
            if self.backend.is_initialized(handle)? {
                return Err(EngineError::AlreadyInitialized);
            }
        }

        self.backend.bind_all(&[encrypted_x, encrypted_y])?;

        self.records.insert(
            entity.clone(),
            EncryptedRecord {
                encrypted_x,
                encrypted_y,
                public_flag,
                party_flag,
            },
        );
        Ok(())
    }

    pub fn read(&self, entity: &EntityId) -> Option<&EncryptedRecord> {
        self.records.get(entity)
    }

    /// `(public_flag, party_flag)` for a stored record.
    pub fn visibility(&self, entity: &EntityId) -> Option<(bool, bool)> {
        self.read(entity).map(|r| (r.public_flag, r.party_flag))
    }

    /// Current ciphertexts of `entity`, x then y, with their canonical bytes.
    /// Fails with `NotInitialized` if there is no record or either handle is not initialized.
    pub fn snapshot(&self, entity: &EntityId) -> EngineResult<RecordSnapshot> {
        let record = self.read(entity).ok_or(EngineError::NotInitialized)?;
        let handles = record.ordered_ciphertexts();

        for handle in &handles {
            if !self.backend.is_initialized(handle)? {
                return Err(EngineError::NotInitialized);
            }
        }

        let canonical = [
            self.backend.canonical_bytes(&handles[0])?,
            self.backend.canonical_bytes(&handles[1])?,
        ];
        Ok(RecordSnapshot { handles, canonical })
    }
}
