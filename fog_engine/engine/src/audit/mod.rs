use serde::Serialize;
use tracing::info;

use crate::config::RequestPolicy;
use crate::types::{EntityId, RequestId};

/// Observable state transitions. Submission events carry visibility flags only, never ciphertexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    OwnershipTransferred {
        previous: EntityId,
        new_owner: EntityId,
    },
    ProviderAdded {
        provider: EntityId,
    },
    ProviderRemoved {
        provider: EntityId,
    },
    PauseChanged {
        paused: bool,
    },
    CooldownChanged {
        seconds: u64,
    },
    RequestPolicyChanged {
        policy: RequestPolicy,
    },
    EpochOpened {
        epoch: u64,
    },
    EpochClosed {
        epoch: u64,
    },
    RecordSubmitted {
        entity: EntityId,
        public_flag: bool,
        party_flag: bool,
    },
    DecryptionRequested {
        request_id: RequestId,
        target: EntityId,
        epoch: u64,
    },
    DecryptionCompleted {
        request_id: RequestId,
        target: EntityId,
        x: u32,
        y: u32,
    },
    RequestExpired {
        request_id: RequestId,
        target: EntityId,
    },
}

impl EngineEvent {
    pub fn label(&self) -> &'static str {
        match self {
            EngineEvent::OwnershipTransferred { .. } => "OWNER",
            EngineEvent::ProviderAdded { .. } | EngineEvent::ProviderRemoved { .. } => "PROVIDER",
            EngineEvent::PauseChanged { .. } => "PAUSE",
            EngineEvent::CooldownChanged { .. } => "COOLDOWN",
            EngineEvent::RequestPolicyChanged { .. } => "POLICY",
            EngineEvent::EpochOpened { .. } | EngineEvent::EpochClosed { .. } => "EPOCH",
            EngineEvent::RecordSubmitted { .. } => "SUBMIT",
            EngineEvent::DecryptionRequested { .. } => "REQUEST",
            EngineEvent::DecryptionCompleted { .. } => "COMPLETE",
            EngineEvent::RequestExpired { .. } => "EXPIRE",
        }
    }
}

/// Entry in the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub event: EngineEvent,
}

/// Append-only event log. Sequence numbers start at 1 and have no gaps,
/// so a consumer can resume from the last `seq` it saw.
#[derive(Debug, Default)]
pub struct EventSink {
    records: Vec<EventRecord>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new event in the log. Returns its sequence number.
    pub fn append(&mut self, event: EngineEvent) -> u64 {
        let seq = self.records.len() as u64 + 1;
        info!(seq, label = event.label(), event = ?event, "engine event");
        self.records.push(EventRecord { seq, event });
        seq
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.records
    }

    /// Everything appended after `seq`. `events_since(0)` is the whole log.
    pub fn events_since(&self, seq: u64) -> &[EventRecord] {
        let start = usize::try_from(seq)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Newest first.
    pub fn recent(&self, count: usize) -> Vec<EventRecord> {
        self.records.iter().rev().take(count).cloned().collect()
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
