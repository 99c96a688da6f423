use crate::config::EngineConfig;
use crate::engine::FogEngine;
use crate::oracle::simulated::{OracleResponse, SimulatedStack};
use crate::types::{CiphertextHandle, EntityId, RequestId, Timestamp};

pub const COOLDOWN: u64 = 60;

pub fn owner() -> EntityId {
    EntityId::from("owner")
}

pub fn alice() -> EntityId {
    EntityId::from("alice")
}

pub fn bob() -> EntityId {
    EntityId::from("bob")
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        cooldown_seconds: COOLDOWN,
        request_ttl_seconds: 600,
        ..EngineConfig::default()
    }
}

/// Engine wired to an in-process sealed backend and oracle.
pub struct Harness {
    pub stack: SimulatedStack,
    pub engine: FogEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let stack = SimulatedStack::new();
        let engine = FogEngine::new(&config, owner(), stack.collaborators()).expect("engine");
        Harness { stack, engine }
    }

    pub fn seal(&self, x: u32, y: u32) -> (CiphertextHandle, CiphertextHandle) {
        self.stack.seal_position(x, y).expect("seal")
    }

    pub fn submit(&mut self, entity: &EntityId, x: u32, y: u32, now: Timestamp) {
        let (hx, hy) = self.seal(x, y);
        self.engine
            .submit(entity, hx, hy, false, false, now)
            .expect("submit");
    }

    pub fn fulfil(&self, request_id: RequestId) -> OracleResponse {
        self.stack.oracle.fulfil(request_id).expect("fulfil")
    }

    pub fn deliver(&mut self, response: &OracleResponse) -> crate::error::EngineResult<(u32, u32)> {
        self.engine.on_decryption_callback(
            response.request_id,
            &response.cleartext,
            &response.proof,
        )
    }
}
