//! Fog Engine Core Library
//!
//! Encrypted per-entity positions plus the request/callback protocol that lets an
//! off-path oracle decrypt a snapshot of them.

pub mod audit;
pub mod config;
pub mod cooldown;
pub mod crypto;
pub mod decryption;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod registry;
pub mod types;
pub mod vault;

#[cfg(test)]
mod tests;

pub use audit::{EngineEvent, EventRecord};
pub use config::{EngineConfig, RequestPolicy};
pub use engine::{Collaborators, FogEngine};
pub use error::{EngineError, EngineResult, ErrorCategory};
pub use types::{CiphertextHandle, EntityId, RequestId, SnapshotHash, Timestamp};
