//! The off-path decryption oracle, seen from the engine.
//!
//! Submitting is synchronous and returns the request id; the answer comes back later
//! through `FogEngine::on_decryption_callback`, never as a return value.

pub mod simulated;

use crate::error::EngineResult;
use crate::types::{CiphertextHandle, RequestId};

pub trait DecryptionOracle: Send + Sync {
    /// Queue the ordered ciphertexts for decryption. The returned id is unique and never reused.
    fn submit_request(&self, ordered_ciphertexts: &[CiphertextHandle]) -> EngineResult<RequestId>;

    /// Stop work on a request the engine will no longer accept an answer for.
    /// Unknown or already answered ids are ignored.
    fn cancel_request(&self, request_id: RequestId);
}
