use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::crypto::signing::{Ed25519ProofVerifier, OracleSigner};
use crate::decryption::cleartext::encode_coordinates;
use crate::engine::Collaborators;
use crate::error::{EngineError, EngineResult};
use crate::oracle::DecryptionOracle;
use crate::types::{CiphertextHandle, RequestId};
use crate::vault::backend::simulated::SealedCiphertextBackend;

/// What the oracle delivers to the engine's callback entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    pub request_id: RequestId,
    pub cleartext: Vec<u8>,
    pub proof: Vec<u8>,
}

struct OracleState {
    next_id: u64,
    pending: BTreeMap<RequestId, [CiphertextHandle; 2]>,
}

/// In-process oracle: decrypts through the sealed backend and signs with its own ed25519 key.
/// Cheap to clone; clones share the queue and the key.
#[derive(Clone)]
pub struct SimulatedOracle {
    backend: Arc<SealedCiphertextBackend>,
    signer: Arc<OracleSigner>,
    state: Arc<Mutex<OracleState>>,
}

impl SimulatedOracle {
    pub fn new(backend: Arc<SealedCiphertextBackend>) -> Self {
        Self::with_signer(backend, OracleSigner::generate())
    }

    pub fn with_signer(backend: Arc<SealedCiphertextBackend>, signer: OracleSigner) -> Self {
        SimulatedOracle {
            backend,
            signer: Arc::new(signer),
            state: Arc::new(Mutex::new(OracleState {
                next_id: 1,
                pending: BTreeMap::new(),
            })),
        }
    }

    pub fn verifier(&self) -> Ed25519ProofVerifier {
        self.signer.verifier()
    }

    /// Requests submitted but neither fulfilled nor cancelled, ascending.
    pub fn pending(&self) -> Vec<RequestId> {
        self.state
            .lock()
            .map(|s| s.pending.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Decrypt a queued request into the x-then-y cleartext layout and sign it.
    pub fn fulfil(&self, request_id: RequestId) -> EngineResult<OracleResponse> {
        let handles = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| EngineError::Backend("oracle state lock poisoned".into()))?;
            state.pending.remove(&request_id).ok_or_else(|| {
                EngineError::Backend(format!("oracle has no pending {request_id}"))
            })?
        };

        let [x, y] = handles;
        let cleartext = encode_coordinates(self.backend.open(&x)?, self.backend.open(&y)?).to_vec();

        debug!(request_id = request_id.0, bytes = cleartext.len(), "oracle fulfilled request");
        Ok(self.attest(request_id, cleartext))
    }

    /// Sign an arbitrary payload for `request_id`. A correctly signed but otherwise
    /// wrong answer is exactly what a misbehaving oracle would send.
    pub fn attest(&self, request_id: RequestId, cleartext: Vec<u8>) -> OracleResponse {
        let proof = self.signer.sign(request_id, &cleartext);
        OracleResponse {
            request_id,
            cleartext,
            proof,
        }
    }
}

impl DecryptionOracle for SimulatedOracle {
    fn submit_request(&self, ordered_ciphertexts: &[CiphertextHandle]) -> EngineResult<RequestId> {
        let pair: [CiphertextHandle; 2] = ordered_ciphertexts.try_into().map_err(|_| {
            EngineError::InvalidParameter(format!(
                "expected 2 ciphertexts, got {}",
                ordered_ciphertexts.len()
            ))
        })?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| EngineError::Backend("oracle state lock poisoned".into()))?;
        let request_id = RequestId(state.next_id);
        state.next_id += 1;
        state.pending.insert(request_id, pair);

        info!(request_id = request_id.0, "oracle accepted request");
        Ok(request_id)
    }

    fn cancel_request(&self, request_id: RequestId) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.pending.remove(&request_id).is_some() {
            debug!(request_id = request_id.0, "oracle dropped cancelled request");
        }
    }
}

/// Sealed backend + oracle wired together, for the CLI and tests.
pub struct SimulatedStack {
    pub backend: Arc<SealedCiphertextBackend>,
    pub oracle: SimulatedOracle,
}

impl SimulatedStack {
    pub fn new() -> Self {
        let backend = Arc::new(SealedCiphertextBackend::new());
        let oracle = SimulatedOracle::new(backend.clone());
        SimulatedStack { backend, oracle }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            ciphertexts: self.backend.clone(),
            oracle: Arc::new(self.oracle.clone()),
            verifier: Arc::new(self.oracle.verifier()),
        }
    }

    /// Seal a coordinate pair into two fresh handles.
    pub fn seal_position(&self, x: u32, y: u32) -> EngineResult<(CiphertextHandle, CiphertextHandle)> {
        Ok((self.backend.seal(x)?, self.backend.seal(y)?))
    }
}

impl Default for SimulatedStack {
    fn default() -> Self {
        Self::new()
    }
}
