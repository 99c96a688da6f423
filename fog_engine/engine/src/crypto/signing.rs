//! Oracle proof signing and verification (ed25519).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{EngineError, EngineResult};
use crate::types::RequestId;

/// Domain separator for oracle proofs.
pub const PROOF_DOMAIN: &[u8] = b"fog-engine/decryption-proof/v1";

/// Authoritative check that `cleartext` is the oracle's answer to `request_id`.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, request_id: RequestId, cleartext: &[u8], proof: &[u8]) -> bool;
}

/// Bytes the oracle signs: domain || request_id (u64 BE) || cleartext.
pub fn proof_message(request_id: RequestId, cleartext: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(PROOF_DOMAIN.len() + 8 + cleartext.len());
    msg.extend_from_slice(PROOF_DOMAIN);
    msg.extend_from_slice(&request_id.0.to_be_bytes());
    msg.extend_from_slice(cleartext);
    msg
}

/// Oracle-side signing key. Zeroized on drop by ed25519-dalek.
pub struct OracleSigner {
    key: SigningKey,
}

impl OracleSigner {
    pub fn generate() -> Self {
        OracleSigner {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret(secret: &[u8; 32]) -> Self {
        OracleSigner {
            key: SigningKey::from_bytes(secret),
        }
    }

    pub fn sign(&self, request_id: RequestId, cleartext: &[u8]) -> Vec<u8> {
        self.key
            .sign(&proof_message(request_id, cleartext))
            .to_bytes()
            .to_vec()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn verifier(&self) -> Ed25519ProofVerifier {
        Ed25519ProofVerifier::new(self.verifying_key())
    }
}

#[derive(Debug, Clone)]
pub struct Ed25519ProofVerifier {
    key: VerifyingKey,
}

impl Ed25519ProofVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Ed25519ProofVerifier { key }
    }

    pub fn from_hex(pubkey_hex: &str) -> EngineResult<Self> {
        let bytes = hex::decode(pubkey_hex)
            .map_err(|e| EngineError::Config(format!("invalid oracle key hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::Config("oracle key must be 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| EngineError::Config(format!("invalid oracle key: {e:?}")))?;
        Ok(Self::new(key))
    }
}

impl ProofVerifier for Ed25519ProofVerifier {
    fn verify(&self, request_id: RequestId, cleartext: &[u8], proof: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(proof) else {
            return false;
        };
        self.key
            .verify(&proof_message(request_id, cleartext), &signature)
            .is_ok()
    }
}
