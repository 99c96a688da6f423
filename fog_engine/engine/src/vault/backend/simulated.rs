use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{EngineError, EngineResult};
use crate::types::CiphertextHandle;
use crate::vault::backend::CiphertextBackend;

/// Sealed coordinate, encrypted using AES-GCM
struct SealedBlob {
    ciphertext: Vec<u8>,
    nonce: [u8; 12],
    initialized: bool,
}

impl SealedBlob {
    /// nonce || ciphertext
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.nonce.len() + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

/// Simulated encrypted-value subsystem. Coordinates are sealed under an ephemeral
/// AES-256-GCM key that never leaves this struct; only the oracle may `open`.
pub struct SealedCiphertextBackend {
    store: Arc<RwLock<HashMap<CiphertextHandle, SealedBlob>>>,
    cipher: Aes256Gcm,
}

impl SealedCiphertextBackend {
    pub fn new() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut key[..]);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

        SealedCiphertextBackend {
            store: Arc::new(RwLock::new(HashMap::new())),
            cipher,
        }
    }

    /// Encrypt a coordinate into a fresh, not yet initialized handle.
    pub fn seal(&self, value: u32) -> EngineResult<CiphertextHandle> {
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, value.to_be_bytes().as_ref())
            .map_err(|e| EngineError::Backend(format!("encryption failed: {e:?}")))?;

        let blob = SealedBlob {
            ciphertext,
            nonce: nonce_bytes,
            initialized: false,
        };
        let handle = CiphertextHandle(*blake3::hash(&blob.canonical_bytes()).as_bytes());

        let mut store = self
            .store
            .write()
            .map_err(|_| EngineError::Backend("ciphertext store lock poisoned".into()))?;
        store.insert(handle, blob);
        Ok(handle)
    }

    /// Decrypt a handle. Oracle-side only; the engine never calls this.
    pub fn open(&self, handle: &CiphertextHandle) -> EngineResult<u32> {
        let store = self
            .store
            .read()
            .map_err(|_| EngineError::Backend("ciphertext store lock poisoned".into()))?;
        let blob = store.get(handle).ok_or_else(|| unknown(handle))?;

        let nonce = Nonce::from_slice(&blob.nonce);
        let plaintext = self
            .cipher
            .decrypt(nonce, blob.ciphertext.as_ref())
            .map_err(|e| EngineError::Backend(format!("decryption failed: {e:?}")))?;

        let bytes: [u8; 4] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::Backend("sealed coordinate is not 4 bytes".into()))?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SealedCiphertextBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown(handle: &CiphertextHandle) -> EngineError {
    EngineError::Backend(format!("unknown ciphertext handle {}", handle.to_hex()))
}

impl CiphertextBackend for SealedCiphertextBackend {
    fn is_initialized(&self, handle: &CiphertextHandle) -> EngineResult<bool> {
        let store = self
            .store
            .read()
            .map_err(|_| EngineError::Backend("ciphertext store lock poisoned".into()))?;
        store
            .get(handle)
            .map(|blob| blob.initialized)
            .ok_or_else(|| unknown(handle))
    }

    fn canonical_bytes(&self, handle: &CiphertextHandle) -> EngineResult<Vec<u8>> {
        let store = self
            .store
            .read()
            .map_err(|_| EngineError::Backend("ciphertext store lock poisoned".into()))?;
        store
            .get(handle)
            .map(SealedBlob::canonical_bytes)
            .ok_or_else(|| unknown(handle))
    }

    fn bind_all(&self, handles: &[CiphertextHandle]) -> EngineResult<()> {
        let mut store = self
            .store
            .write()
            .map_err(|_| EngineError::Backend("ciphertext store lock poisoned".into()))?;

        for (i, handle) in handles.iter().enumerate() {
            let blob = store.get(handle).ok_or_else(|| unknown(handle))?;
            if blob.initialized || handles[..i].contains(handle) {
                return Err(EngineError::AlreadyInitialized);
            }
        }
        for handle in handles {
            if let Some(blob) = store.get_mut(handle) {
                blob.initialized = true;
            }
        }
        Ok(())
    }
}
