use std::sync::Arc;

use super::support::*;
use crate::audit::EngineEvent;
use crate::crypto::signing::ProofVerifier;
use crate::decryption::ContextStatus;
use crate::engine::{Collaborators, FogEngine};
use crate::error::{EngineError, EngineResult};
use crate::oracle::DecryptionOracle;
use crate::types::{CiphertextHandle, RequestId};

#[test]
fn test_full_request_callback_flow() {
    let mut h = Harness::new();
    h.submit(&alice(), 1_234, 98_765, 100);

    let id = h.engine.request_decryption(&bob(), &alice(), 100).unwrap();
    let ctx = h.engine.context(id).unwrap();
    assert_eq!(ctx.target_entity, alice());
    assert_eq!(ctx.epoch, 1);
    assert_eq!(ctx.status, ContextStatus::Requested);
    assert_eq!(h.engine.pending_requests(), vec![id]);

    let response = h.fulfil(id);
    assert_eq!(h.deliver(&response).unwrap(), (1_234, 98_765));

    assert!(h.engine.context(id).unwrap().processed());
    assert!(h.engine.pending_requests().is_empty());
    assert_eq!(
        h.engine.events().last().unwrap().event,
        EngineEvent::DecryptionCompleted {
            request_id: id,
            target: alice(),
            x: 1_234,
            y: 98_765,
        }
    );
}

#[test]
fn test_replay_is_rejected_with_any_payload() {
    let mut h = Harness::new();
    h.submit(&alice(), 5, 6, 0);
    let id = h.engine.request_decryption(&alice(), &alice(), 0).unwrap();
    let response = h.fulfil(id);
    h.deliver(&response).unwrap();
    let events_before = h.engine.events().len();

    assert_eq!(h.deliver(&response), Err(EngineError::ReplayDetected(id.0)));

    let forged = h.stack.oracle.attest(id, vec![0xFF; 8]);
    assert_eq!(h.deliver(&forged), Err(EngineError::ReplayDetected(id.0)));
    assert_eq!(
        h.engine.on_decryption_callback(id, b"junk", b"junk"),
        Err(EngineError::ReplayDetected(id.0))
    );

    assert_eq!(h.engine.events().len(), events_before);
    assert!(h.engine.context(id).unwrap().processed());
}

#[test]
fn test_resubmission_mid_flight_is_state_mismatch() {
    let mut h = Harness::new();

    // submit A, B
    let (a, b) = h.seal(10, 20);
    h.engine.submit(&alice(), a, b, false, false, 0).unwrap();

    // immediate resubmit hits the cooldown
    let (c, d) = h.seal(11, 21);
    assert_eq!(
        h.engine.submit(&alice(), c, d, false, false, 1),
        Err(EngineError::CooldownActive { ready_at: COOLDOWN })
    );

    // request after the window, then the owner moves before the oracle answers
    let id = h.engine.request_decryption(&bob(), &alice(), COOLDOWN + 1).unwrap();
    let (e, f) = h.seal(30, 40);
    h.engine
        .submit(&alice(), e, f, false, false, COOLDOWN + 2)
        .unwrap();

    // proof is valid for the original ciphertexts
    let response = h.fulfil(id);
    assert!(h.stack.oracle.verifier().verify(id, &response.cleartext, &response.proof));
    let events_before = h.engine.events().len();

    assert_eq!(h.deliver(&response), Err(EngineError::StateMismatch(id.0)));
    assert_eq!(h.engine.context(id).unwrap().status, ContextStatus::Requested);
    assert_eq!(h.engine.events().len(), events_before);

    // retrying does not help; the binding is to the old ciphertexts
    assert_eq!(h.deliver(&response), Err(EngineError::StateMismatch(id.0)));
}

#[test]
fn test_other_entity_resubmitting_does_not_disturb_request() {
    let mut h = Harness::new();
    h.submit(&alice(), 1, 2, 0);
    h.submit(&bob(), 3, 4, 0);

    let id = h.engine.request_decryption(&owner(), &alice(), 10).unwrap();
    h.submit(&bob(), 7, 8, COOLDOWN);

    let response = h.fulfil(id);
    assert_eq!(h.deliver(&response).unwrap(), (1, 2));
}

#[test]
fn test_invalid_proof_leaves_context_retryable() {
    let mut h = Harness::new();
    h.submit(&alice(), 42, 43, 0);
    let id = h.engine.request_decryption(&alice(), &alice(), 0).unwrap();
    let response = h.fulfil(id);

    let mut tampered = response.clone();
    tampered.proof[0] ^= 0x01;
    assert_eq!(
        h.deliver(&tampered),
        Err(EngineError::InvalidDecryptionProof(id.0))
    );

    // proof for a different request id
    let wrong_id = h.stack.oracle.attest(RequestId(id.0 + 1), response.cleartext.clone());
    assert_eq!(
        h.engine
            .on_decryption_callback(id, &wrong_id.cleartext, &wrong_id.proof),
        Err(EngineError::InvalidDecryptionProof(id.0))
    );
    assert!(!h.engine.context(id).unwrap().processed());

    assert_eq!(h.deliver(&response).unwrap(), (42, 43));
}

#[test]
fn test_short_cleartext_checks_proof_before_decoding() {
    let mut h = Harness::new();
    h.submit(&alice(), 1, 2, 0);
    let id = h.engine.request_decryption(&alice(), &alice(), 0).unwrap();

    // unsigned 7-byte payload: the proof check fails first
    assert_eq!(
        h.engine.on_decryption_callback(id, &[0u8; 7], &[0u8; 64]),
        Err(EngineError::InvalidDecryptionProof(id.0))
    );

    // correctly signed 7-byte payload still fails decode
    let short = h.stack.oracle.attest(id, vec![0u8; 7]);
    assert_eq!(h.deliver(&short), Err(EngineError::MalformedCleartext(7)));
    assert!(!h.engine.context(id).unwrap().processed());

    let response = h.fulfil(id);
    assert_eq!(h.deliver(&response).unwrap(), (1, 2));
}

#[test]
fn test_unknown_request() {
    let mut h = Harness::new();
    assert_eq!(
        h.engine.on_decryption_callback(RequestId(99), &[0u8; 8], &[0u8; 64]),
        Err(EngineError::UnknownRequest(99))
    );
    assert!(h.engine.events().is_empty());
}

#[test]
fn test_request_for_absent_record_is_not_initialized() {
    let mut h = Harness::new();
    assert_eq!(
        h.engine.request_decryption(&owner(), &alice(), 0),
        Err(EngineError::NotInitialized)
    );
    assert!(h.stack.oracle.pending().is_empty());
}

#[test]
fn test_request_with_batch_closed() {
    let mut h = Harness::new();
    h.submit(&alice(), 1, 2, 0);
    h.engine.close_epoch(&owner()).unwrap();

    assert_eq!(
        h.engine.request_decryption(&alice(), &alice(), 100),
        Err(EngineError::BatchClosed)
    );
    assert!(h.engine.pending_requests().is_empty());
    assert!(h.stack.oracle.pending().is_empty());
}

#[test]
fn test_request_cooldown_is_keyed_by_target() {
    let mut h = Harness::new();
    h.submit(&alice(), 1, 2, 0);
    h.submit(&bob(), 3, 4, 0);

    h.engine.request_decryption(&owner(), &alice(), 10).unwrap();

    // different requester, same target
    assert_eq!(
        h.engine.request_decryption(&bob(), &alice(), 20),
        Err(EngineError::CooldownActive { ready_at: 10 + COOLDOWN })
    );
    // same requester, different target
    assert!(h.engine.request_decryption(&owner(), &bob(), 20).is_ok());
    assert!(h.engine.request_decryption(&bob(), &alice(), 10 + COOLDOWN).is_ok());
}

#[test]
fn test_callback_finalizes_while_paused_and_across_epochs() {
    let mut h = Harness::new();
    h.submit(&alice(), 9, 9, 0);
    let id = h.engine.request_decryption(&alice(), &alice(), 0).unwrap();
    assert!(h.engine.is_current(id));

    h.engine.set_paused(&owner(), true).unwrap();
    h.engine.open_next_epoch(&owner()).unwrap();
    assert!(!h.engine.is_current(id));

    let response = h.fulfil(id);
    assert_eq!(h.deliver(&response).unwrap(), (9, 9));
}

/// Always hands out the same id, as a broken oracle would.
struct StuckOracle;

impl DecryptionOracle for StuckOracle {
    fn submit_request(&self, _ordered: &[CiphertextHandle]) -> EngineResult<RequestId> {
        Ok(RequestId(7))
    }

    fn cancel_request(&self, _request_id: RequestId) {}
}

#[test]
fn test_duplicate_request_id_is_rejected_without_side_effects() {
    let stack = crate::oracle::simulated::SimulatedStack::new();
    let collaborators = Collaborators {
        oracle: Arc::new(StuckOracle),
        ..stack.collaborators()
    };
    let mut engine = FogEngine::new(&test_config(), owner(), collaborators).unwrap();

    for who in [alice(), bob()] {
        let (x, y) = stack.seal_position(1, 1).unwrap();
        engine.submit(&who, x, y, false, false, 0).unwrap();
    }

    assert_eq!(engine.request_decryption(&owner(), &alice(), 0).unwrap(), RequestId(7));
    let events_before = engine.events().len();

    assert_eq!(
        engine.request_decryption(&owner(), &bob(), 0),
        Err(EngineError::DuplicateRequestId(7))
    );
    assert_eq!(engine.events().len(), events_before);
    assert_eq!(engine.context(RequestId(7)).unwrap().target_entity, alice());
    // bob's request cooldown was not consumed
    assert_eq!(
        engine.request_decryption(&owner(), &bob(), 1),
        Err(EngineError::DuplicateRequestId(7))
    );
}
