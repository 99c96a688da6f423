use super::support::*;
use crate::audit::EngineEvent;
use crate::config::{EngineConfig, RequestPolicy};
use crate::decryption::ContextStatus;
use crate::decryption::cleartext::encode_coordinates;
use crate::error::EngineError;
use crate::types::EntityId;

const TTL: u64 = 600;

#[test]
fn test_expire_only_after_deadline() {
    let mut h = Harness::new();
    h.submit(&alice(), 3, 4, 0);
    let id = h.engine.request_decryption(&bob(), &alice(), 100).unwrap();
    assert_eq!(h.engine.context(id).unwrap().deadline, 100 + TTL);

    assert_eq!(
        h.engine.expire(&owner(), id, 100 + TTL - 1),
        Err(EngineError::RequestNotOverdue(id.0))
    );
    h.engine.expire(&owner(), id, 100 + TTL).unwrap();

    assert_eq!(h.engine.context(id).unwrap().status, ContextStatus::Expired);
    assert!(h.engine.pending_requests().is_empty());
    assert_eq!(
        h.engine.events().last().unwrap().event,
        EngineEvent::RequestExpired {
            request_id: id,
            target: alice(),
        }
    );

    // the oracle stops working on it, and a late answer is refused
    assert!(!h.stack.oracle.pending().contains(&id));
    let response = h.stack.oracle.attest(id, encode_coordinates(3, 4).to_vec());
    assert_eq!(h.deliver(&response), Err(EngineError::RequestExpired(id.0)));
    assert_eq!(
        h.engine.expire(&owner(), id, u64::MAX),
        Err(EngineError::RequestClosed(id.0))
    );
}

#[test]
fn test_expire_requires_owner() {
    let mut h = Harness::new();
    h.submit(&alice(), 3, 4, 0);
    let id = h.engine.request_decryption(&alice(), &alice(), 0).unwrap();

    assert!(matches!(
        h.engine.expire(&alice(), id, u64::MAX),
        Err(EngineError::Unauthorized(_))
    ));
    assert_eq!(h.engine.context(id).unwrap().status, ContextStatus::Requested);
}

#[test]
fn test_expire_finalized_or_unknown_request() {
    let mut h = Harness::new();
    h.submit(&alice(), 3, 4, 0);
    let id = h.engine.request_decryption(&alice(), &alice(), 0).unwrap();
    let response = h.fulfil(id);
    h.deliver(&response).unwrap();

    assert_eq!(
        h.engine.expire(&owner(), id, u64::MAX),
        Err(EngineError::RequestClosed(id.0))
    );
    assert_eq!(
        h.engine.expire(&owner(), crate::types::RequestId(404), u64::MAX),
        Err(EngineError::UnknownRequest(404))
    );
}

#[test]
fn test_expire_ignores_pause() {
    let mut h = Harness::new();
    h.submit(&alice(), 3, 4, 0);
    let id = h.engine.request_decryption(&alice(), &alice(), 0).unwrap();
    h.engine.set_paused(&owner(), true).unwrap();
    h.engine.close_epoch(&owner()).unwrap();

    assert!(h.engine.expire(&owner(), id, TTL).is_ok());
}

#[test]
fn test_providers_only_policy() {
    let mut h = Harness::new();
    let carol = EntityId::from("carol");
    h.submit(&alice(), 1, 2, 0);
    h.submit(&bob(), 5, 6, 0);
    h.engine.add_provider(&owner(), carol.clone()).unwrap();

    assert_eq!(h.engine.request_policy(), RequestPolicy::Open);
    h.engine
        .set_request_policy(&owner(), RequestPolicy::ProvidersOnly)
        .unwrap();
    assert_eq!(
        h.engine.events().last().unwrap().event,
        EngineEvent::RequestPolicyChanged {
            policy: RequestPolicy::ProvidersOnly,
        }
    );

    // a stranger may not ask about someone else
    assert!(matches!(
        h.engine.request_decryption(&bob(), &alice(), 0),
        Err(EngineError::Unauthorized(_))
    ));
    // the target itself may
    assert!(h.engine.request_decryption(&alice(), &alice(), 0).is_ok());
    // providers and the owner may ask about anyone
    assert!(h.engine.request_decryption(&carol, &bob(), 0).is_ok());
    assert!(h.engine.request_decryption(&owner(), &alice(), COOLDOWN).is_ok());
}

#[test]
fn test_policy_check_precedes_pause() {
    let config = EngineConfig {
        request_policy: RequestPolicy::ProvidersOnly,
        ..test_config()
    };
    let mut h = Harness::with_config(config);
    h.submit(&alice(), 1, 2, 0);
    h.engine.set_paused(&owner(), true).unwrap();

    assert!(matches!(
        h.engine.request_decryption(&bob(), &alice(), 0),
        Err(EngineError::Unauthorized(_))
    ));
    assert_eq!(
        h.engine.request_decryption(&owner(), &alice(), 0),
        Err(EngineError::SystemPaused)
    );
}
