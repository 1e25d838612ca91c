mod common;

use application::OutputManager;
use application::messaging::command_listener::handle_payload;
use common::{Harness, relay};
use domain::DomainError;
use domain::output::{ManipulateRequest, OutputId, RunMode, ShutdownState, SwitchState};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Calls = Arc<Mutex<Vec<common::SwitchCall>>>;

/// Manager holding one relay; returns the harness pieces tests inspect
async fn manager_with_relay(id: &str) -> (Arc<OutputManager>, Calls, Arc<domain::clock::ManualClock>) {
    let mut h = Harness::new(relay(id).with_shutdown(ShutdownState::Off));
    let workers = h.workers.take().unwrap();
    let manager = Arc::new(OutputManager::new(workers));
    let calls = h.calls.clone();
    let clock = h.clock.clone();
    manager.register(h.runtime).await.unwrap();
    (manager, calls, clock)
}

#[tokio::test]
async fn test_manipulate_routes_to_output() {
    let (manager, calls, _) = manager_with_relay("relay-1").await;
    let id = OutputId::new("relay-1").unwrap();

    let outcome = manager
        .manipulate(&id, ManipulateRequest::on().amount(5.0))
        .await
        .unwrap();

    assert_eq!(outcome.code(), 0);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(manager.run_mode(&id).await.unwrap(), RunMode::OnTimed);
    assert_eq!(manager.output_ids(), vec![id]);
}

#[tokio::test]
async fn test_unknown_output_is_an_error() {
    let (manager, _, _) = manager_with_relay("relay-1").await;
    let missing = OutputId::new("relay-9").unwrap();

    let result = manager.manipulate(&missing, ManipulateRequest::off()).await;

    assert!(matches!(result, Err(DomainError::OutputNotFound(id)) if id == "relay-9"));
    assert!(manager.seconds_currently_on(&missing).await.is_err());
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let (manager, _, _) = manager_with_relay("relay-1").await;
    let duplicate = Harness::new(relay("relay-1"));

    let result = manager.register(duplicate.runtime).await;

    assert!(matches!(result, Err(DomainError::InvalidConfiguration(_))));
}

#[tokio::test]
async fn test_expiry_pass_turns_off_elapsed_outputs() {
    let (manager, calls, clock) = manager_with_relay("relay-1").await;
    let id = OutputId::new("relay-1").unwrap();
    manager
        .manipulate(&id, ManipulateRequest::on().amount(10.0))
        .await
        .unwrap();

    clock.advance_secs(5.0);
    manager.expire_due().await;
    assert_eq!(calls.lock().unwrap().len(), 1);

    clock.advance_secs(5.0);
    manager.expire_due().await;
    manager.expire_due().await;

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, SwitchState::Off);
    assert_eq!(manager.run_mode(&id).await.unwrap(), RunMode::Off);
}

#[tokio::test]
async fn test_expiry_watcher_runs_in_background() {
    let (manager, calls, clock) = manager_with_relay("relay-1").await;
    let id = OutputId::new("relay-1").unwrap();
    manager
        .manipulate(&id, ManipulateRequest::on().amount(1.0))
        .await
        .unwrap();
    clock.advance_secs(2.0);

    manager.start_expiry_watcher(Duration::from_millis(10)).await;
    for _ in 0..50 {
        if calls.lock().unwrap().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(calls.lock().unwrap().len(), 2);
    manager.shutdown_all().await;
}

#[tokio::test]
async fn test_shutdown_applies_shutdown_state() {
    let (manager, calls, _) = manager_with_relay("relay-1").await;
    let id = OutputId::new("relay-1").unwrap();
    manager.manipulate(&id, ManipulateRequest::on()).await.unwrap();

    manager.shutdown_all().await;

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, SwitchState::Off);

    let outcome = manager.manipulate(&id, ManipulateRequest::on()).await.unwrap();
    assert_eq!(outcome.code(), 1);
}

#[tokio::test]
async fn test_command_payload_applied_and_answered() {
    let (manager, calls, _) = manager_with_relay("relay-1").await;

    let reply = handle_payload(
        &manager,
        br#"{"output_id":"relay-1","state":"on","output_type":"sec","amount":30,"min_off":10}"#,
    )
    .await;

    assert_eq!(reply.code, 0, "{}", reply.message);
    assert_eq!(reply.output_id.as_deref(), Some("relay-1"));
    assert_eq!(calls.lock().unwrap()[0].2, Some(30.0));
}

#[tokio::test]
async fn test_bad_command_payloads_answered_with_code_one() {
    let (manager, calls, _) = manager_with_relay("relay-1").await;

    let malformed = handle_payload(&manager, b"not json").await;
    assert_eq!(malformed.code, 1);
    assert_eq!(malformed.output_id, None);

    let unknown = handle_payload(&manager, br#"{"output_id":"relay-9","state":"off"}"#).await;
    assert_eq!(unknown.code, 1);
    assert_eq!(unknown.output_id.as_deref(), Some("relay-9"));

    let bad_state = handle_payload(&manager, br#"{"output_id":"relay-1","state":"toggle"}"#).await;
    assert_eq!(bad_state.code, 1);

    assert!(calls.lock().unwrap().is_empty());
}
