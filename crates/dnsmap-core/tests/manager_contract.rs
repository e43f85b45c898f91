//! Contract Test: Domain Manager
//!
//! Verifies how the command layer sequences gateway and store.
//!
//! Constraints verified:
//! - The store is fetched once per session and dropped on disconnect
//! - Every applied mutation is flushed locally, then pushed
//! - Rejected or not-found mutations never touch the server
//! - A failed push is reported, the local change stays
//! - Damaged record files end initialization with an error

mod common;

use common::*;
use dnsmap_core::config::HostKeyPolicy;
use dnsmap_core::{AddOutcome, DomainManager, Error, Mutation, Record, SyncStatus};
use tokio_test::assert_ok;

async fn loaded_manager(remote: Option<&str>) -> DomainManager<MockGateway> {
    let mut manager = DomainManager::new(MockGateway::new(remote));
    let mut prompt = RecordingPrompt::new(true);
    assert!(
        manager
            .connect(&params(HostKeyPolicy::AcceptNew), &mut prompt)
            .await
    );
    assert_ok!(manager.ensure_store().await);
    manager
}

#[tokio::test]
async fn store_is_fetched_once_per_session() {
    let mut manager = loaded_manager(Some(TWO_RECORDS)).await;

    manager.ensure_store().await.unwrap();
    manager.ensure_store().await.unwrap();

    assert_eq!(manager.gateway().fetch_call_count(), 1);
    assert_eq!(manager.list().unwrap().len(), 2);
}

#[tokio::test]
async fn list_and_lookups_go_through_store() {
    let manager = loaded_manager(Some(TWO_RECORDS)).await;

    assert_eq!(
        manager.list().unwrap(),
        vec![
            Record::new("example.com", "192.168.1.1"),
            Record::new("test.com", "10.0.0.1"),
        ]
    );
    assert_eq!(
        manager.lookup_address("example.com").unwrap().as_deref(),
        Some("192.168.1.1")
    );
    assert_eq!(manager.lookup_domain("10.0.0.1").unwrap().as_deref(), Some("test.com"));
    assert_eq!(manager.lookup_domain("1.1.1.1").unwrap(), None);
}

#[tokio::test]
async fn add_pushes_updated_file() {
    let mut manager = loaded_manager(Some(TWO_RECORDS)).await;

    let mutation = manager.add("new.com", "172.16.0.1").await.unwrap();
    assert_eq!(
        mutation,
        Mutation::Applied {
            record: Record::new("new.com", "172.16.0.1"),
            sync: SyncStatus::Pushed,
        }
    );

    assert_eq!(manager.gateway().push_call_count(), 1);
    let remote = manager.gateway().remote_content().unwrap();
    assert!(remote.contains("{\"domain\": \"new.com\", \"ip\": \"172.16.0.1\"}"));
}

#[tokio::test]
async fn rejected_add_is_not_pushed() {
    let mut manager = loaded_manager(Some(TWO_RECORDS)).await;

    let mutation = manager.add("EXAMPLE.com", "172.16.0.1").await.unwrap();
    assert!(matches!(
        mutation,
        Mutation::Rejected(AddOutcome::DuplicateDomain(_))
    ));

    let mutation = manager.add("unique.com", "10.0.0.1").await.unwrap();
    assert!(matches!(
        mutation,
        Mutation::Rejected(AddOutcome::DuplicateAddress(_))
    ));

    assert_eq!(manager.gateway().push_call_count(), 0);
    assert_eq!(manager.gateway().remote_content().as_deref(), Some(TWO_RECORDS));
}

#[tokio::test]
async fn invalid_address_is_an_error_and_not_pushed() {
    let mut manager = loaded_manager(Some(TWO_RECORDS)).await;

    let result = manager.add("invalid.com", "256.256.256.256").await;
    match result {
        Err(e @ Error::InvalidAddress(_)) => assert!(e.is_recoverable()),
        other => panic!("expected InvalidAddress, got {:?}", other),
    }
    assert_eq!(manager.gateway().push_call_count(), 0);
}

#[tokio::test]
async fn remove_pushes_and_unknown_key_does_not() {
    let mut manager = loaded_manager(Some(TWO_RECORDS)).await;

    let mutation = manager.remove("nonexistent.com").await.unwrap();
    assert_eq!(mutation, Mutation::NotFound);
    assert_eq!(manager.gateway().push_call_count(), 0);

    let mutation = manager.remove("10.0.0.1").await.unwrap();
    assert!(matches!(
        mutation,
        Mutation::Applied {
            sync: SyncStatus::Pushed,
            ..
        }
    ));
    assert_eq!(manager.gateway().push_call_count(), 1);
    assert!(!manager.gateway().remote_content().unwrap().contains("test.com"));
}

#[tokio::test]
async fn failed_push_keeps_local_change() {
    let mut manager = loaded_manager(Some(TWO_RECORDS)).await;
    manager.gateway().set_fail_push(true);

    let mutation = manager.add("new.com", "172.16.0.1").await.unwrap();
    match mutation {
        Mutation::Applied {
            sync: SyncStatus::PushFailed(reason),
            ..
        } => assert!(reason.contains("mock upload failure")),
        other => panic!("expected PushFailed, got {:?}", other),
    }

    // Local copy is ahead of the server
    let local = manager.gateway().local_path().unwrap();
    let local_content = tokio::fs::read_to_string(local).await.unwrap();
    assert!(local_content.contains("new.com"));
    assert_eq!(manager.gateway().remote_content().as_deref(), Some(TWO_RECORDS));
    assert_eq!(
        manager.lookup_address("new.com").unwrap().as_deref(),
        Some("172.16.0.1")
    );
}

#[tokio::test]
async fn operations_require_loaded_store() {
    let mut manager = DomainManager::new(MockGateway::new(Some(TWO_RECORDS)));

    assert!(matches!(manager.list(), Err(Error::NotLoaded)));
    assert!(matches!(manager.lookup_address("a"), Err(Error::NotLoaded)));
    assert!(matches!(
        manager.add("a.com", "1.2.3.4").await,
        Err(Error::NotLoaded)
    ));
    assert!(matches!(
        manager.ensure_store().await,
        Err(Error::NotConnected)
    ));
}

#[tokio::test]
async fn missing_remote_file_is_reported() {
    let mut manager = DomainManager::new(MockGateway::new(None));
    let mut prompt = RecordingPrompt::new(true);
    assert!(
        manager
            .connect(&params(HostKeyPolicy::AcceptNew), &mut prompt)
            .await
    );

    assert!(matches!(
        manager.ensure_store().await,
        Err(Error::NoRecordFile)
    ));
    assert!(!manager.is_loaded());
}

#[tokio::test]
async fn markerless_remote_file_loads_empty() {
    let manager = loaded_manager(Some("{ \"other\": [] }")).await;
    assert!(manager.list().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_remote_file_fails_initialization() {
    let mut manager = DomainManager::new(MockGateway::new(Some(
        r#"{"addresses": [{"domain": "a.com"}]}"#,
    )));
    let mut prompt = RecordingPrompt::new(true);
    manager
        .connect(&params(HostKeyPolicy::AcceptNew), &mut prompt)
        .await;

    let err = manager.ensure_store().await.unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { index: 0, .. }));
    assert!(!err.is_recoverable());
    assert!(!manager.is_loaded());
}

#[tokio::test]
async fn disconnect_drops_store() {
    let mut manager = loaded_manager(Some(TWO_RECORDS)).await;

    manager.disconnect().await;

    assert!(!manager.is_connected());
    assert!(!manager.is_loaded());
    assert_eq!(manager.gateway().disconnect_call_count(), 1);
    assert!(matches!(manager.list(), Err(Error::NotLoaded)));
}

#[tokio::test]
async fn connect_failures_return_false() {
    let mut manager = DomainManager::new(MockGateway::new(Some(TWO_RECORDS)));
    let mut prompt = RecordingPrompt::new(false);

    // Operator refuses the unknown host key
    assert!(!manager.connect(&params(HostKeyPolicy::Ask), &mut prompt).await);
    assert_eq!(prompt.asked, vec!["localhost".to_string()]);

    // Gateway refuses
    manager.gateway().set_refuse_connect(true);
    assert!(
        !manager
            .connect(&params(HostKeyPolicy::AcceptNew), &mut prompt)
            .await
    );

    // Invalid parameters never reach the gateway
    let mut bad = params(HostKeyPolicy::AcceptNew);
    bad.port = 0;
    manager.gateway().set_refuse_connect(false);
    assert!(!manager.connect(&bad, &mut prompt).await);
    assert!(!manager.is_connected());
}
