use std::sync::Arc;

use artifact_vault::crypto::Key;
use artifact_vault::hierarchy::HierarchyNode;
use artifact_vault::store::{BodyEncoding, LoadStatus};

use crate::integration::support::{header, three_record_transport, vault_for, FakeTransport};

#[tokio::test]
async fn concurrent_selects_fetch_body_once() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let gate = transport.gate_bodies();
    let vault = vault_for(&transport, Some(key));
    assert_eq!(vault.fetch_records("s1").await.unwrap(), 3);
    for id in ["1", "2", "3"] {
        let record = vault.record(id).unwrap();
        assert!(record.is_decrypted);
        assert!(!record.is_body_loaded());
    }

    let (first, second) = tokio::join!(vault.select(Some("2")), async {
        // The first select is parked on the gate with the id marked in flight.
        assert!(vault.is_loading("2"));
        let loaded = vault.select(Some("2")).await;
        gate.add_permits(1);
        loaded
    });

    assert!(first);
    assert!(!second);
    assert_eq!(transport.body_calls(), 1);
    assert!(!vault.is_loading("2"));
    assert_eq!(vault.load_status("2"), LoadStatus::BodyLoaded);
    assert_eq!(vault.record("2").unwrap().body(), Some("%PDF-1.7"));
    assert_eq!(vault.load_status("1"), LoadStatus::HeaderDecrypted);
    assert_eq!(vault.load_status("3"), LoadStatus::HeaderDecrypted);

    // Already loaded: selecting again never re-fetches
    assert!(!vault.select(Some("2")).await);
    assert_eq!(transport.body_calls(), 1);
}

#[tokio::test]
async fn select_none_and_directories_dispatch_nothing() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let vault = vault_for(&transport, Some(key));
    vault.fetch_records("s1").await.unwrap();

    assert!(!vault.select(None).await);
    let tree = vault.hierarchy();
    let directory = tree.iter().find(|n| n.is_directory()).unwrap();
    assert!(!vault.select_node(directory).await);
    assert_eq!(vault.selection().selected_id, None);
    assert_eq!(transport.body_calls(), 0);

    let HierarchyNode::Directory(src) = tree.iter().find(|n| n.name() == "src").unwrap() else {
        panic!("src should be a directory");
    };
    assert!(vault.select_node(&src.children[0]).await);
    assert_eq!(vault.selection().selected_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn failed_body_load_can_be_retried() {
    let key = Key::generate();
    let transport = Arc::new(FakeTransport::new(&key));
    transport.add("a", header("A", Some("a.txt"), &[]), None, 1, 0);
    let vault = vault_for(&transport, Some(key));
    vault.fetch_records("s1").await.unwrap();

    assert!(!vault.select(Some("a")).await);
    assert_eq!(vault.error_message(), None);
    assert_eq!(vault.load_status("a"), LoadStatus::HeaderDecrypted);
    assert!(!vault.is_loading("a"));

    assert!(!vault.select(Some("a")).await);
    assert_eq!(transport.body_calls(), 2);
}

#[tokio::test]
async fn clear_during_body_load_discards_result() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let gate = transport.gate_bodies();
    let vault = vault_for(&transport, Some(key));
    vault.fetch_records("s1").await.unwrap();

    let (loaded, _) = tokio::join!(vault.load_body("3"), async {
        vault.clear();
        gate.add_permits(1);
    });

    assert!(!loaded.unwrap());
    assert_eq!(vault.record_count(), 0);
    assert_eq!(vault.load_status("3"), LoadStatus::Unfetched);
    assert!(!vault.is_loading("3"));
}

#[tokio::test]
async fn binary_bodies_are_kept_as_base64() {
    let key = Key::generate();
    let transport = Arc::new(FakeTransport::new(&key));
    transport.add(
        "img",
        serde_json::json!({"title": "Logo", "path": "assets/logo.png", "mime_type": "image/png"}),
        Some(&[0x89, b'P', b'N', b'G', 0xff, 0x00]),
        1,
        0,
    );
    let vault = vault_for(&transport, Some(key));
    vault.fetch_records("s1").await.unwrap();

    assert!(vault.load_body("img").await.unwrap());
    let record = vault.record("img").unwrap();
    assert_eq!(record.body_encoding, BodyEncoding::Base64);
    assert!(record.is_body_loaded());
}

#[tokio::test]
async fn prefetch_loads_each_body_once() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let vault = vault_for(&transport, Some(key)).with_max_concurrent_body_loads(2);
    vault.fetch_records("s1").await.unwrap();

    let loaded = vault.prefetch_bodies(["1", "2", "3", "2", "missing"]).await;
    assert_eq!(loaded, 3);
    assert_eq!(transport.body_calls(), 3);
    assert!(vault.records().iter().all(|r| r.is_body_loaded()));

    assert_eq!(vault.prefetch_bodies(["1", "2", "3"]).await, 0);
    assert_eq!(transport.body_calls(), 3);
}
