use std::sync::Arc;

use artifact_vault::crypto::Key;
use artifact_vault::hierarchy::{self, HierarchyNode};
use artifact_vault::store::{Classification, Record, RecordHeader, RecordMeta, RecordStore};
use artifact_vault::views::{filtered_sorted, RecordFilter};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use crate::integration::support::{header, three_record_transport, vault_for, FakeTransport};

#[tokio::test]
async fn search_and_filter_through_the_vault() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let vault = vault_for(&transport, Some(key));
    vault.fetch_records("s1").await.unwrap();

    let ids: Vec<String> = vault.records().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["2", "3", "1"]);

    vault.set_search_query("report");
    let hits = vault.records();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path.as_deref(), Some("docs/Report.PDF"));

    vault.set_search_query("");
    vault.set_classification_filter(Some(Classification::Code));
    let hits = vault.records();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "1");
    assert_eq!(vault.selection().classification_filter, Some(Classification::Code));
}

#[tokio::test]
async fn grouped_and_session_views() {
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    transport.add("4", header("Later", Some("later.json"), &["s2"]), None, 0, 5);
    let vault = vault_for(&transport, Some(key));
    vault.fetch_records("s1").await.unwrap();

    let groups = vault.grouped_records();
    assert_eq!(groups.len(), 5);
    assert_eq!(groups[&Classification::Code].len(), 1);
    assert_eq!(groups[&Classification::Document].len(), 1);
    assert_eq!(groups[&Classification::Data].len(), 1);
    assert_eq!(groups[&Classification::Other].len(), 1);
    assert!(groups[&Classification::Image].is_empty());

    let s2: Vec<String> = vault
        .records_for_session("s2")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(s2, vec!["4", "3"]);
    assert!(vault.records_for_session("nobody").is_empty());
}

#[tokio::test]
async fn hierarchy_follows_the_active_filter() {
    let key = Key::generate();
    let transport = Arc::new(FakeTransport::new(&key));
    transport.add("a", header("a", Some("src/app/main.rs"), &[]), None, 1, 0);
    transport.add("b", header("b", Some("src\\app\\lib.rs"), &[]), None, 2, 0);
    transport.add("c", header("Readme", Some("//"), &[]), None, 3, 0);
    transport.add("d", header("doc", Some("docs/guide.md"), &[]), None, 4, 0);
    let vault = vault_for(&transport, Some(key));
    vault.fetch_records("s1").await.unwrap();

    let tree = vault.hierarchy();
    let names: Vec<&str> = tree.iter().map(HierarchyNode::name).collect();
    assert_eq!(names, vec!["docs", "src", "Readme"]);
    let HierarchyNode::Directory(src) = &tree[1] else {
        panic!("src should be a directory");
    };
    assert_eq!(src.children.len(), 1);
    assert_eq!(src.children[0].leaf_count(), 2);

    vault.set_search_query("guide");
    let tree = vault.hierarchy();
    assert_eq!(tree.len(), 1);
    assert!(tree[0].find_leaf("d").is_some());
}

fn arbitrary_record() -> impl Strategy<Value = Record> {
    (
        "[a-z0-9]{1,8}",
        "[A-Za-z ]{1,12}",
        proptest::option::of("[a-z]{1,4}(/[a-z]{1,4}){0,3}\\.(rs|md|png|json)"),
        0i64..10_000,
        0u64..100,
    )
        .prop_map(|(id, title, path, updated, seq)| {
            let header = RecordHeader {
                title,
                path,
                mime_type: None,
                language: None,
                session_ids: vec!["s".to_string()],
            };
            let meta = RecordMeta {
                header_version: 1,
                body_version: 1,
                seq,
                created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                updated_at: Utc.timestamp_opt(1_700_000_000 + updated, 0).unwrap(),
            };
            Record::new(id, header, meta)
        })
}

proptest! {
    #[test]
    fn every_record_appears_once_in_the_hierarchy(records in proptest::collection::vec(arbitrary_record(), 0..40)) {
        let mut store = RecordStore::new();
        for record in records {
            store.upsert(record);
        }
        let tree = hierarchy::build(store.all());
        let leaves: usize = tree.iter().map(HierarchyNode::leaf_count).sum();
        prop_assert_eq!(leaves, store.len());
        for record in store.all() {
            prop_assert!(tree.iter().any(|n| n.find_leaf(&record.id).is_some()));
        }
    }

    #[test]
    fn filtered_list_never_increases(records in proptest::collection::vec(arbitrary_record(), 0..40), query in "[a-z]{0,2}") {
        let mut store = RecordStore::new();
        for record in records {
            store.upsert(record);
        }
        let list = filtered_sorted(&store, &RecordFilter::new(query, None));
        for pair in list.windows(2) {
            prop_assert!(pair[0].updated_at >= pair[1].updated_at);
        }
    }
}
