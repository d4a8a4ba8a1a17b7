use std::fs;
use std::sync::Arc;

use artifact_vault::config::{CacheConfig, VaultConfig};
use artifact_vault::crypto::{decode_envelope, CryptoAdapter, Key};
use artifact_vault::error::VaultError;
use artifact_vault::keys::StaticKeyProvider;
use artifact_vault::tooling::cli::{CacheCommands, CliContext, Commands};
use tempfile::TempDir;

use crate::integration::support::{three_record_transport, FakeTransport};

fn context(dir: &TempDir, transport: Arc<FakeTransport>, key: &Key) -> CliContext {
    let mut config = VaultConfig::default();
    config.cache = CacheConfig {
        path: Some(dir.path().join("cache")),
        ..CacheConfig::default()
    };
    config.transport.default_scope = Some("s1".to_string());
    CliContext::with_parts(
        config,
        transport,
        Arc::new(StaticKeyProvider::new(Some(key.clone()))),
    )
    .unwrap()
}

fn list(format: &str, offline: bool) -> Commands {
    Commands::List {
        scope: None,
        query: None,
        kind: None,
        session: None,
        offline,
        grouped: false,
        format: format.to_string(),
    }
}

#[test]
fn list_json_contract_has_record_fields() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let cli = context(&dir, Arc::new(three_record_transport(&key)), &key);

    let output = cli.execute(&list("json", false)).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 3);
    let first = &records[0];
    assert_eq!(first.get("id").and_then(|v| v.as_str()), Some("2"));
    assert!(first.get("title").and_then(|v| v.as_str()).is_some());
    assert!(first.get("classification").is_some());
    assert!(first.get("updated_at").is_some());
    assert!(first.get("session_ids").and_then(|v| v.as_array()).is_some());
    cli.shutdown();
}

#[test]
fn grouped_list_includes_every_kind() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let cli = context(&dir, Arc::new(three_record_transport(&key)), &key);
    let grouped = |format: &str| Commands::List {
        scope: None,
        query: Some("nothing matches this".to_string()),
        kind: None,
        session: None,
        offline: false,
        grouped: true,
        format: format.to_string(),
    };

    let output = cli.execute(&grouped("json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let groups = parsed.as_object().unwrap();
    assert_eq!(groups.len(), 5);
    assert_eq!(groups["code"].as_array().unwrap().len(), 1);
    assert_eq!(groups["document"].as_array().unwrap().len(), 1);
    assert_eq!(groups["other"].as_array().unwrap().len(), 1);
    assert!(groups["image"].as_array().unwrap().is_empty());

    let text = cli.execute(&grouped("text")).unwrap();
    assert!(text.contains("Kind"));
    assert!(text.contains("document"));
    cli.shutdown();
}

#[test]
fn list_falls_back_to_cache_with_offline_banner() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    {
        let cli = context(&dir, transport.clone(), &key);
        cli.execute(&Commands::Fetch { scope: None }).unwrap();
        cli.shutdown();
    }

    transport.set_fail_records(true);
    let cli = context(&dir, transport, &key);
    let output = cli.execute(&list("text", false)).unwrap();
    assert!(output.contains("Offline"));
    assert!(output.contains("Quarterly Report"));
    assert!(cli.vault().is_offline());
    cli.shutdown();
}

#[test]
fn show_loads_body_and_rejects_unknown_ids() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let transport = Arc::new(three_record_transport(&key));
    let cli = context(&dir, transport.clone(), &key);

    let output = cli
        .execute(&Commands::Show {
            id: "1".to_string(),
            scope: None,
            offline: false,
            format: "text".to_string(),
        })
        .unwrap();
    assert!(output.contains("fn main() {}"));
    assert_eq!(transport.body_calls(), 1);

    let err = cli
        .execute(&Commands::Show {
            id: "ghost".to_string(),
            scope: None,
            offline: false,
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, VaultError::RecordNotFound(id) if id == "ghost"));
    cli.shutdown();
}

#[test]
fn cache_stats_json_after_prefetch() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let cli = context(&dir, Arc::new(three_record_transport(&key)), &key);

    let output = cli.execute(&Commands::Prefetch { scope: None }).unwrap();
    assert_eq!(output, "Prefetched 3 of 3 artifact bodies");

    let output = cli
        .execute(&Commands::Cache {
            command: CacheCommands::Stats {
                format: "json".to_string(),
            },
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("record_count").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(parsed.get("body_count").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(parsed.get("failed_writes").and_then(|v| v.as_u64()), Some(0));

    cli.execute(&Commands::Cache {
        command: CacheCommands::Clear,
    })
    .unwrap();
    let output = cli
        .execute(&Commands::Cache {
            command: CacheCommands::List {
                session: None,
                format: "json".to_string(),
            },
        })
        .unwrap();
    assert_eq!(output.trim(), "[]");
    cli.shutdown();
}

#[test]
fn seal_produces_decryptable_envelope() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let cli = context(&dir, Arc::new(FakeTransport::new(&key)), &key);
    let input = dir.path().join("header.json");
    fs::write(&input, br#"{"title":"Fixture"}"#).unwrap();
    let output = dir.path().join("header.sealed");

    cli.execute(&Commands::Seal {
        file: input,
        output: Some(output.clone()),
    })
    .unwrap();

    let envelope = fs::read_to_string(output).unwrap();
    let sealed = decode_envelope(&envelope).unwrap();
    let plaintext = CryptoAdapter::new().decrypt(&sealed, &key).unwrap();
    assert_eq!(plaintext, br#"{"title":"Fixture"}"#);
    cli.shutdown();
}

#[test]
fn invalid_kind_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let key = Key::generate();
    let cli = context(&dir, Arc::new(three_record_transport(&key)), &key);
    let err = cli
        .execute(&Commands::List {
            scope: None,
            query: None,
            kind: Some("video".to_string()),
            session: None,
            offline: false,
            grouped: false,
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, VaultError::ConfigError(_)));
    cli.shutdown();
}
