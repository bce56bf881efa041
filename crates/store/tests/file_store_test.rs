//! File-backed store tests.
//!
//! Tests verify that:
//! - A missing state file opens as an empty store
//! - Hand-written YAML state loads with partitions and wire field names
//! - Status writes and binding creations are persisted

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use catalog_core::{ApiBinding, ExportReference, PartitionPath, PermissionClaim};
use catalog_store::{BindingStore, FileStore, ResourceStore};

const STATE: &str = r#"
entries:
  - partition: root:catalog
    metadata:
      name: certs
    spec:
      description: Certificate management
      exports:
        - workspace:
            path: root:providers
            exportName: cert-manager
exports:
  - partition: root:providers
    metadata:
      name: cert-manager
    spec:
      latestResourceSchemas:
        - v1.certificates.cert-manager.io
      permissionClaims:
        - resource: secrets
"#;

fn partition(path: &str) -> PartitionPath {
    PartitionPath::new(path).unwrap()
}

#[tokio::test]
async fn missing_file_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("state.yaml")).await.unwrap();

    let entries = store.list_entries(&partition("root:catalog")).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn loads_hand_written_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    std::fs::write(&path, STATE).unwrap();

    let store = FileStore::open(&path).await.unwrap();

    let entry = store.get_entry(&partition("root:catalog"), "certs").await.unwrap();
    assert_eq!(
        entry.spec.exports,
        vec![ExportReference::new("root:providers", "cert-manager")]
    );
    assert!(entry.metadata.resource_version > 0);

    let export = store
        .get_export(&partition("root:providers"), None, "cert-manager")
        .await
        .unwrap();
    assert_eq!(export.spec.permission_claims, vec![PermissionClaim::core("secrets")]);
}

#[tokio::test]
async fn invalid_yaml_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    std::fs::write(&path, "entries: [ {").unwrap();

    let result = FileStore::open(&path).await;
    assert!(matches!(
        result,
        Err(catalog_store::StoreError::Serialization { .. })
    ));
}

#[tokio::test]
async fn status_writes_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    std::fs::write(&path, STATE).unwrap();
    let catalog = partition("root:catalog");

    let store = FileStore::open(&path).await.unwrap();
    let mut entry = store.get_entry(&catalog, "certs").await.unwrap();
    entry
        .status
        .export_permission_claims
        .push(PermissionClaim::core("secrets"));
    store.update_entry_status(&catalog, &entry).await.unwrap();

    let reopened = FileStore::open(&path).await.unwrap();
    let entry = reopened.get_entry(&catalog, "certs").await.unwrap();
    assert_eq!(
        entry.status.export_permission_claims,
        vec![PermissionClaim::core("secrets")]
    );
}

#[tokio::test]
async fn created_bindings_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    let consumer = partition("root:team-a");

    let store = FileStore::open(&path).await.unwrap();
    let created = store
        .create_binding(
            &consumer,
            &ApiBinding::for_reference(ExportReference::new("root:providers", "cert-manager")),
        )
        .await
        .unwrap();

    let reopened = FileStore::open(&path).await.unwrap();
    let binding = reopened
        .get_binding(&consumer, &created.metadata.name)
        .await
        .unwrap();
    assert_eq!(binding.spec.reference.export_name, "cert-manager");
}

#[tokio::test]
async fn failed_status_write_leaves_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");
    std::fs::create_dir(&state_dir).unwrap();
    let path = state_dir.join("state.yaml");
    std::fs::write(&path, STATE).unwrap();
    let catalog = partition("root:catalog");

    let store = FileStore::open(&path).await.unwrap();
    let stored = store.get_entry(&catalog, "certs").await.unwrap();
    let mut candidate = stored.clone();
    candidate
        .status
        .export_permission_claims
        .push(PermissionClaim::core("secrets"));

    std::fs::remove_dir_all(&state_dir).unwrap();
    let err = store.update_entry_status(&catalog, &candidate).await.unwrap_err();
    assert!(matches!(err, catalog_store::StoreError::Io { .. }));

    let after = store.get_entry(&catalog, "certs").await.unwrap();
    assert_eq!(after, stored);
    assert_eq!(store.inner().status_writes(), 0);

    // The same write goes through once the file is writable again.
    std::fs::create_dir(&state_dir).unwrap();
    store.update_entry_status(&catalog, &candidate).await.unwrap();

    let reopened = FileStore::open(&path).await.unwrap();
    let entry = reopened.get_entry(&catalog, "certs").await.unwrap();
    assert_eq!(
        entry.status.export_permission_claims,
        vec![PermissionClaim::core("secrets")]
    );
}

#[tokio::test]
async fn failed_binding_write_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");
    std::fs::create_dir(&state_dir).unwrap();
    let consumer = partition("root:team-a");

    let store = FileStore::open(state_dir.join("state.yaml")).await.unwrap();
    std::fs::remove_dir_all(&state_dir).unwrap();

    let result = store
        .create_binding(
            &consumer,
            &ApiBinding::for_reference(ExportReference::new("root:providers", "cert-manager")),
        )
        .await;

    assert!(result.is_err());
    assert!(store.list_bindings(&consumer).await.unwrap().is_empty());
}
