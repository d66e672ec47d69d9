//! Local filesystem backend behavior.

use pretty_assertions::assert_eq;
use quarry_config::{StoreBackend, StoreConfig};
use quarry_store::{DurableStore, StoreError};

fn local_config(root: &std::path::Path) -> StoreConfig {
    StoreConfig {
        backend: StoreBackend::Local,
        root: root.join("store").display().to_string(),
        ..StoreConfig::default()
    }
}

#[tokio::test]
async fn local_store_persists_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path());

    let first = DurableStore::from_config(&config).unwrap();
    first
        .write("bls-data/pr.data.0.Current", b"series_id\tyear\n".to_vec())
        .await
        .unwrap();

    let second = DurableStore::from_config(&config).unwrap();
    let object = second.read("bls-data/pr.data.0.Current").await.unwrap();
    assert_eq!(object.bytes, b"series_id\tyear\n");
    assert!(dir.path().join("store/bls-data/pr.data.0.Current").exists());
}

#[tokio::test]
async fn local_store_rejects_duplicate_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = DurableStore::local(&dir.path().join("store")).unwrap();
    let key = "api-data/2024-05-01T02:00:00Z.json";

    store.write_new(key, b"{\"a\":1}".to_vec()).await.unwrap();
    let err = store.write_new(key, b"{\"a\":2}".to_vec()).await.unwrap_err();

    assert!(matches!(err, StoreError::AlreadyExists { .. }));
    assert_eq!(store.read(key).await.unwrap().bytes, b"{\"a\":1}");
}

#[tokio::test]
async fn local_list_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = DurableStore::local(&dir.path().join("store")).unwrap();
    store.write("bls-data/pr.series", b"s".to_vec()).await.unwrap();
    store.write("bls-data/pr.period", b"p".to_vec()).await.unwrap();
    store.write("api-data/latest.json", b"{}".to_vec()).await.unwrap();

    store.delete("bls-data/pr.series").await.unwrap();

    let listed: Vec<(String, u64)> = store
        .list("bls-data")
        .await
        .unwrap()
        .into_iter()
        .map(|info| (info.key, info.size))
        .collect();
    assert_eq!(listed, vec![("bls-data/pr.period".to_string(), 1)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overwrites_never_expose_partial_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let store = DurableStore::local(&dir.path().join("store")).unwrap();
    let key = "api-data/latest.json";

    let payloads: Vec<Vec<u8>> = (0..8u8).map(|n| vec![b'a' + n; 64 * 1024]).collect();
    store.write(key, payloads[0].clone()).await.unwrap();

    let mut writers = Vec::new();
    for payload in payloads.clone() {
        let store = store.clone();
        writers.push(tokio::spawn(async move {
            store.write(key, payload).await.unwrap();
        }));
    }
    let reader = {
        let store = store.clone();
        let payloads = payloads.clone();
        tokio::spawn(async move {
            for _ in 0..32 {
                let bytes = store.read(key).await.unwrap().bytes;
                assert!(payloads.contains(&bytes), "read a torn object");
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();

    let last = store.read(key).await.unwrap().bytes;
    assert!(payloads.contains(&last));
}
