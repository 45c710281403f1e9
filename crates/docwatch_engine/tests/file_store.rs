use std::fs;
use std::sync::Arc;

use docwatch_core::{Fingerprint, FingerprintStore, StoreError};
use docwatch_engine::FileFingerprintStore;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const URL: &str = "https://docs.example.com/docs/ledgers";

fn fixed_clock() -> Arc<dyn Fn() -> String + Send + Sync> {
    Arc::new(|| "2024-01-01T00:00:00+00:00".to_string())
}

#[tokio::test]
async fn missing_file_is_an_empty_store() {
    let temp = TempDir::new().unwrap();
    let store = FileFingerprintStore::new(temp.path().join("hashes.ron"));
    assert_eq!(store.get(URL).await, Ok(None));
    assert!(!store.path().exists());
}

#[tokio::test]
async fn fingerprints_survive_a_reload() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("hashes.ron");
    let fingerprint = Fingerprint::of_bytes(b"# Title\n\nHello");

    let store = FileFingerprintStore::new(&path).with_clock(fixed_clock());
    store.put(URL, &fingerprint).await.unwrap();

    let reopened = FileFingerprintStore::new(&path);
    assert_eq!(reopened.get(URL).await, Ok(Some(fingerprint)));
    assert_eq!(reopened.get("https://docs.example.com/docs/other").await, Ok(None));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains(URL));
    assert!(content.contains(&fingerprint.to_hex()));
    assert!(content.contains("2024-01-01T00:00:00+00:00"));
}

#[tokio::test]
async fn put_overwrites_previous_fingerprint() {
    let temp = TempDir::new().unwrap();
    let store = FileFingerprintStore::new(temp.path().join("hashes.ron"));
    let old = Fingerprint::of_bytes(b"old");
    let new = Fingerprint::of_bytes(b"new");

    store.put(URL, &old).await.unwrap();
    store.put(URL, &new).await.unwrap();
    assert_eq!(store.get(URL).await, Ok(Some(new)));
}

#[tokio::test]
async fn unparseable_file_is_a_store_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hashes.ron");
    fs::write(&path, "this is not ron {").unwrap();

    let store = FileFingerprintStore::new(&path);
    assert!(matches!(store.get(URL).await, Err(StoreError::Malformed(_))));
}

#[tokio::test]
async fn malformed_hash_entry_is_a_store_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hashes.ron");
    fs::write(
        &path,
        format!(r#"{{ "{URL}": (hash: "not-hex", updated_utc: "2024-01-01T00:00:00Z") }}"#),
    )
    .unwrap();

    let store = FileFingerprintStore::new(&path);
    assert!(matches!(store.get(URL).await, Err(StoreError::Malformed(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_puts_all_reach_the_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hashes.ron");
    let store = Arc::new(FileFingerprintStore::new(&path).with_clock(fixed_clock()));

    let urls: Vec<String> = (0..8)
        .map(|n| format!("https://docs.example.com/docs/page-{n}"))
        .collect();
    let writes = urls.iter().map(|url| {
        let store = Arc::clone(&store);
        let url = url.clone();
        tokio::spawn(async move {
            let fingerprint = Fingerprint::of_bytes(url.as_bytes());
            store.put(&url, &fingerprint).await
        })
    });
    for result in futures_util::future::join_all(writes).await {
        result.unwrap().unwrap();
    }

    let reloaded = FileFingerprintStore::new(&path);
    for url in &urls {
        assert_eq!(
            reloaded.get(url).await,
            Ok(Some(Fingerprint::of_bytes(url.as_bytes())))
        );
    }
}
