use async_trait::async_trait;
use docwatch_core::{
    normalize, CanonicalText, ChangeDetector, ContentExtractor, Fingerprint, FingerprintStore,
    MemoryFingerprintStore, StoreError,
};
use pretty_assertions::assert_eq;

const URL: &str = "https://docs.example.com/docs/ledgers";
const PAGE: &str =
    r#"<div class="basis-full"><section><h1>Title</h1><p>Hello</p></section></div>"#;

fn canonical(html: &str) -> CanonicalText {
    let region = ContentExtractor::default().extract(html).unwrap();
    normalize(&region).unwrap()
}

struct BrokenStore;

#[async_trait]
impl FingerprintStore for BrokenStore {
    async fn get(&self, _url: &str) -> Result<Option<Fingerprint>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn put(&self, _url: &str, _fingerprint: &Fingerprint) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn first_seen_page_counts_as_changed() {
    let text = canonical(PAGE);
    assert!(text.as_str().contains("# Title"));
    assert_eq!(text.as_str(), "# Title\n\nHello");

    let store = MemoryFingerprintStore::new();
    assert!(ChangeDetector.has_changed(URL, &text, &store).await.unwrap());
}

#[tokio::test]
async fn second_run_after_write_back_is_unchanged() {
    let store = MemoryFingerprintStore::new();
    let detector = ChangeDetector;

    let first = detector.assess(URL, &canonical(PAGE), &store).await.unwrap();
    assert!(first.changed);
    assert_eq!(first.previous, None);
    store.put(URL, &first.fingerprint).await.unwrap();

    let second = detector.assess(URL, &canonical(PAGE), &store).await.unwrap();
    assert!(!second.changed);
    assert_eq!(second.previous, Some(first.fingerprint));
}

#[tokio::test]
async fn different_content_is_changed() {
    let store = MemoryFingerprintStore::new();
    let old = canonical(PAGE);
    store.put(URL, &Fingerprint::of(&old)).await.unwrap();

    let edited =
        canonical(r#"<div class="basis-full"><section><h1>Title</h1><p>Hello!</p></section></div>"#);
    assert!(ChangeDetector.has_changed(URL, &edited, &store).await.unwrap());
}

#[tokio::test]
async fn markup_churn_keeps_fingerprint_stable() {
    let store = MemoryFingerprintStore::new();
    let before = canonical(
        r#"<div class="basis-full"><section><h1 class="a" id="t">Title</h1><p>Hello</p><img src="https://x/y.png" class="w-10 h-10"></section></div>"#,
    );
    store.put(URL, &Fingerprint::of(&before)).await.unwrap();

    let after = canonical(
        r#"<div class="basis-full mx-auto"><section data-build="99">
             <h1 id="t" class="a">Title</h1>
             <p>  Hello </p>
             <img class="h-10 w-10" src="https://x/y.png" alt="new alt">
           </section></div>"#,
    );
    assert_eq!(before, after);
    assert!(!ChangeDetector.has_changed(URL, &after, &store).await.unwrap());
}

#[tokio::test]
async fn fingerprints_are_keyed_by_url() {
    let store = MemoryFingerprintStore::new();
    let text = canonical(PAGE);
    store.put(URL, &Fingerprint::of(&text)).await.unwrap();

    let other = "https://docs.example.com/docs/other";
    assert!(ChangeDetector.has_changed(other, &text, &store).await.unwrap());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn lookup_failure_is_a_distinct_error() {
    let err = ChangeDetector
        .has_changed(URL, &canonical(PAGE), &BrokenStore)
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Unavailable("connection refused".into()));
}

#[test]
fn fingerprint_is_sha256_of_canonical_bytes() {
    let text = canonical(PAGE);
    assert_eq!(Fingerprint::of(&text), Fingerprint::of_bytes(b"# Title\n\nHello"));
    assert_eq!(Fingerprint::of(&text).to_hex().len(), 64);
}
