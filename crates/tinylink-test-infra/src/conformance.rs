//! Behaviour shared by every link store backend.
//!
//! Each function exercises one part of the [`LinkStore`] contract against a
//! fresh, empty store and panics on a violation. Use
//! [`link_store_conformance!`](crate::link_store_conformance) to run all of
//! them against a backend.

use jiff::Timestamp;
use std::collections::BTreeSet;
use std::sync::Arc;
use tinylink_core::{Link, LinkStore, ShortCode, StorageError};

const CREATED_AT: i64 = 1_700_000_000;

pub fn code(value: &str) -> ShortCode {
    ShortCode::new(value).expect("conformance codes are valid")
}

pub fn link(value: &str, url: &str) -> Link {
    Link::new(code(value), url, at(CREATED_AT))
}

pub fn at(second: i64) -> Timestamp {
    Timestamp::from_second(second).expect("valid test timestamp")
}

pub async fn create_then_get<S: LinkStore>(store: &S) {
    let created = link("abc123", "https://example.com/path?q=1");
    store.create(created.clone()).await.unwrap();

    let got = store.get(&code("abc123")).await.unwrap();
    assert_eq!(got, Some(created));
}

pub async fn get_missing_returns_none<S: LinkStore>(store: &S) {
    assert_eq!(store.get(&code("missing")).await.unwrap(), None);
}

pub async fn duplicate_create_conflicts<S: LinkStore>(store: &S) {
    store.create(link("mycode", "https://a.com")).await.unwrap();

    let err = store
        .create(link("mycode", "https://b.com"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, StorageError::Conflict(ref c) if c == "mycode"),
        "expected conflict, got {err:?}"
    );
    let kept = store.get(&code("mycode")).await.unwrap().unwrap();
    assert_eq!(kept.long_url, "https://a.com");
}

pub async fn codes_are_case_sensitive<S: LinkStore>(store: &S) {
    store
        .create(link("casecode", "https://lower.example"))
        .await
        .unwrap();
    store
        .create(link("CaseCode", "https://mixed.example"))
        .await
        .unwrap();

    let lower = store.get(&code("casecode")).await.unwrap().unwrap();
    let mixed = store.get(&code("CaseCode")).await.unwrap().unwrap();
    assert_eq!(lower.long_url, "https://lower.example");
    assert_eq!(mixed.long_url, "https://mixed.example");
}

pub async fn concurrent_creates_have_one_winner<S: LinkStore>(store: Arc<S>) {
    const CONTENDERS: usize = 16;

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .create(link("contested", &format!("https://example{i}.com")))
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(StorageError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

pub async fn increment_hit_updates_counter<S: LinkStore>(store: &S) {
    store
        .create(link("hitme", "https://example.com"))
        .await
        .unwrap();

    let first = store
        .increment_hit(&code("hitme"), at(CREATED_AT + 10))
        .await
        .unwrap();
    let second = store
        .increment_hit(&code("hitme"), at(CREATED_AT + 20))
        .await
        .unwrap();

    assert_eq!(first.hit_count, 1);
    assert_eq!(second.hit_count, 2);
    assert_eq!(second.last_access_at, Some(at(CREATED_AT + 20)));
    assert_eq!(second.updated_at, at(CREATED_AT + 20));
    assert_eq!(second.created_at, at(CREATED_AT));
    assert_eq!(second.long_url, "https://example.com");
    assert_eq!(store.get(&code("hitme")).await.unwrap(), Some(second));
}

pub async fn increment_hit_missing_is_not_found<S: LinkStore>(store: &S) {
    let err = store
        .increment_hit(&code("missing"), at(CREATED_AT))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");
    assert_eq!(store.get(&code("missing")).await.unwrap(), None);
}

pub async fn concurrent_hits_are_not_lost<S: LinkStore>(store: Arc<S>) {
    const HITS: i64 = 64;
    store
        .create(link("popular", "https://example.com"))
        .await
        .unwrap();

    let handles: Vec<_> = (1..=HITS)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .increment_hit(&code("popular"), at(CREATED_AT + i))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut observed = BTreeSet::new();
    let mut stamps = BTreeSet::new();
    for handle in handles {
        let updated = handle.await.unwrap();
        observed.insert(updated.hit_count);
        stamps.insert(updated.last_access_at.unwrap());
    }

    // every increment saw a distinct counter value: none were lost or merged
    assert_eq!(observed, (1..=HITS as u64).collect::<BTreeSet<_>>());

    let last = store.get(&code("popular")).await.unwrap().unwrap();
    assert_eq!(last.hit_count, HITS as u64);
    assert!(stamps.contains(&last.last_access_at.unwrap()));
}

pub async fn delete_removes_link<S: LinkStore>(store: &S) {
    store
        .create(link("doomed", "https://example.com"))
        .await
        .unwrap();

    store.delete(&code("doomed")).await.unwrap();

    assert_eq!(store.get(&code("doomed")).await.unwrap(), None);
    // the code is free again after a hard delete
    store
        .create(link("doomed", "https://again.example"))
        .await
        .unwrap();
}

pub async fn delete_missing_is_not_found<S: LinkStore>(store: &S) {
    let err = store.delete(&code("missing")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");
}

pub async fn list_returns_every_link<S: LinkStore>(store: &S) {
    assert!(store.list().await.unwrap().is_empty());

    for value in ["first", "second", "third"] {
        store
            .create(link(value, &format!("https://{value}.example")))
            .await
            .unwrap();
    }
    store.delete(&code("second")).await.unwrap();

    let codes: BTreeSet<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.code.to_string())
        .collect();
    assert_eq!(
        codes,
        BTreeSet::from(["first".to_string(), "third".to_string()])
    );
}

/// Generates one test per conformance case for a backend.
///
/// `$fixture` is an async function returning `(guard, store)`; the guard is
/// kept alive for the duration of the test (temp dirs, containers). Attributes
/// given before the fixture, such as `#[ignore]`, are applied to every test.
///
/// ```ignore
/// async fn fixture() -> ((), InMemoryStore) {
///     ((), InMemoryStore::new())
/// }
///
/// tinylink_test_infra::link_store_conformance!(fixture);
/// ```
#[macro_export]
macro_rules! link_store_conformance {
    ($(#[$meta:meta])* $fixture:path) => {
        $(#[$meta])*
        #[tokio::test]
        async fn create_then_get() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::create_then_get(&store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn get_missing_returns_none() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::get_missing_returns_none(&store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn duplicate_create_conflicts() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::duplicate_create_conflicts(&store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn codes_are_case_sensitive() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::codes_are_case_sensitive(&store).await;
        }

        $(#[$meta])*
        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_creates_have_one_winner() {
            let (_guard, store) = $fixture().await;
            let store = ::std::sync::Arc::new(store);
            $crate::conformance::concurrent_creates_have_one_winner(store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn increment_hit_updates_counter() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::increment_hit_updates_counter(&store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn increment_hit_missing_is_not_found() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::increment_hit_missing_is_not_found(&store).await;
        }

        $(#[$meta])*
        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_hits_are_not_lost() {
            let (_guard, store) = $fixture().await;
            let store = ::std::sync::Arc::new(store);
            $crate::conformance::concurrent_hits_are_not_lost(store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn delete_removes_link() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::delete_removes_link(&store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn delete_missing_is_not_found() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::delete_missing_is_not_found(&store).await;
        }

        $(#[$meta])*
        #[tokio::test]
        async fn list_returns_every_link() {
            let (_guard, store) = $fixture().await;
            $crate::conformance::list_returns_every_link(&store).await;
        }
    };
}
