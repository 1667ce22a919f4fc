use tinylink_storage::InMemoryStore;

async fn fixture() -> ((), InMemoryStore) {
    ((), InMemoryStore::new())
}

tinylink_test_infra::link_store_conformance!(fixture);
