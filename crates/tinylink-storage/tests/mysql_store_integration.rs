use tinylink_storage::{LinkStore, MySqlStore, ReadLinkStore};
use tinylink_test_infra::mysql::{MySqlFixture, MySqlOptions};

async fn fixture() -> (MySqlFixture, MySqlStore) {
    let mysql = MySqlFixture::start(MySqlOptions::builder().build())
        .await
        .expect("start mysql");

    let store = MySqlStore::new(mysql.pool());
    store.migrate().await.expect("create schema");
    // applying the DDL twice must be harmless
    store.migrate().await.expect("re-run schema");

    (mysql, store)
}

tinylink_test_infra::link_store_conformance!(
    #[ignore = "requires a container runtime"]
    fixture
);

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn connect_by_url_sees_the_same_links() {
    let (mysql, store) = fixture().await;
    store
        .create(tinylink_test_infra::conformance::link("shared", "https://example.com"))
        .await
        .unwrap();

    let other = MySqlStore::connect(mysql.database_url()).await.unwrap();

    let code = tinylink_test_infra::conformance::code("shared");
    let seen = other.get(&code).await.unwrap();
    assert_eq!(seen, store.get(&code).await.unwrap());
}
