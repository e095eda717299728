use std::time::Duration;

use detour_core::{NormalizedRule, RuleId};
use detour_storage::{MySqlRuleStore, ReadRuleStore, RuleStore, StorageError};
use detour_test_infra::mysql::{MySqlServer, MysqlConfig};
use sqlx::mysql::MySqlPoolOptions;

struct Fixture {
    _mysql: MySqlServer,
    store: MySqlRuleStore,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let url = mysql.database_url().await.expect("mysql url");
        let pool = connect_with_retry(&url).await;

        let store = MySqlRuleStore::new(pool);
        store.migrate().await.expect("run migrations");

        Self {
            _mysql: mysql,
            store,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::MySqlPool {
    let mut last_error = None;

    for _ in 0..20 {
        match MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
        {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect mysql: {last_error:?}");
}

fn rule(source: &str, destination: &str) -> NormalizedRule {
    NormalizedRule {
        source: source.to_string(),
        destination: destination.to_string(),
        external: false,
        status: 301,
    }
}

#[tokio::test]
async fn insert_and_get_rule() {
    let fixture = Fixture::start().await;

    let mut tx = fixture.store.begin().await.unwrap();
    let saved = tx
        .insert_or_update(None, &rule("old-page", "new-page"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let got = fixture.store.get(saved.id).await.unwrap().unwrap();
    assert_eq!(got, saved);
    assert_eq!(got.revision, 1);
    assert_eq!(got.status, 301);
}

#[tokio::test]
async fn lookups_are_byte_exact() {
    let fixture = Fixture::start().await;

    let mut tx = fixture.store.begin().await.unwrap();
    tx.insert_or_update(None, &rule("About", "team"))
        .await
        .unwrap();
    tx.insert_or_update(None, &rule("about ", "people"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(fixture.store.find_by_source("about").await.unwrap().is_empty());
    let found = fixture.store.find_by_source("About").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].destination, "team");
}

#[tokio::test]
async fn rollback_discards_changes() {
    let fixture = Fixture::start().await;

    let mut tx = fixture.store.begin().await.unwrap();
    let saved = tx
        .insert_or_update(None, &rule("old-page", "new-page"))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(fixture.store.get(saved.id).await.unwrap().is_none());

    // The revision counter is rolled back with the rest of the transaction.
    let mut tx = fixture.store.begin().await.unwrap();
    let saved = tx
        .insert_or_update(None, &rule("old-page", "new-page"))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(saved.revision, 1);
}

#[tokio::test]
async fn revisions_persist_across_transactions() {
    let fixture = Fixture::start().await;

    let mut tx = fixture.store.begin().await.unwrap();
    let first = tx.insert_or_update(None, &rule("a", "b")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = fixture.store.begin().await.unwrap();
    let updated = tx
        .insert_or_update(Some(first.id), &rule("a", "c"))
        .await
        .unwrap();
    assert!(tx.repoint(first.id, "d", false).await.unwrap());
    tx.commit().await.unwrap();

    assert_eq!(updated.revision, 2);
    let got = fixture.store.get(first.id).await.unwrap().unwrap();
    assert_eq!(got.destination, "d");
    assert_eq!(got.revision, 2);
}

#[tokio::test]
async fn find_by_destination_and_delete() {
    let fixture = Fixture::start().await;

    let mut tx = fixture.store.begin().await.unwrap();
    let a = tx.insert_or_update(None, &rule("a", "target")).await.unwrap();
    tx.insert_or_update(None, &rule("b", "target")).await.unwrap();
    tx.insert_or_update(None, &rule("c", "elsewhere"))
        .await
        .unwrap();

    assert_eq!(tx.find_by_destination("target").await.unwrap().len(), 2);
    assert!(tx.delete(a.id).await.unwrap());
    assert!(!tx.delete(a.id).await.unwrap());
    assert_eq!(tx.find_by_destination("target").await.unwrap().len(), 1);
    tx.commit().await.unwrap();

    assert!(fixture.store.get(a.id).await.unwrap().is_none());
}

#[tokio::test]
async fn update_missing_rule_is_invalid_data() {
    let fixture = Fixture::start().await;

    let mut tx = fixture.store.begin().await.unwrap();
    let err = tx
        .insert_or_update(Some(RuleId::new(404)), &rule("a", "b"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::InvalidData(_)));
}
