//! PostgreSQL record store tests
//!
//! Require Docker. Run with `cargo test -p battlelog-migrate --test pg_store_tests -- --ignored`.

use battlelog_common::types::RecordKind;
use battlelog_migrate::db::{health_check, DbError, PgRecordStore, RecordStore};
use battlelog_migrate::import::{BatchImporter, ImportOptions, RecordOrigin, SequentialIdGenerator};
use battlelog_migrate::rollback::{rollback, RollbackTarget};
use serial_test::serial;
use std::sync::Arc;

mod common;
use common::{battle_log_with_id, deck_master, legacy_battle_log, my_deck, today, TestPostgres};

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_import_dedup_and_rollback_round_trip() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = Arc::new(PgRecordStore::new(pg.pool()));
    let importer = BatchImporter::new(store.clone(), Arc::new(SequentialIdGenerator::new()))
        .with_lookup_chunk_size(2)
        .with_today(today());

    let first = importer
        .import(
            RecordKind::BattleLog,
            vec![
                battle_log_with_id("bl-1"),
                battle_log_with_id("bl-2"),
                battle_log_with_id("bl-3"),
                legacy_battle_log("2025/08/09"),
            ],
            RecordOrigin::Structured,
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(first.imported, 4);

    let second = importer
        .import(
            RecordKind::BattleLog,
            vec![battle_log_with_id("bl-1"), battle_log_with_id("bl-3"), battle_log_with_id("bl-4")],
            RecordOrigin::Structured,
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!((second.imported, second.skipped), (1, 2));

    let result = rollback(store.as_ref(), RollbackTarget::Tables(vec![RecordKind::BattleLog])).await;
    assert!(result.success);
    assert_eq!(result.deleted_battle_logs, 5);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_duplicate_insert_maps_to_duplicate_error() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgRecordStore::new(pg.pool());
    let importer = BatchImporter::new(
        Arc::new(store.clone()),
        Arc::new(SequentialIdGenerator::new()),
    )
    .with_today(today());

    importer
        .import(
            RecordKind::DeckMaster,
            vec![deck_master("dm-1")],
            RecordOrigin::Structured,
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    importer
        .import(
            RecordKind::MyDeck,
            vec![my_deck("md-1")],
            RecordOrigin::Structured,
            &ImportOptions {
                dry_run: false,
                user_id: Some("user-1".to_string()),
            },
        )
        .await
        .unwrap();

    let existing = store
        .existing_ids(RecordKind::DeckMaster, &["dm-1".to_string(), "dm-9".to_string()])
        .await
        .unwrap();
    assert!(existing.contains("dm-1") && existing.len() == 1);

    let row = battlelog_common::types::NormalizedRecord::from_value(
        RecordKind::DeckMaster,
        serde_json::json!({ "id": "dm-1", "className": "Elf", "deckName": "Fairy Elf" }),
    )
    .unwrap();
    let err = store.insert(&row).await.unwrap_err();
    assert!(matches!(err, DbError::Duplicate(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_health_check_succeeds_and_fails_after_close() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let pool = pg.pool();

    health_check(&pool).await.unwrap();

    pool.close().await;
    assert!(health_check(&pool).await.is_err());
}
