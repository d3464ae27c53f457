//! Rollback controller tests

use battlelog_common::types::{DeckMaster, MyDeck, NormalizedRecord, RecordKind};
use battlelog_migrate::db::MemoryRecordStore;
use battlelog_migrate::rollback::{rollback, RollbackStatus, RollbackTarget};

fn deck_master(id: &str) -> NormalizedRecord {
    NormalizedRecord::DeckMaster(DeckMaster {
        id: id.to_string(),
        class_name: "Royal".to_string(),
        deck_name: "Midrange Royal".to_string(),
        season: None,
    })
}

fn my_deck(id: &str) -> NormalizedRecord {
    NormalizedRecord::MyDeck(MyDeck {
        id: id.to_string(),
        deck_id: "dm-1".to_string(),
        deck_name: "Loot Royal".to_string(),
        deck_code: None,
        is_archived: false,
        user_id: Some("user-1".to_string()),
    })
}

async fn populated_store() -> MemoryRecordStore {
    MemoryRecordStore::with_records([
        deck_master("dm-1"),
        deck_master("dm-2"),
        my_deck("md-1"),
        my_deck("md-2"),
        my_deck("md-3"),
    ])
    .await
}

#[tokio::test]
async fn test_rollback_all_reports_counts() {
    let store = populated_store().await;

    let result = rollback(&store, RollbackTarget::All).await;

    assert!(result.success);
    assert_eq!(result.status, RollbackStatus::Completed);
    assert_eq!(result.deleted_deck_masters, 2);
    assert_eq!(result.deleted_my_decks, 3);
    assert_eq!(result.deleted_battle_logs, 0);
    assert_eq!(result.error, None);
    assert_eq!(store.delete_calls(), 3);
}

#[tokio::test]
async fn test_second_rollback_of_same_table_is_empty_success() {
    let store = populated_store().await;
    let target = RollbackTarget::Tables(vec![RecordKind::BattleLog]);

    rollback(&store, target.clone()).await;
    let second = rollback(&store, target).await;

    assert!(second.success);
    assert_eq!(second.deleted_battle_logs, 0);
    assert_eq!(store.count(RecordKind::MyDeck).await, 3);
}

#[tokio::test]
async fn test_failure_stops_and_reports_partial_status() {
    let store = populated_store().await;
    store.fail_deletes_of(RecordKind::DeckMaster).await;

    let result = rollback(&store, RollbackTarget::All).await;

    assert!(!result.success);
    assert_eq!(result.status, RollbackStatus::PartiallyCompleted);
    assert_eq!(result.deleted_my_decks, 3);
    assert_eq!(result.deleted_deck_masters, 0);
    assert!(result.error.as_deref().unwrap().contains("deck_masters"));
    // Tables cleared before the failure stay cleared.
    assert_eq!(store.count(RecordKind::MyDeck).await, 0);
    assert_eq!(store.count(RecordKind::DeckMaster).await, 2);
}

#[tokio::test]
async fn test_failure_on_first_table_is_failed_status() {
    let store = populated_store().await;
    store.fail_deletes_of(RecordKind::MyDeck).await;

    let result = rollback(
        &store,
        RollbackTarget::Tables(vec![RecordKind::DeckMaster, RecordKind::MyDeck]),
    )
    .await;

    assert_eq!(result.status, RollbackStatus::Failed);
    assert_eq!(store.delete_calls(), 1);
    assert_eq!(store.count(RecordKind::DeckMaster).await, 2);
}

#[tokio::test]
async fn test_result_serializes_camel_case() {
    let store = populated_store().await;
    let result = rollback(&store, RollbackTarget::Tables(vec![RecordKind::MyDeck])).await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["deletedMyDecks"], 3);
    assert_eq!(json["status"], "completed");
    assert!(json.get("error").is_none());
    assert!(json["completedAt"].is_string());
}
