//! Table rollback
//!
//! Deletes every row of the chosen tables, dependents first. Deletes are not
//! wrapped in a transaction: a failure stops the run and leaves tables that
//! were already cleared empty.

use battlelog_common::types::RecordKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::db::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackTarget {
    All,
    Tables(Vec<RecordKind>),
}

impl RollbackTarget {
    /// Distinct kinds in rollback order.
    pub fn kinds(&self) -> Vec<RecordKind> {
        let mut kinds = match self {
            RollbackTarget::All => RecordKind::ROLLBACK_ORDER.to_vec(),
            RollbackTarget::Tables(kinds) => kinds.clone(),
        };
        kinds.sort_by_key(|k| k.rollback_rank());
        kinds.dedup();
        kinds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    Completed,
    /// At least one table was cleared before a later one failed
    PartiallyCompleted,
    /// The first table attempted failed
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResult {
    pub deleted_deck_masters: u64,
    pub deleted_my_decks: u64,
    pub deleted_battle_logs: u64,
    pub success: bool,
    pub status: RollbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl RollbackResult {
    pub fn deleted(&self, kind: RecordKind) -> u64 {
        match kind {
            RecordKind::DeckMaster => self.deleted_deck_masters,
            RecordKind::MyDeck => self.deleted_my_decks,
            RecordKind::BattleLog => self.deleted_battle_logs,
        }
    }
}

#[instrument(skip(store))]
pub async fn rollback(store: &dyn RecordStore, target: RollbackTarget) -> RollbackResult {
    let mut deleted = [0u64; 3];
    let mut cleared = 0usize;
    let mut failure = None;

    for kind in target.kinds() {
        match store.delete_all(kind).await {
            Ok(count) => {
                info!(table = kind.table_name(), deleted = count, "Table rolled back");
                deleted[kind.rollback_rank()] = count;
                cleared += 1;
            },
            Err(e) => {
                error!(table = kind.table_name(), error = %e, "Rollback stopped");
                failure = Some(format!("Failed to delete from {}: {}", kind.table_name(), e));
                break;
            },
        }
    }

    let status = match (&failure, cleared) {
        (None, _) => RollbackStatus::Completed,
        (Some(_), 0) => RollbackStatus::Failed,
        (Some(_), _) => RollbackStatus::PartiallyCompleted,
    };

    RollbackResult {
        deleted_battle_logs: deleted[RecordKind::BattleLog.rollback_rank()],
        deleted_my_decks: deleted[RecordKind::MyDeck.rollback_rank()],
        deleted_deck_masters: deleted[RecordKind::DeckMaster.rollback_rank()],
        success: failure.is_none(),
        status,
        error: failure,
        completed_at: Utc::now(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_target_kinds_are_sorted_and_distinct() {
        let target = RollbackTarget::Tables(vec![
            RecordKind::DeckMaster,
            RecordKind::BattleLog,
            RecordKind::DeckMaster,
        ]);
        assert_eq!(target.kinds(), vec![RecordKind::BattleLog, RecordKind::DeckMaster]);
        assert_eq!(RollbackTarget::All.kinds(), RecordKind::ROLLBACK_ORDER.to_vec());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(RollbackStatus::PartiallyCompleted).unwrap(),
            "partially_completed"
        );
    }
}
