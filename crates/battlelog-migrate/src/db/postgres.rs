// Postgres-backed record store
//
// Existence lookups use one `IN (...)` list per call; the caller bounds the
// list length so the statement stays under the bind-parameter limit.

use async_trait::async_trait;
use battlelog_common::types::{NormalizedRecord, RecordKind};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashSet;
use tracing::{debug, instrument};

use super::{DbError, DbResult, RecordStore};

/// Postgres `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify_insert_error(kind: RecordKind, id: &str, err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            DbError::duplicate(kind, id)
        },
        _ => DbError::Sqlx(err),
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self, ids), fields(table = kind.table_name(), ids = ids.len()))]
    async fn existing_ids(&self, kind: RecordKind, ids: &[String]) -> DbResult<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT id FROM {} WHERE id IN (", kind.table_name()));

        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = query_builder.build().fetch_all(&self.pool).await?;

        let mut existing = HashSet::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            existing.insert(id);
        }

        debug!(found = existing.len(), "Existing ids looked up");
        Ok(existing)
    }

    async fn insert(&self, record: &NormalizedRecord) -> DbResult<()> {
        let result = match record {
            NormalizedRecord::DeckMaster(deck) => {
                sqlx::query(
                    r#"
                    INSERT INTO deck_masters (id, class_name, deck_name, season)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(&deck.id)
                .bind(&deck.class_name)
                .bind(&deck.deck_name)
                .bind(deck.season)
                .execute(&self.pool)
                .await
            },
            NormalizedRecord::MyDeck(deck) => {
                sqlx::query(
                    r#"
                    INSERT INTO my_decks (id, deck_id, deck_name, deck_code, is_archived, user_id)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(&deck.id)
                .bind(&deck.deck_id)
                .bind(&deck.deck_name)
                .bind(&deck.deck_code)
                .bind(deck.is_archived)
                .bind(&deck.user_id)
                .execute(&self.pool)
                .await
            },
            NormalizedRecord::BattleLog(log) => {
                sqlx::query(
                    r#"
                    INSERT INTO battle_logs (
                        id, date, battle_type, rank, group_name,
                        my_deck_id, turn, result, opponent_deck_id, user_id
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    "#,
                )
                .bind(&log.id)
                .bind(log.date)
                .bind(log.battle_type.as_str())
                .bind(log.rank.as_str())
                .bind(&log.group_name)
                .bind(&log.my_deck_id)
                .bind(log.turn.as_str())
                .bind(log.result.as_str())
                .bind(&log.opponent_deck_id)
                .bind(&log.user_id)
                .execute(&self.pool)
                .await
            },
        };

        result
            .map(|_| ())
            .map_err(|e| classify_insert_error(record.kind(), record.id(), e))
    }

    #[instrument(skip(self), fields(table = kind.table_name()))]
    async fn delete_all(&self, kind: RecordKind) -> DbResult<u64> {
        let result = sqlx::query(&format!("DELETE FROM {}", kind.table_name()))
            .execute(&self.pool)
            .await?;

        debug!(deleted = result.rows_affected(), "Table cleared");
        Ok(result.rows_affected())
    }
}
