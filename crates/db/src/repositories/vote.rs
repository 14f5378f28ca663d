//! Vote repository.
//!
//! Ledger writes take an explicit connection so they can run inside the
//! transaction that also locks and re-ranks the voted entity.

use std::sync::Arc;

use crate::entities::{Vote, vote, vote::VotableKind};
use chrono::Utc;
use qanda_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Start a transaction on the underlying connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the vote a user has cast on an entity.
    pub async fn find_by_user_and_entity<C>(
        &self,
        conn: &C,
        user_id: &str,
        kind: VotableKind,
        entity_id: &str,
    ) -> AppResult<Option<vote::Model>>
    where
        C: ConnectionTrait,
    {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::EntityType.eq(kind))
            .filter(vote::Column::EntityId.eq(entity_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a ledger row.
    pub async fn insert<C>(&self, conn: &C, model: vote::ActiveModel) -> AppResult<vote::Model>
    where
        C: ConnectionTrait,
    {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Change the value of an existing ledger row.
    pub async fn set_value<C>(
        &self,
        conn: &C,
        vote: vote::Model,
        value: i16,
    ) -> AppResult<vote::Model>
    where
        C: ConnectionTrait,
    {
        let mut active: vote::ActiveModel = vote.into();
        active.value = Set(value);
        active.updated_at = Set(Some(Utc::now().into()));
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a ledger row by ID.
    pub async fn delete<C>(&self, conn: &C, id: &str) -> AppResult<()>
    where
        C: ConnectionTrait,
    {
        Vote::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Sum of all vote values on an entity. No votes sum to 0.
    pub async fn sum_for_entity<C>(
        &self,
        conn: &C,
        kind: VotableKind,
        entity_id: &str,
    ) -> AppResult<i64>
    where
        C: ConnectionTrait,
    {
        #[derive(FromQueryResult)]
        struct SumResult {
            total: Option<i64>,
        }

        let result = Vote::find()
            .filter(vote::Column::EntityType.eq(kind))
            .filter(vote::Column::EntityId.eq(entity_id))
            .select_only()
            .column_as(vote::Column::Value.sum(), "total")
            .into_model::<SumResult>()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.and_then(|r| r.total).unwrap_or(0))
    }

    /// All votes cast by a user, oldest first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .order_by_asc(vote::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
