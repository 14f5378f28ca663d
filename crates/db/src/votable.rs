//! The votable capability shared by questions and answers.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, sea_query::Expr,
};

use crate::entities::{Answer, Question, answer, question, vote::VotableKind};

/// An entity that accumulates votes and caches their sum as `rank`.
///
/// Each implementation locates its own row and writes its own `rank` column;
/// the vote ledger only ever sees the kind discriminator and the id.
#[async_trait]
pub trait Votable: Sized + Send + Sync {
    /// Discriminator stored in `vote.entity_type`.
    const KIND: VotableKind;

    /// Primary key of this entity.
    fn votable_id(&self) -> &str;

    /// Cached vote sum.
    fn rank(&self) -> i32;

    /// Replace the cached vote sum (not persisted until [`Votable::persist`]).
    fn set_rank(&mut self, rank: i32);

    /// Fetch an entity by id, holding a row lock until the enclosing
    /// transaction ends.
    async fn find_for_update<C>(conn: &C, id: &str) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait;

    /// Write the cached rank back. Returns `false` if the row no longer exists.
    async fn persist<C>(&self, conn: &C) -> Result<bool, DbErr>
    where
        C: ConnectionTrait;
}

#[async_trait]
impl Votable for question::Model {
    const KIND: VotableKind = VotableKind::Question;

    fn votable_id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> i32 {
        self.rank
    }

    fn set_rank(&mut self, rank: i32) {
        self.rank = rank;
    }

    async fn find_for_update<C>(conn: &C, id: &str) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        Question::find_by_id(id).lock_exclusive().one(conn).await
    }

    async fn persist<C>(&self, conn: &C) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = Question::update_many()
            .col_expr(question::Column::Rank, Expr::value(self.rank))
            .filter(question::Column::Id.eq(self.id.as_str()))
            .exec(conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl Votable for answer::Model {
    const KIND: VotableKind = VotableKind::Answer;

    fn votable_id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> i32 {
        self.rank
    }

    fn set_rank(&mut self, rank: i32) {
        self.rank = rank;
    }

    async fn find_for_update<C>(conn: &C, id: &str) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        Answer::find_by_id(id).lock_exclusive().one(conn).await
    }

    async fn persist<C>(&self, conn: &C) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = Answer::update_many()
            .col_expr(answer::Column::Rank, Expr::value(self.rank))
            .filter(answer::Column::Id.eq(self.id.as_str()))
            .exec(conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
