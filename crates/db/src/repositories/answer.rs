//! Answer repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Answer, answer};
use crate::pagination::{Page, fetch_page};
use qanda_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

fn by_rank(select: Select<Answer>) -> Select<Answer> {
    select
        .order_by_desc(answer::Column::Rank)
        .order_by_desc(answer::Column::CreatedAt)
        .order_by_desc(answer::Column::Id)
}

/// Answer repository for database operations.
#[derive(Clone)]
pub struct AnswerRepository {
    db: Arc<DatabaseConnection>,
}

impl AnswerRepository {
    /// Create a new answer repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an answer by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<answer::Model>> {
        Answer::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an answer by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<answer::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AnswerNotFound(id.to_string()))
    }

    /// Create a new answer.
    pub async fn create(&self, model: answer::ActiveModel) -> AppResult<answer::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an answer.
    pub async fn update(&self, model: answer::ActiveModel) -> AppResult<answer::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of a question's answers, best first.
    pub async fn find_page_by_question(
        &self,
        question_id: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<Page<answer::Model>> {
        let select = Answer::find().filter(answer::Column::QuestionId.eq(question_id));
        fetch_page(self.db.as_ref(), by_rank(select), page, per_page).await
    }

    /// Count answers per question. Questions without answers are absent.
    pub async fn count_by_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        #[derive(FromQueryResult)]
        struct AnswerCount {
            question_id: String,
            num_answers: i64,
        }

        let rows = Answer::find()
            .select_only()
            .column(answer::Column::QuestionId)
            .column_as(answer::Column::Id.count(), "num_answers")
            .filter(answer::Column::QuestionId.is_in(question_ids.to_vec()))
            .group_by(answer::Column::QuestionId)
            .into_model::<AnswerCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.question_id, row.num_answers.max(0) as u64))
            .collect())
    }

    /// Answers with a positive rank, best first.
    pub async fn find_trending(&self, limit: u64) -> AppResult<Vec<answer::Model>> {
        by_rank(Answer::find().filter(answer::Column::Rank.gt(0)))
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
