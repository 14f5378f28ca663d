//! Tag repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{QuestionTag, Tag, question_tag, tag};
use qanda_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, Order, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
    sea_query::{Alias, Expr, OnConflict},
};
use serde::Serialize;

/// A tag together with the number of questions carrying it.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUsage {
    pub id: String,
    pub name: String,
    pub questions_count: i64,
}

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Find tags by exact (already normalized) names.
    pub async fn find_by_names<C>(&self, conn: &C, names: &[String]) -> AppResult<Vec<tag::Model>>
    where
        C: ConnectionTrait,
    {
        if names.is_empty() {
            return Ok(vec![]);
        }

        Tag::find()
            .filter(tag::Column::Name.is_in(names.to_vec()))
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get or create tags, returned in the order of `names`.
    ///
    /// Names that already exist are left untouched, so concurrent creators of
    /// the same tag both end up with the single stored row.
    pub async fn get_or_create<C>(&self, conn: &C, names: &[String]) -> AppResult<Vec<tag::Model>>
    where
        C: ConnectionTrait,
    {
        if names.is_empty() {
            return Ok(vec![]);
        }

        let models = names.iter().map(|name| tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.clone()),
        });

        Tag::insert_many(models)
            .on_conflict(OnConflict::column(tag::Column::Name).do_nothing().to_owned())
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut tags = self.find_by_names(conn, names).await?;
        tags.sort_by_key(|t| names.iter().position(|n| *n == t.name));
        Ok(tags)
    }

    /// Attach tags to a question.
    pub async fn link<C>(&self, conn: &C, question_id: &str, tag_ids: &[String]) -> AppResult<()>
    where
        C: ConnectionTrait,
    {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let links = tag_ids.iter().map(|tag_id| question_tag::ActiveModel {
            question_id: Set(question_id.to_string()),
            tag_id: Set(tag_id.clone()),
        });

        QuestionTag::insert_many(links)
            .on_conflict(
                OnConflict::columns([question_tag::Column::QuestionId, question_tag::Column::TagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Tags of each question, sorted by name. Untagged questions are absent.
    pub async fn find_by_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<tag::Model>>> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = QuestionTag::find()
            .filter(question_tag::Column::QuestionId.is_in(question_ids.to_vec()))
            .find_also_related(Tag)
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_question: HashMap<String, Vec<tag::Model>> = HashMap::new();
        for (link, tag) in rows {
            if let Some(tag) = tag {
                by_question.entry(link.question_id).or_default().push(tag);
            }
        }
        Ok(by_question)
    }

    /// Most used tags first, ties broken by name.
    pub async fn find_popular(&self, limit: u64) -> AppResult<Vec<TagUsage>> {
        Tag::find()
            .select_only()
            .column(tag::Column::Id)
            .column(tag::Column::Name)
            .column_as(question_tag::Column::QuestionId.count(), "questions_count")
            .join(JoinType::LeftJoin, tag::Relation::QuestionTags.def())
            .group_by(tag::Column::Id)
            .group_by(tag::Column::Name)
            .order_by(Expr::col(Alias::new("questions_count")), Order::Desc)
            .order_by_asc(tag::Column::Name)
            .limit(limit)
            .into_model::<TagUsage>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
