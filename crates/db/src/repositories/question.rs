//! Question repository.

use std::sync::Arc;

use crate::entities::{Question, question, question_tag, tag};
use crate::pagination::{Page, fetch_page};
use qanda_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select, TransactionTrait,
};

/// Sort order for question listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionOrder {
    /// Most recently published first.
    #[default]
    Newest,
    /// Highest rank first, newest first among equals.
    Rank,
}

impl QuestionOrder {
    /// Parse the `order_by` query parameter. Anything but `rank` means newest.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("rank") => Self::Rank,
            _ => Self::Newest,
        }
    }

    fn apply(self, select: Select<Question>) -> Select<Question> {
        match self {
            Self::Newest => select
                .order_by_desc(question::Column::CreatedAt)
                .order_by_desc(question::Column::Id),
            Self::Rank => by_rank(select),
        }
    }
}

fn by_rank(select: Select<Question>) -> Select<Question> {
    select
        .order_by_desc(question::Column::Rank)
        .order_by_desc(question::Column::CreatedAt)
        .order_by_desc(question::Column::Id)
}

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::QuestionNotFound(id.to_string()))
    }

    /// Start a transaction on the underlying connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new question.
    pub async fn create<C>(&self, conn: &C, model: question::ActiveModel) -> AppResult<question::Model>
    where
        C: ConnectionTrait,
    {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of all questions in the given order.
    pub async fn find_page(
        &self,
        order: QuestionOrder,
        page: u64,
        per_page: u64,
    ) -> AppResult<Page<question::Model>> {
        fetch_page(self.db.as_ref(), order.apply(Question::find()), page, per_page).await
    }

    /// One page of questions filtered by tag name and/or a text fragment,
    /// ranked highest first.
    ///
    /// The text fragment matches either the title or the content.
    pub async fn search_page(
        &self,
        tag_name: Option<&str>,
        text: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> AppResult<Page<question::Model>> {
        let mut select = Question::find();

        if let Some(name) = tag_name {
            select = select
                .join(JoinType::InnerJoin, question::Relation::QuestionTags.def())
                .join(JoinType::InnerJoin, question_tag::Relation::Tag.def())
                .filter(tag::Column::Name.eq(name));
        }

        if let Some(text) = text {
            select = select.filter(
                Condition::any()
                    .add(question::Column::Title.contains(text))
                    .add(question::Column::Content.contains(text)),
            );
        }

        fetch_page(self.db.as_ref(), by_rank(select), page, per_page).await
    }

    /// Questions with a positive rank, best first.
    pub async fn find_trending(&self, limit: u64) -> AppResult<Vec<question::Model>> {
        by_rank(Question::find().filter(question::Column::Rank.gt(0)))
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn create_test_question(id: &str, rank: i32, age_minutes: i64) -> question::Model {
        question::Model {
            id: id.to_string(),
            user_id: "user1".to_string(),
            title: format!("Question {id}"),
            content: "Body".to_string(),
            rank,
            created_at: (Utc::now() - Duration::minutes(age_minutes)).into(),
            updated_at: None,
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    #[test]
    fn test_order_from_param() {
        assert_eq!(QuestionOrder::from_param(Some("rank")), QuestionOrder::Rank);
        assert_eq!(QuestionOrder::from_param(Some("newest")), QuestionOrder::Newest);
        assert_eq!(QuestionOrder::from_param(Some("bogus")), QuestionOrder::Newest);
        assert_eq!(QuestionOrder::from_param(None), QuestionOrder::Newest);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<question::Model>::new()])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::QuestionNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_find_trending() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_question("q1", 5, 30),
                    create_test_question("q2", 3, 10),
                ]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let result = repo.find_trending(3).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "q1");
    }

    #[tokio::test]
    async fn test_find_page() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(3)]])
                .append_query_results([[
                    create_test_question("q3", 0, 1),
                    create_test_question("q2", 0, 2),
                ]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let page = repo.find_page(QuestionOrder::Newest, 1, 2).await.unwrap();

        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next());
    }
}
