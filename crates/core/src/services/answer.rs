//! Answer service.

use std::collections::HashMap;

use chrono::Utc;
use qanda_common::{AppResult, Config, IdGenerator};
use qanda_db::{
    Page,
    entities::answer,
    repositories::{AnswerRepository, QuestionRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

/// Answer service for business logic.
#[derive(Clone)]
pub struct AnswerService {
    answer_repo: AnswerRepository,
    question_repo: QuestionRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
    answers_per_page: u64,
}

/// Input for answering a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnswerInput {
    #[validate(length(min = 1, max = 1024))]
    pub content: String,
}

impl AnswerService {
    /// Create a new answer service.
    #[must_use]
    pub fn new(
        answer_repo: AnswerRepository,
        question_repo: QuestionRepository,
        user_repo: UserRepository,
        config: &Config,
    ) -> Self {
        Self {
            answer_repo,
            question_repo,
            user_repo,
            id_gen: IdGenerator::new(),
            answers_per_page: config.site.answers_per_page,
        }
    }

    /// Answer a question.
    pub async fn create(
        &self,
        user_id: &str,
        question_id: &str,
        input: CreateAnswerInput,
    ) -> AppResult<answer::Model> {
        input.validate()?;
        let question = self.question_repo.get_by_id(question_id).await?;

        let model = answer::ActiveModel {
            id: Set(self.id_gen.generate()),
            question_id: Set(question.id.clone()),
            user_id: Set(user_id.to_string()),
            content: Set(input.content),
            is_right: Set(false),
            rank: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let answer = self.answer_repo.create(model).await?;

        // Notify the question author
        match self.user_repo.find_by_id(&question.user_id).await? {
            Some(author) => info!(
                question_id = %question.id,
                answer_id = %answer.id,
                author = %author.username,
                answered_by = %user_id,
                "New answer to your question received"
            ),
            None => warn!(question_id = %question.id, "Question author missing"),
        }

        Ok(answer)
    }

    /// One page of a question's answers, best first.
    pub async fn list_for_question(
        &self,
        question_id: &str,
        page: u64,
    ) -> AppResult<Page<answer::Model>> {
        self.question_repo.get_by_id(question_id).await?;
        self.answer_repo
            .find_page_by_question(question_id, page, self.answers_per_page)
            .await
    }

    /// Number of answers per question.
    pub async fn count_by_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        self.answer_repo.count_by_questions(question_ids).await
    }

    /// Best-ranked answers with a positive rank.
    pub async fn trending(&self, limit: u64) -> AppResult<Vec<answer::Model>> {
        self.answer_repo.find_trending(limit).await
    }
}
