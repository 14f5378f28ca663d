//! Question service.

use chrono::Utc;
use qanda_common::{AppError, AppResult, Config, IdGenerator};
use qanda_db::{
    Page,
    entities::{answer, question},
    repositories::{AnswerRepository, QuestionOrder, QuestionRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::tag::TagService;

/// Question service for business logic.
#[derive(Clone)]
pub struct QuestionService {
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    tag_service: TagService,
    id_gen: IdGenerator,
    questions_per_page: u64,
    answers_per_page: u64,
}

/// Input for asking a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,

    #[validate(length(min = 1, max = 1024))]
    pub content: String,

    /// Comma-separated tag names.
    #[serde(default)]
    pub tags: String,
}

/// Search parameters. Both filters may be combined.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionSearch {
    /// Exact tag name.
    pub tag: Option<String>,
    /// Free text, or `tag:<name>` to search by tag.
    pub query: Option<String>,
}

impl QuestionSearch {
    /// Resolve into an optional tag filter and an optional text filter.
    fn filters(&self) -> (Option<String>, Option<String>) {
        let mut tag = self
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        let mut text = None;

        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            match query.strip_prefix("tag:") {
                Some(name) => {
                    let name = name.trim();
                    if !name.is_empty() {
                        tag = Some(name.to_lowercase());
                    }
                }
                None => text = Some(query.to_string()),
            }
        }

        (tag, text)
    }
}

/// A question as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionListItem {
    pub question: question::Model,
    pub tags: Vec<String>,
    pub num_answers: u64,
}

/// A question with one page of its answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDetail {
    pub question: question::Model,
    pub tags: Vec<String>,
    pub answers: Page<answer::Model>,
}

impl QuestionService {
    /// Create a new question service.
    #[must_use]
    pub fn new(
        question_repo: QuestionRepository,
        answer_repo: AnswerRepository,
        tag_service: TagService,
        config: &Config,
    ) -> Self {
        Self {
            question_repo,
            answer_repo,
            tag_service,
            id_gen: IdGenerator::new(),
            questions_per_page: config.site.questions_per_page,
            answers_per_page: config.site.answers_per_page,
        }
    }

    /// Ask a new question. The question, its tags and links commit together.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreateQuestionInput,
    ) -> AppResult<QuestionListItem> {
        input.validate()?;
        let tag_names = self.tag_service.parse(&input.tags)?;

        let model = question::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            title: Set(input.title),
            content: Set(input.content),
            rank: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let txn = self.question_repo.begin().await?;
        let question = self.question_repo.create(&txn, model).await?;
        let tags = self.tag_service.get_or_create(&txn, &tag_names).await?;
        self.tag_service.attach(&txn, &question.id, &tags).await?;
        txn.commit().await?;

        info!(question_id = %question.id, user_id = %user_id, "Question created");

        Ok(QuestionListItem {
            question,
            tags: tags.into_iter().map(|t| t.name).collect(),
            num_answers: 0,
        })
    }

    /// Get a question by ID.
    pub async fn get(&self, id: &str) -> AppResult<question::Model> {
        self.question_repo.get_by_id(id).await
    }

    /// A question with its tags and one page of answers, best first.
    pub async fn detail(&self, id: &str, page: u64) -> AppResult<QuestionDetail> {
        let question = self.question_repo.get_by_id(id).await?;
        let mut tags = self
            .tag_service
            .names_by_questions(std::slice::from_ref(&question.id))
            .await?;
        let answers = self
            .answer_repo
            .find_page_by_question(&question.id, page, self.answers_per_page)
            .await?;

        Ok(QuestionDetail {
            tags: tags.remove(&question.id).unwrap_or_default(),
            question,
            answers,
        })
    }

    /// One page of all questions.
    pub async fn list(&self, order: QuestionOrder, page: u64) -> AppResult<Page<QuestionListItem>> {
        let questions = self
            .question_repo
            .find_page(order, page, self.questions_per_page)
            .await?;
        self.decorate(questions).await
    }

    /// One page of questions matching a search, best first.
    pub async fn search(
        &self,
        search: &QuestionSearch,
        page: u64,
    ) -> AppResult<Page<QuestionListItem>> {
        let (tag, text) = search.filters();
        let questions = self
            .question_repo
            .search_page(tag.as_deref(), text.as_deref(), page, self.questions_per_page)
            .await?;
        self.decorate(questions).await
    }

    /// Best-ranked questions with a positive rank.
    pub async fn trending(&self, limit: u64) -> AppResult<Vec<question::Model>> {
        self.question_repo.find_trending(limit).await
    }

    /// Toggle the "right answer" mark on an answer. Only the question's
    /// author may do this.
    pub async fn award_answer(
        &self,
        user_id: &str,
        question_id: &str,
        answer_id: &str,
    ) -> AppResult<answer::Model> {
        let question = self.question_repo.get_by_id(question_id).await?;
        if question.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author can award answers".to_string(),
            ));
        }

        let answer = self
            .answer_repo
            .find_by_id(answer_id)
            .await?
            .filter(|a| a.question_id == question.id)
            .ok_or_else(|| AppError::AnswerNotFound(answer_id.to_string()))?;

        let is_right = !answer.is_right;
        let mut active: answer::ActiveModel = answer.into();
        active.is_right = Set(is_right);
        active.updated_at = Set(Some(Utc::now().into()));

        let answer = self.answer_repo.update(active).await?;
        info!(question_id = %question_id, answer_id = %answer_id, is_right, "Answer award toggled");

        Ok(answer)
    }

    /// Attach tags and answer counts to a page of questions.
    async fn decorate(
        &self,
        questions: Page<question::Model>,
    ) -> AppResult<Page<QuestionListItem>> {
        let ids: Vec<String> = questions.items.iter().map(|q| q.id.clone()).collect();
        let mut tags = self.tag_service.names_by_questions(&ids).await?;
        let counts = self.answer_repo.count_by_questions(&ids).await?;

        Ok(questions.map(|question| QuestionListItem {
            tags: tags.remove(&question.id).unwrap_or_default(),
            num_answers: counts.get(&question.id).copied().unwrap_or(0),
            question,
        }))
    }
}
