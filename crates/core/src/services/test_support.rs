//! Shared fixtures for service tests backed by an in-memory database.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use qanda_common::{
    Config,
    config::{DatabaseConfig, ServerConfig, SiteConfig},
};
use qanda_db::{
    entities::{answer, question, user},
    repositories::{
        AnswerRepository, QuestionRepository, TagRepository, UserRepository, VoteRepository,
    },
    test_utils::TestDatabase,
};
use sea_orm::DatabaseConnection;

use super::{
    AnswerService, CreateAnswerInput, CreateQuestionInput, QuestionService, RegisterUserInput,
    TagService, UserService, VoteService,
};

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub users: UserService,
    pub questions: QuestionService,
    pub answers: AnswerService,
    pub tags: TagService,
    pub votes: VoteService,
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            url: "http://localhost:3000".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        site: SiteConfig {
            questions_per_page: 2,
            answers_per_page: 2,
            trending_limit: 3,
            max_tags: 3,
        },
    }
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_db(Arc::new(TestDatabase::sqlite_memory().await.unwrap().conn))
    }

    /// Services over an already migrated database.
    pub fn with_db(db: Arc<DatabaseConnection>) -> Self {
        let config = test_config();

        let user_repo = UserRepository::new(db.clone());
        let question_repo = QuestionRepository::new(db.clone());
        let answer_repo = AnswerRepository::new(db.clone());
        let tag_repo = TagRepository::new(db.clone());
        let vote_repo = VoteRepository::new(db.clone());

        let tags = TagService::new(tag_repo, &config);

        Self {
            users: UserService::new(user_repo.clone()),
            questions: QuestionService::new(
                question_repo.clone(),
                answer_repo.clone(),
                tags.clone(),
                &config,
            ),
            answers: AnswerService::new(answer_repo, question_repo, user_repo, &config),
            tags,
            votes: VoteService::new(vote_repo),
            db,
        }
    }

    pub async fn user(&self, username: &str) -> user::Model {
        self.users
            .register(RegisterUserInput {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                avatar_url: None,
            })
            .await
            .unwrap()
    }

    pub async fn question(&self, user_id: &str, title: &str) -> question::Model {
        self.questions
            .create(
                user_id,
                CreateQuestionInput {
                    title: title.to_string(),
                    content: format!("What about {title}?"),
                    tags: String::new(),
                },
            )
            .await
            .unwrap()
            .question
    }

    pub async fn answer(&self, user_id: &str, question_id: &str, content: &str) -> answer::Model {
        self.answers
            .create(
                user_id,
                question_id,
                CreateAnswerInput {
                    content: content.to_string(),
                },
            )
            .await
            .unwrap()
    }
}
