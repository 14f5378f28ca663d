//! User service.

use chrono::Utc;
use qanda_common::{AppError, AppResult, IdGenerator};
use qanda_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserInput {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Input for updating a profile. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(email)]
    pub email: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user and issue their bearer token.
    pub async fn register(&self, input: RegisterUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if input.username.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "Username must not contain whitespace".to_string(),
            ));
        }

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username_lower: Set(input.username.to_lowercase()),
            username: Set(input.username),
            email: Set(input.email),
            token: Set(Some(self.id_gen.generate_token())),
            avatar_url: Set(input.avatar_url),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Update a user's email and avatar.
    pub async fn update_profile(
        &self,
        id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;

        if let Some(email) = &input.email {
            if let Some(other) = self.user_repo.find_by_email(email).await? {
                if other.id != user.id {
                    return Err(AppError::Conflict("Email already registered".to_string()));
                }
            }
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Regenerate a user's authentication token.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn register_input(username: &str) -> RegisterUserInput {
        RegisterUserInput {
            username: username.to_string(),
            email: format!("{}@example.com", username.to_lowercase()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_register_validates_before_lookup() {
        // No scripted results: any query would fail
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = UserService::new(UserRepository::new(db));

        let mut input = register_input("alice");
        input.email = "not-an-email".to_string();
        assert!(matches!(
            service.register(input).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            service.register(register_input("")).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            service.register(register_input("two words")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_issues_token() {
        let ctx = TestContext::new().await;

        let user = ctx.users.register(register_input("Alice")).await.unwrap();
        assert_eq!(user.username_lower, "alice");

        let token = user.token.clone().unwrap();
        let found = ctx.users.authenticate_by_token(&token).await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username_case_insensitively() {
        let ctx = TestContext::new().await;
        ctx.users.register(register_input("alice")).await.unwrap();

        let mut input = register_input("ALICE");
        input.email = "other@example.com".to_string();
        assert!(matches!(
            ctx.users.register(input).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email() {
        let ctx = TestContext::new().await;
        ctx.users.register(register_input("alice")).await.unwrap();

        let mut input = register_input("bob");
        input.email = "alice@example.com".to_string();
        assert!(matches!(
            ctx.users.register(input).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let ctx = TestContext::new().await;
        assert!(matches!(
            ctx.users.authenticate_by_token("nope").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_regenerate_token_invalidates_old_one() {
        let ctx = TestContext::new().await;
        let user = ctx.users.register(register_input("alice")).await.unwrap();
        let old = user.token.clone().unwrap();

        let new = ctx.users.regenerate_token(&user.id).await.unwrap();
        assert_ne!(old, new);
        assert!(ctx.users.authenticate_by_token(&old).await.is_err());
        assert_eq!(
            ctx.users.authenticate_by_token(&new).await.unwrap().id,
            user.id
        );
    }

    #[tokio::test]
    async fn test_update_profile() {
        let ctx = TestContext::new().await;
        let alice = ctx.users.register(register_input("alice")).await.unwrap();
        ctx.users.register(register_input("bob")).await.unwrap();

        let taken = ctx
            .users
            .update_profile(
                &alice.id,
                UpdateProfileInput {
                    email: Some("bob@example.com".to_string()),
                    avatar_url: None,
                },
            )
            .await;
        assert!(matches!(taken, Err(AppError::Conflict(_))));

        let updated = ctx
            .users
            .update_profile(
                &alice.id,
                UpdateProfileInput {
                    email: Some("alice@example.org".to_string()),
                    avatar_url: Some("https://example.org/a.png".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "alice@example.org");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://example.org/a.png"));
        assert!(updated.updated_at.is_some());
    }
}
