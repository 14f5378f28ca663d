//! Users endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use qanda_common::AppResult;
use qanda_core::{RegisterUserInput, UpdateProfileInput};
use qanda_db::entities::user;
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Public user response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// The caller's own account, including private fields.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub email: String,
    pub token: Option<String>,
}

impl From<user::Model> for MeResponse {
    fn from(user: user::Model) -> Self {
        let email = user.email.clone();
        let token = user.token.clone();
        Self {
            user: user.into(),
            email,
            token,
        }
    }
}

/// Token response.
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterUserInput>,
) -> AppResult<ApiResponse<MeResponse>> {
    let user = state.user_service.register(input).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Get current user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<MeResponse> {
    ApiResponse::ok(user.into())
}

/// Update the current user's email or avatar.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<MeResponse>> {
    let user = state.user_service.update_profile(&user.id, input).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Issue a fresh token. The old one stops working.
async fn regenerate_token(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let token = state.user_service.regenerate_token(&user.id).await?;
    Ok(ApiResponse::ok(TokenResponse { token }))
}

/// Show a user's public profile.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.get(&id).await?;
    Ok(ApiResponse::ok(user.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/me", get(me).patch(update_me))
        .route("/me/regenerate-token", post(regenerate_token))
        .route("/{id}", get(show))
}
