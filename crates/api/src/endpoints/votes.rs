//! Votes endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use qanda_common::AppResult;
use qanda_core::{UserVotes, VoteOutcome};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Cast vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    /// `question` or `answer`.
    pub entity_type: String,
    pub entity_id: String,
    /// `1` for up, `-1` for down.
    pub value: i64,
}

/// Cast, withdraw or flip a vote.
async fn cast(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    let outcome = state
        .vote_service
        .cast_vote(&user.id, &req.entity_type, &req.entity_id, req.value)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

/// The caller's standing votes.
async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserVotes>> {
    let votes = state.vote_service.user_votes(&user.id).await?;
    Ok(ApiResponse::ok(votes))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cast", post(cast))
        .route("/mine", get(mine))
}
