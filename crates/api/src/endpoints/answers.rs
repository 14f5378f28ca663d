//! Answers endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use qanda_common::AppResult;
use qanda_core::VoteState;
use qanda_db::entities::answer;
use serde::Serialize;

use super::LimitQuery;
use crate::{middleware::AppState, response::ApiResponse};

/// Answer response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub id: String,
    pub question_id: String,
    pub user_id: String,
    pub content: String,
    pub is_right: bool,
    pub rank: i32,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// The caller's vote, present only for authenticated requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<VoteState>,
}

impl From<answer::Model> for AnswerResponse {
    fn from(answer: answer::Model) -> Self {
        Self {
            id: answer.id,
            question_id: answer.question_id,
            user_id: answer.user_id,
            content: answer.content,
            is_right: answer.is_right,
            rank: answer.rank,
            created_at: answer.created_at.to_rfc3339(),
            updated_at: answer.updated_at.map(|t| t.to_rfc3339()),
            my_vote: None,
        }
    }
}

/// Best-ranked answers across all questions.
async fn trending(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<ApiResponse<Vec<AnswerResponse>>> {
    let answers = state
        .answer_service
        .trending(query.limit_or(state.trending_limit))
        .await?;
    Ok(ApiResponse::ok(
        answers.into_iter().map(AnswerResponse::from).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/trending", get(trending))
}
