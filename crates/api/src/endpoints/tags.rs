//! Tags endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use qanda_common::AppResult;
use qanda_db::repositories::TagUsage;
use serde::Serialize;

use super::LimitQuery;
use crate::{middleware::AppState, response::ApiResponse};

/// Tag with its usage count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub name: String,
    pub questions_count: i64,
}

impl From<TagUsage> for TagResponse {
    fn from(tag: TagUsage) -> Self {
        Self {
            name: tag.name,
            questions_count: tag.questions_count,
        }
    }
}

/// Most used tags.
async fn popular(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<ApiResponse<Vec<TagResponse>>> {
    let tags = state
        .tag_service
        .list_popular(query.limit_or(state.trending_limit))
        .await?;
    Ok(ApiResponse::ok(tags.into_iter().map(TagResponse::from).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(popular))
}
