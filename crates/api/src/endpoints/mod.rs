//! API endpoints.

mod answers;
mod questions;
mod tags;
mod users;
mod votes;

use axum::Router;
use serde::Deserialize;

use crate::middleware::AppState;

pub use answers::AnswerResponse;
pub use questions::{QuestionDetailResponse, QuestionResponse};
pub use tags::TagResponse;
pub use users::{MeResponse, TokenResponse, UserResponse};
pub use votes::CastVoteRequest;

/// Upper bound on `?limit=` for the trending and tag views.
const MAX_LIMIT: u64 = 100;

/// `?page=N`, 1-based. Missing or out of range falls back to the nearest page.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    pub(crate) fn page(&self) -> u64 {
        self.page.unwrap_or(1)
    }
}

/// `?limit=N`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LimitQuery {
    pub limit: Option<u64>,
}

impl LimitQuery {
    pub(crate) fn limit_or(&self, default: u64) -> u64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/questions", questions::router())
        .nest("/answers", answers::router())
        .nest("/votes", votes::router())
        .nest("/tags", tags::router())
}
