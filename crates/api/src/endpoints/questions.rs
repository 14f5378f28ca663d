//! Questions endpoints.

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, header::REFERER},
    response::Redirect,
    routing::{get, post},
};
use qanda_common::AppResult;
use qanda_core::{
    CreateAnswerInput, CreateQuestionInput, QuestionListItem, QuestionOrder, QuestionSearch,
    VoteDirection, VoteState,
};
use qanda_db::entities::{question, vote::VotableKind};
use serde::{Deserialize, Serialize};

use super::{LimitQuery, PageQuery, answers::AnswerResponse};
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, PageResponse},
};

/// Question response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub rank: i32,
    pub tags: Vec<String>,
    pub num_answers: u64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// The caller's vote, present only for authenticated requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<VoteState>,
}

impl QuestionResponse {
    fn new(question: question::Model, tags: Vec<String>, num_answers: u64) -> Self {
        Self {
            id: question.id,
            user_id: question.user_id,
            title: question.title,
            content: question.content,
            rank: question.rank,
            tags,
            num_answers,
            created_at: question.created_at.to_rfc3339(),
            updated_at: question.updated_at.map(|t| t.to_rfc3339()),
            my_vote: None,
        }
    }
}

impl From<QuestionListItem> for QuestionResponse {
    fn from(item: QuestionListItem) -> Self {
        Self::new(item.question, item.tags, item.num_answers)
    }
}

/// A question with one page of its answers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetailResponse {
    #[serde(flatten)]
    pub question: QuestionResponse,
    pub answers: PageResponse<AnswerResponse>,
}

/// Listing query.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// `rank` or `newest` (default).
    pub order_by: Option<String>,
    pub page: Option<u64>,
}

/// Search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Exact tag name.
    pub t: Option<String>,
    /// Free text, or `tag:<name>`.
    pub s: Option<String>,
    pub page: Option<u64>,
}

/// List all questions.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<PageResponse<QuestionResponse>>> {
    let order = QuestionOrder::from_param(query.order_by.as_deref());
    let page = state
        .question_service
        .list(order, query.page.unwrap_or(1))
        .await?;
    Ok(ApiResponse::ok(PageResponse::from_page(
        page,
        QuestionResponse::from,
    )))
}

/// Ask a question.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateQuestionInput>,
) -> AppResult<ApiResponse<QuestionResponse>> {
    let item = state.question_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(item.into()))
}

/// Search questions by tag or text.
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<PageResponse<QuestionResponse>>> {
    let search = QuestionSearch {
        tag: query.t,
        query: query.s,
    };
    let page = state
        .question_service
        .search(&search, query.page.unwrap_or(1))
        .await?;
    Ok(ApiResponse::ok(PageResponse::from_page(
        page,
        QuestionResponse::from,
    )))
}

/// Best-ranked questions.
async fn trending(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<ApiResponse<Vec<QuestionResponse>>> {
    let questions = state
        .question_service
        .trending(query.limit_or(state.trending_limit))
        .await?;

    let ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
    let mut tags = state.tag_service.names_by_questions(&ids).await?;
    let counts = state.answer_service.count_by_questions(&ids).await?;

    Ok(ApiResponse::ok(
        questions
            .into_iter()
            .map(|q| {
                let num_answers = counts.get(&q.id).copied().unwrap_or(0);
                let tags = tags.remove(&q.id).unwrap_or_default();
                QuestionResponse::new(q, tags, num_answers)
            })
            .collect(),
    ))
}

/// A question with a page of answers, best first.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<QuestionDetailResponse>> {
    let detail = state.question_service.detail(&id, query.page()).await?;

    let votes = match &viewer {
        Some(user) => Some(state.vote_service.user_votes(&user.id).await?),
        None => None,
    };
    let vote_on = |kind: VotableKind, entity_id: &str| {
        votes
            .as_ref()
            .map(|v| VoteState::from(v.get(kind, entity_id)))
    };

    let num_answers = detail.answers.total_items;
    let mut question = QuestionResponse::new(detail.question, detail.tags, num_answers);
    question.my_vote = vote_on(VotableKind::Question, &question.id);

    let answers = PageResponse::from_page(detail.answers, |answer| {
        let my_vote = vote_on(VotableKind::Answer, &answer.id);
        AnswerResponse {
            my_vote,
            ..AnswerResponse::from(answer)
        }
    });

    Ok(ApiResponse::ok(QuestionDetailResponse { question, answers }))
}

/// Answer a question.
async fn answer(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateAnswerInput>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    let answer = state.answer_service.create(&user.id, &id, input).await?;
    Ok(ApiResponse::ok(answer.into()))
}

/// Toggle the right-answer mark. Only the question author may do this.
async fn award(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, answer_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    let answer = state
        .question_service
        .award_answer(&user.id, &id, &answer_id)
        .await?;
    Ok(ApiResponse::ok(answer.into()))
}

/// Vote from a plain link, then send the browser back where it came from.
async fn vote_link(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path((object_name, object_id, vote)): Path<(String, String, String)>,
) -> AppResult<Redirect> {
    let direction: VoteDirection = vote.parse()?;
    let kind: VotableKind = object_name.parse()?;

    state
        .vote_service
        .cast(&user.id, kind, &object_id, direction)
        .await?;

    Ok(Redirect::to(&back_target(&headers, uri.path())))
}

/// The `Referer`, unless it is missing or points at the vote link itself.
fn back_target(headers: &HeaderMap, path: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|referer| !referer.is_empty() && *referer != path)
        .map_or_else(|| "/".to_string(), str::to_string)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/trending", get(trending))
        .route("/vote/{object_name}/{object_id}/{vote}", get(vote_link))
        .route("/{id}", get(show))
        .route("/{id}/answers", post(answer))
        .route("/{id}/answers/{answer_id}/award", post(award))
}
