//! API integration tests.
//!
//! These tests drive the full router against an in-memory database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
    middleware::from_fn_with_state,
};
use qanda_api::{AppState, auth_middleware, router as api_router};
use qanda_common::config::{Config, DatabaseConfig, ServerConfig, SiteConfig};
use qanda_core::{AnswerService, QuestionService, TagService, UserService, VoteService};
use qanda_db::{
    repositories::{
        AnswerRepository, QuestionRepository, TagRepository, UserRepository, VoteRepository,
    },
    test_utils::TestDatabase,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test configuration.
fn create_test_config() -> Config {
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
            questions_per_page: 10,
            answers_per_page: 10,
            trending_limit: 5,
            max_tags: 3,
        },
    }
}

/// Create the app state over a fresh in-memory database.
async fn create_test_state() -> AppState {
    let db = Arc::new(TestDatabase::sqlite_memory().await.unwrap().conn);
    let config = create_test_config();

    let user_repo = UserRepository::new(Arc::clone(&db));
    let question_repo = QuestionRepository::new(Arc::clone(&db));
    let answer_repo = AnswerRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));

    let tag_service = TagService::new(tag_repo, &config);

    AppState {
        user_service: UserService::new(user_repo.clone()),
        question_service: QuestionService::new(
            question_repo.clone(),
            answer_repo.clone(),
            tag_service.clone(),
            &config,
        ),
        answer_service: AnswerService::new(answer_repo, question_repo, user_repo, &config),
        tag_service,
        vote_service: VoteService::new(vote_repo),
        trending_limit: config.site.trending_limit,
    }
}

/// Create the test router, mounted the way the server mounts it.
async fn create_test_router() -> Router {
    let state = create_test_state().await;
    Router::new()
        .nest("/api", api_router())
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = send(app, method, uri, token, body).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register a user and return `(id, token)`.
async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({ "username": username, "email": format!("{username}@example.com") })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["data"]["id"].as_str().unwrap().to_string(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

async fn ask(app: &Router, token: &str, title: &str, tags: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/questions",
        Some(token),
        Some(json!({ "title": title, "content": format!("About {title}"), "tags": tags })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn cast(
    app: &Router,
    token: &str,
    entity_type: &str,
    id: &str,
    value: i64,
) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/votes/cast",
        Some(token),
        Some(json!({ "entityType": entity_type, "entityId": id, "value": value })),
    )
    .await
}

#[tokio::test]
async fn test_register_and_me() {
    let app = create_test_router().await;
    let (id, token) = register(&app, "alice").await;

    let (status, body) = call(&app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "alice@example.com");

    // Public profile hides private fields
    let (status, body) = call(&app, "GET", &format!("/api/users/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("email").is_none());
    assert!(body["data"].get("token").is_none());
}

#[tokio::test]
async fn test_register_conflict() {
    let app = create_test_router().await;
    register(&app, "alice").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({ "username": "ALICE", "email": "other@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_me_requires_auth() {
    let app = create_test_router().await;

    let (status, body) = call(&app, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call(&app, "GET", "/api/users/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_regenerate_token() {
    let app = create_test_router().await;
    let (_, old) = register(&app, "alice").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/users/me/regenerate-token",
        Some(&old),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "GET", "/api/users/me", Some(&old), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, "GET", "/api/users/me", Some(&new), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cast_vote_toggle_and_flip() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let q = ask(&app, &alice, "Lifetimes", "rust").await;

    let (status, body) = cast(&app, &bob, "question", &q, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "state": "up", "rank": 1 }));

    let (_, body) = cast(&app, &bob, "question", &q, -1).await;
    assert_eq!(body["data"], json!({ "state": "down", "rank": -1 }));

    let (_, body) = cast(&app, &bob, "question", &q, -1).await;
    assert_eq!(body["data"], json!({ "state": "none", "rank": 0 }));
}

#[tokio::test]
async fn test_cast_vote_errors() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let q = ask(&app, &alice, "Traits", "").await;

    let (status, body) = cast(&app, &alice, "question", &q, 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_VOTE_VALUE");

    let (status, body) = cast(&app, &alice, "comment", &q, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid object name");

    let (status, body) = cast(&app, &alice, "answer", &q, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ENTITY_NOT_FOUND");
    assert_eq!(body["error"]["message"], "Invalid object id");

    // Nothing was recorded
    let (_, body) = call(&app, "GET", "/api/votes/mine", Some(&alice), None).await;
    assert_eq!(body["data"], json!({ "question": {}, "answer": {} }));
}

#[tokio::test]
async fn test_cast_vote_requires_auth() {
    let app = create_test_router().await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/votes/cast",
        None,
        Some(json!({ "entityType": "question", "entityId": "q", "value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vote_link_redirects_to_referer() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let q = ask(&app, &alice, "Borrowing", "").await;

    let request = Request::builder()
        .uri(format!("/api/questions/vote/question/{q}/up"))
        .header(header::AUTHORIZATION, format!("Bearer {alice}"))
        .header(header::REFERER, "http://localhost/questions/1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost/questions/1"
    );

    // No referer: back to the root, and the second click withdraws the vote
    let response = send(
        &app,
        "GET",
        &format!("/api/questions/vote/question/{q}/up"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let (_, body) = call(&app, "GET", &format!("/api/questions/{q}"), None, None).await;
    assert_eq!(body["data"]["rank"], 0);
}

#[tokio::test]
async fn test_vote_link_errors() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let q = ask(&app, &alice, "Macros", "").await;

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/questions/vote/question/{q}/sideways"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid vote value");

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/questions/vote/comment/{q}/up"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid object name");

    let (status, body) = call(
        &app,
        "GET",
        "/api/questions/vote/question/missing/down",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid object id");

    let (status, _) = call(
        &app,
        "GET",
        &format!("/api/questions/vote/question/{q}/up"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_question_detail_with_answers_and_votes() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let q = ask(&app, &alice, "Async traits", "rust, async").await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/questions/{q}/answers"),
        Some(&bob),
        Some(json!({ "content": "Use a boxed future" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let answer_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["isRight"], false);

    cast(&app, &alice, "answer", &answer_id, 1).await;
    cast(&app, &bob, "question", &q, -1).await;

    let (status, body) = call(&app, "GET", &format!("/api/questions/{q}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["tags"], json!(["async", "rust"]));
    assert_eq!(data["numAnswers"], 1);
    assert_eq!(data["rank"], -1);
    assert_eq!(data["myVote"], "down");
    assert_eq!(data["answers"]["items"][0]["rank"], 1);
    assert_eq!(data["answers"]["items"][0]["myVote"], "none");

    // Anonymous viewers get no vote state
    let (_, body) = call(&app, "GET", &format!("/api/questions/{q}"), None, None).await;
    assert!(body["data"].get("myVote").is_none());

    let (_, body) = call(&app, "GET", "/api/votes/mine", Some(&alice), None).await;
    assert_eq!(body["data"]["answer"][answer_id.as_str()], 1);
}

#[tokio::test]
async fn test_award_answer() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let q = ask(&app, &alice, "Pinning", "").await;

    let (_, body) = call(
        &app,
        "POST",
        &format!("/api/questions/{q}/answers"),
        Some(&bob),
        Some(json!({ "content": "Pin<Box<T>>" })),
    )
    .await;
    let answer_id = body["data"]["id"].as_str().unwrap().to_string();
    let award = format!("/api/questions/{q}/answers/{answer_id}/award");

    let (status, _) = call(&app, "POST", &award, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "POST", &award, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isRight"], true);

    let (_, body) = call(&app, "POST", &award, Some(&alice), None).await;
    assert_eq!(body["data"]["isRight"], false);
}

#[tokio::test]
async fn test_list_search_and_trending() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let older = ask(&app, &alice, "Generic bounds", "rust").await;
    let newer = ask(&app, &alice, "Window functions", "sql").await;

    cast(&app, &bob, "question", &older, 1).await;

    let (_, body) = call(&app, "GET", "/api/questions", None, None).await;
    assert_eq!(body["data"]["items"][0]["id"], newer.as_str());
    assert_eq!(body["data"]["totalItems"], 2);

    let (_, body) = call(&app, "GET", "/api/questions?order_by=rank", None, None).await;
    assert_eq!(body["data"]["items"][0]["id"], older.as_str());

    let (_, body) = call(&app, "GET", "/api/questions/search?t=sql", None, None).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["id"], newer.as_str());

    let (_, body) = call(&app, "GET", "/api/questions/search?s=tag:rust", None, None).await;
    assert_eq!(body["data"]["items"][0]["id"], older.as_str());

    let (_, body) = call(&app, "GET", "/api/questions/search?s=window", None, None).await;
    assert_eq!(body["data"]["items"][0]["id"], newer.as_str());

    // Only positively ranked questions trend
    let (_, body) = call(&app, "GET", "/api/questions/trending?limit=3", None, None).await;
    let trending = body["data"].as_array().unwrap();
    assert_eq!(trending.len(), 1);
    assert_eq!(trending[0]["id"], older.as_str());
    assert_eq!(trending[0]["tags"], json!(["rust"]));

    let (_, body) = call(&app, "GET", "/api/tags", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_question_with_too_many_tags() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/questions",
        Some(&alice),
        Some(json!({ "title": "Tags", "content": "Many", "tags": "a,b,c,d" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_trending_answers() {
    let app = create_test_router().await;
    let (_, alice) = register(&app, "alice").await;
    let q = ask(&app, &alice, "Closures", "").await;
    let (_, body) = call(
        &app,
        "POST",
        &format!("/api/questions/{q}/answers"),
        Some(&alice),
        Some(json!({ "content": "FnOnce" })),
    )
    .await;
    let answer_id = body["data"]["id"].as_str().unwrap().to_string();
    cast(&app, &alice, "answer", &answer_id, 1).await;

    let (status, body) = call(&app, "GET", "/api/answers/trending", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], answer_id.as_str());
}

#[tokio::test]
async fn test_missing_question_returns_404() {
    let app = create_test_router().await;

    let (status, body) = call(&app, "GET", "/api/questions/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "QUESTION_NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router().await;

    let response = send(&app, "GET", "/api/nonexistent", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
