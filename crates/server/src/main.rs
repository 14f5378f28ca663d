//! qanda server entry point.

use std::sync::Arc;

use axum::{Router, middleware};
use qanda_api::{AppState, auth_middleware, router as api_router};
use qanda_common::Config;
use qanda_core::{AnswerService, QuestionService, TagService, UserService, VoteService};
use qanda_db::repositories::{
    AnswerRepository, QuestionRepository, TagRepository, UserRepository, VoteRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Wire repositories and services over one connection pool.
fn build_state(db: &Arc<sea_orm::DatabaseConnection>, config: &Config) -> AppState {
    let user_repo = UserRepository::new(Arc::clone(db));
    let question_repo = QuestionRepository::new(Arc::clone(db));
    let answer_repo = AnswerRepository::new(Arc::clone(db));
    let tag_repo = TagRepository::new(Arc::clone(db));
    let vote_repo = VoteRepository::new(Arc::clone(db));

    let tag_service = TagService::new(tag_repo, config);

    AppState {
        user_service: UserService::new(user_repo.clone()),
        question_service: QuestionService::new(
            question_repo.clone(),
            answer_repo.clone(),
            tag_service.clone(),
            config,
        ),
        answer_service: AnswerService::new(answer_repo, question_repo, user_repo, config),
        tag_service,
        vote_service: VoteService::new(vote_repo),
        trending_limit: config.site.trending_limit,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qanda=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting qanda server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = qanda_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    qanda_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let state = build_state(&db, &config);

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, url = %config.server.url, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
