pub mod auth;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod profile;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// The complete HTTP surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(profile::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(categories::router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not Found".into())
}
