pub mod forecast;
pub mod system;

use axum::{Extension, Router, middleware};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthToken};
use crate::state::AppState;

/// Assemble the API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(forecast::routes())
        .merge(system::routes())
}

/// Full service: API routes behind the auth gate, tracing and CORS.
///
/// The token extension is layered outside `require_auth` so the middleware
/// sees it on every request.
pub fn app(state: Arc<AppState>) -> Router {
    let token = state.config.token.clone();
    api_router()
        .layer(middleware::from_fn(auth::require_auth))
        .layer(Extension(AuthToken(token)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
