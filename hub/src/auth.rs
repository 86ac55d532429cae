use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::HubError;

/// Routes reachable without a token (liveness checks).
const PUBLIC_PATHS: &[&str] = &["/health"];

/// Configured hub token, installed as a request extension outside [`require_auth`].
#[derive(Clone)]
pub struct AuthToken(pub String);

/// Bearer-token gate. A missing or empty [`AuthToken`] disables it.
pub async fn require_auth(request: Request, next: Next) -> Response {
    let expected = match request.extensions().get::<AuthToken>() {
        Some(AuthToken(t)) if !t.is_empty() => t.clone(),
        _ => return next.run(request).await,
    };

    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let authorized = bearer(&request)
        .is_some_and(|presented| tokens_match(presented.as_bytes(), expected.as_bytes()));
    if authorized {
        return next.run(request).await;
    }

    tracing::debug!(path = request.uri().path(), "rejected unauthenticated request");
    HubError::Unauthorized.into_response()
}

fn bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Timing does not depend on where the first differing byte is.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
