//! API route definitions and the basic-auth guard.

use crate::{handlers, ApiError, AppState};
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the API router with all routes. Every route sits behind the
/// basic-auth guard; the username is ignored, only the password is
/// checked.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // element lookups
        .route("/element/search/:id", get(handlers::element::search))
        .route("/element/siacoin/:id", get(handlers::element::siacoin))
        .route("/element/siafund/:id", get(handlers::element::siafund))
        .route("/element/contract/:id", get(handlers::element::contract))
        // per-block queries
        .route("/chain/:index", get(handlers::chain::stats))
        .route("/chain/:index/state", get(handlers::chain::consensus_state))
        // transactions
        .route("/transaction/:id", get(handlers::transaction::get))
        // per-address queries
        .route("/address/:address/balance", get(handlers::address::balance))
        .route("/address/:address/siacoins", get(handlers::address::siacoins))
        .route("/address/:address/siafunds", get(handlers::address::siafunds))
        .route(
            "/address/:address/transactions",
            get(handlers::address::transactions),
        )
        // vectorized variants
        .route(
            "/batch/addresses/balance",
            post(handlers::address::batch_balance),
        )
        .route(
            "/batch/addresses/siacoins",
            post(handlers::address::batch_siacoins),
        )
        .route(
            "/batch/addresses/siafunds",
            post(handlers::address::batch_siafunds),
        )
        .route(
            "/batch/addresses/transactions",
            post(handlers::address::batch_transactions),
        )
        // external collaborators
        .route("/txpool/transactions", get(handlers::txpool::transactions))
        .route("/txpool/broadcast", post(handlers::txpool::broadcast))
        .route("/syncer/peers", get(handlers::syncer::peers))
        .route("/syncer/connect", post(handlers::syncer::connect))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(required) = &state.password {
        let authorized = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(basic_password)
            .is_some_and(|password| password == *required);
        if !authorized {
            tracing::debug!(path = %request.uri().path(), "rejecting unauthenticated request");
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

/// Extracts the password of a `Basic` authorization header, ignoring
/// the username.
fn basic_password(header: &str) -> Option<String> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (_user, password) = credentials.split_once(':')?;
    Some(password.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_password_ignores_username() {
        let header = format!("Basic {}", BASE64.encode("anyone:secret"));
        assert_eq!(basic_password(&header).as_deref(), Some("secret"));
        assert_eq!(basic_password("Bearer token"), None);
        assert_eq!(
            basic_password(&format!("Basic {}", BASE64.encode("nocolon"))),
            None
        );
    }
}
