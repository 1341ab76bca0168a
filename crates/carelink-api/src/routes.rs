use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::{self, AppState};
use crate::links;
use crate::middleware::require_auth;

/// Public and protected REST routes. The server adds the gateway route and
/// the tower-http layers on top.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(links::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/link-code", get(links::get_link_code))
        .route("/link-code/regenerate", post(links::regenerate_link_code))
        .route("/links", get(links::list_linked_users).post(links::redeem_code))
        .route("/links/{user_id}", delete(links::unlink_user))
        .route("/caregivers", get(links::list_caregivers))
        .route("/caregivers/{caregiver_id}", delete(links::remove_caregiver))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
