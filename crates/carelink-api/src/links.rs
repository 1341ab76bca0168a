use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use carelink_types::api::{Claims, LinkCodeQuery, LinkCodeResponse, LinkResponse, RedeemCodeRequest};
use carelink_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

/// GET /link-code — the caller's code, created on first use unless
/// `?create=false`.
pub async fn get_link_code(
    State(state): State<AppState>,
    Query(query): Query<LinkCodeQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let linking = state.linking.clone();
    let code = run_blocking(move || {
        if query.create {
            Ok(linking.issue_code(claims.sub)?)
        } else {
            linking
                .current_code(claims.sub)?
                .ok_or_else(|| ApiError::NotFound("No link code issued yet".into()))
        }
    })
    .await?;
    Ok(Json(LinkCodeResponse::from(code)))
}

/// POST /link-code/regenerate — replace the caller's code.
pub async fn regenerate_link_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let linking = state.linking.clone();
    let user_id = claims.sub;
    let code = run_blocking(move || linking.regenerate_code(user_id).map_err(ApiError::from)).await?;

    state
        .dispatcher
        .publish(GatewayEvent::LinkCodeRegenerated { user_id })
        .await;

    Ok(Json(LinkCodeResponse::from(code)))
}

/// POST /links — redeem a code as the caregiver.
pub async fn redeem_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RedeemCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let linking = state.linking.clone();
    let caregiver_id = claims.sub;
    let link = run_blocking(move || linking.redeem_code(caregiver_id, &req.code).map_err(ApiError::from)).await?;

    state
        .dispatcher
        .publish(GatewayEvent::LinkCreated {
            caregiver_id: link.caregiver_id,
            user_id: link.user_id,
            created_at: link.created_at,
        })
        .await;

    Ok((StatusCode::CREATED, Json(LinkResponse::from(link))))
}

/// GET /links — users the caller looks after.
pub async fn list_linked_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let linking = state.linking.clone();
    let links = run_blocking(move || linking.linked_users(claims.sub).map_err(ApiError::from)).await?;
    Ok(Json(links.into_iter().map(LinkResponse::from).collect::<Vec<_>>()))
}

/// GET /caregivers — caregivers linked to the caller.
pub async fn list_caregivers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let linking = state.linking.clone();
    let links = run_blocking(move || linking.caregivers_of(claims.sub).map_err(ApiError::from)).await?;
    Ok(Json(links.into_iter().map(LinkResponse::from).collect::<Vec<_>>()))
}

/// DELETE /links/{user_id} — the caregiver drops a user.
pub async fn unlink_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    remove_link(&state, claims.sub, claims.sub, user_id).await
}

/// DELETE /caregivers/{caregiver_id} — the user drops a caregiver.
pub async fn remove_caregiver(
    State(state): State<AppState>,
    Path(caregiver_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    remove_link(&state, claims.sub, caregiver_id, claims.sub).await
}

async fn remove_link(
    state: &AppState,
    actor_id: Uuid,
    caregiver_id: Uuid,
    user_id: Uuid,
) -> Result<StatusCode, ApiError> {
    let linking = state.linking.clone();
    let removed = run_blocking(move || linking.unlink(actor_id, caregiver_id, user_id).map_err(ApiError::from)).await?;

    if removed {
        state
            .dispatcher
            .publish(GatewayEvent::LinkRemoved { caregiver_id, user_id })
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
