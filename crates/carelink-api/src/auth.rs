use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use carelink_db::Database;
use carelink_gateway::Dispatcher;
use carelink_linking::LinkingService;
use carelink_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use carelink_types::models::Role;

use crate::error::ApiError;
use crate::run_blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub linking: LinkingService,
    pub dispatcher: Dispatcher,
    pub jwt_secret: Arc<str>,
    pub token_ttl: chrono::Duration,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let username_len = req.username.chars().count();
    if !(3..=32).contains(&username_len) {
        return Err(ApiError::BadRequest("username must be 3 to 32 characters".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".into()));
    }

    let st = state.clone();
    let username = req.username.clone();
    let role = req.role;
    let (user_id, link_code) = run_blocking(move || {
        if st.db.get_user_by_username(&username)?.is_some() {
            return Err(ApiError::UsernameTaken);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .to_string();

        let user_id = Uuid::new_v4();
        st.db
            .create_user(&user_id.to_string(), &username, &password_hash, role)
            .map_err(|e| {
                // lost a race with a concurrent registration
                if e.to_string().contains("users.username") {
                    ApiError::UsernameTaken
                } else {
                    ApiError::from(e)
                }
            })?;

        // Every account starts with a code it can hand to a caregiver. The
        // account already exists, so a failure here must not fail the
        // request; GET /link-code creates the code later.
        let link_code = match st.linking.issue_code(user_id) {
            Ok(code) => Some(code.code),
            Err(e) => {
                warn!("Could not issue link code for new user {}: {}", user_id, e);
                None
            }
        };
        Ok((user_id, link_code))
    })
    .await?;

    info!("Registered {} ({}) as {}", req.username, user_id, role);

    let token = create_token(&state, user_id, &req.username, role)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
            link_code,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let username = req.username.clone();
    let user = run_blocking(move || {
        let row = st
            .db
            .get_user_by_username(&username)?
            .ok_or(ApiError::InvalidCredentials)?;

        // Verify password
        let parsed_hash =
            PasswordHash::new(&row.password).map_err(|e| ApiError::Internal(e.to_string()))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;

        Ok(row.into_user()?)
    })
    .await?;

    let token = create_token(&state, user.id, &user.username, user.role)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        role: user.role,
        token,
    }))
}

pub fn create_token(state: &AppStateInner, user_id: Uuid, username: &str, role: Role) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))
}
