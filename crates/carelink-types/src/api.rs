use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CaregiverLink, LinkCode, Role};

// -- JWT Claims --

/// JWT claims shared by carelink-api (REST middleware) and carelink-gateway
/// (WebSocket Identify).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
    /// `None` if the first code could not be issued; fetch it with GET /link-code.
    pub link_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Link codes --

/// Query for GET /link-code. `create=false` reads the current code without
/// issuing one.
#[derive(Debug, Deserialize)]
pub struct LinkCodeQuery {
    #[serde(default = "default_create")]
    pub create: bool,
}

fn default_create() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkCodeResponse {
    pub code: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<LinkCode> for LinkCodeResponse {
    fn from(code: LinkCode) -> Self {
        Self {
            code: code.code,
            expires_at: code.expires_at,
        }
    }
}

// -- Caregiver links --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResponse {
    pub caregiver_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<CaregiverLink> for LinkResponse {
    fn from(link: CaregiverLink) -> Self {
        Self {
            caregiver_id: link.caregiver_id,
            user_id: link.user_id,
            created_at: link.created_at,
        }
    }
}
