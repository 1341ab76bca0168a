use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use carelink_linking::LinkError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Missing or invalid token")]
    Unauthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Link(LinkError::NotFound) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Link(LinkError::SelfLink) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Link(LinkError::AlreadyLinked) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Link(LinkError::Unauthorized) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Link(LinkError::StoreUnavailable(e)) => {
                error!("Link store failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Link store unavailable".to_string())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Unauthenticated | ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::UsernameTaken => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Internal(e) => {
                error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_linking::StoreError;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn link_errors_map_to_statuses() {
        assert_eq!(status_of(LinkError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(LinkError::SelfLink.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(LinkError::AlreadyLinked.into()), StatusCode::CONFLICT);
        assert_eq!(status_of(LinkError::Unauthorized.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(LinkError::StoreUnavailable(StoreError::Unavailable(anyhow::anyhow!("down"))).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_errors_are_401() {
        assert_eq!(status_of(ApiError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ApiError::InvalidCredentials), StatusCode::UNAUTHORIZED);
    }
}
