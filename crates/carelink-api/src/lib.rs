//! REST surface for accounts and caregiver linking.

pub mod auth;
pub mod error;
pub mod links;
pub mod middleware;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;

use tracing::error;

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.to_string())
    })?
}
