use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("No user found for that link code")]
    NotFound,

    #[error("You cannot link to your own code")]
    SelfLink,

    #[error("You are already linked to this user")]
    AlreadyLinked,

    #[error("Not allowed to change this link")]
    Unauthorized,

    #[error("Link store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LinkExists => Self::AlreadyLinked,
            other => Self::StoreUnavailable(other),
        }
    }
}
