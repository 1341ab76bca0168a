use carelink_types::models::{CaregiverLink, LinkCode};
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures a store reports. The three conflict variants come from unique
/// constraints and are the only race protection the linking rules rely on.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another user already holds this code string.
    #[error("link code already in use")]
    CodeTaken,

    /// The owner already has a code row.
    #[error("user already has a link code")]
    OwnerHasCode,

    /// The (caregiver, user) pair already exists.
    #[error("caregiver link already exists")]
    LinkExists,

    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

/// Persistence for link codes and caregiver links.
///
/// Implementations must enforce uniqueness of `LinkCode::code`,
/// `LinkCode::owner_user_id` and the `(caregiver_id, user_id)` pair and report
/// violations with the matching conflict variant.
pub trait LinkStore: Send + Sync {
    fn code_for_user(&self, user_id: Uuid) -> StoreResult<Option<LinkCode>>;

    fn code_by_value(&self, code: &str) -> StoreResult<Option<LinkCode>>;

    fn insert_code(&self, code: &LinkCode) -> StoreResult<()>;

    /// Swap the owner's code row for `code` in one step. On `CodeTaken` (or
    /// any other failure) the previous row must still be in place.
    fn replace_code(&self, code: &LinkCode) -> StoreResult<()>;

    fn link_exists(&self, caregiver_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    fn insert_link(&self, link: &CaregiverLink) -> StoreResult<()>;

    /// Returns whether a row was removed.
    fn delete_link(&self, caregiver_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// Newest first.
    fn links_for_caregiver(&self, caregiver_id: Uuid) -> StoreResult<Vec<CaregiverLink>>;

    /// Newest first.
    fn links_for_user(&self, user_id: Uuid) -> StoreResult<Vec<CaregiverLink>>;
}
