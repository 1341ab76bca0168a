use std::sync::Arc;

use carelink_types::models::{CaregiverLink, LinkCode};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::code::{CodeGenerator, DEFAULT_CODE_LENGTH, RandomCodes, is_well_formed};
use crate::error::LinkError;
use crate::store::{LinkStore, StoreError};

#[derive(Debug, Clone)]
pub struct LinkingConfig {
    pub code_length: usize,
    /// `None` keeps codes valid until regenerated.
    pub code_ttl: Option<Duration>,
    /// Insert attempts before giving up on finding a free code.
    pub max_attempts: u32,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            code_ttl: None,
            max_attempts: 8,
        }
    }
}

/// Issue, regenerate and redeem link codes; create and remove caregiver links.
///
/// Every call names the acting user explicitly. The pre-checks here give
/// precise errors, the store's unique constraints close the races between
/// check and insert.
#[derive(Clone)]
pub struct LinkingService {
    store: Arc<dyn LinkStore>,
    codes: Arc<dyn CodeGenerator>,
    config: LinkingConfig,
}

impl LinkingService {
    pub fn new(store: Arc<dyn LinkStore>, config: LinkingConfig) -> Self {
        let codes = Arc::new(RandomCodes::new(config.code_length));
        Self::with_generator(store, codes, config)
    }

    pub fn with_generator(
        store: Arc<dyn LinkStore>,
        codes: Arc<dyn CodeGenerator>,
        config: LinkingConfig,
    ) -> Self {
        Self { store, codes, config }
    }

    /// The user's active code, creating one if they have none (or theirs expired).
    pub fn issue_code(&self, user_id: Uuid) -> Result<LinkCode, LinkError> {
        let now = Utc::now();

        let expired = match self.store.code_for_user(user_id)? {
            Some(existing) if !existing.is_expired_at(now) => return Ok(existing),
            Some(_) => {
                debug!("Link code for {} expired, replacing", user_id);
                true
            }
            None => false,
        };

        for attempt in 1..=self.config.max_attempts {
            let candidate = self.candidate(user_id, now);
            let stored = if expired {
                self.store.replace_code(&candidate)
            } else {
                self.store.insert_code(&candidate)
            };
            match stored {
                Ok(()) => {
                    info!("Issued link code for {}", user_id);
                    return Ok(candidate);
                }
                Err(StoreError::CodeTaken) => {
                    debug!("Link code collision on attempt {}", attempt);
                }
                Err(StoreError::OwnerHasCode) => {
                    // A concurrent issue for the same user won the insert.
                    if let Some(winner) = self.store.code_for_user(user_id)? {
                        return Ok(winner);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.exhausted(user_id))
    }

    /// Replace the user's code. The previous code stops resolving immediately,
    /// or stays in place if no replacement could be stored.
    pub fn regenerate_code(&self, user_id: Uuid) -> Result<LinkCode, LinkError> {
        let now = Utc::now();
        let previous = self.store.code_for_user(user_id)?.map(|c| c.code);

        for attempt in 1..=self.config.max_attempts {
            let candidate = self.candidate(user_id, now);
            if previous.as_deref() == Some(candidate.code.as_str()) {
                continue;
            }

            match self.store.replace_code(&candidate) {
                Ok(()) => {
                    info!("Regenerated link code for {}", user_id);
                    return Ok(candidate);
                }
                Err(StoreError::CodeTaken) => {
                    debug!("Link code collision on attempt {}", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.exhausted(user_id))
    }

    /// The user's active code without creating one.
    pub fn current_code(&self, user_id: Uuid) -> Result<Option<LinkCode>, LinkError> {
        let now = Utc::now();
        Ok(self
            .store
            .code_for_user(user_id)?
            .filter(|c| !c.is_expired_at(now)))
    }

    /// Link `caregiver_id` to whoever owns `code`.
    pub fn redeem_code(&self, caregiver_id: Uuid, code: &str) -> Result<CaregiverLink, LinkError> {
        let code = code.trim();
        if !is_well_formed(code) {
            return Err(LinkError::NotFound);
        }

        let now = Utc::now();
        let owner = self
            .store
            .code_by_value(code)?
            .filter(|c| !c.is_expired_at(now))
            .map(|c| c.owner_user_id)
            .ok_or(LinkError::NotFound)?;

        if owner == caregiver_id {
            return Err(LinkError::SelfLink);
        }

        if self.store.link_exists(caregiver_id, owner)? {
            return Err(LinkError::AlreadyLinked);
        }

        let link = CaregiverLink {
            caregiver_id,
            user_id: owner,
            created_at: now,
        };
        self.store.insert_link(&link)?;

        info!("Caregiver {} linked to user {}", caregiver_id, owner);
        Ok(link)
    }

    /// Remove a link. Either party may do this; anyone else is refused.
    /// Returns whether a row was actually removed; a missing row is not an error.
    pub fn unlink(&self, actor_id: Uuid, caregiver_id: Uuid, user_id: Uuid) -> Result<bool, LinkError> {
        if actor_id != caregiver_id && actor_id != user_id {
            warn!(
                "{} tried to remove link between caregiver {} and user {}",
                actor_id, caregiver_id, user_id
            );
            return Err(LinkError::Unauthorized);
        }

        let removed = self.store.delete_link(caregiver_id, user_id)?;
        if removed {
            info!("Link between caregiver {} and user {} removed by {}", caregiver_id, user_id, actor_id);
        }
        Ok(removed)
    }

    /// Users the caregiver is linked to, newest first.
    pub fn linked_users(&self, caregiver_id: Uuid) -> Result<Vec<CaregiverLink>, LinkError> {
        Ok(self.store.links_for_caregiver(caregiver_id)?)
    }

    /// Caregivers linked to the user, newest first.
    pub fn caregivers_of(&self, user_id: Uuid) -> Result<Vec<CaregiverLink>, LinkError> {
        Ok(self.store.links_for_user(user_id)?)
    }

    fn candidate(&self, user_id: Uuid, now: DateTime<Utc>) -> LinkCode {
        LinkCode {
            owner_user_id: user_id,
            code: self.codes.generate(),
            created_at: now,
            expires_at: self.config.code_ttl.map(|ttl| now + ttl),
        }
    }

    fn exhausted(&self, user_id: Uuid) -> LinkError {
        warn!(
            "No free link code for {} after {} attempts",
            user_id, self.config.max_attempts
        );
        LinkError::StoreUnavailable(StoreError::Unavailable(anyhow::anyhow!(
            "no free link code after {} attempts",
            self.config.max_attempts
        )))
    }
}
