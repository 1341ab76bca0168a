use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use carelink_types::models::{CaregiverLink, LinkCode};
use uuid::Uuid;

use crate::store::{LinkStore, StoreError, StoreResult};

/// In-process store with the same uniqueness rules as the SQLite schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    codes: HashMap<Uuid, LinkCode>,
    owners: HashMap<String, Uuid>,
    links: HashMap<(Uuid, Uuid), CaregiverLink>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("memory store lock poisoned: {}", e)))
    }
}

fn newest_first(mut links: Vec<CaregiverLink>) -> Vec<CaregiverLink> {
    links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    links
}

impl LinkStore for MemoryStore {
    fn code_for_user(&self, user_id: Uuid) -> StoreResult<Option<LinkCode>> {
        Ok(self.lock()?.codes.get(&user_id).cloned())
    }

    fn code_by_value(&self, code: &str) -> StoreResult<Option<LinkCode>> {
        let inner = self.lock()?;
        Ok(inner
            .owners
            .get(code)
            .and_then(|owner| inner.codes.get(owner))
            .cloned())
    }

    fn insert_code(&self, code: &LinkCode) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.codes.contains_key(&code.owner_user_id) {
            return Err(StoreError::OwnerHasCode);
        }
        if inner.owners.contains_key(&code.code) {
            return Err(StoreError::CodeTaken);
        }
        inner.owners.insert(code.code.clone(), code.owner_user_id);
        inner.codes.insert(code.owner_user_id, code.clone());
        Ok(())
    }

    fn replace_code(&self, code: &LinkCode) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if let Some(holder) = inner.owners.get(&code.code) {
            if *holder != code.owner_user_id {
                return Err(StoreError::CodeTaken);
            }
        }
        if let Some(old) = inner.codes.remove(&code.owner_user_id) {
            inner.owners.remove(&old.code);
        }
        inner.owners.insert(code.code.clone(), code.owner_user_id);
        inner.codes.insert(code.owner_user_id, code.clone());
        Ok(())
    }

    fn link_exists(&self, caregiver_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.lock()?.links.contains_key(&(caregiver_id, user_id)))
    }

    fn insert_link(&self, link: &CaregiverLink) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let key = (link.caregiver_id, link.user_id);
        if inner.links.contains_key(&key) {
            return Err(StoreError::LinkExists);
        }
        inner.links.insert(key, link.clone());
        Ok(())
    }

    fn delete_link(&self, caregiver_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.lock()?.links.remove(&(caregiver_id, user_id)).is_some())
    }

    fn links_for_caregiver(&self, caregiver_id: Uuid) -> StoreResult<Vec<CaregiverLink>> {
        let inner = self.lock()?;
        Ok(newest_first(
            inner
                .links
                .values()
                .filter(|l| l.caregiver_id == caregiver_id)
                .cloned()
                .collect(),
        ))
    }

    fn links_for_user(&self, user_id: Uuid) -> StoreResult<Vec<CaregiverLink>> {
        let inner = self.lock()?;
        Ok(newest_first(
            inner
                .links
                .values()
                .filter(|l| l.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn code(owner: Uuid, value: &str) -> LinkCode {
        LinkCode {
            owner_user_id: owner,
            code: value.to_string(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn code_uniqueness_is_enforced_both_ways() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.insert_code(&code(alice, "AAAA1111")).unwrap();
        assert!(matches!(store.insert_code(&code(bob, "AAAA1111")), Err(StoreError::CodeTaken)));
        assert!(matches!(store.insert_code(&code(alice, "BBBB2222")), Err(StoreError::OwnerHasCode)));
    }

    #[test]
    fn failed_replace_keeps_previous_code() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.insert_code(&code(alice, "AAAA1111")).unwrap();
        store.insert_code(&code(bob, "BBBB2222")).unwrap();

        assert!(matches!(store.replace_code(&code(bob, "AAAA1111")), Err(StoreError::CodeTaken)));
        assert_eq!(store.code_for_user(bob).unwrap().unwrap().code, "BBBB2222");

        store.replace_code(&code(bob, "CCCC3333")).unwrap();
        assert!(store.code_by_value("BBBB2222").unwrap().is_none());
        assert_eq!(store.code_by_value("CCCC3333").unwrap().unwrap().owner_user_id, bob);
    }

    #[test]
    fn duplicate_link_is_a_conflict() {
        let store = MemoryStore::new();
        let link = CaregiverLink {
            caregiver_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        store.insert_link(&link).unwrap();
        assert!(matches!(store.insert_link(&link), Err(StoreError::LinkExists)));
        assert!(store.delete_link(link.caregiver_id, link.user_id).unwrap());
        assert!(!store.delete_link(link.caregiver_id, link.user_id).unwrap());
    }
}
