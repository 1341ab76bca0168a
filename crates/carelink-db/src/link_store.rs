//! SQLite implementation of the linking store.

use anyhow::anyhow;
use carelink_linking::{LinkStore, StoreError};
use carelink_linking::store::StoreResult;
use carelink_types::models::{CaregiverLink, LinkCode};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::Database;
use crate::models::{CaregiverLinkRow, LinkCodeRow, format_timestamp, parse_timestamp};

/// Turn unique-constraint failures into the conflicts the linking rules
/// understand; anything else means the store is unavailable.
fn classify(err: anyhow::Error) -> StoreError {
    if let Some(rusqlite::Error::SqliteFailure(e, Some(msg))) = err.downcast_ref::<rusqlite::Error>() {
        if e.code == ErrorCode::ConstraintViolation {
            if msg.contains("link_codes.code") {
                return StoreError::CodeTaken;
            }
            if msg.contains("link_codes.user_id") {
                return StoreError::OwnerHasCode;
            }
            if msg.contains("caregiver_links.caregiver_id") {
                return StoreError::LinkExists;
            }
        }
    }
    StoreError::Unavailable(err)
}

fn code_row(row: &Row<'_>) -> rusqlite::Result<LinkCodeRow> {
    Ok(LinkCodeRow {
        user_id: row.get(0)?,
        code: row.get(1)?,
        created_at: row.get(2)?,
        expires_at: row.get(3)?,
    })
}

fn link_row(row: &Row<'_>) -> rusqlite::Result<CaregiverLinkRow> {
    Ok(CaregiverLinkRow {
        caregiver_id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn insert_code_row(conn: &Connection, code: &LinkCode) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO link_codes (user_id, code, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            code.owner_user_id.to_string(),
            code.code,
            format_timestamp(code.created_at),
            code.expires_at.map(format_timestamp),
        ],
    )?;
    Ok(())
}

fn parse_uuid(raw: &str) -> anyhow::Result<Uuid> {
    raw.parse().map_err(|e| anyhow!("Corrupt id '{}': {}", raw, e))
}

impl TryFrom<LinkCodeRow> for LinkCode {
    type Error = anyhow::Error;

    fn try_from(row: LinkCodeRow) -> anyhow::Result<Self> {
        Ok(LinkCode {
            owner_user_id: parse_uuid(&row.user_id)?,
            created_at: parse_timestamp(&row.created_at)?,
            expires_at: row.expires_at.as_deref().map(parse_timestamp).transpose()?,
            code: row.code,
        })
    }
}

impl TryFrom<CaregiverLinkRow> for CaregiverLink {
    type Error = anyhow::Error;

    fn try_from(row: CaregiverLinkRow) -> anyhow::Result<Self> {
        Ok(CaregiverLink {
            caregiver_id: parse_uuid(&row.caregiver_id)?,
            user_id: parse_uuid(&row.user_id)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl Database {
    fn query_code(&self, column: &str, value: &str) -> StoreResult<Option<LinkCode>> {
        self.with_conn(|conn| {
            // `column` is only ever one of our own literals
            let sql = format!(
                "SELECT user_id, code, created_at, expires_at FROM link_codes WHERE {column} = ?1"
            );
            let row = conn.query_row(&sql, [value], code_row).optional()?;
            row.map(LinkCode::try_from).transpose()
        })
        .map_err(StoreError::Unavailable)
    }

    fn query_links(&self, column: &str, id: Uuid) -> StoreResult<Vec<CaregiverLink>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT caregiver_id, user_id, created_at FROM caregiver_links
                 WHERE {column} = ?1
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id.to_string()], link_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(CaregiverLink::try_from).collect()
        })
        .map_err(StoreError::Unavailable)
    }
}

impl LinkStore for Database {
    fn code_for_user(&self, user_id: Uuid) -> StoreResult<Option<LinkCode>> {
        self.query_code("user_id", &user_id.to_string())
    }

    fn code_by_value(&self, code: &str) -> StoreResult<Option<LinkCode>> {
        self.query_code("code", code)
    }

    fn insert_code(&self, code: &LinkCode) -> StoreResult<()> {
        self.with_conn(|conn| insert_code_row(conn, code)).map_err(classify)
    }

    fn replace_code(&self, code: &LinkCode) -> StoreResult<()> {
        self.with_conn(|conn| {
            // dropped without commit on any error, which rolls the delete back
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM link_codes WHERE user_id = ?1",
                [code.owner_user_id.to_string()],
            )?;
            insert_code_row(&tx, code)?;
            tx.commit()?;
            Ok(())
        })
        .map_err(classify)
    }

    fn link_exists(&self, caregiver_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM caregiver_links WHERE caregiver_id = ?1 AND user_id = ?2",
                    params![caregiver_id.to_string(), user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .map_err(StoreError::Unavailable)
    }

    fn insert_link(&self, link: &CaregiverLink) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO caregiver_links (caregiver_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![
                    link.caregiver_id.to_string(),
                    link.user_id.to_string(),
                    format_timestamp(link.created_at),
                ],
            )?;
            Ok(())
        })
        .map_err(classify)
    }

    fn delete_link(&self, caregiver_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM caregiver_links WHERE caregiver_id = ?1 AND user_id = ?2",
                params![caregiver_id.to_string(), user_id.to_string()],
            )?;
            Ok(removed > 0)
        })
        .map_err(StoreError::Unavailable)
    }

    fn links_for_caregiver(&self, caregiver_id: Uuid) -> StoreResult<Vec<CaregiverLink>> {
        self.query_links("caregiver_id", caregiver_id)
    }

    fn links_for_user(&self, user_id: Uuid) -> StoreResult<Vec<CaregiverLink>> {
        self.query_links("user_id", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_linking::{LinkError, LinkingConfig, LinkingService};
    use carelink_types::models::Role;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn db_with_users(n: usize) -> (Arc<Database>, Vec<Uuid>) {
        let db = Database::open_in_memory().unwrap();
        let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            db.create_user(&id.to_string(), &format!("user{i}"), "hash", Role::Individual)
                .unwrap();
        }
        (Arc::new(db), ids)
    }

    fn code(owner: Uuid, value: &str) -> LinkCode {
        LinkCode {
            owner_user_id: owner,
            code: value.to_string(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn unique_violations_are_classified() {
        let (db, ids) = db_with_users(2);
        db.insert_code(&code(ids[0], "AAAA1111")).unwrap();

        assert!(matches!(db.insert_code(&code(ids[1], "AAAA1111")), Err(StoreError::CodeTaken)));
        assert!(matches!(db.insert_code(&code(ids[0], "BBBB2222")), Err(StoreError::OwnerHasCode)));

        let link = CaregiverLink {
            caregiver_id: ids[1],
            user_id: ids[0],
            created_at: Utc::now(),
        };
        db.insert_link(&link).unwrap();
        assert!(matches!(db.insert_link(&link), Err(StoreError::LinkExists)));
    }

    #[test]
    fn replace_rolls_back_on_conflict() {
        let (db, ids) = db_with_users(2);
        db.insert_code(&code(ids[0], "Taken000")).unwrap();
        db.insert_code(&code(ids[1], "Mine0000")).unwrap();

        assert!(matches!(db.replace_code(&code(ids[1], "Taken000")), Err(StoreError::CodeTaken)));
        assert_eq!(db.code_for_user(ids[1]).unwrap().unwrap().code, "Mine0000");

        db.replace_code(&code(ids[1], "Fresh111")).unwrap();
        assert!(db.code_by_value("Mine0000").unwrap().is_none());
        assert_eq!(db.code_for_user(ids[1]).unwrap().unwrap().code, "Fresh111");
    }

    #[test]
    fn unknown_user_is_not_a_conflict() {
        let (db, _) = db_with_users(0);
        // foreign key failure, not one of ours
        assert!(matches!(
            db.insert_code(&code(Uuid::new_v4(), "AAAA1111")),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn code_round_trips_with_expiry() {
        let (db, ids) = db_with_users(1);
        let now = Utc::now();
        let stored = LinkCode {
            owner_user_id: ids[0],
            code: "aB3dE9Kz".into(),
            created_at: now,
            expires_at: Some(now + Duration::hours(6)),
        };
        db.insert_code(&stored).unwrap();

        let by_user = db.code_for_user(ids[0]).unwrap().unwrap();
        let by_value = db.code_by_value("aB3dE9Kz").unwrap().unwrap();
        assert_eq!(by_user, by_value);
        assert_eq!(by_user.code, "aB3dE9Kz");
        assert_eq!(
            by_user.expires_at.unwrap().timestamp_micros(),
            stored.expires_at.unwrap().timestamp_micros()
        );
        // codes are case-sensitive
        assert!(db.code_by_value("ab3de9kz").unwrap().is_none());
    }

    #[test]
    fn links_list_newest_first() {
        let (db, ids) = db_with_users(3);
        let caregiver = ids[0];
        let base = Utc::now();
        for (i, user) in ids[1..].iter().enumerate() {
            db.insert_link(&CaregiverLink {
                caregiver_id: caregiver,
                user_id: *user,
                created_at: base + Duration::seconds(i as i64),
            })
            .unwrap();
        }

        let links = db.links_for_caregiver(caregiver).unwrap();
        assert_eq!(links.iter().map(|l| l.user_id).collect::<Vec<_>>(), vec![ids[2], ids[1]]);
        assert_eq!(db.links_for_user(ids[1]).unwrap().len(), 1);
    }

    #[test]
    fn service_scenario_on_sqlite() {
        let (db, ids) = db_with_users(2);
        let (user, caregiver) = (ids[0], ids[1]);
        let svc = LinkingService::new(db.clone(), LinkingConfig::default());

        let issued = svc.issue_code(user).unwrap();
        assert_eq!(svc.issue_code(user).unwrap().code, issued.code);

        assert!(matches!(svc.redeem_code(user, &issued.code), Err(LinkError::SelfLink)));
        assert!(matches!(svc.redeem_code(caregiver, "nonexistent-code"), Err(LinkError::NotFound)));

        svc.redeem_code(caregiver, &issued.code).unwrap();
        assert!(matches!(svc.redeem_code(caregiver, &issued.code), Err(LinkError::AlreadyLinked)));

        let fresh = svc.regenerate_code(user).unwrap();
        assert!(db.code_by_value(&issued.code).unwrap().is_none());
        assert_eq!(db.code_for_user(user).unwrap().unwrap().code, fresh.code);

        assert!(svc.unlink(caregiver, caregiver, user).unwrap());
        assert!(!svc.unlink(caregiver, caregiver, user).unwrap());
        assert!(svc.linked_users(caregiver).unwrap().is_empty());
    }
}
