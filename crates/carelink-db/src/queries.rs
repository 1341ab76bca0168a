use crate::Database;
use crate::models::{UserRow, parse_timestamp};
use anyhow::{Result, anyhow};
use carelink_types::models::{Role, User};
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str, role: Role) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, role) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, role.as_str()),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id.parse().map_err(|e| anyhow!("Corrupt user id '{}': {}", self.id, e))?,
            role: self.role.parse::<Role>().map_err(|e| anyhow!(e))?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is only ever one of our own literals
    let sql = format!("SELECT id, username, password, role, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                role: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}
