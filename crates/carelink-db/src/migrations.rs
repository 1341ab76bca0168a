use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, link codes, caregiver links)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'individual'
                            CHECK (role IN ('individual', 'caregiver', 'clinician')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- One active code per user; each code names exactly one user.
            CREATE TABLE link_codes (
                user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                code        TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL,
                expires_at  TEXT
            );

            CREATE TABLE caregiver_links (
                caregiver_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at    TEXT NOT NULL,
                PRIMARY KEY (caregiver_id, user_id),
                CHECK (caregiver_id <> user_id)
            );

            CREATE INDEX idx_caregiver_links_user
                ON caregiver_links(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
