use chrono::{Duration, Utc};
use rand::Rng;
use rusqlite::params;

use crate::db::RepositoryError;
use crate::state::DbPool;

/// Create a new session for a user. Returns the bearer token.
pub fn create_session(
    pool: &DbPool,
    user_id: &str,
    hours: i64,
) -> Result<String, RepositoryError> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();
    // Same layout as SQLite's datetime('now'), which the extractor compares
    // against.
    let expires_at = (Utc::now() + Duration::hours(hours))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, token, expires_at],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> Result<(), RepositoryError> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn create_session_stores_a_future_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash) \
             VALUES ('u1', 'Alice', 'alice@example.com', 'x')",
            [],
        )
        .unwrap();
        drop(conn);

        let token = create_session(&pool, "u1", 24).unwrap();

        let conn = pool.get().unwrap();
        let live: bool = conn
            .query_row(
                "SELECT expires_at > datetime('now') FROM sessions WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .unwrap();
        assert!(live);
    }

    #[test]
    fn delete_session_revokes_the_token() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash) \
             VALUES ('u1', 'Alice', 'alice@example.com', 'x')",
            [],
        )
        .unwrap();
        drop(conn);

        let token = create_session(&pool, "u1", 24).unwrap();
        delete_session(&pool, &token).unwrap();

        let conn = pool.get().unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
