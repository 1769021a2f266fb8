// Repository pattern - isolates all user database side effects
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;

use crate::db::models::{Rating, User, UserSettings};
use crate::db::RepositoryError;
use crate::state::DbPool;

/// Payload for account creation; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub location: String,
    pub avatar: String,
}

/// Partial profile update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar: Option<String>,
}

/// Repository trait - all user database operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Apply a partial profile update and return the fresh record.
    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError>;

    async fn set_password_hash(&self, id: &str, hash: &str) -> Result<(), RepositoryError>;

    /// Remove the user and everything that depends on it: their recipes
    /// (with those recipes' comments), their comments elsewhere (with
    /// replies under them), their ids in other recipes' engagement sets,
    /// their sessions, and finally the user row. All-or-nothing.
    async fn delete_account(&self, id: &str) -> Result<(), RepositoryError>;
}

/// SQLite implementation
pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, bio, location, avatar, \
     show_email, show_bio, show_location, profile_privacy, created_at, updated_at";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        bio: row.get(4)?,
        location: row.get(5)?,
        avatar: row.get(6)?,
        settings: UserSettings {
            show_email: row.get(7)?,
            show_bio: row.get(8)?,
            show_location: row.get(9)?,
            profile_privacy: row.get(10)?,
        },
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl SqliteUserRepository {
    fn load(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = conn.query_row(&sql, params![id], row_to_user).optional()?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, new: NewUser) -> Result<User, RepositoryError> {
        let id = uuid::Uuid::now_v7().to_string();

        {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, bio, location, avatar) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    new.name,
                    new.email,
                    new.password_hash,
                    new.bio,
                    new.location,
                    new.avatar
                ],
            )?;
        }

        self.load(&id)?
            .ok_or_else(|| RepositoryError::NotFound("User not found".to_string()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        self.load(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = conn
            .query_row(&sql, params![email], row_to_user)
            .optional()?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        {
            let conn = self.pool.get()?;
            let rows = conn.execute(
                "UPDATE users SET \
                     name = COALESCE(?2, name), \
                     bio = COALESCE(?3, bio), \
                     location = COALESCE(?4, location), \
                     avatar = COALESCE(?5, avatar), \
                     updated_at = datetime('now') \
                 WHERE id = ?1",
                params![id, update.name, update.bio, update.location, update.avatar],
            )?;
            if rows == 0 {
                return Err(RepositoryError::NotFound("User not found".to_string()));
            }
        }

        self.load(id)?
            .ok_or_else(|| RepositoryError::NotFound("User not found".to_string()))
    }

    async fn set_password_hash(&self, id: &str, hash: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users SET password_hash = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, hash],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<(), RepositoryError> = (|| {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(RepositoryError::NotFound("User not found".to_string()));
            }

            // 1. Comments under the user's recipes, then the recipes
            conn.execute(
                "DELETE FROM comments WHERE recipe_id IN \
                 (SELECT id FROM recipes WHERE author_id = ?1)",
                params![id],
            )?;
            conn.execute("DELETE FROM recipes WHERE author_id = ?1", params![id])?;

            // 2. Replies under the user's comments elsewhere, then the
            //    comments themselves
            conn.execute(
                "DELETE FROM comments WHERE parent_id IN \
                 (SELECT id FROM comments WHERE author_id = ?1)",
                params![id],
            )?;
            conn.execute("DELETE FROM comments WHERE author_id = ?1", params![id])?;

            // 3. Scrub the user from other recipes' engagement documents
            let affected: Vec<(String, String, String, String)> = {
                let mut stmt = conn.prepare(
                    "SELECT id, likes, bookmarks, ratings FROM recipes \
                     WHERE EXISTS (SELECT 1 FROM json_each(likes) WHERE json_each.value = ?1) \
                        OR EXISTS (SELECT 1 FROM json_each(bookmarks) WHERE json_each.value = ?1) \
                        OR EXISTS (SELECT 1 FROM json_each(ratings) \
                                   WHERE json_extract(json_each.value, '$.user') = ?1)",
                )?;
                let rows = stmt
                    .query_map(params![id], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            for (recipe_id, likes_json, bookmarks_json, ratings_json) in affected {
                let mut likes: Vec<String> = serde_json::from_str(&likes_json)?;
                let mut bookmarks: Vec<String> = serde_json::from_str(&bookmarks_json)?;
                let mut ratings: Vec<Rating> = serde_json::from_str(&ratings_json)?;

                likes.retain(|u| u != id);
                bookmarks.retain(|u| u != id);
                ratings.retain(|r| r.user != id);

                conn.execute(
                    "UPDATE recipes SET likes = ?1, bookmarks = ?2, ratings = ?3 \
                     WHERE id = ?4",
                    params![
                        serde_json::to_string(&likes)?,
                        serde_json::to_string(&bookmarks)?,
                        serde_json::to_string(&ratings)?,
                        recipe_id
                    ],
                )?;
            }

            // 4. Sessions, then the user record
            conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![id])?;
            conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;

            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }
}
