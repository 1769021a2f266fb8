// Repository pattern - isolates all comment database side effects
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;

use crate::comments::threading::CommentView;
use crate::db::models::{Author, Comment};
use crate::db::RepositoryError;
use crate::state::DbPool;

/// Payload for comment creation; `parent_id` present means a reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    pub parent_id: Option<String>,
}

/// Repository trait - all comment database operations
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// All comments of one recipe with authors joined, top-level-first
    /// ordering handled here: newest first, id as tiebreak.
    async fn list_for_recipe(&self, recipe_id: &str)
        -> Result<Vec<CommentView>, RepositoryError>;

    /// Load one comment by id.
    async fn find(&self, id: &str) -> Result<Option<Comment>, RepositoryError>;

    /// Validate and insert a comment or reply, returning it with its author
    /// joined.
    async fn create(
        &self,
        recipe_id: &str,
        author_id: &str,
        new: NewComment,
    ) -> Result<CommentView, RepositoryError>;

    /// Delete a comment and its direct replies (one level of cascade).
    /// Returns the number of rows removed.
    async fn delete_with_replies(&self, id: &str) -> Result<u64, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteCommentRepository {
    pool: DbPool,
}

impl SqliteCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentView> {
    Ok(CommentView {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        author: Author {
            id: row.get(2)?,
            name: row.get(6)?,
            avatar: row.get(7)?,
        },
        content: row.get(3)?,
        parent_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const COMMENT_COLUMNS: &str =
    "c.id, c.recipe_id, c.author_id, c.content, c.parent_id, c.created_at, u.name, u.avatar";

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn list_for_recipe(
        &self,
        recipe_id: &str,
    ) -> Result<Vec<CommentView>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.recipe_id = ?1 ORDER BY c.created_at DESC, c.id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![recipe_id], row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn find(&self, id: &str) -> Result<Option<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        let comment = conn
            .query_row(
                "SELECT id, recipe_id, author_id, content, parent_id, created_at \
                 FROM comments WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Comment {
                        id: row.get(0)?,
                        recipe_id: row.get(1)?,
                        author_id: row.get(2)?,
                        content: row.get(3)?,
                        parent_id: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(comment)
    }

    async fn create(
        &self,
        recipe_id: &str,
        author_id: &str,
        new: NewComment,
    ) -> Result<CommentView, RepositoryError> {
        if new.content.trim().is_empty() {
            return Err(RepositoryError::Invalid("Empty content".to_string()));
        }

        let conn = self.pool.get()?;

        let recipe_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM recipes WHERE id = ?1",
            params![recipe_id],
            |row| row.get(0),
        )?;
        if !recipe_exists {
            return Err(RepositoryError::NotFound("Recipe not found".to_string()));
        }

        // A reply's parent must be a top-level comment under the same
        // recipe; the tree is two-level only.
        if let Some(ref parent_id) = new.parent_id {
            let parent: Option<(String, Option<String>)> = conn
                .query_row(
                    "SELECT recipe_id, parent_id FROM comments WHERE id = ?1",
                    params![parent_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match parent {
                None => {
                    return Err(RepositoryError::Invalid(
                        "Parent comment not found".to_string(),
                    ))
                }
                Some((parent_recipe, _)) if parent_recipe != recipe_id => {
                    return Err(RepositoryError::Invalid(
                        "Parent comment belongs to a different recipe".to_string(),
                    ))
                }
                Some((_, Some(_))) => {
                    return Err(RepositoryError::Invalid(
                        "Replies cannot be nested".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }

        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO comments (id, recipe_id, author_id, content, parent_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, recipe_id, author_id, new.content, new.parent_id],
        )?;

        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.id = ?1"
        );
        let view = conn.query_row(&sql, params![id], row_to_view)?;
        Ok(view)
    }

    async fn delete_with_replies(&self, id: &str) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<u64, RepositoryError> = (|| {
            let replies = conn.execute("DELETE FROM comments WHERE parent_id = ?1", params![id])?;
            let own = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
            Ok((replies + own) as u64)
        })();

        match result {
            Ok(deleted) => {
                conn.execute("COMMIT", [])?;
                Ok(deleted)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }
}
