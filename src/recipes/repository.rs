// Repository pattern - isolates all recipe database side effects
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::models::{Author, Rating, Recipe};
use crate::db::RepositoryError;
use crate::recipes::engagement;
use crate::recipes::engagement::RatingSummary;
use crate::state::DbPool;

/// Recipe plus its author's display fields, joined for responses.
#[derive(Debug, Clone)]
pub struct RecipeWithAuthor {
    pub recipe: Recipe,
    pub author: Author,
}

/// Payload for recipe creation. The author always comes from the session,
/// never from the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub servings: Option<i64>,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    pub image: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

fn default_category() -> String {
    "main-course".to_string()
}

fn default_difficulty() -> String {
    "medium".to_string()
}

/// Optional list filters; `category` of "all" means no category filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Outcome of a like toggle.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: usize,
}

/// Repository trait - all recipe database operations
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert a recipe and return it with its author joined.
    async fn create(
        &self,
        author_id: &str,
        new: NewRecipe,
    ) -> Result<RecipeWithAuthor, RepositoryError>;

    /// Load one recipe by id.
    async fn find(&self, id: &str) -> Result<Option<RecipeWithAuthor>, RepositoryError>;

    /// List recipes, newest first, with optional category/search filters.
    async fn list(&self, filter: &RecipeFilter) -> Result<Vec<RecipeWithAuthor>, RepositoryError>;

    /// List recipes by one author, newest first.
    async fn by_author(&self, author_id: &str) -> Result<Vec<RecipeWithAuthor>, RepositoryError>;

    /// List recipes bookmarked by a user, newest first.
    async fn bookmarked_by(&self, user_id: &str)
        -> Result<Vec<RecipeWithAuthor>, RepositoryError>;

    /// Delete a recipe and every comment attached to it. Returns whether the
    /// recipe existed. Authorization is the caller's job.
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Toggle the caller's membership of the likes set.
    async fn toggle_like(&self, id: &str, user_id: &str)
        -> Result<LikeOutcome, RepositoryError>;

    /// Toggle the caller's membership of the bookmarks set. Returns the new
    /// membership.
    async fn toggle_bookmark(&self, id: &str, user_id: &str) -> Result<bool, RepositoryError>;

    /// Upsert the caller's rating and report the new average/count.
    async fn rate(
        &self,
        id: &str,
        user_id: &str,
        value: i64,
    ) -> Result<RatingSummary, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteRecipeRepository {
    pool: DbPool,
}

impl SqliteRecipeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const RECIPE_COLUMNS: &str = "r.id, r.title, r.description, r.category, r.prep_time, r.cook_time, \
     r.servings, r.difficulty, r.image, r.ingredients, r.instructions, r.author_id, \
     r.likes, r.bookmarks, r.ratings, r.created_at, r.updated_at, u.name, u.avatar";

fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_recipe(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeWithAuthor> {
    let author_id: String = row.get(11)?;
    Ok(RecipeWithAuthor {
        recipe: Recipe {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            prep_time: row.get(4)?,
            cook_time: row.get(5)?,
            servings: row.get(6)?,
            difficulty: row.get(7)?,
            image: row.get(8)?,
            ingredients: json_column(row, 9)?,
            instructions: json_column(row, 10)?,
            author_id: author_id.clone(),
            likes: json_column(row, 12)?,
            bookmarks: json_column(row, 13)?,
            ratings: json_column(row, 14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        },
        author: Author {
            id: author_id,
            name: row.get(17)?,
            avatar: row.get(18)?,
        },
    })
}

impl SqliteRecipeRepository {
    fn select_many(
        &self,
        where_clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RecipeWithAuthor>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r JOIN users u ON u.id = r.author_id \
             WHERE {where_clause} ORDER BY r.created_at DESC, r.id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params, row_to_recipe)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Run a read-modify-write of one recipe's engagement columns inside a
    /// single transaction, so concurrent writers serialize instead of
    /// overwriting each other's sibling mutations.
    fn mutate_engagement<T>(
        &self,
        id: &str,
        apply: impl FnOnce(&mut Vec<String>, &mut Vec<String>, &mut Vec<Rating>) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<T, RepositoryError> = (|| {
            let (likes_json, bookmarks_json, ratings_json): (String, String, String) = conn
                .query_row(
                    "SELECT likes, bookmarks, ratings FROM recipes WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?
                .ok_or_else(|| RepositoryError::NotFound("Recipe not found".to_string()))?;

            let mut likes: Vec<String> = serde_json::from_str(&likes_json)?;
            let mut bookmarks: Vec<String> = serde_json::from_str(&bookmarks_json)?;
            let mut ratings: Vec<Rating> = serde_json::from_str(&ratings_json)?;

            let outcome = apply(&mut likes, &mut bookmarks, &mut ratings)?;

            conn.execute(
                "UPDATE recipes SET likes = ?1, bookmarks = ?2, ratings = ?3, \
                 updated_at = datetime('now') WHERE id = ?4",
                params![
                    serde_json::to_string(&likes)?,
                    serde_json::to_string(&bookmarks)?,
                    serde_json::to_string(&ratings)?,
                    id
                ],
            )?;

            Ok(outcome)
        })();

        match result {
            Ok(outcome) => {
                conn.execute("COMMIT", [])?;
                Ok(outcome)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RecipeRepository for SqliteRecipeRepository {
    async fn create(
        &self,
        author_id: &str,
        new: NewRecipe,
    ) -> Result<RecipeWithAuthor, RepositoryError> {
        let id = uuid::Uuid::now_v7().to_string();

        {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO recipes (id, title, description, category, prep_time, cook_time, \
                 servings, difficulty, image, ingredients, instructions, author_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    id,
                    new.title,
                    new.description,
                    new.category,
                    new.prep_time,
                    new.cook_time,
                    new.servings,
                    new.difficulty,
                    new.image,
                    serde_json::to_string(&new.ingredients)?,
                    serde_json::to_string(&new.instructions)?,
                    author_id
                ],
            )?;
        }

        self.find(&id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Recipe not found".to_string()))
    }

    async fn find(&self, id: &str) -> Result<Option<RecipeWithAuthor>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r JOIN users u ON u.id = r.author_id \
             WHERE r.id = ?1"
        );
        let recipe = conn
            .query_row(&sql, params![id], row_to_recipe)
            .optional()?;
        Ok(recipe)
    }

    async fn list(&self, filter: &RecipeFilter) -> Result<Vec<RecipeWithAuthor>, RepositoryError> {
        let category = filter
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "all")
            .map(str::to_string);
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        self.select_many(
            "(?1 IS NULL OR r.category = ?1) \
             AND (?2 IS NULL OR lower(r.title) LIKE ?2 OR lower(r.description) LIKE ?2 \
                  OR lower(r.ingredients) LIKE ?2)",
            params![category, search],
        )
    }

    async fn by_author(&self, author_id: &str) -> Result<Vec<RecipeWithAuthor>, RepositoryError> {
        self.select_many("r.author_id = ?1", params![author_id])
    }

    async fn bookmarked_by(
        &self,
        user_id: &str,
    ) -> Result<Vec<RecipeWithAuthor>, RepositoryError> {
        // The bookmarks set is a JSON array column; json_each unpacks it for
        // an exact membership test.
        self.select_many(
            "EXISTS (SELECT 1 FROM json_each(r.bookmarks) WHERE json_each.value = ?1)",
            params![user_id],
        )
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<bool, RepositoryError> = (|| {
            conn.execute("DELETE FROM comments WHERE recipe_id = ?1", params![id])?;
            let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
            Ok(rows > 0)
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

    async fn toggle_like(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<LikeOutcome, RepositoryError> {
        self.mutate_engagement(id, |likes, _bookmarks, _ratings| {
            let liked = engagement::toggle(likes, user_id);
            Ok(LikeOutcome {
                liked,
                likes_count: likes.len(),
            })
        })
    }

    async fn toggle_bookmark(&self, id: &str, user_id: &str) -> Result<bool, RepositoryError> {
        self.mutate_engagement(id, |_likes, bookmarks, _ratings| {
            Ok(engagement::toggle(bookmarks, user_id))
        })
    }

    async fn rate(
        &self,
        id: &str,
        user_id: &str,
        value: i64,
    ) -> Result<RatingSummary, RepositoryError> {
        self.mutate_engagement(id, |_likes, _bookmarks, ratings| {
            engagement::upsert_rating(ratings, user_id, value)
                .map_err(|e| RepositoryError::Invalid(e.to_string()))
        })
    }
}
