use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub location: String,
    pub avatar: String,
    pub settings: UserSettings,
    pub created_at: String,
    pub updated_at: String,
}

/// Privacy and display preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub show_email: bool,
    pub show_bio: bool,
    pub show_location: bool,
    pub profile_privacy: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            show_email: false,
            show_bio: true,
            show_location: true,
            profile_privacy: "public".to_string(),
        }
    }
}

/// Compact author reference joined into recipe and comment responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

/// A single user's star rating, embedded in the recipe document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: String,
    pub value: i64,
}

/// Recipe document. The likes/bookmarks sets and the ratings list are
/// embedded: they live and die with the recipe row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: String,
    pub image: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub author_id: String,
    pub likes: Vec<String>,
    pub bookmarks: Vec<String>,
    pub ratings: Vec<Rating>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub recipe_id: String,
    pub author_id: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
}
