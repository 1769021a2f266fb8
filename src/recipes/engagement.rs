// Engagement domain - pure projections and mutations over the recipe's
// embedded likes/bookmarks/ratings, no storage access.
use serde::Serialize;
use thiserror::Error;

use crate::db::models::{Rating, Recipe};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngagementError {
    #[error("Rating must be 1-5")]
    RatingOutOfRange(i64),
}

/// Caller-dependent derived fields attached to every recipe response.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub average_rating: f64,
    pub review_count: usize,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    pub my_rating: Option<i64>,
}

/// Average and count reported back after a rating upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub avg: f64,
    pub count: usize,
}

fn average(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| r.value).sum();
    sum as f64 / ratings.len() as f64
}

/// Compute the derived view fields for a recipe, for an optional caller.
/// Every code path that returns recipes goes through here so list, single
/// fetch and the per-user collections agree on the semantics.
pub fn annotate(recipe: &Recipe, caller: Option<&str>) -> Engagement {
    Engagement {
        average_rating: average(&recipe.ratings),
        review_count: recipe.ratings.len(),
        is_liked: caller.is_some_and(|uid| recipe.likes.iter().any(|u| u == uid)),
        is_bookmarked: caller.is_some_and(|uid| recipe.bookmarks.iter().any(|u| u == uid)),
        my_rating: caller.and_then(|uid| {
            recipe
                .ratings
                .iter()
                .find(|r| r.user == uid)
                .map(|r| r.value)
        }),
    }
}

/// Toggle membership of `user_id` in a likes or bookmarks set.
/// Returns the new membership.
pub fn toggle(set: &mut Vec<String>, user_id: &str) -> bool {
    match set.iter().position(|u| u == user_id) {
        Some(idx) => {
            set.remove(idx);
            false
        }
        None => {
            set.push(user_id.to_string());
            true
        }
    }
}

/// Replace the caller's rating entry if one exists, append otherwise.
/// The returned summary is computed from the mutated in-memory list, not
/// re-read from storage.
pub fn upsert_rating(
    ratings: &mut Vec<Rating>,
    user_id: &str,
    value: i64,
) -> Result<RatingSummary, EngagementError> {
    if !(1..=5).contains(&value) {
        return Err(EngagementError::RatingOutOfRange(value));
    }

    match ratings.iter_mut().find(|r| r.user == user_id) {
        Some(existing) => existing.value = value,
        None => ratings.push(Rating {
            user: user_id.to_string(),
            value,
        }),
    }

    Ok(RatingSummary {
        avg: average(ratings),
        count: ratings.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe_with(likes: &[&str], bookmarks: &[&str], ratings: &[(&str, i64)]) -> Recipe {
        Recipe {
            id: "r1".to_string(),
            title: "Toast".to_string(),
            description: "Bread, but warm".to_string(),
            category: "breakfast".to_string(),
            prep_time: Some(2),
            cook_time: Some(3),
            servings: Some(1),
            difficulty: "easy".to_string(),
            image: None,
            ingredients: vec!["bread".to_string()],
            instructions: vec!["toast it".to_string()],
            author_id: "author".to_string(),
            likes: likes.iter().map(|s| s.to_string()).collect(),
            bookmarks: bookmarks.iter().map(|s| s.to_string()).collect(),
            ratings: ratings
                .iter()
                .map(|(user, value)| Rating {
                    user: user.to_string(),
                    value: *value,
                })
                .collect(),
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn empty_ratings_average_to_zero() {
        let recipe = recipe_with(&[], &[], &[]);
        let view = annotate(&recipe, None);
        assert_eq!(view.average_rating, 0.0);
        assert_eq!(view.review_count, 0);
    }

    #[test]
    fn average_is_arithmetic_mean() {
        let recipe = recipe_with(&[], &[], &[("a", 3), ("b", 5)]);
        let view = annotate(&recipe, None);
        assert_eq!(view.average_rating, 4.0);
        assert_eq!(view.review_count, 2);
    }

    #[test]
    fn membership_flags_follow_caller() {
        let recipe = recipe_with(&["a"], &["b"], &[]);

        let for_a = annotate(&recipe, Some("a"));
        assert!(for_a.is_liked);
        assert!(!for_a.is_bookmarked);

        let for_b = annotate(&recipe, Some("b"));
        assert!(!for_b.is_liked);
        assert!(for_b.is_bookmarked);
    }

    #[test]
    fn anonymous_caller_gets_no_membership_or_rating() {
        let recipe = recipe_with(&["a"], &["a"], &[("a", 5)]);
        let view = annotate(&recipe, None);
        assert!(!view.is_liked);
        assert!(!view.is_bookmarked);
        assert_eq!(view.my_rating, None);
    }

    #[test]
    fn my_rating_matches_caller_entry() {
        let recipe = recipe_with(&[], &[], &[("a", 3), ("b", 5)]);
        assert_eq!(annotate(&recipe, Some("a")).my_rating, Some(3));
        assert_eq!(annotate(&recipe, Some("b")).my_rating, Some(5));
        // Caller with no rating entry
        let for_c = annotate(&recipe, Some("c"));
        assert_eq!(for_c.my_rating, None);
        assert!(!for_c.is_liked);
    }

    #[test]
    fn toggle_twice_restores_original_set() {
        let mut likes = vec!["a".to_string()];

        assert!(toggle(&mut likes, "b"));
        assert_eq!(likes.len(), 2);

        assert!(!toggle(&mut likes, "b"));
        assert_eq!(likes, vec!["a".to_string()]);
    }

    #[test]
    fn toggle_removes_existing_member() {
        let mut likes = vec!["a".to_string(), "b".to_string()];
        assert!(!toggle(&mut likes, "a"));
        assert_eq!(likes, vec!["b".to_string()]);
    }

    #[test]
    fn upsert_appends_for_new_user() {
        let mut ratings = vec![];
        let summary = upsert_rating(&mut ratings, "a", 4).unwrap();
        assert_eq!(summary, RatingSummary { avg: 4.0, count: 1 });
        assert_eq!(ratings, vec![Rating { user: "a".to_string(), value: 4 }]);
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let mut ratings = vec![];
        upsert_rating(&mut ratings, "a", 2).unwrap();
        let summary = upsert_rating(&mut ratings, "a", 5).unwrap();

        // One entry, second value, count unchanged
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].value, 5);
        assert_eq!(summary, RatingSummary { avg: 5.0, count: 1 });
    }

    #[test]
    fn upsert_rejects_out_of_range_values() {
        let mut ratings = vec![Rating {
            user: "a".to_string(),
            value: 3,
        }];
        let before = ratings.clone();

        assert_eq!(
            upsert_rating(&mut ratings, "b", 0),
            Err(EngagementError::RatingOutOfRange(0))
        );
        assert_eq!(
            upsert_rating(&mut ratings, "b", 6),
            Err(EngagementError::RatingOutOfRange(6))
        );

        // No mutation on failure
        assert_eq!(ratings, before);
    }

    #[test]
    fn upsert_keeps_other_users_entries() {
        let mut ratings = vec![
            Rating {
                user: "a".to_string(),
                value: 3,
            },
            Rating {
                user: "b".to_string(),
                value: 5,
            },
        ];
        let summary = upsert_rating(&mut ratings, "a", 1).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.avg, 3.0);
        assert_eq!(ratings[1].value, 5);
    }
}
