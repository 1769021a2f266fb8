// Threading domain - flat comment list to two-level tree, plus the
// deletion rules. Pure, no storage access.
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::db::models::{Author, Comment};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadingError {
    #[error("Only the comment author or the recipe author may delete a comment")]
    NotAllowed,
}

/// One comment with its author joined in, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub recipe_id: String,
    pub author: Author,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
}

/// A top-level comment with its attached replies.
#[derive(Debug, PartialEq, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentView,
    pub replies: Vec<CommentView>,
}

/// Assemble the two-level tree from all comments of one recipe.
///
/// Callers pass top-level comments newest-first; that order is preserved in
/// the output roots. Replies are re-sorted oldest-first (creation timestamp,
/// then id - ids are UUID v7, so the tiebreak keeps insertion order within
/// a second). A comment whose parent is not a top-level comment in the set
/// is dropped: the write path rejects reply-to-reply, so such rows only
/// exist in corrupted data.
pub fn build_tree(flat: Vec<CommentView>) -> Vec<CommentThread> {
    let mut top_level: Vec<CommentView> = Vec::new();
    let mut children: HashMap<String, Vec<CommentView>> = HashMap::new();

    for comment in flat {
        match comment.parent_id.clone() {
            None => top_level.push(comment),
            Some(parent) => children.entry(parent).or_default().push(comment),
        }
    }

    top_level
        .into_iter()
        .map(|comment| {
            let mut replies = children.remove(&comment.id).unwrap_or_default();
            replies.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            CommentThread { comment, replies }
        })
        .collect()
}

/// Deletion is allowed for the comment's author and for the author of the
/// recipe the comment sits under.
pub fn authorize_delete(
    comment: &Comment,
    recipe_author_id: &str,
    caller_id: &str,
) -> Result<(), ThreadingError> {
    if comment.author_id == caller_id || recipe_author_id == caller_id {
        Ok(())
    } else {
        Err(ThreadingError::NotAllowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: &str, parent: Option<&str>, created_at: &str) -> CommentView {
        CommentView {
            id: id.to_string(),
            recipe_id: "r1".to_string(),
            author: Author {
                id: "u1".to_string(),
                name: "Alice".to_string(),
                avatar: String::new(),
            },
            content: format!("comment {}", id),
            parent_id: parent.map(|p| p.to_string()),
            created_at: created_at.to_string(),
        }
    }

    fn comment(author_id: &str) -> Comment {
        Comment {
            id: "c1".to_string(),
            recipe_id: "r1".to_string(),
            author_id: author_id.to_string(),
            content: "hello".to_string(),
            parent_id: None,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn empty_input_yields_empty_tree() {
        assert_eq!(build_tree(vec![]), vec![]);
    }

    #[test]
    fn partitions_top_level_and_replies_and_drops_orphans() {
        let flat = vec![
            view("1", None, "2024-01-02 00:00:00"),
            view("2", None, "2024-01-01 00:00:00"),
            view("3", Some("1"), "2024-01-03 00:00:00"),
            view("4", Some("99"), "2024-01-03 00:00:00"),
        ];

        let tree = build_tree(flat);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, "1");
        assert_eq!(tree[1].comment.id, "2");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].id, "3");
        assert!(tree[1].replies.is_empty());

        // The orphan (parent 99) appears nowhere
        let all_ids: Vec<&str> = tree
            .iter()
            .flat_map(|t| {
                std::iter::once(t.comment.id.as_str())
                    .chain(t.replies.iter().map(|r| r.id.as_str()))
            })
            .collect();
        assert!(!all_ids.contains(&"4"));
    }

    #[test]
    fn preserves_top_level_input_order() {
        // Callers sort newest-first; the tree must not reorder roots
        let flat = vec![
            view("b", None, "2024-01-03 00:00:00"),
            view("a", None, "2024-01-02 00:00:00"),
            view("c", None, "2024-01-01 00:00:00"),
        ];
        let tree = build_tree(flat);
        let order: Vec<&str> = tree.iter().map(|t| t.comment.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn replies_sorted_oldest_first() {
        let flat = vec![
            view("1", None, "2024-01-01 00:00:00"),
            view("3", Some("1"), "2024-01-03 00:00:00"),
            view("2", Some("1"), "2024-01-02 00:00:00"),
        ];
        let tree = build_tree(flat);
        let order: Vec<&str> = tree[0].replies.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["2", "3"]);
    }

    #[test]
    fn reply_timestamp_ties_break_on_id() {
        let flat = vec![
            view("1", None, "2024-01-01 00:00:00"),
            view("z", Some("1"), "2024-01-02 00:00:00"),
            view("a", Some("1"), "2024-01-02 00:00:00"),
        ];
        let tree = build_tree(flat);
        let order: Vec<&str> = tree[0].replies.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["a", "z"]);
    }

    #[test]
    fn multiple_threads_attach_their_own_replies() {
        let flat = vec![
            view("1", None, "2024-01-05 00:00:00"),
            view("2", None, "2024-01-04 00:00:00"),
            view("r1", Some("1"), "2024-01-06 00:00:00"),
            view("r2", Some("2"), "2024-01-06 00:00:00"),
            view("r3", Some("2"), "2024-01-07 00:00:00"),
        ];
        let tree = build_tree(flat);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[1].replies.len(), 2);
    }

    #[test]
    fn delete_allowed_for_comment_author() {
        let c = comment("commenter");
        assert!(authorize_delete(&c, "recipe-owner", "commenter").is_ok());
    }

    #[test]
    fn delete_allowed_for_recipe_author() {
        let c = comment("commenter");
        assert!(authorize_delete(&c, "recipe-owner", "recipe-owner").is_ok());
    }

    #[test]
    fn delete_rejected_for_third_party() {
        let c = comment("commenter");
        assert_eq!(
            authorize_delete(&c, "recipe-owner", "bystander"),
            Err(ThreadingError::NotAllowed)
        );
    }
}
