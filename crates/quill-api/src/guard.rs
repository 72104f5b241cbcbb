use tracing::warn;

use quill_types::models::{Post, User};

use crate::error::ApiError;

/// Only a post's author may change it. Exact, case-sensitive username match.
pub fn authorize(acting: &User, post: &Post) -> Result<(), ApiError> {
    if post.author == acting.username {
        return Ok(());
    }

    warn!(
        "User {} tried to modify post {} owned by {}",
        acting.username, post.id, post.author
    );
    Err(ApiError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn post_by(author: &str) -> Post {
        Post {
            id: "p1".into(),
            title: "t".into(),
            body: "b".into(),
            author: author.into(),
        }
    }

    #[test]
    fn author_is_allowed() {
        assert!(authorize(&user("alice"), &post_by("alice")).is_ok());
    }

    #[test]
    fn anyone_else_is_forbidden() {
        assert!(matches!(
            authorize(&user("bob"), &post_by("alice")),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn match_is_case_sensitive() {
        assert!(matches!(
            authorize(&user("Alice"), &post_by("alice")),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            authorize(&user("alice "), &post_by("alice")),
            Err(ApiError::Forbidden)
        ));
    }
}
