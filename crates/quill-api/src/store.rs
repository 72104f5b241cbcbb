//! Persistence seams used by the gateway and the post service, with their
//! SQLite implementations on [`quill_db::Database`].

use anyhow::Result;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use quill_db::Database;
use quill_db::models::{PostRow, UserRow};
use quill_types::models::{Post, User};

use crate::error::{ApiError, DuplicateField};

pub trait CredentialStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    fn find_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;

    /// Persists a new user. Email collisions are reported before username
    /// collisions.
    fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError>;
}

pub trait PostStore: Send + Sync {
    fn all_posts(&self) -> Result<Vec<PostRow>>;

    fn find_post(&self, id: &str) -> Result<Option<PostRow>>;

    fn save_post(&self, post: &Post) -> Result<()>;

    /// Overwrites title and body. False if the post is gone.
    fn replace_post(&self, post: &Post) -> Result<bool>;

    /// False if the post is gone.
    fn remove_post(&self, id: &str) -> Result<bool>;
}

impl CredentialStore for Database {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self.get_user_by_email(email)?.map(UserRow::into_user).transpose()?)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .get_user_by_username(username)?
            .map(UserRow::into_user)
            .transpose()?)
    }

    fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        if self.get_user_by_email(email)?.is_some() {
            return Err(ApiError::Duplicate(DuplicateField::Email));
        }
        if self.get_user_by_username(username)?.is_some() {
            return Err(ApiError::Duplicate(DuplicateField::Username));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        // The checks above are a fast path; the UNIQUE constraints decide
        // concurrent signups.
        self.create_user(
            &user.id.to_string(),
            &user.username,
            &user.email,
            &user.password_hash,
            &user.created_at.to_rfc3339(),
        )
        .map_err(|e| match quill_db::unique_violation(&e) {
            Some("users.email") => ApiError::Duplicate(DuplicateField::Email),
            Some("users.username") => ApiError::Duplicate(DuplicateField::Username),
            _ => ApiError::Internal(e),
        })?;

        info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }
}

impl PostStore for Database {
    fn all_posts(&self) -> Result<Vec<PostRow>> {
        self.list_posts()
    }

    fn find_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.get_post(id)
    }

    fn save_post(&self, post: &Post) -> Result<()> {
        self.insert_post(
            &post.id,
            &post.title,
            &post.body,
            &post.author,
            &Utc::now().to_rfc3339(),
        )
    }

    fn replace_post(&self, post: &Post) -> Result<bool> {
        self.update_post(&post.id, &post.title, &post.body)
    }

    fn remove_post(&self, id: &str) -> Result<bool> {
        self.delete_post(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_checks_email_before_username() {
        let db = Database::open_in_memory().unwrap();
        db.create("alice", "alice@example.com", "hash").unwrap();

        // Both collide: email wins.
        let err = db.create("alice", "alice@example.com", "hash").unwrap_err();
        assert!(matches!(err, ApiError::Duplicate(DuplicateField::Email)));

        let err = db.create("alice", "new@example.com", "hash").unwrap_err();
        assert!(matches!(err, ApiError::Duplicate(DuplicateField::Username)));

        let err = db.create("newname", "alice@example.com", "hash").unwrap_err();
        assert!(matches!(err, ApiError::Duplicate(DuplicateField::Email)));
    }

    #[test]
    fn created_user_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create("alice", "alice@example.com", "hash").unwrap();

        let found = db.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.username, "alice");
        assert_eq!(found.password_hash, "hash");

        let found = db.find_by_username("alice").unwrap().unwrap();
        assert_eq!(found.email, "alice@example.com");

        assert!(db.find_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn unique_constraint_catches_a_bypassed_check() {
        let db = Database::open_in_memory().unwrap();
        db.create("alice", "alice@example.com", "hash").unwrap();

        // A concurrent signup that passed its own duplicate check before the
        // first insert landed ends up here.
        let err = db
            .create_user("some-id", "alice2", "alice@example.com", "hash", "2025-03-01T10:00:00Z")
            .unwrap_err();
        assert_eq!(quill_db::unique_violation(&err), Some("users.email"));
    }
}
