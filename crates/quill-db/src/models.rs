//! Database row types. These map directly to SQLite rows and stay distinct
//! from the quill-types models so the storage layer can carry data the
//! API would reject.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use quill_types::models::{Post, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        let id = Uuid::parse_str(&self.id)
            .with_context(|| format!("Corrupt user id '{}'", self.id))?;
        Ok(User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("Corrupt created_at on user '{}'", self.id))?,
        })
    }
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub body: String,
    /// `None` when the stored value is not text (legacy or hand-edited rows).
    pub author: Option<String>,
    pub created_at: String,
}

impl PostRow {
    /// Returns `None` for rows without a textual author.
    pub fn into_post(self) -> Option<Post> {
        Some(Post {
            author: self.author?,
            id: self.id,
            title: self.title,
            body: self.body,
        })
    }
}

/// Accepts RFC 3339 as written by this crate, and SQLite's
/// `datetime('now')` format as produced by column defaults.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Unparseable timestamp '{}'", raw))
}
