//! Placeholder content for an empty blog, pulled from a public JSON API.

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

use quill_types::models::Post;

pub const DEFAULT_SAMPLE_POSTS_URL: &str = "https://jsonplaceholder.typicode.com/posts";

/// Author recorded on every synthesized post.
pub const SAMPLE_AUTHOR: &str = "sample_user";

const SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct SamplePost {
    id: serde_json::Value,
    title: String,
    body: String,
}

/// Upstream ids are usually integers but any JSON scalar is accepted.
fn sample_id(id: serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct SampleFetcher {
    client: reqwest::Client,
    url: Option<String>,
}

impl SampleFetcher {
    pub fn new(url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client, url })
    }

    /// A fetcher that always yields nothing.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
        }
    }

    /// Up to ten sample posts. Never fails: any error yields an empty list.
    pub async fn fetch(&self) -> Vec<Post> {
        let Some(url) = &self.url else {
            return Vec::new();
        };

        match self.try_fetch(url).await {
            Ok(posts) => {
                info!("Serving {} sample posts from {}", posts.len(), url);
                posts
            }
            Err(e) => {
                warn!("Failed to fetch sample posts from {}: {:#}", url, e);
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<Post>> {
        let samples: Vec<SamplePost> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(samples
            .into_iter()
            .take(SAMPLE_LIMIT)
            .map(|s| Post {
                id: sample_id(s.id),
                title: s.title,
                body: s.body,
                author: SAMPLE_AUTHOR.to_string(),
            })
            .collect())
    }
}
