use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use quill_types::api::{CreatePostRequest, MessageResponse, UpdatePostRequest};
use quill_types::models::{Post, User};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;
use crate::guard;
use crate::store::PostStore;

/// Post CRUD with ownership enforcement. Mutations check existence first,
/// then authorship.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    /// Every readable post. Rows whose stored author is not text are left out.
    pub fn list(&self) -> Result<Vec<Post>, ApiError> {
        let posts = self
            .store
            .all_posts()?
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                let post = row.into_post();
                if post.is_none() {
                    warn!("Skipping post {} with a non-text author", id);
                }
                post
            })
            .collect();
        Ok(posts)
    }

    pub fn get(&self, id: &str) -> Result<Post, ApiError> {
        self.store
            .find_post(id)?
            .and_then(|row| row.into_post())
            .ok_or(ApiError::NotFound)
    }

    pub fn create(&self, author: &User, req: CreatePostRequest) -> Result<Post, ApiError> {
        require_title(&req.title)?;

        let post = Post {
            id: Uuid::new_v4().to_string(),
            title: req.title,
            body: req.body,
            author: author.username.clone(),
        };
        self.store.save_post(&post)?;

        info!("User {} created post {}", author.username, post.id);
        Ok(post)
    }

    pub fn update(
        &self,
        id: &str,
        patch: UpdatePostRequest,
        actor: &User,
    ) -> Result<Post, ApiError> {
        let mut post = self.get(id)?;
        guard::authorize(actor, &post)?;

        if let Some(title) = patch.title {
            require_title(&title)?;
            post.title = title;
        }
        if let Some(body) = patch.body {
            post.body = body;
        }

        if !self.store.replace_post(&post)? {
            // Deleted between the read and the write.
            return Err(ApiError::NotFound);
        }

        info!("User {} updated post {}", actor.username, post.id);
        Ok(post)
    }

    pub fn delete(&self, id: &str, actor: &User) -> Result<(), ApiError> {
        let post = self.get(id)?;
        guard::authorize(actor, &post)?;

        if !self.store.remove_post(&post.id)? {
            return Err(ApiError::NotFound);
        }

        info!("User {} deleted post {}", actor.username, post.id);
        Ok(())
    }
}

fn require_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    Ok(())
}

// -- Handlers --

/// GET /posts. Falls back to sample content while the blog is empty.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.posts.clone();
    let mut posts = run_blocking(move || service.list()).await?;

    if posts.is_empty() {
        posts = state.samples.fetch().await;
    }

    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.posts.clone();
    let post = run_blocking(move || service.create(&user, req)).await?;
    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(user): Extension<User>,
    Json(patch): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.posts.clone();
    let post = run_blocking(move || service.update(&post_id, patch, &user)).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.posts.clone();
    run_blocking(move || service.delete(&post_id, &user)).await?;
    Ok(Json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}
