use std::sync::Arc;

use axum::{
    Extension, Form, Json,
    extract::State,
    response::IntoResponse,
};
use tracing::error;

use quill_db::Database;
use quill_types::api::{LoginForm, LoginJsonRequest, SignupRequest};
use quill_types::models::User;

use crate::error::ApiError;
use crate::gateway::AuthGateway;
use crate::password::PasswordHasher;
use crate::posts::PostService;
use crate::samples::SampleFetcher;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub gateway: AuthGateway,
    pub posts: PostService,
    pub samples: SampleFetcher,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, tokens: TokenService, samples: SampleFetcher) -> AppState {
        Arc::new(Self {
            gateway: AuthGateway::new(db.clone(), PasswordHasher::new(), tokens),
            posts: PostService::new(db),
            samples,
        })
    }
}

/// Runs argon2 and SQLite work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let gateway = state.gateway.clone();
    let user =
        run_blocking(move || gateway.signup(&req.username, &req.email, &req.password)).await?;
    Ok(Json(user))
}

/// OAuth2 password form; the `username` field carries the email.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let gateway = state.gateway.clone();
    let response = run_blocking(move || gateway.login(&form.username, &form.password)).await?;
    Ok(Json(response))
}

pub async fn login_json(
    State(state): State<AppState>,
    Json(req): Json<LoginJsonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let gateway = state.gateway.clone();
    let response = run_blocking(move || gateway.login(&req.email, &req.password)).await?;
    Ok(Json(response))
}

pub async fn me(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(user.public())
}
