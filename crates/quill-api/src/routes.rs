use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::posts;

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/login-json", post(auth::login_json));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{post_id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Quill blog API is running" }))
}
