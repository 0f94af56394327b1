//! In-memory stand-in for the remote API the client pipeline talks to.
//!
//! Serves JSONPlaceholder-style posts plus a few endpoints that exercise the
//! client's edge cases: bearer and OTP protected routes, a flaky route that
//! fails a configurable number of times, a JSON echo and a multipart upload.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Token accepted by the bearer-protected routes.
pub const VALID_TOKEN: &str = "test-token";
/// OTP accepted by the OTP-protected route.
pub const VALID_OTP: &str = "123456";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: u32,
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub user_id: u32,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePost {
    pub user_id: Option<u32>,
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPosts {
    pub user_id: Option<u32>,
}

#[derive(Deserialize)]
pub struct Flaky {
    #[serde(default)]
    pub failures: u32,
    #[serde(default = "default_flaky_status")]
    pub status: u16,
}

fn default_flaky_status() -> u16 {
    503
}

#[derive(Clone, Default)]
pub struct AppState {
    posts: Arc<RwLock<HashMap<Uuid, Post>>>,
    hits: Arc<RwLock<HashMap<String, u32>>>,
}

pub fn app() -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(replace_post).patch(update_post).delete(delete_post),
        )
        .route("/me", get(me))
        .route("/otp/verify", post(verify_otp))
        .route("/flaky/{key}", get(flaky))
        .route("/echo", post(echo).put(echo).patch(echo))
        .route("/query", get(query))
        .route("/upload", post(upload))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_posts(State(state): State<AppState>, Query(filter): Query<ListPosts>) -> Json<Vec<Post>> {
    let posts = state.posts.read().await;
    let mut matching: Vec<Post> = posts
        .values()
        .filter(|p| filter.user_id.map_or(true, |user_id| p.user_id == user_id))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.title.cmp(&b.title));
    Json(matching)
}

async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<CreatePost>,
) -> (StatusCode, Json<Post>) {
    let post = Post {
        id: Uuid::new_v4(),
        user_id: input.user_id,
        title: input.title,
        body: input.body,
    };
    state.posts.write().await.insert(post.id, post.clone());
    (StatusCode::CREATED, Json(post))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, StatusCode> {
    let posts = state.posts.read().await;
    posts.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreatePost>,
) -> Result<Json<Post>, StatusCode> {
    let mut posts = state.posts.write().await;
    let post = posts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    post.user_id = input.user_id;
    post.title = input.title;
    post.body = input.body;
    Ok(Json(post.clone()))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePost>,
) -> Result<Json<Post>, StatusCode> {
    let mut posts = state.posts.write().await;
    let post = posts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(user_id) = input.user_id {
        post.user_id = user_id;
    }
    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(body) = input.body {
        post.body = body;
    }
    Ok(Json(post.clone()))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut posts = state.posts.write().await;
    posts.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

async fn me(headers: HeaderMap) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match header(&headers, "authorization").and_then(|v| v.strip_prefix("Bearer ")) {
        Some(VALID_TOKEN) => Ok(Json(json!({ "id": 1, "name": "Leanne Graham" }))),
        Some(_) => Err(unauthorized("invalid token")),
        None => Err(unauthorized("missing token")),
    }
}

async fn verify_otp(headers: HeaderMap) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match header(&headers, "otp-token") {
        Some(VALID_OTP) => Ok(Json(json!({ "verified": true }))),
        Some(_) => Err(unauthorized("invalid otp")),
        None => Err(unauthorized("missing otp")),
    }
}

/// Fails with `status` for the first `failures` hits on `key`, then succeeds.
async fn flaky(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<Flaky>,
) -> (StatusCode, Json<Value>) {
    let hit = {
        let mut hits = state.hits.write().await;
        let count = hits.entry(key).or_insert(0);
        *count += 1;
        *count
    };
    if hit <= params.failures {
        let status = StatusCode::from_u16(params.status).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        return (status, Json(json!({ "attempt": hit })));
    }
    (StatusCode::OK, Json(json!({ "attempt": hit })))
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn query(Query(params): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(params)
}

async fn upload(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        fields.push(json!({
            "name": name,
            "fileName": file_name,
            "contentType": content_type,
            "size": bytes.len(),
        }));
    }
    Ok(Json(json!({ "fields": fields })))
}
