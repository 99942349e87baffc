/// User endpoints: profile, bookmarks
use crate::{
    api::middleware,
    context::AppContext,
    error::AppResult,
    posts::Post,
    users::User,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/user/:user_id/profile", put(update_profile))
        .route("/user/:user_id/bookmarked", get(bookmarked_posts))
        .route(
            "/user/:user_id/:post_id/bookmark",
            axum::routing::post(add_bookmark).delete(remove_bookmark),
        )
}

#[derive(Debug, Deserialize)]
struct ProfileUpdateRequest {
    bio: Option<String>,
    occupation: Option<String>,
}

/// Update bio and occupation
async fn update_profile(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ProfileUpdateRequest>,
) -> AppResult<Json<User>> {
    let caller = middleware::require_auth(&ctx, &headers).await?;
    middleware::require_self_or_admin(&caller, &user_id)?;

    let user = ctx
        .users
        .update_profile(&user_id, req.bio, req.occupation)
        .await?;

    Ok(Json(user))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Add a bookmark; duplicates are a no-op
async fn add_bookmark(
    State(ctx): State<AppContext>,
    Path((user_id, post_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> AppResult<Json<MessageResponse>> {
    let caller = middleware::require_auth(&ctx, &headers).await?;
    middleware::require_self_or_admin(&caller, &user_id)?;

    // Refuse bookmarks pointing at posts that do not exist
    ctx.posts.get(&post_id).await?;

    ctx.users.add_bookmark(&user_id, &post_id).await?;

    Ok(Json(MessageResponse {
        message: "Bookmark added".to_string(),
    }))
}

/// Remove a bookmark; absent is a no-op
async fn remove_bookmark(
    State(ctx): State<AppContext>,
    Path((user_id, post_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> AppResult<Json<MessageResponse>> {
    let caller = middleware::require_auth(&ctx, &headers).await?;
    middleware::require_self_or_admin(&caller, &user_id)?;

    ctx.users.remove_bookmark(&user_id, &post_id).await?;

    Ok(Json(MessageResponse {
        message: "Bookmark removed".to_string(),
    }))
}

/// List bookmarked posts, expanded into full post documents
///
/// Bookmark order is preserved; ids whose post has since been deleted are
/// skipped rather than surfaced as errors.
async fn bookmarked_posts(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Post>>> {
    let caller = middleware::require_auth(&ctx, &headers).await?;
    middleware::require_self_or_admin(&caller, &user_id)?;

    let user = ctx.users.get(&user_id).await?;
    let posts = ctx.posts.by_ids(&user.bookmarked_posts).await?;

    Ok(Json(posts))
}
