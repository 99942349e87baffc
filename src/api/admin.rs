/// Admin moderation endpoints
use crate::{
    api::middleware,
    blob_store::BlobMetadata,
    context::AppContext,
    error::AppResult,
    posts::{Page, PagedPosts, SearchFilter},
    users::{PagedUsers, Role, User},
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;

/// Build admin routes; every handler requires an admin caller
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:user_id/role", patch(set_role))
        .route("/admin/users/:user_id/ban", post(ban_user))
        .route("/admin/users/:user_id/unban", post(unban_user))
        .route("/admin/users/:user_id/uploads", get(user_uploads))
        .route("/admin/reported-posts", get(reported_posts))
}

/// Paginated user listing for the moderation table
async fn list_users(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(page): Query<Page>,
) -> AppResult<Json<PagedUsers>> {
    middleware::require_admin(&ctx, &headers).await?;

    Ok(Json(ctx.users.list(page).await?))
}

#[derive(Debug, Deserialize)]
struct SetRoleRequest {
    role: String,
}

/// Set an account's role
///
/// Setting banned forces the ban flag on; any other role clears it.
async fn set_role(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<User>> {
    let admin = middleware::require_admin(&ctx, &headers).await?;

    let role = Role::from_str(&req.role)?;
    let user = ctx.users.set_role(&user_id, role).await?;

    tracing::info!(admin = %admin.id, user_id = %user_id, role = role.as_str(), "admin set role");

    Ok(Json(user))
}

/// Ban an account; admin accounts are rejected
async fn ban_user(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<User>> {
    let admin = middleware::require_admin(&ctx, &headers).await?;

    let user = ctx.users.ban(&user_id).await?;

    tracing::info!(admin = %admin.id, user_id = %user_id, "admin banned user");

    Ok(Json(user))
}

/// Lift a ban
async fn unban_user(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<User>> {
    let admin = middleware::require_admin(&ctx, &headers).await?;

    let user = ctx.users.unban(&user_id).await?;

    tracing::info!(admin = %admin.id, user_id = %user_id, "admin unbanned user");

    Ok(Json(user))
}

/// Blobs uploaded by one account, newest first (moderation/debug view)
async fn user_uploads(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<BlobMetadata>>> {
    middleware::require_admin(&ctx, &headers).await?;

    Ok(Json(ctx.blob_store.list_for_uploader(&user_id, 100).await?))
}

/// Paginated, search-filtered listing of posts with at least one report
async fn reported_posts(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(mut params): Query<HashMap<String, String>>,
) -> AppResult<Json<PagedPosts>> {
    middleware::require_admin(&ctx, &headers).await?;

    let page = Page {
        page: params
            .remove("page")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        limit: params
            .remove("limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(20),
    };

    let filter = SearchFilter::from_params(&params);
    let result = ctx.posts.search_paged(&filter, page, true).await?;

    Ok(Json(result))
}
