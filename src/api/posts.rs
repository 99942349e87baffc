/// Post endpoints: browse, search, create/update, image upload and serving
use crate::{
    api::middleware,
    context::AppContext,
    error::{AppError, AppResult},
    posts::{NewPost, OptionalImageField, Post, PostUpdate, SearchFilter},
};
use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::io::ReaderStream;

/// Build post routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/search", get(search_posts))
        .route("/posts/image", post(upload_image))
        .route("/posts/image/:filename", get(serve_image))
        .route("/posts/author/:author_id", get(posts_by_author))
        .route("/posts/:id", get(get_post).put(update_post))
        .route("/posts/:id/report", post(report_post))
        .route("/posts/:id/image", delete(remove_post_image))
}

/// List all posts, newest first
async fn list_posts(State(ctx): State<AppContext>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(ctx.posts.list().await?))
}

/// Filtered search
///
/// Free-text fields match as case-insensitive substrings; enumerated
/// fields take comma-separated alternatives. Unknown parameters are
/// ignored, so an empty query string returns everything.
async fn search_posts(
    State(ctx): State<AppContext>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Post>>> {
    let filter = SearchFilter::from_params(&params);
    Ok(Json(ctx.posts.search(&filter).await?))
}

/// Fetch one post
async fn get_post(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    Ok(Json(ctx.posts.get(&id).await?))
}

/// List posts by author
async fn posts_by_author(
    State(ctx): State<AppContext>,
    Path(author_id): Path<String>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(ctx.posts.by_author(&author_id).await?))
}

/// Create a post; author identity comes from the session, not the payload
async fn create_post(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(new): Json<NewPost>,
) -> AppResult<impl IntoResponse> {
    let user = middleware::require_auth(&ctx, &headers).await?;

    let post = ctx.posts.create(new, &user.name, &user.id).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Update a post; image fields omitted from the payload are preserved
async fn update_post(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<PostUpdate>,
) -> AppResult<Json<Post>> {
    let user = middleware::require_auth(&ctx, &headers).await?;

    let post = ctx.posts.get(&id).await?;
    if post.author_id != user.id && !user.is_admin() {
        return Err(AppError::Authorization(
            "Only the author or an admin can update this post".to_string(),
        ));
    }

    Ok(Json(ctx.posts.update(&id, update).await?))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Flag a post for moderation
async fn report_post(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<MessageResponse>> {
    middleware::require_auth(&ctx, &headers).await?;

    ctx.posts.report(&id).await?;

    Ok(Json(MessageResponse {
        message: "Post reported".to_string(),
    }))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: String,
    filename: String,
}

/// Multipart image upload, field name "image"
///
/// Returns the generated filename to be referenced from post image fields.
async fn upload_image(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let user = middleware::require_auth(&ctx, &headers).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let declared_mime = field.content_type().unwrap_or_default().to_string();
        let original_filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
            .to_vec();

        let filename = ctx
            .blob_store
            .upload(data, &declared_mime, &original_filename, &user.id)
            .await?;

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                message: "Image uploaded".to_string(),
                filename,
            }),
        ));
    }

    Err(AppError::Validation("No file supplied".to_string()))
}

/// Stream image bytes with caching headers
async fn serve_image(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let download = ctx.blob_store.download(&filename).await?;

    let stream = ReaderStream::new(download.file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.mime_type)
        .header(header::CONTENT_LENGTH, download.size.to_string())
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

#[derive(Debug, Deserialize)]
struct RemoveImageRequest {
    /// One of trackerImage, enclosureImage, attachmentImage
    field: String,
}

/// Clear one optional image field and delete its blob
///
/// Best-effort ordering without a transaction: the blob goes first, and a
/// blob-store failure aborts before the document is touched. A crash in
/// between leaves an orphaned document reference at worst, never a
/// dangling blob the UI still points at.
async fn remove_post_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RemoveImageRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = middleware::require_auth(&ctx, &headers).await?;

    let post = ctx.posts.get(&id).await?;
    if post.author_id != user.id && !user.is_admin() {
        return Err(AppError::Authorization(
            "Only the author or an admin can modify this post".to_string(),
        ));
    }

    // Rejects postImage and unknown names before anything is modified
    let field = OptionalImageField::from_str(&req.field)?;

    let filename = ctx
        .posts
        .optional_image(&id, field)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post has no {}", req.field)))?;

    ctx.blob_store.delete(&filename).await?;
    ctx.posts.clear_optional_image(&id, field).await?;

    Ok(Json(MessageResponse {
        message: "Image removed".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_created() {
        let _router = routes();
    }
}
