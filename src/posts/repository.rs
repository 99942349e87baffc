/// Post repository
///
/// CRUD and filtered-query access to the posts table.
use crate::{
    error::{AppError, AppResult},
    posts::{
        filter::SearchFilter,
        models::{total_pages, NewPost, OptionalImageField, Page, PagedPosts, Post, PostUpdate},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const POST_COLUMNS: &str = "id, title, common_name, scientific_name, animal_type, tracker_type, \
     enclosure_type, attachment_type, data_types, recommendations, post_image, tracker_image, \
     enclosure_image, attachment_image, author, author_id, created_at, last_updated, report_count";

/// Post repository over the shared pool
#[derive(Clone)]
pub struct PostRepository {
    db: SqlitePool,
}

impl PostRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a post
    pub async fn create(&self, new: NewPost, author: &str, author_id: &str) -> AppResult<Post> {
        if new.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if new.common_name.trim().is_empty() {
            return Err(AppError::Validation("Common name is required".to_string()));
        }
        if author.trim().is_empty() {
            return Err(AppError::Validation("Author is required".to_string()));
        }
        if new.post_image.trim().is_empty() {
            return Err(AppError::Validation("A main post image is required".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let data_types_json = serde_json::to_string(&new.data_types)
            .map_err(|e| AppError::Internal(format!("Failed to encode data types: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO posts
            (id, title, common_name, scientific_name, animal_type, tracker_type,
             enclosure_type, attachment_type, data_types, recommendations, post_image,
             tracker_image, enclosure_image, attachment_image, author, author_id,
             created_at, last_updated, report_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.common_name)
        .bind(&new.scientific_name)
        .bind(&new.animal_type)
        .bind(&new.tracker_type)
        .bind(&new.enclosure_type)
        .bind(&new.attachment_type)
        .bind(&data_types_json)
        .bind(&new.recommendations)
        .bind(&new.post_image)
        .bind(&new.tracker_image)
        .bind(&new.enclosure_image)
        .bind(&new.attachment_image)
        .bind(author)
        .bind(author_id)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        self.get(&id).await
    }

    /// Fetch one post
    pub async fn get(&self, id: &str) -> AppResult<Post> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post not found: {}", id)))?;

        row_to_post(row)
    }

    /// List all posts, newest first
    pub async fn list(&self) -> AppResult<Vec<Post>> {
        let sql = format!("SELECT {} FROM posts ORDER BY created_at DESC", POST_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.db).await?;

        rows.into_iter().map(row_to_post).collect()
    }

    /// List posts by author, newest first
    pub async fn by_author(&self, author_id: &str) -> AppResult<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE author_id = ?1 ORDER BY created_at DESC",
            POST_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(author_id).fetch_all(&self.db).await?;

        rows.into_iter().map(row_to_post).collect()
    }

    /// Fetch posts by id, preserving input order; dangling ids are skipped
    pub async fn by_ids(&self, ids: &[String]) -> AppResult<Vec<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS);

        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = sqlx::query(&sql).bind(id).fetch_optional(&self.db).await? {
                posts.push(row_to_post(row)?);
            }
        }

        Ok(posts)
    }

    /// Search posts with a compiled filter, newest first
    pub async fn search(&self, filter: &SearchFilter) -> AppResult<Vec<Post>> {
        let (cond, binds) = filter.condition();

        let mut sql = format!("SELECT {} FROM posts", POST_COLUMNS);
        if !cond.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&cond);
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.db).await?;
        rows.into_iter().map(row_to_post).collect()
    }

    /// One page of filtered posts with totals
    ///
    /// With `reported_only`, restricts to posts that have been reported at
    /// least once (the admin moderation listing).
    pub async fn search_paged(
        &self,
        filter: &SearchFilter,
        page: Page,
        reported_only: bool,
    ) -> AppResult<PagedPosts> {
        let page = page.clamped();
        let (cond, binds) = filter.condition();

        let mut wheres: Vec<String> = Vec::new();
        if reported_only {
            wheres.push("report_count > 0".to_string());
        }
        if !cond.is_empty() {
            wheres.push(cond);
        }
        let where_sql = if wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", wheres.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) AS n FROM posts{}", where_sql);
        let mut count_query = sqlx::query(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total_count: i64 = count_query.fetch_one(&self.db).await?.try_get("n")?;

        let items_sql = format!(
            "SELECT {} FROM posts{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, where_sql
        );
        let mut items_query = sqlx::query(&items_sql);
        for bind in &binds {
            items_query = items_query.bind(bind);
        }
        items_query = items_query.bind(i64::from(page.limit)).bind(page.offset());

        let rows = items_query.fetch_all(&self.db).await?;
        let items = rows
            .into_iter()
            .map(row_to_post)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PagedPosts {
            items,
            total_count,
            total_pages: total_pages(total_count, page.limit),
            page: page.page,
            limit: page.limit,
        })
    }

    /// Update a post; omitted fields (images included) keep their values
    pub async fn update(&self, id: &str, update: PostUpdate) -> AppResult<Post> {
        for (value, label) in [
            (&update.title, "Title"),
            (&update.common_name, "Common name"),
            (&update.post_image, "Main post image"),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(AppError::Validation(format!("{} cannot be empty", label)));
                }
            }
        }

        let data_types_json = update
            .data_types
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Failed to encode data types: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE posts SET
                title = COALESCE(?, title),
                common_name = COALESCE(?, common_name),
                scientific_name = COALESCE(?, scientific_name),
                animal_type = COALESCE(?, animal_type),
                tracker_type = COALESCE(?, tracker_type),
                enclosure_type = COALESCE(?, enclosure_type),
                attachment_type = COALESCE(?, attachment_type),
                data_types = COALESCE(?, data_types),
                recommendations = COALESCE(?, recommendations),
                post_image = COALESCE(?, post_image),
                tracker_image = COALESCE(?, tracker_image),
                enclosure_image = COALESCE(?, enclosure_image),
                attachment_image = COALESCE(?, attachment_image),
                last_updated = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.common_name)
        .bind(&update.scientific_name)
        .bind(&update.animal_type)
        .bind(&update.tracker_type)
        .bind(&update.enclosure_type)
        .bind(&update.attachment_type)
        .bind(&data_types_json)
        .bind(&update.recommendations)
        .bind(&update.post_image)
        .bind(&update.tracker_image)
        .bind(&update.enclosure_image)
        .bind(&update.attachment_image)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post not found: {}", id)));
        }

        self.get(id).await
    }

    /// Increment the moderation report counter
    pub async fn report(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE posts SET report_count = report_count + 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post not found: {}", id)));
        }

        Ok(())
    }

    /// Current filename stored in one of the optional image fields
    pub async fn optional_image(
        &self,
        id: &str,
        field: OptionalImageField,
    ) -> AppResult<Option<String>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?1", field.column());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post not found: {}", id)))?;

        Ok(row.try_get(field.column())?)
    }

    /// Null out one of the optional image fields
    ///
    /// The caller is responsible for deleting the referenced blob first;
    /// the main image is not representable as an OptionalImageField.
    pub async fn clear_optional_image(&self, id: &str, field: OptionalImageField) -> AppResult<()> {
        let sql = format!("UPDATE posts SET {} = NULL WHERE id = ?1", field.column());
        let result = sqlx::query(&sql).bind(id).execute(&self.db).await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post not found: {}", id)));
        }

        Ok(())
    }
}

fn row_to_post(row: sqlx::sqlite::SqliteRow) -> AppResult<Post> {
    let data_types_json: String = row.try_get("data_types")?;
    let data_types: Vec<String> = serde_json::from_str(&data_types_json)
        .map_err(|e| AppError::Internal(format!("Invalid data types payload: {}", e)))?;

    let created_at_str: String = row.try_get("created_at")?;
    let date = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    let last_updated = row
        .try_get::<Option<String>, _>("last_updated")?
        .as_deref()
        .map(DateTime::parse_from_rfc3339)
        .transpose()
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))?
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        common_name: row.try_get("common_name")?,
        scientific_name: row.try_get("scientific_name")?,
        animal_type: row.try_get("animal_type")?,
        tracker_type: row.try_get("tracker_type")?,
        enclosure_type: row.try_get("enclosure_type")?,
        attachment_type: row.try_get("attachment_type")?,
        data_types,
        recommendations: row.try_get("recommendations")?,
        post_image: row.try_get("post_image")?,
        tracker_image: row.try_get("tracker_image")?,
        enclosure_image: row.try_get("enclosure_image")?,
        attachment_image: row.try_get("attachment_image")?,
        author: row.try_get("author")?,
        author_id: row.try_get("author_id")?,
        date,
        last_updated,
        report_count: row.try_get("report_count")?,
    })
}
