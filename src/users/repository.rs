/// User repository
///
/// Account upserts from OAuth sign-in, bookmark set mutations, and the
/// role/ban transitions used by the admin panel.
use crate::{
    error::{AppError, AppResult},
    posts::models::total_pages,
    posts::Page,
    users::models::{OAuthProfile, PagedUsers, Role, User},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

const USER_COLUMNS: &str =
    "id, name, email, picture, role, is_banned, bio, occupation, bookmarked_posts, created_at";

/// User repository over the shared pool
#[derive(Clone)]
pub struct UserRepository {
    db: SqlitePool,
}

impl UserRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create or refresh an account from verified OAuth profile data
    ///
    /// Name, email and picture are refreshed on every sign-in; role, ban
    /// state, bio and bookmarks are preserved.
    pub async fn upsert_from_oauth(&self, profile: &OAuthProfile) -> AppResult<User> {
        if profile.email.trim().is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, picture, role, is_banned, bio, occupation,
                               bookmarked_posts, created_at)
            VALUES (?, ?, ?, ?, 'user', 0, '', '', '[]', ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                picture = excluded.picture
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.picture)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        self.get(&profile.id).await
    }

    /// Fetch one user
    pub async fn get(&self, id: &str) -> AppResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {}", id)))?;

        row_to_user(row)
    }

    /// Update bio and occupation; omitted fields keep their values
    pub async fn update_profile(
        &self,
        id: &str,
        bio: Option<String>,
        occupation: Option<String>,
    ) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                bio = COALESCE(?, bio),
                occupation = COALESCE(?, occupation)
            WHERE id = ?
            "#,
        )
        .bind(&bio)
        .bind(&occupation)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User not found: {}", id)));
        }

        self.get(id).await
    }

    /// Add a bookmark with set semantics: appending only when absent
    pub async fn add_bookmark(&self, user_id: &str, post_id: &str) -> AppResult<()> {
        let mut bookmarks = self.get(user_id).await?.bookmarked_posts;

        if bookmarks.iter().any(|id| id == post_id) {
            return Ok(()); // Already present, no-op
        }

        bookmarks.push(post_id.to_string());
        self.store_bookmarks(user_id, &bookmarks).await
    }

    /// Remove all occurrences of a bookmark; absent is a no-op
    pub async fn remove_bookmark(&self, user_id: &str, post_id: &str) -> AppResult<()> {
        let mut bookmarks = self.get(user_id).await?.bookmarked_posts;
        bookmarks.retain(|id| id != post_id);
        self.store_bookmarks(user_id, &bookmarks).await
    }

    async fn store_bookmarks(&self, user_id: &str, bookmarks: &[String]) -> AppResult<()> {
        let json = serde_json::to_string(bookmarks)
            .map_err(|e| AppError::Internal(format!("Failed to encode bookmarks: {}", e)))?;

        sqlx::query("UPDATE users SET bookmarked_posts = ?1 WHERE id = ?2")
            .bind(&json)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Set the account role, keeping the ban flag consistent
    ///
    /// role=banned forces is_banned=true; any other role forces it false.
    /// The two fields are never allowed to diverge.
    pub async fn set_role(&self, user_id: &str, role: Role) -> AppResult<User> {
        let result = sqlx::query("UPDATE users SET role = ?1, is_banned = ?2 WHERE id = ?3")
            .bind(role.as_str())
            .bind(role == Role::Banned)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User not found: {}", user_id)));
        }

        tracing::info!(user_id = %user_id, role = role.as_str(), "role changed");

        self.get(user_id).await
    }

    /// Ban an account; admin accounts cannot be banned
    pub async fn ban(&self, user_id: &str) -> AppResult<User> {
        let user = self.get(user_id).await?;
        if user.role == Role::Admin {
            return Err(AppError::Authorization(
                "Admin accounts cannot be banned".to_string(),
            ));
        }

        self.set_role(user_id, Role::Banned).await
    }

    /// Lift a ban, returning the account to the user role
    pub async fn unban(&self, user_id: &str) -> AppResult<User> {
        self.set_role(user_id, Role::User).await
    }

    /// One page of users, newest first, for the admin table
    pub async fn list(&self, page: Page) -> AppResult<PagedUsers> {
        let page = page.clamped();

        let total_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.db)
            .await?
            .try_get("n")?;

        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.db)
            .await?;

        let items = rows
            .into_iter()
            .map(row_to_user)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PagedUsers {
            items,
            total_count,
            total_pages: total_pages(total_count, page.limit),
            page: page.page,
            limit: page.limit,
        })
    }
}

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> AppResult<User> {
    let role_str: String = row.try_get("role")?;
    let role = Role::from_str(&role_str)?;

    let bookmarks_json: String = row.try_get("bookmarked_posts")?;
    let bookmarked_posts: Vec<String> = serde_json::from_str(&bookmarks_json)
        .map_err(|e| AppError::Internal(format!("Invalid bookmarks payload: {}", e)))?;

    let created_at_str: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        picture: row.try_get("picture")?,
        role,
        is_banned: row.try_get("is_banned")?,
        bio: row.try_get("bio")?,
        occupation: row.try_get("occupation")?,
        bookmarked_posts,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_repo() -> UserRepository {
        let db = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        UserRepository::new(db)
    }

    fn alice() -> OAuthProfile {
        OAuthProfile {
            id: "google-123".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            picture: Some("https://example.com/alice.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_refreshes() {
        let repo = create_test_repo().await;

        let user = repo.upsert_from_oauth(&alice()).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert!(!user.is_banned);
        assert!(user.bookmarked_posts.is_empty());

        // Mutate state that a sign-in must not clobber
        repo.add_bookmark(&user.id, "post-1").await.unwrap();
        repo.update_profile(&user.id, Some("field biologist".to_string()), None)
            .await
            .unwrap();

        let mut profile = alice();
        profile.name = "Alice B.".to_string();
        let refreshed = repo.upsert_from_oauth(&profile).await.unwrap();

        assert_eq!(refreshed.name, "Alice B.");
        assert_eq!(refreshed.bio, "field biologist");
        assert_eq!(refreshed.bookmarked_posts, vec!["post-1".to_string()]);
    }

    #[tokio::test]
    async fn test_bookmark_add_is_idempotent() {
        let repo = create_test_repo().await;
        let user = repo.upsert_from_oauth(&alice()).await.unwrap();

        repo.add_bookmark(&user.id, "post-1").await.unwrap();
        repo.add_bookmark(&user.id, "post-1").await.unwrap();

        let user = repo.get(&user.id).await.unwrap();
        assert_eq!(user.bookmarked_posts, vec!["post-1".to_string()]);
    }

    #[tokio::test]
    async fn test_bookmark_remove_absent_is_noop() {
        let repo = create_test_repo().await;
        let user = repo.upsert_from_oauth(&alice()).await.unwrap();

        repo.add_bookmark(&user.id, "post-1").await.unwrap();
        repo.add_bookmark(&user.id, "post-2").await.unwrap();

        repo.remove_bookmark(&user.id, "post-1").await.unwrap();
        repo.remove_bookmark(&user.id, "never-bookmarked").await.unwrap();

        let user = repo.get(&user.id).await.unwrap();
        assert_eq!(user.bookmarked_posts, vec!["post-2".to_string()]);
    }

    #[tokio::test]
    async fn test_bookmark_unknown_user() {
        let repo = create_test_repo().await;
        assert!(matches!(
            repo.add_bookmark("nobody", "post-1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_role_and_ban_flag_never_diverge() {
        let repo = create_test_repo().await;
        let user = repo.upsert_from_oauth(&alice()).await.unwrap();

        let banned = repo.set_role(&user.id, Role::Banned).await.unwrap();
        assert_eq!(banned.role, Role::Banned);
        assert!(banned.is_banned);

        let admin = repo.set_role(&user.id, Role::Admin).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(!admin.is_banned);

        let plain = repo.set_role(&user.id, Role::User).await.unwrap();
        assert_eq!(plain.role, Role::User);
        assert!(!plain.is_banned);
    }

    #[tokio::test]
    async fn test_ban_and_unban() {
        let repo = create_test_repo().await;
        let user = repo.upsert_from_oauth(&alice()).await.unwrap();

        let banned = repo.ban(&user.id).await.unwrap();
        assert_eq!(banned.role, Role::Banned);
        assert!(banned.is_banned);

        let restored = repo.unban(&user.id).await.unwrap();
        assert_eq!(restored.role, Role::User);
        assert!(!restored.is_banned);
    }

    #[tokio::test]
    async fn test_admins_cannot_be_banned() {
        let repo = create_test_repo().await;
        let user = repo.upsert_from_oauth(&alice()).await.unwrap();
        repo.set_role(&user.id, Role::Admin).await.unwrap();

        let result = repo.ban(&user.id).await;
        assert!(matches!(result, Err(AppError::Authorization(_))));

        // Unchanged
        let user = repo.get(&user.id).await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(!user.is_banned);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let repo = create_test_repo().await;
        for i in 0..3 {
            repo.upsert_from_oauth(&OAuthProfile {
                id: format!("google-{}", i),
                name: format!("User {}", i),
                email: format!("user{}@example.com", i),
                picture: None,
            })
            .await
            .unwrap();
        }

        let page = repo.list(Page { page: 1, limit: 2 }).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
    }
}
