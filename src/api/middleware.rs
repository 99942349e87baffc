/// Authentication and authorization helpers for route handlers
use crate::{
    auth,
    context::AppContext,
    error::{AppError, AppResult},
    users::User,
};
use axum::http::HeaderMap;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Require authentication: validate the session token and load the account
///
/// The account is loaded fresh so role changes and bans take effect
/// immediately, regardless of what an old token was issued for.
pub async fn require_auth(ctx: &AppContext, headers: &HeaderMap) -> AppResult<User> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

    let claims = auth::validate_session_token(&ctx.config.authentication, &token)?;
    let user = ctx.users.get(&claims.sub).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::Authentication("Unknown account".to_string()),
        other => other,
    })?;

    if user.is_banned {
        return Err(AppError::Authorization("Account is banned".to_string()));
    }

    Ok(user)
}

/// Require an admin caller
pub async fn require_admin(ctx: &AppContext, headers: &HeaderMap) -> AppResult<User> {
    let user = require_auth(ctx, headers).await?;
    if !user.is_admin() {
        return Err(AppError::Authorization("Admin access required".to_string()));
    }
    Ok(user)
}

/// Callers may act on their own account; admins may act on any
pub fn require_self_or_admin(caller: &User, user_id: &str) -> AppResult<()> {
    if caller.id == user_id || caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Cannot act on another user's account".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::Role;
    use chrono::Utc;

    fn user_with_role(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            name: "Test".to_string(),
            email: format!("{}@example.com", id),
            picture: None,
            role,
            is_banned: role == Role::Banned,
            bio: String::new(),
            occupation: String::new(),
            bookmarked_posts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_self_or_admin() {
        let alice = user_with_role("alice", Role::User);
        let admin = user_with_role("root", Role::Admin);

        assert!(require_self_or_admin(&alice, "alice").is_ok());
        assert!(require_self_or_admin(&alice, "bob").is_err());
        assert!(require_self_or_admin(&admin, "bob").is_ok());
    }
}
