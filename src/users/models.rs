/// User data model
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role
///
/// Banned is a role rather than just a flag; the `is_banned` flag is kept
/// consistent with it on every role mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Banned,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Banned => "banned",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "banned" => Ok(Role::Banned),
            _ => Err(AppError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// An authenticated account, upserted from OAuth profile data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// External identity id (the OAuth subject)
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub role: Role,
    pub is_banned: bool,
    pub bio: String,
    pub occupation: String,
    /// Ordered set of post ids; uniqueness enforced by the mutation logic
    pub bookmarked_posts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Verified profile data from the OAuth provider
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
}

/// One page of users plus totals, for the admin table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedUsers {
    pub items: Vec<User>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: u32,
    pub limit: u32,
}
