/// Authentication: Google sign-in verification and session tokens
///
/// Identity is delegated to Google OAuth; this module verifies incoming ID
/// tokens against Google's tokeninfo endpoint and issues signed session
/// JWTs of its own for subsequent requests.
use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    users::User,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Claims carried in a session token
///
/// Deliberately minimal: role and ban state are checked fresh from the
/// database on every request, so stale tokens cannot outlive a ban.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id (the OAuth subject)
    pub sub: String,
    /// Expiry as a unix timestamp
    pub exp: usize,
}

/// Issue a session token for a signed-in user
pub fn issue_session_token(auth: &AuthConfig, user: &User) -> AppResult<String> {
    let exp = Utc::now()
        .checked_add_signed(chrono::Duration::hours(auth.session_ttl_hours))
        .ok_or_else(|| AppError::Internal("Session expiry overflow".to_string()))?
        .timestamp() as usize;

    let claims = SessionClaims {
        sub: user.id.clone(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.session_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
}

/// Validate a session token and return its claims
pub fn validate_session_token(auth: &AuthConfig, token: &str) -> AppResult<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(auth.session_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Authentication("Invalid or expired session token".to_string()))
}

/// Claims returned by Google's tokeninfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub aud: String,
}

/// Verify a Google ID token
///
/// Google validates signature and expiry server-side; the audience still
/// has to be checked locally so tokens minted for other apps are refused.
pub async fn verify_google_id_token(
    http: &reqwest::Client,
    client_id: &str,
    id_token: &str,
) -> AppResult<GoogleClaims> {
    let response = http
        .get(GOOGLE_TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Token verification request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Authentication("Invalid Google ID token".to_string()));
    }

    let claims: GoogleClaims = response
        .json()
        .await
        .map_err(|_| AppError::Authentication("Malformed token verification response".to_string()))?;

    if claims.aud != client_id {
        return Err(AppError::Authentication(
            "Token was not issued for this application".to_string(),
        ));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::Role;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            session_secret: "0123456789abcdef0123456789abcdef".to_string(),
            session_ttl_hours: 72,
            google_client_id: "client-id.apps.googleusercontent.com".to_string(),
        }
    }

    fn test_user() -> User {
        User {
            id: "google-123".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            picture: None,
            role: Role::User,
            is_banned: false,
            bio: String::new(),
            occupation: String::new(),
            bookmarked_posts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_session_token_round_trip() {
        let config = test_auth_config();
        let token = issue_session_token(&config, &test_user()).unwrap();

        let claims = validate_session_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "google-123");
    }

    #[test]
    fn test_tampered_token_rejected() {
        let config = test_auth_config();
        let token = issue_session_token(&config, &test_user()).unwrap();

        let mut other = test_auth_config();
        other.session_secret = "ffffffffffffffffffffffffffffffff".to_string();
        assert!(validate_session_token(&other, &token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let config = test_auth_config();
        assert!(validate_session_token(&config, "not.a.token").is_err());
    }
}
