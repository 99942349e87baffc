/// Sign-in endpoint
use crate::{
    auth,
    context::AppContext,
    error::{AppError, AppResult},
    users::{OAuthProfile, User},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/auth/google", post(google_login))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleLoginRequest {
    id_token: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

/// Sign in with a Google ID token
///
/// Verifies the token, upserts the account from the verified profile, and
/// returns a session token. Banned accounts are refused at the door.
async fn google_login(
    State(ctx): State<AppContext>,
    Json(req): Json<GoogleLoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let claims = auth::verify_google_id_token(
        &ctx.http,
        &ctx.config.authentication.google_client_id,
        &req.id_token,
    )
    .await?;

    let profile = OAuthProfile {
        id: claims.sub,
        name: claims.name.unwrap_or_else(|| claims.email.clone()),
        email: claims.email,
        picture: claims.picture,
    };

    let user = ctx.users.upsert_from_oauth(&profile).await?;

    if user.is_banned {
        return Err(AppError::Authorization("Account is banned".to_string()));
    }

    let token = auth::issue_session_token(&ctx.config.authentication, &user)?;

    tracing::info!(user_id = %user.id, "user signed in");

    Ok(Json(LoginResponse { token, user }))
}
