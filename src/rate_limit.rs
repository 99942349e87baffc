/// Rate limiting
///
/// Tiered token buckets gating abusive call volume; a policy knob external
/// to the handlers' correctness.
use crate::{
    config::RateLimitSettings,
    error::{AppError, AppResult},
};
use axum::{extract::{Request, State}, middleware::Next, response::Response};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Rate limiter manager with per-tier buckets
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    unauthenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    admin: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

fn quota(rps: u32, burst: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN))
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            enabled: settings.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(quota(
                settings.authenticated_rps,
                settings.burst_size,
            ))),
            unauthenticated: Arc::new(GovernorLimiter::direct(quota(
                settings.unauthenticated_rps,
                settings.burst_size / 5,
            ))),
            admin: Arc::new(GovernorLimiter::direct(quota(
                settings.admin_rps,
                settings.burst_size * 2,
            ))),
        }
    }

    /// Check rate limit for authenticated callers
    pub fn check_authenticated(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.authenticated
            .check()
            .map_err(|_| AppError::RateLimitExceeded)
    }

    /// Check rate limit for unauthenticated callers
    pub fn check_unauthenticated(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.unauthenticated
            .check()
            .map_err(|_| AppError::RateLimitExceeded)
    }

    /// Check rate limit for admin endpoints
    pub fn check_admin(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.admin.check().map_err(|_| AppError::RateLimitExceeded)
    }
}

/// Rate limiting middleware
///
/// Picks the tier from the request shape: admin paths with credentials get
/// the widest bucket, then authenticated callers, then anonymous ones.
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let is_admin_path = request.uri().path().starts_with("/admin");
    let has_auth_header = request.headers().get("authorization").is_some();

    if is_admin_path && has_auth_header {
        ctx.rate_limiter.check_admin()?;
    } else if has_auth_header {
        ctx.rate_limiter.check_authenticated()?;
    } else {
        ctx.rate_limiter.check_unauthenticated()?;
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(auth_rps: u32, burst: u32) -> RateLimitSettings {
        RateLimitSettings {
            enabled: true,
            authenticated_rps: auth_rps,
            unauthenticated_rps: 5,
            admin_rps: 100,
            burst_size: burst,
        }
    }

    #[test]
    fn test_first_requests_pass() {
        let limiter = RateLimiter::new(&settings(100, 50));

        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_unauthenticated().is_ok());
        assert!(limiter.check_admin().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&settings(10, 5));

        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }
        assert!(limiter.check_authenticated().is_err());
    }

    #[test]
    fn test_disabled_limiter_always_passes() {
        let mut s = settings(10, 5);
        s.enabled = false;
        let limiter = RateLimiter::new(&s);

        for _ in 0..100 {
            assert!(limiter.check_authenticated().is_ok());
        }
    }
}
