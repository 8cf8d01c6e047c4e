use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::ApiError;

pub type SubmissionLimiter = Arc<DefaultDirectRateLimiter>;

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec![
            "User-Agent",
            "Origin",
            "Access-Control-Request-Method",
            "Access-Control-Request-Headers",
            "Content-Type",
            "Accept",
            "Content-Length",
        ])
        .allow_methods(vec!["POST", "GET", "OPTIONS"])
}

/// `None` when `per_minute` is zero.
pub fn submission_limiter(per_minute: u32) -> Option<SubmissionLimiter> {
    NonZeroU32::new(per_minute).map(|n| Arc::new(RateLimiter::direct(Quota::per_minute(n))))
}

/// Spends one unit of quota; `ApiError::RateLimitExceeded` once it is gone.
pub fn admit(limiter: Option<&SubmissionLimiter>) -> Result<(), ApiError> {
    match limiter {
        Some(limiter) if limiter.check().is_err() => Err(ApiError::RateLimitExceeded),
        _ => Ok(()),
    }
}
