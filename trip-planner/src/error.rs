use thiserror::Error;
use warp::http::StatusCode;
use warp::{reject::Reject, Rejection, Reply};

use crate::pipeline::Stage;

/// Failures raised while talking to the hosted model or the search backend.
#[derive(Error, Debug)]
pub enum DelegateError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication with the model provider failed")]
    AuthenticationFailed,

    #[error("Rate limited by the model provider")]
    RateLimited,

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Model returned no content: {0}")]
    EmptyResponse(String),

    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Model requested unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Model kept calling tools after {0} rounds")]
    ToolRoundsExceeded(usize),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} is missing. Set it in your .env file or enter it in the form.")]
    MissingCredential(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{stage} stage failed: {source}")]
    Delegate {
        stage: Stage,
        #[source]
        source: DelegateError,
    },

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl Reject for ApiError {}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    let (code, message, details) = if let Some(api_err) = err.find::<ApiError>() {
        let (code, message) = match api_err {
            ApiError::MissingCredential(_) => (StatusCode::BAD_REQUEST, "Missing credential"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            ApiError::Delegate { .. } => (StatusCode::BAD_GATEWAY, "Generation failed"),
            ApiError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (code, message, api_err.to_string())
    } else if let Some(body_err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "Bad request", body_err.to_string())
    } else {
        return Err(err);
    };

    let json = warp::reply::json(&serde_json::json!({
        "error": message,
        "details": details,
    }));

    Ok(warp::reply::with_status(json, code))
}
