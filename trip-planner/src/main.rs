use std::sync::Arc;
use tracing::{info, warn};
use warp::Filter;

mod agents;
mod api;
mod config;
mod error;
mod metrics;
mod middleware;
mod models;
mod pipeline;
mod profile;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!("Starting AI travel planner");
    if config.fallback_api_key().is_none() {
        warn!("GOOGLE_API_KEY is not set; a Gemini key must be entered in the form");
    }

    let metrics = metrics::Metrics::new()?;
    let factory = agents::GeminiDelegateFactory::new(config.clone())?;
    let limiter = middleware::submission_limiter(config.rate_limit_per_minute);
    info!(
        model = %config.gemini_model,
        rate_limit_per_minute = config.rate_limit_per_minute,
        "Delegates configured"
    );

    let state = api::AppState {
        config: Arc::new(config.clone()),
        factory: Arc::new(factory),
        metrics: metrics.clone(),
        limiter,
    };

    // Build API routes
    let api_routes = api::routes(state)
        .with(warp::log("api"))
        .with(middleware::cors());

    // Health check route
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "healthy"})));

    // Metrics route
    let metrics_route = warp::path("metrics")
        .and(warp::get())
        .map(move || match metrics.encode() {
            Ok((buffer, content_type)) => warp::reply::with_status(
                warp::reply::with_header(buffer, "Content-Type", content_type),
                warp::http::StatusCode::OK,
            ),
            Err(e) => warp::reply::with_status(
                warp::reply::with_header(
                    e.to_string().into_bytes(),
                    "Content-Type",
                    "text/plain".to_string(),
                ),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ),
        });

    let routes = health.or(metrics_route).or(api_routes);

    // Start server
    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes).run(addr).await;

    Ok(())
}
