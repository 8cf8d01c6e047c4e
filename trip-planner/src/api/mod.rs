use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use crate::agents::DelegateFactory;
use crate::config::Config;
use crate::error;
use crate::metrics::Metrics;
use crate::middleware::SubmissionLimiter;

mod itinerary;
mod page;

/// Everything a request handler needs; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub factory: Arc<dyn DelegateFactory>,
    pub metrics: Metrics,
    pub limiter: Option<SubmissionLimiter>,
}

pub fn routes(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    let index_route = warp::path::end().and(warp::get()).map(page::index);

    let itinerary_route = api
        .and(warp::path("itinerary"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(itinerary::handle_itinerary);

    let stream_route = api
        .and(warp::path("itinerary"))
        .and(warp::path("stream"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(itinerary::handle_itinerary_stream);

    index_route
        .or(itinerary_route)
        .or(stream_route)
        .recover(error::handle_rejection)
}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}
