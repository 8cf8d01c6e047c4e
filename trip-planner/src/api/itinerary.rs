use futures::channel::mpsc;
use futures::StreamExt;
use std::convert::Infallible;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;
use warp::sse::Event;
use warp::{Rejection, Reply};

use super::AppState;
use crate::agents::{Credentials, Delegates};
use crate::error::ApiError;
use crate::middleware;
use crate::models::{ItineraryRequest, ItineraryResponse, TravelProfile};
use crate::pipeline::{self, Progress, SessionState};
use crate::profile;

enum Submission {
    /// Keys are present but there is no destination yet.
    NotTriggered(TravelProfile),
    Ready {
        profile: TravelProfile,
        delegates: Delegates,
    },
}

/// Walks a submission up to the point where the first stage can start.
fn prepare(
    request: &ItineraryRequest,
    state: &AppState,
    session: &mut SessionState,
) -> Result<Submission, ApiError> {
    session.advance(SessionState::AwaitingKeys)?;
    let credentials = Credentials::resolve(
        request.gemini_api_key.as_deref(),
        request.serp_api_key.as_deref(),
        state.config.fallback_api_key(),
    )?;

    session.advance(SessionState::AwaitingSubmit)?;
    let profile = request.to_profile()?;
    if !profile.has_destination() {
        info!("No destination given, generation not triggered");
        return Ok(Submission::NotTriggered(profile));
    }

    info!(
        destination = %profile.destination,
        days = profile.days,
        "Submission accepted"
    );
    middleware::admit(state.limiter.as_ref())?;
    let delegates = state.factory.build(&credentials, &profile);
    Ok(Submission::Ready { profile, delegates })
}

fn outcome(err: &ApiError) -> &'static str {
    match err {
        ApiError::MissingCredential(_) => "missing_credential",
        ApiError::BadRequest(_) => "invalid",
        ApiError::RateLimitExceeded => "rate_limited",
        ApiError::Delegate { .. } | ApiError::InternalError(_) => "failed",
    }
}

fn reject(state: &AppState, err: ApiError) -> Rejection {
    match &err {
        ApiError::Delegate { .. } | ApiError::InternalError(_) => error!("Submission failed: {}", err),
        _ => warn!("Submission refused: {}", err),
    }
    state.metrics.record_submission(outcome(&err));
    warp::reject::custom(err)
}

pub async fn handle_itinerary(
    request: ItineraryRequest,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let request_id = Uuid::new_v4();
    let span = info_span!("itinerary", %request_id);

    async move {
        let mut session = SessionState::Idle;
        let submission = prepare(&request, &state, &mut session).map_err(|e| reject(&state, e))?;

        let response = match submission {
            Submission::NotTriggered(profile) => {
                state.metrics.record_submission("not_triggered");
                ItineraryResponse {
                    request_id,
                    state: session,
                    profile: profile::profile_block(&profile),
                    research_summary: None,
                    itinerary: None,
                }
            }
            Submission::Ready { profile, delegates } => {
                let plan = pipeline::run(&delegates, &profile, &state.metrics, &mut session, |p| {
                    info!("Progress: {:?}", ProgressName(&p));
                })
                .await
                .map_err(|e| reject(&state, e))?;

                state.metrics.record_submission("done");
                ItineraryResponse {
                    request_id,
                    state: session,
                    profile: profile::profile_block(&profile),
                    research_summary: Some(plan.research_summary),
                    itinerary: Some(plan.itinerary),
                }
            }
        };

        Ok::<_, Rejection>(warp::reply::json(&response))
    }
    .instrument(span)
    .await
}

pub async fn handle_itinerary_stream(
    request: ItineraryRequest,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let request_id = Uuid::new_v4();
    let span = info_span!("itinerary_stream", %request_id);

    let mut session = SessionState::Idle;
    let submission = span
        .in_scope(|| prepare(&request, &state, &mut session))
        .map_err(|e| reject(&state, e))?;

    let (tx, rx) = mpsc::unbounded::<Event>();

    match submission {
        Submission::NotTriggered(_) => {
            state.metrics.record_submission("not_triggered");
            let _ = tx.unbounded_send(
                Event::default()
                    .event("awaiting_submit")
                    .data("Enter a destination to generate an itinerary."),
            );
        }
        Submission::Ready { profile, delegates } => {
            let metrics = state.metrics.clone();
            tokio::spawn(
                async move {
                    let progress_tx = tx.clone();
                    let result = pipeline::run(&delegates, &profile, &metrics, &mut session, move |p| {
                        let _ = progress_tx.unbounded_send(progress_event(p));
                    })
                    .await;

                    match result {
                        Ok(_) => metrics.record_submission("done"),
                        Err(err) => {
                            error!("Submission failed: {}", err);
                            metrics.record_submission(outcome(&err));
                            let _ = tx.unbounded_send(Event::default().event("error").data(err.to_string()));
                        }
                    }
                }
                .instrument(span),
            );
        }
    }

    let stream = rx.map(Ok::<_, Infallible>);
    Ok(warp::sse::reply(warp::sse::keep_alive().stream(stream)))
}

fn progress_event(progress: Progress) -> Event {
    match progress {
        Progress::Researching => Event::default().event("researching").data("Researching..."),
        Progress::ResearchComplete(summary) => Event::default().event("research_complete").data(summary),
        Progress::Planning => Event::default()
            .event("planning")
            .data("Generating personalized itinerary..."),
        Progress::Done(itinerary) => Event::default().event("done").data(itinerary),
    }
}

/// Logs a progress step without dumping the generated text.
struct ProgressName<'a>(&'a Progress);

impl std::fmt::Debug for ProgressName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            Progress::Researching => "researching",
            Progress::ResearchComplete(_) => "research_complete",
            Progress::Planning => "planning",
            Progress::Done(_) => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::agents::testing::ScriptedFactory;
    use crate::api::routes;
    use crate::api::tests_support::state;
    use crate::middleware::submission_limiter;
    use crate::pipeline::Stage;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use warp::http::StatusCode;

    fn form(destination: &str) -> Value {
        json!({
            "gemini_api_key": "g-key",
            "serp_api_key": "s-key",
            "destination": destination,
            "days": 3,
            "budget": "Mid-range",
            "travel_style": "Couple",
            "accommodation": "Airbnb",
            "interests": ["Local Food"],
            "pace": "Balanced"
        })
    }

    async fn post(
        factory: &Arc<ScriptedFactory>,
        fallback: Option<&str>,
        path: &str,
        body: &Value,
    ) -> warp::http::Response<warp::hyper::body::Bytes> {
        let filter = routes(state(factory.clone(), fallback));
        warp::test::request()
            .method("POST")
            .path(path)
            .json(body)
            .reply(&filter)
            .await
    }

    fn json_body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn full_submission_runs_both_stages_in_order() {
        let factory = Arc::new(ScriptedFactory::new(Some("Bánh mì stalls"), Some("Day 1: Old Quarter")));

        let res = post(&factory, None, "/api/v1/itinerary", &form("Hanoi")).await;

        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(&res);
        assert_eq!(body["state"], "done");
        assert_eq!(body["research_summary"], "Bánh mì stalls");
        assert_eq!(body["itinerary"], "Day 1: Old Quarter");
        assert!(body["profile"].as_str().unwrap().contains("Interests: Local Food"));

        let calls = factory.log.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "Researcher");
        assert_eq!(calls[1].0, "Planner");
        assert!(calls[1].1.contains("Research Summary: Bánh mì stalls"));
    }

    #[tokio::test]
    async fn empty_destination_makes_no_calls() {
        let factory = Arc::new(ScriptedFactory::new(Some("x"), Some("y")));

        let res = post(&factory, None, "/api/v1/itinerary", &form("  ")).await;

        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(&res);
        assert_eq!(body["state"], "awaiting_submit");
        assert!(body["itinerary"].is_null());
        assert_eq!(factory.build_count(), 0);
        assert!(factory.log.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_is_reported_before_any_call() {
        let factory = Arc::new(ScriptedFactory::new(Some("x"), Some("y")));
        let mut body = form("Hanoi");
        body["gemini_api_key"] = Value::Null;

        let res = post(&factory, None, "/api/v1/itinerary", &body).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let details = json_body(&res)["details"].as_str().unwrap().to_string();
        assert!(details.contains("Google API Key is missing"));
        assert_eq!(factory.build_count(), 0);
    }

    #[tokio::test]
    async fn environment_key_covers_missing_form_key() {
        let factory = Arc::new(ScriptedFactory::new(Some("x"), Some("y")));
        let mut body = form("Hanoi");
        body["gemini_api_key"] = json!("");

        let res = post(&factory, Some("env-key"), "/api/v1/itinerary", &body).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(factory.log.calls().len(), 2);
    }

    #[tokio::test]
    async fn out_of_range_duration_is_rejected() {
        let factory = Arc::new(ScriptedFactory::new(Some("x"), Some("y")));
        let mut body = form("Hanoi");
        body["days"] = json!(31);

        let res = post(&factory, None, "/api/v1/itinerary", &body).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(factory.build_count(), 0);
    }

    #[tokio::test]
    async fn research_failure_returns_bad_gateway_without_planning() {
        let factory = Arc::new(ScriptedFactory::new(None, Some("y")));

        let res = post(&factory, None, "/api/v1/itinerary", &form("Hanoi")).await;

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let details = json_body(&res)["details"].as_str().unwrap().to_string();
        assert!(details.starts_with(Stage::Research.as_str()));
        assert_eq!(factory.log.calls().len(), 1);
    }

    #[tokio::test]
    async fn stream_reports_progress_between_stages() {
        let factory = Arc::new(ScriptedFactory::new(Some("Bánh mì stalls"), Some("Day 1: Old Quarter")));

        let res = post(&factory, None, "/api/v1/itinerary/stream", &form("Hanoi")).await;

        assert_eq!(res.status(), StatusCode::OK);
        let text = String::from_utf8(res.body().to_vec()).unwrap();
        let order: Vec<usize> = ["researching", "research_complete", "planning", "done"]
            .iter()
            .map(|name| text.find(&format!("event:{}\n", name)).expect(name))
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{}", text);
        assert!(text.contains("Day 1: Old Quarter"));
    }

    #[tokio::test]
    async fn stream_reports_failure_as_error_event() {
        let factory = Arc::new(ScriptedFactory::new(Some("summary"), None));

        let res = post(&factory, None, "/api/v1/itinerary/stream", &form("Hanoi")).await;

        let text = String::from_utf8(res.body().to_vec()).unwrap();
        assert!(text.contains("event:error\n"));
        assert!(text.contains("planning stage failed"));
        assert!(!text.contains("event:done\n"));
    }

    #[tokio::test]
    async fn stream_refuses_missing_search_key_up_front() {
        let factory = Arc::new(ScriptedFactory::new(Some("x"), Some("y")));
        let mut body = form("Hanoi");
        body["serp_api_key"] = Value::Null;

        let res = post(&factory, Some("env-key"), "/api/v1/itinerary/stream", &body).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(factory.build_count(), 0);
    }

    #[tokio::test]
    async fn submissions_beyond_quota_are_throttled() {
        let factory = Arc::new(ScriptedFactory::new(Some("x"), Some("y")));
        let mut app = state(factory.clone(), None);
        app.limiter = submission_limiter(1);
        let filter = routes(app);

        let request = |body: Value| {
            warp::test::request()
                .method("POST")
                .path("/api/v1/itinerary")
                .json(&body)
        };
        let mut keyless = form("Hanoi");
        keyless["gemini_api_key"] = Value::Null;

        // refused and not-triggered submissions leave the quota alone
        assert_eq!(request(keyless).reply(&filter).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(request(form("")).reply(&filter).await.status(), StatusCode::OK);
        let malformed = warp::test::request()
            .method("POST")
            .path("/api/v1/itinerary")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&filter)
            .await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        assert_eq!(request(form("Hanoi")).reply(&filter).await.status(), StatusCode::OK);
        assert_eq!(
            request(form("Hanoi")).reply(&filter).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(factory.build_count(), 1);
    }

    #[tokio::test]
    async fn index_serves_the_form() {
        let factory = Arc::new(ScriptedFactory::new(None, None));
        let filter = routes(state(factory, None));

        let res = warp::test::request().path("/").reply(&filter).await;

        assert_eq!(res.status(), StatusCode::OK);
        let html = String::from_utf8(res.body().to_vec()).unwrap();
        assert!(html.contains("AI Travel Planner"));
        assert!(html.contains("value=\"Local Food\""));
        assert!(html.contains("value=\"No preference\""));
        assert!(html.contains("id=\"research-summary\""));
        assert!(html.contains("research_complete"));
    }
}
