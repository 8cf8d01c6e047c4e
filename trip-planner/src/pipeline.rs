// Pipeline: the research → planning chain. A failed stage ends the run

use serde::Serialize;
use std::fmt;
use tracing::{error, info};

use crate::agents::Delegates;
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::models::TravelProfile;
use crate::profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingKeys,
    AwaitingSubmit,
    Researching,
    Planning,
    Done,
    Error,
}

impl SessionState {
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Idle, AwaitingKeys) => true,
            (AwaitingKeys, AwaitingSubmit) => true,
            (AwaitingSubmit, Researching) => true,
            (Researching, Planning) => true,
            (Planning, Done) => true,
            (Researching | Planning, Error) => true,
            _ => false,
        }
    }

    pub fn advance(&mut self, next: SessionState) -> Result<(), ApiError> {
        if !self.can_advance_to(next) {
            return Err(ApiError::InternalError(format!(
                "illegal session transition {:?} -> {:?}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Research,
    Planning,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Planning => "planning",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress reported to the page between and after stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Researching,
    ResearchComplete(String),
    Planning,
    Done(String),
}

#[derive(Debug, Clone)]
pub struct TripPlan {
    pub research_summary: String,
    pub itinerary: String,
}

/// Runs both stages for `profile`.
///
/// `session` must be in `AwaitingSubmit`; it ends in `Done` or `Error`.
pub async fn run<F>(
    delegates: &Delegates,
    profile: &TravelProfile,
    metrics: &Metrics,
    session: &mut SessionState,
    mut on_progress: F,
) -> Result<TripPlan, ApiError>
where
    F: FnMut(Progress) + Send,
{
    session.advance(SessionState::Researching)?;
    on_progress(Progress::Researching);

    let research_prompt = profile::research_prompt(profile);
    info!(agent = delegates.researcher.name(), "Research stage started");
    metrics.record_stage_call(Stage::Research);
    let research_summary = match delegates.researcher.generate(&research_prompt).await {
        Ok(summary) => summary,
        Err(source) => {
            error!("Research stage failed: {}", source);
            metrics.record_stage_failure(Stage::Research);
            session.advance(SessionState::Error)?;
            return Err(ApiError::Delegate {
                stage: Stage::Research,
                source,
            });
        }
    };
    on_progress(Progress::ResearchComplete(research_summary.clone()));

    session.advance(SessionState::Planning)?;
    on_progress(Progress::Planning);

    let planning_prompt = profile::planning_prompt(profile, &research_summary);
    info!(agent = delegates.planner.name(), "Planning stage started");
    metrics.record_stage_call(Stage::Planning);
    let itinerary = match delegates.planner.generate(&planning_prompt).await {
        Ok(itinerary) => itinerary,
        Err(source) => {
            error!("Planning stage failed: {}", source);
            metrics.record_stage_failure(Stage::Planning);
            session.advance(SessionState::Error)?;
            return Err(ApiError::Delegate {
                stage: Stage::Planning,
                source,
            });
        }
    };

    session.advance(SessionState::Done)?;
    on_progress(Progress::Done(itinerary.clone()));

    Ok(TripPlan {
        research_summary,
        itinerary,
    })
}
