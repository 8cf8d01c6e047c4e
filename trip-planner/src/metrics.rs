use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::pipeline::Stage;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    stage_calls: IntCounterVec,
    stage_failures: IntCounterVec,
    submissions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let stage_calls = IntCounterVec::new(
            Opts::new("trip_planner_stage_calls_total", "Delegate calls per stage"),
            &["stage"],
        )?;
        let stage_failures = IntCounterVec::new(
            Opts::new("trip_planner_stage_failures_total", "Failed delegate calls per stage"),
            &["stage"],
        )?;
        let submissions = IntCounterVec::new(
            Opts::new("trip_planner_submissions_total", "Form submissions by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(stage_calls.clone()))?;
        registry.register(Box::new(stage_failures.clone()))?;
        registry.register(Box::new(submissions.clone()))?;

        Ok(Self {
            registry,
            stage_calls,
            stage_failures,
            submissions,
        })
    }

    pub fn record_stage_call(&self, stage: Stage) {
        self.stage_calls.with_label_values(&[stage.as_str()]).inc();
    }

    pub fn record_stage_failure(&self, stage: Stage) {
        self.stage_failures.with_label_values(&[stage.as_str()]).inc();
    }

    pub fn record_submission(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    #[cfg(test)]
    pub fn stage_calls(&self, stage: Stage) -> u64 {
        self.stage_calls.with_label_values(&[stage.as_str()]).get()
    }

    #[cfg(test)]
    pub fn stage_failures(&self, stage: Stage) -> u64 {
        self.stage_failures.with_label_values(&[stage.as_str()]).get()
    }

    /// Text exposition format for `/metrics`.
    pub fn encode(&self) -> Result<(Vec<u8>, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((buffer, encoder.format_type().to_string()))
    }
}
