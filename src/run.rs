// Per-run simulation state
//
// One `SimulationRun` is owned by whoever starts a run and handed to the
// decoder as its `EventHandler`. Nothing about a run lives in globals, so
// several runs can be driven (or tested) side by side.
//
// The decoder keeps dispatching after a terminal event. The run enforces
// "first terminal wins": later `result`/`error` events and late progress are
// counted and logged but do not change the outcome.

use crate::events::EventHandler;
use crate::models::{EmailDraft, SimulationResult};
use chrono::{DateTime, Utc};

/// How a finished run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome<'a> {
    Completed(&'a SimulationResult),
    /// Backend reported a semantic failure
    Failed(&'a str),
    /// Stream ended without any terminal event
    Incomplete,
}

/// Explicit state of one simulation run
#[derive(Debug, Clone)]
pub struct SimulationRun {
    draft: EmailDraft,
    progress: u64,
    result: Option<SimulationResult>,
    error: Option<String>,
    in_flight: bool,
    /// Events received after the first terminal one
    late_events: usize,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl SimulationRun {
    pub fn new(draft: EmailDraft) -> Self {
        Self {
            draft,
            progress: 0,
            result: None,
            error: None,
            in_flight: false,
            late_events: 0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Reset progress and outcome, mark the run in flight
    pub fn begin(&mut self) {
        self.progress = 0;
        self.result = None;
        self.error = None;
        self.late_events = 0;
        self.in_flight = true;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
    }

    /// Mark the run as no longer in flight, whatever the outcome
    pub fn finish(&mut self) {
        self.in_flight = false;
        self.finished_at = Some(Utc::now());
    }

    pub fn draft(&self) -> &EmailDraft {
        &self.draft
    }

    pub fn progress(&self) -> u64 {
        self.progress
    }

    /// Personas the backend was asked to simulate
    pub fn total(&self) -> u32 {
        self.draft.sample_size
    }

    /// Progress as a percentage of the sample size (0-100)
    pub fn percent(&self) -> f64 {
        if self.draft.sample_size == 0 {
            return 0.0;
        }
        (self.progress as f64 / self.draft.sample_size as f64 * 100.0).min(100.0)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn late_events(&self) -> usize {
        self.late_events
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        Some(self.finished_at.unwrap_or_else(Utc::now) - start)
    }

    pub fn outcome(&self) -> RunOutcome<'_> {
        match (&self.result, &self.error) {
            (Some(result), _) => RunOutcome::Completed(result),
            (None, Some(message)) => RunOutcome::Failed(message),
            (None, None) => RunOutcome::Incomplete,
        }
    }

    fn is_terminated(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }
}

impl EventHandler for SimulationRun {
    fn on_progress(&mut self, current: u64) {
        if self.is_terminated() {
            self.late_events += 1;
            tracing::debug!(current, "Ignoring progress after terminal event");
            return;
        }
        self.progress = current;
    }

    fn on_result(&mut self, result: SimulationResult) {
        if self.is_terminated() {
            self.late_events += 1;
            tracing::warn!(id = %result.id, "Ignoring result after terminal event");
            return;
        }
        tracing::info!(
            id = %result.id,
            responses = result.responses.len(),
            open_rate = result.metrics.open_rate,
            "Simulation result received"
        );
        self.result = Some(result);
    }

    fn on_error(&mut self, message: String) {
        if self.is_terminated() {
            self.late_events += 1;
            tracing::warn!(%message, "Ignoring backend error after terminal event");
            return;
        }
        tracing::error!(%message, "Backend error");
        self.error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::NdjsonDecoder;

    fn draft(sample_size: u32) -> EmailDraft {
        EmailDraft {
            subject: "Quarterly update".to_string(),
            body: "Here is what changed this quarter".to_string(),
            cta: String::new(),
            audience: "devs".to_string(),
            sample_size,
        }
    }

    fn result(id: &str) -> SimulationResult {
        serde_json::from_str(&format!(r#"{{"id":"{}"}}"#, id)).unwrap()
    }

    #[test]
    fn test_begin_resets_state() {
        let mut run = SimulationRun::new(draft(4));
        run.on_progress(3);
        run.on_error("old".to_string());

        run.begin();
        assert!(run.is_in_flight());
        assert_eq!(run.progress(), 0);
        assert_eq!(run.outcome(), RunOutcome::Incomplete);

        run.finish();
        assert!(!run.is_in_flight());
        assert!(run.elapsed().is_some());
    }

    #[test]
    fn test_progress_percent() {
        let mut run = SimulationRun::new(draft(4));
        run.on_progress(1);
        assert_eq!(run.percent(), 25.0);
        run.on_progress(9);
        assert_eq!(run.percent(), 100.0);
        assert_eq!(SimulationRun::new(draft(0)).percent(), 0.0);
    }

    #[test]
    fn test_first_terminal_event_wins() {
        let mut run = SimulationRun::new(draft(2));
        run.begin();
        run.on_result(result("first"));
        run.on_error("late failure".to_string());
        run.on_result(result("second"));
        run.on_progress(2);

        assert_eq!(run.outcome(), RunOutcome::Completed(&result("first")));
        assert_eq!(run.late_events(), 3);
        assert_eq!(run.progress(), 0);
    }

    #[test]
    fn test_backend_error_outcome() {
        let mut run = SimulationRun::new(draft(2));
        run.on_error("LLM unavailable".to_string());
        assert_eq!(run.outcome(), RunOutcome::Failed("LLM unavailable"));
        run.on_result(result("after"));
        assert_eq!(run.outcome(), RunOutcome::Failed("LLM unavailable"));
    }

    #[test]
    fn test_independent_runs_driven_by_decoders() {
        let mut a = SimulationRun::new(draft(2));
        let mut b = SimulationRun::new(draft(2));
        let mut decoder_a = NdjsonDecoder::new();
        let mut decoder_b = NdjsonDecoder::new();

        decoder_a.feed(b"{\"type\":\"progress\",\"current\":1}\n", &mut a);
        decoder_b.feed(b"{\"type\":\"error\",\"message\":\"quota\"}\n", &mut b);
        decoder_a.feed(b"{\"type\":\"result\",\"data\":{\"id\":\"a\"}}\n", &mut a);

        assert_eq!(a.progress(), 1);
        assert!(matches!(a.outcome(), RunOutcome::Completed(r) if r.id == "a"));
        assert_eq!(b.outcome(), RunOutcome::Failed("quota"));
    }
}
