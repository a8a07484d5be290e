// Events decoded from a simulation stream
//
// Each NDJSON line the backend sends is one of these records. The decoder
// classifies them by their `type` field and hands them to an `EventHandler`.
// Using an enum keeps dispatch exhaustive and lets tests compare whole
// event sequences.

use crate::models::SimulationResult;
use serde::{Deserialize, Serialize};

/// One record of the simulation stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")] // Matches JSON like {"type": "progress", ...}
pub enum SimulationEvent {
    /// Count of personas simulated so far
    Progress { current: u64 },

    /// Terminal payload of a successful run
    Result { data: SimulationResult },

    /// Terminal failure reported by the backend
    Error { message: String },

    /// Any other discriminator; carries nothing and reaches no handler
    #[serde(other)]
    Unknown,
}

impl SimulationEvent {
    /// `result` and `error` end a run by convention
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. } | Self::Error { .. })
    }

    /// Route this event to the matching handler method
    pub fn dispatch<H: EventHandler + ?Sized>(self, handler: &mut H) {
        match self {
            Self::Progress { current } => handler.on_progress(current),
            Self::Result { data } => handler.on_result(data),
            Self::Error { message } => handler.on_error(message),
            Self::Unknown => {}
        }
    }
}

/// Receiver of decoded stream events
///
/// Handlers run synchronously inside `feed`, so a slow handler delays the
/// next chunk read. Every method defaults to a no-op.
pub trait EventHandler {
    fn on_progress(&mut self, _current: u64) {}

    fn on_result(&mut self, _result: SimulationResult) {}

    fn on_error(&mut self, _message: String) {}

    /// Raw text of every non-blank record, seen before it is parsed
    fn on_record(&mut self, _line: &str) {}
}

impl<H: EventHandler + ?Sized> EventHandler for &mut H {
    fn on_progress(&mut self, current: u64) {
        (**self).on_progress(current)
    }

    fn on_result(&mut self, result: SimulationResult) {
        (**self).on_result(result)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }

    fn on_record(&mut self, line: &str) {
        (**self).on_record(line)
    }
}

/// Fan out to two handlers, first then second
impl<A: EventHandler, B: EventHandler> EventHandler for (A, B) {
    fn on_progress(&mut self, current: u64) {
        self.0.on_progress(current);
        self.1.on_progress(current);
    }

    fn on_result(&mut self, result: SimulationResult) {
        self.0.on_result(result.clone());
        self.1.on_result(result);
    }

    fn on_error(&mut self, message: String) {
        self.0.on_error(message.clone());
        self.1.on_error(message);
    }

    fn on_record(&mut self, line: &str) {
        self.0.on_record(line);
        self.1.on_record(line);
    }
}

/// Collects events in dispatch order (used by replay `--json` and tests)
impl EventHandler for Vec<SimulationEvent> {
    fn on_progress(&mut self, current: u64) {
        self.push(SimulationEvent::Progress { current });
    }

    fn on_result(&mut self, result: SimulationResult) {
        self.push(SimulationEvent::Result { data: result });
    }

    fn on_error(&mut self, message: String) {
        self.push(SimulationEvent::Error { message });
    }
}
