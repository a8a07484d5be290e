//! Result providers
//!
//! A provider turns a draft into a stream of simulation events delivered to
//! an `EventHandler`. The backend provider streams from the real service;
//! the mock provider generates an illustrative result locally, optionally
//! from a fixed seed so runs are reproducible.

mod mock;

pub use mock::MockProvider;

use crate::client::{ApiClient, ClientError};
use crate::decoder::StreamSummary;
use crate::events::EventHandler;
use crate::models::EmailDraft;
use std::time::Duration;

/// Source of simulation events for one draft
#[allow(async_fn_in_trait)]
pub trait ResultProvider {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Run one simulation, dispatching every event to `handler`
    async fn run<H: EventHandler + ?Sized>(
        &self,
        draft: &EmailDraft,
        handler: &mut H,
    ) -> Result<StreamSummary, ClientError>;
}

/// Streams results from the simulation backend
#[derive(Debug, Clone)]
pub struct BackendProvider {
    client: ApiClient,
    stream_timeout: Duration,
}

impl BackendProvider {
    pub fn new(client: ApiClient, stream_timeout: Duration) -> Self {
        Self {
            client,
            stream_timeout,
        }
    }
}

impl ResultProvider for BackendProvider {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn run<H: EventHandler + ?Sized>(
        &self,
        draft: &EmailDraft,
        handler: &mut H,
    ) -> Result<StreamSummary, ClientError> {
        self.client
            .simulate(draft, handler, self.stream_timeout)
            .await
    }
}
