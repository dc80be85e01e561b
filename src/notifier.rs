//! State-change notifier
//!
//! Background task bridging the state store's change feed to the platform's
//! report-state endpoint. Each write triggers one push carrying the
//! post-write record, flattened to the report subset of trait fields.
//! Push failures are logged, never retried.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::homegraph::{HomeGraphClient, ReportStatePayload};
use crate::store::{StateChange, StateStore};
use crate::traits;

/// State-change notifier
pub struct Notifier {
    store: StateStore,
    homegraph: Option<HomeGraphClient>,
    agent_user_id: String,
    changes: broadcast::Receiver<StateChange>,
}

impl Notifier {
    /// Create a notifier over the given store. The change feed subscription
    /// starts here, so writes issued after construction are never missed.
    #[must_use]
    pub fn new(
        store: StateStore,
        homegraph: Option<HomeGraphClient>,
        agent_user_id: String,
    ) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            homegraph,
            agent_user_id,
            changes,
        }
    }

    /// Run the notifier in a background task
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Consume the change feed until the store is dropped
    async fn run(self) {
        let Some(homegraph) = self.homegraph else {
            tracing::warn!("no platform credential configured, report state is unavailable");
            return;
        };

        let mut changes = self.changes;
        loop {
            let change = match changes.recv().await {
                Ok(change) => change,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "change feed lagged, skipping missed writes");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(record) = self.store.record(&change.device_id).await else {
                continue;
            };

            let state = traits::flatten_report(&record);
            let payload =
                ReportStatePayload::for_device(&self.agent_user_id, &change.device_id, state);

            match homegraph.report_state(&payload).await {
                Ok(response) => {
                    tracing::debug!(device = %change.device_id, ?response, "report state pushed");
                }
                Err(e) => {
                    tracing::error!(device = %change.device_id, error = %e, "report state failed");
                }
            }
        }
    }
}
