// ==========================================
// Arrival Sequencer - application state
// ==========================================
// Builds one Sequence per configured airport, registers it, and runs
// one re-evaluation worker per airport until shutdown.
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ApiResult, SequenceApi, SequenceRegistry};
use crate::config::{AirportConfigReader, SequencerSettings};
use crate::engine::clock::Clock;
use crate::engine::events::OptionalEventPublisher;
use crate::engine::sequence::Sequence;
use crate::services::{RescheduleWorker, WorkerStats};

struct WorkerHandle {
    handle: JoinHandle<()>,
    stats: Arc<WorkerStats>,
}

/// Application state
///
/// Holds the registry, the API facade and the background workers.
pub struct AppState {
    /// airport → locked sequence
    pub registry: Arc<SequenceRegistry>,

    /// Locked facade used by feed adapters and operator tools
    pub sequence_api: Arc<SequenceApi>,

    pub settings: SequencerSettings,

    workers: HashMap<String, WorkerHandle>,
    cancel: CancellationToken,
}

impl AppState {
    /// Loads every airport the provider lists and starts its worker.
    ///
    /// # Errors
    /// - `ApiError::ConfigurationError`: a listed airport has no valid configuration
    /// - `ApiError::Other`: the provider failed
    pub async fn initialize(
        provider: Arc<dyn AirportConfigReader>,
        publisher: OptionalEventPublisher,
        clock: Arc<dyn Clock>,
        settings: SequencerSettings,
    ) -> ApiResult<Self> {
        let airports = provider.airports().await?;
        tracing::info!("initialising AppState for {} airport(s)", airports.len());

        // Red line: no worker starts until every airport has validated
        let registry = Arc::new(SequenceRegistry::new());
        let mut shared = Vec::with_capacity(airports.len());
        for airport in airports {
            let config = provider.airport_config(&airport).await?.ok_or_else(|| {
                ApiError::ConfigurationError(format!("no configuration for airport {}", airport))
            })?;
            let sequence = Sequence::new(
                Arc::new(config),
                settings.clone(),
                clock.clone(),
                publisher.clone(),
            )?;
            shared.push((airport, registry.insert(sequence)?));
        }

        let cancel = CancellationToken::new();
        let mut workers = HashMap::new();
        for (airport, sequence) in shared {
            let worker = RescheduleWorker::new(
                airport.clone(),
                sequence,
                clock.clone(),
                settings.reevaluation_interval(),
            );
            let stats = worker.stats();
            let handle = worker.spawn(cancel.child_token());
            workers.insert(airport, WorkerHandle { handle, stats });
        }

        let sequence_api = Arc::new(SequenceApi::new(registry.clone(), clock));

        Ok(Self {
            registry,
            sequence_api,
            settings,
            workers,
            cancel,
        })
    }

    pub fn airports(&self) -> Vec<String> {
        let mut airports: Vec<String> = self.workers.keys().cloned().collect();
        airports.sort();
        airports
    }

    pub fn worker_stats(&self, airport: &str) -> Option<Arc<WorkerStats>> {
        self.workers.get(airport).map(|w| w.stats.clone())
    }

    /// Cancels every worker and waits for in-flight passes to finish.
    pub async fn shutdown(self) {
        tracing::info!("shutting down {} re-evaluation worker(s)", self.workers.len());
        self.cancel.cancel();

        let handles = self.workers.into_values().map(|w| w.handle);
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("re-evaluation worker ended abnormally: {}", e);
            }
        }
    }
}
