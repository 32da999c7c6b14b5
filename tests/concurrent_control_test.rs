// ==========================================
// Concurrency control tests
// ==========================================
// Per-airport exclusive lock: concurrent commands serialise, a held
// lock blocks other writers, airports never block each other, and
// the background workers start and stop with AppState.
// ==========================================


#[cfg(test)]
mod concurrent_control_test {
    use std::sync::Arc;
    use std::time::Duration;

    use arrival_sequencer::api::{ApiError, SequenceApi, SequenceRegistry};
    use arrival_sequencer::app::AppState;
    use arrival_sequencer::config::{AirportConfig, SequencerSettings, StaticConfigProvider};
    use arrival_sequencer::engine::{Clock, FixedClock, OptionalEventPublisher, Sequence};
    use arrival_sequencer::logging;
    use futures::future::join_all;

    use crate::test_helpers::*;

    // ==========================================
    // Test helpers
    // ==========================================

    fn other_airport() -> AirportConfig {
        let mut config = airport_config();
        config.identifier = "YMML".to_string();
        config
    }

    fn setup_api(configs: Vec<AirportConfig>) -> Arc<SequenceApi> {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(t0()));
        let registry = Arc::new(SequenceRegistry::new());
        for config in configs {
            let sequence = Sequence::new(
                Arc::new(config),
                SequencerSettings::default(),
                clock.clone(),
                OptionalEventPublisher::none(),
            )
            .unwrap();
            registry.insert(sequence).unwrap();
        }
        Arc::new(SequenceApi::new(registry, clock))
    }

    // ==========================================
    // Serialised writes
    // ==========================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_are_serialised() {
        logging::init_test();
        let api = setup_api(vec![airport_config()]);

        let tasks = (0..20).map(|i| {
            let api = api.clone();
            tokio::spawn(async move {
                let callsign = format!("QFA{}", i);
                api.add_flight(AIRPORT, flight(&callsign, 3600 + (i % 5) * 30))
                    .await
            })
        });
        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let snapshot = api.snapshot(AIRPORT).await.unwrap();
        assert_eq!(snapshot.landing_order().len(), 20);
        // whatever the arrival order, the committed schedule is consistent
        api.reevaluate(AIRPORT).await.unwrap();
        let snapshot = api.snapshot(AIRPORT).await.unwrap();
        let mode = airport_config().mode("34").cloned().unwrap();
        assert_runway_separation(&snapshot.items, &mode);
        assert_never_before_estimate(&snapshot.items);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_adds_admit_exactly_one() {
        let api = setup_api(vec![airport_config()]);

        let tasks = (0..10).map(|_| {
            let api = api.clone();
            tokio::spawn(async move { api.add_flight(AIRPORT, flight("VOZ7", 3600)).await })
        });
        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(ApiError::BusinessRuleViolation(_))))
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(rejected, 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_held_lock_blocks_writer_until_released() {
        let api = setup_api(vec![airport_config()]);
        let shared = api.registry().get(AIRPORT).unwrap();
        let guard = shared.lock().await;

        let writer = {
            let api = api.clone();
            tokio::spawn(async move { api.add_flight(AIRPORT, flight("JST1", 3600)).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer.is_finished());

        drop(guard);
        let result = tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .expect("writer should finish once the lock is released");
        result.unwrap().unwrap();
        assert!(api.flight(AIRPORT, "JST1").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_airports_do_not_block_each_other() {
        let api = setup_api(vec![airport_config(), other_airport()]);
        let yssy = api.registry().get(AIRPORT).unwrap();
        let _held = yssy.lock().await;

        let result = tokio::time::timeout(
            Duration::from_millis(500),
            api.add_flight("YMML", FlightBuilder::new("VOZ1").destination("YMML").build()),
        )
        .await
        .expect("YMML must not wait for the YSSY lock");
        result.unwrap();
    }

    // ==========================================
    // AppState lifecycle
    // ==========================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_app_state_runs_and_stops_workers() {
        logging::init_test();
        let provider = StaticConfigProvider::new(vec![airport_config(), other_airport()]).unwrap();
        let settings = SequencerSettings {
            reevaluation_interval_secs: 1,
            ..SequencerSettings::default()
        };

        let app = AppState::initialize(
            Arc::new(provider),
            OptionalEventPublisher::none(),
            Arc::new(FixedClock::new(t0())),
            settings,
        )
        .await
        .unwrap();
        assert_eq!(app.airports(), vec!["YMML".to_string(), AIRPORT.to_string()]);

        app.sequence_api
            .add_flight(AIRPORT, flight("QFA1", 3600))
            .await
            .unwrap();

        let stats = app.worker_stats(AIRPORT).unwrap();
        let mut waited = 0;
        while stats.passes_completed() == 0 && waited < 40 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            waited += 1;
        }
        assert!(stats.passes_completed() >= 1);
        assert_eq!(stats.passes_failed(), 0);

        tokio::time::timeout(Duration::from_secs(2), app.shutdown())
            .await
            .expect("shutdown should not hang");
    }

    #[tokio::test]
    async fn test_app_state_rejects_unconfigured_airport() {
        struct ListsMore;

        #[async_trait::async_trait]
        impl arrival_sequencer::config::AirportConfigReader for ListsMore {
            async fn airports(&self) -> anyhow::Result<Vec<String>> {
                Ok(vec!["ZZZZ".to_string()])
            }

            async fn airport_config(&self, _airport: &str) -> anyhow::Result<Option<AirportConfig>> {
                Ok(None)
            }
        }

        let result = AppState::initialize(
            Arc::new(ListsMore),
            OptionalEventPublisher::none(),
            Arc::new(FixedClock::new(t0())),
            SequencerSettings::default(),
        )
        .await;
        assert!(matches!(result, Err(ApiError::ConfigurationError(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_initialize_leaves_no_worker_running() {
        struct OneConfigured;

        #[async_trait::async_trait]
        impl arrival_sequencer::config::AirportConfigReader for OneConfigured {
            async fn airports(&self) -> anyhow::Result<Vec<String>> {
                Ok(vec![AIRPORT.to_string(), "ZZZZ".to_string()])
            }

            async fn airport_config(&self, airport: &str) -> anyhow::Result<Option<AirportConfig>> {
                Ok((airport == AIRPORT).then(airport_config))
            }
        }

        let publisher = Arc::new(RecordingPublisher::default());
        let settings = SequencerSettings {
            reevaluation_interval_secs: 0,
            ..SequencerSettings::default()
        };

        let result = AppState::initialize(
            Arc::new(OneConfigured),
            OptionalEventPublisher::with_publisher(publisher.clone()),
            Arc::new(FixedClock::new(t0())),
            settings,
        )
        .await;
        assert!(matches!(result, Err(ApiError::ConfigurationError(ref m)) if m.contains("ZZZZ")));

        // a worker left behind for YSSY would publish on every pass
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(publisher.events().is_empty());
    }
}
