// ==========================================
// SequenceApi tests
// ==========================================
// Estimate routing, registry lookups, error mapping at the API
// boundary and event delivery to broadcast subscribers.
// ==========================================


#[cfg(test)]
mod sequence_api_test {
    use std::sync::Arc;

    use arrival_sequencer::api::{ApiError, SequenceApi, SequenceRegistry};
    use arrival_sequencer::config::SequencerSettings;
    use arrival_sequencer::domain::FlightState;
    use arrival_sequencer::engine::{
        BroadcastEventPublisher, EstimateOutcome, FixedClock, MoveTarget, OptionalEventPublisher,
        Sequence, SequenceEventType,
    };
    use chrono::TimeDelta;

    use crate::test_helpers::*;

    // ==========================================
    // Test helpers
    // ==========================================

    struct TestApi {
        api: SequenceApi,
        clock: Arc<FixedClock>,
        publisher: Arc<RecordingPublisher>,
    }

    fn test_api() -> TestApi {
        let ts = test_sequence();
        let registry = Arc::new(SequenceRegistry::new());
        registry.insert(ts.sequence).unwrap();
        TestApi {
            api: SequenceApi::new(registry, ts.clock.clone()),
            clock: ts.clock,
            publisher: ts.publisher,
        }
    }

    // ==========================================
    // Routing and registry
    // ==========================================

    #[tokio::test]
    async fn test_estimate_routed_by_destination() {
        let t = test_api();

        let outcome = t
            .api
            .process_estimate(estimate("QFA1", Some("RIVET"), 2400, 3600))
            .await
            .unwrap();
        assert_eq!(outcome, EstimateOutcome::Created);

        let qfa = t.api.flight(AIRPORT, "QFA1").await.unwrap();
        assert_eq!(qfa.scheduled_landing_time(), Some(at(3600)));

        let mut elsewhere = estimate("ANZ2", Some("RIVET"), 2400, 3600);
        elsewhere.destination = "NZAA".to_string();
        let result = t.api.process_estimate(elsewhere).await;
        assert!(matches!(result, Err(ApiError::AirportNotFound(ref a)) if a == "NZAA"));
    }

    #[tokio::test]
    async fn test_registry_lists_and_removes_airports() {
        let t = test_api();
        let registry = t.api.registry().clone();
        assert_eq!(registry.airports().unwrap(), vec![AIRPORT.to_string()]);

        let removed = registry.remove(AIRPORT).unwrap();
        assert!(removed.is_some());
        assert!(matches!(
            t.api.snapshot(AIRPORT).await,
            Err(ApiError::AirportNotFound(_))
        ));
    }

    // ==========================================
    // Error mapping
    // ==========================================

    #[tokio::test]
    async fn test_api_errors_carry_the_reason() {
        let t = test_api();
        t.api.add_flight(AIRPORT, flight("QFA1", 3600)).await.unwrap();
        t.api.add_flight(AIRPORT, flight("VOZ2", 3600)).await.unwrap();
        t.api.freeze(AIRPORT, "QFA1").await.unwrap();

        let frozen = t
            .api
            .move_flight(AIRPORT, "QFA1", MoveTarget::Index(1))
            .await;
        match frozen {
            Err(ApiError::FrozenFlightProtection(msg)) => {
                assert!(msg.contains("QFA1"));
                assert!(msg.contains("FROZEN"));
            }
            other => panic!("Expected FrozenFlightProtection, got {:?}", other),
        }

        let dup = t.api.add_flight(AIRPORT, flight("VOZ2", 3000)).await;
        assert!(matches!(dup, Err(ApiError::BusinessRuleViolation(_))));

        let missing = t.api.remove_flight(AIRPORT, "NOPE").await;
        assert!(matches!(missing, Err(ApiError::NotFound(ref m)) if m.contains("NOPE")));

        let blank = t.api.desequence(AIRPORT, "  ").await;
        assert!(matches!(blank, Err(ApiError::InvalidInput(_))));

        let cap = t
            .api
            .set_max_delay(AIRPORT, "VOZ2", Some(TimeDelta::seconds(-5)))
            .await;
        assert!(matches!(cap, Err(ApiError::InvalidInput(_))));

        let twice = t.api.freeze(AIRPORT, "QFA1").await;
        assert!(matches!(
            twice,
            Err(ApiError::InvalidStateTransition { ref from, .. }) if from == "FROZEN"
        ));
    }

    // ==========================================
    // Operator commands end to end
    // ==========================================

    #[tokio::test]
    async fn test_operator_commands_through_the_api() {
        let t = test_api();
        for cs in ["QFA1", "VOZ2", "JST3"] {
            t.api.add_flight(AIRPORT, flight(cs, 3600)).await.unwrap();
        }

        let slot = t
            .api
            .create_slot(AIRPORT, at(3700), at(4000), vec!["34L".to_string()])
            .await
            .unwrap();
        let snap = t.api.snapshot(AIRPORT).await.unwrap();
        assert_eq!(
            snap.flight("VOZ2").and_then(|f| f.scheduled_landing_time()),
            Some(at(4000))
        );

        t.api
            .modify_slot(AIRPORT, slot, at(5000), at(5300), vec!["34L".to_string()])
            .await
            .unwrap();
        t.api.pin_runway(AIRPORT, "JST3", "34R").await.unwrap();
        t.api.swap_flights(AIRPORT, "QFA1", "VOZ2").await.unwrap();

        let snap = t.api.snapshot(AIRPORT).await.unwrap();
        assert_eq!(snap.landing_order(), vec!["VOZ2", "QFA1", "JST3"]);
        assert_eq!(
            snap.flight("QFA1").and_then(|f| f.scheduled_landing_time()),
            Some(at(3780))
        );
        assert_eq!(
            snap.flight("JST3").and_then(|f| f.assigned_runway().map(str::to_string)),
            Some("34R".to_string())
        );

        t.api.mark_landed(AIRPORT, "VOZ2", None).await.unwrap();
        t.clock.advance(TimeDelta::hours(2));
        t.api.reevaluate(AIRPORT).await.unwrap();
        let snap = t.api.snapshot(AIRPORT).await.unwrap();
        assert!(snap.flight("VOZ2").is_none());
        assert_eq!(
            snap.flight("QFA1").map(|f| f.state()),
            Some(FlightState::SuperStable)
        );

        assert_eq!(
            t.publisher.last().map(|e| e.event_type),
            Some(SequenceEventType::ScheduleRecomputed)
        );
    }

    // ==========================================
    // Event delivery
    // ==========================================

    #[tokio::test]
    async fn test_broadcast_subscriber_receives_snapshots() {
        let broadcast = Arc::new(BroadcastEventPublisher::new(16));
        let mut rx = broadcast.subscribe();

        let clock = Arc::new(FixedClock::new(t0()));
        let sequence = Sequence::new(
            Arc::new(airport_config()),
            SequencerSettings::default(),
            clock.clone(),
            OptionalEventPublisher::with_publisher(broadcast.clone()),
        )
        .unwrap();
        let registry = Arc::new(SequenceRegistry::new());
        registry.insert(sequence).unwrap();
        let api = SequenceApi::new(registry, clock);

        api.add_flight(AIRPORT, flight("QFA1", 3600)).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, SequenceEventType::FlightAdded);
        assert_eq!(event.source.as_deref(), Some("add_flight"));
        assert_eq!(event.snapshot.landing_order(), vec!["QFA1"]);
    }
}
