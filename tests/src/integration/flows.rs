//! # Integration Test Flows
//!
//! A parent messenger talking to a scripted child over the loopback
//! network: handshakes, acks, responses, timeouts, cancellation and
//! teardown, all on a paused clock.

#[cfg(test)]
mod tests {
    use crate::harness::{echo, Behavior, Placement, World, CHILD_ORIGIN};
    use pb_messenger::{
        OriginPattern, Phase, SendError, SendErrorKind, SendOptions,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn to_child() -> SendOptions {
        SendOptions::new().with_origin(CHILD_ORIGIN)
    }

    // =============================================================================
    // ROUND TRIPS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_to_detached_endpoint() {
        let world = World::new(Behavior::Echo, Placement::Detached);

        let reply = world
            .messenger
            .send(&world.child_id(), "ping", json!({"n": 1}), to_child())
            .await
            .unwrap();

        assert_eq!(reply, echo("ping", &json!({"n": 1})));
        assert!(world.messenger.registry().is_empty());
        // Exact origin, not contained: no greeting needed
        assert_eq!(world.messenger.handshake().known_origin(&world.child_id()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contained_endpoint_handshake_with_wildcard() {
        let world = World::new(Behavior::Echo, Placement::Contained);

        let reply = world
            .messenger
            .send(&world.child_id(), "ping", json!("hi"), SendOptions::new())
            .await
            .unwrap();

        assert_eq!(reply, echo("ping", &json!("hi")));
        assert_eq!(
            world.messenger.handshake().known_origin(&world.child_id()),
            Some(CHILD_ORIGIN.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_untyped_options_with_origin_set() {
        let world = World::new(Behavior::Echo, Placement::Detached);
        let options = SendOptions::from_json(&json!({
            "origin": ["https://other.example", CHILD_ORIGIN],
            "timeout": 4000,
        }))
        .unwrap();

        let reply = world
            .messenger
            .send(&world.child_id(), "ping", json!(7), options)
            .await
            .unwrap();
        assert_eq!(reply, echo("ping", &json!(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_method_call_round_trip() {
        let world = World::new(Behavior::Echo, Placement::Contained);
        let payload = json!({"name": "resize", "args": [640, 480]});

        let reply = world
            .messenger
            .send(&world.child_id(), "method", payload.clone(), SendOptions::new())
            .await
            .unwrap();
        assert_eq!(reply, echo("method", &payload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_with_unbounded_budget() {
        let world = World::new(Behavior::Slow(Duration::from_secs(60)), Placement::Detached);
        let start = Instant::now();

        let reply = world
            .messenger
            .send(&world.child_id(), "ping", json!(null), to_child())
            .await
            .unwrap();

        assert_eq!(reply, echo("ping", &Value::Null));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_senders_get_their_own_responses() {
        let world = World::new(Behavior::Echo, Placement::Detached);
        let target = world.child_id();

        let mut tasks = Vec::new();
        for i in 0..50 {
            let messenger = world.messenger.clone();
            let target = target.clone();
            tasks.push(tokio::spawn(async move {
                messenger
                    .send(&target, "ping", json!(i), SendOptions::new().with_origin(CHILD_ORIGIN))
                    .await
            }));
        }

        for (i, task) in tasks.into_iter().enumerate() {
            let reply = task.await.unwrap().unwrap();
            assert_eq!(reply, echo("ping", &json!(i)));
        }
        assert_eq!(world.seen.load(Ordering::SeqCst), 50);
        assert!(world.messenger.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_and_forget_is_delivered_untracked() {
        let world = World::new(Behavior::Echo, Placement::Detached);

        let reply = world
            .messenger
            .send(&world.child_id(), "notify", json!({}), to_child().fire_and_forget())
            .await
            .unwrap();
        assert_eq!(reply, Value::Null);

        sleep(Duration::from_millis(10)).await;
        assert_eq!(world.seen.load(Ordering::SeqCst), 1);
        let stats = world.messenger.registry().stats();
        assert_eq!(stats.total_registered.load(Ordering::Relaxed), 0);
    }

    // =============================================================================
    // FAILURES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_remote_handler_error() {
        let world = World::new(Behavior::Fail("handler exploded".into()), Placement::Detached);

        let err = world
            .messenger
            .send(&world.child_id(), "ping", json!({}), to_child())
            .await
            .unwrap_err();

        match err {
            SendError::Remote { message, .. } => assert_eq!(message, "handler exploded"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_endpoint_ack_timeout() {
        let world = World::new(Behavior::Silent, Placement::Detached);
        let start = Instant::now();

        let err = world
            .messenger
            .send(&world.child_id(), "ping", json!({}), to_child())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), SendErrorKind::AckTimeout);
        assert!(start.elapsed() >= Duration::from_millis(2_000));
        assert_eq!(world.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_misaddressed_origin_is_dropped_silently() {
        let world = World::new(Behavior::Echo, Placement::Detached);

        let err = world
            .messenger
            .send(
                &world.child_id(),
                "ping",
                json!({}),
                SendOptions::new().with_origin("https://imposter.example"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), SendErrorKind::AckTimeout);
        assert_eq!(world.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_origin_set_excluding_endpoint() {
        let world = World::new(Behavior::Echo, Placement::Detached);

        let err = world
            .messenger
            .send(
                &world.child_id(),
                "ping",
                json!({}),
                SendOptions::new().with_origin(OriginPattern::set([
                    "https://a.example",
                    "https://b.example",
                ])),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), SendErrorKind::OriginMismatch);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(world.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_without_response_times_out() {
        let world = World::new(Behavior::AckOnly, Placement::Detached);
        let start = Instant::now();

        let err = world
            .messenger
            .send(&world.child_id(), "ping", json!({}), to_child().with_timeout_ms(3_000))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), SendErrorKind::ResponseTimeout);
        assert!(start.elapsed() >= Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_timeout_is_ignored() {
        let world = World::new(Behavior::Slow(Duration::from_secs(8)), Placement::Detached);

        let err = world
            .messenger
            .send(&world.child_id(), "ping", json!({}), to_child().with_timeout_ms(5_000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), SendErrorKind::ResponseTimeout);

        sleep(Duration::from_secs(5)).await;
        let stats = world.messenger.registry().stats();
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), 0);
        assert_eq!(stats.total_timeouts.load(Ordering::Relaxed), 1);
        assert!(world.messenger.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contained_endpoint_not_listening() {
        let world = World::new(Behavior::Echo, Placement::Contained);
        world.network.set_listening(world.child.id(), false);
        let start = Instant::now();

        let err = world
            .messenger
            .send(&world.child_id(), "ping", json!({}), SendOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), SendErrorKind::HandshakeTimeout);
        assert!(start.elapsed() >= Duration::from_millis(5_000));
        assert_eq!(world.seen.load(Ordering::SeqCst), 0);
    }

    // =============================================================================
    // CANCELLATION AND TEARDOWN
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_another_task() {
        let world = World::new(Behavior::AckOnly, Placement::Detached);
        let pending = world
            .messenger
            .dispatch(&world.child_id(), "ping", json!({}), to_child())
            .await
            .unwrap();

        let handle = pending.cancel_handle();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });

        let start = Instant::now();
        let err = pending.wait().await.unwrap_err();
        assert_eq!(err.kind(), SendErrorKind::Cancelled);
        assert!(start.elapsed() <= Duration::from_millis(1_500));
        assert!(world.messenger.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_rejects_everything_in_flight() {
        let world = World::new(Behavior::AckOnly, Placement::Detached);

        let mut pending = Vec::new();
        for _ in 0..3 {
            pending.push(
                world
                    .messenger
                    .dispatch(&world.child_id(), "ping", json!({}), to_child())
                    .await
                    .unwrap(),
            );
        }

        // Let the acks arrive
        sleep(Duration::from_millis(10)).await;
        assert_eq!(world.teardown_child(), 3);

        for p in pending {
            match p.wait().await.unwrap_err() {
                SendError::TargetUnreachable { phase, .. } => {
                    assert_eq!(phase, Phase::BeforeResponse)
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(world.messenger.registry().tracked(&world.child_id()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_endpoint_detected_by_tick() {
        let world = World::new(Behavior::Silent, Placement::Detached);
        let pending = world
            .messenger
            .dispatch(&world.child_id(), "ping", json!({}), to_child())
            .await
            .unwrap();

        world.network.teardown(world.child.id());
        let start = Instant::now();

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(
            err,
            SendError::TargetUnreachable {
                phase: Phase::BeforeAck,
                ..
            }
        ));
        assert!(start.elapsed() <= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_to_torn_down_endpoint() {
        let world = World::new(Behavior::Echo, Placement::Detached);
        world.teardown_child();

        let err = world
            .messenger
            .send(&world.child_id(), "ping", json!({}), to_child())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SendError::TargetUnreachable {
                phase: Phase::BeforeSend,
                ..
            }
        ));
    }
}
