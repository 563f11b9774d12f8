//! Integration tests for the loopback relay.
//!
//! Several transports share one hub, the same way several phones share
//! one relay. We drive them directly (no coordinator) and inspect the
//! callbacks each one receives.

#[cfg(feature = "loopback")]
mod loopback {
    use std::time::Duration;

    use petwalk_transport::{
        AttemptId, DisconnectReason, EventSink, LoopbackConfig, LoopbackHub, PeerId,
        ShutdownReason, StartArgs, Transport, TransportError, TransportEvent,
        TransportEventKind, TransportSession,
    };
    use tokio::sync::mpsc;

    fn args(room: &str, max_players: u32) -> StartArgs {
        StartArgs {
            session_name: room.to_string(),
            max_players,
            tick_rate: 30,
            region: "jp".to_string(),
            empty_room_ttl: Duration::from_secs(300),
            player_ttl: Duration::from_secs(60),
        }
    }

    fn sink(attempt: u64) -> (EventSink, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink::new(AttemptId::new(attempt), tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEventKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }

    #[tokio::test]
    async fn test_start_first_peer_hears_itself_as_local() {
        let hub = LoopbackHub::new(LoopbackConfig::default());
        let (events, mut rx) = sink(1);

        let session = hub
            .transport()
            .start(args("room", 4), events)
            .await
            .expect("start should succeed");

        assert_eq!(session.local_peer(), PeerId::new(1));
        assert!(session.is_running());
        assert_eq!(session.info().player_count, 1);
        assert_eq!(
            drain(&mut rx),
            vec![
                TransportEventKind::ConnectedToServer,
                TransportEventKind::PeerJoined {
                    peer: PeerId::new(1),
                    local: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_start_second_peer_fans_out_joins() {
        let hub = LoopbackHub::new(LoopbackConfig::default());
        let (first_events, mut first_rx) = sink(1);
        let (second_events, mut second_rx) = sink(2);

        let _first = hub
            .transport()
            .start(args("room", 4), first_events)
            .await
            .unwrap();
        drain(&mut first_rx);
        let second = hub
            .transport()
            .start(args("room", 4), second_events)
            .await
            .unwrap();

        assert_eq!(second.local_peer(), PeerId::new(2));
        assert_eq!(
            drain(&mut first_rx),
            vec![TransportEventKind::PeerJoined {
                peer: PeerId::new(2),
                local: false
            }]
        );
        let second_kinds = drain(&mut second_rx);
        assert!(second_kinds.contains(&TransportEventKind::PeerJoined {
            peer: PeerId::new(1),
            local: false
        }));
        assert_eq!(
            second_kinds.last(),
            Some(&TransportEventKind::PeerJoined {
                peer: PeerId::new(2),
                local: true
            })
        );
    }

    #[tokio::test]
    async fn test_start_full_room_is_rejected() {
        let hub = LoopbackHub::new(LoopbackConfig::default());
        let (a, _a_rx) = sink(1);
        let (b, _b_rx) = sink(2);
        let _first = hub.transport().start(args("tiny", 1), a).await.unwrap();

        let result = hub.transport().start(args("tiny", 1), b).await;

        assert!(
            matches!(
                result,
                Err(TransportError::StartRejected {
                    reason: ShutdownReason::GameIsFull,
                    ..
                })
            ),
            "second peer should not fit"
        );
        assert_eq!(hub.room_population("tiny"), 1);
    }

    #[tokio::test]
    async fn test_start_offline_relay_is_unavailable() {
        let hub = LoopbackHub::new(LoopbackConfig::default());
        hub.set_online(false);
        let (events, _rx) = sink(1);

        let result = hub.transport().start(args("room", 4), events).await;

        assert!(matches!(result, Err(TransportError::Unavailable(_))));
        assert!(hub.room_names().is_empty());
    }

    #[tokio::test]
    async fn test_request_shutdown_reports_ok_and_notifies_others() {
        let hub = LoopbackHub::new(LoopbackConfig::default());
        let (a, mut a_rx) = sink(1);
        let (b, mut b_rx) = sink(2);
        let mut first = hub.transport().start(args("room", 4), a).await.unwrap();
        let _second = hub.transport().start(args("room", 4), b).await.unwrap();
        drain(&mut a_rx);
        drain(&mut b_rx);

        first.request_shutdown();

        assert!(!first.is_running());
        assert_eq!(
            drain(&mut a_rx),
            vec![TransportEventKind::Shutdown {
                reason: ShutdownReason::Ok
            }]
        );
        assert_eq!(
            drain(&mut b_rx),
            vec![TransportEventKind::PeerLeft {
                peer: PeerId::new(1)
            }]
        );
    }

    #[tokio::test]
    async fn test_drop_session_leaves_quietly_and_removes_empty_room() {
        let hub = LoopbackHub::new(LoopbackConfig::default());
        let (a, mut a_rx) = sink(1);
        let first = hub.transport().start(args("room", 4), a).await.unwrap();
        drain(&mut a_rx);

        drop(first);

        assert!(drain(&mut a_rx).is_empty(), "no shutdown callback on drop");
        assert!(hub.room_names().is_empty());
    }

    #[tokio::test]
    async fn test_drop_peer_reports_disconnect_then_shutdown() {
        let hub = LoopbackHub::new(LoopbackConfig::default());
        let (a, mut a_rx) = sink(1);
        let first = hub.transport().start(args("room", 4), a).await.unwrap();
        drain(&mut a_rx);

        assert!(hub.drop_peer("room", PeerId::new(1)));

        assert!(!first.is_running());
        assert_eq!(
            drain(&mut a_rx),
            vec![
                TransportEventKind::Disconnected {
                    reason: DisconnectReason::Timeout
                },
                TransportEventKind::Shutdown {
                    reason: ShutdownReason::ConnectionTimeout
                },
            ]
        );
        assert!(!hub.drop_peer("room", PeerId::new(1)), "already gone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_latency_delays_start() {
        let hub = LoopbackHub::new(LoopbackConfig {
            join_latency: Duration::from_millis(250),
        });
        let (events, _rx) = sink(1);
        let started = tokio::time::Instant::now();

        let _session = hub.transport().start(args("room", 4), events).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
