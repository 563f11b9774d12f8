//! Walk simulation: three walkers on one in-process relay.
//!
//! Shows matchmaking overflow into the next room, a pause with a dropped
//! socket followed by a silent rejoin, an unattended drop recovered by the
//! coordinator, and a relay outage ending in `reconnect_exhausted`. Every
//! error event is printed as the JSON a UI bridge would receive.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use petwalk::prelude::*;
use petwalk::session::SessionError;
use petwalk::transport::{LoopbackConfig, LoopbackHub};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Engine stand-ins
// ---------------------------------------------------------------------------

/// Prints spawns and remembers which peer is the local one.
struct ConsoleSpawner {
    walker: &'static str,
    next: u64,
    local_peer: Arc<Mutex<Option<PeerId>>>,
}

impl EntitySpawner for ConsoleSpawner {
    fn spawn(&mut self, request: SpawnRequest) -> Option<EntityHandle> {
        self.next += 1;
        let handle = EntityHandle::new(self.next);
        if request.kind == EntityKind::Player {
            if let Ok(mut local) = self.local_peer.lock() {
                *local = Some(request.owner);
            }
        }
        println!(
            "  [{}] spawn {:?} {handle} for {} at {:.1?}",
            self.walker, request.kind, request.owner, request.pose.position
        );
        Some(handle)
    }

    fn despawn(&mut self, entity: EntityHandle) {
        println!("  [{}] despawn {entity}", self.walker);
    }
}

struct ConsoleWiring(&'static str);

impl LocalEntityWiring for ConsoleWiring {
    fn link_companion_follow(&mut self, companion: EntityHandle, player: EntityHandle) {
        println!("  [{}] {companion} follows {player}", self.0);
    }

    fn set_camera_targets(&mut self, _companion: EntityHandle, _player: EntityHandle) {}

    fn bind_movement_input(&mut self, player: EntityHandle) {
        println!("  [{}] input bound to {player}", self.0);
    }
}

struct Walker {
    name: &'static str,
    client: WalkClient,
    local_peer: Arc<Mutex<Option<PeerId>>>,
}

impl Walker {
    fn new(name: &'static str, hub: &LoopbackHub, policy: SessionPolicy) -> Self {
        let local_peer = Arc::new(Mutex::new(None));
        let spawner = ConsoleSpawner {
            walker: name,
            next: 0,
            local_peer: Arc::clone(&local_peer),
        };
        let spawn = SpawnCoordinator::new(SpawnLayout::default(), spawner, ConsoleWiring(name))
            .with_display_name(name);
        let client = WalkClient::builder(hub.transport(), spawn)
            .policy(policy)
            .build();
        print_errors(name, &client);
        Self {
            name,
            client,
            local_peer,
        }
    }

    fn room(&self) -> Option<String> {
        self.client.snapshot().session_name
    }

    fn peer(&self) -> Option<PeerId> {
        self.local_peer.lock().ok().and_then(|peer| *peer)
    }

    async fn wait_until(
        &self,
        condition: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<(), PetwalkError> {
        self.client
            .coordinator()
            .watch()
            .wait_for(condition)
            .await
            .map_err(|_| SessionError::Unavailable)?;
        Ok(())
    }
}

/// Prints every error the walker's notifier raises, as JSON.
fn print_errors(name: &'static str, client: &WalkClient) {
    let mut errors = client.subscribe_errors();
    tokio::spawn(async move {
        while let Ok(notice) = errors.recv().await {
            let ErrorNotice::Raised(event) = notice else {
                continue;
            };
            match serde_json::to_string(&event) {
                Ok(json) => println!("  [{name}] error {json}"),
                Err(err) => warn!(error = %err, "error event not serializable"),
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), PetwalkError> {
    init_tracing("warn,walk_sim=info");

    let hub = LoopbackHub::new(LoopbackConfig {
        join_latency: Duration::from_millis(50),
    });
    // Two per room so the third walker overflows; short waits so the
    // outage at the end finishes quickly.
    let policy = SessionPolicy {
        max_players: 2,
        reconnect_base_interval: Duration::from_millis(250),
        connection_timeout: Duration::from_secs(5),
        background_rejoin_threshold: Duration::from_secs(3),
        ..Default::default()
    };

    println!("== matchmaking");
    let mut walkers = Vec::new();
    for name in ["Mochi", "Biscuit", "Pepper"] {
        let walker = Walker::new(name, &hub, policy.clone());
        let joined = walker.client.join(None).await?;
        println!("{name}: joined={joined} room={:?}", walker.room());
        walkers.push(walker);
    }
    for room in hub.room_names() {
        println!("{room}: {} walkers", hub.room_population(&room));
    }

    println!("== background pause with a dropped socket");
    let mochi = &mut walkers[0];
    if let (Some(room), Some(peer)) = (mochi.room(), mochi.peer()) {
        mochi.client.app_paused(true);
        hub.drop_peer(&room, peer);
        mochi
            .wait_until(|s| s.state == ConnectionState::Disconnected)
            .await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        match mochi.client.app_paused(false) {
            ResumeOutcome::Rejoining(handle) => {
                let rejoined = handle.await.unwrap_or(false);
                println!("{}: rejoined={rejoined} room={:?}", mochi.name, mochi.room());
            }
            other => println!("{}: resume -> {other:?}", mochi.name),
        }
    }

    println!("== unattended drop");
    let biscuit = &walkers[1];
    if let (Some(room), Some(peer)) = (biscuit.room(), biscuit.peer()) {
        hub.drop_peer(&room, peer);
        biscuit
            .wait_until(|s| s.state != ConnectionState::Connected)
            .await?;
        biscuit
            .wait_until(|s| s.state == ConnectionState::Connected)
            .await?;
        println!("{}: recovered room={:?}", biscuit.name, biscuit.room());
    }

    println!("== relay outage");
    let pepper = &walkers[2];
    pepper.client.leave().await?;
    pepper
        .wait_until(|s| s.state == ConnectionState::Disconnected)
        .await?;
    hub.set_online(false);
    let joined = pepper.client.join(Some("WalkRoom_private")).await?;
    println!("{}: joined={joined} while offline", pepper.name);
    hub.set_online(true);

    for walker in walkers {
        walker.client.leave().await?;
        info!(walker = walker.name, "left");
        walker.client.shutdown().await?;
    }
    Ok(())
}
