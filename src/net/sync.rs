//! Peer state synchronization over a room channel
//!
//! Keeps the local mirror of the room: a presence-backed map of player
//! snapshots, and short-lived shoot events for tracer rendering. All
//! transport failures are swallowed with a warning; the next sync or
//! broadcast supersedes anything that was lost.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::game::catalog::WeaponKind;
use crate::net::protocol::{PlayerId, PlayerSnapshot, ShootEvent, Vec3, SHOOT_EVENT};
use crate::net::transport::{ChannelEvent, ChannelHandle};
use crate::util::rate_limit::PresenceLimiter;
use crate::util::time::unix_millis;

/// How long a shoot event stays visible for tracer rendering
pub const TRACER_WINDOW: Duration = Duration::from_secs(1);

/// A shoot event held for its display window
#[derive(Debug, Clone)]
pub struct Tracer {
    pub event: ShootEvent,
    expires_at: Instant,
}

pub struct NetworkSync {
    local_id: PlayerId,
    channel: ChannelHandle,
    peers: HashMap<PlayerId, PlayerSnapshot>,
    tracers: Vec<Tracer>,
    limiter: PresenceLimiter,
}

impl NetworkSync {
    /// Enter a room over an already subscribed channel and announce
    /// the local player with a spawn presence payload.
    pub async fn join(channel: ChannelHandle, local_id: PlayerId) -> Self {
        let sync = Self {
            local_id,
            channel,
            peers: HashMap::new(),
            tracers: Vec::new(),
            limiter: PresenceLimiter::new(),
        };
        sync.track_snapshot(&PlayerSnapshot::spawn(local_id)).await;
        sync
    }

    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    pub fn room(&self) -> &str {
        self.channel.room()
    }

    /// All known presences, the local player included
    pub fn peers(&self) -> &HashMap<PlayerId, PlayerSnapshot> {
        &self.peers
    }

    /// Presences of everyone except the local player
    pub fn remote_players(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        let local_id = self.local_id;
        self.peers.values().filter(move |snap| snap.id != local_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Shoot events still inside their display window
    pub fn tracers(&self) -> &[Tracer] {
        &self.tracers
    }

    /// Re-publish the local transform. Calls over the presence rate
    /// quota are skipped; the next allowed call carries fresher state
    /// anyway.
    pub async fn publish_transform(&mut self, position: Vec3, rotation: Vec3) {
        if !self.limiter.check() {
            return;
        }
        let snapshot = PlayerSnapshot::transform(self.local_id, position, rotation);
        self.track_snapshot(&snapshot).await;
    }

    /// Broadcast one fired shot to the other subscribers. Returns the
    /// event so the caller can render its own tracer immediately.
    pub async fn broadcast_shoot(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        weapon: WeaponKind,
    ) -> ShootEvent {
        let event = ShootEvent {
            player_id: self.local_id,
            origin,
            direction,
            weapon,
            timestamp: unix_millis(),
        };
        match serde_json::to_value(&event) {
            Ok(value) => {
                if let Err(error) = self.channel.broadcast(SHOOT_EVENT, value).await {
                    warn!(player_id = %self.local_id, %error, "Failed to broadcast shot");
                }
            }
            Err(error) => {
                warn!(player_id = %self.local_id, %error, "Failed to encode shoot event");
            }
        }
        event
    }

    /// Next raw event from the room channel
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.channel.recv().await
    }

    /// Fold one channel event into the local mirror.
    ///
    /// Presence syncs replace the peer map wholesale, so departures
    /// need no separate bookkeeping. Entries that fail to decode are
    /// dropped from this sync only.
    pub fn apply_event(&mut self, event: ChannelEvent, now: Instant) {
        match event {
            ChannelEvent::PresenceSync(state) => {
                let mut peers = HashMap::with_capacity(state.len());
                for (id, value) in state {
                    match serde_json::from_value::<PlayerSnapshot>(value) {
                        Ok(snapshot) => {
                            peers.insert(id, snapshot);
                        }
                        Err(error) => {
                            warn!(peer_id = %id, %error, "Discarding undecodable presence entry");
                        }
                    }
                }
                self.peers = peers;
            }
            ChannelEvent::Broadcast {
                sender,
                event,
                payload,
            } if event == SHOOT_EVENT => match serde_json::from_value::<ShootEvent>(payload) {
                Ok(shot) => {
                    self.tracers.push(Tracer {
                        event: shot,
                        expires_at: now + TRACER_WINDOW,
                    });
                }
                Err(error) => {
                    warn!(peer_id = %sender, %error, "Discarding undecodable shoot event");
                }
            },
            ChannelEvent::Broadcast { sender, event, .. } => {
                debug!(peer_id = %sender, event = %event, "Ignoring unknown broadcast event");
            }
        }
    }

    /// Drop tracers whose display window has passed
    pub fn expire_tracers(&mut self, now: Instant) {
        self.tracers.retain(|tracer| tracer.expires_at > now);
    }

    /// Leave the room, removing the local presence for every peer
    pub async fn leave(self) {
        self.channel.unsubscribe().await;
    }

    async fn track_snapshot(&self, snapshot: &PlayerSnapshot) {
        match serde_json::to_value(snapshot) {
            Ok(value) => {
                if let Err(error) = self.channel.track(value).await {
                    warn!(player_id = %self.local_id, %error, "Failed to publish presence");
                }
            }
            Err(error) => {
                warn!(player_id = %self.local_id, %error, "Failed to encode presence payload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::transport::ChannelCommand;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn test_channel() -> (
        ChannelHandle,
        mpsc::Receiver<ChannelCommand>,
        mpsc::Sender<ChannelEvent>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        (
            ChannelHandle::from_parts("arena", cmd_tx, event_rx),
            cmd_rx,
            event_tx,
        )
    }

    fn snapshot_value(id: PlayerId, x: f32) -> serde_json::Value {
        serde_json::to_value(PlayerSnapshot {
            id,
            position: Vec3::new(x, 1.0, 0.0),
            rotation: Vec3::ZERO,
            health: 100.0,
            timestamp: unix_millis(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn join_announces_spawn_presence() {
        let (channel, mut cmd_rx, _event_tx) = test_channel();
        let id = Uuid::new_v4();
        let _sync = NetworkSync::join(channel, id).await;

        match cmd_rx.recv().await.unwrap() {
            ChannelCommand::Track(value) => {
                let snap: PlayerSnapshot = serde_json::from_value(value).unwrap();
                assert_eq!(snap.id, id);
                assert_eq!(snap.position, Vec3::new(0.0, 1.0, 0.0));
                assert_eq!(snap.health, 100.0);
            }
            other => panic!("expected initial track, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn presence_sync_replaces_the_peer_map_wholesale() {
        let (channel, _cmd_rx, _event_tx) = test_channel();
        let local = Uuid::new_v4();
        let mut sync = NetworkSync::join(channel, local).await;
        let now = Instant::now();

        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut state = HashMap::new();
        state.insert(p1, snapshot_value(p1, 1.0));
        state.insert(local, snapshot_value(local, 0.0));
        sync.apply_event(ChannelEvent::PresenceSync(state), now);
        assert_eq!(sync.peer_count(), 2);
        assert!(sync.peers().contains_key(&p1));

        // Next sync omits p1 entirely: it must vanish, p2 appears
        let mut state = HashMap::new();
        state.insert(p2, snapshot_value(p2, 2.0));
        sync.apply_event(ChannelEvent::PresenceSync(state), now);
        assert_eq!(sync.peer_count(), 1);
        assert!(!sync.peers().contains_key(&p1));
        assert!(sync.peers().contains_key(&p2));
    }

    #[tokio::test]
    async fn undecodable_presence_entries_are_skipped() {
        let (channel, _cmd_rx, _event_tx) = test_channel();
        let mut sync = NetworkSync::join(channel, Uuid::new_v4()).await;

        let good = Uuid::new_v4();
        let mut state = HashMap::new();
        state.insert(good, snapshot_value(good, 1.0));
        state.insert(Uuid::new_v4(), serde_json::json!({ "garbage": true }));
        sync.apply_event(ChannelEvent::PresenceSync(state), Instant::now());

        assert_eq!(sync.peer_count(), 1);
        assert!(sync.peers().contains_key(&good));
    }

    #[tokio::test]
    async fn remote_players_excludes_the_local_entry() {
        let (channel, _cmd_rx, _event_tx) = test_channel();
        let local = Uuid::new_v4();
        let mut sync = NetworkSync::join(channel, local).await;

        let other = Uuid::new_v4();
        let mut state = HashMap::new();
        state.insert(local, snapshot_value(local, 0.0));
        state.insert(other, snapshot_value(other, 5.0));
        sync.apply_event(ChannelEvent::PresenceSync(state), Instant::now());

        let remotes: Vec<_> = sync.remote_players().collect();
        assert_eq!(remotes.len(), 1);
        assert_eq!(remotes[0].id, other);
    }

    #[tokio::test]
    async fn shoot_broadcasts_become_tracers_until_the_window_passes() {
        let (channel, _cmd_rx, _event_tx) = test_channel();
        let mut sync = NetworkSync::join(channel, Uuid::new_v4()).await;
        let now = Instant::now();

        let shooter = Uuid::new_v4();
        let shot = ShootEvent {
            player_id: shooter,
            origin: Vec3::new(0.0, 1.5, 0.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
            weapon: WeaponKind::Sniper,
            timestamp: unix_millis(),
        };
        sync.apply_event(
            ChannelEvent::Broadcast {
                sender: shooter,
                event: SHOOT_EVENT.to_string(),
                payload: serde_json::to_value(&shot).unwrap(),
            },
            now,
        );
        assert_eq!(sync.tracers().len(), 1);
        assert_eq!(sync.tracers()[0].event.weapon, WeaponKind::Sniper);

        sync.expire_tracers(now + Duration::from_millis(900));
        assert_eq!(sync.tracers().len(), 1);
        sync.expire_tracers(now + Duration::from_millis(1100));
        assert!(sync.tracers().is_empty());
    }

    #[tokio::test]
    async fn unknown_broadcast_events_are_ignored() {
        let (channel, _cmd_rx, _event_tx) = test_channel();
        let mut sync = NetworkSync::join(channel, Uuid::new_v4()).await;
        sync.apply_event(
            ChannelEvent::Broadcast {
                sender: Uuid::new_v4(),
                event: "emote".to_string(),
                payload: serde_json::json!({ "kind": "wave" }),
            },
            Instant::now(),
        );
        assert!(sync.tracers().is_empty());
        assert_eq!(sync.peer_count(), 0);
    }

    #[tokio::test]
    async fn publish_transform_tracks_the_new_pose() {
        let (channel, mut cmd_rx, _event_tx) = test_channel();
        let id = Uuid::new_v4();
        let mut sync = NetworkSync::join(channel, id).await;
        cmd_rx.recv().await.unwrap(); // initial spawn track

        sync.publish_transform(Vec3::new(3.0, 1.0, -4.0), Vec3::new(0.0, 1.2, 0.0))
            .await;
        match cmd_rx.recv().await.unwrap() {
            ChannelCommand::Track(value) => {
                let snap: PlayerSnapshot = serde_json::from_value(value).unwrap();
                assert_eq!(snap.position, Vec3::new(3.0, 1.0, -4.0));
                assert_eq!(snap.rotation, Vec3::new(0.0, 1.2, 0.0));
                assert_eq!(snap.health, 100.0);
            }
            other => panic!("expected transform track, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_shoot_returns_the_local_event() {
        let (channel, mut cmd_rx, _event_tx) = test_channel();
        let id = Uuid::new_v4();
        let mut sync = NetworkSync::join(channel, id).await;
        cmd_rx.recv().await.unwrap();

        let event = sync
            .broadcast_shoot(
                Vec3::new(0.0, 1.5, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                WeaponKind::Pistol,
            )
            .await;
        assert_eq!(event.player_id, id);
        assert_eq!(event.weapon, WeaponKind::Pistol);

        match cmd_rx.recv().await.unwrap() {
            ChannelCommand::Broadcast { event, payload } => {
                assert_eq!(event, SHOOT_EVENT);
                assert_eq!(payload["weapon"], "pistol");
            }
            other => panic!("expected broadcast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn leave_unsubscribes_from_the_room() {
        let (channel, mut cmd_rx, _event_tx) = test_channel();
        let sync = NetworkSync::join(channel, Uuid::new_v4()).await;
        cmd_rx.recv().await.unwrap();

        sync.leave().await;
        assert!(matches!(
            cmd_rx.recv().await,
            Some(ChannelCommand::Unsubscribe)
        ));
    }
}
