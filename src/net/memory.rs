//! In-memory room relay
//!
//! Services `ChannelHandle`s for every subscriber of a named room:
//! presence tracking with full-state sync fan-out, and broadcasts that
//! skip the sender. Used by the demo binary and the integration tests;
//! a production deployment would service the same handles from a real
//! presence backend.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::net::protocol::PlayerId;
use crate::net::transport::{ChannelCommand, ChannelEvent, ChannelHandle};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Relay for any number of independent rooms
pub struct RelayHub {
    rooms: DashMap<String, Arc<Room>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Join a room as `peer`. The returned handle is live immediately
    /// and receives the room's current presence state as its first
    /// event.
    pub fn subscribe(&self, room_key: &str, peer: PlayerId) -> ChannelHandle {
        let room = self
            .rooms
            .entry(room_key.to_string())
            .or_insert_with(|| Arc::new(Room::new(room_key)))
            .clone();

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        room.subscribers.write().insert(peer, event_tx.clone());

        // Initial sync so a late joiner sees who is already here
        let state = room.presence.read().clone();
        let _ = event_tx.try_send(ChannelEvent::PresenceSync(state));

        info!(room = %room_key, peer_id = %peer, "Subscriber joined room");

        tokio::spawn(room.serve(peer, command_rx));

        ChannelHandle::from_parts(room_key, command_tx, event_rx)
    }

    /// Number of live subscribers in a room
    pub fn peer_count(&self, room_key: &str) -> usize {
        self.rooms
            .get(room_key)
            .map(|room| room.subscribers.read().len())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

struct Room {
    key: String,
    presence: RwLock<HashMap<PlayerId, Value>>,
    subscribers: RwLock<HashMap<PlayerId, mpsc::Sender<ChannelEvent>>>,
}

impl Room {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            presence: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Drive one subscriber's command stream until it unsubscribes or
    /// drops its handle. Either way the peer's presence is removed and
    /// the remaining subscribers get a fresh sync.
    async fn serve(self: Arc<Self>, peer: PlayerId, mut commands: mpsc::Receiver<ChannelCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                ChannelCommand::Track(payload) => {
                    self.presence.write().insert(peer, payload);
                    self.fan_presence();
                }
                ChannelCommand::Broadcast { event, payload } => {
                    debug!(room = %self.key, peer_id = %peer, event = %event, "Relaying broadcast");
                    self.fan(
                        ChannelEvent::Broadcast {
                            sender: peer,
                            event,
                            payload,
                        },
                        Some(peer),
                    );
                }
                ChannelCommand::Unsubscribe => break,
            }
        }

        self.subscribers.write().remove(&peer);
        let had_presence = self.presence.write().remove(&peer).is_some();
        if had_presence {
            self.fan_presence();
        }
        info!(room = %self.key, peer_id = %peer, "Subscriber left room");
    }

    fn fan_presence(&self) {
        let state = self.presence.read().clone();
        self.fan(ChannelEvent::PresenceSync(state), None);
    }

    /// Deliver an event to every subscriber except `skip`. A full
    /// queue means the subscriber is lagging; the event is dropped and
    /// presence heals on the next sync.
    fn fan(&self, event: ChannelEvent, skip: Option<PlayerId>) {
        let targets: Vec<(PlayerId, mpsc::Sender<ChannelEvent>)> = self
            .subscribers
            .read()
            .iter()
            .filter(|(id, _)| Some(**id) != skip)
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        for (peer, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(room = %self.key, peer_id = %peer, "Dropping event for lagging subscriber");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}
