//! Room channel transport seam
//!
//! A session talks to its room through a pair of queues: commands out,
//! events in. Anything that services the far ends (the in-memory relay,
//! or a real presence backend) can hand out a `ChannelHandle`.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::net::protocol::PlayerId;

/// Commands a session issues against its room channel
#[derive(Debug, Clone)]
pub enum ChannelCommand {
    /// Publish (or replace) this peer's presence payload
    Track(Value),
    /// Broadcast a named event to every other subscriber
    Broadcast { event: String, payload: Value },
    /// Leave the room, removing presence
    Unsubscribe,
}

/// Events a room channel delivers to a subscriber
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Full presence state of the room, keyed by peer
    PresenceSync(HashMap<PlayerId, Value>),
    /// A broadcast from another subscriber
    Broadcast {
        sender: PlayerId,
        event: String,
        payload: Value,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Room channel closed")]
    Closed,
}

/// Subscriber end of one room channel
pub struct ChannelHandle {
    room: String,
    commands: mpsc::Sender<ChannelCommand>,
    events: mpsc::Receiver<ChannelEvent>,
}

impl ChannelHandle {
    pub fn from_parts(
        room: impl Into<String>,
        commands: mpsc::Sender<ChannelCommand>,
        events: mpsc::Receiver<ChannelEvent>,
    ) -> Self {
        Self {
            room: room.into(),
            commands,
            events,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Publish this peer's presence payload
    pub async fn track(&self, payload: Value) -> Result<(), TransportError> {
        self.commands
            .send(ChannelCommand::Track(payload))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Broadcast a named event to the other subscribers
    pub async fn broadcast(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        self.commands
            .send(ChannelCommand::Broadcast {
                event: event.to_string(),
                payload,
            })
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Next event from the room. `None` once the channel has shut down.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Leave the room. Best effort: a channel that is already gone
    /// counts as left.
    pub async fn unsubscribe(self) {
        let _ = self.commands.send(ChannelCommand::Unsubscribe).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn handle_forwards_commands_and_surfaces_events() {
        tokio_test::block_on(async {
            let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
            let (event_tx, event_rx) = mpsc::channel(8);
            let mut handle = ChannelHandle::from_parts("room-1", cmd_tx, event_rx);

            assert_eq!(handle.room(), "room-1");

            handle
                .track(serde_json::json!({ "hp": 100 }))
                .await
                .unwrap();
            match cmd_rx.recv().await.unwrap() {
                ChannelCommand::Track(v) => assert_eq!(v["hp"], 100),
                other => panic!("unexpected command: {other:?}"),
            }

            let sender = Uuid::new_v4();
            event_tx
                .send(ChannelEvent::Broadcast {
                    sender,
                    event: "shoot".into(),
                    payload: Value::Null,
                })
                .await
                .unwrap();
            match handle.recv().await.unwrap() {
                ChannelEvent::Broadcast { sender: s, event, .. } => {
                    assert_eq!(s, sender);
                    assert_eq!(event, "shoot");
                }
                other => panic!("unexpected event: {other:?}"),
            }
        });
    }

    #[test]
    fn track_fails_once_the_far_end_is_gone() {
        tokio_test::block_on(async {
            let (cmd_tx, cmd_rx) = mpsc::channel(1);
            let (_event_tx, event_rx) = mpsc::channel::<ChannelEvent>(1);
            drop(cmd_rx);
            let handle = ChannelHandle::from_parts("room-1", cmd_tx, event_rx);
            assert!(matches!(
                handle.track(Value::Null).await,
                Err(TransportError::Closed)
            ));
        });
    }
}
