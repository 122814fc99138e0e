//! Peer networking - wire types, channel transport, room relay, sync

pub mod memory;
pub mod protocol;
pub mod sync;
pub mod transport;

pub use memory::RelayHub;
pub use protocol::{PlayerId, PlayerSnapshot, ShootEvent, Vec3};
pub use sync::NetworkSync;
pub use transport::{ChannelCommand, ChannelEvent, ChannelHandle, TransportError};
