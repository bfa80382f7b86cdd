//! Peer synchronization: wire protocol, remote registry, transport, relay

pub mod handler;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod transport;

pub use handler::SyncHandler;
pub use protocol::Message;
pub use relay::LoopbackRelay;
pub use transport::{ChannelTransport, RelayLink, Transport};
