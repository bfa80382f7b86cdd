//! Outbound side of the relay channel

use tokio::sync::mpsc;

/// Transport errors. The session treats all of them as "skip this send".
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Channel not open")]
    NotOpen,

    #[error("Channel closed by peer")]
    Closed,
}

/// Fire-and-forget sender for encoded messages. Implementations must not block.
pub trait Transport: Send {
    fn is_open(&self) -> bool;

    fn send_text(&self, text: String) -> Result<(), TransportError>;
}

/// Transport backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A transport whose channel has not been opened yet
    pub fn not_open() -> Self {
        Self { tx: None }
    }

    /// Both ends of an in-memory channel
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Transport for ChannelTransport {
    fn is_open(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn send_text(&self, text: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::NotOpen)?;
        tx.send(text).map_err(|_| TransportError::Closed)
    }
}

/// Client end of a relay connection: outbound transport plus inbound stream
pub struct RelayLink {
    pub transport: ChannelTransport,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_until_receiver_dropped() {
        let (transport, mut rx) = ChannelTransport::pair();
        assert!(transport.is_open());
        transport.send_text("hello".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hello");

        drop(rx);
        assert!(!transport.is_open());
        assert!(matches!(transport.send_text("x".to_string()), Err(TransportError::Closed)));
    }

    #[test]
    fn unopened_transport_refuses() {
        let transport = ChannelTransport::not_open();
        assert!(!transport.is_open());
        assert!(matches!(transport.send_text("x".to_string()), Err(TransportError::NotOpen)));
    }
}
