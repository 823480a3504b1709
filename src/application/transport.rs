// Transport port for the device link
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

/// Notification characteristics the engine listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Live,
    History,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("device disconnected")]
    Disconnected,

    #[error("subscription to {0:?} failed: {1}")]
    SubscribeFailed(Channel, String),

    #[error("command write timed out after {0:?}")]
    Timeout(Duration),
}

/// One inbound payload, or the error the link reported in its place
pub type Notification = Result<Bytes, TransportError>;

/// Push-based stream of notifications for a single channel, in arrival order
pub type NotificationStream = BoxStream<'static, Notification>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Fire-and-forget write to the command characteristic.
    ///
    /// Awaited on the engine task, which gives up after its command timeout.
    async fn write_command(&self, payload: Bytes) -> Result<(), TransportError>;

    /// Subscribe to notifications on a channel
    async fn subscribe(&self, channel: Channel) -> Result<NotificationStream, TransportError>;

    /// Drop the link; open subscriptions end
    async fn disconnect(&self);
}
