//! Media transport trait

use async_trait::async_trait;

use crate::{AudioFrame, Result};

/// Events raised by the media transport for one call
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Stream established; carries the caller id when the carrier supplies one
    Connected { caller_id: Option<String> },
    /// Inbound caller audio
    AudioReceived(AudioFrame),
    /// Media stream ended
    Disconnected { reason: String },
}

/// Bidirectional audio channel for one call
///
/// Inbound audio arrives as [`TransportEvent`]s on a channel owned by the
/// session; outbound audio goes through `send_audio`.
#[async_trait]
pub trait MediaTransport: Send + Sync + 'static {
    /// Send synthesized audio to the caller
    ///
    /// Returns [`crate::Error::TransportClosed`] once the stream is gone.
    async fn send_audio(&self, frame: AudioFrame) -> Result<()>;

    /// Whether the media stream is still open
    fn is_connected(&self) -> bool;

    /// Hang up from our side; inbound events stop after this
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
