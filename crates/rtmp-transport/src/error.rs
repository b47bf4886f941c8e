use thiserror::Error;

/// Errors surfaced by the transport adapter itself (handshake, socket I/O,
/// malformed RTMP session traffic). These are distinct from the higher-level
/// `PlaybackError` taxonomy in `playback-session` — the session maps a
/// `TransportError` onto `PlaybackError::TransportFailed`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid rtmp url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("rtmp session error: {0}")]
    Session(String),

    #[error("connection closed by peer")]
    Closed,
}
