use thiserror::Error;

/// The error taxonomy of spec.md §7. Only `TransportFailed` and
/// `DecoderInitFailed` drive a state transition (to `error`); the rest are
/// recovered locally and only logged (spec.md §7 "Propagation").
///
/// A `thiserror` enum, carrying enough shape for the fatal/transient
/// distinction this taxonomy needs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlaybackError {
    /// Transport stream reported a failure. Fatal for the current
    /// connection attempt; triggers the reconnect policy.
    #[error("transport failed: {0}")]
    TransportFailed(String),

    /// Tag byte 0 decoded to an unsupported codec; the tag is dropped.
    #[error("unsupported codec in tag")]
    UnsupportedCodec,

    /// SPS/PPS or `AudioSpecificConfig` failed to parse; the config tag is
    /// dropped, but the stream may still play if a valid config arrives later.
    #[error("malformed codec configuration: {0}")]
    MalformedConfig(String),

    /// C2/C3 construction failed. Fatal for the current play attempt.
    #[error("decoder initialization failed: {0}")]
    DecoderInitFailed(String),

    /// A per-unit decode error. Non-fatal; increments dropped frames.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// `pause()` when not playing, `resume()` when not paused, or `play()`
    /// while already running. No-op, logged only.
    #[error("invalid state transition: {0}")]
    InvalidState(String),

    /// `restart()` called with no prior URL. No-op.
    #[error("no url to restart")]
    NoUrlToRestart,
}
