//! RTMP player-side transport: handshake, client session, and FLV tag
//! parsing (spec.md §1: "the RTMP transport/handshake library" is treated
//! as an external collaborator by the core — this crate is that
//! collaborator's one concrete, real implementation, built on `rml_rtmp`).

mod client_session;
pub mod error;
pub mod events;
pub mod flv;
mod handshake;
pub mod url;

mod connect;

pub use error::TransportError;
pub use events::{EventStreams, MetaData, Statistics, Status};
pub use url::RtmpUrl;

use tokio::task::JoinHandle;

/// Handle to a running playback attempt's connect-and-pump task. The six
/// event streams it feeds are returned separately by `connect` — a
/// consumer that holds both a `Transport` and its `EventStreams` in one
/// struct can never select over individual streams without a partial move,
/// so the two are split at the API boundary instead.
pub struct Transport {
    task: JoinHandle<Result<(), TransportError>>,
}

impl Transport {
    /// Start connecting to `url` and playing its stream key. Returns
    /// immediately; the connection is driven by a spawned task (spec.md
    /// §5: "spawns one consumer task per external stream" — the socket
    /// pump itself is the producer side of all six).
    pub fn connect(url: RtmpUrl) -> (Self, EventStreams) {
        let (senders, streams) = events::channel();
        let task = tokio::spawn(async move {
            let result = connect::run(url, senders.clone()).await;
            if let Err(ref e) = result {
                let _ = senders.error.send(e.to_string()).await;
            }
            result
        });

        (Transport { task }, streams)
    }

    /// Abort the connection task. Idempotent — aborting a finished task is
    /// a no-op (spec.md §5: "`stop()` ... aborts all stream tasks").
    pub fn invalidate(&self) {
        self.task.abort();
    }
}
