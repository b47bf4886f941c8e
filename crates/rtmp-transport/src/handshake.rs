use bytes::Bytes;
use rml_rtmp::handshake::{Handshake, HandshakeProcessResult, PeerType};

use crate::error::TransportError;

/// Drives the RTMP handshake to completion, returning any leftover bytes
/// that belong to the RTMP session (post-handshake data).
///
/// Uses `PeerType::Client` — this crate dials out to a server rather than
/// accepting publishers.
pub struct HandshakeState {
    inner: Handshake,
    completed: bool,
}

impl HandshakeState {
    pub fn new() -> Self {
        Self {
            inner: Handshake::new(PeerType::Client),
            completed: false,
        }
    }

    /// Bytes the client must send first to kick off the handshake.
    pub fn start(&mut self) -> Result<Bytes, TransportError> {
        self.inner
            .generate_outbound_p0_and_p1()
            .map(Bytes::from)
            .map_err(|e| TransportError::Handshake(format!("{e:?}")))
    }

    /// Process incoming bytes. Returns `(response_bytes, maybe_remaining)`.
    /// If `maybe_remaining` is `Some`, the handshake is complete and the
    /// bytes are leftover RTMP data to feed into the client session.
    pub fn process(&mut self, data: &[u8]) -> Result<(Bytes, Option<Bytes>), TransportError> {
        if self.completed {
            return Err(TransportError::Handshake("already completed".into()));
        }

        match self.inner.process_bytes(data) {
            Ok(HandshakeProcessResult::InProgress { response_bytes }) => {
                Ok((Bytes::from(response_bytes), None))
            }
            Ok(HandshakeProcessResult::Completed {
                response_bytes,
                remaining_bytes,
            }) => {
                self.completed = true;
                Ok((Bytes::from(response_bytes), Some(Bytes::from(remaining_bytes))))
            }
            Err(e) => Err(TransportError::Handshake(format!("{e:?}"))),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Default for HandshakeState {
    fn default() -> Self {
        Self::new()
    }
}
