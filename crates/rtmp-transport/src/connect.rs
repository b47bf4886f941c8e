use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::client_session::RtmpClientSession;
use crate::error::TransportError;
use crate::events::{EventSenders, Statistics, Status};
use crate::handshake::HandshakeState;
use crate::url::RtmpUrl;

/// Drives one playback attempt to completion: dial out, handshake, run the
/// client session, and pump bytes until the peer closes the connection or
/// an unrecoverable error occurs.
///
/// Dials out (`TcpStream::connect`) rather than accepting
/// (`TcpListener::accept`); there is exactly one connection per call.
pub async fn run(url: RtmpUrl, senders: EventSenders) -> Result<(), TransportError> {
    let _ = senders.status.send(Status::HandshakeStart).await;
    info!(addr = %url.host_port(), app = %url.app, stream_key = %url.stream_key, "connecting");

    let mut stream = TcpStream::connect(url.host_port())
        .await
        .map_err(TransportError::Io)?;

    let mut buf = vec![0u8; 4096];
    let mut handshake = HandshakeState::new();

    let p0_p1 = handshake.start()?;
    stream.write_all(&p0_p1).await.map_err(TransportError::Io)?;
    stream.flush().await.map_err(TransportError::Io)?;

    let mut bytes_received: u64 = 0;
    let started = Instant::now();

    let remaining = loop {
        let n = stream.read(&mut buf).await.map_err(TransportError::Io)?;
        if n == 0 {
            return Err(TransportError::Closed);
        }
        bytes_received += n as u64;

        let (response, maybe_remaining) = handshake.process(&buf[..n])?;
        if !response.is_empty() {
            stream.write_all(&response).await.map_err(TransportError::Io)?;
            stream.flush().await.map_err(TransportError::Io)?;
        }

        if let Some(remaining) = maybe_remaining {
            debug!("handshake complete");
            let _ = senders.status.send(Status::HandshakeDone).await;
            break remaining;
        }
    };

    let mut session = RtmpClientSession::new(&mut stream, url.app.clone(), url.stream_key.clone())
        .await?;

    if !remaining.is_empty() {
        session.handle_input(&remaining, &mut stream, &senders).await?;
    }

    let mut last_stat_report = Instant::now();
    let stat_interval = Duration::from_secs(1);

    loop {
        let n = stream.read(&mut buf).await.map_err(TransportError::Io)?;
        if n == 0 {
            warn!("connection closed by peer");
            return Err(TransportError::Closed);
        }
        bytes_received += n as u64;

        session.handle_input(&buf[..n], &mut stream, &senders).await?;

        if last_stat_report.elapsed() >= stat_interval {
            let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
            let stats = Statistics {
                bytes_received,
                bitrate_bps: (bytes_received as f64 * 8.0) / elapsed,
            };
            let _ = senders.statistics.send(stats).await;
            last_stat_report = Instant::now();
        }
    }
}
