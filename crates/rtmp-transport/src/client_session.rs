use rml_rtmp::sessions::{
    ClientSession, ClientSessionConfig, ClientSessionEvent, ClientSessionResult,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use crate::error::TransportError;
use crate::events::{EventSenders, MetaData, Status};

/// Manages one RTMP playback session: connects, requests playback of a
/// stream key, and forwards decoded AMF events onto the six channels in
/// `EventSenders`.
///
/// Accepts `OutboundResponse`s by writing them to the socket, dispatches
/// `RaisedEvent`s, and ignores `UnhandleableMessageReceived`. The session is
/// a `ClientSession` — it issues its own connect/play requests rather than
/// accepting a publisher's.
pub struct RtmpClientSession {
    session: ClientSession,
    app_name: String,
    stream_key: String,
}

impl RtmpClientSession {
    /// Create a new client session and send the initial `connect` request.
    pub async fn new(
        stream: &mut TcpStream,
        app_name: String,
        stream_key: String,
    ) -> Result<Self, TransportError> {
        let config = ClientSessionConfig::new();
        let (mut session, initial_results) = ClientSession::new(config)
            .map_err(|e| TransportError::Session(format!("{e:?}")))?;

        write_outbound(initial_results, stream).await?;

        let connect_results = session
            .request_connection(app_name.clone())
            .map_err(|e| TransportError::Session(format!("{e:?}")))?;
        write_outbound(connect_results, stream).await?;

        debug!(app_name, "RTMP client session created, connect requested");
        Ok(Self {
            session,
            app_name,
            stream_key,
        })
    }

    /// Process incoming RTMP bytes and dispatch resulting events.
    pub async fn handle_input(
        &mut self,
        data: &[u8],
        stream: &mut TcpStream,
        senders: &EventSenders,
    ) -> Result<(), TransportError> {
        let results = self
            .session
            .handle_input(data)
            .map_err(|e| TransportError::Session(format!("{e:?}")))?;

        for result in results {
            match result {
                ClientSessionResult::OutboundResponse(packet) => {
                    stream
                        .write_all(&packet.bytes)
                        .await
                        .map_err(TransportError::Io)?;
                }
                ClientSessionResult::RaisedEvent(event) => {
                    self.handle_event(event, stream, senders).await?;
                }
                ClientSessionResult::UnhandleableMessageReceived(msg) => {
                    trace!(type_id = msg.type_id, "unhandled RTMP message");
                }
            }
        }
        stream.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    async fn handle_event(
        &mut self,
        event: ClientSessionEvent,
        stream: &mut TcpStream,
        senders: &EventSenders,
    ) -> Result<(), TransportError> {
        match event {
            ClientSessionEvent::ConnectionRequestAccepted => {
                info!(app_name = %self.app_name, "connection accepted, requesting playback");
                let _ = senders.status.send(Status::Connect).await;

                let results = self
                    .session
                    .request_playback(self.stream_key.clone())
                    .map_err(|e| TransportError::Session(format!("{e:?}")))?;
                write_outbound(results, stream).await?;
            }

            ClientSessionEvent::ConnectionRequestRejected { description } => {
                warn!(description, "connection rejected");
                let _ = senders.status.send(Status::Failed(description.clone())).await;
                let _ = senders.error.send(description).await;
            }

            ClientSessionEvent::PlaybackRequestAccepted => {
                info!(stream_key = %self.stream_key, "playback accepted");
                let _ = senders.status.send(Status::PlayStart).await;
            }

            ClientSessionEvent::PlaybackRequestRejected { description } => {
                warn!(description, "playback rejected");
                let _ = senders.status.send(Status::Failed(description.clone())).await;
                let _ = senders.error.send(description).await;
            }

            ClientSessionEvent::StreamMetadataReceived { metadata } => {
                let meta = MetaData {
                    width: metadata.video_width.map(|w| w as u32),
                    height: metadata.video_height.map(|h| h as u32),
                    video_data_rate: metadata.video_bitrate_kbps.map(|kbps| kbps as f64 * 1000.0),
                };
                debug!(?meta, "stream metadata received");
                let _ = senders.metadata.send(meta).await;
            }

            ClientSessionEvent::VideoDataReceived { data, timestamp } => {
                let _ = senders.video.send((data, timestamp.value as i64)).await;
            }

            ClientSessionEvent::AudioDataReceived { data, timestamp } => {
                let _ = senders.audio.send((data, timestamp.value as i64)).await;
            }

            other => {
                trace!(?other, "unhandled RTMP client event");
            }
        }

        Ok(())
    }
}

async fn write_outbound(
    results: Vec<ClientSessionResult>,
    stream: &mut TcpStream,
) -> Result<(), TransportError> {
    for result in results {
        if let ClientSessionResult::OutboundResponse(packet) = result {
            stream.write_all(&packet.bytes).await.map_err(TransportError::Io)?;
        }
    }
    stream.flush().await.map_err(TransportError::Io)?;
    Ok(())
}
