use tokio::sync::mpsc;

/// Connection/session status, as observed by the transport (spec.md §6).
/// The session (C4) only reacts to `Failed` and `PlayStart`/`Connect`; the
/// rest are informational.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    HandshakeStart,
    HandshakeDone,
    Connect,
    PlayStart,
    Failed(String),
    Disconnected,
    Unknown,
}

/// Stream metadata, derived from the RTMP `onMetaData` AMF payload. Drives
/// `RendererSink::on_video_config` (spec.md §6).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaData {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_data_rate: Option<f64>,
}

/// Transport-level statistics. No `rml_rtmp` equivalent exists for this —
/// synthesized from bytes read off the socket, to round out the six-stream
/// external interface in spec.md §6 (see DESIGN.md).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    pub bytes_received: u64,
    pub bitrate_bps: f64,
}

/// The six event streams the transport exposes to a consumer (spec.md §6),
/// one task per stream per spec.md §5's task-based concurrency model.
pub struct EventStreams {
    pub status: mpsc::Receiver<Status>,
    pub error: mpsc::Receiver<String>,
    pub video: mpsc::Receiver<(bytes::Bytes, i64)>,
    pub audio: mpsc::Receiver<(bytes::Bytes, i64)>,
    pub metadata: mpsc::Receiver<MetaData>,
    pub statistics: mpsc::Receiver<Statistics>,
}

/// The sender half, held by the connection-pump task and cloned across the
/// handshake/session machinery that produces each kind of event.
#[derive(Clone)]
pub struct EventSenders {
    pub status: mpsc::Sender<Status>,
    pub error: mpsc::Sender<String>,
    pub video: mpsc::Sender<(bytes::Bytes, i64)>,
    pub audio: mpsc::Sender<(bytes::Bytes, i64)>,
    pub metadata: mpsc::Sender<MetaData>,
    pub statistics: mpsc::Sender<Statistics>,
}

/// Channel capacity for each event stream. Bounded, per spec.md §5
/// ("submission is bounded: submission blocks until the decoder accepts the
/// unit") — backpressure on the media channels naturally throttles the
/// socket-read loop rather than buffering unboundedly in memory.
const CHANNEL_CAPACITY: usize = 64;

pub fn channel() -> (EventSenders, EventStreams) {
    let (status_tx, status_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (error_tx, error_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (video_tx, video_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (audio_tx, audio_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (metadata_tx, metadata_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (statistics_tx, statistics_rx) = mpsc::channel(CHANNEL_CAPACITY);

    (
        EventSenders {
            status: status_tx,
            error: error_tx,
            video: video_tx,
            audio: audio_tx,
            metadata: metadata_tx,
            statistics: statistics_tx,
        },
        EventStreams {
            status: status_rx,
            error: error_rx,
            video: video_rx,
            audio: audio_rx,
            metadata: metadata_rx,
            statistics: statistics_rx,
        },
    )
}
