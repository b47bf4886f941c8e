//! Playback-session core: the ingestion state machine (C4) driving an RTMP
//! transport and the video/audio decode pipeline into a `RendererSink`
//! (spec.md §1). Everything platform-specific (RTMP wire protocol, hardware
//! decode) lives behind `rtmp-transport` and `media-pipeline`; this crate is
//! purely the session logic joining them.

pub mod config;
mod error;
mod perf_monitor;
mod reconnect;
mod renderer;
mod sample;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use error::PlaybackError;
pub use perf_monitor::{global as global_performance_monitor, PerformanceMonitor};
pub use renderer::RendererSink;
pub use sample::{DecodedSample, Media};
pub use session::PlaybackSession;
pub use state::{PlayingSince, SessionState};
pub use stats::Stats;

pub use rtmp_transport::RtmpUrl;
