use crate::sample::DecodedSample;
use crate::state::{PlayingSince, SessionState};
use crate::stats::Stats;

/// The session's output boundary (spec.md §6 "Renderer (produced)").
///
/// A single-method-per-event delegate the session drives, per spec.md §9's
/// "Delegate / callback chains → tagged events" design note: one trait with
/// a method per event kind rather than a protocol-plus-metrics-wrapper pair.
/// All notifications are delivered on a single logical thread (spec.md §6),
/// so implementations need no internal synchronization of their own.
pub trait RendererSink: Send + 'static {
    /// A state transition occurred. `since` is only meaningful on a
    /// transition into `Playing` (SPEC_FULL.md §2/§5).
    fn on_state_change(&mut self, state: SessionState, since: Option<PlayingSince>);

    /// A decoded video frame, ready for display.
    fn on_video_sample(&mut self, sample: DecodedSample);

    /// A decoded audio packet, ready for the audio renderer.
    fn on_audio_sample(&mut self, sample: DecodedSample);

    /// Stream dimensions/bitrate derived from `onMetaData` (spec.md §6).
    fn on_video_config(&mut self, width: Option<u32>, height: Option<u32>, data_rate: Option<f64>);

    fn on_statistics(&mut self, stats: Stats);

    /// Delivered after `stop()` and after reconnect teardown, once decoders
    /// and timers have been released (spec.md §6).
    fn on_cleanup(&mut self);
}
