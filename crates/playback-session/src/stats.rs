/// Performance snapshot handed to `RendererSink::on_statistics` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub fps: f64,
    pub total_frames: u64,
    pub dropped_frames: u64,
    pub duration_s: f64,
}
