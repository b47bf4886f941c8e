use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use media_pipeline::{AacDecoder, AudioDecode, H264Decoder, VideoDecode};
use rtmp_transport::events::{MetaData, Statistics, Status};
use rtmp_transport::flv::{audio as flv_audio, video as flv_video};
use rtmp_transport::{RtmpUrl, Transport};

use crate::config::SessionConfig;
use crate::error::PlaybackError;
use crate::perf_monitor::PerformanceMonitor;
use crate::reconnect::{ReconnectTimer, MAX_RECONNECT_ATTEMPTS};
use crate::renderer::RendererSink;
use crate::sample::DecodedSample;
use crate::state::{PlayingSince, SessionState};

enum Command {
    Play(RtmpUrl),
    Restart,
    Pause,
    Resume,
    Stop(oneshot::Sender<()>),
}

/// A handle to a running C4 playback session. All state lives on a single
/// actor task (spec.md §5: "All mutation occurs on the session's logical
/// task context; external callers' methods post operations onto that
/// context"); these methods just enqueue commands.
pub struct PlaybackSession {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl PlaybackSession {
    pub fn spawn<R: RendererSink>(config: SessionConfig, renderer: R) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(Actor::new(config, renderer, rx).run());
        PlaybackSession { commands: tx, task }
    }

    /// Valid only from `idle` / `stopped` / `error` (spec.md §4.4); invalid
    /// calls are logged and otherwise ignored by the actor.
    pub async fn play(&self, url: RtmpUrl) {
        let _ = self.commands.send(Command::Play(url)).await;
    }

    /// Re-plays the last URL supplied to `play()`. No-ops with
    /// `NoUrlToRestart` if none was ever set (SPEC_FULL.md §2).
    pub async fn restart(&self) {
        let _ = self.commands.send(Command::Restart).await;
    }

    pub async fn pause(&self) {
        let _ = self.commands.send(Command::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.commands.send(Command::Resume).await;
    }

    /// Idempotent and synchronous from the caller's perspective (spec.md
    /// §5): the returned future only resolves once the actor has finished
    /// tearing down decoders and transport and notified the renderer.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Stop(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Polls `rx` if present, otherwise never resolves — lets `tokio::select!`
/// treat an absent event stream (no transport connected) as a disabled
/// branch rather than requiring a separate `if` guard per stream.
async fn recv_opt<T>(rx: Option<&mut mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Re-interprets a video tag's own bytes as an AVC sequence header by
/// forcing `avc_packet_type = 0x00` (spec.md §4.2 cold-start policy:
/// "the session attempts a best-effort recovery by treating the keyframe's
/// tag as a speculative config probe"). Real coded NALU payload essentially
/// never parses as a valid `AVCDecoderConfigurationRecord`, so this almost
/// always returns `None` — which is the documented fallback ("if parsing
/// fails, the frame is dropped").
fn cold_start_probe(data: &Bytes) -> Option<flv_video::VideoConfig> {
    if data.len() < 2 {
        return None;
    }
    let mut probe = data.to_vec();
    probe[1] = 0x00;
    match flv_video::parse_video_tag(&Bytes::from(probe), 0, 0) {
        flv_video::VideoTag::SequenceHeader(config) => Some(config),
        _ => None,
    }
}

struct Actor<R: RendererSink> {
    config: SessionConfig,
    renderer: R,
    commands: mpsc::Receiver<Command>,

    state: SessionState,
    url: Option<RtmpUrl>,
    reconnect_attempts: u32,

    transport: Option<Transport>,
    status_rx: Option<mpsc::Receiver<Status>>,
    error_rx: Option<mpsc::Receiver<String>>,
    video_rx: Option<mpsc::Receiver<(Bytes, i64)>>,
    audio_rx: Option<mpsc::Receiver<(Bytes, i64)>>,
    metadata_rx: Option<mpsc::Receiver<MetaData>>,
    statistics_rx: Option<mpsc::Receiver<Statistics>>,

    reconnect_fired: mpsc::Sender<()>,
    reconnect_rx: mpsc::Receiver<()>,
    reconnect_timer: Option<ReconnectTimer>,

    video_decoder: Option<Box<dyn VideoDecode>>,
    audio_decoder: Option<Box<dyn AudioDecode>>,
    video_config: Option<flv_video::VideoConfig>,
    audio_config: Option<flv_audio::AudioConfig>,

    first_video_ts: Option<i64>,
    first_audio_ts: Option<i64>,

    perf: PerformanceMonitor,
    video_unsupported_warned: bool,
    audio_unsupported_warned: bool,
}

impl<R: RendererSink> Actor<R> {
    fn new(config: SessionConfig, renderer: R, commands: mpsc::Receiver<Command>) -> Self {
        let (reconnect_fired, reconnect_rx) = mpsc::channel(4);
        Actor {
            config,
            renderer,
            commands,
            state: SessionState::Idle,
            url: None,
            reconnect_attempts: 0,
            transport: None,
            status_rx: None,
            error_rx: None,
            video_rx: None,
            audio_rx: None,
            metadata_rx: None,
            statistics_rx: None,
            reconnect_fired,
            reconnect_rx,
            reconnect_timer: None,
            video_decoder: None,
            audio_decoder: None,
            video_config: None,
            audio_config: None,
            first_video_ts: None,
            first_audio_ts: None,
            perf: PerformanceMonitor::new(),
            video_unsupported_warned: false,
            audio_unsupported_warned: false,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => break,
                    }
                }
                Some(()) = self.reconnect_rx.recv() => {
                    self.handle_reconnect_fired();
                }
                status = recv_opt(self.status_rx.as_mut()) => {
                    if let Some(status) = status {
                        self.handle_status(status);
                    }
                }
                err = recv_opt(self.error_rx.as_mut()) => {
                    if let Some(msg) = err {
                        self.handle_transport_error(msg);
                    }
                }
                video = recv_opt(self.video_rx.as_mut()) => {
                    if let Some((data, ts)) = video {
                        self.handle_video_tag(data, ts);
                    }
                }
                audio = recv_opt(self.audio_rx.as_mut()) => {
                    if let Some((data, ts)) = audio {
                        self.handle_audio_tag(data, ts);
                    }
                }
                meta = recv_opt(self.metadata_rx.as_mut()) => {
                    if let Some(meta) = meta {
                        self.renderer.on_video_config(meta.width, meta.height, meta.video_data_rate);
                    }
                }
                stats = recv_opt(self.statistics_rx.as_mut()) => {
                    if stats.is_some() {
                        self.renderer.on_statistics(self.perf.current_stats());
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Play(url) => {
                if !self.state.can_play() {
                    warn!(state = ?self.state, "play() invalid in current state");
                    return;
                }
                self.reconnect_attempts = 0;
                self.cancel_reconnect();
                self.start_playback(url);
            }
            Command::Restart => match self.url.clone() {
                Some(url) => {
                    self.reconnect_attempts = 0;
                    self.cancel_reconnect();
                    self.start_playback(url);
                }
                None => warn!("restart() called with no prior url"),
            },
            Command::Pause => {
                if self.state.is_playing() {
                    self.transition(SessionState::Paused, None);
                } else {
                    warn!(state = ?self.state, "pause() invalid in current state");
                }
            }
            Command::Resume => {
                if self.state.is_paused() {
                    self.transition(SessionState::Playing, None);
                } else {
                    warn!(state = ?self.state, "resume() invalid in current state");
                }
            }
            Command::Stop(ack) => {
                self.cancel_reconnect();
                self.teardown_transport();
                self.video_decoder = None;
                self.audio_decoder = None;
                self.transition(SessionState::Stopped, None);
                self.renderer.on_cleanup();
                let _ = ack.send(());
            }
        }
    }

    fn start_playback(&mut self, url: RtmpUrl) {
        self.teardown_transport();
        self.url = Some(url.clone());
        self.first_video_ts = None;
        self.first_audio_ts = None;
        self.video_decoder = None;
        self.audio_decoder = None;
        self.video_config = None;
        self.audio_config = None;
        self.video_unsupported_warned = false;
        self.audio_unsupported_warned = false;
        self.perf.start();

        let (transport, streams) = Transport::connect(url);
        self.transport = Some(transport);
        self.status_rx = Some(streams.status);
        self.error_rx = Some(streams.error);
        self.video_rx = Some(streams.video);
        self.audio_rx = Some(streams.audio);
        self.metadata_rx = Some(streams.metadata);
        self.statistics_rx = Some(streams.statistics);

        self.transition(SessionState::Connecting, None);
    }

    fn handle_reconnect_fired(&mut self) {
        let Some(url) = self.url.clone() else {
            return;
        };
        debug!(attempt = self.reconnect_attempts, "reconnect attempt firing");
        // spec.md §6: on_cleanup fires after reconnect teardown as well as
        // after stop() — decoders from the failed attempt are already gone
        // by the time `fail()` transitioned to `error`; this just notifies
        // the renderer before the next attempt's state change arrives.
        self.renderer.on_cleanup();
        self.start_playback(url);
    }

    fn handle_status(&mut self, status: Status) {
        match status {
            Status::Failed(cause) => self.fail(PlaybackError::TransportFailed(cause)),
            Status::PlayStart | Status::Connect => {
                if self.state == SessionState::Connecting {
                    self.transition(SessionState::Playing, Some(PlayingSince::PlayStartStatus));
                }
            }
            Status::Disconnected => debug!("transport reported disconnect"),
            other => trace!(?other, "status event"),
        }
    }

    /// Socket-level transport failures (TCP connect errors, a peer-closed
    /// connection, handshake/IO errors) surface only on the error stream —
    /// unlike AMF connect/playback rejections, which arrive as
    /// `Status::Failed` (spec.md §6, §7: `TransportFailed` → `error` state,
    /// triggers the reconnect policy regardless of which stream reported it).
    fn handle_transport_error(&mut self, msg: String) {
        self.fail(PlaybackError::TransportFailed(msg));
    }

    /// `TransportFailed` and `DecoderInitFailed` are the only two kinds that
    /// transition state (spec.md §7); only `TransportFailed` schedules a
    /// reconnect (spec.md §4.4 describes the retry policy purely in terms of
    /// transport errors).
    fn fail(&mut self, cause: PlaybackError) {
        let message = cause.to_string();
        warn!(error = %message, "playback error");
        self.teardown_transport();
        self.video_decoder = None;
        self.audio_decoder = None;
        self.transition(SessionState::Error(message), None);

        if matches!(cause, PlaybackError::TransportFailed(_)) && self.config.auto_reconnect {
            if self.reconnect_attempts < MAX_RECONNECT_ATTEMPTS {
                self.reconnect_attempts += 1;
                debug!(attempt = self.reconnect_attempts, "scheduling reconnect");
                self.reconnect_timer = Some(ReconnectTimer::schedule(
                    self.reconnect_attempts,
                    self.reconnect_fired.clone(),
                ));
            } else {
                warn!("reconnect attempts exhausted, remaining in error");
            }
        }
    }

    fn transition(&mut self, state: SessionState, since: Option<PlayingSince>) {
        self.state = state.clone();
        self.renderer.on_state_change(state, since);
    }

    fn teardown_transport(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.invalidate();
        }
        self.status_rx = None;
        self.error_rx = None;
        self.video_rx = None;
        self.audio_rx = None;
        self.metadata_rx = None;
        self.statistics_rx = None;
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.cancel();
        }
    }

    /// Media tags received while paused are discarded, no buffering
    /// (spec.md §4.4, §8 S5). Receiving any media tag while connecting
    /// promotes to `playing` (spec.md §4.4) — SPEC_FULL.md §5 keeps this
    /// permissive alongside the `PlayStart`/`Connect` trigger.
    fn promote_on_media_tag(&mut self) -> bool {
        if self.state.is_paused() {
            return false;
        }
        if self.state == SessionState::Connecting {
            self.transition(SessionState::Playing, Some(PlayingSince::FirstMediaTag));
        }
        true
    }

    fn handle_video_tag(&mut self, data: Bytes, rtmp_timestamp_ms: i64) {
        if !self.promote_on_media_tag() {
            trace!("video tag discarded while paused");
            return;
        }

        if self.first_video_ts.is_none() {
            self.first_video_ts = Some(rtmp_timestamp_ms);
        }
        let base = self.first_video_ts.unwrap();

        match flv_video::parse_video_tag(&data, rtmp_timestamp_ms, base) {
            flv_video::VideoTag::SequenceHeader(config) => {
                if self.is_same_video_config(&config) {
                    trace!("duplicate AVC sequence header, config idempotence holds");
                    return;
                }
                self.build_video_decoder(config);
            }
            flv_video::VideoTag::Unit(unit) => {
                if self.video_decoder.is_none() && unit.key_frame {
                    if let Some(config) = cold_start_probe(&data) {
                        debug!("cold-start keyframe probe recovered a decoder config");
                        self.build_video_decoder(config);
                    }
                }
                if self.video_decoder.is_none() {
                    trace!("dropping video unit: no decoder config observed yet");
                    return;
                }
                self.decode_video_unit(unit);
            }
            flv_video::VideoTag::EndOfSequence => trace!("AVC end of sequence"),
            flv_video::VideoTag::Unsupported => {
                if !self.video_unsupported_warned {
                    warn!("unsupported video codec, dropping tag (warned once per stream)");
                    self.video_unsupported_warned = true;
                }
            }
        }
    }

    fn is_same_video_config(&self, config: &flv_video::VideoConfig) -> bool {
        self.video_config.as_ref() == Some(config)
    }

    fn build_video_decoder(&mut self, config: flv_video::VideoConfig) {
        match H264Decoder::new(&config.sps, &config.pps, config.nalu_length_size) {
            Ok(decoder) => {
                debug!("H264 decoder (re)built from sequence header");
                self.video_decoder = Some(Box::new(decoder));
                self.video_config = Some(config);
            }
            Err(e) => self.fail(PlaybackError::DecoderInitFailed(e)),
        }
    }

    fn decode_video_unit(&mut self, unit: flv_video::VideoUnit) {
        let Some(decoder) = self.video_decoder.as_mut() else {
            return;
        };
        match decoder.decode(&unit.avcc_payload, unit.pts_ms, unit.dts_ms) {
            Ok(Some(frame)) => {
                self.perf.record_frame();
                let sample =
                    DecodedSample::video(frame.pixels, decoder.format(), frame.pts_ms, frame.dts_ms);
                self.renderer.on_video_sample(sample);
            }
            Ok(None) => {}
            Err(e) => {
                self.perf.record_dropped_frame();
                trace!(error = %e, "video decode failed, dropping frame");
            }
        }
    }

    fn handle_audio_tag(&mut self, data: Bytes, rtmp_timestamp_ms: i64) {
        if !self.promote_on_media_tag() {
            trace!("audio tag discarded while paused");
            return;
        }

        if self.first_audio_ts.is_none() {
            self.first_audio_ts = Some(rtmp_timestamp_ms);
        }
        let base = self.first_audio_ts.unwrap();

        match flv_audio::parse_audio_tag(&data, rtmp_timestamp_ms, base) {
            flv_audio::AudioTag::SequenceHeader(config) => {
                if self.audio_config == Some(config) {
                    trace!("duplicate AAC sequence header, config idempotence holds");
                    return;
                }
                self.build_audio_decoder(config);
            }
            flv_audio::AudioTag::Unit(unit) => {
                if self.audio_decoder.is_none() {
                    trace!("dropping audio unit: no decoder config observed yet");
                    return;
                }
                self.decode_audio_unit(unit);
            }
            flv_audio::AudioTag::Unsupported => {
                if !self.audio_unsupported_warned {
                    warn!("unsupported audio codec, dropping tag (warned once per stream)");
                    self.audio_unsupported_warned = true;
                }
            }
        }
    }

    fn build_audio_decoder(&mut self, config: flv_audio::AudioConfig) {
        match AacDecoder::new(config.sample_rate_hz, config.channels) {
            Ok(decoder) => {
                debug!("AAC decoder (re)built from sequence header");
                self.audio_decoder = Some(Box::new(decoder));
                self.audio_config = Some(config);
            }
            Err(e) => self.fail(PlaybackError::DecoderInitFailed(e)),
        }
    }

    fn decode_audio_unit(&mut self, unit: flv_audio::AudioUnit) {
        let Some(decoder) = self.audio_decoder.as_mut() else {
            return;
        };
        match decoder.decode(&unit.aac_raw, unit.pts_ms) {
            Ok(Some(frame)) => {
                let sample =
                    DecodedSample::audio(frame.pcm, decoder.format(), frame.pts_ms, frame.duration_ms);
                self.renderer.on_audio_sample(sample);
            }
            Ok(None) => {}
            Err(e) => trace!(error = %e, "audio decode failed, dropping unit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;

    #[derive(Default)]
    struct MockRenderer {
        states: Vec<(SessionState, Option<PlayingSince>)>,
        video_samples: usize,
        audio_samples: usize,
    }

    impl RendererSink for MockRenderer {
        fn on_state_change(&mut self, state: SessionState, since: Option<PlayingSince>) {
            self.states.push((state, since));
        }
        fn on_video_sample(&mut self, _sample: DecodedSample) {
            self.video_samples += 1;
        }
        fn on_audio_sample(&mut self, _sample: DecodedSample) {
            self.audio_samples += 1;
        }
        fn on_video_config(&mut self, _w: Option<u32>, _h: Option<u32>, _r: Option<f64>) {}
        fn on_statistics(&mut self, _stats: Stats) {}
        fn on_cleanup(&mut self) {}
    }

    fn test_actor() -> Actor<MockRenderer> {
        let (_tx, rx) = mpsc::channel(1);
        Actor::new(SessionConfig::default(), MockRenderer::default(), rx)
    }

    #[test]
    fn pause_discards_video_tags() {
        let mut actor = test_actor();
        actor.state = SessionState::Paused;
        actor.handle_video_tag(Bytes::from_static(&[0x17, 0x02, 0, 0, 0]), 100);
        assert_eq!(actor.renderer.video_samples, 0);
        assert_eq!(actor.state, SessionState::Paused);
    }

    #[test]
    fn connecting_promotes_to_playing_on_first_media_tag() {
        let mut actor = test_actor();
        actor.state = SessionState::Connecting;
        // end-of-sequence tag: touches no decoder, just exercises promotion.
        actor.handle_video_tag(Bytes::from_static(&[0x17, 0x02, 0, 0, 0]), 100);
        assert_eq!(actor.state, SessionState::Playing);
        assert_eq!(
            actor.renderer.states.last(),
            Some(&(SessionState::Playing, Some(PlayingSince::FirstMediaTag)))
        );
    }

    #[test]
    fn play_start_status_promotes_when_connecting() {
        let mut actor = test_actor();
        actor.state = SessionState::Connecting;
        actor.handle_status(Status::PlayStart);
        assert_eq!(actor.state, SessionState::Playing);
        assert_eq!(
            actor.renderer.states.last(),
            Some(&(SessionState::Playing, Some(PlayingSince::PlayStartStatus)))
        );
    }

    #[test]
    fn play_start_status_ignored_outside_connecting() {
        let mut actor = test_actor();
        actor.state = SessionState::Idle;
        actor.handle_status(Status::PlayStart);
        assert_eq!(actor.state, SessionState::Idle);
        assert!(actor.renderer.states.is_empty());
    }

    #[test]
    fn transport_failure_transitions_to_error() {
        let mut actor = test_actor();
        actor.state = SessionState::Playing;
        actor.fail(PlaybackError::TransportFailed("closed".into()));
        assert_eq!(actor.state, SessionState::Error("transport failed: closed".into()));
    }

    #[test]
    fn transport_error_stream_transitions_to_error_and_schedules_reconnect() {
        // a dropped connection (TransportError::Closed / IO error) arrives
        // on the error stream, not as Status::Failed, and must still drive
        // the same error-state + reconnect-policy path.
        let mut actor = test_actor();
        actor.state = SessionState::Playing;
        actor.url = Some(RtmpUrl::parse("rtmp://example.com/app/key").unwrap());
        actor.handle_transport_error("connection closed by peer".into());
        assert_eq!(
            actor.state,
            SessionState::Error("transport failed: connection closed by peer".into())
        );
        assert!(actor.reconnect_timer.is_some());
    }

    #[test]
    fn reconnect_exhaustion_stops_scheduling() {
        let mut actor = test_actor();
        actor.url = Some(RtmpUrl::parse("rtmp://example.com/app/key").unwrap());
        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            actor.fail(PlaybackError::TransportFailed("drop".into()));
            assert_eq!(actor.reconnect_attempts, attempt);
            assert!(actor.reconnect_timer.is_some());
        }
        actor.fail(PlaybackError::TransportFailed("drop".into()));
        assert_eq!(actor.reconnect_attempts, MAX_RECONNECT_ATTEMPTS);
    }

    #[test]
    fn cold_start_probe_fails_on_real_nalu_payload() {
        let data = Bytes::from_static(&[0x17, 0x01, 0, 0, 0, 0, 0, 0, 4, 0x65, 0x88, 0x80, 0x40]);
        assert!(cold_start_probe(&data).is_none());
    }

    #[test]
    fn detects_duplicate_video_config() {
        let mut actor = test_actor();
        let cfg = flv_video::VideoConfig {
            sps: vec![1, 2, 3, 4],
            pps: vec![5],
            nalu_length_size: 4,
        };
        assert!(!actor.is_same_video_config(&cfg));
        actor.video_config = Some(cfg.clone());
        assert!(actor.is_same_video_config(&cfg));
    }

    #[test]
    fn disallows_play_while_already_playing() {
        let mut actor = test_actor();
        actor.state = SessionState::Playing;
        assert!(!actor.state.can_play());
    }
}
