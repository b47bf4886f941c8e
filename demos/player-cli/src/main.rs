use tracing::{error, info};

use playback_session::{
    DecodedSample, PlaybackSession, PlayingSince, RendererSink, RtmpUrl, SessionConfig,
    SessionState, Stats,
};

/// `RendererSink` that just logs every event — this demo has no display or
/// audio output device of its own (spec.md §2 Non-goals: platform display
/// and audio rendering are out of scope for the core).
struct LoggingSink {
    frames_seen: u64,
    samples_seen: u64,
}

impl LoggingSink {
    fn new() -> Self {
        LoggingSink {
            frames_seen: 0,
            samples_seen: 0,
        }
    }
}

impl RendererSink for LoggingSink {
    fn on_state_change(&mut self, state: SessionState, since: Option<PlayingSince>) {
        info!(?state, ?since, "state change");
    }

    fn on_video_sample(&mut self, sample: DecodedSample) {
        self.frames_seen += 1;
        if self.frames_seen % 30 == 0 {
            info!(frames_seen = self.frames_seen, pts_ms = sample.pts_ms, "video sample");
        }
    }

    fn on_audio_sample(&mut self, sample: DecodedSample) {
        self.samples_seen += 1;
        if self.samples_seen % 100 == 0 {
            info!(samples_seen = self.samples_seen, pts_ms = sample.pts_ms, "audio sample");
        }
    }

    fn on_video_config(&mut self, width: Option<u32>, height: Option<u32>, data_rate: Option<f64>) {
        info!(?width, ?height, ?data_rate, "stream metadata");
    }

    fn on_statistics(&mut self, stats: Stats) {
        info!(
            fps = stats.fps,
            total_frames = stats.total_frames,
            dropped_frames = stats.dropped_frames,
            duration_s = stats.duration_s,
            "statistics"
        );
    }

    fn on_cleanup(&mut self) {
        info!("session cleaned up");
    }
}

fn parse_args() -> (String, bool) {
    let mut url = None;
    let mut verbose = false;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--url" | "-u" => {
                if i + 1 < args.len() {
                    url = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            "--help" | "-h" => {
                println!("player-cli — RTMP playback client");
                println!();
                println!("Usage: player-cli --url <RTMP_URL> [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --url <URL>      rtmp://host[:port]/app/stream_key to play");
                println!("  -v, --verbose        Enable debug logging");
                println!("  -h, --help           Show this help");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    let url = url.unwrap_or_else(|| {
        eprintln!("error: --url is required");
        std::process::exit(1);
    });
    (url, verbose)
}

#[tokio::main]
async fn main() {
    let (raw_url, verbose) = parse_args();

    let filter = if verbose {
        "playback_session=debug,rtmp_transport=debug,media_pipeline=debug,player_cli=debug"
    } else {
        "playback_session=info,rtmp_transport=info,media_pipeline=info,player_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .init();

    let url = match RtmpUrl::parse(&raw_url) {
        Ok(url) => url,
        Err(e) => {
            error!(%e, "invalid RTMP url");
            std::process::exit(1);
        }
    };

    info!(?url, "player-cli starting");

    let session = PlaybackSession::spawn(SessionConfig::default(), LoggingSink::new());
    session.play(url).await;

    tokio::signal::ctrl_c().await.ok();
    info!("shutting down...");
    session.stop().await;
}
