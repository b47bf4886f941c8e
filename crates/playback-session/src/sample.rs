use media_pipeline::{AudioFormatDescriptor, VideoFormatDescriptor};

/// The decoded payload carried by a `DecodedSample` (spec.md §3).
#[derive(Debug, Clone)]
pub enum Media {
    VideoFrame {
        pixels: Vec<u8>,
        format: VideoFormatDescriptor,
    },
    AudioPcm {
        bytes: Vec<u8>,
        format: AudioFormatDescriptor,
    },
}

/// Output envelope handed to the renderer (spec.md §3). `dts_ms` is only
/// meaningful for video; `duration_ms` only for audio — both are `None`
/// for the other kind.
#[derive(Debug, Clone)]
pub struct DecodedSample {
    pub media: Media,
    pub pts_ms: i64,
    pub dts_ms: Option<i64>,
    pub duration_ms: Option<i64>,
}

impl DecodedSample {
    pub fn video(pixels: Vec<u8>, format: VideoFormatDescriptor, pts_ms: i64, dts_ms: i64) -> Self {
        DecodedSample {
            media: Media::VideoFrame { pixels, format },
            pts_ms,
            dts_ms: Some(dts_ms),
            duration_ms: None,
        }
    }

    pub fn audio(
        bytes: Vec<u8>,
        format: AudioFormatDescriptor,
        pts_ms: i64,
        duration_ms: i64,
    ) -> Self {
        DecodedSample {
            media: Media::AudioPcm { bytes, format },
            pts_ms,
            dts_ms: None,
            duration_ms: Some(duration_ms),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self.media, Media::VideoFrame { .. })
    }
}
