use thiserror::Error;

/// Pixel layout of a decoded video frame. `Nv12` is the 4:2:0 8-bit
/// bi-planar layout VideoToolbox decodes to (spec.md §4.2: "producing 4:2:0
/// 8-bit bi-planar frames"); `I420` is the 4:2:0 8-bit triplanar layout the
/// software fallback decoder produces (spec.md §9 Design Notes: "software
/// fallback elsewhere"). Both are 4:2:0 8-bit — only the plane layout
/// differs — so a renderer needs one conversion step, not a second pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Nv12,
    I420,
}

/// Describes the video format a `VideoDecode` instance was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormatDescriptor {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

/// Describes the PCM format an `AudioDecode` instance produces: interleaved
/// signed 16-bit PCM at the source sample rate and channel count
/// (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormatDescriptor {
    pub sample_rate_hz: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
}

/// One decoded video frame, in `format.pixel_format` layout, with the
/// caller-supplied PTS/DTS threaded through unchanged (spec.md §4.2: "must
/// preserve the input PTS and DTS exactly on its output sample").
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pixels: Vec<u8>,
    pub pts_ms: i64,
    pub dts_ms: i64,
}

/// One decoded audio packet: interleaved PCM16, with PTS and duration
/// (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub pcm: Vec<u8>,
    pub pts_ms: i64,
    pub duration_ms: i64,
}

#[derive(Debug, Error)]
pub enum DecoderInitError {
    #[error("format description invalid: {0}")]
    FormatDescriptionInvalid(String),
    #[error("decoder session creation failed: {0}")]
    SessionCreateFailed(String),
}

#[derive(Debug, Error)]
#[error("decode failed: {0}")]
pub struct DecodeError(pub String);

/// Capability trait for a video decoder (spec.md §9 Design Notes:
/// "abstract these behind two small capability traits"). A concrete
/// implementation owns a single decompression session; `decode` is called
/// once per `VideoUnit`, in submission order, and the caller must receive
/// the result before submitting the next unit (spec.md §4.2 concurrency
/// contract) — that ordering constraint is why `decode` takes `&mut self`
/// rather than `&self`.
pub trait VideoDecode: Send {
    /// Decode one AVCC-framed access unit. Returns `Ok(None)` when the
    /// platform decoder consumed the unit without producing an output
    /// frame (e.g. still waiting on enough reference data); a transient
    /// per-unit failure is `Err` and must not be treated as fatal
    /// (spec.md §7: `DecodeFailed` increments dropped frames and
    /// continues).
    fn decode(
        &mut self,
        avcc_payload: &[u8],
        pts_ms: i64,
        dts_ms: i64,
    ) -> Result<Option<VideoFrame>, DecodeError>;

    fn format(&self) -> VideoFormatDescriptor;
}

/// Capability trait for an audio decoder, mirroring `VideoDecode`.
pub trait AudioDecode: Send {
    fn decode(&mut self, aac_raw: &[u8], pts_ms: i64) -> Result<Option<AudioFrame>, DecodeError>;

    fn format(&self) -> AudioFormatDescriptor;
}
