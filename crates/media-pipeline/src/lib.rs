//! Decode pipeline (C2 video, C3 audio): hardware H.264 decode and
//! AAC-LC → PCM16 conversion behind the `VideoDecode`/`AudioDecode`
//! capability traits (spec.md §9 Design Notes), so `playback-session`
//! depends only on the trait, not the Apple-framework FFI underneath.

pub mod traits;

pub mod audio;
pub mod video;

pub use traits::{
    AudioDecode, AudioFormatDescriptor, AudioFrame, DecodeError, DecoderInitError, PixelFormat,
    VideoDecode, VideoFormatDescriptor, VideoFrame,
};

pub use audio::AacDecoder;
pub use video::H264Decoder;
