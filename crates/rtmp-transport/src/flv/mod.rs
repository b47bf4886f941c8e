//! FLV-style tag parsing for RTMP media messages (spec.md §4.1, C1).
//!
//! Two independent sub-parsers, one per media kind. Neither owns any
//! session state beyond the `first_*_ts` rebasing origin it's handed by the
//! caller — that origin, and when it gets reset, is the session's (C4)
//! responsibility per spec.md §3 ("Ownership").

pub mod audio;
pub mod video;

pub use audio::{AudioConfig, AudioTag, AudioUnit};
pub use video::{VideoConfig, VideoTag, VideoUnit};
