//! AAC-LC → PCM16 decode (C3): hardware-assisted conversion via Apple
//! AudioToolbox on macOS/iOS, software decode via `symphonia` elsewhere
//! (spec.md §9 Design Notes).

#[cfg(target_os = "macos")]
mod ffi;
#[cfg(target_os = "macos")]
pub mod decoder;

#[cfg(not(target_os = "macos"))]
pub mod software;

#[cfg(target_os = "macos")]
pub use decoder::AacDecoder;

#[cfg(not(target_os = "macos"))]
pub use software::SymphoniaAacDecoder as AacDecoder;
