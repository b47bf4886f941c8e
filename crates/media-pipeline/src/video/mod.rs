//! H.264 video decode (C2): hardware decode via Apple VideoToolbox on
//! macOS/iOS, software decode via `openh264` elsewhere (spec.md §9 Design
//! Notes).

#[cfg(target_os = "macos")]
mod ffi;
#[cfg(target_os = "macos")]
pub mod format;
#[cfg(target_os = "macos")]
pub mod decoder;

#[cfg(not(target_os = "macos"))]
pub mod software;

#[cfg(target_os = "macos")]
pub use decoder::H264Decoder;
#[cfg(target_os = "macos")]
pub use format::FormatDescription;

#[cfg(not(target_os = "macos"))]
pub use software::OpenH264Decoder as H264Decoder;
