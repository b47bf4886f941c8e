use tracing::{debug, warn};

use crate::traits::{DecodeError, PixelFormat, VideoDecode, VideoFormatDescriptor, VideoFrame};

/// Software H.264 decoder via `openh264`, used on platforms without
/// VideoToolbox (spec.md §9 Design Notes: "a default implementation per
/// target platform ... software fallback elsewhere").
///
/// `openh264`'s `decode` call is purely synchronous and returns at most one
/// frame per NAL unit submitted — there is no hardware-clock timestamp to
/// discard here, but the caller's PTS/DTS are threaded through untouched
/// regardless, so both decoder implementations honor the same contract
/// (spec.md §4.2: "must preserve the input PTS and DTS exactly").
pub struct OpenH264Decoder {
    inner: openh264::decoder::Decoder,
    nalu_length_size: u8,
    format: VideoFormatDescriptor,
}

impl OpenH264Decoder {
    /// SPS/PPS are not fed to `openh264` directly — its decoder discovers
    /// dimensions from the first decoded IDR slice, the same parameter sets
    /// embedded in the AVCC-wrapped NAL stream. They are accepted here only
    /// to keep a uniform constructor signature with `H264Decoder::new`.
    pub fn new(_sps: &[u8], _pps: &[u8], nalu_length_size: u8) -> Result<Self, String> {
        let inner = openh264::decoder::Decoder::new()
            .map_err(|e| format!("openh264 decoder init failed: {e}"))?;
        Ok(OpenH264Decoder {
            inner,
            nalu_length_size,
            format: VideoFormatDescriptor {
                width: 0,
                height: 0,
                pixel_format: PixelFormat::I420,
            },
        })
    }
}

impl VideoDecode for OpenH264Decoder {
    fn decode(
        &mut self,
        avcc_payload: &[u8],
        pts_ms: i64,
        dts_ms: i64,
    ) -> Result<Option<VideoFrame>, DecodeError> {
        let mut last_frame = None;
        for nalu in split_avcc(avcc_payload, self.nalu_length_size) {
            match self.inner.decode(nalu) {
                Ok(Some(yuv)) => last_frame = Some(yuv),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "openh264 decode failed");
                    return Err(DecodeError(format!("openh264 decode failed: {e}")));
                }
            }
        }

        let Some(yuv) = last_frame else {
            return Ok(None);
        };

        let (width, height) = yuv.dimensions();
        self.format.width = width as u32;
        self.format.height = height as u32;

        let chroma_w = width.div_ceil(2);
        let chroma_h = height.div_ceil(2);
        let mut pixels = vec![0u8; width * height + 2 * chroma_w * chroma_h];

        let (y_stride, u_stride, v_stride) = yuv.strides();
        copy_plane(yuv.y(), y_stride, width, height, &mut pixels[..width * height]);
        let u_off = width * height;
        let v_off = u_off + chroma_w * chroma_h;
        copy_plane(yuv.u(), u_stride, chroma_w, chroma_h, &mut pixels[u_off..v_off]);
        copy_plane(yuv.v(), v_stride, chroma_w, chroma_h, &mut pixels[v_off..]);

        debug!(width, height, pts_ms, dts_ms, "openh264 decoded frame");
        Ok(Some(VideoFrame { pixels, pts_ms, dts_ms }))
    }

    fn format(&self) -> VideoFormatDescriptor {
        self.format.clone()
    }
}

fn copy_plane(src: &[u8], stride: usize, width: usize, height: usize, dst: &mut [u8]) {
    if stride == width {
        dst[..width * height].copy_from_slice(&src[..width * height]);
    } else {
        for row in 0..height {
            dst[row * width..(row + 1) * width].copy_from_slice(&src[row * stride..row * stride + width]);
        }
    }
}

/// Splits an AVCC length-prefixed NALU stream into individual NAL units —
/// the framing `openh264`'s `decode` expects one unit at a time, unlike
/// VideoToolbox which consumes the whole AVCC payload via its format
/// description.
fn split_avcc(data: &[u8], length_size: u8) -> Vec<&[u8]> {
    let length_size = length_size as usize;
    let mut units = Vec::new();
    let mut pos = 0;
    while pos + length_size <= data.len() {
        let len = match length_size {
            1 => data[pos] as usize,
            2 => u16::from_be_bytes([data[pos], data[pos + 1]]) as usize,
            4 => u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize,
            _ => break,
        };
        pos += length_size;
        if pos + len > data.len() {
            break;
        }
        units.push(&data[pos..pos + len]);
        pos += len;
    }
    units
}

// SAFETY: this decoder is only ever driven from the session's single
// decode-submission context (spec.md §4.2 concurrency contract), same as
// `H264Decoder`.
unsafe impl Send for OpenH264Decoder {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_four_byte_length_prefixed_units() {
        let data = [0, 0, 0, 2, 0xAA, 0xBB, 0, 0, 0, 1, 0xCC];
        let units = split_avcc(&data, 4);
        assert_eq!(units, vec![&[0xAAu8, 0xBB][..], &[0xCCu8][..]]);
    }

    #[test]
    fn truncated_length_prefix_stops_cleanly() {
        let data = [0, 0, 0, 9, 0xAA];
        assert!(split_avcc(&data, 4).is_empty());
    }
}
