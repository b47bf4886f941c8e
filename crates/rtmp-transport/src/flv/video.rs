use bytes::Bytes;
use tracing::{debug, trace, warn};

/// Parsed H.264 decoder configuration (SPS + PPS), extracted from an AVC
/// sequence header tag. Only the first SPS and first PPS are retained, per
/// spec.md §4.1 ("only the first SPS and first PPS are retained; multiples
/// are tolerated but ignored").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConfig {
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
    pub nalu_length_size: u8,
}

/// One coded video frame ready for decode, with DTS/PTS already rebased
/// against the session's `first_video_ts` (spec.md §3 `VideoUnit`).
#[derive(Debug, Clone)]
pub struct VideoUnit {
    pub avcc_payload: Bytes,
    pub key_frame: bool,
    pub dts_ms: i64,
    pub pts_ms: i64,
}

/// Result of parsing an RTMP video tag payload.
#[derive(Debug)]
pub enum VideoTag {
    /// AVC sequence header containing SPS/PPS.
    SequenceHeader(VideoConfig),
    /// AVCC-framed video data, ready for the video decoder.
    Unit(VideoUnit),
    /// AVC end of sequence — no-op.
    EndOfSequence,
    /// Not H.264/AVC, or the tag type is otherwise unsupported.
    Unsupported,
}

/// Parse an RTMP video tag payload (FLV video tag body).
///
/// FLV video tag format:
///   byte 0: frame type (4 bits) | codec id (4 bits)
///   For AVC (codec id 7):
///     byte 1: AVC packet type (0=seq header, 1=NALU, 2=end of seq)
///     bytes 2-4: composition time offset (signed, 24-bit big-endian)
///     bytes 5+: AVC data
///
/// `rtmp_timestamp_ms` is the tag's RTMP timestamp. `first_video_ts` is the
/// session's rebasing origin (the RTMP timestamp of the first video tag
/// since the last `play()`/reconnect); DTS/PTS are computed relative to it.
pub fn parse_video_tag(data: &Bytes, rtmp_timestamp_ms: i64, first_video_ts: i64) -> VideoTag {
    if data.len() < 2 {
        return VideoTag::Unsupported;
    }

    let frame_type = (data[0] >> 4) & 0x0F;
    let codec_id = data[0] & 0x0F;
    if codec_id != 7 {
        trace!(codec_id, "non-AVC video codec, dropping tag");
        return VideoTag::Unsupported;
    }

    let avc_packet_type = data[1];
    match avc_packet_type {
        0x00 => parse_sequence_header(data),
        0x01 => parse_nalu_data(data, frame_type, rtmp_timestamp_ms, first_video_ts),
        0x02 => VideoTag::EndOfSequence,
        _ => {
            warn!(avc_packet_type, "unknown AVC packet type");
            VideoTag::Unsupported
        }
    }
}

/// Parse an `AVCDecoderConfigurationRecord` from a sequence header tag
/// (ISO 14496-15):
///   byte 0: version (always 1)
///   byte 1: profile
///   byte 2: profile compat
///   byte 3: level
///   byte 4: 0b111111xx where xx = (nalu_length_size - 1)
///   byte 5: 0b111xxxxx where xxxxx = num_sps
///   for each SPS: u16_be size, then `size` bytes
///   u8 num_pps
///   for each PPS: u16_be size, then `size` bytes
fn parse_sequence_header(data: &Bytes) -> VideoTag {
    let offset = 5;
    if data.len() < offset + 6 {
        warn!("sequence header too short");
        return VideoTag::Unsupported;
    }

    let config = &data[offset..];

    let version = config[0];
    if version != 1 {
        warn!(version, "unexpected AVCDecoderConfigurationRecord version");
        return VideoTag::Unsupported;
    }

    let nalu_length_size = (config[4] & 0x03) + 1;
    let num_sps = (config[5] & 0x1F) as usize;
    let mut pos = 6;

    let mut first_sps: Option<Vec<u8>> = None;
    for _ in 0..num_sps {
        if pos + 2 > config.len() {
            warn!("truncated SPS length");
            return VideoTag::Unsupported;
        }
        let sps_len = u16::from_be_bytes([config[pos], config[pos + 1]]) as usize;
        pos += 2;
        if pos + sps_len > config.len() {
            warn!("truncated SPS data");
            return VideoTag::Unsupported;
        }
        if first_sps.is_none() {
            first_sps = Some(config[pos..pos + sps_len].to_vec());
        }
        pos += sps_len;
    }

    if pos >= config.len() {
        warn!("truncated PPS count");
        return VideoTag::Unsupported;
    }

    let num_pps = config[pos] as usize;
    pos += 1;
    let mut first_pps: Option<Vec<u8>> = None;
    for _ in 0..num_pps {
        if pos + 2 > config.len() {
            warn!("truncated PPS length");
            return VideoTag::Unsupported;
        }
        let pps_len = u16::from_be_bytes([config[pos], config[pos + 1]]) as usize;
        pos += 2;
        if pos + pps_len > config.len() {
            warn!("truncated PPS data");
            return VideoTag::Unsupported;
        }
        if first_pps.is_none() {
            first_pps = Some(config[pos..pos + pps_len].to_vec());
        }
        pos += pps_len;
    }

    let (Some(sps), Some(pps)) = (first_sps, first_pps) else {
        warn!("sequence header had no SPS/PPS");
        return VideoTag::Unsupported;
    };

    if sps.len() < 4 || pps.is_empty() {
        warn!(sps_len = sps.len(), pps_len = pps.len(), "malformed SPS/PPS");
        return VideoTag::Unsupported;
    }

    debug!(nalu_length_size, "parsed AVC decoder config");
    VideoTag::SequenceHeader(VideoConfig {
        sps,
        pps,
        nalu_length_size,
    })
}

/// Extract the AVCC-formatted payload and derive DTS/PTS (spec.md §4.1
/// "Composition-time parsing" and "Timestamp rebasing").
fn parse_nalu_data(
    data: &Bytes,
    frame_type: u8,
    rtmp_timestamp_ms: i64,
    first_video_ts: i64,
) -> VideoTag {
    let offset = 5;
    if data.len() <= offset {
        return VideoTag::Unsupported;
    }

    let composition_time_ms = read_composition_time(data[2], data[3], data[4]);
    let dts_ms = (rtmp_timestamp_ms - first_video_ts).max(0);
    let pts = dts_ms + composition_time_ms;
    let pts_ms = if pts < 0 { dts_ms } else { pts };

    let avcc_payload = data.slice(offset..);
    trace!(len = avcc_payload.len(), dts_ms, pts_ms, "parsed AVCC video unit");

    VideoTag::Unit(VideoUnit {
        avcc_payload,
        key_frame: frame_type == 1,
        dts_ms,
        pts_ms,
    })
}

/// Read a signed 24-bit big-endian composition time offset.
fn read_composition_time(b0: u8, b1: u8, b2: u8) -> i64 {
    let raw = ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32);
    let signed = if raw & 0x0080_0000 != 0 {
        (raw | 0xFF00_0000) as i32
    } else {
        raw as i32
    };
    signed as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_non_avc() {
        let data = Bytes::from_static(&[0x22, 0x00]);
        assert!(matches!(parse_video_tag(&data, 0, 0), VideoTag::Unsupported));
    }

    #[test]
    fn test_parse_end_of_sequence() {
        let data = Bytes::from_static(&[0x17, 0x02]);
        assert!(matches!(parse_video_tag(&data, 0, 0), VideoTag::EndOfSequence));
    }

    #[test]
    fn test_parse_sequence_header_s1() {
        // spec.md §8 S1
        let data = Bytes::from_static(&[
            0x17, 0x00, 0x00, 0x00, 0x00, 0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x08, 0x67,
            0x42, 0x00, 0x1E, 0x9A, 0x66, 0x02, 0x80, 0x01, 0x00, 0x04, 0x68, 0xCE, 0x06, 0xE2,
        ]);
        match parse_video_tag(&data, 0, 0) {
            VideoTag::SequenceHeader(config) => {
                assert_eq!(config.sps, vec![0x67, 0x42, 0x00, 0x1E, 0x9A, 0x66, 0x02, 0x80]);
                assert_eq!(config.pps, vec![0x68, 0xCE, 0x06, 0xE2]);
                assert_eq!(config.nalu_length_size, 4);
            }
            other => panic!("expected SequenceHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_config_idempotence() {
        let data = Bytes::from_static(&[
            0x17, 0x00, 0x00, 0x00, 0x00, 0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x08, 0x67,
            0x42, 0x00, 0x1E, 0x9A, 0x66, 0x02, 0x80, 0x01, 0x00, 0x04, 0x68, 0xCE, 0x06, 0xE2,
        ]);
        let first = match parse_video_tag(&data, 0, 0) {
            VideoTag::SequenceHeader(config) => config,
            other => panic!("expected SequenceHeader, got {:?}", other),
        };
        let second = match parse_video_tag(&data, 500, 0) {
            VideoTag::SequenceHeader(config) => config,
            other => panic!("expected SequenceHeader, got {:?}", other),
        };
        assert_eq!(first, second);
    }

    #[test]
    fn test_video_frame_pts_s2() {
        // spec.md §8 S2: first_video_ts=1000, rtmp_timestamp_ms=1133, ct=0x000021=33
        let mut buf = vec![0x17, 0x01, 0x00, 0x00, 0x21];
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x04, 0x65, 0x88, 0x80, 0x40]);
        let data = Bytes::from(buf);
        match parse_video_tag(&data, 1133, 1000) {
            VideoTag::Unit(unit) => {
                assert_eq!(unit.dts_ms, 133);
                assert_eq!(unit.pts_ms, 166);
            }
            other => panic!("expected Unit, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_composition_time_s3() {
        // spec.md §8 S3: bytes 2..4 = FF FF ED -> ct = -19; dts=100 -> pts=81
        let mut buf = vec![0x27, 0x01, 0xFF, 0xFF, 0xED];
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x03, 0x06, 0x05, 0x00]);
        let data = Bytes::from(buf);
        match parse_video_tag(&data, 1100, 1000) {
            VideoTag::Unit(unit) => {
                assert_eq!(unit.dts_ms, 100);
                assert_eq!(unit.pts_ms, 81);
                assert!(!unit.key_frame);
            }
            other => panic!("expected Unit, got {:?}", other),
        }
    }

    #[test]
    fn test_pts_clamped_to_dts_when_negative_overall() {
        // composition time so negative it would drive pts below dts; clamp.
        let mut buf = vec![0x27, 0x01, 0xFF, 0x00, 0x00]; // ct = -256
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x09]);
        let data = Bytes::from(buf);
        match parse_video_tag(&data, 1010, 1000) {
            VideoTag::Unit(unit) => {
                assert_eq!(unit.dts_ms, 10);
                assert_eq!(unit.pts_ms, 10);
            }
            other => panic!("expected Unit, got {:?}", other),
        }
    }
}
