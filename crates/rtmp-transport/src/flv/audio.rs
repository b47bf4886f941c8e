use bytes::Bytes;
use tracing::{debug, trace, warn};

/// Parsed AAC configuration, extracted from the first two bytes of an
/// `AudioSpecificConfig` carried in an AAC sequence header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub audio_object_type: u8,
    pub sample_rate_hz: u32,
    pub channels: u8,
}

/// One coded AAC access unit (1024 samples, AAC-LC), with PTS already
/// rebased against the session's `first_audio_ts`.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    pub aac_raw: Bytes,
    pub pts_ms: i64,
}

#[derive(Debug)]
pub enum AudioTag {
    SequenceHeader(AudioConfig),
    Unit(AudioUnit),
    Unsupported,
}

/// AAC sample-rate table, indices 0..=12 (ISO 14496-3 Table 1.16). Indices
/// 13-15 are reserved ("escape" / explicit rate) and rejected.
const SAMPLE_RATE_TABLE: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Parse an RTMP audio tag payload (FLV audio tag body).
///
/// Byte 0: top nibble = sound format (`0xA` = AAC). Byte 1: AAC packet type
/// (`0x00` = sequence header, `0x01` = raw). Any other sound format is
/// dropped — the low nibble of byte 0 (sample rate/size/channels) is not
/// relied upon for AAC, since `AudioSpecificConfig` is authoritative.
pub fn parse_audio_tag(data: &Bytes, rtmp_timestamp_ms: i64, first_audio_ts: i64) -> AudioTag {
    if data.len() < 2 {
        return AudioTag::Unsupported;
    }

    let sound_format = (data[0] & 0xF0) >> 4;
    if sound_format != 0x0A {
        trace!(sound_format, "non-AAC audio format, dropping tag");
        return AudioTag::Unsupported;
    }

    match data[1] {
        0x00 => parse_sequence_header(data),
        0x01 => parse_raw_unit(data, rtmp_timestamp_ms, first_audio_ts),
        other => {
            warn!(aac_packet_type = other, "unknown AAC packet type");
            AudioTag::Unsupported
        }
    }
}

/// Parse `AudioSpecificConfig` from bytes 2..4: 5 bits object type, 4 bits
/// sample-rate index, 4 bits channel configuration (spec.md §4.1, §8 S4).
fn parse_sequence_header(data: &Bytes) -> AudioTag {
    if data.len() < 4 {
        warn!("AAC sequence header too short");
        return AudioTag::Unsupported;
    }

    let b2 = data[2];
    let b3 = data[3];

    let audio_object_type = b2 >> 3;
    let sample_rate_index = ((b2 & 0x07) << 1) | (b3 >> 7);
    let channel_config = (b3 >> 3) & 0x0F;

    let Some(&sample_rate_hz) = SAMPLE_RATE_TABLE.get(sample_rate_index as usize) else {
        warn!(sample_rate_index, "reserved AAC sample rate index");
        return AudioTag::Unsupported;
    };

    if channel_config == 0 || channel_config > 8 {
        warn!(channel_config, "unsupported AAC channel configuration");
        return AudioTag::Unsupported;
    }

    debug!(audio_object_type, sample_rate_hz, channel_config, "parsed AudioSpecificConfig");
    AudioTag::SequenceHeader(AudioConfig {
        audio_object_type,
        sample_rate_hz,
        channels: channel_config,
    })
}

fn parse_raw_unit(data: &Bytes, rtmp_timestamp_ms: i64, first_audio_ts: i64) -> AudioTag {
    if data.len() <= 2 {
        return AudioTag::Unsupported;
    }
    let pts_ms = (rtmp_timestamp_ms - first_audio_ts).max(0);
    let aac_raw = data.slice(2..);
    trace!(len = aac_raw.len(), pts_ms, "parsed raw AAC unit");
    AudioTag::Unit(AudioUnit { aac_raw, pts_ms })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_non_aac() {
        let data = Bytes::from_static(&[0x20, 0x00]); // linear PCM
        assert!(matches!(parse_audio_tag(&data, 0, 0), AudioTag::Unsupported));
    }

    #[test]
    fn test_audio_config_parse_s4() {
        // spec.md §8 S4: AF 00 12 10
        let data = Bytes::from_static(&[0xAF, 0x00, 0x12, 0x10]);
        match parse_audio_tag(&data, 0, 0) {
            AudioTag::SequenceHeader(config) => {
                assert_eq!(config.audio_object_type, 2);
                assert_eq!(config.sample_rate_hz, 44_100);
                assert_eq!(config.channels, 2);
            }
            other => panic!("expected SequenceHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_sample_rate_index_fails() {
        // object type doesn't matter; sample_rate_index bits -> 13 (reserved)
        // b2 = 0b00001_101 (ot=1, high 1 bit of idx=1), b3 = 0b1_0000000 (low bit=1) => idx=0b1101=13
        let data = Bytes::from_static(&[0xAF, 0x00, 0b0000_1101, 0b1_0000_000]);
        assert!(matches!(parse_audio_tag(&data, 0, 0), AudioTag::Unsupported));
    }

    #[test]
    fn test_raw_unit_pts_rebased() {
        let data = Bytes::from_static(&[0xAF, 0x01, 0xDE, 0xAD, 0xBE, 0xEF]);
        match parse_audio_tag(&data, 1200, 1000) {
            AudioTag::Unit(unit) => {
                assert_eq!(unit.pts_ms, 200);
                assert_eq!(&unit.aac_raw[..], &[0xDE, 0xAD, 0xBE, 0xEF]);
            }
            other => panic!("expected Unit, got {:?}", other),
        }
    }
}
