use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_AAC};
use symphonia::core::formats::Packet;
use symphonia::default::get_codecs;
use tracing::{debug, warn};

use crate::traits::{AudioDecode, AudioFormatDescriptor, AudioFrame, DecodeError};

/// AAC-LC access units are fixed at 1024 samples (spec.md §3, §4.3).
const SAMPLES_PER_PACKET: u64 = 1024;

/// ISO 14496-3 Table 1.16, same table `flv::audio` uses to parse the
/// `AudioSpecificConfig` sample-rate index out of the wire bytes.
const SAMPLE_RATE_TABLE: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

fn sample_rate_index(hz: u32) -> u8 {
    SAMPLE_RATE_TABLE
        .iter()
        .position(|&r| r == hz)
        .map(|i| i as u8)
        .unwrap_or(4) // 44100 Hz, the common case, if an exotic rate slips through
}

/// Re-encodes the two-byte `AudioSpecificConfig` symphonia's AAC decoder
/// wants as `extra_data`. `AudioConfig` only keeps the already-decoded
/// fields (spec.md §3), not the original wire bytes, so this is the inverse
/// of `flv::audio::parse_sequence_header`'s bit layout. The object type is
/// hardcoded to AAC-LC (2) — the only profile in scope (spec.md §4.3).
const AAC_LC: u8 = 2;

fn audio_specific_config(sample_rate_hz: u32, channels: u8) -> [u8; 2] {
    let idx = sample_rate_index(sample_rate_hz);
    let b0 = (AAC_LC << 3) | (idx >> 1);
    let b1 = ((idx & 0x1) << 7) | ((channels & 0x0F) << 3);
    [b0, b1]
}

/// AAC-LC → interleaved signed 16-bit PCM converter, via `symphonia`, used
/// on platforms without AudioToolbox (spec.md §9 Design Notes: "software
/// fallback elsewhere").
pub struct SymphoniaAacDecoder {
    inner: Box<dyn Decoder>,
    format: AudioFormatDescriptor,
    next_ts: u64,
}

impl SymphoniaAacDecoder {
    pub fn new(sample_rate_hz: u32, channels: u8) -> Result<Self, String> {
        let asc = audio_specific_config(sample_rate_hz, channels);
        let mut params = CodecParameters::new();
        params
            .for_codec(CODEC_TYPE_AAC)
            .with_sample_rate(sample_rate_hz)
            .with_extra_data(Box::new(asc));

        let inner = get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| format!("symphonia AAC decoder init failed: {e}"))?;

        debug!(sample_rate_hz, channels, "symphonia AAC decoder created");
        Ok(SymphoniaAacDecoder {
            inner,
            format: AudioFormatDescriptor {
                sample_rate_hz,
                channels,
                bits_per_sample: 16,
            },
            next_ts: 0,
        })
    }
}

impl AudioDecode for SymphoniaAacDecoder {
    fn decode(&mut self, aac_raw: &[u8], pts_ms: i64) -> Result<Option<AudioFrame>, DecodeError> {
        let packet = Packet::new_from_slice(0, self.next_ts, SAMPLES_PER_PACKET, aac_raw);
        self.next_ts += SAMPLES_PER_PACKET;

        let decoded = match self.inner.decode(&packet) {
            Ok(buf) => buf,
            Err(e) => {
                warn!(error = %e, "symphonia AAC decode failed");
                return Err(DecodeError(format!("AAC decode failed: {e}")));
            }
        };

        let channels = self.format.channels as usize;
        let mut pcm = Vec::with_capacity(SAMPLES_PER_PACKET as usize * channels * 2);
        match decoded {
            AudioBufferRef::S16(buf) => {
                let frames = buf.frames();
                let n = channels.min(buf.spec().channels.count());
                for frame in 0..frames {
                    for ch in 0..n {
                        pcm.extend_from_slice(&buf.chan(ch)[frame].to_le_bytes());
                    }
                }
            }
            AudioBufferRef::F32(buf) => {
                let frames = buf.frames();
                let n = channels.min(buf.spec().channels.count());
                for frame in 0..frames {
                    for ch in 0..n {
                        let sample = (buf.chan(ch)[frame].clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        pcm.extend_from_slice(&sample.to_le_bytes());
                    }
                }
            }
            other => {
                warn!(spec = ?other.spec(), "unsupported symphonia sample format");
                return Err(DecodeError("unsupported symphonia sample format".into()));
            }
        }

        if pcm.is_empty() {
            return Ok(None);
        }

        let duration_ms = (SAMPLES_PER_PACKET as i64 * 1000) / self.format.sample_rate_hz as i64;
        Ok(Some(AudioFrame {
            pcm,
            pts_ms,
            duration_ms,
        }))
    }

    fn format(&self) -> AudioFormatDescriptor {
        self.format
    }
}

// SAFETY: driven only from the session's single decode-submission context,
// same as `AacDecoder`.
unsafe impl Send for SymphoniaAacDecoder {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_specific_config_roundtrips_s4_vector() {
        // spec.md §8 S4: object type 2 (AAC-LC), 44100 Hz, 2 channels -> 0x12 0x10
        assert_eq!(audio_specific_config(44_100, 2), [0x12, 0x10]);
    }

    #[test]
    fn unknown_rate_falls_back_to_44100_index() {
        assert_eq!(sample_rate_index(44_100), sample_rate_index(123_456));
    }
}
