use std::ffi::c_void;

use tracing::{debug, warn};

use crate::traits::{AudioDecode, AudioFormatDescriptor, AudioFrame, DecodeError};

use super::ffi;

/// AAC-LC access units are fixed at 1024 samples (spec.md §3, §4.3).
const SAMPLES_PER_PACKET: u32 = 1024;

/// AAC → interleaved signed 16-bit PCM converter, via Apple AudioToolbox.
///
/// Built in the same lifecycle shape as `H264Decoder` (`new`/`decode`/`Drop`),
/// per spec.md §9: "abstract these behind two small capability traits". No
/// magic-cookie handshake is needed (spec.md §4.3) — the source
/// `AudioStreamBasicDescription` is fully specified by `AudioConfig`'s fields
/// alone.
pub struct AacDecoder {
    converter: ffi::AudioConverterRef,
    format: AudioFormatDescriptor,
}

struct InputContext {
    data: *const u8,
    len: u32,
    consumed: bool,
    packet_desc: ffi::AudioStreamPacketDescription,
}

impl AacDecoder {
    pub fn new(sample_rate_hz: u32, channels: u8) -> Result<Self, String> {
        let source = ffi::AudioStreamBasicDescription {
            mSampleRate: sample_rate_hz as f64,
            mFormatID: ffi::kAudioFormatMPEG4AAC,
            mFormatFlags: 0,
            mBytesPerPacket: 0,
            mFramesPerPacket: SAMPLES_PER_PACKET,
            mBytesPerFrame: 0,
            mChannelsPerFrame: channels as u32,
            mBitsPerChannel: 0,
            mReserved: 0,
        };

        let bytes_per_frame = 2 * channels as u32;
        let destination = ffi::AudioStreamBasicDescription {
            mSampleRate: sample_rate_hz as f64,
            mFormatID: ffi::kAudioFormatLinearPCM,
            mFormatFlags: ffi::kAudioFormatFlagIsSignedInteger | ffi::kAudioFormatFlagIsPacked,
            mBytesPerPacket: bytes_per_frame,
            mFramesPerPacket: 1,
            mBytesPerFrame: bytes_per_frame,
            mChannelsPerFrame: channels as u32,
            mBitsPerChannel: 16,
            mReserved: 0,
        };

        let mut converter: ffi::AudioConverterRef = std::ptr::null_mut();
        let status = unsafe { ffi::AudioConverterNew(&source, &destination, &mut converter) };
        if status != 0 {
            return Err(format!("AudioConverterNew failed: OSStatus {status}"));
        }

        debug!(sample_rate_hz, channels, "AudioConverter created");
        Ok(AacDecoder {
            converter,
            format: AudioFormatDescriptor {
                sample_rate_hz,
                channels,
                bits_per_sample: 16,
            },
        })
    }
}

impl AudioDecode for AacDecoder {
    fn decode(&mut self, aac_raw: &[u8], pts_ms: i64) -> Result<Option<AudioFrame>, DecodeError> {
        let mut ctx = InputContext {
            data: aac_raw.as_ptr(),
            len: aac_raw.len() as u32,
            consumed: false,
            packet_desc: ffi::AudioStreamPacketDescription {
                mStartOffset: 0,
                mVariableFramesInPacket: 0,
                mDataByteSize: aac_raw.len() as u32,
            },
        };

        let channels = self.format.channels as u32;
        let buffer_size = (SAMPLES_PER_PACKET * channels * 2) as usize;
        let mut pcm = vec![0u8; buffer_size];

        let mut output_list = ffi::AudioBufferList1 {
            mNumberBuffers: 1,
            mBuffers: [ffi::AudioBuffer {
                mNumberChannels: channels,
                mDataByteSize: buffer_size as u32,
                mData: pcm.as_mut_ptr() as *mut c_void,
            }],
        };

        let mut io_packets = SAMPLES_PER_PACKET;
        let status = unsafe {
            ffi::AudioConverterFillComplexBuffer(
                self.converter,
                input_proc,
                &mut ctx as *mut InputContext as *mut c_void,
                &mut io_packets,
                &mut output_list,
                std::ptr::null_mut(),
            )
        };

        // kNoMoreInputData is our own sentinel signalling end-of-input, not
        // a real conversion failure.
        if status != 0 && status != ffi::kNoMoreInputData {
            warn!(status, "AudioConverterFillComplexBuffer failed");
            return Err(DecodeError(format!("AAC decode failed: OSStatus {status}")));
        }

        if io_packets == 0 {
            return Ok(None);
        }

        let written = output_list.mBuffers[0].mDataByteSize as usize;
        pcm.truncate(written);

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

impl Drop for AacDecoder {
    fn drop(&mut self) {
        if !self.converter.is_null() {
            unsafe { ffi::AudioConverterDispose(self.converter) };
        }
    }
}

// SAFETY: AudioConverter is not internally synchronized, but this decoder
// is only ever driven from the session's single decode-submission context
// (spec.md §4.3 concurrency contract mirrors §4.2's).
unsafe impl Send for AacDecoder {}

/// `AudioConverterComplexInputDataProc`: supplies the single AAC access unit
/// on the first call, then reports end-of-input on every subsequent call.
unsafe extern "C" fn input_proc(
    _in_audio_converter: ffi::AudioConverterRef,
    io_number_data_packets: *mut u32,
    io_data: *mut ffi::AudioBufferList1,
    out_data_packet_description: *mut *mut ffi::AudioStreamPacketDescription,
    in_user_data: *mut c_void,
) -> ffi::OSStatus {
    let ctx = &mut *(in_user_data as *mut InputContext);

    if ctx.consumed {
        *io_number_data_packets = 0;
        return ffi::kNoMoreInputData;
    }

    (*io_data).mBuffers[0].mData = ctx.data as *mut c_void;
    (*io_data).mBuffers[0].mDataByteSize = ctx.len;

    if !out_data_packet_description.is_null() {
        *out_data_packet_description = &mut ctx.packet_desc;
    }

    *io_number_data_packets = 1;
    ctx.consumed = true;
    0
}
