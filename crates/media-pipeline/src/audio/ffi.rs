//! Raw FFI bindings to Apple's AudioToolbox `AudioConverter` API.
//!
//! Built in the same idiom as `video::ffi` — opaque pointer typedefs, plain
//! `#[link(name = "...", kind = "framework")]` blocks, no objc2.

#![allow(non_snake_case, non_upper_case_globals, dead_code)]

use std::ffi::c_void;

pub type OSStatus = i32;
pub type AudioConverterRef = *mut c_void;

pub const kAudioFormatMPEG4AAC: u32 = u32::from_be_bytes(*b"aac ");
pub const kAudioFormatLinearPCM: u32 = u32::from_be_bytes(*b"lpcm");

pub const kAudioFormatFlagIsSignedInteger: u32 = 1 << 2;
pub const kAudioFormatFlagIsPacked: u32 = 1 << 3;

/// Sentinel `OSStatus` our input callback returns once it has handed the
/// converter its one AAC access unit, signalling "no more data" (there is
/// no standard cross-platform constant for this — AudioConverter only
/// requires a nonzero status and `ioNumberDataPackets == 0`).
pub const kNoMoreInputData: OSStatus = 1;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct AudioStreamBasicDescription {
    pub mSampleRate: f64,
    pub mFormatID: u32,
    pub mFormatFlags: u32,
    pub mBytesPerPacket: u32,
    pub mFramesPerPacket: u32,
    pub mBytesPerFrame: u32,
    pub mChannelsPerFrame: u32,
    pub mBitsPerChannel: u32,
    pub mReserved: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct AudioStreamPacketDescription {
    pub mStartOffset: i64,
    pub mVariableFramesInPacket: u32,
    pub mDataByteSize: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct AudioBuffer {
    pub mNumberChannels: u32,
    pub mDataByteSize: u32,
    pub mData: *mut c_void,
}

/// `AudioBufferList` with a single buffer — every call site here uses
/// interleaved audio, so one buffer is always enough.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct AudioBufferList1 {
    pub mNumberBuffers: u32,
    pub mBuffers: [AudioBuffer; 1],
}

pub type AudioConverterComplexInputDataProc = unsafe extern "C" fn(
    inAudioConverter: AudioConverterRef,
    ioNumberDataPackets: *mut u32,
    ioData: *mut AudioBufferList1,
    outDataPacketDescription: *mut *mut AudioStreamPacketDescription,
    inUserData: *mut c_void,
) -> OSStatus;

extern "C" {
    pub fn AudioConverterNew(
        inSourceFormat: *const AudioStreamBasicDescription,
        inDestinationFormat: *const AudioStreamBasicDescription,
        outAudioConverter: *mut AudioConverterRef,
    ) -> OSStatus;

    pub fn AudioConverterDispose(inAudioConverter: AudioConverterRef) -> OSStatus;

    pub fn AudioConverterFillComplexBuffer(
        inAudioConverter: AudioConverterRef,
        inInputDataProc: AudioConverterComplexInputDataProc,
        inInputDataProcUserData: *mut c_void,
        ioOutputDataPacketSize: *mut u32,
        outOutputData: *mut AudioBufferList1,
        outPacketDescription: *mut AudioStreamPacketDescription,
    ) -> OSStatus;
}

#[link(name = "AudioToolbox", kind = "framework")]
extern "C" {}
