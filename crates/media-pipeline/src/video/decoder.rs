use std::ffi::c_void;
use std::sync::mpsc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::traits::{DecodeError, PixelFormat, VideoDecode, VideoFormatDescriptor, VideoFrame};

use super::ffi;
use super::format::FormatDescription;

/// How long `decode` waits for the VideoToolbox callback to fire after
/// submitting a frame and flushing. VideoToolbox calls back synchronously
/// for the overwhelming majority of H.264 streams (no B-frame reordering
/// delay with a conformant decoder config); this is a safety margin, not a
/// throughput-limiting pipeline depth.
const DECODE_TIMEOUT: Duration = Duration::from_millis(250);

/// H.264 hardware decoder using Apple VideoToolbox.
///
/// Threads the caller's `(pts_ms, dts_ms)` through `sourceFrameRefCon` and
/// never reads VideoToolbox's own callback timestamp — spec.md §4.2/§9 calls
/// this a first-class contract, since some platform decoders return
/// zero-valued or wall-clock PTS.
pub struct H264Decoder {
    session: ffi::VTDecompressionSessionRef,
    format_desc: FormatDescription,
    format: VideoFormatDescriptor,
    results: mpsc::Receiver<VideoFrame>,
    _ctx: *mut CallbackContext,
}

struct CallbackContext {
    tx: mpsc::Sender<VideoFrame>,
}

// SAFETY: tx is an mpsc::Sender, itself Send + Sync.
unsafe impl Send for CallbackContext {}
unsafe impl Sync for CallbackContext {}

impl H264Decoder {
    /// Build a decompression session from a parsed `VideoConfig`'s SPS/PPS.
    /// Fails with `FormatDescriptionInvalid`/`SessionCreateFailed` if the
    /// platform rejects the parameter sets (spec.md §4.2).
    pub fn new(sps: &[u8], pps: &[u8], nalu_length_size: u8) -> Result<Self, String> {
        let format_desc = FormatDescription::from_h264_parameter_sets(sps, pps, nalu_length_size)
            .map_err(|s| format!("failed to create format description: OSStatus {s}"))?;
        let (width, height) = format_desc.dimensions();

        let dest_attrs = unsafe { create_destination_attributes() };

        let (tx, rx) = mpsc::channel();
        let ctx = Box::new(CallbackContext { tx });
        let ctx_ptr = Box::into_raw(ctx);

        let callback = ffi::DecompressionOutputCallbackRecord {
            decompressionOutputCallback: decompression_callback,
            decompressionOutputRefCon: ctx_ptr as *mut c_void,
        };

        let mut session: ffi::VTDecompressionSessionRef = std::ptr::null_mut();
        let status = unsafe {
            ffi::VTDecompressionSessionCreate(
                ffi::kCFAllocatorDefault,
                format_desc.as_ref(),
                std::ptr::null(),
                dest_attrs,
                &callback,
                &mut session,
            )
        };

        if !dest_attrs.is_null() {
            unsafe { ffi::CFRelease(dest_attrs as *const c_void) };
        }

        if status != 0 {
            unsafe { drop(Box::from_raw(ctx_ptr)) };
            return Err(format!("VTDecompressionSessionCreate failed: OSStatus {status}"));
        }

        debug!(width, height, "VTDecompressionSession created");
        Ok(H264Decoder {
            session,
            format_desc,
            format: VideoFormatDescriptor {
                width,
                height,
                pixel_format: PixelFormat::Nv12,
            },
            results: rx,
            _ctx: ctx_ptr,
        })
    }
}

impl VideoDecode for H264Decoder {
    fn decode(
        &mut self,
        avcc_payload: &[u8],
        pts_ms: i64,
        dts_ms: i64,
    ) -> Result<Option<VideoFrame>, DecodeError> {
        let mut block_buffer: ffi::CMBlockBufferRef = std::ptr::null_mut();
        let status = unsafe {
            ffi::CMBlockBufferCreateWithMemoryBlock(
                ffi::kCFAllocatorDefault,
                std::ptr::null(),
                avcc_payload.len(),
                ffi::kCFAllocatorDefault,
                std::ptr::null(),
                0,
                avcc_payload.len(),
                0,
                &mut block_buffer,
            )
        };
        if status != 0 {
            return Err(DecodeError(format!("CMBlockBufferCreateWithMemoryBlock failed: {status}")));
        }

        let status = unsafe {
            ffi::CMBlockBufferReplaceDataBytes(
                avcc_payload.as_ptr() as *const c_void,
                block_buffer,
                0,
                avcc_payload.len(),
            )
        };
        if status != 0 {
            unsafe { ffi::CFRelease(block_buffer as *const c_void) };
            return Err(DecodeError(format!("CMBlockBufferReplaceDataBytes failed: {status}")));
        }

        // We do not pass the real PTS/DTS to CoreMedia's timing info at all
        // — it's irrelevant, since the callback never reads it back. The
        // decode-time clock is purely a formality CMSampleBufferCreateReady
        // requires.
        let timing = ffi::CMSampleTimingInfo {
            duration: ffi::CMTime::invalid(),
            presentationTimeStamp: ffi::CMTime::make(pts_ms, 1000),
            decodeTimeStamp: ffi::CMTime::make(dts_ms, 1000),
        };
        let sample_size = avcc_payload.len();

        let mut sample_buffer: ffi::CMSampleBufferRef = std::ptr::null_mut();
        let status = unsafe {
            ffi::CMSampleBufferCreateReady(
                ffi::kCFAllocatorDefault,
                block_buffer,
                self.format_desc.as_ref(),
                1,
                1,
                &timing,
                1,
                &sample_size,
                &mut sample_buffer,
            )
        };
        unsafe { ffi::CFRelease(block_buffer as *const c_void) };
        if status != 0 {
            return Err(DecodeError(format!("CMSampleBufferCreateReady failed: {status}")));
        }

        let refcon = Box::into_raw(Box::new((pts_ms, dts_ms)));
        let mut info_flags: u32 = 0;
        let status = unsafe {
            ffi::VTDecompressionSessionDecodeFrame(
                self.session,
                sample_buffer,
                0,
                refcon as *mut c_void,
                &mut info_flags,
            )
        };
        unsafe { ffi::CFRelease(sample_buffer as *const c_void) };

        if status != 0 {
            // the refcon is only reclaimed by the callback; if decode never
            // ran, reclaim it here to avoid a leak.
            unsafe { drop(Box::from_raw(refcon)) };
            if status == -8969 {
                trace!(status, "decode frame returned bad data (expected for partial/non-IDR frames)");
            } else {
                warn!(status, "VTDecompressionSessionDecodeFrame failed");
            }
            return Err(DecodeError(format!("VTDecompressionSessionDecodeFrame failed: {status}")));
        }

        let _ = unsafe { ffi::VTDecompressionSessionWaitForAsynchronousFrames(self.session) };

        match self.results.recv_timeout(DECODE_TIMEOUT) {
            Ok(frame) => Ok(Some(frame)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(DecodeError("decoder callback channel disconnected".into()))
            }
        }
    }

    fn format(&self) -> VideoFormatDescriptor {
        self.format.clone()
    }
}

impl Drop for H264Decoder {
    fn drop(&mut self) {
        if !self.session.is_null() {
            unsafe {
                ffi::VTDecompressionSessionInvalidate(self.session);
                ffi::CFRelease(self.session as *const c_void);
            }
        }
        if !self._ctx.is_null() {
            unsafe { drop(Box::from_raw(self._ctx)) };
        }
    }
}

// SAFETY: VTDecompressionSession is internally thread-safe for decode calls.
unsafe impl Send for H264Decoder {}

/// Requests IOSurface-free, plain NV12 pixel buffers — this decoder copies
/// planes out into an owned `Vec<u8>` rather than retaining IOSurfaces for
/// cross-process sharing (no Camera Extension on the far end here).
unsafe fn create_destination_attributes() -> ffi::CFDictionaryRef {
    let dict = ffi::CFDictionaryCreateMutable(
        ffi::kCFAllocatorDefault,
        1,
        &ffi::kCFTypeDictionaryKeyCallBacks as *const _ as *const c_void,
        &ffi::kCFTypeDictionaryValueCallBacks as *const _ as *const c_void,
    );

    let pixel_format = ffi::kCVPixelFormatType_420YpCbCr8BiPlanarVideoRange as i32;
    let pixel_format_num = ffi::CFNumberCreate(
        ffi::kCFAllocatorDefault,
        ffi::kCFNumberSInt32Type,
        &pixel_format as *const i32 as *const c_void,
    );
    ffi::CFDictionarySetValue(
        dict,
        ffi::kCVPixelBufferPixelFormatTypeKey as *const c_void,
        pixel_format_num as *const c_void,
    );
    ffi::CFRelease(pixel_format_num as *const c_void);

    dict as ffi::CFDictionaryRef
}

/// VTDecompressionSession output callback. Copies NV12 planes into an owned
/// buffer and reattaches the PTS/DTS passed in at `decode()` time via
/// `sourceFrameRefCon` — `_presentationTimeStamp` is intentionally unused.
#[allow(non_snake_case)]
unsafe extern "C" fn decompression_callback(
    decompressionOutputRefCon: *mut c_void,
    sourceFrameRefCon: *mut c_void,
    status: ffi::OSStatus,
    _infoFlags: u32,
    imageBuffer: ffi::CVImageBufferRef,
    _presentationTimeStamp: ffi::CMTime,
    _presentationDuration: ffi::CMTime,
) {
    let (pts_ms, dts_ms) = if sourceFrameRefCon.is_null() {
        (0, 0)
    } else {
        *Box::from_raw(sourceFrameRefCon as *mut (i64, i64))
    };

    if status != 0 {
        warn!(status, "decompression callback received error");
        return;
    }
    if imageBuffer.is_null() {
        warn!("decompression callback received null imageBuffer");
        return;
    }

    let ctx = &*(decompressionOutputRefCon as *const CallbackContext);

    let lock_status = ffi::CVPixelBufferLockBaseAddress(imageBuffer, ffi::kCVPixelBufferLock_ReadOnly);
    if lock_status != ffi::kCVReturnSuccess {
        warn!(lock_status, "CVPixelBufferLockBaseAddress failed");
        return;
    }

    let width = ffi::CVPixelBufferGetWidth(imageBuffer);
    let height = ffi::CVPixelBufferGetHeight(imageBuffer);
    let y_height = ffi::CVPixelBufferGetHeightOfPlane(imageBuffer, 0);
    let uv_height = ffi::CVPixelBufferGetHeightOfPlane(imageBuffer, 1);

    let mut pixels = vec![0u8; width * y_height + width * uv_height];

    let y_src = ffi::CVPixelBufferGetBaseAddressOfPlane(imageBuffer, 0);
    let y_stride = ffi::CVPixelBufferGetBytesPerRowOfPlane(imageBuffer, 0);
    if !y_src.is_null() {
        copy_plane(y_src, y_stride, width, y_height, pixels.as_mut_ptr());
    }

    let uv_src = ffi::CVPixelBufferGetBaseAddressOfPlane(imageBuffer, 1);
    let uv_stride = ffi::CVPixelBufferGetBytesPerRowOfPlane(imageBuffer, 1);
    if !uv_src.is_null() {
        copy_plane(
            uv_src,
            uv_stride,
            width,
            uv_height,
            pixels.as_mut_ptr().add(width * y_height),
        );
    }

    ffi::CVPixelBufferUnlockBaseAddress(imageBuffer, ffi::kCVPixelBufferLock_ReadOnly);

    trace!(width, height, pts_ms, dts_ms, "decoded video frame");
    let _ = ctx.tx.send(VideoFrame { pixels, pts_ms, dts_ms });
}

unsafe fn copy_plane(src: *const u8, stride: usize, width: usize, height: usize, dst: *mut u8) {
    if stride == width {
        std::ptr::copy_nonoverlapping(src, dst, width * height);
    } else {
        for row in 0..height {
            std::ptr::copy_nonoverlapping(src.add(row * stride), dst.add(row * width), width);
        }
    }
}
