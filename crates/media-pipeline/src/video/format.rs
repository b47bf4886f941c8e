use std::ffi::c_void;

use tracing::debug;

use super::ffi;

/// Wraps a `CMVideoFormatDescription` created from H.264 SPS/PPS parameter
/// sets (spec.md §4.2: "fails with `FormatDescriptionInvalid` if the
/// platform rejects the SPS/PPS pair").
pub struct FormatDescription {
    inner: ffi::CMVideoFormatDescriptionRef,
}

impl FormatDescription {
    pub fn from_h264_parameter_sets(
        sps: &[u8],
        pps: &[u8],
        nalu_length_size: u8,
    ) -> Result<Self, i32> {
        let pointers: [*const u8; 2] = [sps.as_ptr(), pps.as_ptr()];
        let sizes: [usize; 2] = [sps.len(), pps.len()];

        let mut format_desc: ffi::CMVideoFormatDescriptionRef = std::ptr::null_mut();

        let status = unsafe {
            ffi::CMVideoFormatDescriptionCreateFromH264ParameterSets(
                ffi::kCFAllocatorDefault,
                pointers.len(),
                pointers.as_ptr(),
                sizes.as_ptr(),
                nalu_length_size as i32,
                &mut format_desc,
            )
        };

        if status != 0 {
            tracing::error!(status, "CMVideoFormatDescriptionCreateFromH264ParameterSets failed");
            return Err(status);
        }

        debug!("created CMVideoFormatDescription from SPS/PPS");
        Ok(FormatDescription { inner: format_desc })
    }

    pub fn as_ref(&self) -> ffi::CMVideoFormatDescriptionRef {
        self.inner
    }

    /// Coded dimensions, as reported by VideoToolbox from the parameter sets.
    pub fn dimensions(&self) -> (u32, u32) {
        let dims = unsafe { ffi::CMVideoFormatDescriptionGetDimensions(self.inner) };
        (dims.width.max(0) as u32, dims.height.max(0) as u32)
    }
}

impl Drop for FormatDescription {
    fn drop(&mut self) {
        if !self.inner.is_null() {
            unsafe { ffi::CFRelease(self.inner as *const c_void) };
        }
    }
}

// SAFETY: CMVideoFormatDescription is a CF type that is thread-safe for read access.
unsafe impl Send for FormatDescription {}
unsafe impl Sync for FormatDescription {}
