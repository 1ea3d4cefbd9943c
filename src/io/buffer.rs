use crate::{IoBenchError, Result};
use std::ffi::c_void;
use std::ptr::{self, NonNull};

/// Heap block aligned for direct I/O, freed exactly once on drop
#[derive(Debug)]
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    alignment: usize,
}

impl AlignedBuffer {
    /// Allocate `len` bytes aligned to `alignment` and fill them with `fill`.
    ///
    /// `alignment` must be a power of two and a multiple of the pointer size.
    pub fn new(len: usize, alignment: usize, fill: u8) -> Result<Self> {
        if len == 0 {
            return Err(IoBenchError::InvalidArgument(
                "Buffer size must be greater than 0".to_string(),
            ));
        }
        if !alignment.is_power_of_two() || alignment % std::mem::size_of::<*const u8>() != 0 {
            return Err(IoBenchError::InvalidArgument(format!(
                "Invalid buffer alignment: {}",
                alignment
            )));
        }

        let mut raw: *mut c_void = ptr::null_mut();
        let ret = unsafe { libc::posix_memalign(&mut raw, alignment, len) };
        if ret != 0 {
            return Err(IoBenchError::AllocationFailed {
                size: len,
                source: std::io::Error::from_raw_os_error(ret),
            });
        }
        let ptr = NonNull::new(raw as *mut u8).ok_or_else(|| IoBenchError::AllocationFailed {
            size: len,
            source: std::io::Error::from_raw_os_error(libc::ENOMEM),
        })?;

        // Touch every page so each run starts from identical, resident memory
        unsafe { ptr::write_bytes(ptr.as_ptr(), fill, len) };

        Ok(Self {
            ptr,
            len,
            alignment,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { libc::free(self.ptr.as_ptr() as *mut c_void) };
    }
}
