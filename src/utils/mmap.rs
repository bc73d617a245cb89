use {
    crate::utils::oserror::OsError,
    std::ptr,
    uapi::c,
};

/// A shared, writable mapping that is unmapped when dropped.
pub struct Mmapped {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for Mmapped {}
unsafe impl Sync for Mmapped {}

pub fn mmap_shared(len: usize, fd: c::c_int, offset: c::off_t) -> Result<Mmapped, OsError> {
    let res = unsafe {
        c::mmap(
            ptr::null_mut(),
            len,
            c::PROT_READ | c::PROT_WRITE,
            c::MAP_SHARED,
            fd,
            offset,
        )
    };
    if res == c::MAP_FAILED {
        Err(OsError::default())
    } else {
        Ok(Mmapped {
            ptr: res.cast(),
            len,
        })
    }
}

impl Mmapped {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for Mmapped {
    fn drop(&mut self) {
        unsafe {
            c::munmap(self.ptr.cast(), self.len);
        }
    }
}
