use std::{ptr::NonNull, slice};

use crate::{brk::ProgramBreak, error::AllocError, utils::align};

/// A program break living inside one region reserved from the operating
/// system up front.
///
/// The region is mapped once with the requested capacity (rounded up to the
/// page size) and the break simply moves inside it, so extending never
/// relocates memory already handed out. The region goes back to the kernel
/// when the break is dropped.
///
/// ```text
///  base                         end                      base + capacity
///   +----------------------------+-----------------------------+
///   |      heap (in use)         |      reserved, not used     |
///   +----------------------------+-----------------------------+
/// ```
#[derive(Debug)]
pub struct MappedBreak {
    base: NonNull<u8>,
    capacity: usize,
    end: usize,
}

/// Operating system calls backing a [`MappedBreak`]. One implementation per
/// platform lives below.
trait PlatformMemory {
    /// Maps `len` readable and writable bytes, or `None` if the kernel refuses.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Unmaps the `len` bytes at `addr` obtained from `request_memory`.
    unsafe fn return_memory(addr: *mut u8, len: usize);

    /// Granularity of mappings, in bytes.
    unsafe fn page_size() -> usize;
}

impl MappedBreak {
    /// Reserves a region able to hold at least `capacity` bytes.
    pub fn reserve(capacity: usize) -> Result<Self, AllocError> {
        let page_size = unsafe { Self::page_size() };
        let capacity = align(capacity.max(1), page_size).ok_or(AllocError::OutOfMemory)?;

        let base = unsafe { Self::request_memory(capacity) }.ok_or(AllocError::OutOfMemory)?;

        log::debug!("reserved {capacity} bytes at {:?} for the program break", base);

        Ok(Self {
            base,
            capacity,
            end: 0,
        })
    }

    /// Size of the reserved region. The break can never move past it.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl ProgramBreak for MappedBreak {
    fn current(&self) -> usize {
        self.end
    }

    fn extend(&mut self, increment: usize) -> Option<usize> {
        let old = self.end;
        self.end = old
            .checked_add(increment)
            .filter(|new| *new <= self.capacity)?;

        Some(old)
    }

    fn shrink_to(&mut self, end: usize) {
        self.end = self.end.min(end);
    }

    fn memory(&self) -> &[u8] {
        // SAFETY: `[base, base + end)` lies inside the mapping owned by `self`,
        // which is readable and writable for as long as `self` lives.
        unsafe { slice::from_raw_parts(self.base.as_ptr(), self.end) }
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        // SAFETY: see `memory`; `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.end) }
    }
}

impl Drop for MappedBreak {
    fn drop(&mut self) {
        unsafe { Self::return_memory(self.base.as_ptr(), self.capacity) }
    }
}

#[cfg(unix)]
mod unix {
    use std::{os::raw::c_void, ptr::NonNull};

    use super::{MappedBreak, PlatformMemory};

    impl PlatformMemory for MappedBreak {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            let prot = libc::PROT_READ | libc::PROT_WRITE;
            let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

            let addr = unsafe { libc::mmap(std::ptr::null_mut(), len, prot, flags, -1, 0) };
            if addr == libc::MAP_FAILED {
                return None;
            }

            NonNull::new(addr.cast::<u8>())
        }

        unsafe fn return_memory(addr: *mut u8, len: usize) {
            unsafe {
                libc::munmap(addr.cast::<c_void>(), len);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }
}

#[cfg(windows)]
mod win32 {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use windows::Win32::System::{Memory, SystemInformation};

    use super::{MappedBreak, PlatformMemory};

    impl PlatformMemory for MappedBreak {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            let addr = unsafe { Memory::VirtualAlloc(None, len, flags, Memory::PAGE_READWRITE) };

            NonNull::new(addr.cast::<u8>())
        }

        unsafe fn return_memory(addr: *mut u8, _len: usize) {
            // MEM_RELEASE frees the whole reservation and requires a zero size.
            unsafe {
                let _ = Memory::VirtualFree(addr.cast::<c_void>(), 0, Memory::MEM_RELEASE);
            }
        }

        unsafe fn page_size() -> usize {
            let mut system_info = MaybeUninit::uninit();

            unsafe {
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());
                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}
