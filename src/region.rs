//! Page-aligned memory for the allocator to manage, taken straight from the
//! kernel with an anonymous private mapping. The allocator itself never
//! calls into here; callers use it to obtain a segment for
//! [`crate::ExplicitAllocator::init`].

use std::{io, ptr::NonNull, slice};

#[derive(Debug)]
pub struct MappedRegion {
  base: NonNull<u8>,
  len: usize,
}

impl MappedRegion {
  /// Maps `len` zeroed, readable and writable bytes.
  pub fn new(len: usize) -> io::Result<Self> {
    if len == 0 {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "cannot map an empty region",
      ));
    }

    // SAFETY: a fresh anonymous private mapping with a null hint aliases no
    // existing memory; failure is reported through MAP_FAILED.
    let addr = unsafe {
      libc::mmap(
        std::ptr::null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if addr == libc::MAP_FAILED {
      return Err(io::Error::last_os_error());
    }

    let base = NonNull::new(addr as *mut u8)
      .ok_or_else(|| io::Error::other("mmap returned a null mapping"))?;

    log::debug!("mapped {len} bytes at {:?}", base);

    Ok(Self { base, len })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn as_ptr(&self) -> *const u8 {
    self.base.as_ptr()
  }

  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    // SAFETY: `base` points at `len` bytes mapped read/write in `new`, and
    // they stay mapped until `self` is dropped. `&mut self` makes the
    // returned slice the only live reference.
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
  }
}

impl Drop for MappedRegion {
  fn drop(&mut self) {
    // SAFETY: `base` and `len` describe exactly the mapping made in `new`,
    // and no slice into it outlives `self`.
    let rc = unsafe { libc::munmap(self.base.as_ptr().cast(), self.len) };
    if rc != 0 {
      log::warn!(
        "munmap of {} bytes at {:?} failed: {}",
        self.len,
        self.base,
        io::Error::last_os_error()
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mapping_is_page_aligned_and_zeroed() {
    let mut region = MappedRegion::new(8192).unwrap();
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;

    assert_eq!(region.as_ptr() as usize % page, 0);
    assert_eq!(region.len(), 8192);
    assert!(region.as_mut_slice().iter().all(|&b| b == 0));

    region.as_mut_slice()[8191] = 0xFF;
    assert_eq!(region.as_mut_slice()[8191], 0xFF);
  }

  #[test]
  fn empty_mapping_is_rejected() {
    let err = MappedRegion::new(0).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
  }
}
