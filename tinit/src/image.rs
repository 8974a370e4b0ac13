//! Read-only memory mapping of a compressed module file.

use std::ffi::c_void;
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};

use crate::error::{BootError, BootResult};

/// A compressed module mapped `PROT_READ`/`MAP_PRIVATE`, unmapped on drop.
///
/// Zero-length files get no mapping (mmap rejects a zero length); they
/// expose an empty slice instead.
pub struct ModuleImage {
    path: PathBuf,
    addr: Option<NonNull<c_void>>,
    len: usize,
}

impl ModuleImage {
    pub fn map(path: &Path) -> BootResult<Self> {
        let metadata =
            std::fs::metadata(path).map_err(|e| BootError::module_io("stat", path, e))?;
        let len = metadata.len() as usize;

        let file = File::open(path).map_err(|e| BootError::module_io("open", path, e))?;

        let Some(length) = NonZeroUsize::new(len) else {
            tracing::debug!("{} is empty, nothing to map", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                addr: None,
                len: 0,
            });
        };

        // SAFETY: fresh private read-only mapping of a file we just opened; the
        // mapping stays valid after `file` is closed and is only released in Drop.
        let addr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ,
                MapFlags::MAP_PRIVATE,
                &file,
                0,
            )
        }
        .map_err(|e| BootError::module_io("mmap", path, e.into()))?;

        Ok(Self {
            path: path.to_path_buf(),
            addr: Some(addr),
            len,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self.addr {
            // SAFETY: `addr` points to `len` readable bytes until Drop.
            Some(addr) => unsafe {
                std::slice::from_raw_parts(addr.as_ptr() as *const u8, self.len)
            },
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ModuleImage {
    fn drop(&mut self) {
        if let Some(addr) = self.addr.take() {
            // SAFETY: mapping created in `map` with this exact length.
            if let Err(e) = unsafe { munmap(addr, self.len) } {
                tracing::warn!("munmap of {} failed: {}", self.path.display(), e);
            }
        }
    }
}
