//! Privileged system calls used by the boot sequence.
//!
//! The sequencer only talks to the kernel through [`Kernel`], so the whole
//! boot flow can run against a recording implementation in tests.

use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};

use nix::mount::MsFlags;

/// One `mount(2)` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MountSpec {
    pub source: String,
    pub target: PathBuf,
    pub fstype: Option<String>,
    pub flags: MsFlags,
    pub data: Option<String>,
}

impl MountSpec {
    pub fn new(source: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            fstype: None,
            flags: MsFlags::empty(),
            data: None,
        }
    }

    pub fn fstype(mut self, fstype: impl Into<String>) -> Self {
        self.fstype = Some(fstype.into());
        self
    }

    pub fn flags(mut self, flags: MsFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Short description for logs and error messages.
    pub fn describe(&self) -> String {
        let mut desc = format!("{} on {}", self.source, self.target.display());
        if let Some(fstype) = &self.fstype {
            desc.push_str(&format!(" type {}", fstype));
        }
        if self.flags.contains(MsFlags::MS_MOVE) {
            desc.push_str(" (move)");
        }
        if let Some(data) = &self.data {
            desc.push_str(&format!(" ({})", data));
        }
        desc
    }
}

pub trait Kernel {
    /// Load a decompressed module image with an empty parameter string.
    fn init_module(&mut self, image: &[u8]) -> nix::Result<()>;

    fn mount(&mut self, spec: &MountSpec) -> nix::Result<()>;

    fn chdir(&mut self, path: &Path) -> nix::Result<()>;

    fn chroot(&mut self, path: &Path) -> nix::Result<()>;

    /// Replace the process image. Only ever returns on failure.
    fn exec(&mut self, program: &CStr, argv: &[CString]) -> nix::Result<Infallible>;
}

/// The running Linux kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinuxKernel;

impl Kernel for LinuxKernel {
    fn init_module(&mut self, image: &[u8]) -> nix::Result<()> {
        nix::kmod::init_module(image, c"")
    }

    fn mount(&mut self, spec: &MountSpec) -> nix::Result<()> {
        nix::mount::mount(
            Some(spec.source.as_str()),
            spec.target.as_path(),
            spec.fstype.as_deref(),
            spec.flags,
            spec.data.as_deref(),
        )
    }

    fn chdir(&mut self, path: &Path) -> nix::Result<()> {
        nix::unistd::chdir(path)
    }

    fn chroot(&mut self, path: &Path) -> nix::Result<()> {
        nix::unistd::chroot(path)
    }

    fn exec(&mut self, program: &CStr, argv: &[CString]) -> nix::Result<Infallible> {
        nix::unistd::execv(program, argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_9p_mount() {
        let spec = MountSpec::new("rootfs", "/ro")
            .fstype("9p")
            .data("trans=virtio");
        assert_eq!(spec.describe(), "rootfs on /ro type 9p (trans=virtio)");
    }

    #[test]
    fn test_describe_move_mount() {
        let spec = MountSpec::new(".", "/").flags(MsFlags::MS_MOVE);
        assert_eq!(spec.describe(), ". on / (move)");
    }
}
