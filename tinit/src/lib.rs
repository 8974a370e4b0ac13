//! tinit - early-boot sequencer for the VM initramfs.
//!
//! Loads xz-compressed kernel modules listed in a manifest, removes the
//! initramfs, mounts the real root over 9p (optionally under a writable
//! overlay), chroots into it and execs `init`.

#[cfg(not(target_os = "linux"))]
compile_error!("tinit is Linux-only; build with a Linux target");

pub mod boot;
pub mod console;
pub mod constants;
pub mod decompress;
pub mod error;
pub mod image;
pub mod kernel;
pub mod manifest;
pub mod rootfs;
pub mod teardown;

pub use boot::{BootConfig, Sequencer};
pub use decompress::{decompress, DecompressError, Decompressor};
pub use error::{BootError, BootResult, Phase};
pub use kernel::{Kernel, LinuxKernel, MountSpec};
pub use rootfs::Topology;
