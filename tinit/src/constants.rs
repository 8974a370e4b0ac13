//! Fixed names and parameters of the boot layout.

/// Source tag of the 9p share holding the real root.
pub const ROOTFS_SOURCE: &str = "rootfs";
pub const ROOTFS_FSTYPE: &str = "9p";
pub const ROOTFS_OPTIONS: &str = "trans=virtio";

// Overlay topology mount points, relative to the old root.
pub const RO_DIR: &str = "ro";
pub const RW_DIR: &str = "rw";
pub const WORK_DIR: &str = "wk";
pub const OVERLAY_DIR: &str = "ov";

/// Direct-replace topology mount point.
pub const DIRECT_MOUNT_DIR: &str = "newroot";

pub const MOUNT_DIR_MODE: u32 = 0o755;

/// Program executed in the new root.
pub const INIT_PROGRAM: &str = "init";
