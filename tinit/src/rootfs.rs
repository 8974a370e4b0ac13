//! Target root filesystem setup.
//!
//! Two layouts exist and a build uses exactly one of them:
//!
//! - [`Topology::Overlay`]: the 9p share is mounted read-only at `ro` and an
//!   overlay (lower `ro`, upper `rw`, work `wk`) is composed at `ov`.
//! - [`Topology::DirectReplace`]: the 9p share is mounted at `newroot` and
//!   move-mounted over the current root.

use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use nix::mount::MsFlags;

use crate::constants::{
    DIRECT_MOUNT_DIR, MOUNT_DIR_MODE, OVERLAY_DIR, RO_DIR, ROOTFS_FSTYPE, ROOTFS_OPTIONS,
    ROOTFS_SOURCE, RW_DIR, WORK_DIR,
};
use crate::error::{BootError, BootResult, Phase};
use crate::kernel::{Kernel, MountSpec};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Topology {
    /// Read-only 9p base plus a writable overlay layer.
    Overlay,
    /// 9p share moved onto the root directly.
    DirectReplace,
}

impl Topology {
    /// The layout compiled into this build (`direct-root` feature).
    pub const fn deployed() -> Self {
        if cfg!(feature = "direct-root") {
            Topology::DirectReplace
        } else {
            Topology::Overlay
        }
    }

    /// Create mount points and mount the target root below `root`.
    ///
    /// Returns the directory to switch into. All mounts have succeeded by
    /// the time this returns `Ok`.
    pub fn establish<K: Kernel>(self, root: &Path, kernel: &mut K) -> BootResult<PathBuf> {
        match self {
            Topology::Overlay => establish_overlay(root, kernel),
            Topology::DirectReplace => establish_direct(root, kernel),
        }
    }
}

fn establish_overlay<K: Kernel>(root: &Path, kernel: &mut K) -> BootResult<PathBuf> {
    let ro = root.join(RO_DIR);
    let rw = root.join(RW_DIR);
    let wk = root.join(WORK_DIR);
    let ov = root.join(OVERLAY_DIR);

    for dir in [&ro, &rw, &wk, &ov] {
        create_mount_point(dir)?;
    }

    mount(kernel, &rootfs_mount(&ro))?;

    let overlay = MountSpec::new(ROOTFS_SOURCE, &ov)
        .fstype("overlay")
        .data(format!(
            "lowerdir={},upperdir={},workdir={}",
            ro.display(),
            rw.display(),
            wk.display()
        ));
    mount(kernel, &overlay)?;

    tracing::info!("Overlay root assembled at {}", ov.display());
    Ok(ov)
}

fn establish_direct<K: Kernel>(root: &Path, kernel: &mut K) -> BootResult<PathBuf> {
    let target = root.join(DIRECT_MOUNT_DIR);
    create_mount_point(&target)?;

    mount(kernel, &rootfs_mount(&target))?;

    kernel.chdir(&target).map_err(|source| BootError::Chdir {
        path: target.clone(),
        phase: Phase::EstablishRoot,
        source,
    })?;

    mount(kernel, &MountSpec::new(".", root).flags(MsFlags::MS_MOVE))?;

    tracing::info!("Root share moved onto {}", root.display());
    Ok(PathBuf::from("."))
}

fn rootfs_mount(target: &Path) -> MountSpec {
    MountSpec::new(ROOTFS_SOURCE, target)
        .fstype(ROOTFS_FSTYPE)
        .data(ROOTFS_OPTIONS)
}

fn mount<K: Kernel>(kernel: &mut K, spec: &MountSpec) -> BootResult<()> {
    tracing::info!("Mounting {}", spec.describe());
    kernel.mount(spec).map_err(|source| BootError::Mount {
        what: spec.describe(),
        source,
    })
}

/// Mount points must be fresh: an existing path is an error.
fn create_mount_point(path: &Path) -> BootResult<()> {
    DirBuilder::new()
        .mode(MOUNT_DIR_MODE)
        .create(path)
        .map_err(|e| BootError::mount_point(path, e))
}
