//! Error types for the boot sequence.
//!
//! Every variant is fatal. The sequencer stops at the first error and `main`
//! turns it into a message on stderr and a non-zero exit, so each variant
//! carries enough context (operation, path) to name what failed.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::decompress::DecompressError;

/// Result alias used across the sequencer.
pub type BootResult<T> = Result<T, BootError>;

/// Boot phases, in the order they run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    LoadModules,
    CleanInitramfs,
    EstablishRoot,
    SwitchRoot,
    ExecInit,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::LoadModules => "module loading",
            Phase::CleanInitramfs => "initramfs cleanup",
            Phase::EstablishRoot => "root mount",
            Phase::SwitchRoot => "root switch",
            Phase::ExecInit => "init exec",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BootError {
    /// The module manifest could not be opened or read.
    #[error("could not read manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// stat/open/mmap of a module file failed.
    #[error("could not {op} {}: {source}", .path.display())]
    ModuleIo {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("decompression of {} failed: {source}", .path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: DecompressError,
    },

    /// The kernel rejected a module.
    #[error("init_module failed for {}: {source}", .path.display())]
    Inject {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("mkdir {} failed: {source}", .path.display())]
    MountPoint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("mount {what} failed: {source}")]
    Mount {
        what: String,
        #[source]
        source: nix::Error,
    },

    #[error("chdir {} failed: {source}", .path.display())]
    Chdir {
        path: PathBuf,
        phase: Phase,
        #[source]
        source: nix::Error,
    },

    #[error("chroot {} failed: {source}", .path.display())]
    Chroot {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("exec {program} failed: {source}")]
    Exec {
        program: String,
        #[source]
        source: nix::Error,
    },
}

impl BootError {
    pub fn module_io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::ModuleIo {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn mount_point(path: &Path, source: io::Error) -> Self {
        Self::MountPoint {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The phase the sequencer was in when this error was raised.
    pub fn phase(&self) -> Phase {
        match self {
            BootError::Manifest { .. }
            | BootError::ModuleIo { .. }
            | BootError::Decompress { .. }
            | BootError::Inject { .. } => Phase::LoadModules,
            BootError::MountPoint { .. } | BootError::Mount { .. } => Phase::EstablishRoot,
            BootError::Chdir { phase, .. } => *phase,
            BootError::Chroot { .. } => Phase::SwitchRoot,
            BootError::Exec { .. } => Phase::ExecInit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn test_error_display() {
        let err = BootError::module_io(
            "stat",
            Path::new("/lib/modules/virtio.ko.xz"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(err
            .to_string()
            .starts_with("could not stat /lib/modules/virtio.ko.xz"));

        let err = BootError::Inject {
            path: PathBuf::from("9p.ko.xz"),
            source: Errno::EEXIST,
        };
        assert!(err.to_string().contains("init_module failed for 9p.ko.xz"));
    }

    #[test]
    fn test_error_phase() {
        let err = BootError::Decompress {
            path: PathBuf::from("a.ko.xz"),
            source: DecompressError::Incomplete("MemNeeded".into()),
        };
        assert_eq!(err.phase(), Phase::LoadModules);

        let err = BootError::Mount {
            what: "rootfs on /ro".into(),
            source: Errno::ENODEV,
        };
        assert_eq!(err.phase(), Phase::EstablishRoot);

        let err = BootError::Chdir {
            path: PathBuf::from("/ov"),
            phase: Phase::SwitchRoot,
            source: Errno::ENOENT,
        };
        assert_eq!(err.phase(), Phase::SwitchRoot);

        let err = BootError::Exec {
            program: "init".into(),
            source: Errno::ENOENT,
        };
        assert_eq!(err.phase(), Phase::ExecInit);
        assert_eq!(err.phase().to_string(), "init exec");
    }
}
