//! The boot sequence.
//!
//! ```text
//! load modules -> clean initramfs -> establish root -> switch root -> exec init
//! ```
//!
//! Every step either succeeds or returns the error that ends the boot. No
//! step is retried or rolled back.

use std::convert::Infallible;
use std::ffi::CString;
use std::path::{Path, PathBuf};

use nix::errno::Errno;

use crate::console;
use crate::constants::INIT_PROGRAM;
use crate::decompress::Decompressor;
use crate::error::{BootError, BootResult, Phase};
use crate::image::ModuleImage;
use crate::kernel::Kernel;
use crate::manifest::Manifest;
use crate::rootfs::Topology;
use crate::teardown::{self, MAX_WALK_DEPTH};

/// Where and how the boot sequence runs.
#[derive(Clone, Debug)]
pub struct BootConfig {
    /// Root of the initramfs, `/` in production.
    pub root: PathBuf,
    pub topology: Topology,
    /// Program executed after the switch, relative to the new root.
    pub init: String,
    pub walk_depth: usize,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            topology: Topology::deployed(),
            init: INIT_PROGRAM.to_string(),
            walk_depth: MAX_WALK_DEPTH,
        }
    }
}

pub struct Sequencer<K: Kernel> {
    config: BootConfig,
    kernel: K,
    decompressor: Decompressor,
}

impl<K: Kernel> Sequencer<K> {
    pub fn new(config: BootConfig, kernel: K) -> Self {
        Self {
            config,
            kernel,
            decompressor: Decompressor::default(),
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Run the whole boot. Only returns if a step failed.
    pub fn run(&mut self, manifest: &Path) -> BootResult<Infallible> {
        console::welcome();
        tracing::info!(
            "Booting with {:?} topology, manifest {}",
            self.config.topology,
            manifest.display()
        );

        console::announce(Phase::LoadModules);
        let loaded = self.load_modules(manifest)?;
        tracing::info!("Loaded {} kernel modules", loaded);

        console::announce(Phase::CleanInitramfs);
        teardown::remove_tree(&self.config.root, self.config.walk_depth);

        console::announce(Phase::EstablishRoot);
        let target = self
            .config
            .topology
            .establish(&self.config.root, &mut self.kernel)?;

        console::announce(Phase::SwitchRoot);
        self.switch_root(&target)?;

        self.exec_init()
    }

    /// Load every module named in the manifest, in order.
    ///
    /// Stops at the first entry that cannot be mapped, decompressed or
    /// loaded; later entries are never read.
    pub fn load_modules(&mut self, manifest: &Path) -> BootResult<usize> {
        let manifest = Manifest::open(manifest)?;
        tracing::debug!("Reading module list {}", manifest.path().display());

        let mut loaded = 0;
        for path in manifest {
            self.load_module(&path?)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    fn load_module(&mut self, path: &Path) -> BootResult<()> {
        let module = {
            let image = ModuleImage::map(path)?;
            self.decompressor
                .decompress(image.as_bytes())
                .map_err(|source| BootError::Decompress {
                    path: path.to_path_buf(),
                    source,
                })?
        };

        self.kernel
            .init_module(&module)
            .map_err(|source| BootError::Inject {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!("Loaded {} ({} bytes)", path.display(), module.len());
        Ok(())
    }

    fn switch_root(&mut self, target: &Path) -> BootResult<()> {
        self.kernel.chdir(target).map_err(|source| BootError::Chdir {
            path: target.to_path_buf(),
            phase: Phase::SwitchRoot,
            source,
        })?;

        self.kernel
            .chroot(Path::new("."))
            .map_err(|source| BootError::Chroot {
                path: target.to_path_buf(),
                source,
            })
    }

    fn exec_init(&mut self) -> BootResult<Infallible> {
        let exec_error = |source| BootError::Exec {
            program: self.config.init.clone(),
            source,
        };

        let program =
            CString::new(self.config.init.as_str()).map_err(|_| exec_error(Errno::EINVAL))?;
        let argv = [program.clone()];

        tracing::info!("Executing {}", self.config.init);
        match self.kernel.exec(&program, &argv) {
            Ok(never) => match never {},
            Err(source) => Err(exec_error(source)),
        }
    }
}
