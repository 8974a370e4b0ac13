//! Shared fixtures for tinit integration tests.
//!
//! - [`RecordingKernel`]: a [`Kernel`] that records every call instead of
//!   touching the running system, with optional injected failures.
//! - [`BootFixture`]: a throwaway initramfs root with a manifest and
//!   xz-compressed module files.

use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::errno::Errno;
use parking_lot::Mutex;
use tempfile::TempDir;
use tinit::{BootConfig, Kernel, MountSpec, Topology};

/// One recorded kernel call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    InitModule(Vec<u8>),
    Mount(MountSpec),
    Chdir(PathBuf),
    Chroot(PathBuf),
    Exec { program: String, argv: Vec<String> },
}

/// Which call should fail, and how.
#[derive(Clone, Debug, Default)]
pub struct Failures {
    /// Fail the n-th (0-based) init_module call.
    pub init_module: Option<usize>,
    /// Fail the n-th (0-based) mount call.
    pub mount: Option<usize>,
    pub chdir: bool,
    pub chroot: bool,
}

/// Errno returned by the recorded exec, standing in for "exec returned".
pub const EXEC_ERRNO: Errno = Errno::ENOEXEC;

#[derive(Clone, Default)]
pub struct RecordingKernel {
    calls: Arc<Mutex<Vec<Call>>>,
    failures: Failures,
}

impl RecordingKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: Failures) -> Self {
        Self {
            calls: Arc::default(),
            failures,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Payloads handed to init_module, in call order.
    pub fn modules(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::InitModule(image) => Some(image.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn mounts(&self) -> Vec<MountSpec> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Mount(spec) => Some(spec.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn execs(&self) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Exec { .. }))
            .cloned()
            .collect()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|&call| pred(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl Kernel for RecordingKernel {
    fn init_module(&mut self, image: &[u8]) -> nix::Result<()> {
        let index = self.count(|c| matches!(c, Call::InitModule(_)));
        self.record(Call::InitModule(image.to_vec()));
        if self.failures.init_module == Some(index) {
            return Err(Errno::EEXIST);
        }
        Ok(())
    }

    fn mount(&mut self, spec: &MountSpec) -> nix::Result<()> {
        let index = self.count(|c| matches!(c, Call::Mount(_)));
        self.record(Call::Mount(spec.clone()));
        if self.failures.mount == Some(index) {
            return Err(Errno::ENODEV);
        }
        Ok(())
    }

    fn chdir(&mut self, path: &Path) -> nix::Result<()> {
        self.record(Call::Chdir(path.to_path_buf()));
        if self.failures.chdir {
            return Err(Errno::ENOENT);
        }
        Ok(())
    }

    fn chroot(&mut self, path: &Path) -> nix::Result<()> {
        self.record(Call::Chroot(path.to_path_buf()));
        if self.failures.chroot {
            return Err(Errno::EPERM);
        }
        Ok(())
    }

    fn exec(&mut self, program: &CStr, argv: &[CString]) -> nix::Result<Infallible> {
        self.record(Call::Exec {
            program: program.to_string_lossy().into_owned(),
            argv: argv
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        });
        Err(EXEC_ERRNO)
    }
}

/// Compress `data` as a single `.xz` stream.
pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).expect("xz encode");
    encoder.finish().expect("xz finish")
}

/// Fake module body: an ELF-looking header followed by `len` filler bytes.
pub fn fake_module(name: &str, len: usize) -> Vec<u8> {
    let mut body = b"\x7fELF".to_vec();
    body.extend_from_slice(name.as_bytes());
    body.extend((0..len).map(|i| (i % 251) as u8));
    body
}

/// A temporary initramfs root.
pub struct BootFixture {
    pub root: PathBuf,
    _temp_dir: TempDir, // Dropped after test
}

impl BootFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("initramfs");
        std::fs::create_dir(&root).expect("Failed to create initramfs root");
        Self {
            root,
            _temp_dir: temp_dir,
        }
    }

    /// Write an already-compressed module file below `lib/modules`.
    pub fn add_raw_module(&self, name: &str, contents: &[u8]) -> PathBuf {
        let dir = self.root.join("lib/modules");
        std::fs::create_dir_all(&dir).expect("Failed to create module dir");
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("Failed to write module");
        path
    }

    /// Compress `body` and write it below `lib/modules`.
    pub fn add_module(&self, name: &str, body: &[u8]) -> PathBuf {
        self.add_raw_module(name, &xz(body))
    }

    /// Write the manifest at `modules.list` listing `paths`, one per line.
    pub fn write_manifest(&self, paths: &[PathBuf]) -> PathBuf {
        let mut contents = Vec::new();
        for path in paths {
            contents.extend_from_slice(path.as_os_str().as_encoded_bytes());
            contents.push(b'\n');
        }
        let manifest = self.root.join("modules.list");
        std::fs::write(&manifest, contents).expect("Failed to write manifest");
        manifest
    }

    /// Other initramfs content the teardown should remove.
    pub fn add_initramfs_files(&self) {
        std::fs::create_dir_all(self.root.join("bin")).expect("mkdir bin");
        std::fs::create_dir_all(self.root.join("etc/init.d")).expect("mkdir etc");
        std::fs::write(self.root.join("bin/tinit"), b"\x7fELF").expect("write tinit");
        std::fs::write(self.root.join("etc/init.d/rcS"), b"#!/bin/sh\n").expect("write rcS");
    }

    pub fn config(&self, topology: Topology) -> BootConfig {
        BootConfig {
            root: self.root.clone(),
            topology,
            ..BootConfig::default()
        }
    }

    /// Names left directly under the root, sorted.
    pub fn root_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.root)
            .expect("read root")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

impl Default for BootFixture {
    fn default() -> Self {
        Self::new()
    }
}
