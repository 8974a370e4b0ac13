//! Initramfs removal.
//!
//! Post-order walk of the old root: files are unlinked, directories are
//! removed once their contents are gone. Best-effort throughout, a failed
//! entry is logged and counted but never stops the walk.

use std::path::Path;

use walkdir::WalkDir;

/// Depth limit of the teardown walk.
pub const MAX_WALK_DEPTH: usize = 100;

/// Outcome of a teardown walk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TeardownReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub failures: usize,
}

/// Remove everything below `root`, keeping `root` itself.
///
/// Does not descend into other filesystems mounted under `root` (proc,
/// devtmpfs, ...) and never follows symlinks.
pub fn remove_tree(root: &Path, max_depth: usize) -> TeardownReport {
    let mut report = TeardownReport::default();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .contents_first(true)
        .same_file_system(true)
        .follow_links(false);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                report.failures += 1;
                continue;
            }
        };

        let path = entry.path();
        let result = if entry.file_type().is_dir() {
            std::fs::remove_dir(path).map(|_| report.dirs_removed += 1)
        } else {
            std::fs::remove_file(path).map(|_| report.files_removed += 1)
        };

        match result {
            Ok(()) => tracing::trace!("Removed {}", path.display()),
            Err(e) => {
                tracing::debug!("Could not remove {}: {}", path.display(), e);
                report.failures += 1;
            }
        }
    }

    tracing::info!(
        "Initramfs cleanup: {} files, {} directories removed ({} failures)",
        report.files_removed,
        report.dirs_removed,
        report.failures
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    fn populate(root: &Path) {
        std::fs::create_dir_all(root.join("lib/modules/6.1")).unwrap();
        std::fs::create_dir_all(root.join("etc")).unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
        std::fs::write(root.join("init"), b"#!/bin/sh").unwrap();
        std::fs::write(root.join("modules.list"), b"lib/modules/6.1/virtio.ko.xz\n").unwrap();
        std::fs::write(root.join("lib/modules/6.1/virtio.ko.xz"), b"xz").unwrap();
        std::fs::write(root.join("lib/modules/6.1/9p.ko.xz"), b"xz").unwrap();
        std::fs::write(root.join("etc/hostname"), b"goblin").unwrap();
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[test]
    fn test_removes_everything_below_root() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());

        let report = remove_tree(dir.path(), MAX_WALK_DEPTH);

        assert!(dir.path().exists());
        assert!(is_empty_dir(dir.path()));
        assert_eq!(report.files_removed, 5);
        assert_eq!(report.dirs_removed, 5);
        assert_eq!(report.failures, 0);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());

        remove_tree(dir.path(), MAX_WALK_DEPTH);
        let report = remove_tree(dir.path(), MAX_WALK_DEPTH);

        assert!(is_empty_dir(dir.path()));
        assert_eq!(report, TeardownReport::default());
    }

    #[test]
    fn test_symlinks_are_unlinked_not_followed() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("keep"), b"data").unwrap();

        let dir = tempfile::tempdir().unwrap();
        symlink(outside.path(), dir.path().join("link")).unwrap();

        let report = remove_tree(dir.path(), MAX_WALK_DEPTH);

        assert!(is_empty_dir(dir.path()));
        assert_eq!(report.files_removed, 1);
        assert!(outside.path().join("keep").exists());
    }

    #[test]
    fn test_entries_past_depth_limit_are_left() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/deep"), b"").unwrap();
        std::fs::write(dir.path().join("top"), b"").unwrap();

        let report = remove_tree(dir.path(), 2);

        // a/b is non-empty, so neither a/b nor a can go
        assert!(!dir.path().join("top").exists());
        assert!(dir.path().join("a/b/deep").exists());
        assert_eq!(report.files_removed, 1);
        assert_eq!(report.failures, 2);
    }
}
