//! Module manifest reader.
//!
//! One path per line, loaded in file order. Lines are raw bytes: only the
//! trailing `\n` is removed, nothing is skipped or trimmed.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};

use crate::error::{BootError, BootResult};

pub struct Manifest {
    path: PathBuf,
    reader: BufReader<File>,
}

impl Manifest {
    pub fn open(path: &Path) -> BootResult<Self> {
        let file = File::open(path).map_err(|source| BootError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for Manifest {
    type Item = BootResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                Some(Ok(PathBuf::from(OsString::from_vec(line))))
            }
            Err(source) => Some(Err(BootError::Manifest {
                path: self.path.clone(),
                source,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn manifest_with(contents: &[u8]) -> NamedTempFile {
        use std::io::Write;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    fn entries(contents: &[u8]) -> Vec<PathBuf> {
        let file = manifest_with(contents);
        Manifest::open(file.path())
            .unwrap()
            .collect::<BootResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_lines_in_order() {
        let paths = entries(b"/lib/modules/virtio.ko.xz\n/lib/modules/9p.ko.xz\n");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/lib/modules/virtio.ko.xz"),
                PathBuf::from("/lib/modules/9p.ko.xz"),
            ]
        );
    }

    #[test]
    fn test_last_line_without_newline() {
        let paths = entries(b"a.ko.xz\nb.ko.xz");
        assert_eq!(
            paths,
            vec![PathBuf::from("a.ko.xz"), PathBuf::from("b.ko.xz")]
        );
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let paths = entries(b"a.ko.xz\n\nb.ko.xz\n");
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[1], PathBuf::from(""));
    }

    #[test]
    fn test_whitespace_is_not_trimmed() {
        let paths = entries(b" a.ko.xz \r\n");
        assert_eq!(paths, vec![PathBuf::from(" a.ko.xz \r")]);
    }

    #[test]
    fn test_non_utf8_path() {
        let paths = entries(b"mod\xff.ko.xz\n");
        assert_eq!(paths[0].as_os_str().len(), 10);
    }

    #[test]
    fn test_empty_manifest() {
        assert!(entries(b"").is_empty());
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("modules.list");
        let err = Manifest::open(&missing).err().unwrap();
        assert!(matches!(err, BootError::Manifest { .. }));
        assert!(err.to_string().contains("modules.list"));
    }
}
