//! Target root setup in isolation.

use std::os::unix::fs::PermissionsExt;

use tinit::{BootError, Topology};
use tinit_test_utils::{BootFixture, RecordingKernel};

#[test]
fn overlay_creates_mount_points_with_0755() {
    let fixture = BootFixture::new();
    let mut kernel = RecordingKernel::new();

    let target = Topology::Overlay
        .establish(&fixture.root, &mut kernel)
        .unwrap();

    assert_eq!(target, fixture.root.join("ov"));
    for dir in ["ro", "rw", "wk", "ov"] {
        let metadata = std::fs::metadata(fixture.root.join(dir)).unwrap();
        assert!(metadata.is_dir());
        // umask can only clear bits
        assert_eq!(metadata.permissions().mode() & !0o755 & 0o777, 0, "{dir}");
    }
    assert_eq!(kernel.mounts().len(), 2);
}

#[test]
fn existing_mount_point_is_an_error() {
    let fixture = BootFixture::new();
    std::fs::create_dir(fixture.root.join("wk")).unwrap();
    let mut kernel = RecordingKernel::new();

    let err = Topology::Overlay
        .establish(&fixture.root, &mut kernel)
        .unwrap_err();

    assert!(matches!(&err, BootError::MountPoint { path, .. } if path.ends_with("wk")));
    assert!(kernel.calls().is_empty());
}

#[test]
fn direct_replace_switches_into_current_directory() {
    let fixture = BootFixture::new();
    let mut kernel = RecordingKernel::new();

    let target = Topology::DirectReplace
        .establish(&fixture.root, &mut kernel)
        .unwrap();

    assert_eq!(target, std::path::PathBuf::from("."));
    assert!(fixture.root.join("newroot").is_dir());
    assert_eq!(kernel.mounts().len(), 2);
}

#[test]
fn deployed_topology_follows_build_feature() {
    let expected = if cfg!(feature = "direct-root") {
        Topology::DirectReplace
    } else {
        Topology::Overlay
    };
    assert_eq!(Topology::deployed(), expected);
}
