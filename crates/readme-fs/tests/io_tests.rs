use readme_fs::io::{self, RobustnessConfig};
use readme_fs::state::{mtime, set_mtime};
use readme_fs::NormalizedPath;
use std::fs;
use tempfile::TempDir;

fn fast() -> RobustnessConfig {
    RobustnessConfig {
        lock_timeout: std::time::Duration::from_millis(500),
        enable_fsync: false,
    }
}

#[test]
fn write_atomic_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("a/b/README.md"));

    io::write_atomic(&path, b"# hi", fast()).unwrap();

    assert_eq!(fs::read_to_string(path.to_native()).unwrap(), "# hi");
}

#[test]
fn write_atomic_leaves_only_the_directory_lock() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("README.md"));

    io::write_atomic(&path, b"one", fast()).unwrap();
    io::write_atomic(&path, b"two", fast()).unwrap();

    let mut names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec![io::LOCK_FILE_NAME.to_string(), "README.md".to_string()]);
    assert_eq!(fs::read_to_string(path.to_native()).unwrap(), "two");
}

#[test]
fn copy_preserving_carries_mtime() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src/README.md");
    let dst = temp.path().join("mirror/app-README.md");
    fs::create_dir_all(src.parent().unwrap()).unwrap();
    fs::write(&src, "content").unwrap();
    set_mtime(&src, 1_600_000_000.0).unwrap();

    io::copy_preserving(&src, &dst, fast()).unwrap();

    assert_eq!(fs::read_to_string(&dst).unwrap(), "content");
    assert!((mtime(&dst).unwrap() - 1_600_000_000.0).abs() < 1e-3);
}

#[test]
fn copy_preserving_overwrites_existing_destination() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("a.md");
    let dst = temp.path().join("b.md");
    fs::write(&src, "new").unwrap();
    fs::write(&dst, "old").unwrap();

    io::copy_preserving(&src, &dst, fast()).unwrap();

    assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
}

#[test]
fn copy_from_missing_source_fails_and_keeps_destination() {
    let temp = TempDir::new().unwrap();
    let dst = temp.path().join("b.md");
    fs::write(&dst, "keep").unwrap();

    let result = io::copy_preserving(&temp.path().join("missing.md"), &dst, fast());

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "keep");
}

#[test]
fn move_file_creates_destination_directory() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("a.md");
    let dst = temp.path().join("unlinked/a.md");
    fs::write(&src, "x").unwrap();

    io::move_file(&src, &dst, fast()).unwrap();

    assert!(!src.exists());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "x");
}

#[test]
fn unique_destination_suffixes_on_collision() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("app-README.md"), "").unwrap();

    let free = io::unique_destination(temp.path(), "other.md", "20240101_000000");
    assert_eq!(free, temp.path().join("other.md"));

    let stamped = io::unique_destination(temp.path(), "app-README.md", "20240101_000000");
    assert_eq!(stamped, temp.path().join("app-README_20240101_000000.md"));

    fs::write(&stamped, "").unwrap();
    let counted = io::unique_destination(temp.path(), "app-README.md", "20240101_000000");
    assert_eq!(counted, temp.path().join("app-README_20240101_000000_1.md"));
}
