use assert_fs::prelude::*;
use predicates::prelude::*;
use readme_fs::io::{self, RobustnessConfig};
use readme_fs::{FileState, checksum};

#[test]
fn state_of_a_written_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = temp.child("app/README.md");
    readme.write_str("# App\n").unwrap();

    let state = FileState::read(readme.path()).unwrap();

    assert!(state.exists);
    assert!(state.mtime.is_some());
    assert_eq!(state.hash, Some(checksum::content_digest(b"# App\n")));
}

#[test]
fn directories_and_missing_paths_read_as_missing() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("app").create_dir_all().unwrap();

    assert_eq!(FileState::read(temp.child("app").path()).unwrap(), FileState::missing());
    assert_eq!(
        FileState::read(temp.child("nope.md").path()).unwrap(),
        FileState::missing()
    );
}

#[test]
fn empty_files_are_not_identifying() {
    let temp = assert_fs::TempDir::new().unwrap();
    let empty = temp.child("empty.md");
    empty.touch().unwrap();

    let digest = checksum::file_digest(empty.path()).unwrap();

    assert!(!checksum::is_identifying(&digest));
}

#[test]
fn quarantine_move_leaves_nothing_behind() {
    let temp = assert_fs::TempDir::new().unwrap();
    let stray = temp.child("stray.md");
    stray.write_str("orphan\n").unwrap();
    let dest = temp.child("unlinked/stray.md");

    io::move_file(stray.path(), dest.path(), RobustnessConfig::default()).unwrap();

    stray.assert(predicate::path::missing());
    dest.assert("orphan\n");
}
