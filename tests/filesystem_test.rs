//! Tests for the RealFileSystem boundary

use std::fs;

use tempfile::TempDir;

use sponsor_tree::infrastructure::traits::{FileSystem, RealFileSystem};

#[test]
fn given_nested_path_when_ensure_parent_then_directories_created() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("a/b/c/members.tsv");
    let fs_impl = RealFileSystem;

    fs_impl.ensure_parent(&target).unwrap();

    assert!(temp.path().join("a/b/c").is_dir());
    assert!(!target.exists());
}

#[test]
fn given_bare_file_name_when_ensure_parent_then_noop() {
    let fs_impl = RealFileSystem;
    fs_impl
        .ensure_parent(std::path::Path::new("members.tsv"))
        .unwrap();
}

#[test]
fn given_written_file_when_renamed_then_content_moves() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("members.tsv.tmp");
    let dst = temp.path().join("members.tsv");
    let fs_impl = RealFileSystem;

    fs_impl.write(&src, "hello").unwrap();
    fs_impl.rename(&src, &dst).unwrap();

    assert!(!fs_impl.exists(&src));
    assert_eq!(fs_impl.read_to_string(&dst).unwrap(), "hello");
    assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
}
