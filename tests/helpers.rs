//! Shared helpers for integration tests.
#![allow(dead_code)] // not every test file uses every helper

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A scratch build tree: `artifacts/` source and `build/packaged/` dest.
pub struct TestEnv {
    pub tmp: TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create tempdir");
        let source = tmp.path().join("artifacts");
        let dest = tmp.path().join("build/packaged");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dest).unwrap();
        Self { tmp, source, dest }
    }

    /// Create a source file with parent directories, content = its name.
    pub fn add_source(&self, rel: &str) -> PathBuf {
        let path = self.source.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel.as_bytes()).unwrap();
        path
    }
}

pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "expected file at {}", path.display());
}

pub fn assert_symlink(path: &Path, target: &str) {
    let meta = fs::symlink_metadata(path)
        .unwrap_or_else(|_| panic!("expected symlink at {}", path.display()));
    assert!(
        meta.file_type().is_symlink(),
        "{} is not a symlink",
        path.display()
    );
    assert_eq!(fs::read_link(path).unwrap(), PathBuf::from(target));
}
