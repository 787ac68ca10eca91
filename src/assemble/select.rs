//! File enumeration and physical copying for the assembler.
//!
//! Selection patterns are deliberately modest: literal path components
//! with `*`/`?` wildcards inside a single component, the way build
//! catalogues actually name artifacts (`*.pak`, `*/html`, `libvlc*.so*`).
//! Matching returns a possibly-empty ordered list; optional-resource
//! handling is a branch on an empty result, never a caught exception.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use walkdir::WalkDir;

/// All paths under `base` matching `pattern`, sorted.
///
/// Each pattern component must match exactly one path component; a
/// trailing `/` selects directories. Missing directories along the way
/// simply produce no matches.
pub fn find_matches(base: &Path, pattern: &str) -> Vec<PathBuf> {
    let mut current = vec![base.to_path_buf()];
    for comp in pattern.split('/').filter(|c| !c.is_empty()) {
        let mut next = Vec::new();
        for dir in &current {
            if !comp.contains(['*', '?']) {
                let candidate = dir.join(comp);
                if candidate.exists() {
                    next.push(candidate);
                }
                continue;
            }
            let Ok(read) = fs::read_dir(dir) else { continue };
            for entry in read.flatten() {
                let name = entry.file_name();
                if glob_match(comp, &name.to_string_lossy()) {
                    next.push(entry.path());
                }
            }
        }
        current = next;
    }
    if pattern.ends_with('/') {
        current.retain(|p| p.is_dir());
    }
    current.sort();
    current
}

/// Match one path component against a pattern with `*` and `?`.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    // Classic backtracking wildcard match over one component.
    let (mut pi, mut ni) = (0usize, 0usize);
    let (mut star, mut mark) = (None::<usize>, 0usize);
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ni;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ni = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Copy one file, creating parent directories as needed.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Recursively copy a directory tree, returning every (src, dst) file
/// pair copied. Symlinks inside the tree are copied as links.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut copied = Vec::new();
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("walking {}: {e}", src.display()))
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields children of src");
        let target = dst.join(rel);
        let ftype = entry.file_type();
        if ftype.is_dir() {
            fs::create_dir_all(&target)?;
        } else if ftype.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            if fs::symlink_metadata(&target).is_ok() {
                fs::remove_file(&target)?;
            }
            std::os::unix::fs::symlink(&link, &target)?;
        } else {
            copy_file(entry.path(), &target)?;
            copied.push((entry.path().to_path_buf(), target));
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.pak", "en-US.pak"));
        assert!(glob_match("libvlc*.so*", "libvlccore.so.9.0"));
        assert!(glob_match("?.txt", "a.txt"));
        assert!(!glob_match("*.pak", "icudtl.dat"));
        assert!(!glob_match("?.txt", "ab.txt"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn test_find_matches_literal_and_wildcard() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("locales/en-US.pak"));
        touch(&tmp.path().join("locales/fr.pak"));
        touch(&tmp.path().join("locales/readme.txt"));

        let hits = find_matches(tmp.path(), "locales/*.pak");
        let names: Vec<_> = hits
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["en-US.pak", "fr.pak"]);

        assert_eq!(find_matches(tmp.path(), "locales/en-US.pak").len(), 1);
        assert!(find_matches(tmp.path(), "missing/*.pak").is_empty());
    }

    #[test]
    fn test_find_matches_wildcard_directory_component() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("skins/default/html/page.html"));
        touch(&tmp.path().join("skins/dark/html/page.html"));

        let hits = find_matches(tmp.path(), "skins/*/html");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| p.is_dir()));
    }

    #[test]
    fn test_copy_tree_preserves_structure_and_links() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("a/b.txt"));
        std::os::unix::fs::symlink("a/b.txt", src.join("link")).unwrap();

        let dst = tmp.path().join("dst");
        let copied = copy_tree(&src, &dst).unwrap();
        assert_eq!(copied.len(), 1);
        assert!(dst.join("a/b.txt").is_file());
        assert_eq!(
            fs::read_link(dst.join("link")).unwrap(),
            PathBuf::from("a/b.txt")
        );
    }
}
