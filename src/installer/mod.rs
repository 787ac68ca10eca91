//! Derivation of installer instruction sequences from the manifest.
//!
//! This is a pure function from the final manifest snapshot to ordered
//! install and uninstall instruction lists; it never touches the
//! filesystem. Rendering into a concrete script syntax (NSIS) is the thin
//! adapter in [`nsis`].

pub mod nsis;

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{PackageError, Result};
use crate::manifest::{path_ancestors, EntryKind, ManifestEntry};

/// One platform-agnostic installer instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Make `dir` (relative to the install root; `.` is the root itself)
    /// the destination for subsequent `PlaceFile` instructions.
    SetOutPath(PathBuf),
    /// Place the named file into the current out-path.
    PlaceFile(PathBuf),
    /// Delete one installed file (path relative to the install root).
    Delete(PathBuf),
    /// Remove one now-empty directory.
    RemoveDir(PathBuf),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetOutPath(d) => write!(f, "SetOutPath {}", d.display()),
            Self::PlaceFile(n) => write!(f, "File {}", n.display()),
            Self::Delete(p) => write!(f, "Delete {}", p.display()),
            Self::RemoveDir(d) => write!(f, "RMDir {}", d.display()),
        }
    }
}

/// Derive the ordered install instruction sequence.
///
/// File-kind entries only; symlink entries are reconstructed by a
/// platform-specific post-install step and never appear here. Entries are
/// ordered deepest destination first and deduplicated last-wins per
/// destination. `SetOutPath` is emitted whenever the directory differs
/// from the immediately preceding entry's directory; interleaved
/// directories therefore repeat it, matching historically shipped scripts
/// rather than a stronger group-by-directory guarantee.
pub fn install_sequence(entries: &[ManifestEntry]) -> Result<Vec<Instruction>> {
    let files = sorted_distinct_files(entries)?;

    let mut out = Vec::new();
    let mut out_path: Option<PathBuf> = None;
    for dest in &files {
        let dir = dest_dir(dest);
        if out_path.as_deref() != Some(&dir) {
            out.push(Instruction::SetOutPath(dir.clone()));
            out_path = Some(dir);
        }
        // Safe: validate_dest rejected empty and rootless paths.
        out.push(Instruction::PlaceFile(PathBuf::from(
            dest.file_name().expect("validated dest has a file name"),
        )));
    }
    Ok(out)
}

/// Derive the ordered uninstall instruction sequence.
///
/// One `Delete` per distinct destination, then one `RemoveDir` for every
/// strict ancestor directory of any deleted file, deduplicated and ordered
/// deepest first. The ordering guarantees a parent is never targeted
/// before all of its listed children.
pub fn uninstall_sequence(entries: &[ManifestEntry]) -> Result<Vec<Instruction>> {
    let files = sorted_distinct_files(entries)?;

    let mut out: Vec<Instruction> = files
        .iter()
        .map(|dest| Instruction::Delete(dest.clone()))
        .collect();

    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    for dest in &files {
        for dir in path_ancestors(dest) {
            if seen.insert(dir.clone()) {
                dirs.push(dir);
            }
        }
    }
    dirs.sort_by(|a, b| deepest_first(a, b));
    out.extend(dirs.into_iter().map(Instruction::RemoveDir));
    Ok(out)
}

/// File-kind destinations, validated, deduplicated last-wins, ordered
/// deepest first with ties in reverse lexicographic order (the historical
/// sort: ascending by depth then path, then reversed whole).
fn sorted_distinct_files(entries: &[ManifestEntry]) -> Result<Vec<PathBuf>> {
    let mut dests: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    // Walk backwards so the last-recorded entry per destination wins.
    for entry in entries.iter().rev() {
        if !matches!(entry.kind, EntryKind::File) {
            continue;
        }
        validate_dest(&entry.dest)?;
        if seen.insert(entry.dest.clone()) {
            dests.push(entry.dest.clone());
        }
    }
    dests.sort_by(|a, b| deepest_first(a, b));
    Ok(dests)
}

fn deepest_first(a: &Path, b: &Path) -> std::cmp::Ordering {
    let depth = |p: &Path| p.components().count();
    depth(b).cmp(&depth(a)).then_with(|| b.cmp(a))
}

fn dest_dir(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn validate_dest(dest: &Path) -> Result<()> {
    if dest.as_os_str().is_empty() {
        return Err(PackageError::consistency("empty destination path"));
    }
    if dest.is_absolute() {
        return Err(PackageError::consistency(format!(
            "destination {} is absolute; manifest destinations are relative \
             to the package root",
            dest.display()
        )));
    }
    for comp in dest.components() {
        if matches!(comp, Component::ParentDir | Component::CurDir) {
            return Err(PackageError::consistency(format!(
                "destination {} escapes or re-anchors the package root",
                dest.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(src: &str, dst: &str) -> ManifestEntry {
        ManifestEntry {
            source: PathBuf::from(src),
            dest: PathBuf::from(dst),
            kind: EntryKind::File,
        }
    }

    fn rendered(instrs: &[Instruction]) -> Vec<String> {
        instrs.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_install_deepest_first_with_out_path_changes() {
        let entries = vec![
            file("a/b/c.txt", "pkg/a/b/c.txt"),
            file("a/x.txt", "pkg/a/x.txt"),
            file("d.txt", "pkg/d.txt"),
        ];
        let seq = install_sequence(&entries).unwrap();
        assert_eq!(
            rendered(&seq),
            [
                "SetOutPath pkg/a/b",
                "File c.txt",
                "SetOutPath pkg/a",
                "File x.txt",
                "SetOutPath pkg",
                "File d.txt",
            ]
        );
    }

    #[test]
    fn test_uninstall_deletes_then_ancestor_dirs_deepest_first() {
        let entries = vec![
            file("a/b/c.txt", "pkg/a/b/c.txt"),
            file("a/x.txt", "pkg/a/x.txt"),
            file("d.txt", "pkg/d.txt"),
        ];
        let seq = uninstall_sequence(&entries).unwrap();
        assert_eq!(
            rendered(&seq),
            [
                "Delete pkg/a/b/c.txt",
                "Delete pkg/a/x.txt",
                "Delete pkg/d.txt",
                "RMDir pkg/a/b",
                "RMDir pkg/a",
                "RMDir pkg",
            ]
        );
    }

    #[test]
    fn test_last_wins_per_destination() {
        let entries = vec![
            file("first/source.dll", "pkg/lib.dll"),
            file("second/source.dll", "pkg/lib.dll"),
        ];
        let seq = install_sequence(&entries).unwrap();
        // One logical placement survives.
        assert_eq!(
            rendered(&seq),
            ["SetOutPath pkg", "File lib.dll"]
        );

        let un = uninstall_sequence(&entries).unwrap();
        assert_eq!(rendered(&un), ["Delete pkg/lib.dll", "RMDir pkg"]);
    }

    #[test]
    fn test_every_directory_change_emits_set_out_path() {
        // The generator compares only against the immediately preceding
        // entry's directory, so each change in the sorted order costs one
        // SetOutPath; there is no full grouping pass.
        let entries = vec![
            file("1", "zz/file1"),
            file("2", "aa/deep/file"),
            file("3", "aa/file2"),
        ];
        let seq = install_sequence(&entries).unwrap();
        let set_count = seq
            .iter()
            .filter(|i| matches!(i, Instruction::SetOutPath(_)))
            .count();
        assert_eq!(set_count, 3);
    }

    #[test]
    fn test_symlink_entries_are_ignored() {
        let entries = vec![
            file("a", "pkg/a"),
            ManifestEntry {
                source: PathBuf::from("../lib/a"),
                dest: PathBuf::from("pkg/link"),
                kind: EntryKind::Symlink {
                    target: PathBuf::from("../lib/a"),
                },
            },
        ];
        let seq = install_sequence(&entries).unwrap();
        assert_eq!(rendered(&seq), ["SetOutPath pkg", "File a"]);
    }

    #[test]
    fn test_top_level_file_uses_root_out_path() {
        let seq = install_sequence(&[file("readme", "readme.txt")]).unwrap();
        assert_eq!(rendered(&seq), ["SetOutPath .", "File readme.txt"]);
        // No ancestors: nothing to remove besides the file itself.
        let un = uninstall_sequence(&[file("readme", "readme.txt")]).unwrap();
        assert_eq!(rendered(&un), ["Delete readme.txt"]);
    }

    #[test]
    fn test_malformed_dest_is_consistency_error() {
        for bad in ["/abs/path", "a/../escape", ""] {
            let err = install_sequence(&[file("s", bad)]).unwrap_err();
            assert!(
                matches!(err, PackageError::Consistency(_)),
                "expected consistency error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_rmdir_list_has_no_duplicates() {
        let entries = vec![
            file("1", "pkg/a/one"),
            file("2", "pkg/a/two"),
            file("3", "pkg/a/three"),
        ];
        let seq = uninstall_sequence(&entries).unwrap();
        let dirs: Vec<_> = seq
            .iter()
            .filter(|i| matches!(i, Instruction::RemoveDir(_)))
            .collect();
        assert_eq!(dirs.len(), 2); // pkg/a then pkg
    }
}
