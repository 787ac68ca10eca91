//! Rendering instruction sequences into NSIS script fragments.
//!
//! The generator in the parent module is platform-agnostic; this adapter
//! turns its output into the `SetOutPath`/`File`/`Delete`/`RMDir` lines an
//! NSIS installer template splices in. Paths are rewritten with backslash
//! separators and anchored at `$INSTDIR` (install root) or the staging
//! directory on the build machine (file sources).

use std::path::Path;

use super::Instruction;

/// Backslash-separated path without a trailing separator.
fn wpath(path: &Path) -> String {
    let s = path.to_string_lossy().replace('/', "\\");
    s.trim_end_matches('\\').to_string()
}

fn instdir(rel: &Path) -> String {
    if rel == Path::new(".") {
        "$INSTDIR".to_string()
    } else {
        format!("$INSTDIR\\{}", wpath(rel))
    }
}

/// Render install instructions. `staging` is the build-machine directory
/// holding the assembled package; `File` sources are resolved against it.
pub fn render_install(instructions: &[Instruction], staging: &Path) -> String {
    let mut out = String::new();
    let mut current_dir = Path::new(".").to_path_buf();
    for inst in instructions {
        match inst {
            Instruction::SetOutPath(dir) => {
                current_dir = dir.clone();
                out.push_str(&format!("SetOutPath {}\n", instdir(dir)));
            }
            Instruction::PlaceFile(name) => {
                let src = if current_dir == Path::new(".") {
                    staging.join(name)
                } else {
                    staging.join(&current_dir).join(name)
                };
                out.push_str(&format!("File {}\n", wpath(&src)));
            }
            // Delete/RMDir never appear in an install sequence.
            other => out.push_str(&format!("{other}\n")),
        }
    }
    out
}

/// Render uninstall instructions.
pub fn render_uninstall(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    for inst in instructions {
        match inst {
            Instruction::Delete(path) => {
                out.push_str(&format!("Delete {}\n", instdir(path)));
            }
            Instruction::RemoveDir(dir) => {
                out.push_str(&format!("RMDir {}\n", instdir(dir)));
            }
            other => out.push_str(&format!("{other}\n")),
        }
    }
    out
}
