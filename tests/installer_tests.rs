//! Installer script derivation against assembled manifests.

mod helpers;

use helpers::TestEnv;
use shipwright::assemble::Assembler;
use shipwright::installer::{install_sequence, nsis, uninstall_sequence, Instruction};
use shipwright::manifest::{EntryKind, ManifestEntry};
use std::path::PathBuf;

fn entry(src: &str, dst: &str) -> ManifestEntry {
    ManifestEntry {
        source: PathBuf::from(src),
        dest: PathBuf::from(dst),
        kind: EntryKind::File,
    }
}

fn lines(seq: &[Instruction]) -> Vec<String> {
    seq.iter().map(|i| i.to_string()).collect()
}

#[test]
fn test_reference_scenario() {
    let entries = vec![
        entry("a/b/c.txt", "pkg/a/b/c.txt"),
        entry("a/x.txt", "pkg/a/x.txt"),
        entry("d.txt", "pkg/d.txt"),
    ];

    assert_eq!(
        lines(&install_sequence(&entries).unwrap()),
        [
            "SetOutPath pkg/a/b",
            "File c.txt",
            "SetOutPath pkg/a",
            "File x.txt",
            "SetOutPath pkg",
            "File d.txt",
        ]
    );

    let uninstall = uninstall_sequence(&entries).unwrap();
    let deletes = uninstall
        .iter()
        .filter(|i| matches!(i, Instruction::Delete(_)))
        .count();
    assert_eq!(deletes, 3);
    let dirs: Vec<String> = uninstall
        .iter()
        .filter(|i| matches!(i, Instruction::RemoveDir(_)))
        .map(|i| i.to_string())
        .collect();
    assert_eq!(dirs, ["RMDir pkg/a/b", "RMDir pkg/a", "RMDir pkg"]);
}

#[test]
fn test_scripts_from_assembled_manifest() {
    let env = TestEnv::new();
    env.add_source("viewer.exe");
    env.add_source("llplugin/media_plugin.dll");
    env.add_source("llplugin/locales/en-US.pak");

    let mut asm = Assembler::new(&env.source, &env.dest);
    asm.path("viewer.exe", None).unwrap();
    asm.scoped("llplugin", "llplugin", false, |a| {
        a.path("media_plugin.dll", None)?;
        a.scoped("locales", "locales", false, |a| {
            a.path("*.pak", None)?;
            Ok(())
        })
    })
    .unwrap();

    let manifest = asm.into_manifest();
    let install = install_sequence(manifest.entries()).unwrap();
    assert_eq!(
        lines(&install),
        [
            "SetOutPath llplugin/locales",
            "File en-US.pak",
            "SetOutPath llplugin",
            "File media_plugin.dll",
            "SetOutPath .",
            "File viewer.exe",
        ]
    );

    // A parent directory is never removed before its children.
    let uninstall = uninstall_sequence(manifest.entries()).unwrap();
    let rendered = lines(&uninstall);
    let pos = |needle: &str| rendered.iter().position(|l| l == needle).unwrap();
    assert!(pos("Delete llplugin/locales/en-US.pak") < pos("RMDir llplugin/locales"));
    assert!(pos("RMDir llplugin/locales") < pos("RMDir llplugin"));
}

#[test]
fn test_duplicate_destination_last_writer_is_authoritative() {
    let env = TestEnv::new();
    let debug = env.add_source("debug/media.dll");
    let release = env.add_source("release/media.dll");

    let mut asm = Assembler::new(&env.source, &env.dest);
    asm.scoped("debug", "plugins", false, |a| {
        a.path("media.dll", None)?;
        Ok(())
    })
    .unwrap();
    asm.scoped("release", "plugins", false, |a| {
        a.path("media.dll", None)?;
        Ok(())
    })
    .unwrap();

    let manifest = asm.into_manifest();
    // Full history is preserved...
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.entries()[0].source, debug);
    assert_eq!(manifest.entries()[1].source, release);
    // ...but derivation collapses to one logical placement.
    let install = install_sequence(manifest.entries()).unwrap();
    assert_eq!(lines(&install), ["SetOutPath plugins", "File media.dll"]);
    // And the physical copy on disk is the last writer's.
    assert_eq!(
        std::fs::read(env.dest.join("plugins/media.dll")).unwrap(),
        b"release/media.dll"
    );
}

#[test]
fn test_nsis_rendering_end_to_end() {
    let entries = vec![entry("viewer.exe", "viewer.exe"), entry("d.dll", "bin/d.dll")];
    let install = nsis::render_install(
        &install_sequence(&entries).unwrap(),
        std::path::Path::new("stage"),
    );
    assert_eq!(
        install,
        "SetOutPath $INSTDIR\\bin\nFile stage\\bin\\d.dll\nSetOutPath $INSTDIR\nFile stage\\viewer.exe\n"
    );
    let uninstall = nsis::render_uninstall(&uninstall_sequence(&entries).unwrap());
    assert_eq!(
        uninstall,
        "Delete $INSTDIR\\bin\\d.dll\nDelete $INSTDIR\\viewer.exe\nRMDir $INSTDIR\\bin\n"
    );
}
