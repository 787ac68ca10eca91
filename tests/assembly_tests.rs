//! End-to-end assembly tests: plan replay, manifest recording, symlink
//! reconciliation across repeated runs.

mod helpers;

use std::fs;
use std::path::{Path, PathBuf};

use helpers::{assert_file_exists, assert_symlink, TestEnv};
use shipwright::assemble::{Assembler, PackagePlan};
use shipwright::manifest::EntryKind;

fn demo_plan() -> PackagePlan {
    let json = r#"{
        "steps": [
            {"step": "prefix", "src": "app_settings", "dst": "app_settings", "steps": [
                {"step": "file", "pattern": "*.xml"}
            ]},
            {"step": "prefix", "src": "lib/release", "dst": "lib", "steps": [
                {"step": "file", "pattern": "lib*.so*", "optional": true}
            ]},
            {"step": "prefix", "src": "", "dst": "app/Resources", "steps": [
                {"step": "relative_symlink", "source": "lib/libcore.so", "dest": "libcore.so", "critical": true}
            ]},
            {"step": "prefix", "src": "optional_pack", "dst": "extras", "optional": true, "steps": [
                {"step": "file", "pattern": "*"}
            ]}
        ]
    }"#;
    serde_json::from_str(json).unwrap()
}

fn seed(env: &TestEnv) {
    env.add_source("app_settings/settings.xml");
    env.add_source("app_settings/features.xml");
    env.add_source("lib/release/libcore.so");
    env.add_source("lib/release/libmedia.so.2");
}

#[test]
fn test_plan_replay_assembles_package() {
    let env = TestEnv::new();
    seed(&env);

    let mut asm = Assembler::new(&env.source, &env.dest);
    demo_plan().run(&mut asm).unwrap();

    assert_file_exists(&env.dest.join("app_settings/settings.xml"));
    assert_file_exists(&env.dest.join("app_settings/features.xml"));
    assert_file_exists(&env.dest.join("lib/libcore.so"));
    assert_file_exists(&env.dest.join("lib/libmedia.so.2"));
    assert_symlink(
        &env.dest.join("app/Resources/libcore.so"),
        "../../lib/libcore.so",
    );

    // The optional_pack scope was absent: skipped, not fatal, nothing
    // recorded for it.
    assert!(!env.dest.join("extras").exists());

    let manifest = asm.manifest();
    let files = manifest
        .entries()
        .iter()
        .filter(|e| matches!(e.kind, EntryKind::File))
        .count();
    let links = manifest.len() - files;
    assert_eq!(files, 4);
    assert_eq!(links, 1);
}

#[test]
fn test_second_run_over_stale_state_is_idempotent() {
    let env = TestEnv::new();
    seed(&env);

    let mut first = Assembler::new(&env.source, &env.dest);
    demo_plan().run(&mut first).unwrap();

    // Sabotage: replace the link with a wrong one, and a file with stale
    // content.
    let link = env.dest.join("app/Resources/libcore.so");
    fs::remove_file(&link).unwrap();
    std::os::unix::fs::symlink("wrong/target", &link).unwrap();
    fs::write(env.dest.join("lib/libcore.so"), b"stale").unwrap();

    let mut second = Assembler::new(&env.source, &env.dest);
    demo_plan().run(&mut second).unwrap();

    assert_symlink(&link, "../../lib/libcore.so");
    assert_eq!(
        fs::read(env.dest.join("lib/libcore.so")).unwrap(),
        b"lib/release/libcore.so"
    );
}

#[test]
fn test_mandatory_pattern_missing_aborts_replay() {
    let env = TestEnv::new();
    // No app_settings at all: the first mandatory prefix fails.
    let mut asm = Assembler::new(&env.source, &env.dest);
    assert!(demo_plan().run(&mut asm).is_err());
}

#[test]
fn test_manifest_json_survives_round_trip() {
    let env = TestEnv::new();
    seed(&env);

    let mut asm = Assembler::new(&env.source, &env.dest);
    demo_plan().run(&mut asm).unwrap();
    let manifest = asm.into_manifest();

    let json = manifest.to_json().unwrap();
    let back: Vec<shipwright::manifest::ManifestEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, manifest.entries());
    assert!(back
        .iter()
        .any(|e| e.dest == PathBuf::from("app_settings/settings.xml")));
}

#[test]
fn test_materialize_symlinks_for_copy_in_place_targets() {
    let env = TestEnv::new();
    seed(&env);

    let mut asm = Assembler::new(&env.source, &env.dest);
    demo_plan().run(&mut asm).unwrap();
    let materialized = asm.materialize_symlinks().unwrap();
    assert_eq!(materialized, 1);

    let staged = env.dest.join("app/Resources/libcore.so");
    let meta = fs::symlink_metadata(&staged).unwrap();
    assert!(meta.file_type().is_file());
    assert_eq!(fs::read(&staged).unwrap(), b"lib/release/libcore.so");

    // The copy is recorded as a File entry so installer scripts ship it.
    let dest: &Path = Path::new("app/Resources/libcore.so");
    assert!(asm
        .manifest()
        .entries()
        .iter()
        .any(|e| e.dest == dest && matches!(e.kind, EntryKind::File)));
}
