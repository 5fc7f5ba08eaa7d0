// tests/lifecycle_per_cycle.rs

mod common;
use crate::common::init_tracing;

use std::path::Path;
use std::sync::Arc;

use reemit::fs::mock::MockFileSystem;
use reemit::fs::FileSystem;
use reemit::lifecycle::LifecycleController;
use reemit::pattern::compile_rules;
use reemit::types::EmitMode;
use reemit_test_utils::builders::ConfigFileBuilder;
use reemit_test_utils::fake_backend::{FakeCompileBackend, RecordingFileWatches};

fn source_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./src/a/x.ts", b"let x = 1;".to_vec());
    fs.add_file("./src/a/y.ts", b"let y = 2;".to_vec());
    fs
}

fn per_cycle_controller(
    fs: &MockFileSystem,
    backend: &FakeCompileBackend,
    recorder: &RecordingFileWatches,
) -> LifecycleController<FakeCompileBackend> {
    let cfg = ConfigFileBuilder::new()
        .with_source_root("src")
        .with_extension("ts")
        .with_folder("a/**/*", "a/**/*")
        .with_output_root("build")
        .with_mode(EmitMode::PerCycle)
        .build();

    let rules = compile_rules(
        &cfg.source().root,
        &cfg.source().folders,
        &cfg.source().extensions,
    )
    .unwrap();

    LifecycleController::new(
        &cfg,
        rules,
        ".",
        Arc::new(fs.clone()),
        Box::new(recorder.clone()),
        backend.clone(),
    )
}

#[test]
fn setup_takes_no_subscriptions_and_emits_nothing() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = per_cycle_controller(&fs, &backend, &recorder);

    controller.setup().unwrap();

    assert_eq!(controller.registry().len(), 2);
    assert!(recorder.watched().is_empty());
    assert!(backend.compiled().is_empty());
}

#[test]
fn consecutive_cycles_reemit_every_file_each_time() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = per_cycle_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    // No filesystem changes between cycles; every cycle still forces a
    // version bump and a full re-emission.
    controller.run_cycle().unwrap();
    controller.run_cycle().unwrap();

    let x = Path::new("src/a/x.ts");
    let y = Path::new("src/a/y.ts");
    assert_eq!(backend.compile_count_for(x), 2);
    assert_eq!(backend.compile_count_for(y), 2);
    assert_eq!(controller.registry().version_of(x), Some(2));
    assert_eq!(controller.registry().version_of(y), Some(2));

    // Each emission saw the version current for its cycle.
    let versions: Vec<Option<String>> = backend
        .compiled()
        .into_iter()
        .filter(|(p, _)| p == x)
        .map(|(_, v)| v)
        .collect();
    assert_eq!(versions, vec![Some("1".to_string()), Some("2".to_string())]);

    assert!(fs.is_file(Path::new("./build/a/x.out")));
    assert!(fs.is_file(Path::new("./build/a/y.out")));
}

#[test]
fn post_cycle_drains_diagnostics_then_clears_them() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = per_cycle_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    backend.fail_for("src/a/x.ts");
    controller.run_cycle().unwrap();

    let mut warnings = Vec::new();
    controller.post_cycle(&mut warnings);
    assert_eq!(warnings, vec!["src/a/x.ts (1,1): fake compile error".to_string()]);

    // A failed file never blocks the rest of the batch.
    assert!(fs.is_file(Path::new("./build/a/y.out")));
    assert!(!fs.exists(Path::new("./build/a/x.out")));

    // Already drained; the next cycle starts clean.
    let mut warnings = Vec::new();
    controller.post_cycle(&mut warnings);
    assert!(warnings.is_empty());
}

#[test]
fn cycle_drops_files_that_vanished_since_the_last_cycle() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = per_cycle_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    controller.run_cycle().unwrap();
    fs.remove_file("./src/a/x.ts");
    controller.run_cycle().unwrap();

    // The existence sweep healed the registry without an unlink event.
    assert!(controller.registry().get(Path::new("src/a/x.ts")).is_none());
    assert_eq!(backend.compile_count_for(Path::new("src/a/x.ts")), 1);
    assert_eq!(backend.compile_count_for(Path::new("src/a/y.ts")), 2);
}
