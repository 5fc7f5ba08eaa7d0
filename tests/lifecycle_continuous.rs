// tests/lifecycle_continuous.rs

mod common;
use crate::common::init_tracing;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reemit::fs::mock::MockFileSystem;
use reemit::fs::FileSystem;
use reemit::lifecycle::{LifecycleController, PipelineEvent};
use reemit::pattern::compile_rules;
use reemit::types::EmitMode;
use reemit_test_utils::builders::ConfigFileBuilder;
use reemit_test_utils::fake_backend::{FakeCompileBackend, RecordingFileWatches};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn source_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./src/a/x.ts", b"let x = 1;".to_vec());
    fs.add_file("./src/a/sub/y.ts", b"let y = 2;".to_vec());
    // Not covered by any rule; the scan must leave it alone.
    fs.add_file("./src/other/z.ts", b"let z = 3;".to_vec());
    fs
}

fn continuous_controller(
    fs: &MockFileSystem,
    backend: &FakeCompileBackend,
    recorder: &RecordingFileWatches,
) -> LifecycleController<FakeCompileBackend> {
    let cfg = ConfigFileBuilder::new()
        .with_source_root("src")
        .with_extension("ts")
        .with_folder("a/**/*", "a/**/*")
        .with_output_root("build")
        .with_mode(EmitMode::Continuous)
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
fn setup_scans_subscribes_and_emits_once() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = continuous_controller(&fs, &backend, &recorder);

    controller.setup().unwrap();

    let registry = controller.registry();
    assert_eq!(registry.len(), 2);

    let entry = registry.get(Path::new("src/a/x.ts")).unwrap();
    assert_eq!(entry.version, 0);
    assert_eq!(entry.destination_path, PathBuf::from("build/a/x.ts"));
    assert!(entry.watched);

    assert_eq!(recorder.watched().len(), 2);
    assert_eq!(backend.compile_count_for(Path::new("src/a/x.ts")), 1);
    assert_eq!(backend.compile_count_for(Path::new("src/a/sub/y.ts")), 1);

    assert!(fs.is_file(Path::new("./build/a/x.out")));
    assert!(fs.is_file(Path::new("./build/a/sub/y.out")));
}

#[test]
fn newer_change_bumps_version_and_reemits_exactly_once() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = continuous_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    let path = PathBuf::from("src/a/x.ts");
    let keep_running = controller
        .handle_event(PipelineEvent::SourceChanged {
            path: path.clone(),
            mtime: Some(at(100)),
        })
        .unwrap();
    assert!(keep_running);

    assert_eq!(controller.registry().version_of(&path), Some(1));
    assert_eq!(backend.compile_count_for(&path), 2);

    // The same timestamp delivered again is a spurious notification.
    controller
        .handle_event(PipelineEvent::SourceChanged {
            path: path.clone(),
            mtime: Some(at(100)),
        })
        .unwrap();

    assert_eq!(controller.registry().version_of(&path), Some(1));
    assert_eq!(backend.compile_count_for(&path), 2);
}

#[test]
fn unlink_releases_the_subscription_once_and_stops_emitting() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = continuous_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    let path = PathBuf::from("src/a/x.ts");
    fs.remove_file("./src/a/x.ts");

    controller
        .handle_event(PipelineEvent::SourceRemoved { path: path.clone() })
        .unwrap();

    assert!(controller.registry().get(&path).is_none());
    assert_eq!(recorder.released(), vec![PathBuf::from("./src/a/x.ts")]);

    // A duplicate unlink is a no-op.
    controller
        .handle_event(PipelineEvent::SourceRemoved { path: path.clone() })
        .unwrap();
    assert_eq!(recorder.released().len(), 1);

    // A late change event for the removed path must not emit anything.
    controller
        .handle_event(PipelineEvent::SourceChanged {
            path: path.clone(),
            mtime: Some(at(200)),
        })
        .unwrap();
    assert_eq!(backend.compile_count_for(&path), 1); // setup emission only
}

#[test]
fn duplicate_add_keeps_version_and_subscription() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = continuous_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    let path = PathBuf::from("src/a/x.ts");
    controller
        .handle_event(PipelineEvent::SourceChanged {
            path: path.clone(),
            mtime: Some(at(100)),
        })
        .unwrap();
    assert_eq!(controller.registry().version_of(&path), Some(1));

    controller
        .handle_event(PipelineEvent::SourceAdded { path: path.clone() })
        .unwrap();

    // Still version 1, still exactly one subscription, no extra emission.
    assert_eq!(controller.registry().version_of(&path), Some(1));
    let watch_count = recorder
        .watched()
        .iter()
        .filter(|p| **p == PathBuf::from("./src/a/x.ts"))
        .count();
    assert_eq!(watch_count, 1);
    assert_eq!(backend.compile_count_for(&path), 2);
}

#[test]
fn added_file_is_tracked_at_version_zero_and_emitted() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = continuous_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    fs.add_file("./src/a/new.ts", b"let n = 4;".to_vec());
    let path = PathBuf::from("src/a/new.ts");

    controller
        .handle_event(PipelineEvent::SourceAdded { path: path.clone() })
        .unwrap();

    let entry = controller.registry().get(&path).unwrap();
    assert_eq!(entry.version, 0);
    assert_eq!(entry.destination_path, PathBuf::from("build/a/new.ts"));
    assert!(entry.watched);
    assert_eq!(backend.compile_count_for(&path), 1);
    assert!(fs.is_file(Path::new("./build/a/new.out")));
}

#[test]
fn paths_matching_no_rule_are_ignored() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = continuous_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    controller
        .handle_event(PipelineEvent::SourceAdded {
            path: PathBuf::from("src/other/z.ts"),
        })
        .unwrap();

    assert!(controller
        .registry()
        .get(Path::new("src/other/z.ts"))
        .is_none());
}

#[test]
fn stop_releases_every_subscription_exactly_once() {
    init_tracing();

    let fs = source_fs();
    let backend = FakeCompileBackend::new();
    let recorder = RecordingFileWatches::new();
    let mut controller = continuous_controller(&fs, &backend, &recorder);
    controller.setup().unwrap();

    controller.stop().unwrap();
    assert_eq!(recorder.released().len(), 2);

    // Stopping again must not release anything twice.
    controller.stop().unwrap();
    assert_eq!(recorder.released().len(), 2);
}
