// tests/pattern_mapping.rs

mod common;
use crate::common::init_tracing;

use std::path::PathBuf;

use reemit::config::FolderMapping;
use reemit::pattern::{compile_rules, first_match};

fn mapping(from: &str, to: &str) -> FolderMapping {
    FolderMapping {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn golden_path_destination_mapping() {
    init_tracing();

    let rules = compile_rules("src", &[mapping("a/**/*", "a/**/*")], &exts(&["ts", "tsx"]))
        .unwrap();

    let rule = first_match(&rules, "src/a/x.ts").expect("file under a/ must match");
    assert_eq!(rule.destination_for("src/a/x.ts"), PathBuf::from("a/x.ts"));

    let rule = first_match(&rules, "src/a/sub/deep/y.tsx").expect("nested file must match");
    assert_eq!(
        rule.destination_for("src/a/sub/deep/y.tsx"),
        PathBuf::from("a/sub/deep/y.tsx")
    );
}

#[test]
fn destination_template_can_differ_from_source_fragment() {
    init_tracing();

    let rules = compile_rules("src", &[mapping("a/**/*", "out-a/**/*")], &exts(&["ts"])).unwrap();

    let rule = first_match(&rules, "src/a/sub/x.ts").unwrap();
    assert_eq!(
        rule.destination_for("src/a/sub/x.ts"),
        PathBuf::from("out-a/sub/x.ts")
    );
}

#[test]
fn unmatched_paths_find_no_rule() {
    init_tracing();

    let rules = compile_rules("src", &[mapping("a/**/*", "a/**/*")], &exts(&["ts", "tsx"]))
        .unwrap();

    // Different folder.
    assert!(first_match(&rules, "src/b/x.ts").is_none());
    // Unrecognized extension.
    assert!(first_match(&rules, "src/a/x.py").is_none());
    // Outside the source root.
    assert!(first_match(&rules, "other/a/x.ts").is_none());
}

#[test]
fn first_matching_rule_wins() {
    init_tracing();

    let rules = compile_rules(
        "src",
        &[
            mapping("a/**/*", "first/**/*"),
            mapping("a/sub/**/*", "second/**/*"),
        ],
        &exts(&["ts"]),
    )
    .unwrap();

    // Both rules match, but the first one in config order wins.
    let rule = first_match(&rules, "src/a/sub/x.ts").unwrap();
    assert_eq!(
        rule.destination_for("src/a/sub/x.ts"),
        PathBuf::from("first/sub/x.ts")
    );
}

#[test]
fn empty_extension_list_matches_any_extension() {
    init_tracing();

    let rules = compile_rules("src", &[mapping("a/**/*", "a/**/*")], &[]).unwrap();

    assert!(first_match(&rules, "src/a/x.anything").is_some());
    // A file with no extension at all is not part of the source set.
    assert!(first_match(&rules, "src/a/Makefile").is_none());
}

#[test]
fn root_level_fragment_maps_from_the_source_root_itself() {
    init_tracing();

    // Empty source root with a root-level recursive fragment, as in a
    // project compiled straight out of its top-level directory.
    let rules = compile_rules("", &[mapping("/**/*", "/**/*")], &exts(&["ts"])).unwrap();

    let rule = first_match(&rules, "x.ts").expect("top-level file must match");
    assert_eq!(rule.destination_for("x.ts"), PathBuf::from("x.ts"));

    let rule = first_match(&rules, "shared/util.ts").unwrap();
    assert_eq!(
        rule.destination_for("shared/util.ts"),
        PathBuf::from("shared/util.ts")
    );
}
