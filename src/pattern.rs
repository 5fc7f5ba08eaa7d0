// src/pattern.rs

//! Source glob -> destination template rules.
//!
//! Each configured `[[source.folders]]` mapping compiles into one
//! [`PatternRule`]: a matchable glob (the `from` fragment joined with
//! `source.root` and the recognized-extension class) plus the rewrite rule
//! that turns a matched source path into its destination path.
//!
//! Rules are ordered; the **first** rule whose glob matches a path wins.
//! A path that matches no rule is simply not part of the build.

use std::fmt;
use std::path::PathBuf;

use globset::{Glob, GlobMatcher};

use crate::config::model::FolderMapping;
use crate::errors::Result;

/// A compiled source->destination mapping. Immutable once constructed.
#[derive(Clone)]
pub struct PatternRule {
    source_glob: String,
    destination_template: String,
    matcher: GlobMatcher,
    /// The `from` fragment minus its wildcard segments, joined with the
    /// source root; stripped from a matched path's directory to obtain the
    /// sub-path substituted into the destination template.
    literal_prefix: String,
}

impl fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRule")
            .field("source_glob", &self.source_glob)
            .field("destination_template", &self.destination_template)
            .finish_non_exhaustive()
    }
}

impl PatternRule {
    /// The full glob this rule matches source paths against, e.g.
    /// `"src/a/**/*.{ts,tsx}"`.
    pub fn source_glob(&self) -> &str {
        &self.source_glob
    }

    /// Returns true if this rule applies to the given path (relative to the
    /// project root, with forward slashes), e.g. `"src/a/x.ts"`.
    pub fn is_match(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Compute the destination path (relative to the output root) for a
    /// matched source path.
    ///
    /// The matched file's directory, minus this rule's literal prefix, is
    /// substituted for the template's `/**` segment; the file's base name is
    /// substituted for the leaf `/*` segment. An empty sub-path collapses
    /// without doubled separators.
    pub fn destination_for(&self, rel_path: &str) -> PathBuf {
        let (dir, file_name) = match rel_path.rfind('/') {
            Some(i) => (&rel_path[..i], &rel_path[i + 1..]),
            None => ("", rel_path),
        };

        let sub_path = dir
            .strip_prefix(&self.literal_prefix)
            .unwrap_or("")
            .trim_start_matches('/');

        let mut dest = self.destination_template.clone();
        if sub_path.is_empty() {
            dest = dest.replacen("/**", "", 1);
        } else {
            dest = dest.replacen("/**", &format!("/{sub_path}"), 1);
        }
        dest = dest.replacen("/*", &format!("/{file_name}"), 1);

        dest.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Compile the configured folder mappings into ordered [`PatternRule`]s.
///
/// Each `from` fragment is joined with `root` and suffixed with the
/// extension class built from `extensions` (an empty list matches any file
/// with an extension).
pub fn compile_rules(
    root: &str,
    folders: &[FolderMapping],
    extensions: &[String],
) -> Result<Vec<PatternRule>> {
    let suffix = extension_suffix(extensions);

    let mut rules = Vec::with_capacity(folders.len());
    for mapping in folders {
        let source_glob = format!("{}{}", join_fragment(root, &mapping.from), suffix);
        let matcher = Glob::new(&source_glob)?.compile_matcher();

        let stripped = mapping.from.replacen("/**", "", 1).replacen("/*", "", 1);
        let literal_prefix = join_fragment(root, &stripped);

        rules.push(PatternRule {
            source_glob,
            destination_template: mapping.to.clone(),
            matcher,
            literal_prefix,
        });
    }

    Ok(rules)
}

/// First rule whose glob matches the given path, if any. No rule merging.
pub fn first_match<'a>(rules: &'a [PatternRule], rel_path: &str) -> Option<&'a PatternRule> {
    rules.iter().find(|r| r.is_match(rel_path))
}

fn extension_suffix(extensions: &[String]) -> String {
    match extensions {
        [] => ".*".to_string(),
        [single] => format!(".{single}"),
        many => format!(".{{{}}}", many.join(",")),
    }
}

fn join_fragment(root: &str, fragment: &str) -> String {
    let root = root.trim_matches('/');
    let fragment = fragment.trim_start_matches('/');
    match (root.is_empty(), fragment.is_empty()) {
        (true, _) => fragment.to_string(),
        (_, true) => root.to_string(),
        _ => format!("{root}/{fragment}"),
    }
}
