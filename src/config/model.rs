// src/config/model.rs

use serde::Deserialize;

use crate::types::EmitMode;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [source]
/// root = "src"
/// extensions = ["ts", "tsx"]
///
/// [[source.folders]]
/// from = "a/**/*"
/// to = "a/**/*"
///
/// [output]
/// root = "build"
///
/// [options]
/// mode = "continuous"
/// ```
///
/// All sections are optional and have reasonable defaults, except that at
/// least one `[[source.folders]]` mapping must be present (checked during
/// validation).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Source discovery config from `[source]`.
    #[serde(default)]
    pub source: SourceSection,

    /// Output config from `[output]`.
    #[serde(default)]
    pub output: OutputSection,

    /// Behaviour options from `[options]`.
    #[serde(default)]
    pub options: OptionsSection,

    /// Opaque compiler option overrides from `[compiler]`.
    ///
    /// These are passed through to the compilation backend untouched; the
    /// engine never interprets them.
    #[serde(default)]
    pub compiler: toml::Table,
}

/// `[source]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceSection {
    /// Root directory (relative to the project root) that all `folders`
    /// globs are evaluated under. Empty means the project root itself.
    #[serde(default)]
    pub root: String,

    /// Recognized source extensions, without the leading dot.
    ///
    /// An empty list means "any file with an extension".
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Ordered source-glob -> destination-template mappings.
    ///
    /// Order matters: the first mapping whose glob matches a path wins.
    #[serde(default)]
    pub folders: Vec<FolderMapping>,
}

/// A single `[[source.folders]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderMapping {
    /// Source glob fragment, relative to `source.root`, e.g. `"a/**/*"`.
    pub from: String,

    /// Destination template, relative to `output.root`, e.g. `"a/**/*"`.
    ///
    /// `/**` is substituted with the matched sub-path, the leaf `/*` with the
    /// matched file's base name.
    pub to: String,
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    /// Root directory (relative to the project root) that destination
    /// templates resolve under.
    #[serde(default = "default_output_root")]
    pub root: String,
}

fn default_output_root() -> String {
    "build".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

/// `[options]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OptionsSection {
    /// `"per-cycle"` (default) or `"continuous"`.
    #[serde(default)]
    pub mode: EmitMode,
}

/// Validated configuration.
///
/// Constructed via `ConfigFile::try_from(raw)`; see `config::validate`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    source: SourceSection,
    output: OutputSection,
    options: OptionsSection,
    compiler: toml::Table,
}

impl ConfigFile {
    /// Internal constructor used after validation has passed.
    pub(crate) fn new_unchecked(
        source: SourceSection,
        output: OutputSection,
        options: OptionsSection,
        compiler: toml::Table,
    ) -> Self {
        Self {
            source,
            output,
            options,
            compiler,
        }
    }

    pub fn source(&self) -> &SourceSection {
        &self.source
    }

    pub fn output(&self) -> &OutputSection {
        &self.output
    }

    pub fn options(&self) -> &OptionsSection {
        &self.options
    }

    /// Opaque compiler option overrides, for backend constructors.
    pub fn compiler_overrides(&self) -> &toml::Table {
        &self.compiler
    }
}
