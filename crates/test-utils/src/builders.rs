#![allow(dead_code)]

use reemit::config::{ConfigFile, FolderMapping, RawConfigFile};
use reemit::types::EmitMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_source_root(mut self, root: &str) -> Self {
        self.config.source.root = root.to_string();
        self
    }

    pub fn with_extension(mut self, ext: &str) -> Self {
        self.config.source.extensions.push(ext.to_string());
        self
    }

    pub fn with_folder(mut self, from: &str, to: &str) -> Self {
        self.config.source.folders.push(FolderMapping {
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    pub fn with_output_root(mut self, root: &str) -> Self {
        self.config.output.root = root.to_string();
        self
    }

    pub fn with_mode(mut self, mode: EmitMode) -> Self {
        self.config.options.mode = mode;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
