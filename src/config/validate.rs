// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ReemitError, Result};
use crate::pattern::compile_rules;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ReemitError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.source,
            raw.output,
            raw.options,
            raw.compiler,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_folders(cfg)?;
    validate_folder_mappings(cfg)?;
    validate_extensions(cfg)?;
    validate_globs(cfg)?;
    Ok(())
}

fn ensure_has_folders(cfg: &RawConfigFile) -> Result<()> {
    if cfg.source.folders.is_empty() {
        return Err(ReemitError::ConfigError(
            "config must contain at least one [[source.folders]] mapping".to_string(),
        ));
    }
    Ok(())
}

fn validate_folder_mappings(cfg: &RawConfigFile) -> Result<()> {
    for mapping in cfg.source.folders.iter() {
        if mapping.from.is_empty() {
            return Err(ReemitError::ConfigError(
                "folder mapping has an empty `from` glob".to_string(),
            ));
        }
        if mapping.to.is_empty() {
            return Err(ReemitError::ConfigError(format!(
                "folder mapping '{}' has an empty `to` template",
                mapping.from
            )));
        }
        // The leaf `/*` is where the matched file name (and later each
        // artifact's base name) is substituted; without it there is no
        // well-defined destination directory.
        if !mapping.from.ends_with("/*") {
            return Err(ReemitError::ConfigError(format!(
                "folder mapping `from` glob '{}' must end with '/*'",
                mapping.from
            )));
        }
        if !mapping.to.ends_with("/*") {
            return Err(ReemitError::ConfigError(format!(
                "folder mapping `to` template '{}' must end with '/*'",
                mapping.to
            )));
        }
        // Recursive wildcards must appear as a `/**` segment so the
        // sub-path substitution has a separator to attach to; write a
        // root-level fragment as "/**/*", not "**/*".
        for (field, value) in [("from", &mapping.from), ("to", &mapping.to)] {
            if value.contains("**") && !value.contains("/**") {
                return Err(ReemitError::ConfigError(format!(
                    "folder mapping `{}` '{}' must write its recursive wildcard as '/**'",
                    field, value
                )));
            }
        }
    }

    if cfg.output.root.is_empty() {
        return Err(ReemitError::ConfigError(
            "[output].root must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_extensions(cfg: &RawConfigFile) -> Result<()> {
    for ext in cfg.source.extensions.iter() {
        if ext.is_empty() || ext.contains('.') || ext.contains('/') {
            return Err(ReemitError::ConfigError(format!(
                "invalid source extension '{}' (expected e.g. \"ts\", without the leading dot)",
                ext
            )));
        }
    }
    Ok(())
}

fn validate_globs(cfg: &RawConfigFile) -> Result<()> {
    // Compile the rules once to surface glob syntax errors at load time
    // instead of at setup.
    compile_rules(&cfg.source.root, &cfg.source.folders, &cfg.source.extensions)?;
    Ok(())
}
