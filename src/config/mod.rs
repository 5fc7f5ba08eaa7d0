// src/config/mod.rs

//! Configuration loading and validation.
//!
//! The raw TOML model lives in [`model`]; semantic validation happens in
//! [`validate`] via `TryFrom<RawConfigFile>`, and [`loader`] ties the two
//! together for callers.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, FolderMapping, OptionsSection, OutputSection, RawConfigFile, SourceSection,
};
