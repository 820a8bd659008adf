//! # Configuration
//!
//! `statelab.toml` and TOML platform catalogues.
//!
//! ```toml
//! platform = "arduino"
//! catalogues = ["platforms/arduino.toml"]
//! autosave = ".statelab/autosave.bin"
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file. Without a config file the built-in catalogue and platform apply.

use serde::Deserialize;
use statelab_core::primitives::BUILTIN_PLATFORM;
use statelab_core::{PlatformCatalogue, PlatformRegistry, StatelabError};
use std::path::{Path, PathBuf};

/// Name of the config file picked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "statelab.toml";

/// Maximum size of a config or catalogue file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Parsed `statelab.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Platform for new documents.
    pub platform: Option<String>,
    /// Extra platform catalogue files.
    pub catalogues: Vec<PathBuf>,
    /// Where `apply` writes a binary snapshot after saving.
    pub autosave: Option<PathBuf>,
    #[serde(skip)]
    base: PathBuf,
}

impl Config {
    /// Parse config text. Relative paths resolve against `base`.
    pub fn from_toml(text: &str, base: &Path) -> Result<Self, StatelabError> {
        let mut config: Self = toml::from_str(text)
            .map_err(|e| StatelabError::Deserialization(format!("Invalid config: {}", e)))?;
        config.base = base.to_path_buf();
        Ok(config)
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, StatelabError> {
        let text = read_small_file(path)?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let config = Self::from_toml(&text, &base)?;
        tracing::debug!(path = %path.display(), catalogues = config.catalogues.len(), "config loaded");
        Ok(config)
    }

    /// An explicit config path must exist; otherwise `statelab.toml` in the
    /// working directory is used when present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, StatelabError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.is_file() {
                    Self::load(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Platform for new documents.
    pub fn platform(&self) -> &str {
        self.platform.as_deref().unwrap_or(BUILTIN_PLATFORM)
    }

    /// Autosave path, resolved.
    pub fn autosave_path(&self) -> Option<PathBuf> {
        self.autosave.as_ref().map(|p| self.resolve(p))
    }

    /// Registry holding the built-in catalogue plus every configured one.
    pub fn registry(&self) -> Result<PlatformRegistry, StatelabError> {
        let mut registry = PlatformRegistry::with_builtin();
        for path in &self.catalogues {
            let catalogue = load_catalogue(&self.resolve(path))?;
            registry.register(catalogue);
        }
        Ok(registry)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

/// Read a TOML platform catalogue.
pub fn load_catalogue(path: &Path) -> Result<PlatformCatalogue, StatelabError> {
    let text = read_small_file(path)?;
    let catalogue: PlatformCatalogue = toml::from_str(&text).map_err(|e| {
        StatelabError::Deserialization(format!("Invalid catalogue '{}': {}", path.display(), e))
    })?;
    tracing::debug!(platform = %catalogue.id, types = catalogue.components.len(), "catalogue loaded");
    Ok(catalogue)
}

fn read_small_file(path: &Path) -> Result<String, StatelabError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StatelabError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(StatelabError::Io(format!(
            "File '{}' exceeds maximum allowed {} bytes",
            path.display(),
            MAX_CONFIG_FILE_SIZE
        )));
    }
    std::fs::read_to_string(path)
        .map_err(|e| StatelabError::Io(format!("Cannot read '{}': {}", path.display(), e)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use statelab_core::PlatformBinding;

    #[test]
    fn empty_config_uses_builtin_platform() {
        let config = Config::from_toml("", Path::new(".")).expect("parse");
        assert_eq!(config.platform(), BUILTIN_PLATFORM);
        assert!(config.autosave_path().is_none());
        assert_eq!(config.registry().expect("registry").len(), 1);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let config = Config::from_toml(
            "platform = \"board\"\nautosave = \"auto.bin\"\n",
            Path::new("/work/project"),
        )
        .expect("parse");
        assert_eq!(config.platform(), "board");
        assert_eq!(
            config.autosave_path(),
            Some(PathBuf::from("/work/project/auto.bin"))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("colour = \"red\"", Path::new(".")).is_err());
    }

    #[test]
    fn catalogues_register_into_registry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalogue = r#"
id = "board"
name = "Test board"

[components.Relay]
description = "Switched output"
methods = [{ name = "close" }, { name = "open" }]

[components.Clock]
singleton = true
signals = [{ name = "tick", description = "Every second" }]
"#;
        std::fs::write(dir.path().join("board.toml"), catalogue).expect("write catalogue");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "platform = \"board\"\ncatalogues = [\"board.toml\"]\n",
        )
        .expect("write config");

        let config = Config::load(&dir.path().join(CONFIG_FILE_NAME)).expect("load");
        let registry = config.registry().expect("registry");
        assert_eq!(registry.len(), 2);

        let board = registry.resolve("board").expect("board");
        assert_eq!(board.component_types(), vec!["Clock", "Relay"]);
        assert!(board.is_singleton("Clock"));
        assert_eq!(board.actions("Relay").len(), 2);
    }

    #[test]
    fn missing_catalogue_is_an_io_error() {
        let config = Config::from_toml("catalogues = [\"nope.toml\"]", Path::new("/nonexistent"))
            .expect("parse");
        assert!(matches!(config.registry(), Err(StatelabError::Io(_))));
    }
}
