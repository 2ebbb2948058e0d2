//! Rendering settings.
//!
//! ```toml
//! dialect = "postgres"
//! literal_mode = "parameterized"
//! layout = "compact"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, SqbResult};
use crate::transpiler::{Dialect, Layout, LiteralMode};

/// Settings file looked up in the working directory and the user config dir.
pub const SETTINGS_FILE: &str = "sqb.toml";

/// How built queries are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub dialect: Dialect,
    pub literal_mode: LiteralMode,
    pub layout: Layout,
}

impl Settings {
    /// Create a new settings builder
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> SqbResult<Self> {
        toml::from_str(content).map_err(|e| QueryError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> SqbResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings from `explicit`, else the first of `./sqb.toml` and
    /// `<config dir>/sqb/sqb.toml` that exists, else defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> SqbResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(path),
            None => {
                tracing::debug!("No {} found, using default settings", SETTINGS_FILE);
                Ok(Self::default())
            }
        }
    }

    /// Candidate settings files in lookup order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(SETTINGS_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sqb").join(SETTINGS_FILE));
        }
        paths
    }
}

/// Builder for Settings
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.settings.dialect = dialect;
        self
    }

    pub fn literal_mode(mut self, mode: LiteralMode) -> Self {
        self.settings.literal_mode = mode;
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.settings.layout = layout;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.dialect, Dialect::SqlServer);
        assert_eq!(settings.literal_mode, LiteralMode::Inline);
        assert_eq!(settings.layout, Layout::Multiline);
    }

    #[test]
    fn test_partial_file() {
        let settings = Settings::from_toml_str(
            r#"
            dialect = "postgres"
            literal_mode = "parameterized"
            "#,
        )
        .unwrap();
        assert_eq!(
            settings,
            Settings::builder()
                .dialect(Dialect::Postgres)
                .literal_mode(LiteralMode::Parameterized)
                .build()
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_toml_str("dialekt = \"postgres\"").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Settings::load(Some(Path::new("/nonexistent/sqb.toml"))).unwrap_err();
        assert!(matches!(err, QueryError::Io(_)));
    }

    #[test]
    fn test_search_paths_start_in_working_dir() {
        assert_eq!(Settings::search_paths()[0], PathBuf::from("sqb.toml"));
    }
}
