//! Configuration for the caret renderers.
//!
//! Parses `caret.toml` with serde and finds it by walking up from the working directory when
//! no path is given. Command line flags are applied on top through [`CliSettings`].
//!
//! ```toml
//! mode = "wysiwyg"
//!
//! [render]
//! sanitize = true
//! link_base = "${NOTES_ROOT:-/notes}"
//! auto_space = true
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `render.link_base` and `render.link_prefix` support `${VAR}` (error when unset) and
//! `${VAR:-default}`.

mod expand;

use std::path::{Path, PathBuf};

use caret_renderer::{RenderMode, RenderOptions};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "caret.toml";

/// Command line values that override the configuration file.
///
/// Only `Some` fields override.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the render mode.
    pub mode: Option<RenderMode>,
    /// Override `render.sanitize`.
    pub sanitize: Option<bool>,
    /// Override `render.link_base`.
    pub link_base: Option<String>,
    /// Override `render.link_prefix`.
    pub link_prefix: Option<String>,
    /// Override `render.auto_space`.
    pub auto_space: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend used when the command line does not pick one.
    pub mode: RenderMode,
    /// Options handed to the renderer.
    pub render: RenderOptions,
    /// Path of the loaded file, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g. "`render.link_base`").
        field: String,
        /// What went wrong (e.g. "${`NOTES_ROOT`} is not set").
        message: String,
    },
}

impl Config {
    /// Load configuration and apply command line settings.
    ///
    /// An explicit `config_path` must exist. Without one, `caret.toml` is searched in the
    /// working directory and its parents, and defaults are used when none is found.
    ///
    /// # Errors
    ///
    /// Returns an error when an explicit file is missing, reading or parsing fails, a variable
    /// reference cannot be expanded, or the final options are invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(mode) = settings.mode {
            self.mode = mode;
        }
        if let Some(sanitize) = settings.sanitize {
            self.render.sanitize = sanitize;
        }
        if let Some(link_base) = &settings.link_base {
            self.render.link_base.clone_from(link_base);
        }
        if let Some(link_prefix) = &settings.link_prefix {
            self.render.link_prefix.clone_from(link_prefix);
        }
        if let Some(auto_space) = settings.auto_space {
            self.render.auto_space = auto_space;
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate the render options.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the offending `render.*` value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.render
            .validate()
            .map_err(|e| ConfigError::Validation(format!("[render] {e}")))
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.render.link_base = expand::expand_env(&self.render.link_base, "render.link_base")?;
        self.render.link_prefix =
            expand::expand_env(&self.render.link_prefix, "render.link_prefix")?;
        Ok(())
    }
}

/// Search for `caret.toml` in `start` and its parents.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mode, RenderMode::Export);
        assert_eq!(config.render, RenderOptions::default());
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_partial_render_table() {
        let config: Config = toml::from_str(
            r#"
mode = "ir"

[render]
sanitize = true
node_index_start = 10
"#,
        )
        .unwrap();
        assert_eq!(config.mode, RenderMode::Ir);
        assert!(config.render.sanitize);
        assert_eq!(config.render.node_index_start, 10);
        assert_eq!(config.render.task_list_item_class, "vditor-task");
        assert!(config.render.code_block_preview);
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let result: Result<Config, _> = toml::from_str(r#"mode = "sv""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "mode = \"block\"\n[render]\nlink_base = \"/notes\"\n",
        );
        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.mode, RenderMode::Block);
        assert_eq!(config.render.link_base, "/notes");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[render\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_negative_node_index_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[render]\nnode_index_start = -1\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("node_index_start"));
    }

    #[test]
    fn test_link_prefix_expanded() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("CARET_CONFIG_TEST_CDN", "https://cdn.test");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[render]\nlink_prefix = \"${CARET_CONFIG_TEST_CDN}/\"\n",
        );
        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.render.link_prefix, "https://cdn.test/");
        unsafe {
            std::env::remove_var("CARET_CONFIG_TEST_CDN");
        }
    }

    #[test]
    fn test_cli_settings_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "mode = \"ir\"\n[render]\nsanitize = true\nlink_base = \"/a\"\n",
        );
        let settings = CliSettings {
            mode: Some(RenderMode::Wysiwyg),
            sanitize: Some(false),
            link_base: Some("/b".to_owned()),
            ..CliSettings::default()
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(config.mode, RenderMode::Wysiwyg);
        assert!(!config.render.sanitize);
        assert_eq!(config.render.link_base, "/b");
    }

    #[test]
    fn test_cli_link_prefix_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        let settings = CliSettings {
            link_prefix: Some("a\"b".to_owned()),
            ..CliSettings::default()
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        let nested = dir.path().join("notes/daily");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(discover_config(&nested), Some(path));
    }

    #[test]
    fn test_discover_config_ignores_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(CONFIG_FILENAME)).unwrap();
        let found = discover_config(dir.path());
        assert_ne!(found, Some(dir.path().join(CONFIG_FILENAME)));
    }
}
