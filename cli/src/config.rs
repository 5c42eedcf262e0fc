use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "mash.toml";

/// Extra include directories, in the platform's path-list syntax.
pub const MASH_PATH: &str = "MASH_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {}: {source}", .config_path.display())]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {}: {source}", .config_path.display())]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Searched for includes after the working directory.
    pub library_paths: Vec<PathBuf>,
    pub max_restarts: usize,
    pub build_dir: PathBuf,
    pub archive_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            library_paths: Vec::new(),
            max_restarts: 16,
            build_dir: PathBuf::from(".mash"),
            archive_dir: PathBuf::from(".mash-archive"),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }
        Self::read(config_path).map(Some)
    }

    /// An explicit path must exist; the default file may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => Ok(Self::load_from_path(CONFIG_FILE)?.unwrap_or_default()),
        }
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        log::debug!("loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Include directories in search order: `extra` first, then configured
    /// ones, then `MASH_PATH`.
    pub fn library_dirs(&self, extra: &[PathBuf]) -> Vec<PathBuf> {
        let from_env = std::env::var_os(MASH_PATH)
            .map(|value| std::env::split_paths(&value).collect::<Vec<_>>())
            .unwrap_or_default();
        extra
            .iter()
            .chain(&self.library_paths)
            .cloned()
            .chain(from_env.into_iter().filter(|p| !p.as_os_str().is_empty()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_restarts, 16);
        assert_eq!(config.build_dir, PathBuf::from(".mash"));
        assert_eq!(config.archive_dir, PathBuf::from(".mash-archive"));
        assert!(config.library_paths.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("max_restarts = 3").unwrap();
        assert_eq!(config.max_restarts, 3);
        assert_eq!(config.build_dir, PathBuf::from(".mash"));
    }

    #[test]
    fn test_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(
            &config_path,
            "library_paths = [\"lib\", \"/opt/mash\"]\nbuild_dir = \"out\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_path).unwrap().unwrap();
        assert_eq!(
            config.library_paths,
            vec![PathBuf::from("lib"), PathBuf::from("/opt/mash")]
        );
        assert_eq!(config.build_dir, PathBuf::from("out"));
        assert_eq!(config.max_restarts, 16);
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load_from_path(temp_dir.path().join("absent.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigReadError { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&config_path, "max_restarts = \"many\"").unwrap();

        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("libary_paths = []").is_err());
    }

    #[test]
    fn test_library_dirs_order() {
        let config = Config {
            library_paths: vec![PathBuf::from("configured")],
            ..Config::default()
        };
        let dirs = config.library_dirs(&[PathBuf::from("cli")]);
        assert_eq!(dirs[0], PathBuf::from("cli"));
        assert_eq!(dirs[1], PathBuf::from("configured"));
    }
}
