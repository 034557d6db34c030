use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::PaddConfig;

/// Name of the data directory created by `padd init`
pub const DATA_DIR_NAME: &str = ".padd";

/// Config file inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Error type for locating and reading the config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a padd directory: no .padd/config.toml found (run `padd init`)")]
    NotADataDir,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Walk up from `start` looking for a `.padd/` directory with a config in it.
/// Returns the path of the `.padd/` directory itself.
pub fn discover_data_dir(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        let data_dir = current.join(DATA_DIR_NAME);
        if data_dir.is_dir() && data_dir.join(CONFIG_FILE_NAME).exists() {
            return Ok(data_dir);
        }
        if !current.pop() {
            return Err(ConfigError::NotADataDir);
        }
    }
}

pub fn load_config(data_dir: &Path) -> Result<PaddConfig, ConfigError> {
    let config_path = data_dir.join(CONFIG_FILE_NAME);
    let text = fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: PaddConfig = toml::from_str(&text)?;
    tracing::debug!(path = %config_path.display(), owner = %config.profile.owner, "loaded config");
    Ok(config)
}

/// Absolute path of the store file named by the config
pub fn store_path(data_dir: &Path, config: &PaddConfig) -> PathBuf {
    data_dir.join(&config.store.file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(root: &Path, text: &str) -> PathBuf {
        let data_dir = root.join(DATA_DIR_NAME);
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join(CONFIG_FILE_NAME), text).unwrap();
        data_dir
    }

    #[test]
    fn discovers_from_nested_directory() {
        let tmp = TempDir::new().unwrap();
        let data_dir = write_config(tmp.path(), "[profile]\nowner = \"crew\"\n");
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_data_dir(&nested).unwrap(), data_dir);
    }

    #[test]
    fn bare_padd_dir_is_not_enough() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(DATA_DIR_NAME)).unwrap();
        // A stray .padd higher up (e.g. in $HOME) would still be found, so only
        // check that this one is skipped.
        if let Ok(found) = discover_data_dir(tmp.path()) {
            assert_ne!(found, tmp.path().join(DATA_DIR_NAME));
        }
    }

    #[test]
    fn loads_and_resolves_store_path() {
        let tmp = TempDir::new().unwrap();
        let data_dir = write_config(
            tmp.path(),
            "[profile]\nowner = \"crew\"\n\n[store]\nfile = \"board.json\"\n",
        );
        let config = load_config(&data_dir).unwrap();
        assert_eq!(config.profile.owner, "crew");
        assert_eq!(store_path(&data_dir, &config), data_dir.join("board.json"));
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let data_dir = write_config(tmp.path(), "[profile\nowner = 1\n");
        assert!(matches!(load_config(&data_dir), Err(ConfigError::ParseError(_))));
    }
}
