use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "guidechain.toml";
pub const DEFAULT_GUIDES_DIR: &str = "_guides";
pub const DEFAULT_CATALOG: &str = "topics.json";
pub const DEFAULT_EXTENSION: &str = "md";
pub const DEFAULT_MAX_REPAIR_PASSES: usize = 8;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Toml(toml::de::Error),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read config '{}': {}", path.display(), source)
            }
            ConfigError::Toml(err) => write!(f, "invalid {} TOML: {}", CONFIG_FILE, err),
            ConfigError::InvalidValue(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml(err) => Some(err),
            ConfigError::InvalidValue(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    guides_dir: Option<PathBuf>,
    catalog: Option<PathBuf>,
    extension: Option<String>,
    max_repair_passes: Option<usize>,
}

/// Values given on the command line or through the environment; they win
/// over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub guides_dir: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub guides_dir: PathBuf,
    pub catalog: PathBuf,
    pub extension: String,
    pub max_repair_passes: usize,
}

impl Config {
    /// Reads `guidechain.toml` under `root` when present.
    pub fn load(root: &Path, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        let raw = if path.is_file() {
            std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml(root, &raw, overrides)
    }

    pub(crate) fn from_toml(
        root: &Path,
        raw: &str,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file: RawConfig = toml::from_str(raw)?;

        let extension = file
            .extension
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let extension = extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            return Err(ConfigError::InvalidValue(
                "extension must not be empty".to_string(),
            ));
        }

        let max_repair_passes = file
            .max_repair_passes
            .unwrap_or(DEFAULT_MAX_REPAIR_PASSES);
        if max_repair_passes == 0 {
            return Err(ConfigError::InvalidValue(
                "max_repair_passes must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            root: root.to_path_buf(),
            guides_dir: overrides
                .guides_dir
                .or(file.guides_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GUIDES_DIR)),
            catalog: overrides
                .catalog
                .or(file.catalog)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG)),
            extension,
            max_repair_passes,
        })
    }

    /// Relative paths resolve against `root`; absolute ones are kept.
    pub fn guides_path(&self) -> PathBuf {
        self.root.join(&self.guides_dir)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(&self.catalog)
    }
}
