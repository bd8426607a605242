use crate::domain::{
    config::SerialLineConfig,
    error::{ComTunnelError, ComTunnelResult},
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::fs;
use tracing::info;

/// File name looked up in the working directory and the user config directory
pub const DEFAULT_CONFIG_FILE: &str = "serial.yml";

/// Where the serial line configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Stdin,
}

impl ConfigSource {
    /// Interpret a `-f` argument; `-` means standard input
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            ConfigSource::Stdin
        } else {
            ConfigSource::File(PathBuf::from(arg))
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Stdin => write!(f, "stdin"),
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Loader that searches the working directory, then the user config directory
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            search_paths.push(dir.join("comtunnel").join(DEFAULT_CONFIG_FILE));
        }
        Self { search_paths }
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Pick the explicit source, or the first existing file on the search path
    pub fn resolve(&self, explicit: Option<&str>) -> ComTunnelResult<ConfigSource> {
        if let Some(arg) = explicit {
            return Ok(ConfigSource::from_arg(arg));
        }

        self.search_paths
            .iter()
            .find(|path| path.exists())
            .map(|path| ConfigSource::File(path.clone()))
            .ok_or_else(|| {
                let tried: Vec<String> = self
                    .search_paths
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                ComTunnelError::config(format!(
                    "no serial config found (tried {})",
                    tried.join(", ")
                ))
            })
    }

    pub fn load(&self, source: &ConfigSource) -> ComTunnelResult<SerialLineConfig> {
        let config = match source {
            ConfigSource::File(path) => Self::load_from_path(path)?,
            ConfigSource::Stdin => {
                info!("Loading serial config from stdin");
                Self::load_from_reader(std::io::stdin().lock())?
            }
        };
        info!("Serial config from {}: {:?}", source, config);
        Ok(config)
    }

    /// Load configuration from specific path
    pub fn load_from_path(path: &Path) -> ComTunnelResult<SerialLineConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            ComTunnelError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content).map_err(|e| {
            ComTunnelError::config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn load_from_reader(mut reader: impl Read) -> ComTunnelResult<SerialLineConfig> {
        let mut content = String::new();
        reader.read_to_string(&mut content).map_err(|e| {
            ComTunnelError::config(format!("Failed to read serial config: {}", e))
        })?;

        Self::parse(&content)
            .map_err(|e| ComTunnelError::config(format!("Failed to parse serial config: {}", e)))
    }

    fn parse(content: &str) -> Result<SerialLineConfig, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
