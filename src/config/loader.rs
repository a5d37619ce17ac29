//! Configuration Loader
//!
//! Layers defaults, an optional TOML file and environment variables.
//!
//! Precedence (highest to lowest):
//! 1. `GRPC_WEB_*` environment variables (e.g. `GRPC_WEB_BASE_URL`)
//! 2. Config file: `$GRPC_WEB_CONFIG`, else `./grpc-web-client.toml`, else
//!    `./config/grpc-web-client.toml`
//! 3. [`ClientConfig::default`]

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use tracing::debug;

use super::ClientConfig;
use crate::error::{GrpcWebError, Result};

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "GRPC_WEB";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "GRPC_WEB_CONFIG";

const DEFAULT_CONFIG_PATHS: [&str; 2] = [
    "./grpc-web-client.toml",
    "./config/grpc-web-client.toml",
];

impl ClientConfig {
    /// Load configuration from the config file (if any) and environment
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let file = explicit.clone().or_else(Self::find_config_file);
        Self::load_layered(file.as_deref(), explicit.is_some(), ENV_PREFIX)
    }

    /// Load configuration from a specific file, without environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).required(true))
            .build()
            .map_err(|e| {
                GrpcWebError::config_error(format!(
                    "Failed to read config file {}: {e}",
                    path.display()
                ))
            })?;
        Self::finish(settings)
    }

    /// Build from an optional file and environment variables with `env_prefix`
    pub(crate) fn load_layered(
        file: Option<&Path>,
        file_required: bool,
        env_prefix: &str,
    ) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            debug!("Loading client config from: {}", path.display());
            builder = builder.add_source(File::from(path).required(file_required));
        }
        let settings = builder
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()
            .map_err(|e| GrpcWebError::config_error(format!("Failed to load config: {e}")))?;
        Self::finish(settings)
    }

    fn finish(settings: Config) -> Result<Self> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| GrpcWebError::config_error(format!("Invalid client config: {e}")))?;
        config.validate()?;
        debug!("Loaded client configuration: {:?}", config);
        Ok(config)
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|path| path.is_file())
            .map(Path::to_path_buf)
    }
}
