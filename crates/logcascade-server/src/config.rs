//! Server settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for `logcascade serve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Cascade configuration file (YAML)
    #[serde(default = "default_cascade_config")]
    pub cascade_config: PathBuf,

    /// Directory receiving a copy of each classified table as `output.csv`
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Initialize every strategy before accepting requests
    #[serde(default)]
    pub warm_up: bool,

    /// Install the Prometheus recorder and serve /metrics
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            cascade_config: default_cascade_config(),
            output_dir: Some(PathBuf::from("resources")),
            max_upload_bytes: default_max_upload_bytes(),
            warm_up: false,
            metrics: true,
        }
    }
}

impl ServerSettings {
    /// Load settings from defaults, config files and the environment.
    ///
    /// Later sources override earlier ones: compiled defaults, then
    /// `logcascade.{toml,yaml}` in the working directory, then `config_file`
    /// if given, then `LOGCASCADE_*` variables (`.env` included). Nested keys
    /// use a double underscore.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = config::Config::try_from(&ServerSettings::default())
            .context("Failed to serialize default settings")?;

        let mut builder = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("logcascade").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LOGCASCADE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Failed to deserialize settings")
    }

    /// Socket address string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cascade_config() -> PathBuf {
    PathBuf::from("cascade.yaml")
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_true() -> bool {
    true
}
