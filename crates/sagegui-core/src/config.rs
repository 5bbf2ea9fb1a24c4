use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::connection::ConnectionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTool {
    #[default]
    Diann,
    Sage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreProtocol {
    #[default]
    Sftp,
    Local,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub tool: SearchTool,
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub protocol: StoreProtocol,
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Absolute directory under which the `projects` tree lives.
    pub workspace_root: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            protocol: StoreProtocol::Sftp,
            host: "login02.scripps.edu".to_string(),
            port: 22,
            username: String::new(),
            password: String::new(),
            workspace_root: "/gpfs/group/yates".to_string(),
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout(),
        }
    }
}

/// Fixed resource request rendered into every job script header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub submit_command: String,
    pub directive_prefix: String,
    pub nodes: u32,
    pub ntasks: u32,
    pub cpus_per_task: u32,
    pub memory: String,
    pub partition: String,
    pub time_limit: String,
    pub extra_directives: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            submit_command: "sbatch".to_string(),
            directive_prefix: "#SBATCH".to_string(),
            nodes: 1,
            ntasks: 1,
            cpus_per_task: 20,
            memory: "50Gb".to_string(),
            partition: "highmem".to_string(),
            time_limit: "240:00:00".to_string(),
            extra_directives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolPaths {
    pub diann: String,
    pub sage: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            diann: "/gpfs/home/rpark/cluster/DiaNN.sif".to_string(),
            sage: "sage".to_string(),
        }
    }
}

/// Load `Config.toml` (optional) overlaid with `SAGEGUI_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from("Config")
}

pub fn load_configuration_from(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(
            Environment::with_prefix("SAGEGUI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
