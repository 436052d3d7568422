//! Deployment parameters.
//!
//! Defaults match the bot's Cloud Run sizing. A TOML file can override any
//! field, and the CLI can override the file.

use crate::{DeployError, DeployResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional variables forwarded to the service when set locally.
pub const DEFAULT_FORWARDED_ENV: [&str; 2] = ["BOT_CATEGORY", "OPENAI_MODEL"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Cloud Run service name
    pub service: String,
    /// Source directory uploaded to Cloud Build
    pub source: String,
    /// GCP project; gcloud's active project when unset
    pub project: Option<String>,
    pub region: String,
    /// Container port the bot's HTTP server listens on
    pub port: u16,
    pub memory: String,
    pub cpu: String,
    pub min_instances: u32,
    pub max_instances: Option<u32>,
    pub allow_unauthenticated: bool,
    /// Path or name of the gcloud binary
    pub gcloud: String,
    /// Extra variables copied from the local environment when present
    pub forward_env: Vec<String>,
    pub warm_keeper: WarmKeeperConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            service: "twitter-bot".to_string(),
            source: ".".to_string(),
            project: None,
            region: "us-central1".to_string(),
            port: 8080,
            memory: "512Mi".to_string(),
            cpu: "1".to_string(),
            min_instances: 1,
            max_instances: None,
            allow_unauthenticated: true,
            gcloud: "gcloud".to_string(),
            forward_env: DEFAULT_FORWARDED_ENV.iter().map(|s| s.to_string()).collect(),
            warm_keeper: WarmKeeperConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarmKeeperConfig {
    pub enabled: bool,
    /// Scheduler job name; `<service>-keep-warm` when unset
    pub job_name: Option<String>,
    /// Cron expression
    pub schedule: String,
    pub http_method: String,
    pub attempt_deadline_secs: u64,
}

impl Default for WarmKeeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            job_name: None,
            schedule: "*/5 * * * *".to_string(),
            http_method: "GET".to_string(),
            attempt_deadline_secs: 30,
        }
    }
}

impl DeployConfig {
    /// Load a TOML file on top of the defaults.
    pub fn load(path: &Path) -> DeployResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| DeployError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&raw).map_err(|e| DeployError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn job_name(&self) -> String {
        self.warm_keeper
            .job_name
            .clone()
            .unwrap_or_else(|| format!("{}-keep-warm", self.service))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.service.trim().is_empty() {
            return Err("Service name cannot be empty".to_string());
        }

        if self.region.trim().is_empty() {
            return Err("Region cannot be empty".to_string());
        }

        if self.source.trim().is_empty() {
            return Err("Source path cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Port must be greater than 0".to_string());
        }

        if let Some(max) = self.max_instances {
            if max == 0 {
                return Err("Max instances must be greater than 0".to_string());
            }
            if self.min_instances > max {
                return Err(format!(
                    "Min instances ({}) cannot exceed max instances ({})",
                    self.min_instances, max
                ));
            }
        }

        if self.warm_keeper.enabled {
            if self.warm_keeper.schedule.split_whitespace().count() != 5 {
                return Err(format!(
                    "Warm-keeper schedule must be a 5-field cron expression, got '{}'",
                    self.warm_keeper.schedule
                ));
            }
            if self.warm_keeper.attempt_deadline_secs == 0 {
                return Err("Attempt deadline must be greater than 0".to_string());
            }
            if self.warm_keeper.http_method.trim().is_empty() {
                return Err("Warm-keeper HTTP method cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
