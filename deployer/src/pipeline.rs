//! deploy -> describe -> register, strictly in that order.

use crate::cloud_run;
use crate::command::CommandRunner;
use crate::config::DeployConfig;
use crate::credentials::{CredentialSet, REQUIRED_CREDENTIALS};
use crate::warm_keeper::{self, WarmKeeperStatus};
use crate::{DeployError, DeployResult};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub service_url: String,
    pub warm_keeper: WarmKeeperStatus,
}

pub struct Deployment<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    config: &'a DeployConfig,
    extra_env: Vec<(String, String)>,
}

impl<'a, R: CommandRunner + ?Sized> Deployment<'a, R> {
    pub fn new(runner: &'a R, config: &'a DeployConfig) -> Self {
        Self {
            runner,
            config,
            extra_env: Vec::new(),
        }
    }

    /// Additional non-secret variables for the service.
    pub fn with_extra_env(mut self, extra_env: Vec<(String, String)>) -> Self {
        self.extra_env = extra_env;
        self
    }

    /// Collect `config.forward_env` entries that are set in `lookup`.
    ///
    /// Credentials are always sent, so naming one here is ignored, as is a
    /// repeated name.
    pub fn with_forwarded_env<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut extra: Vec<(String, String)> = Vec::new();
        for name in &self.config.forward_env {
            if REQUIRED_CREDENTIALS.contains(&name.as_str()) {
                debug!("{} is a credential and is already forwarded", name);
                continue;
            }
            if extra.iter().any(|(k, _)| k == name) {
                continue;
            }
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                extra.push((name.clone(), value));
            }
        }
        self.with_extra_env(extra)
    }

    pub fn run(&self, credentials: &CredentialSet) -> DeployResult<DeploymentReport> {
        self.config.validate().map_err(DeployError::InvalidConfig)?;

        cloud_run::deploy(self.runner, self.config, credentials, &self.extra_env)?;
        let service_url = cloud_run::resolve_service_url(self.runner, self.config)?;

        let warm_keeper = if self.config.warm_keeper.enabled {
            warm_keeper::register(self.runner, self.config, &service_url)
        } else {
            info!("Warm-keeper registration disabled");
            WarmKeeperStatus::Skipped
        };

        Ok(DeploymentReport {
            service_url,
            warm_keeper,
        })
    }
}
