//! Deployment tooling for the tweetforge bot
//!
//! Validates the bot's credentials, deploys the service to Cloud Run through
//! the `gcloud` CLI and registers a Cloud Scheduler job that keeps the
//! deployed instance warm.

pub mod app;
pub mod cloud_run;
pub mod command;
pub mod config;
pub mod credentials;
pub mod pipeline;
pub mod warm_keeper;

use thiserror::Error;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use config::{DeployConfig, WarmKeeperConfig};
pub use credentials::{validate_credentials, CredentialSet, REQUIRED_CREDENTIALS};
pub use pipeline::{Deployment, DeploymentReport};
pub use warm_keeper::WarmKeeperStatus;

/// Errors raised while deploying
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Missing required environment variable: {name}")]
    MissingCredential { name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file '{path}': {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("Failed to run '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("Deployment failed{}: {}", exit_suffix(.code), .stderr)]
    DeployFailed { code: Option<i32>, stderr: String },

    #[error("Failed to resolve service URL{}: {}", exit_suffix(.code), .stderr)]
    DescribeFailed { code: Option<i32>, stderr: String },

    #[error("Service '{service}' has no public URL")]
    MissingServiceUrl { service: String },
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit status {})", c))
        .unwrap_or_default()
}

pub type DeployResult<T> = Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_names_variable() {
        let err = DeployError::MissingCredential {
            name: "TWITTER_ACCESS_TOKEN".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: TWITTER_ACCESS_TOKEN"
        );
    }

    #[test]
    fn test_deploy_failed_display() {
        let err = DeployError::DeployFailed {
            code: Some(1),
            stderr: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Deployment failed (exit status 1): permission denied"
        );

        let err = DeployError::DeployFailed {
            code: None,
            stderr: "killed".to_string(),
        };
        assert_eq!(err.to_string(), "Deployment failed: killed");
    }
}
