//! Cloud Scheduler job that pings the service so it never cold-starts.

use crate::command::{CommandRunner, CommandSpec};
use crate::config::DeployConfig;
use tracing::{info, warn};

/// Outcome of the registration attempt. None of these stop a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmKeeperStatus {
    Created,
    AlreadyExists,
    Failed(String),
    Skipped,
}

impl WarmKeeperStatus {
    pub fn describe(&self) -> String {
        match self {
            WarmKeeperStatus::Created => "warm-keeper job created".to_string(),
            WarmKeeperStatus::AlreadyExists => "warm-keeper job already exists".to_string(),
            WarmKeeperStatus::Failed(reason) => {
                format!("warm-keeper job not registered ({})", reason)
            }
            WarmKeeperStatus::Skipped => "warm-keeper registration skipped".to_string(),
        }
    }
}

pub fn register_command(config: &DeployConfig, url: &str) -> CommandSpec {
    let keeper = &config.warm_keeper;
    let spec = CommandSpec::new(&config.gcloud)
        .args(["scheduler", "jobs", "create", "http"])
        .arg(config.job_name())
        .args(["--schedule", keeper.schedule.as_str()])
        .args(["--uri", url])
        .args(["--http-method", keeper.http_method.as_str()])
        .args([
            "--attempt-deadline".to_string(),
            format!("{}s", keeper.attempt_deadline_secs),
        ])
        .args(["--location", config.region.as_str()]);

    match &config.project {
        Some(project) => spec.args(["--project", project.as_str()]),
        None => spec,
    }
}

fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("ALREADY_EXISTS") || stderr.to_lowercase().contains("already exists")
}

/// Register the warm-keeper job for `url`, logging instead of failing.
pub fn register<R: CommandRunner + ?Sized>(
    runner: &R,
    config: &DeployConfig,
    url: &str,
) -> WarmKeeperStatus {
    let spec = register_command(config, url);
    let job = config.job_name();

    let output = match runner.run(&spec) {
        Ok(output) => output,
        Err(e) => {
            warn!(job = %job, error = %e, "Could not run scheduler registration");
            return WarmKeeperStatus::Failed(e.to_string());
        }
    };

    if output.success {
        info!(job = %job, schedule = %config.warm_keeper.schedule, "Warm-keeper job created");
        WarmKeeperStatus::Created
    } else if is_already_exists(&output.stderr) {
        info!(job = %job, "Warm-keeper job already exists, leaving it in place");
        WarmKeeperStatus::AlreadyExists
    } else {
        warn!(job = %job, stderr = %output.stderr, "Warm-keeper registration failed");
        WarmKeeperStatus::Failed(output.stderr)
    }
}
