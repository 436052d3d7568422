//! `gcloud run` invocations: deploy the service and look up its URL.

use crate::command::{CommandRunner, CommandSpec};
use crate::config::DeployConfig;
use crate::credentials::CredentialSet;
use crate::{DeployError, DeployResult};
use tracing::{debug, info};

/// Delimiters tried, in order, when a value contains a comma.
const ALTERNATE_DELIMITERS: [char; 6] = ['@', '|', '#', ';', '~', ':'];

/// Build the `--set-env-vars` value.
///
/// gcloud splits the list on commas, so when a value contains one the list
/// switches to the `^D^` alternate delimiter form, with `D` the first
/// candidate that appears in no value.
pub fn env_assignment(pairs: &[(String, String)]) -> DeployResult<String> {
    let joined = |delimiter: char| -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string())
    };

    if !pairs.iter().any(|(_, v)| v.contains(',')) {
        return Ok(joined(','));
    }

    let delimiter = ALTERNATE_DELIMITERS
        .into_iter()
        .find(|d| pairs.iter().all(|(_, v)| !v.contains(*d)))
        .ok_or_else(|| {
            DeployError::InvalidConfig(format!(
                "environment values use ',' and every alternate delimiter ({}); \
                 cannot pass them to gcloud",
                ALTERNATE_DELIMITERS.iter().collect::<String>()
            ))
        })?;
    debug!(%delimiter, "Using alternate --set-env-vars delimiter");

    Ok(format!("^{}^{}", delimiter, joined(delimiter)))
}

/// Credentials first, then any extra forwarded variables.
pub fn service_env(
    credentials: &CredentialSet,
    extra_env: &[(String, String)],
) -> Vec<(String, String)> {
    credentials
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .chain(extra_env.iter().cloned())
        .collect()
}

fn push_project(spec: CommandSpec, config: &DeployConfig) -> CommandSpec {
    match &config.project {
        Some(project) => spec.args(["--project", project.as_str()]),
        None => spec,
    }
}

pub fn deploy_command(
    config: &DeployConfig,
    credentials: &CredentialSet,
    extra_env: &[(String, String)],
) -> DeployResult<CommandSpec> {
    let assignment = env_assignment(&service_env(credentials, extra_env))?;

    let mut spec = CommandSpec::new(&config.gcloud)
        .args(["run", "deploy", config.service.as_str()])
        .args(["--source", config.source.as_str()])
        .args(["--port".to_string(), config.port.to_string()])
        .args(["--region", config.region.as_str()]);
    spec = push_project(spec, config);
    spec = spec.args(["--platform", "managed"]);

    spec = if config.allow_unauthenticated {
        spec.arg("--allow-unauthenticated")
    } else {
        spec.arg("--no-allow-unauthenticated")
    };

    spec = spec
        .args(["--min-instances".to_string(), config.min_instances.to_string()])
        .args(["--cpu", config.cpu.as_str()])
        .args(["--memory", config.memory.as_str()]);

    if let Some(max) = config.max_instances {
        spec = spec.args(["--max-instances".to_string(), max.to_string()]);
    }

    Ok(spec.arg("--set-env-vars").secret_arg(assignment).arg("--quiet"))
}

pub fn describe_command(config: &DeployConfig) -> CommandSpec {
    let spec = CommandSpec::new(&config.gcloud)
        .args(["run", "services", "describe", config.service.as_str()])
        .args(["--region", config.region.as_str()]);
    push_project(spec, config)
        .args(["--platform", "managed"])
        .args(["--format", "value(status.url)"])
}

/// Deploy or update the service. Any failure is fatal.
pub fn deploy<R: CommandRunner + ?Sized>(
    runner: &R,
    config: &DeployConfig,
    credentials: &CredentialSet,
    extra_env: &[(String, String)],
) -> DeployResult<()> {
    let spec = deploy_command(config, credentials, extra_env)?;
    info!(
        service = %config.service,
        region = %config.region,
        "Deploying to Cloud Run, this can take several minutes"
    );
    debug!(command = %spec.display(), "Deploy command");

    let output = runner.run(&spec)?;
    if !output.success {
        return Err(DeployError::DeployFailed {
            code: output.code,
            stderr: output.stderr,
        });
    }

    info!(service = %config.service, "Deployment finished");
    Ok(())
}

/// Public URL of the deployed service.
pub fn resolve_service_url<R: CommandRunner + ?Sized>(
    runner: &R,
    config: &DeployConfig,
) -> DeployResult<String> {
    let output = runner.run(&describe_command(config))?;
    if !output.success {
        return Err(DeployError::DescribeFailed {
            code: output.code,
            stderr: output.stderr,
        });
    }

    let url = output.stdout.trim();
    if url.is_empty() {
        return Err(DeployError::MissingServiceUrl {
            service: config.service.clone(),
        });
    }

    info!(url = %url, "Resolved service URL");
    Ok(url.to_string())
}
