//! Operator-facing entry point shared by the binary and its tests.

use crate::command::CommandRunner;
use crate::config::DeployConfig;
use crate::credentials::validate_credentials;
use crate::pipeline::Deployment;
use std::io::{self, Write};
use tracing::error;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Validate, deploy and register, reporting to `out`/`err`.
///
/// Returns the process exit code: non-zero for a missing credential, an
/// invalid config or a failed deploy/describe; zero otherwise, including
/// when only the warm-keeper registration failed.
pub fn run<R, F, W, E>(
    config: &DeployConfig,
    runner: &R,
    lookup: F,
    out: &mut W,
    err: &mut E,
) -> io::Result<u8>
where
    R: CommandRunner + ?Sized,
    F: Fn(&str) -> Option<String>,
    W: Write,
    E: Write,
{
    let credentials = match validate_credentials(&lookup) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            writeln!(err, "Error: {}", e)?;
            return Ok(EXIT_FAILURE);
        }
    };

    let deployment = Deployment::new(runner, config).with_forwarded_env(&lookup);

    match deployment.run(&credentials) {
        Ok(report) => {
            writeln!(out, "Deployment successful!")?;
            writeln!(out, "Service URL: {}", report.service_url)?;
            writeln!(out, "Status: {}", report.warm_keeper.describe())?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            error!("{}", e);
            writeln!(err, "Error: {}", e)?;
            Ok(EXIT_FAILURE)
        }
    }
}
