//! External command invocation.
//!
//! Every step of a deployment is one blocking `gcloud` call. Building the
//! call (`CommandSpec`) is kept apart from running it (`CommandRunner`) so the
//! pipeline can be exercised without a cloud account.

use crate::{DeployError, DeployResult};
use std::fmt;
use std::process::Command;
use tracing::debug;

/// A program plus its arguments.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    secret_args: Vec<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret_args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a `KEY=VALUE` list whose values are masked when displayed.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Value following `flag`, e.g. `value_of("--region")`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Shell-like rendering with secrets masked, safe to log.
    pub fn display(&self) -> String {
        let mut rendered = vec![self.program.clone()];
        for (i, arg) in self.args.iter().enumerate() {
            let shown = if self.secret_args.contains(&i) {
                mask_assignments(arg)
            } else {
                arg.clone()
            };
            if shown.contains(' ') {
                rendered.push(format!("'{}'", shown));
            } else {
                rendered.push(shown);
            }
        }
        rendered.join(" ")
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandSpec({})", self.display())
    }
}

/// Replace every value in a gcloud `KEY=VALUE` list with `***`.
///
/// Understands the `^D^` alternate delimiter prefix.
fn mask_assignments(list: &str) -> String {
    let (prefix, delimiter, body) = match list.strip_prefix('^') {
        Some(rest) if rest.chars().nth(1) == Some('^') => {
            let delimiter = rest.chars().next().unwrap_or(',');
            let skip = delimiter.len_utf8() + 1;
            (
                format!("^{}^", delimiter),
                delimiter,
                &rest[skip..],
            )
        }
        _ => (String::new(), ',', list),
    };

    let masked: Vec<String> = body
        .split(delimiter)
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) => format!("{}=***", key),
            None => "***".to_string(),
        })
        .collect();

    format!("{}{}", prefix, masked.join(&delimiter.to_string()))
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs a command to completion.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> DeployResult<CommandOutput>;
}

/// Runs commands as child processes of this one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> DeployResult<CommandOutput> {
        debug!(command = %spec.display(), "Running command");

        let output = Command::new(&spec.program)
            .args(&spec.args)
            .output()
            .map_err(|e| DeployError::Spawn {
                command: spec.program.clone(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
