use deployer::app::{self, EXIT_FAILURE, EXIT_SUCCESS};
use deployer::{
    CommandOutput, CommandRunner, CommandSpec, DeployConfig, DeployError, DeployResult,
    Deployment, WarmKeeperStatus, REQUIRED_CREDENTIALS,
};
use std::cell::RefCell;
use std::collections::HashMap;

const URL: &str = "https://example.run.app";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Deploy,
    Describe,
    Register,
}

fn classify(spec: &CommandSpec) -> Step {
    match spec.args.first().map(String::as_str) {
        Some("scheduler") => Step::Register,
        _ if spec.args.get(1).map(String::as_str) == Some("deploy") => Step::Deploy,
        _ => Step::Describe,
    }
}

/// Records every command and answers from a per-step script.
struct RecordingRunner {
    calls: RefCell<Vec<CommandSpec>>,
    deploy: CommandOutput,
    describe: CommandOutput,
    register: CommandOutput,
}

impl RecordingRunner {
    fn succeeding() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            deploy: CommandOutput::ok("Service [twitter-bot] revision deployed"),
            describe: CommandOutput::ok(format!("{}\n", URL)),
            register: CommandOutput::ok(""),
        }
    }

    fn calls_for(&self, step: Step) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|spec| classify(spec) == step)
            .cloned()
            .collect()
    }

    fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> DeployResult<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        Ok(match classify(spec) {
            Step::Deploy => self.deploy.clone(),
            Step::Describe => self.describe.clone(),
            Step::Register => self.register.clone(),
        })
    }
}

fn placeholder_env() -> HashMap<String, String> {
    REQUIRED_CREDENTIALS
        .iter()
        .map(|name| (name.to_string(), format!("placeholder-{}", name.to_lowercase())))
        .collect()
}

fn run_app(runner: &RecordingRunner, env: &HashMap<String, String>) -> (u8, String, String) {
    run_app_with(&DeployConfig::default(), runner, env)
}

fn run_app_with(
    config: &DeployConfig,
    runner: &RecordingRunner,
    env: &HashMap<String, String>,
) -> (u8, String, String) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = app::run(
        config,
        runner,
        |name| env.get(name).cloned(),
        &mut out,
        &mut err,
    )
    .expect("writing to buffers");
    (
        code,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

#[test]
fn test_missing_credential_stops_before_any_command() {
    for name in REQUIRED_CREDENTIALS {
        let mut env = placeholder_env();
        env.remove(name);

        let runner = RecordingRunner::succeeding();
        let (code, out, err) = run_app(&runner, &env);

        assert_eq!(code, EXIT_FAILURE);
        assert!(err.contains(name), "error should name {name}: {err}");
        assert!(out.is_empty());
        assert_eq!(runner.total_calls(), 0);
    }
}

#[test]
fn test_empty_credential_is_missing() {
    let mut env = placeholder_env();
    env.insert("TWITTER_ACCESS_TOKEN_SECRET".to_string(), String::new());

    let runner = RecordingRunner::succeeding();
    let (code, _, err) = run_app(&runner, &env);

    assert_eq!(code, EXIT_FAILURE);
    assert!(err.contains("TWITTER_ACCESS_TOKEN_SECRET"));
    assert_eq!(runner.total_calls(), 0);
}

#[test]
fn test_whitespace_credential_still_deploys() {
    let mut env = placeholder_env();
    env.insert("TWITTER_CONSUMER_SECRET".to_string(), " ".to_string());

    let runner = RecordingRunner::succeeding();
    let (code, out, _) = run_app(&runner, &env);

    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(runner.calls_for(Step::Deploy).len(), 1);
    assert!(out.contains(URL));
}

#[test]
fn test_secret_with_comma_and_at_sign_deploys() {
    let mut env = placeholder_env();
    env.insert("TWITTER_ACCESS_TOKEN_SECRET".to_string(), "a,b@c".to_string());

    let runner = RecordingRunner::succeeding();
    let (code, _, err) = run_app(&runner, &env);

    assert_eq!(code, EXIT_SUCCESS, "{err}");
    let deploys = runner.calls_for(Step::Deploy);
    assert_eq!(deploys.len(), 1);
    let assignment = deploys[0].value_of("--set-env-vars").unwrap();
    assert!(assignment.starts_with("^|^"));
    assert!(assignment.contains("|TWITTER_ACCESS_TOKEN_SECRET=a,b@c"));
    assert!(!deploys[0].display().contains("a,b@c"));
}

#[test]
fn test_deploy_runs_once_with_all_credentials() {
    let env = placeholder_env();
    let runner = RecordingRunner::succeeding();
    let (code, _, _) = run_app(&runner, &env);

    assert_eq!(code, EXIT_SUCCESS);
    let deploys = runner.calls_for(Step::Deploy);
    assert_eq!(deploys.len(), 1);

    let assignment = deploys[0].value_of("--set-env-vars").expect("env vars");
    for name in REQUIRED_CREDENTIALS {
        let expected = format!("{}=placeholder-{}", name, name.to_lowercase());
        assert!(assignment.contains(&expected), "{expected} not in deploy env");
    }
}

#[test]
fn test_deploy_failure_skips_registration() {
    let env = placeholder_env();
    let runner = RecordingRunner {
        deploy: CommandOutput::failed(1, "ERROR: build failed"),
        ..RecordingRunner::succeeding()
    };
    let (code, out, err) = run_app(&runner, &env);

    assert_eq!(code, EXIT_FAILURE);
    assert!(err.contains("Deployment failed"));
    assert!(err.contains("build failed"));
    assert!(!out.contains("Service URL"));
    assert!(runner.calls_for(Step::Describe).is_empty());
    assert!(runner.calls_for(Step::Register).is_empty());
}

#[test]
fn test_url_is_queried_once_and_used_verbatim() {
    let env = placeholder_env();
    let runner = RecordingRunner::succeeding();
    let (code, _, _) = run_app(&runner, &env);

    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(runner.calls_for(Step::Describe).len(), 1);

    let registrations = runner.calls_for(Step::Register);
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].value_of("--uri"), Some(URL));
    assert_eq!(registrations[0].value_of("--http-method"), Some("GET"));
}

#[test]
fn test_commands_run_in_order() {
    let env = placeholder_env();
    let runner = RecordingRunner::succeeding();
    run_app(&runner, &env);

    let order: Vec<Step> = runner.calls.borrow().iter().map(classify).collect();
    assert_eq!(order, vec![Step::Deploy, Step::Describe, Step::Register]);
}

#[test]
fn test_existing_job_still_succeeds_and_prints_url() {
    let env = placeholder_env();
    let runner = RecordingRunner {
        register: CommandOutput::failed(
            1,
            "ERROR: (gcloud.scheduler.jobs.create.http) ALREADY_EXISTS: Job already exists.",
        ),
        ..RecordingRunner::succeeding()
    };
    let (code, out, err) = run_app(&runner, &env);

    assert_eq!(code, EXIT_SUCCESS);
    assert!(out.contains("Deployment successful"));
    assert!(out.contains(URL));
    assert!(out.contains("already exists"));
    assert!(err.is_empty());
}

#[test]
fn test_other_registration_failure_is_not_fatal() {
    let env = placeholder_env();
    let runner = RecordingRunner {
        register: CommandOutput::failed(1, "PERMISSION_DENIED"),
        ..RecordingRunner::succeeding()
    };
    let (code, out, _) = run_app(&runner, &env);

    assert_eq!(code, EXIT_SUCCESS);
    assert!(out.contains(URL));
    assert!(out.contains("PERMISSION_DENIED"));
}

#[test]
fn test_describe_failure_is_fatal() {
    let env = placeholder_env();
    let runner = RecordingRunner {
        describe: CommandOutput::failed(1, "NOT_FOUND"),
        ..RecordingRunner::succeeding()
    };
    let (code, _, err) = run_app(&runner, &env);

    assert_eq!(code, EXIT_FAILURE);
    assert!(err.contains("NOT_FOUND"));
    assert!(runner.calls_for(Step::Register).is_empty());
}

#[test]
fn test_empty_url_is_fatal() {
    let runner = RecordingRunner {
        describe: CommandOutput::ok("\n"),
        ..RecordingRunner::succeeding()
    };
    let config = DeployConfig::default();
    let credentials =
        deployer::validate_credentials(|name| placeholder_env().get(name).cloned()).unwrap();

    let result = Deployment::new(&runner, &config).run(&credentials);
    assert!(matches!(result, Err(DeployError::MissingServiceUrl { .. })));
}

#[test]
fn test_disabled_warm_keeper_is_skipped() {
    let runner = RecordingRunner::succeeding();
    let mut config = DeployConfig::default();
    config.warm_keeper.enabled = false;
    let credentials =
        deployer::validate_credentials(|name| placeholder_env().get(name).cloned()).unwrap();

    let report = Deployment::new(&runner, &config).run(&credentials).unwrap();
    assert_eq!(report.service_url, URL);
    assert_eq!(report.warm_keeper, WarmKeeperStatus::Skipped);
    assert!(runner.calls_for(Step::Register).is_empty());
}

#[test]
fn test_forwarded_env_reaches_deploy() {
    let mut env = placeholder_env();
    env.insert("BOT_CATEGORY".to_string(), "rust tips".to_string());

    let runner = RecordingRunner::succeeding();
    run_app(&runner, &env);

    let deploys = runner.calls_for(Step::Deploy);
    let assignment = deploys[0].value_of("--set-env-vars").unwrap();
    assert!(assignment.contains("BOT_CATEGORY=rust tips"));
    assert!(!assignment.contains("OPENAI_MODEL"));
}

#[test]
fn test_invalid_config_fails_before_deploy() {
    let runner = RecordingRunner::succeeding();
    let config = DeployConfig {
        port: 0,
        ..DeployConfig::default()
    };
    let credentials =
        deployer::validate_credentials(|name| placeholder_env().get(name).cloned()).unwrap();

    let result = Deployment::new(&runner, &config).run(&credentials);
    assert!(matches!(result, Err(DeployError::InvalidConfig(_))));
    assert_eq!(runner.total_calls(), 0);
}

#[test]
fn test_forwarding_a_credential_does_not_duplicate_it() {
    let config = DeployConfig {
        forward_env: vec![
            "OPENAI_API_KEY".to_string(),
            "BOT_CATEGORY".to_string(),
            "BOT_CATEGORY".to_string(),
        ],
        ..DeployConfig::default()
    };
    let mut env = placeholder_env();
    env.insert("BOT_CATEGORY".to_string(), "rust".to_string());

    let runner = RecordingRunner::succeeding();
    let (code, _, _) = run_app_with(&config, &runner, &env);

    assert_eq!(code, EXIT_SUCCESS);
    let deploys = runner.calls_for(Step::Deploy);
    let assignment = deploys[0].value_of("--set-env-vars").unwrap();
    assert_eq!(assignment.matches("OPENAI_API_KEY=").count(), 1);
    assert_eq!(assignment.matches("BOT_CATEGORY=").count(), 1);
}
