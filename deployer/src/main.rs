use clap::Parser;
use deployer::app;
use deployer::{DeployConfig, SystemRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deployer")]
#[command(about = "Deploy the tweetforge bot to Cloud Run and keep it warm")]
struct Cli {
    /// TOML file with deployment settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Cloud Run service name
    #[arg(long)]
    service: Option<String>,
    /// GCP project ID
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    project: Option<String>,
    /// Region for the service and the scheduler job
    #[arg(long)]
    region: Option<String>,
    /// Source directory to deploy
    #[arg(long)]
    source: Option<String>,
    /// Minimum number of warm instances
    #[arg(long)]
    min_instances: Option<u32>,
    /// Do not register the warm-keeper job
    #[arg(long)]
    no_warm_keeper: bool,
}

impl Cli {
    fn into_config(self) -> Result<DeployConfig, deployer::DeployError> {
        let mut config = match &self.config {
            Some(path) => DeployConfig::load(path)?,
            None => DeployConfig::default(),
        };

        if let Some(service) = self.service {
            config.service = service;
        }
        if let Some(project) = self.project {
            config.project = Some(project);
        }
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(min_instances) = self.min_instances {
            config.min_instances = min_instances;
        }
        if self.no_warm_keeper {
            config.warm_keeper.enabled = false;
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    match app::run(
        &config,
        &SystemRunner,
        |name| std::env::var(name).ok(),
        &mut out,
        &mut err,
    ) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
