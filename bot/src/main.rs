use bot::config::BotConfig;
use bot::console;
use bot::server;
use bot::{Bot, RateLimiter, TweetGenerator, TweetPoster, TwitterClient, TwitterError};
use clap::{Parser, Subcommand};
use model::prelude::*;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bot")]
#[command(about = "Generate and post themed tweets with a language model")]
struct Cli {
    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP endpoints and run the posting loop
    Serve,
    /// Run the posting loop in the foreground
    Run {
        /// Theme for the tweets (defaults to BOT_CATEGORY)
        #[arg(short, long)]
        category: Option<String>,
        /// Accept `change category` and `quit` on stdin
        #[arg(short, long)]
        interactive: bool,
    },
    /// Compose a tweet from a prompt and post it (asks for prompts on stdin when none is given)
    Tweet {
        #[arg(short, long)]
        prompt: Option<String>,
        /// Print the tweet without posting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print generated topics for a category
    Topics {
        #[arg(short, long)]
        category: String,
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },
    /// Health check
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiProvider::new(config.openai_config())?);
    let generator = TweetGenerator::new(provider.clone(), config.model.clone(), config.temperature);

    match cli.command {
        Commands::Serve => serve(config, generator).await?,
        Commands::Run {
            category,
            interactive,
        } => run_loop(config, generator, category, interactive).await?,
        Commands::Tweet {
            prompt: Some(prompt),
            dry_run,
        } => single_tweet(&config, &generator, &prompt, dry_run).await?,
        Commands::Tweet {
            prompt: None,
            dry_run,
        } => prompt_loop(&config, &generator, dry_run).await?,
        Commands::Topics { category, count } => {
            let topics = generator.generate_topics(&category, count).await?;
            println!("Topics for {}:", category);
            for topic in topics {
                println!("  - {}", topic);
            }
        }
        Commands::Health => health_check(provider.as_ref()).await?,
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn build_bot(
    config: &BotConfig,
    generator: TweetGenerator,
    category: String,
) -> Result<Bot, TwitterError> {
    let poster = TwitterClient::new(config.twitter.clone(), config.twitter_api_base.clone())?;
    Ok(Bot::new(
        generator,
        Box::new(poster),
        category,
        config.schedule.clone(),
    ))
}

fn cancel_on_shutdown_signal() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping");
        cancel_on_signal.cancel();
    });
    cancel
}

async fn serve(
    config: BotConfig,
    generator: TweetGenerator,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = cancel_on_shutdown_signal();
    let mut bot = build_bot(&config, generator, config.category.clone())?;

    let server = {
        let cancel = cancel.clone();
        let port = config.port;
        tokio::spawn(async move {
            let result = server::serve(port, cancel.clone()).await;
            if let Err(e) = &result {
                error!(error = %e, "HTTP server failed");
                cancel.cancel();
            }
            result
        })
    };

    bot.run(cancel.clone(), None).await;
    cancel.cancel();
    server.await??;

    info!("Shutdown complete");
    Ok(())
}

async fn run_loop(
    config: BotConfig,
    generator: TweetGenerator,
    category: Option<String>,
    interactive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let category = match category {
        Some(category) => category,
        None if interactive => ask_category(&config.category)?,
        None => config.category.clone(),
    };

    let cancel = cancel_on_shutdown_signal();
    let mut bot = build_bot(&config, generator, category)?;

    let commands = if interactive {
        let (tx, rx) = mpsc::channel(8);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        tokio::spawn(console::forward_commands(stdin, tx));
        println!("Type 'change category' to switch themes or 'quit' to stop.");
        Some(rx)
    } else {
        None
    };

    bot.run(cancel, commands).await;
    Ok(())
}

fn ask_category(fallback: &str) -> io::Result<String> {
    print!(
        "Enter a category or theme for your tweets (e.g., 'AI technology', 'fitness tips', 'cooking'): "
    );
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(if input.is_empty() {
        fallback.to_string()
    } else {
        input.to_string()
    })
}

async fn single_tweet(
    config: &BotConfig,
    generator: &TweetGenerator,
    prompt: &str,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let tweet = generator.compose_tweet(prompt).await?;
    println!("Generated tweet: {}", tweet);

    if dry_run {
        return Ok(());
    }

    let client = TwitterClient::new(config.twitter.clone(), config.twitter_api_base.clone())?;
    let posted = client.post_tweet(&tweet).await?;
    println!("Posted tweet {}", posted.id);
    Ok(())
}

async fn prompt_loop(
    config: &BotConfig,
    generator: &TweetGenerator,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = if dry_run {
        None
    } else {
        Some(TwitterClient::new(
            config.twitter.clone(),
            config.twitter_api_base.clone(),
        )?)
    };
    let poster = client.as_ref().map(|c| c as &dyn TweetPoster);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut limiter = RateLimiter::default();
    let published = console::prompt_session(stdin, generator, poster, &mut limiter).await;
    info!("Prompt session finished after {} tweets", published);
    Ok(())
}

async fn health_check(provider: &dyn ModelProvider) -> Result<(), Box<dyn std::error::Error>> {
    println!("Performing health check...");

    match provider.health_check().await {
        Ok(()) => {
            println!(
                "✓ Health check passed. {} is reachable.",
                provider.provider_name()
            );
            info!("Health check successful");
        }
        Err(e) => {
            println!("✗ Health check failed: {}", e);
            error!("Health check failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
