//! Operator input typed on stdin: loop commands and tweet prompts.

use crate::generator::TweetGenerator;
use crate::rate_limit::RateLimiter;
use crate::runner::BotCommand;
use crate::twitter::TweetPoster;
use chrono::Utc;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Read operator commands from `reader` and forward them to the loop.
///
/// `change category` asks for the new category on the next non-empty line,
/// `quit` stops the loop. Returns when the input ends, `quit` is read or the
/// loop has gone away.
pub async fn forward_commands<R>(reader: R, commands: mpsc::Sender<BotCommand>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut awaiting_category = false;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read operator input: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = if awaiting_category {
            awaiting_category = false;
            BotCommand::ChangeCategory(line.to_string())
        } else {
            match line.to_lowercase().as_str() {
                "change category" => {
                    println!("Enter new category:");
                    awaiting_category = true;
                    continue;
                }
                "quit" => BotCommand::Quit,
                other => {
                    info!("Ignoring unknown command: {}", other);
                    continue;
                }
            }
        };

        let quit = command == BotCommand::Quit;
        if commands.send(command).await.is_err() || quit {
            break;
        }
    }
}

/// Compose one tweet per prompt line until `quit`, `exit` or end of input.
///
/// Each tweet is posted through `poster`, or only printed when `poster` is
/// `None`. Failures are logged and the session moves on to the next prompt.
/// The session ends early once `limiter` refuses another post. Returns how
/// many tweets were posted or, without a poster, composed.
pub async fn prompt_session<R>(
    reader: R,
    generator: &TweetGenerator,
    poster: Option<&dyn TweetPoster>,
    limiter: &mut RateLimiter,
) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut published = 0;

    loop {
        if !limiter.check(Utc::now()) {
            println!("Monthly tweet limit reached, stopping.");
            break;
        }

        print!("Enter a prompt for the tweet (or 'quit' to exit): ");
        std::io::stdout().flush().ok();

        let prompt = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read operator input: {}", e);
                break;
            }
        };
        let prompt = prompt.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("quit") || prompt.eq_ignore_ascii_case("exit") {
            info!("Prompt session ended by user");
            break;
        }

        let tweet = match generator.compose_tweet(prompt).await {
            Ok(tweet) => tweet,
            Err(e) => {
                error!("An error occurred: {}", e);
                continue;
            }
        };
        println!("Generated tweet: {}", tweet);

        let Some(poster) = poster else {
            published += 1;
            continue;
        };
        match poster.post_tweet(&tweet).await {
            Ok(posted) => {
                limiter.record(Utc::now());
                published += 1;
                println!("Posted tweet {}", posted.id);
            }
            Err(e) => error!("An error occurred: {}", e),
        }
    }

    published
}
