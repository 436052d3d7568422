//! Topic and tweet generation on top of a chat model.

use model::{ChatMessage, ChatRequest, ModelError, ModelProvider, ModelResult};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

pub const MAX_TWEET_CHARS: usize = 280;
const ELLIPSIS: &str = "...";

fn topics_prompt(category: &str, count: usize) -> String {
    format!(
        "Generate exactly {count} engaging tweet topics related to {category}.\n\
         You must respond with only a JSON array of strings, nothing else.\n\
         \n\
         Example of expected format:\n\
         [\"Topic 1\", \"Topic 2\", \"Topic 3\"]"
    )
}

fn series_prompt(topic: &str, category: &str) -> String {
    format!(
        "Create an engaging tweet about: {topic}\n\
         Context: This is part of a series about {category}\n\
         \n\
         Requirements:\n\
         - Must be under 280 characters\n\
         - Should be engaging and natural\n\
         - Avoid hashtag spam\n\
         - Include relevant emojis when appropriate\n\
         - Should feel like part of a coherent social media strategy\n\
         - Can include relevant hashtags (max 2)"
    )
}

fn free_form_prompt(prompt: &str) -> String {
    format!(
        "Create a tweet based on this prompt: {prompt}\n\
         Requirements:\n\
         - Must be under 280 characters\n\
         - Aim for a tone that is witty, thought-provoking, and occasionally provocative\n\
         - Use concise language and avoid unnecessary filler\n\
         - Minimize the use of hashtags; focus on impactful ideas\n\
         - Incorporate relevant emojis to enhance the message where appropriate"
    )
}

/// Trim and enforce the tweet length limit, counted in characters.
pub fn fit_tweet(raw: &str) -> String {
    let tweet = raw.trim();
    if tweet.chars().count() <= MAX_TWEET_CHARS {
        return tweet.to_string();
    }
    let kept: String = tweet
        .chars()
        .take(MAX_TWEET_CHARS - ELLIPSIS.len())
        .collect();
    format!("{}{}", kept, ELLIPSIS)
}

/// Topics used when the model's answer cannot be parsed at all.
pub fn default_topics(category: &str) -> Vec<String> {
    vec![
        format!("{category} trends 2024"),
        format!("Latest developments in {category}"),
        format!("Future of {category}"),
        format!("How {category} is changing"),
        format!("{category} best practices"),
        format!("{category} tips and tricks"),
        format!("Understanding {category}"),
        format!("{category} innovations"),
        format!("{category} challenges"),
        format!("{category} opportunities"),
    ]
}

fn json_array_span() -> &'static Regex {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("static regex is valid"))
}

/// Turn a model answer into a topic list.
///
/// Accepts a bare JSON array, a JSON array embedded in prose, or one topic
/// per line. Unparseable JSON and empty results fall back to
/// [`default_topics`].
pub fn parse_topics(content: &str, count: usize, category: &str) -> Vec<String> {
    let content = content.trim();

    let json = if content.starts_with('[') {
        content
    } else if let Some(span) = json_array_span().find(content) {
        span.as_str()
    } else {
        let topics: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('[') && !line.starts_with(']'))
            .map(|line| {
                line.trim_matches(|c: char| c == '"' || c == '-' || c.is_whitespace())
                    .to_string()
            })
            .filter(|topic| !topic.is_empty())
            .take(count)
            .collect();
        if topics.is_empty() {
            warn!("Model returned no usable topics, using defaults");
            return default_topics(category);
        }
        return topics;
    };

    match serde_json::from_str::<Vec<String>>(json) {
        Ok(topics) => {
            let topics: Vec<String> = topics
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if topics.is_empty() {
                warn!("Model returned an empty topic array, using defaults");
                default_topics(category)
            } else {
                topics
            }
        }
        Err(e) => {
            error!("JSON parsing error: {}", e);
            error!("Raw content: {}", content);
            default_topics(category)
        }
    }
}

pub struct TweetGenerator {
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: f32,
}

impl TweetGenerator {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    async fn complete(&self, prompt: String) -> ModelResult<String> {
        let request = ChatRequest::new(&self.model, vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature);
        let response = self.provider.chat(request).await?;
        response
            .first_content()
            .map(str::to_string)
            .ok_or(ModelError::EmptyResponse)
    }

    pub async fn generate_topics(&self, category: &str, count: usize) -> ModelResult<Vec<String>> {
        let content = self.complete(topics_prompt(category, count)).await?;
        let topics = parse_topics(&content, count, category);
        info!("Generated {} topics for category: {}", topics.len(), category);
        Ok(topics)
    }

    /// Tweet about `topic` as one entry of a series on `category`.
    pub async fn generate_tweet(&self, topic: &str, category: &str) -> ModelResult<String> {
        let content = self.complete(series_prompt(topic, category)).await?;
        let tweet = fit_tweet(&content);
        if tweet.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(tweet)
    }

    /// Tweet from a free-form operator prompt.
    pub async fn compose_tweet(&self, prompt: &str) -> ModelResult<String> {
        let content = self.complete(free_form_prompt(prompt)).await?;
        let tweet = fit_tweet(&content);
        if tweet.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(tweet)
    }
}
