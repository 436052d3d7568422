use bot::config::BotConfig;
use bot::{Bot, BotError, TickOutcome, TweetGenerator, TwitterClient, TwitterError};
use model::{ModelError, ModelProvider, OpenAiProvider};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn config_for(openai: &MockServer, twitter: &MockServer) -> BotConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("OPENAI_API_KEY", "sk-test".to_string()),
        ("TWITTER_CONSUMER_KEY", "ck".to_string()),
        ("TWITTER_CONSUMER_SECRET", "cs".to_string()),
        ("TWITTER_ACCESS_TOKEN", "at".to_string()),
        ("TWITTER_ACCESS_TOKEN_SECRET", "ats".to_string()),
        ("OPENAI_BASE_URL", openai.uri()),
        ("TWITTER_API_BASE", twitter.uri()),
        ("BOT_CATEGORY", "cooking".to_string()),
    ]);
    BotConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

fn build_bot(config: &BotConfig) -> Bot {
    let provider: Arc<dyn ModelProvider> =
        Arc::new(OpenAiProvider::new(config.openai_config()).unwrap());
    let generator = TweetGenerator::new(provider, config.model.clone(), config.temperature);
    let poster = TwitterClient::new(config.twitter.clone(), config.twitter_api_base.clone()).unwrap();
    Bot::new(
        generator,
        Box::new(poster),
        config.category.clone(),
        config.schedule.clone(),
    )
}

#[tokio::test]
async fn test_tick_generates_and_posts_through_both_apis() {
    let openai = MockServer::start().await;
    let twitter = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("engaging tweet topics related to cooking"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"["Knife skills", "Stock from scraps"]"#)),
        )
        .expect(1)
        .mount(&openai)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Create an engaging tweet about: Knife skills"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("  Sharp knives are safer knives 🔪 ")),
        )
        .expect(1)
        .mount(&openai)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(body_partial_json(json!({"text": "Sharp knives are safer knives 🔪"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "42", "text": "Sharp knives are safer knives 🔪"}
        })))
        .expect(1)
        .mount(&twitter)
        .await;

    let config = config_for(&openai, &twitter);
    let mut bot = build_bot(&config);

    match bot.tick().await.unwrap() {
        TickOutcome::Posted { topic, tweet } => {
            assert_eq!(topic, "Knife skills");
            assert_eq!(tweet.id, "42");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(bot.pending_topics().collect::<Vec<_>>(), vec!["Stock from scraps"]);
    assert_eq!(bot.rate_limiter().count(), 1);
}

#[tokio::test]
async fn test_twitter_rate_limit_surfaces_as_error_and_keeps_topic() {
    let openai = MockServer::start().await;
    let twitter = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("engaging tweet topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"["Only topic"]"#)))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Create an engaging tweet about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("A tweet")))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&twitter)
        .await;

    let config = config_for(&openai, &twitter);
    let mut bot = build_bot(&config);

    let result = bot.tick().await;
    assert!(matches!(
        result,
        Err(BotError::Twitter(TwitterError::RateLimited))
    ));
    assert_eq!(bot.pending_topics().collect::<Vec<_>>(), vec!["Only topic"]);
    assert_eq!(bot.rate_limiter().count(), 0);
}

#[tokio::test]
async fn test_model_failure_is_reported() {
    let openai = MockServer::start().await;
    let twitter = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&twitter)
        .await;

    let config = config_for(&openai, &twitter);
    let mut bot = build_bot(&config);

    let result = bot.tick().await;
    assert!(matches!(
        result,
        Err(BotError::Model(ModelError::Authentication))
    ));
}
