use bot::{TweetPoster, TwitterClient, TwitterCredentials, TwitterError};
use serde_json::json;
use wiremock::matchers::{body_json, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> TwitterCredentials {
    TwitterCredentials {
        consumer_key: "consumer-key".to_string(),
        consumer_secret: "consumer-secret".to_string(),
        access_token: "access-token".to_string(),
        access_token_secret: "access-secret".to_string(),
    }
}

async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"title": "nope"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_post_tweet_signs_and_sends_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header_regex("authorization", r#"^OAuth oauth_consumer_key="consumer-key", oauth_nonce="[0-9a-f]+", oauth_signature="[^"]+", oauth_signature_method="HMAC-SHA1", oauth_timestamp="\d+", oauth_token="access-token", oauth_version="1.0"$"#))
        .and(body_json(json!({"text": "Hello from the bot"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "1445880548472328192", "text": "Hello from the bot"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TwitterClient::new(credentials(), server.uri()).unwrap();
    let posted = client.post_tweet("Hello from the bot").await.unwrap();

    assert_eq!(posted.id, "1445880548472328192");
    assert_eq!(posted.text, "Hello from the bot");
}

#[tokio::test]
async fn test_rate_limit_status() {
    let server = MockServer::start().await;
    mount_status(&server, 429).await;

    let client = TwitterClient::new(credentials(), server.uri()).unwrap();
    let result = client.post_tweet("hi").await;
    assert!(matches!(result, Err(TwitterError::RateLimited)));
}

#[tokio::test]
async fn test_unauthorized_status() {
    let server = MockServer::start().await;
    mount_status(&server, 401).await;

    let client = TwitterClient::new(credentials(), server.uri()).unwrap();
    match client.post_tweet("hi").await {
        Err(TwitterError::Authentication { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("nope"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_other_status_is_api_error() {
    let server = MockServer::start().await;
    mount_status(&server, 500).await;

    let client = TwitterClient::new(credentials(), server.uri()).unwrap();
    let result = client.post_tweet("hi").await;
    assert!(matches!(result, Err(TwitterError::Api { status: 500, .. })));
}
