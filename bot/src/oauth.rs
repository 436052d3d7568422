//! OAuth 1.0a request signing (HMAC-SHA1), as required for user-context
//! calls to the Twitter API.

use crate::config::TwitterCredentials;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding: everything but `A-Z a-z 0-9 - . _ ~`.
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Per-request values that make a signature unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthNonce {
    pub nonce: String,
    pub timestamp: u64,
}

impl OAuthNonce {
    pub fn generate() -> Self {
        Self {
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        }
    }
}

fn oauth_params(credentials: &TwitterCredentials, nonce: &OAuthNonce) -> Vec<(String, String)> {
    vec![
        (
            "oauth_consumer_key".to_string(),
            credentials.consumer_key.clone(),
        ),
        ("oauth_nonce".to_string(), nonce.nonce.clone()),
        (
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        ),
        ("oauth_timestamp".to_string(), nonce.timestamp.to_string()),
        ("oauth_token".to_string(), credentials.access_token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ]
}

/// Signature base string: `METHOD&url&params`, each part percent-encoded.
///
/// `request_params` are query or form parameters; a JSON body contributes
/// nothing.
pub fn signature_base_string(
    method: &str,
    url: &str,
    oauth: &[(String, String)],
    request_params: &[(&str, &str)],
) -> String {
    let mut encoded: Vec<(String, String)> = oauth
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            request_params
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

pub fn sign(
    base_string: &str,
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, InvalidLength> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Full `Authorization` header value for one request.
pub fn authorization_header(
    method: &str,
    url: &str,
    credentials: &TwitterCredentials,
    request_params: &[(&str, &str)],
    nonce: &OAuthNonce,
) -> Result<String, InvalidLength> {
    let mut params = oauth_params(credentials, nonce);
    let base = signature_base_string(method, url, &params, request_params);
    let signature = sign(
        &base,
        &credentials.consumer_secret,
        &credentials.access_token_secret,
    )?;
    params.push(("oauth_signature".to_string(), signature));
    params.sort();

    let fields = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", fields))
}
