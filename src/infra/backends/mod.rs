//! HTTP clients for the remote cache backends.

mod cdn;
mod edge;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error;
use url::Url;

pub use cdn::{InvalidationBatch, InvalidationPaths, PatternInvalidationClient};
pub use edge::{PrefixPurgeClient, PurgePayload};

use super::error::InfraError;

const ERROR_SNIPPET_CHARS: usize = 256;

pub fn user_agent() -> &'static str {
    concat!("freshline/", env!("CARGO_PKG_VERSION"))
}

/// Build the client shared by every backend.
pub fn build_http_client() -> Result<Client, InfraError> {
    Client::builder()
        .user_agent(user_agent())
        .build()
        .map_err(|err| InfraError::http_client(err.to_string()))
}

/// Append path segments to `base`, percent-encoding each one so an id can
/// never escape its segment.
fn api_url(base: &Url, segments: &[&str]) -> Result<Url, url::ParseError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Debug)]
struct Exchange {
    status: StatusCode,
    body: String,
}

#[derive(Debug, Error)]
enum ExchangeError {
    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ExchangeError {
    fn status(&self) -> Option<u16> {
        match self {
            ExchangeError::Timeout(_) => None,
            ExchangeError::Transport(err) => err.status().map(|status| status.as_u16()),
        }
    }
}

/// Send `request` and read the full body, all under one deadline.
///
/// Dropping the future on timeout aborts the in-flight connection.
async fn exchange(request: RequestBuilder, deadline: Duration) -> Result<Exchange, ExchangeError> {
    let call = async {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>(Exchange { status, body })
    };

    match tokio::time::timeout(deadline, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ExchangeError::Timeout(deadline)),
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

fn non_success_message(backend: &str, status: StatusCode, body: &str) -> String {
    let body = snippet(body);
    if body.is_empty() {
        format!("{backend} returned HTTP {}", status.as_u16())
    } else {
        format!("{backend} returned HTTP {}: {body}", status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_version() {
        assert!(user_agent().starts_with("freshline/"));
        assert!(build_http_client().is_ok());
    }

    #[test]
    fn api_url_encodes_reserved_characters_in_segments() {
        let base = Url::parse("https://api.example.test/v4/").expect("base");
        assert_eq!(
            api_url(&base, &["zones", "a/b?c#d", "purge_cache"])
                .expect("url")
                .as_str(),
            "https://api.example.test/v4/zones/a%2Fb%3Fc%23d/purge_cache"
        );

        let opaque = Url::parse("mailto:ops@example.test").expect("opaque");
        assert!(api_url(&opaque, &["zones"]).is_err());
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(ERROR_SNIPPET_CHARS + 10);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), ERROR_SNIPPET_CHARS + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(snippet("  short  "), "short");
    }

    #[test]
    fn non_success_message_includes_status() {
        assert_eq!(
            non_success_message("edge purge", StatusCode::BAD_GATEWAY, ""),
            "edge purge returned HTTP 502"
        );
        assert_eq!(
            non_success_message("cdn invalidation", StatusCode::FORBIDDEN, "{\"error\":\"denied\"}"),
            "cdn invalidation returned HTTP 403: {\"error\":\"denied\"}"
        );
    }
}
