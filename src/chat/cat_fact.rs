//! Cat fact reply generator.
//!
//! Pulls a random fact from the public cat-facts API. The chat flow never
//! fails because of this service: every upstream failure degrades to
//! [`CAT_FACT_FALLBACK`].

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Public endpoint returning one random fact.
pub const DEFAULT_CAT_FACT_URL: &str = "https://cat-fact.herokuapp.com/facts/random";

/// Reply used whenever the upstream call fails.
pub const CAT_FACT_FALLBACK: &str = "Failed to fetch a cat fact. Please try again later.";

/// Errors raised while talking to the cat-facts API.
#[derive(Debug, Error)]
pub enum CatFactError {
    /// Transport or body decoding failure.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("cat fact API returned status: {0}")]
    Status(reqwest::StatusCode),

    /// The configured endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Subset of the upstream payload we read.
#[derive(Debug, Deserialize)]
struct CatFact {
    text: String,
}

/// HTTP client for the cat-facts API.
#[derive(Clone, Debug)]
pub struct CatFactClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl CatFactClient {
    /// Create a client for `endpoint` with a per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CatFactError> {
        let endpoint = Url::parse(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("echo-chat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Fetch a fact, or [`CAT_FACT_FALLBACK`] if anything goes wrong.
    pub async fn random_fact(&self) -> String {
        match self.fetch().await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, endpoint = %self.endpoint, "cat fact unavailable");
                CAT_FACT_FALLBACK.to_string()
            }
        }
    }

    /// Fetch a fact, surfacing upstream failures.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-2xx status or malformed JSON.
    pub async fn fetch(&self) -> Result<String, CatFactError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatFactError::Status(response.status()));
        }

        let fact: CatFact = response.json().await?;
        Ok(fact.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};

    async fn stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/facts/random")
    }

    fn client(url: &str) -> CatFactClient {
        CatFactClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_returns_upstream_text() {
        let url = stub(Router::new().route(
            "/facts/random",
            get(|| async {
                Json(serde_json::json!({
                    "_id": "58e008800aac31001185ed05",
                    "text": "Cats sleep 70% of their lives.",
                    "type": "cat",
                    "upvotes": 5,
                    "userUpvoted": null
                }))
            }),
        ))
        .await;

        assert_eq!(client(&url).random_fact().await, "Cats sleep 70% of their lives.");
    }

    #[tokio::test]
    async fn test_falls_back_on_error_status() {
        let url = stub(Router::new().route(
            "/facts/random",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        let client = client(&url);
        assert!(matches!(
            client.fetch().await,
            Err(CatFactError::Status(status)) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(client.random_fact().await, CAT_FACT_FALLBACK);
    }

    #[tokio::test]
    async fn test_falls_back_on_invalid_json() {
        let url = stub(Router::new().route("/facts/random", get(|| async { "not json" }))).await;
        assert_eq!(client(&url).random_fact().await, CAT_FACT_FALLBACK);
    }

    #[tokio::test]
    async fn test_falls_back_when_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/facts/random");
        assert_eq!(client(&url).random_fact().await, CAT_FACT_FALLBACK);
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let result = CatFactClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(CatFactError::InvalidUrl(_))));
    }
}
