//! Thin HTTP client used for every download.
//!
//! Wraps a `reqwest::Client` configured with the desktop-browser User-Agent and
//! the per-request timeout, and maps transport failures onto
//! [`OfflinerError::Timeout`], [`OfflinerError::Http`] and [`OfflinerError::Network`].

use reqwest::{Client, Response};
use tracing::debug;

use offliner_shared::{FetchConfig, OfflinerError, Result};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// GET helper shared by the fetch cache and the font resolver. No retries.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client from the `[fetch]` config section.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout())
            .build()
            .map_err(|e| OfflinerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET a URL and return the raw body.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(url).await?;
        let body = response.bytes().await.map_err(|e| map_error(url, e))?;
        debug!(url, bytes = body.len(), "response body read");
        Ok(body.to_vec())
    }

    /// GET a URL and decode the body as text (charset from `Content-Type`, UTF-8 otherwise).
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url).await?;
        response.text().await.map_err(|e| map_error(url, e))
    }

    async fn send(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OfflinerError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn map_error(url: &str, err: reqwest::Error) -> OfflinerError {
    if err.is_timeout() {
        OfflinerError::Timeout(url.to_string())
    } else {
        OfflinerError::Network(format!("{url}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(timeout_secs: u64) -> HttpClient {
        HttpClient::new(&FetchConfig {
            timeout_secs,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_browser_user_agent() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/ua"))
            .and(wiremock::matchers::header(
                "user-agent",
                offliner_shared::DEFAULT_USER_AGENT,
            ))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(5)
            .get_text(&format!("{}/ua", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/missing.png"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing.png", server.uri());
        let err = client(5).get_bytes(&url).await.unwrap_err();
        match err {
            OfflinerError::Http { url: failed, status } => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_is_timeout_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/slow"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = client(1)
            .get_bytes(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, OfflinerError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Port 9 (discard) is essentially never listening on test machines.
        let err = client(2)
            .get_bytes("http://127.0.0.1:9/nothing")
            .await
            .unwrap_err();
        assert!(err.is_network());
    }
}
