//! HTTP access to the keeper server

use std::time::Duration;

use keeper_common::resilience::repeater::Context;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;

/// Client download information served at `GET /client`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Download route template, e.g. `/client/{os}`
    pub path: String,
    /// Example download URL
    pub example: String,
    /// Operating systems with a published client build
    pub os: Vec<String>,
}

/// Thin wrapper over `reqwest` bound to one server address.
#[derive(Debug, Clone)]
pub struct ServerClient {
    client: ReqwestClient,
    base_url: String,
}

impl ServerClient {
    /// Start configuring a client for `base_url` (`http://host:port`).
    pub fn builder(base_url: impl Into<String>) -> ServerClientBuilder {
        ServerClientBuilder::new(base_url)
    }

    /// Client with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder(base_url).build()
    }

    /// Server address without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch [`ClientInfo`]; the request is abandoned as soon as `ctx` ends.
    pub async fn client_info(&self, ctx: &Context) -> Result<ClientInfo, ClientError> {
        let url = format!("{}/client", self.base_url);

        let fetch = async {
            debug!(%url, "requesting client info");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|source| ClientError::Network { url: url.clone(), source })?;

            let status = response.status();
            debug!(%url, %status, "received response");

            if !status.is_success() {
                return Err(ClientError::Status { status: status.as_u16(), url: url.clone() });
            }

            response
                .json::<ClientInfo>()
                .await
                .map_err(|source| ClientError::Decode { url: url.clone(), source })
        };

        tokio::select! {
            biased;
            _ = ctx.done() => Err(ClientError::Cancelled),
            result = fetch => result,
        }
    }
}

/// Builder for [`ServerClient`].
#[derive(Debug)]
pub struct ServerClientBuilder {
    base_url: String,
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: Option<String>,
}

impl ServerClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            user_agent: None,
        }
    }

    /// Upper bound for a whole request, independent of retry budgets.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upper bound for establishing the TCP connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the default `keeper-client/<version>` agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the underlying `reqwest` client.
    pub fn build(self) -> Result<ServerClient, ClientError> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("keeper-client/{}", env!("CARGO_PKG_VERSION")));

        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(user_agent)
            .no_proxy()
            .build()
            .map_err(ClientError::Build)?;

        Ok(ServerClient { client, base_url: self.base_url.trim_end_matches('/').to_string() })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sample_info() -> ClientInfo {
        ClientInfo {
            path: "/client/{os}".to_string(),
            example: "http://localhost:8080/client/linux".to_string(),
            os: vec!["linux".to_string(), "macos".to_string(), "windows".to_string()],
        }
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = ServerClient::new("http://localhost:8080/").expect("http client");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_client_info_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_info()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServerClient::new(server.uri()).expect("http client");
        let info = client.client_info(&Context::background()).await.expect("client info");

        assert_eq!(info, sample_info());
    }

    /// Validates mapping of non-success statuses and malformed bodies.
    ///
    /// Assertions:
    /// - Confirms a 503 becomes `ClientError::Status { status: 503, .. }`.
    /// - Confirms invalid JSON becomes `ClientError::Decode`.
    #[tokio::test]
    async fn test_error_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ServerClient::new(server.uri()).expect("http client");
        let ctx = Context::background();

        let err = client.client_info(&ctx).await.unwrap_err();
        assert_eq!(err.status(), Some(503));

        let err = client.client_info(&ctx).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_network_failure_is_reported() {
        // Nothing listens on port 9 (discard) on test machines.
        let client = ServerClient::builder("http://127.0.0.1:9")
            .connect_timeout(Duration::from_millis(200))
            .build()
            .expect("http client");

        let err = client.client_info(&Context::background()).await.unwrap_err();
        assert!(matches!(err, ClientError::Network { .. }));
    }

    /// Validates the builder's request settings reach the wire.
    ///
    /// Assertions:
    /// - Ensures a custom user agent is sent.
    /// - Ensures the request timeout turns a stalled server into a
    ///   retryable `Network` error.
    #[tokio::test]
    async fn test_builder_user_agent_and_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/client"))
            .and(header("user-agent", "keeper-tests/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_info()))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_info())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = ServerClient::builder(server.uri())
            .user_agent("keeper-tests/1.0")
            .timeout(Duration::from_millis(100))
            .build()
            .expect("http client");
        let ctx = Context::background();

        assert_eq!(client.client_info(&ctx).await.expect("client info"), sample_info());

        let err = client.client_info(&ctx).await.unwrap_err();
        assert!(matches!(err, ClientError::Network { .. }), "{err}");
        assert!(keeper_common::ErrorClassification::is_retryable(&err));
    }

    #[tokio::test]
    async fn test_context_end_abandons_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_info())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = ServerClient::new(server.uri()).expect("http client");
        let ctx = Context::background().with_timeout(Duration::from_millis(50));

        let err = client.client_info(&ctx).await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }
}
