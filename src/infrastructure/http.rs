use crate::domain::ports::{ConditionsUpstream, UpstreamRequest, UpstreamResponse};
use crate::error::{ConditionsError, Result};
use async_trait::async_trait;

/// `ConditionsUpstream` over HTTP: one `POST` per attempt.
///
/// The per-attempt deadline is enforced by `ResilientClient`, so the reqwest
/// client carries no timeout of its own.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUpstream {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConditionsError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ConditionsUpstream for HttpUpstream {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let mut builder = self.client.post(&self.endpoint);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .json(&request.body)
            .send()
            .await
            .map_err(|e| ConditionsError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ConditionsError::Transport(e.to_string()))?;

        Ok(UpstreamResponse { status, body })
    }
}
