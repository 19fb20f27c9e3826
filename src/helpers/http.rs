use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use crate::error::ProvisionError;

pub const DEFAULT_USER_AGENT: &str = concat!("cloud-image-pool/", env!("CARGO_PKG_VERSION"));

/// Transport knobs. No timeout is applied unless the caller sets one.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            connect_timeout: None,
        }
    }
}

impl ClientSettings {
    pub fn build(&self) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder().user_agent(self.user_agent.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        builder.build()
    }
}

/// GET `url` and insist on a success status.
pub async fn get_ok(client: &Client, url: &str) -> Result<Response, ProvisionError> {
    debug!(%url, "GET");
    client
        .get(url)
        .send()
        .await
        .and_then(Response::error_for_status)
        .map_err(|e| ProvisionError::from_reqwest(url, e))
}

/// GET `url` and read the whole body as text.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, ProvisionError> {
    get_ok(client, url)
        .await?
        .text()
        .await
        .map_err(|e| ProvisionError::from_reqwest(url, e))
}
