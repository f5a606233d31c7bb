use std::time::Duration;

use async_trait::async_trait;
use beehub_core::config::PortalConfig;
use tracing::{debug, warn};
use url::Url;

use crate::error::SessionError;

/// What the login flow needs from a portal reply.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    /// URL of the last request after following redirects.
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

impl PortalResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One cookie-carrying conversation with the portal.
#[async_trait]
pub trait PortalTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<PortalResponse, SessionError>;

    async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<PortalResponse, SessionError>;
}

/// Opens a fresh transport (with an empty cookie jar) per login attempt.
pub trait PortalConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn PortalTransport>, SessionError>;
}

pub struct HttpConnector {
    user_agent: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout(),
        }
    }
}

impl PortalConnector for HttpConnector {
    fn connect(&self) -> Result<Box<dyn PortalTransport>, SessionError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .build()
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        Ok(Box::new(HttpPortal { client }))
    }
}

struct HttpPortal {
    client: reqwest::Client,
}

impl HttpPortal {
    async fn read(url: &Url, resp: reqwest::Response) -> Result<PortalResponse, SessionError> {
        let final_url = resp.url().clone();
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            warn!(url = %url, error = %e, "failed reading portal body");
            SessionError::Transport(e.to_string())
        })?;

        debug!(url = %url, final_url = %final_url, status, "portal response");
        Ok(PortalResponse {
            final_url,
            status,
            body,
        })
    }
}

#[async_trait]
impl PortalTransport for HttpPortal {
    async fn get(&self, url: &Url) -> Result<PortalResponse, SessionError> {
        let resp = self.client.get(url.as_str()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "portal GET failed");
            SessionError::Transport(e.to_string())
        })?;
        Self::read(url, resp).await
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<PortalResponse, SessionError> {
        let resp = self
            .client
            .post(url.as_str())
            .form(form)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "portal POST failed");
                SessionError::Transport(e.to_string())
            })?;
        Self::read(url, resp).await
    }
}
