use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::config::HttpSettings;
use crate::error::{ImportError, Result};

mod extract;

pub use extract::{DetailExtractor, ListingSelectors, absolute_url, element_text, parse_selector};

/// HTTP client shared by the remote sources
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        Self::with_headers(settings, &[])
    }

    /// Client sending `headers` with every request (API keys and the like).
    pub fn with_headers(settings: &HttpSettings, headers: &[(&str, &str)]) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ImportError::Config(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ImportError::Config(format!("invalid header value: {e}")))?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .default_headers(default_headers)
            .build()?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<reqwest::Response> {
        debug!("GET {}", url);
        let response = cancel.guard(self.client.get(url).send()).await??;

        if !response.status().is_success() {
            return Err(ImportError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    pub async fn get_text(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let response = self.get(url, cancel).await?;
        Ok(cancel.guard(response.text()).await??)
    }

    pub async fn get_json(&self, url: &str, cancel: &CancellationToken) -> Result<Value> {
        let response = self.get(url, cancel).await?;
        Ok(cancel.guard(response.json::<Value>()).await??)
    }
}
