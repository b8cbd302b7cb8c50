use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, instrument};

const HTTP_REQUEST_TIMEOUT_MS: u64 = 7500;

#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Blocking-per-call HTTP fetch seam. Shared and reentrant: many source
/// instances call it concurrently, synchronization is its own business.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// `Some(body)` issues a POST, `None` a GET. Non-2xx statuses are fetch
    /// errors.
    async fn fetch(
        &self,
        url: &str,
        body: Option<String>,
        headers: Option<&HashMap<String, String>>,
        auth: Option<&BasicAuth>,
    ) -> Result<String>;
}

pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http_timeout = Duration::from_millis(HTTP_REQUEST_TIMEOUT_MS);
        let http_client = Client::builder().timeout(http_timeout).build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(name = "HTTP_request", level = "info", skip_all, fields(url = url))]
    async fn fetch(
        &self,
        url: &str,
        body: Option<String>,
        headers: Option<&HashMap<String, String>>,
        auth: Option<&BasicAuth>,
    ) -> Result<String> {
        let mut request = match body {
            Some(body) => self.http_client.post(url).body(body),
            None => self.http_client.get(url),
        };
        if let Some(headers) = headers {
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }
        if let Some(auth) = auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        info!("Sending request");
        match request.send().await {
            Ok(res) => {
                info!("Receive with status: {}", res.status());
                if !res.status().is_success() {
                    return Err(Error::InvalidHttpResponse(url.to_string()));
                }
                Ok(res.text().await?)
            }
            Err(err) => {
                error!("Reason: {}", err);
                Err(Error::Reqwest(err))
            }
        }
    }
}
