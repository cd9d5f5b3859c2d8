//! HTTP transport for the control API

use super::routes::{CephApiRoute, RouteMethod};
use super::CephApiConfig;
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::debug;

/// Issues routed requests against a monitor's control API
pub struct HttpHandler {
    client: reqwest::Client,
    scheme: String,
    port: u16,
    prefix: String,
}

impl HttpHandler {
    pub fn new(config: &CephApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
            port: config.port,
            prefix: config.prefix.trim_matches('/').to_string(),
        })
    }

    /// Full URL of a rendered route path on `mon`
    pub fn url(&self, mon: &str, route: &CephApiRoute, path: &str) -> String {
        format!(
            "{}://{}:{}/{}/v{}/{}",
            self.scheme, mon, self.port, self.prefix, route.version, path
        )
    }

    /// Send a request; writes carry `body` as JSON, reads carry no body
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        mon: &str,
        route: &CephApiRoute,
        path: &str,
        body: Option<&B>,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let url = self.url(mon, route, path);
        debug!("{} {}", route.method, url);

        let request = match route.method {
            RouteMethod::Get => self.client.get(&url),
            RouteMethod::Post => {
                let request = self.client.post(&url);
                match body {
                    Some(body) => request.json(body),
                    None => request,
                }
            }
        };
        request.send().await
    }
}
