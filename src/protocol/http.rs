// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP implementation of [`DeviceApi`].

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::command::StatePatch;
use crate::error::{ApiError, ProtocolError};
use crate::protocol::DeviceApi;
use crate::response::{
    CapabilityList, FullDocument, InfoRecord, StateRecord, parse_post_reply, parse_presets,
};

// ============================================================================
// HttpConfig
// ============================================================================

/// Connection parameters shared by every device.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wled_bridge::protocol::HttpConfig;
///
/// let config = HttpConfig::new()
///     .with_port(8080)
///     .with_timeout(Duration::from_millis(1500));
///
/// assert_eq!(config.base_url("10.0.0.5"), "http://10.0.0.5:8080");
/// assert_eq!(config.base_url("10.0.0.6:81"), "http://10.0.0.6:81");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    port: u16,
    timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default request timeout. Must stay below the discovery sweep budget.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    /// Creates a configuration with default port and timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the port used for addresses that do not name one.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the default port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL for an address.
    ///
    /// An address that already carries a port keeps it.
    #[must_use]
    pub fn base_url(&self, address: &str) -> String {
        if address.contains(':') || self.port == Self::DEFAULT_PORT {
            format!("http://{address}")
        } else {
            format!("http://{address}:{}", self.port)
        }
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unreachable` if the TLS backend cannot be
    /// initialised.
    pub fn into_client(self) -> Result<HttpClient, ApiError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| ApiError::unreachable("<client>", e.to_string()))?;

        Ok(HttpClient {
            client,
            config: self,
        })
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// HTTP client for the device JSON API.
///
/// One client serves every device; the connection pool is shared.
///
/// # Examples
///
/// ```no_run
/// use wled_bridge::protocol::{DeviceApi, HttpConfig};
///
/// # async fn example() -> Result<(), wled_bridge::ApiError> {
/// let client = HttpConfig::new().into_client()?;
/// let state = client.get_state("192.168.1.50").await?;
/// println!("on: {}", state.on);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Creates a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ApiError> {
        HttpConfig::new().into_client()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn url(&self, address: &str, path: &str) -> String {
        format!("{}{path}", self.config.base_url(address))
    }

    async fn fetch(&self, address: &str, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url(address, path);
        tracing::debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport(address, &e))?;

        read_body(address, response).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        address: &str,
        path: &str,
    ) -> Result<T, ApiError> {
        let body = self.fetch(address, path).await?;
        serde_json::from_slice(&body).map_err(|e| ProtocolError::Malformed(e).into())
    }
}

impl DeviceApi for HttpClient {
    async fn get_state(&self, address: &str) -> Result<StateRecord, ApiError> {
        self.fetch_json(address, "/json/state").await
    }

    async fn post_state(
        &self,
        address: &str,
        patch: &StatePatch,
    ) -> Result<Option<StateRecord>, ApiError> {
        let url = self.url(address, "/json/state");
        tracing::debug!(url = %url, patch = ?patch, "POST");

        let response = self
            .client
            .post(&url)
            .json(patch)
            .send()
            .await
            .map_err(|e| transport(address, &e))?;

        let body = read_body(address, response).await?;
        Ok(parse_post_reply(&body)?)
    }

    async fn get_info(&self, address: &str) -> Result<InfoRecord, ApiError> {
        self.fetch_json(address, "/json/info").await
    }

    async fn get_capabilities(&self, address: &str) -> Result<CapabilityList, ApiError> {
        let doc: FullDocument = self.fetch_json(address, "/json").await?;
        let mut caps = CapabilityList::from_document(doc);

        match self.fetch_json::<Vec<String>>(address, "/json/fxdata").await {
            Ok(fxdata) => caps = caps.with_fxdata(fxdata),
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "No effect metadata, tags left empty");
            }
        }

        match self.fetch(address, "/presets.json").await {
            Ok(body) => match parse_presets(&body) {
                Ok(presets) => caps = caps.with_presets(presets),
                Err(e) => {
                    tracing::warn!(address = %address, error = %e, "Unreadable presets file");
                }
            },
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "No presets file");
            }
        }

        Ok(caps)
    }
}

fn transport(address: &str, err: &reqwest::Error) -> ApiError {
    let reason = if err.is_timeout() {
        "timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    };
    tracing::debug!(address = %address, error = %err, "Request failed");
    ApiError::unreachable(address, reason)
}

async fn read_body(address: &str, response: Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProtocolError::Status {
            code: status.as_u16(),
        }
        .into());
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| transport(address, &e))?;

    tracing::debug!(address = %address, bytes = body.len(), "Received response");
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_config_default_values() {
        let config = HttpConfig::new();
        assert_eq!(config.port(), 80);
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn base_url_default_port() {
        let config = HttpConfig::new();
        assert_eq!(config.base_url("192.168.1.100"), "http://192.168.1.100");
    }

    #[test]
    fn base_url_custom_port() {
        let config = HttpConfig::new().with_port(8080);
        assert_eq!(config.base_url("192.168.1.100"), "http://192.168.1.100:8080");
    }

    #[test]
    fn base_url_keeps_explicit_port() {
        let config = HttpConfig::new().with_port(8080);
        assert_eq!(config.base_url("wled.lan:81"), "http://wled.lan:81");
    }

    #[test]
    fn url_appends_path() {
        let client = HttpConfig::new().into_client().unwrap();
        assert_eq!(
            client.url("10.0.0.2", "/json/state"),
            "http://10.0.0.2/json/state"
        );
    }

    #[test]
    fn into_client_keeps_timeout() {
        let client = HttpConfig::new()
            .with_timeout(Duration::from_millis(500))
            .into_client()
            .unwrap();
        assert_eq!(client.config().timeout(), Duration::from_millis(500));
    }
}
