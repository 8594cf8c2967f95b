use std::{error::Error as StdError, time::Duration};

use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ChannelIntensity, ChannelName, DeviceAddress},
    protocol::{ChannelWrite, DeviceStatus, WriteAck, CONFIG_PATH, STATUS_PATH},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceClientError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
    #[error("could not connect to {address}: {reason}")]
    Unreachable { address: String, reason: String },
    #[error("failed to {operation}: {status} {status_text}")]
    DeviceError {
        operation: &'static str,
        status: u16,
        status_text: String,
    },
    #[error("malformed response: {0}")]
    ProtocolError(String),
    #[error("'{address}' cannot be used as a device address")]
    InvalidAddress { address: String },
}

impl DeviceClientError {
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DeviceClientError::Timeout { .. } | DeviceClientError::Unreachable { .. }
        )
    }
}

#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn read_status(&self, address: &DeviceAddress) -> Result<DeviceStatus, DeviceClientError>;

    async fn toggle_power(&self, address: &DeviceAddress)
        -> Result<DeviceStatus, DeviceClientError>;

    /// Returns the device's `success` flag.
    async fn write_channel(
        &self,
        address: &DeviceAddress,
        channel: ChannelName,
        value: ChannelIntensity,
    ) -> Result<bool, DeviceClientError>;
}

#[derive(Clone)]
pub struct HttpDeviceClient {
    http: Client,
    timeout: Duration,
}

impl Default for HttpDeviceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDeviceClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(address: &DeviceAddress, path: &str) -> Result<Url, DeviceClientError> {
        let invalid = || DeviceClientError::InvalidAddress {
            address: address.to_string(),
        };
        let base = Url::parse(&format!("http://{address}/")).map_err(|_| invalid())?;
        if base.host_str().map_or(true, str::is_empty) {
            return Err(invalid());
        }
        base.join(path.trim_start_matches('/')).map_err(|_| invalid())
    }

    /// Sends the request and reads the whole body under one deadline. When the
    /// deadline passes the in-flight exchange is dropped, which aborts it.
    async fn exchange(
        &self,
        operation: &'static str,
        address: &DeviceAddress,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<Vec<u8>, DeviceClientError> {
        debug!(%url, operation, "sending device request");
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|err| transport_error(address, url, self.timeout, &err))?;
            let status = response.status();
            if !status.is_success() {
                return Err(DeviceClientError::DeviceError {
                    operation,
                    status: status.as_u16(),
                    status_text: reason_phrase(&response),
                });
            }
            response
                .bytes()
                .await
                .map(|body| body.to_vec())
                .map_err(|err| transport_error(address, url, self.timeout, &err))
        };

        let result = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(DeviceClientError::Timeout {
                url: url.to_string(),
                timeout_ms: millis(self.timeout),
            }),
        };
        if let Err(err) = &result {
            warn!(%url, operation, error = %err, "device request failed");
        }
        result
    }
}

#[async_trait]
impl DeviceApi for HttpDeviceClient {
    async fn read_status(&self, address: &DeviceAddress) -> Result<DeviceStatus, DeviceClientError> {
        let url = Self::endpoint(address, STATUS_PATH)?;
        let body = self
            .exchange(
                "fetch device status",
                address,
                &url,
                self.http.get(url.clone()),
            )
            .await?;
        decode(&url, &body)
    }

    async fn toggle_power(
        &self,
        address: &DeviceAddress,
    ) -> Result<DeviceStatus, DeviceClientError> {
        let url = Self::endpoint(address, STATUS_PATH)?;
        let request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json");
        let body = self
            .exchange("toggle device", address, &url, request)
            .await?;
        decode(&url, &body)
    }

    async fn write_channel(
        &self,
        address: &DeviceAddress,
        channel: ChannelName,
        value: ChannelIntensity,
    ) -> Result<bool, DeviceClientError> {
        let url = Self::endpoint(address, CONFIG_PATH)?;
        let request = self
            .http
            .post(url.clone())
            .json(&ChannelWrite { channel, value });
        let body = self
            .exchange("update channel", address, &url, request)
            .await?;
        let ack: WriteAck = decode(&url, &body)?;
        Ok(ack.success)
    }
}

fn decode<T: DeserializeOwned>(url: &Url, body: &[u8]) -> Result<T, DeviceClientError> {
    serde_json::from_slice(body)
        .map_err(|err| DeviceClientError::ProtocolError(format!("{url}: {err}")))
}

/// The reason phrase the device sent, or the standard one for the code.
fn reason_phrase(response: &reqwest::Response) -> String {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| response.status().canonical_reason().map(str::to_string))
        .unwrap_or_default()
}

fn transport_error(
    address: &DeviceAddress,
    url: &Url,
    timeout: Duration,
    err: &reqwest::Error,
) -> DeviceClientError {
    if err.is_timeout() {
        return DeviceClientError::Timeout {
            url: url.to_string(),
            timeout_ms: millis(timeout),
        };
    }
    DeviceClientError::Unreachable {
        address: address.to_string(),
        reason: error_chain(err),
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "tests/device_client_tests.rs"]
mod tests;
