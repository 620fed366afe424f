//! Extensions API client

use async_trait::async_trait;
use bytes::Bytes;
use lambdaext_core::api::{
    EXIT_ERROR_PATH, EXTENSION_IDENTIFIER_HEADER, EXTENSION_NAME_HEADER,
    FUNCTION_ERROR_TYPE_HEADER, INIT_ERROR_PATH, NEXT_EVENT_PATH, REGISTER_PATH,
};
use lambdaext_core::{
    ErrorType, EventType, ExtensionError, ExtensionId, Operation, ProtocolError,
    RegisterRequest, RegisterResponse, Registration, StatusResponse,
};
use reqwest::{StatusCode, Url};
use tracing::{debug, info};

use crate::config::{ApiConfig, ConfigError};

/// The calls the event loop makes against the platform
///
/// Every method reports failure through [`ExtensionError`]; deciding whether a
/// failure is fatal is left to the caller.
#[async_trait]
pub trait ExtensionsApi: Send + Sync {
    /// Register for `events` under `extension_name`
    async fn register(
        &self,
        extension_name: &str,
        events: &[EventType],
    ) -> Result<Registration, ExtensionError>;

    /// Long-poll for the next event and return its raw body
    async fn next_event(&self, id: &ExtensionId) -> Result<Bytes, ExtensionError>;

    async fn report_init_error(
        &self,
        id: &ExtensionId,
        error_type: &ErrorType,
    ) -> Result<StatusResponse, ExtensionError>;

    async fn report_exit_error(
        &self,
        id: &ExtensionId,
        error_type: &ErrorType,
    ) -> Result<StatusResponse, ExtensionError>;
}

#[derive(Debug, Clone)]
struct Endpoints {
    register: Url,
    next_event: Url,
    init_error: Url,
    exit_error: Url,
}

impl Endpoints {
    fn new(base: &Url) -> Result<Self, ConfigError> {
        let join = |path: &str| {
            base.join(path.trim_start_matches('/'))
                .map_err(|e| ConfigError::InvalidAddress {
                    address: base.to_string(),
                    reason: e.to_string(),
                })
        };

        Ok(Self {
            register: join(REGISTER_PATH)?,
            next_event: join(NEXT_EVENT_PATH)?,
            init_error: join(INIT_ERROR_PATH)?,
            exit_error: join(EXIT_ERROR_PATH)?,
        })
    }
}

/// HTTP client for the Extensions API
///
/// Holds one connection pool shared by all four calls. No request timeout is
/// set: `next_event` is held open by the platform until something happens.
#[derive(Debug, Clone)]
pub struct ExtensionsApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ExtensionsApiClient {
    /// Create a client for the API at `config.runtime_api`
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let base = config.base_url()?;
        let endpoints = Endpoints::new(&base)?;
        let http = reqwest::Client::builder().build()?;

        debug!(base_url = %base, "Created Extensions API client");

        Ok(Self { http, endpoints })
    }

    async fn report_error(
        &self,
        operation: Operation,
        url: &Url,
        id: &ExtensionId,
        error_type: &ErrorType,
    ) -> Result<StatusResponse, ExtensionError> {
        info!(
            operation = %operation,
            extension_id = %id,
            error_type = %error_type,
            "Reporting error to Extensions API"
        );

        let response = self
            .http
            .post(url.clone())
            .header(EXTENSION_IDENTIFIER_HEADER, id.as_str())
            .header(FUNCTION_ERROR_TYPE_HEADER, error_type.as_str())
            .send()
            .await
            .map_err(|e| failed(ExtensionError::transport(operation, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| failed(ExtensionError::transport(operation, e)))?;

        if status != StatusCode::OK {
            return Err(failed(ProtocolError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
                body,
            }));
        }

        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

#[async_trait]
impl ExtensionsApi for ExtensionsApiClient {
    async fn register(
        &self,
        extension_name: &str,
        events: &[EventType],
    ) -> Result<Registration, ExtensionError> {
        let operation = Operation::Register;
        info!(extension_name = %extension_name, ?events, "Registering extension");

        let response = self
            .http
            .post(self.endpoints.register.clone())
            .header(EXTENSION_NAME_HEADER, extension_name)
            .json(&RegisterRequest::new(events))
            .send()
            .await
            .map_err(|e| failed(ExtensionError::transport(operation, e)))?;

        let status = response.status();
        let header = response
            .headers()
            .get(EXTENSION_IDENTIFIER_HEADER)
            .map(|v| v.to_str().map(str::to_owned));
        // The body is informational; a broken one does not fail registration.
        let body = response.text().await.unwrap_or_default();

        let id = match header {
            Some(Ok(value)) => ExtensionId::new(value).map_err(failed)?,
            Some(Err(_)) => {
                return Err(failed(ProtocolError::InvalidHeader(
                    EXTENSION_IDENTIFIER_HEADER,
                )))
            }
            None if !status.is_success() => {
                return Err(failed(ProtocolError::UnexpectedStatus {
                    operation,
                    status: status.as_u16(),
                    body,
                }))
            }
            None => return Err(failed(ProtocolError::MissingIdentifier)),
        };

        let function = serde_json::from_str::<RegisterResponse>(&body).unwrap_or_else(|e| {
            debug!(error = %e, "Ignoring unparseable register response body");
            RegisterResponse::default()
        });

        info!(
            extension_id = %id,
            function_name = %function.function_name,
            function_version = %function.function_version,
            "Registered extension"
        );

        Ok(Registration { id, function })
    }

    async fn next_event(&self, id: &ExtensionId) -> Result<Bytes, ExtensionError> {
        let operation = Operation::NextEvent;
        debug!(extension_id = %id, "Waiting for next event");

        let response = self
            .http
            .get(self.endpoints.next_event.clone())
            .header(EXTENSION_IDENTIFIER_HEADER, id.as_str())
            .send()
            .await
            .map_err(|e| failed(ExtensionError::transport(operation, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| failed(ExtensionError::transport(operation, e)))?;

        if status != StatusCode::OK {
            return Err(failed(ProtocolError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }));
        }

        debug!(bytes = body.len(), "Received next event");
        Ok(body)
    }

    async fn report_init_error(
        &self,
        id: &ExtensionId,
        error_type: &ErrorType,
    ) -> Result<StatusResponse, ExtensionError> {
        self.report_error(Operation::InitError, &self.endpoints.init_error, id, error_type)
            .await
    }

    async fn report_exit_error(
        &self,
        id: &ExtensionId,
        error_type: &ErrorType,
    ) -> Result<StatusResponse, ExtensionError> {
        self.report_error(Operation::ExitError, &self.endpoints.exit_error, id, error_type)
            .await
    }
}

/// Trace a failed call and hand the error back; the caller decides how loud to be
fn failed(err: impl Into<ExtensionError>) -> ExtensionError {
    let err = err.into();
    debug!(error = %err, "Extensions API call failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let client = ExtensionsApiClient::new(&ApiConfig::new("127.0.0.1:9001")).unwrap();
        let base = "http://127.0.0.1:9001/2020-01-01/extension";
        assert_eq!(client.endpoints.register.as_str(), format!("{}/register", base));
        assert_eq!(client.endpoints.next_event.as_str(), format!("{}/event/next", base));
        assert_eq!(client.endpoints.init_error.as_str(), format!("{}/init/error", base));
        assert_eq!(client.endpoints.exit_error.as_str(), format!("{}/exit/error", base));
    }

    #[test]
    fn test_new_rejects_empty_address() {
        assert!(matches!(
            ExtensionsApiClient::new(&ApiConfig::new("  ")),
            Err(ConfigError::EmptyAddress)
        ));
    }
}
