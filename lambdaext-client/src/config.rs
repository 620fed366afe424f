//! Client configuration

use lambdaext_core::api::base_path;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("runtime API address is empty (set AWS_LAMBDA_RUNTIME_API)")]
    EmptyAddress,

    #[error("invalid runtime API address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Where the Extensions API lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// host:port, as found in `AWS_LAMBDA_RUNTIME_API`
    pub runtime_api: String,
}

impl ApiConfig {
    pub fn new(runtime_api: impl Into<String>) -> Self {
        Self {
            runtime_api: runtime_api.into(),
        }
    }

    /// `http://<host:port>/2020-01-01/extension/`
    ///
    /// The trailing slash lets route paths be joined onto it.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let address = self.runtime_api.trim().trim_end_matches('/');
        if address.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }

        let invalid = |reason: String| ConfigError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        if address.contains("://") {
            return Err(invalid("expected host:port without a scheme".to_string()));
        }

        let url = Url::parse(&format!("http://{}{}/", address, base_path()))
            .map_err(|e| invalid(e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let url = ApiConfig::new("127.0.0.1:9001").base_url().unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9001/2020-01-01/extension/");
        assert_eq!(
            url.join("register").unwrap().as_str(),
            "http://127.0.0.1:9001/2020-01-01/extension/register"
        );
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let url = ApiConfig::new("localhost:9001/").base_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:9001/2020-01-01/extension/");
    }

    #[test]
    fn test_base_url_rejects_bad_addresses() {
        assert!(matches!(
            ApiConfig::new("").base_url(),
            Err(ConfigError::EmptyAddress)
        ));
        assert!(matches!(
            ApiConfig::new("http://127.0.0.1:9001").base_url(),
            Err(ConfigError::InvalidAddress { .. })
        ));
        assert!(matches!(
            ApiConfig::new("127.0.0.1:notaport").base_url(),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }
}
