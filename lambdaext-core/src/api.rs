//! Extensions API wire contract
//!
//! Paths, header names and the JSON bodies exchanged with the
//! [Lambda Extensions API](https://docs.aws.amazon.com/lambda/latest/dg/runtimes-extensions-api.html).

use serde::{Deserialize, Serialize};

use crate::event::EventType;
use crate::identifier::ExtensionId;

/// Extensions API version segment
pub const API_VERSION: &str = "2020-01-01";

/// Environment variable holding the API host:port
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

pub const EXTENSION_NAME_HEADER: &str = "Lambda-Extension-Name";
pub const EXTENSION_IDENTIFIER_HEADER: &str = "Lambda-Extension-Identifier";
pub const FUNCTION_ERROR_TYPE_HEADER: &str = "Lambda-Extension-Function-Error-Type";

pub const REGISTER_PATH: &str = "/register";
pub const NEXT_EVENT_PATH: &str = "/event/next";
pub const INIT_ERROR_PATH: &str = "/init/error";
pub const EXIT_ERROR_PATH: &str = "/exit/error";

/// Base path every route hangs off, e.g. `/2020-01-01/extension`
pub fn base_path() -> String {
    format!("/{}/extension", API_VERSION)
}

/// Body of `POST /register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub events: Vec<EventType>,
}

impl RegisterRequest {
    pub fn new(events: impl Into<Vec<EventType>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

/// Body of the `/register` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub function_version: String,
    #[serde(default)]
    pub handler: String,
}

/// Outcome of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: ExtensionId,
    pub function: RegisterResponse,
}

/// Body of the `/init/error` and `/exit/error` responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
}
