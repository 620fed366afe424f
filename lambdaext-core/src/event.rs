//! Lifecycle events delivered by `GET /event/next`

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;

/// Event types an extension can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Invoke,
    Shutdown,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoke => "INVOKE",
            Self::Shutdown => "SHUTDOWN",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVOKE" => Ok(Self::Invoke),
            "SHUTDOWN" => Ok(Self::Shutdown),
            other => Err(PayloadError::UnknownEventType(other.to_string())),
        }
    }
}

/// X-Ray tracing header attached to an invoke
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracing {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

/// Why the execution environment is going away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Spindown,
    Timeout,
    Failure,
    Other(String),
}

impl ShutdownReason {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "spindown" => Self::Spindown,
            "timeout" => Self::Timeout,
            "failure" => Self::Failure,
            _ => Self::Other(s.to_string()),
        }
    }
}

/// A parsed next-event response
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Invoke(InvokeEvent),
    Shutdown(ShutdownEvent),
}

impl Event {
    /// Parse a next-event body, discriminating on `eventType`
    pub fn parse(body: &[u8]) -> Result<Self, PayloadError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(PayloadError::Empty);
        }

        let payload: Value = serde_json::from_slice(body)?;
        let event_type = payload
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or(PayloadError::MissingEventType)?
            .parse::<EventType>()?;

        match event_type {
            EventType::Invoke => {
                let fields: InvokeFields = serde_json::from_value(payload.clone())?;
                Ok(Self::Invoke(InvokeEvent {
                    request_id: fields.request_id,
                    invoked_function_arn: fields.invoked_function_arn,
                    deadline_ms: fields.deadline_ms,
                    tracing: fields.tracing,
                    payload,
                }))
            }
            EventType::Shutdown => {
                let fields: ShutdownFields = serde_json::from_value(payload.clone())?;
                Ok(Self::Shutdown(ShutdownEvent {
                    shutdown_reason: fields.shutdown_reason.as_deref().map(ShutdownReason::parse),
                    deadline_ms: fields.deadline_ms,
                    payload,
                }))
            }
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Invoke(_) => EventType::Invoke,
            Self::Shutdown(_) => EventType::Shutdown,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeFields {
    #[serde(default)]
    request_id: String,
    #[serde(default)]
    invoked_function_arn: String,
    #[serde(default)]
    deadline_ms: i64,
    #[serde(default)]
    tracing: Option<Tracing>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShutdownFields {
    #[serde(default)]
    shutdown_reason: Option<String>,
    #[serde(default)]
    deadline_ms: i64,
}

/// A function invocation has begun
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeEvent {
    pub request_id: String,
    pub invoked_function_arn: String,
    pub deadline_ms: i64,
    pub tracing: Option<Tracing>,
    /// The whole event object as received
    pub payload: Value,
}

impl InvokeEvent {
    /// Get remaining time in milliseconds
    pub fn remaining_time_in_millis(&self) -> i64 {
        remaining_millis(self.deadline_ms)
    }
}

/// The execution environment is being torn down
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownEvent {
    pub shutdown_reason: Option<ShutdownReason>,
    pub deadline_ms: i64,
    pub payload: Value,
}

impl ShutdownEvent {
    pub fn remaining_time_in_millis(&self) -> i64 {
        remaining_millis(self.deadline_ms)
    }
}

fn remaining_millis(deadline_ms: i64) -> i64 {
    let now = Utc::now().timestamp_millis();
    (deadline_ms - now).max(0)
}
