//! Core types for lambdaext
//!
//! This crate provides the wire types and errors shared by the Extensions API
//! client, the event loop and the mock API used in tests.

pub mod api;
pub mod error;
pub mod event;
pub mod identifier;

pub use api::{RegisterRequest, RegisterResponse, Registration, StatusResponse};
pub use error::{ErrorType, ExtensionError, Operation, PayloadError, ProtocolError};
pub use event::{Event, EventType, InvokeEvent, ShutdownEvent, ShutdownReason, Tracing};
pub use identifier::ExtensionId;

/// Boxed error returned by extension hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
