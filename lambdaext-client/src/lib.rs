//! Lambda Extensions API client
//!
//! Wraps the four calls an external extension makes against the
//! [Extensions API](https://docs.aws.amazon.com/lambda/latest/dg/runtimes-extensions-api.html):
//! register, next event, init error and exit error.

pub mod client;
pub mod config;

pub use client::{ExtensionsApi, ExtensionsApiClient};
pub use config::{ApiConfig, ConfigError};
