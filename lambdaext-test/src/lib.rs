//! Test utilities for lambdaext
//!
//! Provides an in-process mock of the Lambda Extensions API:
//! - scripted registration outcome
//! - a queue of next-event responses; `next` blocks while the queue is empty
//! - a record of every request, for asserting call counts and headers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lambdaext_test::MockServer;
//!
//! #[tokio::test]
//! async fn test_register() {
//!     let server = MockServer::builder()
//!         .extension_id("ext-1")
//!         .event(r#"{"eventType":"INVOKE","requestId":"r1"}"#)
//!         .shutdown()
//!         .start()
//!         .await
//!         .unwrap();
//!
//!     // Point a client at server.runtime_api()
//! }
//! ```

pub mod server;

pub use server::{MockServer, MockServerBuilder, RecordedRequest, RegisterBehaviour};
