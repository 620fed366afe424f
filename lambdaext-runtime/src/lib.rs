//! Event loop for a Lambda external extension.
//!
//! Registers with the Extensions API, then long-polls `event/next` and hands
//! each event to an [`Extension`] until the platform sends SHUTDOWN.
//!
//! ```no_run
//! use lambdaext_client::{ApiConfig, ExtensionsApiClient};
//! use lambdaext_core::{BoxError, InvokeEvent};
//! use lambdaext_runtime::{invoke_fn, EventLoop};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ExtensionsApiClient::new(&ApiConfig::new("127.0.0.1:9001"))?;
//! let summary = EventLoop::new(client, "my-extension")
//!     .run(invoke_fn(|event: InvokeEvent| async move {
//!         println!("invoke {}", event.request_id);
//!         Ok::<(), BoxError>(())
//!     }))
//!     .await?;
//! println!("served {} invocations", summary.stats.invocations);
//! # Ok(())
//! # }
//! ```

mod event_loop;
mod extension;

pub use event_loop::{EventLoop, HookError, LoopStats, RuntimeError, Summary};
pub use extension::{invoke_fn, Extension, InvokeFn};
