//! The extension shipped by the binary: log every event it sees.

use async_trait::async_trait;
use lambdaext_core::{BoxError, InvokeEvent, Registration, ShutdownEvent};
use lambdaext_runtime::Extension;
use tracing::info;

pub struct LoggingExtension {
    name: String,
    handled: u64,
}

impl LoggingExtension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handled: 0,
        }
    }

    pub fn handled(&self) -> u64 {
        self.handled
    }
}

#[async_trait]
impl Extension for LoggingExtension {
    async fn on_init(&mut self, registration: &Registration) -> Result<(), BoxError> {
        info!(
            extension = %self.name,
            extension_id = %registration.id,
            function_name = %registration.function.function_name,
            function_version = %registration.function.function_version,
            "Registered extension"
        );
        Ok(())
    }

    async fn on_invoke(&mut self, event: InvokeEvent) -> Result<(), BoxError> {
        self.handled += 1;
        info!(
            extension = %self.name,
            request_id = %event.request_id,
            payload = %event.payload,
            "Handling invoke from extension"
        );
        Ok(())
    }

    async fn on_shutdown(&mut self, event: &ShutdownEvent) -> Result<(), BoxError> {
        info!(
            extension = %self.name,
            reason = ?event.shutdown_reason,
            remaining_ms = event.remaining_time_in_millis(),
            handled = self.handled,
            "Shutting down extension"
        );
        Ok(())
    }
}
