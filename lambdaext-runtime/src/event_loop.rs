//! Registration and the next-event loop

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use lambdaext_client::ExtensionsApi;
use lambdaext_core::{
    BoxError, ErrorType, Event, EventType, ExtensionError, ExtensionId, ShutdownEvent,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::extension::Extension;

/// Failure of an extension hook
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(#[source] BoxError),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// Errors that stop the event loop
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no events to subscribe to")]
    NoEvents,

    #[error("failed to register extension: {0}")]
    Registration(#[source] ExtensionError),

    #[error("extension initialization failed: {0}")]
    Init(#[source] HookError),
}

/// What happened while the loop was running
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// INVOKE events handed to the extension
    pub invocations: u64,
    /// Invocations whose handler returned an error or panicked
    pub failed_invocations: u64,
    /// Events dropped because the payload could not be parsed
    pub rejected_events: u64,
    /// next-event calls that failed in transport or with a bad status
    pub poll_errors: u64,
}

/// Returned once SHUTDOWN has been handled
#[derive(Debug, Clone)]
pub struct Summary {
    pub extension_id: ExtensionId,
    pub stats: LoopStats,
    pub shutdown: ShutdownEvent,
}

enum Step {
    Continue,
    Shutdown(ShutdownEvent),
}

/// Drives one extension: register, then poll until SHUTDOWN.
///
/// Polling is strictly sequential; the next `event/next` request is only
/// issued after the previous event has been fully handled.
pub struct EventLoop<C> {
    client: C,
    extension_name: String,
    events: Vec<EventType>,
}

impl<C: ExtensionsApi> EventLoop<C> {
    /// Subscribes to INVOKE and SHUTDOWN by default.
    pub fn new(client: C, extension_name: impl Into<String>) -> Self {
        Self {
            client,
            extension_name: extension_name.into(),
            events: vec![EventType::Invoke, EventType::Shutdown],
        }
    }

    pub fn with_events(mut self, events: impl Into<Vec<EventType>>) -> Self {
        self.events = events.into();
        self
    }

    pub async fn run<E: Extension>(self, mut extension: E) -> Result<Summary, RuntimeError> {
        if self.events.is_empty() {
            return Err(RuntimeError::NoEvents);
        }

        // Without an identifier no further call can succeed, so this is fatal.
        let registration = self
            .client
            .register(&self.extension_name, &self.events)
            .await
            .map_err(|e| {
                error!(name = %self.extension_name, error = %e, "Failed to register extension");
                RuntimeError::Registration(e)
            })?;
        let id = registration.id.clone();

        if let Err(e) = guard(extension.on_init(&registration)).await {
            error!(extension_id = %id, error = %e, "Extension initialization failed");
            if let Err(report) = self
                .client
                .report_init_error(&id, &ErrorType::Unhandled)
                .await
            {
                warn!(error = %report, "Could not report init error");
            }
            return Err(RuntimeError::Init(e));
        }

        info!(extension_id = %id, name = %self.extension_name, "Extension running");

        let mut stats = LoopStats::default();
        let shutdown = loop {
            match self.step(&id, &mut extension, &mut stats).await {
                Step::Continue => continue,
                Step::Shutdown(event) => break event,
            }
        };

        info!(
            extension_id = %id,
            reason = ?shutdown.shutdown_reason,
            invocations = stats.invocations,
            "Shutting down the extension"
        );

        if let Err(e) = guard(extension.on_shutdown(&shutdown)).await {
            error!(extension_id = %id, error = %e, "Shutdown handler failed");
            if let Err(report) = self
                .client
                .report_exit_error(&id, &ErrorType::Unhandled)
                .await
            {
                warn!(error = %report, "Could not report exit error");
            }
        }

        Ok(Summary {
            extension_id: id,
            stats,
            shutdown,
        })
    }

    /// One poll-parse-dispatch round. Nothing in here ends the loop except SHUTDOWN.
    async fn step<E: Extension>(
        &self,
        id: &ExtensionId,
        extension: &mut E,
        stats: &mut LoopStats,
    ) -> Step {
        let body = match self.client.next_event(id).await {
            Ok(body) => body,
            Err(e) => {
                stats.poll_errors += 1;
                warn!(error = %e, "Failed to fetch next event");
                return Step::Continue;
            }
        };

        let event = match Event::parse(&body) {
            Ok(event) => event,
            Err(e) => {
                stats.rejected_events += 1;
                warn!(error = %e, "Discarding event");
                return Step::Continue;
            }
        };

        debug!(event_type = %event.event_type(), "Received event");

        match event {
            Event::Invoke(invoke) => {
                stats.invocations += 1;
                let request_id = invoke.request_id.clone();
                debug!(request_id = %request_id, "Handling invoke");

                if let Err(e) = guard(extension.on_invoke(invoke)).await {
                    stats.failed_invocations += 1;
                    error!(request_id = %request_id, error = %e, "Invoke handler failed");
                }
                Step::Continue
            }
            Event::Shutdown(shutdown) => Step::Shutdown(shutdown),
        }
    }
}

/// Run a hook, turning both errors and panics into [`HookError`]
async fn guard<F>(hook: F) -> Result<(), HookError>
where
    F: Future<Output = Result<(), BoxError>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HookError::Failed(e)),
        Err(panic) => Err(HookError::Panicked(panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
