use std::future::Future;

use async_trait::async_trait;
use lambdaext_core::{BoxError, InvokeEvent, Registration, ShutdownEvent};

/// Lifecycle hooks an extension implements.
///
/// Only `on_invoke` is required. An error (or panic) from `on_invoke` is
/// logged and the loop keeps polling. An error from `on_init` is reported to
/// `/init/error` and stops the extension; an error from `on_shutdown` is
/// reported to `/exit/error`.
#[async_trait]
pub trait Extension: Send {
    /// Called once, right after registration and before the first poll.
    async fn on_init(&mut self, _registration: &Registration) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called for every INVOKE event.
    async fn on_invoke(&mut self, event: InvokeEvent) -> Result<(), BoxError>;

    /// Called once when SHUTDOWN arrives.
    async fn on_shutdown(&mut self, _event: &ShutdownEvent) -> Result<(), BoxError> {
        Ok(())
    }
}

#[async_trait]
impl<'a, E> Extension for &'a mut E
where
    E: Extension + ?Sized,
{
    async fn on_init(&mut self, registration: &Registration) -> Result<(), BoxError> {
        (**self).on_init(registration).await
    }

    async fn on_invoke(&mut self, event: InvokeEvent) -> Result<(), BoxError> {
        (**self).on_invoke(event).await
    }

    async fn on_shutdown(&mut self, event: &ShutdownEvent) -> Result<(), BoxError> {
        (**self).on_shutdown(event).await
    }
}

/// Returns a new [`InvokeFn`] with the given closure.
pub fn invoke_fn<F>(f: F) -> InvokeFn<F> {
    InvokeFn { f }
}

/// An [`Extension`] that only handles INVOKE, implemented by a closure.
#[derive(Copy, Clone, Debug)]
pub struct InvokeFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Error> Extension for InvokeFn<F>
where
    F: FnMut(InvokeEvent) -> Fut + Send,
    Fut: Future<Output = Result<(), Error>> + Send,
    Error: Into<BoxError> + Send,
{
    async fn on_invoke(&mut self, event: InvokeEvent) -> Result<(), BoxError> {
        (self.f)(event).await.map_err(Into::into)
    }
}
