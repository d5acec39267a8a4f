//! Panic containment for actor loop bodies
//!
//! A tick body runs under [`guarded`]. If it panics the panic is logged and the
//! caller simply moves on to the next tick.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

/// Run `future`, turning a panic into `None`
pub async fn guarded<F, T>(operation: &str, future: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => Some(value),
        Err(panic) => {
            error!(
                "{operation}: unhandled panic, continuing with next tick: {}",
                panic_message(panic.as_ref())
            );
            None
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
