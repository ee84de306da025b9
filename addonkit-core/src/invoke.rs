//! Guarded calls into code the host does not control.
//!
//! Addon callbacks and package loading both go through these wrappers, so an
//! error or a panic comes back as a [`Failure`] instead of unwinding into
//! the manager.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures_util::FutureExt;

use crate::loading_error::LoadingError;

/// Why a guarded call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The call returned an error
    Error(String),
    /// The call panicked
    Panic(String),
}

impl Failure {
    pub fn message(&self) -> &str {
        match self {
            Self::Error(message) | Self::Panic(message) => message,
        }
    }

    pub fn into_loading_error(self) -> LoadingError {
        match self {
            Self::Error(message) => LoadingError::LoadException { message },
            Self::Panic(message) => LoadingError::LoadException {
                message: format!("panicked: {message}"),
            },
        }
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(message) => f.write_str(message),
            Self::Panic(message) => write!(f, "panicked: {message}"),
        }
    }
}

/// Run a synchronous call
pub fn invoke<T, E: Display>(call: impl FnOnce() -> Result<T, E>) -> Result<T, Failure> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Failure::Error(e.to_string())),
        Err(payload) => Err(Failure::Panic(panic_message(payload.as_ref()))),
    }
}

/// Run an asynchronous call to completion
pub async fn invoke_async<T, E, F>(call: F) -> Result<T, Failure>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Failure::Error(e.to_string())),
        Err(payload) => Err(Failure::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
