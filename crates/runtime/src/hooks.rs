use std::fmt;

/// Error raised by user supplied code: hooks and variable functions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl fmt::Display) -> Self {
        HookError {
            message: message.to_string(),
        }
    }
}

/// What the hooks get to see about the load in progress.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    pub operation_name: &'a str,
    /// Variables in their application representation.
    pub variables: &'a serde_json::Value,
}

/// What should happen with an error once `on_error` saw it.
#[derive(Debug)]
pub enum ErrorDisposition {
    /// Not handled, the error reaches the caller.
    Propagate,
    /// Handled, the caller gets a settlement carrying the error instead.
    Handled,
    /// Replace the error with another one.
    Fail(HookError),
}

#[async_trait::async_trait]
pub trait LoadHooks: Send + Sync {
    async fn before_load(&self, _context: LoadContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    async fn after_load(&self, _context: LoadContext<'_>, _data: &serde_json::Value) -> Result<(), HookError> {
        Ok(())
    }

    async fn on_error(
        &self,
        _context: LoadContext<'_>,
        _error: &(dyn std::error::Error + Send + Sync),
    ) -> ErrorDisposition {
        ErrorDisposition::Propagate
    }
}

impl LoadHooks for () {}
