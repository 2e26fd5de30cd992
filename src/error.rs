//! Errors that unwind out of the render loop

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;

/// Fatal render error.
///
/// Structural and resource problems never surface here: they are reported
/// through the diagnostics queue and the loop keeps running. Anything returned
/// as a `RenderError` means the backend has to be recreated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Device lost: fence of pass '{pass}' not signaled after {waited:?}")]
    FenceTimeout { pass: String, waited: Duration },
    #[error("Device lost: {0}")]
    DeviceLost(String),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl RenderError {
    /// True when the driver has to rebuild the GPU backend.
    pub fn is_device_lost(&self) -> bool {
        match self {
            RenderError::FenceTimeout { .. } | RenderError::DeviceLost(_) => true,
            RenderError::Backend(err) => err.is_fatal(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
