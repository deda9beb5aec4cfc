//! Error types for renderer selection.

use thiserror::Error;

/// Errors that can occur while selecting or creating a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer name is not one of the known backends.
    #[error("Unknown renderer: {0}")]
    UnknownRenderer(String),

    /// The backend is known but not available on this host.
    #[error("Renderer not supported: {0}")]
    NotSupported(String),

    /// The backend failed to attach to the canvas.
    #[error("Renderer initialization failed: {0}")]
    Initialization(String),
}
