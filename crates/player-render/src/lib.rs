//! Renderer collaborator contract and backend selection.
//!
//! Drawing is owned by the host. The player selects a backend by name
//! and calls [`Renderer::draw`] once per presented frame.

mod error;

pub use error::RenderError;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use player_codec::DecodedFrame;
use player_ipc::CanvasHandle;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// The rendering backends a start request may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RendererKind {
    /// 2D canvas context.
    #[serde(rename = "2d")]
    Canvas2d,

    /// WebGL 1.
    #[serde(rename = "webgl")]
    WebGl,

    /// WebGL 2.
    #[serde(rename = "webgl2")]
    WebGl2,

    /// WebGPU.
    #[serde(rename = "webgpu")]
    WebGpu,
}

impl RendererKind {
    /// All known backends.
    pub const ALL: [RendererKind; 4] = [Self::Canvas2d, Self::WebGl, Self::WebGl2, Self::WebGpu];

    /// Returns the name used in start requests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canvas2d => "2d",
            Self::WebGl => "webgl",
            Self::WebGl2 => "webgl2",
            Self::WebGpu => "webgpu",
        }
    }
}

impl FromStr for RendererKind {
    type Err = RenderError;

    fn from_str(name: &str) -> RenderResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| RenderError::UnknownRenderer(name.to_string()))
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draws decoded frames onto a surface.
pub trait Renderer: Send {
    /// Draw one frame. The caller releases the frame afterwards.
    fn draw(&mut self, frame: &dyn DecodedFrame);

    /// Get the backend this renderer implements.
    fn kind(&self) -> RendererKind;
}

/// Creates renderers for a canvas.
pub trait RendererFactory: Send + Sync {
    /// Create a renderer of `kind` attached to `canvas`.
    fn create(&self, kind: RendererKind, canvas: CanvasHandle) -> RenderResult<Box<dyn Renderer>>;
}
