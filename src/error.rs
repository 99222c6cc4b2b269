use std::fmt;

use thiserror::Error;

use crate::primitive::ShaderKind;

/// Programmable stage a compile error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// No usable GPU surface. Fatal to the engine instance.
#[derive(Debug, Error)]
pub enum GraphicsInitError {
    #[error("No compatible graphics adapter found")]
    NoAdapter,
    #[error("Failed to create device: {0}")]
    RequestDevice(String),
    #[error("Failed to create surface: {0}")]
    CreateSurface(String),
}

/// A shader kind failed to build. The kind stays unusable for the session.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ShaderError {
    #[error("Failed to compile {stage} shader for {kind:?}: {log}")]
    Compile {
        kind: ShaderKind,
        stage: ShaderStage,
        log: String,
    },
    #[error("Failed to link program for {kind:?}: {log}")]
    Link { kind: ShaderKind, log: String },
}

impl ShaderError {
    pub fn kind(&self) -> ShaderKind {
        match self {
            ShaderError::Compile { kind, .. } | ShaderError::Link { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// Surface was lost or outdated and has been reconfigured; the frame
    /// was skipped.
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of GPU memory")]
    OutOfMemory,
    #[error("Device error: {0}")]
    Device(String),
}

impl RenderError {
    /// Whether the renderer can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::SurfaceLost)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    GraphicsInit(#[from] GraphicsInitError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to start layout worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Text a host shows on its fallback 2D surface when the engine cannot
/// render.
pub fn fallback_message(error: &EngineError) -> String {
    match error {
        EngineError::GraphicsInit(_) => {
            "Unable to initialize GPU rendering on this device.".to_string()
        }
        other => format!("Rendering failed: {other}"),
    }
}
