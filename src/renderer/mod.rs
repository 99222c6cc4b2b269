//! GPU side of the engine: the backend seam, the shader registry and
//! multiplexer, and the render engine that drives them.

mod backend;
mod context;
mod multiplexer;
mod recording;
mod render;
mod shaders;
mod wgpu_backend;

pub use backend::{
    BufferId, FrameUniforms, GraphicsBackend, PrimitiveUniforms, ProgramId, ProgramSource,
};
pub use context::{GpuContext, SurfaceState};
pub use multiplexer::ShaderMultiplexer;
pub use recording::{Call, RecordingBackend};
pub use render::{FrameStats, GridStyle, Renderer};
pub use shaders::{record_for, ShaderRecord};
pub use wgpu_backend::WgpuBackend;
