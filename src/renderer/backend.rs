//! The graphics API seam.
//!
//! Rendering is written against [`GraphicsBackend`], a small immediate-mode
//! surface: compile and link programs, upload vertex buffers, bind a
//! program, set uniforms and draw triangle strips. [`super::WgpuBackend`]
//! implements it on the GPU and [`super::RecordingBackend`] records calls
//! for tests.

use crate::camera::Camera;
use crate::color::Color;
use crate::error::{RenderError, ShaderError};
use crate::primitive::ShaderKind;
use crate::shape::Point;

/// Handle to a linked program owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Handle to a vertex buffer owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Sources for one program. Each stage is a complete WGSL module.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex: String,
    pub fragment: String,
}

/// Per-frame uniforms (bind group 0).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    /// Modelview matrix, column-major
    pub modelview: [[f32; 4]; 4],
    /// Surface size in pixels
    pub viewport: [f32; 2],
    pub zoom: f32,
    /// Camera rotation in radians
    pub rotation: f32,
}

impl FrameUniforms {
    pub fn from_camera(camera: &Camera) -> Self {
        let (width, height) = camera.size();
        Self {
            modelview: camera.modelview().to_columns(),
            viewport: [width, height],
            zoom: camera.zoom(),
            rotation: camera.rotation(),
        }
    }
}

impl Default for FrameUniforms {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

/// Per-primitive uniforms (bind group 1).
///
/// Circle-family programs read `center`, `radii` (outer, inner or band
/// width) and `angles` (start, span); `params.x` holds the kind-specific
/// parameter. The grid program reads `center` as the pan offset in pixels
/// and `radii` as (world units per pixel, line spacing).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PrimitiveUniforms {
    pub color: [f32; 4],
    pub center: [f32; 2],
    pub radii: [f32; 2],
    pub angles: [f32; 2],
    pub params: [f32; 2],
}

impl PrimitiveUniforms {
    pub fn with_color(color: Color) -> Self {
        Self {
            color: color.to_array(),
            ..Self::default()
        }
    }
}

pub trait GraphicsBackend {
    /// Compile both stages and link them into a program.
    fn compile_program(
        &mut self,
        kind: ShaderKind,
        source: &ProgramSource,
    ) -> Result<ProgramId, ShaderError>;

    fn delete_program(&mut self, program: ProgramId);

    fn create_buffer(&mut self, vertices: &[Point]) -> BufferId;

    fn delete_buffer(&mut self, buffer: BufferId);

    /// Start a frame cleared to `clear`.
    fn begin_frame(&mut self, clear: Color) -> Result<(), RenderError>;

    fn use_program(&mut self, program: ProgramId);

    /// Uniforms shared by every draw until replaced.
    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms);

    fn set_primitive_uniforms(&mut self, uniforms: &PrimitiveUniforms);

    /// Draw `vertex_count` vertices of `buffer` as a triangle strip with the
    /// bound program and current uniforms.
    fn draw_strip(&mut self, buffer: BufferId, vertex_count: u32);

    /// Submit the frame.
    fn end_frame(&mut self) -> Result<(), RenderError>;

    fn resize(&mut self, width: u32, height: u32);

    /// Whether the adapter is a discrete GPU.
    fn is_dedicated_gpu(&self) -> bool;
}
