use std::collections::HashMap;

use super::backend::{
    BufferId, FrameUniforms, GraphicsBackend, PrimitiveUniforms, ProgramId, ProgramSource,
};
use crate::color::Color;
use crate::error::{RenderError, ShaderError, ShaderStage};
use crate::primitive::{ShaderKind, ShaderKinds};
use crate::shape::Point;

/// One call made on a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Compile { kind: ShaderKind, program: ProgramId },
    DeleteProgram(ProgramId),
    CreateBuffer { buffer: BufferId, vertices: usize },
    DeleteBuffer(BufferId),
    BeginFrame(Color),
    UseProgram(ProgramId),
    SetFrame(FrameUniforms),
    SetPrimitive(PrimitiveUniforms),
    Draw { buffer: BufferId, count: u32 },
    EndFrame,
    Resize(u32, u32),
}

/// Backend that performs no GPU work and records every call.
///
/// Compilation and linking can be made to fail for chosen kinds, and the
/// surface can be made to drop a frame, to exercise error paths.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    programs: HashMap<ProgramId, ShaderKind>,
    buffers: HashMap<BufferId, usize>,
    compiles: HashMap<ShaderKind, usize>,
    next_id: u32,
    fail_compile: ShaderKinds,
    fail_link: ShaderKinds,
    lose_frames: u32,
    out_of_memory: bool,
    dedicated: bool,
    size: (u32, u32),
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            compiles: HashMap::new(),
            next_id: 0,
            fail_compile: ShaderKinds::empty(),
            fail_link: ShaderKinds::empty(),
            lose_frames: 0,
            out_of_memory: false,
            dedicated: true,
            size: (0, 0),
        }
    }

    pub fn failing_compile(mut self, kinds: ShaderKinds) -> Self {
        self.fail_compile = kinds;
        self
    }

    pub fn failing_link(mut self, kinds: ShaderKinds) -> Self {
        self.fail_link = kinds;
        self
    }

    /// Report an integrated adapter.
    pub fn integrated(mut self) -> Self {
        self.dedicated = false;
        self
    }

    /// Make the next `frames` frames fail with a lost surface.
    pub fn lose_surface(&mut self, frames: u32) {
        self.lose_frames = frames;
    }

    /// Make every later frame fail with out-of-memory.
    pub fn exhaust_memory(&mut self) {
        self.out_of_memory = true;
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn compile_count(&self, kind: ShaderKind) -> usize {
        self.compiles.get(&kind).copied().unwrap_or(0)
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn program_kind(&self, program: ProgramId) -> Option<ShaderKind> {
        self.programs.get(&program).copied()
    }

    pub fn program_binds(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::UseProgram(_)))
            .count()
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Draw { .. }))
            .count()
    }

    pub fn frame_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::EndFrame))
            .count()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for RecordingBackend {
    fn compile_program(
        &mut self,
        kind: ShaderKind,
        source: &ProgramSource,
    ) -> Result<ProgramId, ShaderError> {
        *self.compiles.entry(kind).or_default() += 1;

        if self.fail_compile.contains(kind.flag()) || !source.fragment.contains("@fragment") {
            return Err(ShaderError::Compile {
                kind,
                stage: ShaderStage::Fragment,
                log: format!("{}: injected compile failure", source.label),
            });
        }
        if !source.vertex.contains("@vertex") {
            return Err(ShaderError::Compile {
                kind,
                stage: ShaderStage::Vertex,
                log: format!("{}: missing vertex entry point", source.label),
            });
        }
        if self.fail_link.contains(kind.flag()) {
            return Err(ShaderError::Link {
                kind,
                log: format!("{}: injected link failure", source.label),
            });
        }

        let program = ProgramId(self.next_id());
        self.programs.insert(program, kind);
        self.calls.push(Call::Compile { kind, program });
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.calls.push(Call::DeleteProgram(program));
    }

    fn create_buffer(&mut self, vertices: &[Point]) -> BufferId {
        let buffer = BufferId(self.next_id());
        self.buffers.insert(buffer, vertices.len());
        self.calls.push(Call::CreateBuffer {
            buffer,
            vertices: vertices.len(),
        });
        buffer
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn begin_frame(&mut self, clear: Color) -> Result<(), RenderError> {
        if self.out_of_memory {
            return Err(RenderError::OutOfMemory);
        }
        if self.lose_frames > 0 {
            self.lose_frames -= 1;
            return Err(RenderError::SurfaceLost);
        }
        self.calls.push(Call::BeginFrame(clear));
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(Call::UseProgram(program));
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.calls.push(Call::SetFrame(*uniforms));
    }

    fn set_primitive_uniforms(&mut self, uniforms: &PrimitiveUniforms) {
        self.calls.push(Call::SetPrimitive(*uniforms));
    }

    fn draw_strip(&mut self, buffer: BufferId, vertex_count: u32) {
        self.calls.push(Call::Draw {
            buffer,
            count: vertex_count,
        });
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.calls.push(Call::EndFrame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.calls.push(Call::Resize(width, height));
    }

    fn is_dedicated_gpu(&self) -> bool {
        self.dedicated
    }
}
