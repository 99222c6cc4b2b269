use super::backend::{BufferId, FrameUniforms, GraphicsBackend, PrimitiveUniforms, ProgramId};
use super::shaders::record_for;
use crate::error::ShaderError;
use crate::primitive::{DrawPrimitive, ShaderKind, ShaderKinds};

#[derive(Clone, Debug, Default)]
enum Slot {
    #[default]
    Uncompiled,
    Ready(ProgramId),
    /// Build failed; never retried.
    Failed(ShaderError),
}

/// Owns one program per shader kind and switches between them.
///
/// Programs are compiled on first use. A program is only rebound when the
/// next primitive's kind differs from the bound one.
#[derive(Debug, Default)]
pub struct ShaderMultiplexer {
    slots: [Slot; ShaderKind::ALL.len()],
    bound: Option<ShaderKind>,
    frame: FrameUniforms,
    switches: u32,
}

impl ShaderMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and link `kind` if it has not been built yet. A kind that
    /// failed before returns its original error without touching the
    /// backend.
    pub fn ensure<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        kind: ShaderKind,
    ) -> Result<ProgramId, ShaderError> {
        match &self.slots[kind.index()] {
            Slot::Ready(program) => return Ok(*program),
            Slot::Failed(error) => return Err(error.clone()),
            Slot::Uncompiled => {}
        }

        let record = record_for(kind);
        match backend.compile_program(kind, &record.source()) {
            Ok(program) => {
                log::debug!("Compiled {} program", record.label);
                self.slots[kind.index()] = Slot::Ready(program);
                Ok(program)
            }
            Err(error) => {
                log::error!("{error}");
                self.slots[kind.index()] = Slot::Failed(error.clone());
                Err(error)
            }
        }
    }

    /// Build every kind in `kinds`, returning the failures.
    pub fn enable<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        kinds: ShaderKinds,
    ) -> Vec<ShaderError> {
        kinds
            .kinds()
            .filter_map(|kind| self.ensure(backend, kind).err())
            .collect()
    }

    pub fn is_failed(&self, kind: ShaderKind) -> bool {
        matches!(self.slots[kind.index()], Slot::Failed(_))
    }

    pub fn is_ready(&self, kind: ShaderKind) -> bool {
        matches!(self.slots[kind.index()], Slot::Ready(_))
    }

    pub fn bound(&self) -> Option<ShaderKind> {
        self.bound
    }

    /// Program binds issued since the last [`Self::begin_frame`].
    pub fn program_switches(&self) -> u32 {
        self.switches
    }

    /// Forget the bound program; the backend starts each frame unbound.
    pub fn begin_frame(&mut self) {
        self.bound = None;
        self.switches = 0;
    }

    /// Bind `kind` unless it already is bound.
    pub fn bind<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        kind: ShaderKind,
    ) -> Result<(), ShaderError> {
        if self.bound == Some(kind) {
            return Ok(());
        }
        let program = self.ensure(backend, kind)?;
        backend.use_program(program);
        backend.set_frame_uniforms(&self.frame);
        self.bound = Some(kind);
        self.switches += 1;
        Ok(())
    }

    pub fn set_modelview<B: GraphicsBackend>(&mut self, backend: &mut B, frame: FrameUniforms) {
        self.frame = frame;
        if self.bound.is_some() {
            backend.set_frame_uniforms(&self.frame);
        }
    }

    /// Upload the uniforms `primitive` is drawn with.
    pub fn pre_process<B: GraphicsBackend>(&self, backend: &mut B, primitive: &DrawPrimitive) {
        let uniforms = record_for(primitive.kind).uniforms(primitive);
        backend.set_primitive_uniforms(&uniforms);
    }

    /// Upload uniforms for a pass that is not a layout primitive, such as
    /// the grid.
    pub fn set_uniforms<B: GraphicsBackend>(&self, backend: &mut B, uniforms: &PrimitiveUniforms) {
        backend.set_primitive_uniforms(uniforms);
    }

    /// Draw `primitive` from `buffer` with the bound program. Returns the
    /// number of vertices submitted.
    pub fn submit<B: GraphicsBackend>(
        &self,
        backend: &mut B,
        primitive: &DrawPrimitive,
        buffer: BufferId,
    ) -> u32 {
        let count = primitive.vertex_count();
        backend.draw_strip(buffer, count);
        count
    }

    /// Bind, upload and submit in one step.
    pub fn draw<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        primitive: &DrawPrimitive,
        buffer: BufferId,
    ) -> Result<u32, ShaderError> {
        self.bind(backend, primitive.kind)?;
        self.pre_process(backend, primitive);
        Ok(self.submit(backend, primitive, buffer))
    }

    /// Delete every compiled program. Failed kinds stay failed.
    pub fn release<B: GraphicsBackend>(&mut self, backend: &mut B) {
        for slot in &mut self.slots {
            if let Slot::Ready(program) = slot {
                backend.delete_program(*program);
                *slot = Slot::Uncompiled;
            }
        }
        self.bound = None;
    }
}
