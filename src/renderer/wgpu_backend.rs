//! [`GraphicsBackend`] on wgpu.
//!
//! Calls between `begin_frame` and `end_frame` are recorded and replayed in
//! a single render pass. Uniform values are packed into two dynamic-offset
//! buffers, one slot per upload, so every draw sees the values that were
//! current when it was issued.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, PipelineLayout, Queue, RenderPipeline};

use super::backend::{
    BufferId, FrameUniforms, GraphicsBackend, PrimitiveUniforms, ProgramId, ProgramSource,
};
use super::context::{GpuContext, SurfaceState};
use crate::color::Color;
use crate::error::{RenderError, ShaderError, ShaderStage};
use crate::primitive::ShaderKind;
use crate::shape::Point;

const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Point>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x2,
    }],
};

enum Target {
    Surface(SurfaceState),
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
    },
}

/// A recorded draw.
struct DrawOp {
    program: ProgramId,
    frame: u32,
    primitive: u32,
    buffer: BufferId,
    count: u32,
}

/// Growable uniform buffer bound with a dynamic offset.
struct UniformRing {
    label: &'static str,
    item_size: u64,
    stride: u64,
    capacity: u64,
    buffer: Buffer,
    bind_group: BindGroup,
}

impl UniformRing {
    fn new(
        device: &Device,
        layout: &BindGroupLayout,
        label: &'static str,
        item_size: u64,
        alignment: u64,
    ) -> Self {
        let stride = item_size.div_ceil(alignment) * alignment;
        let (buffer, bind_group) = Self::allocate(device, layout, label, item_size, stride, 64);
        Self {
            label,
            item_size,
            stride,
            capacity: 64,
            buffer,
            bind_group,
        }
    }

    fn allocate(
        device: &Device,
        layout: &BindGroupLayout,
        label: &'static str,
        item_size: u64,
        stride: u64,
        capacity: u64,
    ) -> (Buffer, BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(item_size),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Upload `items`, one per stride, growing the buffer when needed.
    fn write<T: bytemuck::Pod>(
        &mut self,
        device: &Device,
        queue: &Queue,
        layout: &BindGroupLayout,
        items: &[T],
    ) {
        let count = items.len() as u64;
        if count == 0 {
            return;
        }
        if count > self.capacity {
            let capacity = (self.capacity * 2).max(count);
            let (buffer, bind_group) =
                Self::allocate(device, layout, self.label, self.item_size, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        let stride = self.stride as usize;
        let mut bytes = vec![0u8; stride * items.len()];
        for (index, item) in items.iter().enumerate() {
            let data = bytemuck::bytes_of(item);
            bytes[index * stride..index * stride + data.len()].copy_from_slice(data);
        }
        queue.write_buffer(&self.buffer, 0, &bytes);
    }

    fn offset(&self, index: u32) -> u32 {
        (index as u64 * self.stride) as u32
    }
}

pub struct WgpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    target: Target,
    dedicated: bool,
    frame_layout: BindGroupLayout,
    primitive_layout: BindGroupLayout,
    pipeline_layout: PipelineLayout,
    frame_ring: UniformRing,
    primitive_ring: UniformRing,
    programs: HashMap<ProgramId, RenderPipeline>,
    buffers: HashMap<BufferId, Buffer>,
    next_id: u32,
    clear: Color,
    ops: Vec<DrawOp>,
    frames: Vec<FrameUniforms>,
    primitives: Vec<PrimitiveUniforms>,
    program: Option<ProgramId>,
}

impl WgpuBackend {
    /// Draw to a window surface.
    pub fn new(context: &GpuContext, surface: SurfaceState) -> Self {
        Self::with_target(context, Target::Surface(surface))
    }

    /// Draw to an offscreen texture, for headless use.
    pub fn offscreen(context: &GpuContext, width: u32, height: u32) -> Self {
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let texture = create_target_texture(&context.device, format, width, height);
        Self::with_target(context, Target::Offscreen { texture, format })
    }

    fn with_target(context: &GpuContext, target: Target) -> Self {
        let device = context.device.clone();
        let uniform_layout = |label: &'static str| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
        };
        let frame_layout = uniform_layout("Frame Uniform Layout");
        let primitive_layout = uniform_layout("Primitive Uniform Layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canopy Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &primitive_layout],
            immediate_size: 0,
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let frame_ring = UniformRing::new(
            &device,
            &frame_layout,
            "Frame Uniforms",
            std::mem::size_of::<FrameUniforms>() as u64,
            alignment,
        );
        let primitive_ring = UniformRing::new(
            &device,
            &primitive_layout,
            "Primitive Uniforms",
            std::mem::size_of::<PrimitiveUniforms>() as u64,
            alignment,
        );

        Self {
            queue: context.queue.clone(),
            target,
            dedicated: context.is_dedicated_gpu(),
            frame_layout,
            primitive_layout,
            pipeline_layout,
            frame_ring,
            primitive_ring,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            next_id: 0,
            clear: Color::WHITE,
            ops: Vec::new(),
            frames: Vec::new(),
            primitives: Vec::new(),
            program: None,
            device,
        }
    }

    fn format(&self) -> wgpu::TextureFormat {
        match &self.target {
            Target::Surface(surface) => surface.format(),
            Target::Offscreen { format, .. } => *format,
        }
    }

    /// Texture holding the last offscreen frame.
    pub fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        match &self.target {
            Target::Offscreen { texture, .. } => Some(texture),
            Target::Surface(_) => None,
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn compile_module(
        &self,
        kind: ShaderKind,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<wgpu::ShaderModule, ShaderError> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        let info = pollster::block_on(module.get_compilation_info());
        let scope = pollster::block_on(scope.pop());

        let mut log: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| m.message.clone())
            .collect();
        if let Some(error) = scope {
            log.push(error.to_string());
        }
        if log.is_empty() {
            Ok(module)
        } else {
            Err(ShaderError::Compile {
                kind,
                stage,
                log: log.join("\n"),
            })
        }
    }

    fn link(
        &self,
        label: &str,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
    ) -> RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: Some("vs_main"),
                    buffers: &[VERTEX_LAYOUT],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format(),
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
    }

    fn clear_recording(&mut self) {
        self.ops.clear();
        self.frames.clear();
        self.primitives.clear();
        self.program = None;
    }
}

impl GraphicsBackend for WgpuBackend {
    fn compile_program(
        &mut self,
        kind: ShaderKind,
        source: &ProgramSource,
    ) -> Result<ProgramId, ShaderError> {
        let vertex =
            self.compile_module(kind, ShaderStage::Vertex, source.label, &source.vertex)?;
        let fragment =
            self.compile_module(kind, ShaderStage::Fragment, source.label, &source.fragment)?;

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.link(source.label, &vertex, &fragment);
        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(ShaderError::Link {
                kind,
                log: error.to_string(),
            });
        }

        let program = ProgramId(self.next_id());
        self.programs.insert(program, pipeline);
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
    }

    fn create_buffer(&mut self, vertices: &[Point]) -> BufferId {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Primitive Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId(self.next_id());
        self.buffers.insert(id, buffer);
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn begin_frame(&mut self, clear: Color) -> Result<(), RenderError> {
        self.clear_recording();
        self.clear = clear;
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) {
        self.program = Some(program);
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.frames.push(*uniforms);
    }

    fn set_primitive_uniforms(&mut self, uniforms: &PrimitiveUniforms) {
        self.primitives.push(*uniforms);
    }

    fn draw_strip(&mut self, buffer: BufferId, vertex_count: u32) {
        let (Some(program), Some(frame), Some(primitive)) = (
            self.program,
            self.frames.len().checked_sub(1),
            self.primitives.len().checked_sub(1),
        ) else {
            log::warn!("Draw issued without a program or uniforms; ignored");
            return;
        };
        self.ops.push(DrawOp {
            program,
            frame: frame as u32,
            primitive: primitive as u32,
            buffer,
            count: vertex_count,
        });
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let acquired = match &mut self.target {
            Target::Surface(surface) => {
                let result = surface.surface.get_current_texture();
                if matches!(
                    result,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
                ) {
                    surface.reconfigure();
                }
                Some(result)
            }
            Target::Offscreen { .. } => None,
        };
        let surface_texture = match acquired {
            Some(Ok(output)) => Some(output),
            Some(Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.clear_recording();
                return Err(RenderError::SurfaceLost);
            }
            Some(Err(wgpu::SurfaceError::OutOfMemory)) => {
                self.clear_recording();
                return Err(RenderError::OutOfMemory);
            }
            Some(Err(wgpu::SurfaceError::Timeout)) => {
                log::warn!("Timed out acquiring the surface texture; frame skipped");
                self.clear_recording();
                return Ok(());
            }
            Some(Err(e)) => {
                self.clear_recording();
                return Err(RenderError::Device(e.to_string()));
            }
            None => None,
        };

        let view = match (&surface_texture, &self.target) {
            (Some(output), _) => output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (None, Target::Offscreen { texture, .. }) => {
                texture.create_view(&wgpu::TextureViewDescriptor::default())
            }
            (None, Target::Surface(_)) => return Ok(()),
        };

        self.frame_ring
            .write(&self.device, &self.queue, &self.frame_layout, &self.frames);
        self.primitive_ring.write(
            &self.device,
            &self.queue,
            &self.primitive_layout,
            &self.primitives,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Canopy Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canopy Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: self.clear.r as f64,
                            g: self.clear.g as f64,
                            b: self.clear.b as f64,
                            a: self.clear.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let mut current = None;
            for op in &self.ops {
                let (Some(pipeline), Some(buffer)) =
                    (self.programs.get(&op.program), self.buffers.get(&op.buffer))
                else {
                    continue;
                };
                if current != Some(op.program) {
                    render_pass.set_pipeline(pipeline);
                    current = Some(op.program);
                }
                render_pass.set_bind_group(
                    0,
                    &self.frame_ring.bind_group,
                    &[self.frame_ring.offset(op.frame)],
                );
                render_pass.set_bind_group(
                    1,
                    &self.primitive_ring.bind_group,
                    &[self.primitive_ring.offset(op.primitive)],
                );
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..op.count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(output) = surface_texture {
            output.present();
        }
        log::trace!("Submitted {} draws", self.ops.len());
        self.clear_recording();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let device = self.device.clone();
        match &mut self.target {
            Target::Surface(surface) => surface.resize(width, height),
            Target::Offscreen { texture, format } => {
                *texture = create_target_texture(&device, *format, width, height);
            }
        }
    }

    fn is_dedicated_gpu(&self) -> bool {
        self.dedicated
    }
}

fn create_target_texture(
    device: &Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Canopy Offscreen Target"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
