use super::backend::{BufferId, FrameUniforms, GraphicsBackend, PrimitiveUniforms};
use super::multiplexer::ShaderMultiplexer;
use crate::camera::{Camera, PrecisionWarning};
use crate::color::{Color, ColorTable};
use crate::draw_list::DrawList;
use crate::error::{RenderError, ShaderError};
use crate::primitive::{ShaderKind, ShaderKinds};
use crate::tree::Tree;

/// Full-screen quad the grid pass draws, in clip space.
const GRID_QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Appearance of the coordinate grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridStyle {
    pub color: Color,
    /// Distance between lines in world units
    pub spacing: f32,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            color: Color::rgba(0.5, 0.5, 0.5, 0.35),
            spacing: 50.0,
        }
    }
}

/// Counters for one rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub primitives: usize,
    pub vertices: u32,
    pub program_switches: u32,
    /// Primitives whose shader kind is unusable
    pub skipped: usize,
}

/// Render engine: owns the camera, the loaded draw list with its GPU
/// buffers, and the shader multiplexer.
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    multiplexer: ShaderMultiplexer,
    camera: Camera,
    draw_list: DrawList,
    buffers: Vec<Option<BufferId>>,
    grid_buffer: Option<BufferId>,
    grid: Option<GridStyle>,
    background: Color,
    fatal: Option<String>,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(backend: B, width: f32, height: f32) -> Self {
        Self {
            backend,
            multiplexer: ShaderMultiplexer::new(),
            camera: Camera::new(width, height),
            draw_list: DrawList::default(),
            buffers: Vec::new(),
            grid_buffer: None,
            grid: None,
            background: Color::WHITE,
            fatal: None,
        }
    }

    pub fn with_warning_threshold(mut self, threshold: f32) -> Self {
        self.camera = self.camera.clone().with_warning_threshold(threshold);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn multiplexer(&self) -> &ShaderMultiplexer {
        &self.multiplexer
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.camera.translate(dx, dy);
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.camera.rotate(degrees);
    }

    pub fn scale(&mut self, multiplier: f32) -> Option<PrecisionWarning> {
        self.camera.scale(multiplier)
    }

    pub fn reset_zoom(&mut self) {
        self.camera.reset_zoom();
    }

    pub fn reset_transformations(&mut self) {
        self.camera.reset_transformations();
    }

    pub fn look_at(&mut self, x: f32, y: f32, zoom: f32) -> Option<PrecisionWarning> {
        self.camera.look_at(x, y, zoom)
    }

    pub fn transform_point(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        self.camera.transform_point(screen_x, screen_y)
    }

    pub fn zoom(&self) -> f32 {
        self.camera.zoom()
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Enable or disable the grid pass.
    pub fn set_grid(&mut self, grid: Option<GridStyle>) {
        self.grid = grid;
    }

    /// Message of the fatal error that stopped rendering, if any.
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    /// Take ownership of a new draw list, uploading its geometry and
    /// building the programs it needs. Any previous list must have been
    /// released. Returns the shader kinds that could not be built.
    pub fn load(&mut self, draw_list: DrawList) -> Vec<ShaderError> {
        if !self.buffers.is_empty() {
            log::warn!("Loading a draw list over unreleased buffers");
            self.release_buffers();
        }

        let mut kinds = ShaderKinds::COPY;
        self.buffers = (0..draw_list.len()).map(|_| None).collect();
        for (index, primitive) in draw_list.iter() {
            kinds |= primitive.kind.flag();
            self.buffers[index] = Some(self.backend.create_buffer(&primitive.vertices));
        }
        let errors = self.multiplexer.enable(&mut self.backend, kinds);

        log::debug!(
            "Loaded {} primitives using {} shader kinds",
            draw_list.iter().count(),
            kinds.kinds().count()
        );
        self.draw_list = draw_list;
        errors
    }

    /// Refresh primitive colours in place, keeping geometry and buffers.
    pub fn update_colors(&mut self, tree: &Tree, colors: &ColorTable) {
        self.draw_list.recolor(tree, colors);
    }

    /// Free every buffer and program and clear the draw list.
    pub fn release_buffers(&mut self) {
        for buffer in self.buffers.drain(..).flatten() {
            self.backend.delete_buffer(buffer);
        }
        if let Some(buffer) = self.grid_buffer.take() {
            self.backend.delete_buffer(buffer);
        }
        self.multiplexer.release(&mut self.backend);
        self.draw_list = DrawList::default();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width as f32, height as f32);
        self.backend.resize(width, height);
    }

    /// Draw the grid, then every loaded primitive in order.
    pub fn render(&mut self) -> Result<FrameStats, RenderError> {
        if let Some(message) = &self.fatal {
            return Err(RenderError::Device(message.clone()));
        }

        match self.backend.begin_frame(self.background) {
            Ok(()) => {}
            Err(error) => return Err(self.fail(error)),
        }
        self.multiplexer.begin_frame();
        let frame = FrameUniforms::from_camera(&self.camera);
        self.multiplexer.set_modelview(&mut self.backend, frame);

        if let Some(style) = self.grid {
            self.draw_grid(style);
        }

        let mut stats = FrameStats::default();
        for (index, primitive) in self.draw_list.iter() {
            let Some(buffer) = self.buffers.get(index).copied().flatten() else {
                continue;
            };
            match self.multiplexer.draw(&mut self.backend, primitive, buffer) {
                Ok(count) => {
                    stats.primitives += 1;
                    stats.vertices += count;
                }
                Err(_) => stats.skipped += 1,
            }
        }
        stats.program_switches = self.multiplexer.program_switches();

        if let Err(error) = self.backend.end_frame() {
            return Err(self.fail(error));
        }
        log::trace!(
            "Rendered {} primitives ({} vertices, {} program switches)",
            stats.primitives,
            stats.vertices,
            stats.program_switches
        );
        Ok(stats)
    }

    /// Separate full-screen pass; leaves the grid program bound so the
    /// next primitive rebinds.
    fn draw_grid(&mut self, style: GridStyle) {
        if let Err(error) = self.multiplexer.bind(&mut self.backend, ShaderKind::Grid) {
            log::trace!("Grid skipped: {error}");
            return;
        }
        let buffer = match self.grid_buffer {
            Some(buffer) => buffer,
            None => *self
                .grid_buffer
                .insert(self.backend.create_buffer(&GRID_QUAD)),
        };
        let (pan_x, pan_y) = self.camera.pan();
        let mut uniforms = PrimitiveUniforms::with_color(style.color);
        uniforms.center = [pan_x, pan_y];
        uniforms.radii = [self.camera.pixel_ratio().0, style.spacing];
        self.multiplexer.set_uniforms(&mut self.backend, &uniforms);
        self.backend.draw_strip(buffer, GRID_QUAD.len() as u32);
    }

    fn fail(&mut self, error: RenderError) -> RenderError {
        if error.is_recoverable() {
            log::warn!("{error}; frame skipped");
        } else {
            log::error!("Rendering stopped: {error}");
            self.fatal = Some(error.to_string());
        }
        error
    }
}

impl<B: GraphicsBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.release_buffers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute, LayoutSettings};
    use crate::renderer::recording::{Call, RecordingBackend};
    use crate::tree::sample_tree;

    fn loaded() -> Renderer<RecordingBackend> {
        let tree = sample_tree();
        let colors = ColorTable::default();
        let primitives = compute(&tree, &LayoutSettings::default(), &colors);
        let mut renderer = Renderer::new(RecordingBackend::new(), 800.0, 600.0);
        let errors = renderer.load(DrawList::arrange(primitives, tree.subtree_size()));
        assert!(errors.is_empty());
        renderer
    }

    #[test]
    fn test_render_draws_every_primitive() {
        let mut renderer = loaded();
        let stats = renderer.render().unwrap();
        assert_eq!(stats.primitives, 9);
        assert_eq!(stats.vertices, 36);
        assert_eq!(stats.program_switches, 1);
        assert_eq!(renderer.backend().draw_count(), 9);
        assert_eq!(renderer.backend().frame_count(), 1);
    }

    #[test]
    fn test_release_frees_everything() {
        let mut renderer = loaded();
        assert_eq!(renderer.backend().live_buffers(), 9);
        renderer.set_grid(Some(GridStyle::default()));
        renderer.render().unwrap();
        assert_eq!(renderer.backend().live_buffers(), 10);
        renderer.release_buffers();
        assert_eq!(renderer.backend().live_buffers(), 0);
        assert_eq!(renderer.backend().live_programs(), 0);
        assert!(renderer.draw_list().is_empty());
    }

    #[test]
    fn test_grid_is_separate_pass() {
        let mut renderer = loaded();
        renderer.set_grid(Some(GridStyle::default()));
        renderer.scale(4.0);
        renderer.backend_mut().take_calls();
        let stats = renderer.render().unwrap();

        let calls = renderer.backend().calls();
        let first_draw = calls
            .iter()
            .position(|call| matches!(call, Call::Draw { count: 4, .. }))
            .unwrap();
        let grid_uniforms = calls[..first_draw]
            .iter()
            .rev()
            .find_map(|call| match call {
                Call::SetPrimitive(uniforms) => Some(*uniforms),
                _ => None,
            })
            .unwrap();
        assert_eq!(grid_uniforms.radii, [0.25, 50.0]);
        // grid, then copy for the rectangles
        assert_eq!(stats.program_switches, 2);
        assert_eq!(renderer.backend().draw_count(), 10);
    }

    #[test]
    fn test_single_kind_frame_binds_once() {
        let circles = (0..4)
            .map(|i| {
                crate::primitive::DrawPrimitive::new(
                    ShaderKind::FillCircle,
                    crate::shape::Shape::Circle {
                        center: [i as f32 * 10.0, 0.0],
                        radius: 4.0,
                    },
                    Color::WHITE,
                )
                .with_identifier(i)
            })
            .collect();
        let mut renderer = Renderer::new(RecordingBackend::new(), 100.0, 100.0);
        assert!(renderer.load(DrawList::arrange(circles, 4)).is_empty());
        let stats = renderer.render().unwrap();
        assert_eq!(stats.program_switches, 1);
        assert_eq!(renderer.backend().program_binds(), 1);
        assert_eq!(renderer.backend().compile_count(ShaderKind::Copy), 0);
    }

    #[test]
    fn test_warning_threshold_reaches_camera() {
        let mut renderer =
            Renderer::new(RecordingBackend::new(), 100.0, 100.0).with_warning_threshold(4.0);
        assert!(renderer.scale(2.0).is_none());
        assert_eq!(renderer.scale(2.0).map(|w| w.zoom), Some(4.0));
    }

    #[test]
    fn test_empty_frame_binds_nothing() {
        let mut renderer = Renderer::new(RecordingBackend::new(), 100.0, 100.0);
        let stats = renderer.render().unwrap();
        assert_eq!(stats.program_switches, 0);
        assert_eq!(renderer.backend().program_binds(), 0);
    }

    #[test]
    fn test_frame_uniforms_carry_rotation() {
        let mut renderer = loaded();
        renderer.set_grid(Some(GridStyle::default()));
        renderer.rotate(90.0);
        renderer.render().unwrap();
        let rotation = renderer
            .backend()
            .calls()
            .iter()
            .find_map(|call| match call {
                Call::SetFrame(frame) => Some(frame.rotation),
                _ => None,
            })
            .unwrap();
        assert!((rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_failed_kind_skipped() {
        let tree = sample_tree();
        let colors = ColorTable::default();
        let mut primitives = compute(&tree, &LayoutSettings::default(), &colors);
        primitives.push(crate::primitive::DrawPrimitive::new(
            ShaderKind::LinedCircle,
            crate::shape::Shape::Circle {
                center: [0.0, 0.0],
                radius: 5.0,
            },
            Color::BLACK,
        ));
        let backend = RecordingBackend::new().failing_compile(ShaderKinds::LINED_CIRCLE);
        let mut renderer = Renderer::new(backend, 100.0, 100.0);
        let errors = renderer.load(DrawList::arrange(primitives, tree.subtree_size()));
        assert_eq!(errors.len(), 1);
        let stats = renderer.render().unwrap();
        assert_eq!(stats.primitives, 9);
        assert_eq!(stats.skipped, 1);
        renderer.render().unwrap();
        assert_eq!(renderer.backend().compile_count(ShaderKind::LinedCircle), 1);
    }

    #[test]
    fn test_surface_loss_skips_one_frame() {
        let mut renderer = loaded();
        renderer.backend_mut().lose_surface(1);
        assert!(matches!(renderer.render(), Err(RenderError::SurfaceLost)));
        assert!(renderer.fatal_error().is_none());
        assert!(renderer.render().is_ok());
    }

    #[test]
    fn test_out_of_memory_is_fatal() {
        let mut renderer = loaded();
        renderer.backend_mut().exhaust_memory();
        assert!(matches!(renderer.render(), Err(RenderError::OutOfMemory)));
        assert_eq!(renderer.fatal_error(), Some("Out of GPU memory"));
        assert!(matches!(renderer.render(), Err(RenderError::Device(_))));
    }

    #[test]
    fn test_uses_background() {
        let mut renderer = loaded();
        renderer.set_background(Color::NIGHT);
        renderer.render().unwrap();
        assert!(renderer
            .backend()
            .calls()
            .contains(&Call::BeginFrame(Color::NIGHT)));
    }
}
