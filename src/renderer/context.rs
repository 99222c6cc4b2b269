use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::{Adapter, Device, Instance, Queue, Surface, SurfaceConfiguration, TextureFormat};

use crate::error::GraphicsInitError;

/// Frames the surface may queue ahead of presentation.
const FRAME_LATENCY: u32 = 2;

/// Instance, adapter and device shared by every surface the engine draws to.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

impl GpuContext {
    /// Pick the highest-performance adapter on the primary backends and
    /// open a device on it.
    pub fn new() -> Result<Self, GraphicsInitError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|_| GraphicsInitError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!(
            "Using adapter {} ({:?}, {:?})",
            info.name,
            info.device_type,
            info.backend
        );

        let descriptor = wgpu::DeviceDescriptor {
            label: Some("Canopy Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&descriptor))
            .map_err(|e| GraphicsInitError::RequestDevice(e.to_string()))?;

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Whether the adapter is a discrete GPU.
    pub fn is_dedicated_gpu(&self) -> bool {
        self.adapter.get_info().device_type == wgpu::DeviceType::DiscreteGpu
    }

    /// Create and configure a surface for a host window.
    pub fn create_surface<W>(
        &self,
        window: W,
        width: u32,
        height: u32,
    ) -> Result<SurfaceState, GraphicsInitError>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let surface_error =
            |e: &dyn std::fmt::Display| GraphicsInitError::CreateSurface(e.to_string());
        // SAFETY: the host keeps the window alive for as long as the surface.
        let surface = unsafe {
            let target =
                wgpu::SurfaceTargetUnsafe::from_window(&window).map_err(|e| surface_error(&e))?;
            self.instance.create_surface_unsafe(target)
        }
        .map_err(|e| surface_error(&e))?;
        SurfaceState::new(surface, self, width, height)
    }
}

/// Prefer a plain 8-bit unorm format, falling back to whatever the surface
/// lists first.
pub(crate) fn choose_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| matches!(f, TextureFormat::Bgra8Unorm | TextureFormat::Rgba8Unorm))
        .or_else(|| formats.first().copied())
}

/// A configured window surface and the device it presents from.
pub struct SurfaceState {
    pub surface: Surface<'static>,
    pub config: SurfaceConfiguration,
    pub device: Arc<Device>,
}

impl SurfaceState {
    fn new(
        surface: Surface<'static>,
        context: &GpuContext,
        width: u32,
        height: u32,
    ) -> Result<Self, GraphicsInitError> {
        let caps = surface.get_capabilities(&context.adapter);
        let format = choose_format(&caps.formats).ok_or_else(|| {
            GraphicsInitError::CreateSurface("surface is incompatible with the adapter".into())
        })?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        log::info!("Surface format {:?}, alpha {:?}", format, alpha_mode);

        let mut state = Self {
            surface,
            config: SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: width.max(1),
                height: height.max(1),
                present_mode: wgpu::PresentMode::AutoVsync,
                alpha_mode,
                view_formats: Vec::new(),
                desired_maximum_frame_latency: FRAME_LATENCY,
            },
            device: Arc::clone(&context.device),
        };
        state.reconfigure();
        Ok(state)
    }

    /// Resize the swapchain. Zero-sized requests (minimised windows) are
    /// ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    /// Configure the surface again with its current size.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn format(&self) -> TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}
