use std::time::Duration;

pub mod camera;
pub mod clock;
pub mod color;
pub mod draw_list;
pub mod error;
pub mod event;
pub mod interaction;
pub mod layout;
pub mod primitive;
pub mod renderer;
pub mod settings;
pub mod shape;
pub mod transform;
pub mod tree;
pub mod viewer;
pub mod worker;

use camera::ZOOM_WARNING_THRESHOLD;
use interaction::InteractionOptions;
use layout::LayoutOptions;
use settings::Settings;

pub mod prelude {
    pub use crate::camera::{Camera, PrecisionWarning};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::color::{Color, ColorTable, Palette, PaletteTable};
    pub use crate::draw_list::DrawList;
    pub use crate::error::{fallback_message, EngineError, RenderError, ShaderError};
    pub use crate::event::{EngineEvent, Event, Key, Modifiers, MouseButton, Tooltip};
    pub use crate::layout::{LayoutOptions, NodeShape};
    pub use crate::primitive::{DrawPrimitive, ShaderKind};
    pub use crate::renderer::{GpuContext, GraphicsBackend, RecordingBackend, WgpuBackend};
    pub use crate::settings::{GradientMapType, GradientType, Settings};
    pub use crate::shape::Shape;
    pub use crate::tree::{NodeId, NodeSpec, Tree};
    pub use crate::viewer::{Command, Viewer};
    pub use crate::ViewerConfig;
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub drag_threshold: f32,
    pub click_debounce: Duration,
    pub fit_padding: f32,
    pub zoom_to_selection: bool,
    /// Zoom level that triggers the one-time precision warning
    pub zoom_warning: f32,
    /// Trees with more nodes than this report a modal loading state
    pub large_tree_threshold: usize,
    pub layout: LayoutOptions,
    pub settings: Settings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let interaction = InteractionOptions::default();
        Self {
            width: 800,
            height: 600,
            drag_threshold: interaction.drag_threshold,
            click_debounce: interaction.click_debounce,
            fit_padding: interaction.fit_padding,
            zoom_to_selection: interaction.zoom_to_selection,
            zoom_warning: ZOOM_WARNING_THRESHOLD,
            large_tree_threshold: 60_000,
            layout: LayoutOptions::default(),
            settings: Settings::default(),
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn drag_threshold(mut self, pixels: f32) -> Self {
        self.drag_threshold = pixels;
        self
    }

    pub fn click_debounce(mut self, delay: Duration) -> Self {
        self.click_debounce = delay;
        self
    }

    pub fn fit_padding(mut self, padding: f32) -> Self {
        self.fit_padding = padding;
        self
    }

    pub fn zoom_to_selection(mut self, enabled: bool) -> Self {
        self.zoom_to_selection = enabled;
        self
    }

    pub fn zoom_warning(mut self, zoom: f32) -> Self {
        self.zoom_warning = zoom;
        self
    }

    pub fn large_tree_threshold(mut self, nodes: usize) -> Self {
        self.large_tree_threshold = nodes;
        self
    }

    pub fn layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub(crate) fn interaction(&self) -> InteractionOptions {
        InteractionOptions::default()
            .drag_threshold(self.drag_threshold)
            .click_debounce(self.click_debounce)
            .fit_padding(self.fit_padding)
            .zoom_to_selection(self.zoom_to_selection)
    }
}
