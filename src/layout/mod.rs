//! Geometric layout: turns a tree snapshot into draw primitives.
//!
//! Layout is a pure function of its inputs and runs on the worker thread,
//! see [`crate::worker`].

mod pythagoras;

pub use pythagoras::compute;

use crate::settings::Settings;

/// Shape each node is drawn as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeShape {
    /// The node's full rectangle, drawn with the pass-through program.
    #[default]
    Rectangle,
    /// A circle inscribed in the node's rectangle.
    Circle,
}

/// Geometry options for the Pythagoras layout.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOptions {
    /// Node height as a fraction of its width
    pub aspect: f32,
    pub node_shape: NodeShape,
    /// Width of the root rectangle in world units
    pub root_width: f32,
    /// Draw a blurred halo behind the selected node
    pub selection_halo: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            aspect: 1.0,
            node_shape: NodeShape::default(),
            root_width: 100.0,
            selection_halo: false,
        }
    }
}

impl LayoutOptions {
    pub fn aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn node_shape(mut self, shape: NodeShape) -> Self {
        self.node_shape = shape;
        self
    }

    pub fn root_width(mut self, width: f32) -> Self {
        self.root_width = width;
        self
    }

    pub fn selection_halo(mut self, enabled: bool) -> Self {
        self.selection_halo = enabled;
        self
    }
}

/// Everything besides the tree and colour table that layout reads.
/// Copied by value into each worker request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutSettings {
    pub settings: Settings,
    pub options: LayoutOptions,
}

impl LayoutSettings {
    pub fn new(settings: Settings, options: LayoutOptions) -> Self {
        Self { settings, options }
    }
}
