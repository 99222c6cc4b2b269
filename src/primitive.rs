//! Draw primitives: the unit of work passed from layout to rendering and
//! picking.

use bitflags::bitflags;

use crate::color::Color;
use crate::shape::{Point, Shape};

/// GPU program a primitive is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    FillCircle,
    DrawCircle,
    LinedCircle,
    FillCircleSlice,
    DrawCircleSlice,
    FillRingSlice,
    DrawRingSlice,
    CircularArc,
    BlurCircle,
    Grid,
    /// Pass-through program for pre-tessellated geometry; bound by default.
    Copy,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 11] = [
        ShaderKind::FillCircle,
        ShaderKind::DrawCircle,
        ShaderKind::LinedCircle,
        ShaderKind::FillCircleSlice,
        ShaderKind::DrawCircleSlice,
        ShaderKind::FillRingSlice,
        ShaderKind::DrawRingSlice,
        ShaderKind::CircularArc,
        ShaderKind::BlurCircle,
        ShaderKind::Grid,
        ShaderKind::Copy,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn flag(self) -> ShaderKinds {
        ShaderKinds::from_bits_truncate(1 << self.index())
    }

    /// Default value of [`DrawPrimitive::param`] for this kind.
    fn default_param(self, shape: &Shape) -> f32 {
        match self {
            // outline width in pixels
            ShaderKind::DrawCircle | ShaderKind::DrawCircleSlice | ShaderKind::DrawRingSlice => {
                1.5
            }
            // hatch spacing in world units
            ShaderKind::LinedCircle => match shape {
                Shape::Circle { radius, .. } => radius / 4.0,
                _ => 1.0,
            },
            // blur width in world units
            ShaderKind::BlurCircle => match shape {
                Shape::Circle { radius, .. } => radius * 0.5,
                _ => 1.0,
            },
            _ => 0.0,
        }
    }
}

bitflags! {
    /// Set of shader kinds, used to enable programs ahead of a render pass.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ShaderKinds: u16 {
        const FILL_CIRCLE = 1 << 0;
        const DRAW_CIRCLE = 1 << 1;
        const LINED_CIRCLE = 1 << 2;
        const FILL_CIRCLE_SLICE = 1 << 3;
        const DRAW_CIRCLE_SLICE = 1 << 4;
        const FILL_RING_SLICE = 1 << 5;
        const DRAW_RING_SLICE = 1 << 6;
        const CIRCULAR_ARC = 1 << 7;
        const BLUR_CIRCLE = 1 << 8;
        const GRID = 1 << 9;
        const COPY = 1 << 10;
    }
}

impl ShaderKinds {
    pub fn kinds(self) -> impl Iterator<Item = ShaderKind> {
        ShaderKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(kind.flag()))
    }
}

/// One renderable shape.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawPrimitive {
    pub kind: ShaderKind,
    pub shape: Shape,
    /// Triangle-strip vertices in world space
    pub vertices: Vec<Point>,
    pub color: Color,
    /// Kind-specific parameter: outline width (px), hatch spacing or blur
    /// width (world units)
    pub param: f32,
    /// Stable index of the node this primitive draws; `None` for decoration
    pub identifier: Option<usize>,
}

impl DrawPrimitive {
    pub fn new(kind: ShaderKind, shape: Shape, color: Color) -> Self {
        Self {
            kind,
            param: kind.default_param(&shape),
            vertices: shape.tessellate(),
            shape,
            color,
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: usize) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_param(mut self, param: f32) -> Self {
        self.param = param;
        self
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }
}
