//! Shader registry: one record per [`ShaderKind`] holding its WGSL and the
//! hooks that fill its uniforms.

use super::backend::{PrimitiveUniforms, ProgramSource};
use crate::primitive::{DrawPrimitive, ShaderKind};

/// Declarations shared by every stage of every program.
const PRELUDE: &str = r#"
struct Frame {
    modelview: mat4x4<f32>,
    viewport: vec2<f32>,
    zoom: f32,
    rotation: f32,
}

struct Primitive {
    color: vec4<f32>,
    center: vec2<f32>,
    radii: vec2<f32>,   // outer, inner (or band width)
    angles: vec2<f32>,  // start, span
    params: vec2<f32>,
}

@group(0) @binding(0) var<uniform> frame: Frame;
@group(1) @binding(0) var<uniform> prim: Primitive;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) world: vec2<f32>,
}

const TAU: f32 = 6.283185307179586;

// Angular band test around prim.center, wrapping at TAU
fn in_band(p: vec2<f32>) -> bool {
    if (prim.angles.y >= TAU) {
        return true;
    }
    let rel = atan2(p.y, p.x) - prim.angles.x;
    let wrapped = rel - floor(rel / TAU) * TAU;
    return wrapped <= prim.angles.y;
}

// Distance from p to the ray leaving the centre at `angle`
fn ray_distance(p: vec2<f32>, angle: f32) -> f32 {
    return abs(p.x * sin(angle) - p.y * cos(angle));
}

// Outline width in world units, from a pixel width
fn stroke() -> f32 {
    return prim.params.x / frame.zoom;
}
"#;

const WORLD_VERTEX: &str = r#"
@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip = frame.modelview * vec4<f32>(position, 0.0, 1.0);
    out.world = position;
    return out;
}
"#;

/// Full-screen quad, positions already in clip space.
const SCREEN_VERTEX: &str = r#"
@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip = vec4<f32>(position, 0.0, 1.0);
    out.world = position;
    return out;
}
"#;

const FILL_CIRCLE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if (distance(in.world, prim.center) > prim.radii.x) {
        discard;
    }
    return prim.color;
}
"#;

const DRAW_CIRCLE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let d = distance(in.world, prim.center);
    if (d > prim.radii.x || d < prim.radii.x - stroke()) {
        discard;
    }
    return prim.color;
}
"#;

const LINED_CIRCLE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = in.world - prim.center;
    if (length(p) > prim.radii.x) {
        discard;
    }
    if (fract((p.x + p.y) / prim.params.x) > 0.5) {
        discard;
    }
    return prim.color;
}
"#;

const FILL_CIRCLE_SLICE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = in.world - prim.center;
    if (length(p) > prim.radii.x || !in_band(p)) {
        discard;
    }
    return prim.color;
}
"#;

const DRAW_CIRCLE_SLICE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = in.world - prim.center;
    let d = length(p);
    if (d > prim.radii.x || !in_band(p)) {
        discard;
    }
    let w = stroke();
    let edge = d > prim.radii.x - w
        || ray_distance(p, prim.angles.x) < w
        || ray_distance(p, prim.angles.x + prim.angles.y) < w;
    if (!edge) {
        discard;
    }
    return prim.color;
}
"#;

const FILL_RING_SLICE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = in.world - prim.center;
    let d = length(p);
    if (d > prim.radii.x || d < prim.radii.y || !in_band(p)) {
        discard;
    }
    return prim.color;
}
"#;

const DRAW_RING_SLICE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = in.world - prim.center;
    let d = length(p);
    if (d > prim.radii.x || d < prim.radii.y || !in_band(p)) {
        discard;
    }
    let w = stroke();
    let edge = d > prim.radii.x - w
        || d < prim.radii.y + w
        || ray_distance(p, prim.angles.x) < w
        || ray_distance(p, prim.angles.x + prim.angles.y) < w;
    if (!edge) {
        discard;
    }
    return prim.color;
}
"#;

const CIRCULAR_ARC: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = in.world - prim.center;
    if (abs(length(p) - prim.radii.x) > prim.radii.y * 0.5 || !in_band(p)) {
        discard;
    }
    return prim.color;
}
"#;

const BLUR_CIRCLE: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let d = distance(in.world, prim.center);
    let r = prim.radii.x;
    let alpha = 1.0 - smoothstep(r - prim.params.x, r, d);
    if (alpha <= 0.0) {
        discard;
    }
    return vec4<f32>(prim.color.rgb, prim.color.a * alpha);
}
"#;

/// Lines every `radii.y` world units, one pixel wide at any zoom. Works
/// from framebuffer coordinates so the modelview never scales it.
const GRID: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let px = in.clip.xy - frame.viewport * 0.5 - prim.center;
    // back into the y-up, unrotated world frame
    let c = cos(frame.rotation);
    let s = sin(frame.rotation);
    let world = vec2<f32>(c * px.x - s * px.y, -s * px.x - c * px.y) * prim.radii.x;
    let spacing = prim.radii.y;
    let cell = abs(fract(world / spacing + 0.5) - 0.5) * spacing;
    if (min(cell.x, cell.y) > prim.radii.x) {
        discard;
    }
    return prim.color;
}
"#;

const COPY: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return prim.color;
}
"#;

type UniformHook = fn(&DrawPrimitive, &mut PrimitiveUniforms);

/// Registry record for one shader kind.
pub struct ShaderRecord {
    pub kind: ShaderKind,
    pub label: &'static str,
    vertex: &'static str,
    fragment: &'static str,
    /// Fills the uniforms shared by the kind's family.
    pub pre_process: UniformHook,
    /// Fills the uniforms specific to the kind.
    pub post_process: UniformHook,
}

impl ShaderRecord {
    pub fn source(&self) -> ProgramSource {
        ProgramSource {
            label: self.label,
            vertex: format!("{PRELUDE}{}", self.vertex),
            fragment: format!("{PRELUDE}{}", self.fragment),
        }
    }

    /// Uniforms for drawing `primitive` with this kind.
    pub fn uniforms(&self, primitive: &DrawPrimitive) -> PrimitiveUniforms {
        let mut uniforms = PrimitiveUniforms::with_color(primitive.color);
        (self.pre_process)(primitive, &mut uniforms);
        (self.post_process)(primitive, &mut uniforms);
        uniforms
    }
}

fn circular(primitive: &DrawPrimitive, uniforms: &mut PrimitiveUniforms) {
    let (center, radii, angles) = primitive.shape.shader_params();
    uniforms.center = center;
    uniforms.radii = radii;
    uniforms.angles = angles;
}

fn parameter(primitive: &DrawPrimitive, uniforms: &mut PrimitiveUniforms) {
    uniforms.params = [primitive.param, 0.0];
}

fn nothing(_: &DrawPrimitive, _: &mut PrimitiveUniforms) {}

const fn record(
    kind: ShaderKind,
    label: &'static str,
    vertex: &'static str,
    fragment: &'static str,
    pre_process: UniformHook,
    post_process: UniformHook,
) -> ShaderRecord {
    ShaderRecord {
        kind,
        label,
        vertex,
        fragment,
        pre_process,
        post_process,
    }
}

/// Indexed by [`ShaderKind::index`].
static REGISTRY: [ShaderRecord; 11] = [
    record(ShaderKind::FillCircle, "fill circle", WORLD_VERTEX, FILL_CIRCLE, circular, nothing),
    record(ShaderKind::DrawCircle, "draw circle", WORLD_VERTEX, DRAW_CIRCLE, circular, parameter),
    record(ShaderKind::LinedCircle, "lined circle", WORLD_VERTEX, LINED_CIRCLE, circular, parameter),
    record(
        ShaderKind::FillCircleSlice,
        "fill circle slice",
        WORLD_VERTEX,
        FILL_CIRCLE_SLICE,
        circular,
        nothing,
    ),
    record(
        ShaderKind::DrawCircleSlice,
        "draw circle slice",
        WORLD_VERTEX,
        DRAW_CIRCLE_SLICE,
        circular,
        parameter,
    ),
    record(
        ShaderKind::FillRingSlice,
        "fill ring slice",
        WORLD_VERTEX,
        FILL_RING_SLICE,
        circular,
        nothing,
    ),
    record(
        ShaderKind::DrawRingSlice,
        "draw ring slice",
        WORLD_VERTEX,
        DRAW_RING_SLICE,
        circular,
        parameter,
    ),
    record(ShaderKind::CircularArc, "circular arc", WORLD_VERTEX, CIRCULAR_ARC, circular, nothing),
    record(ShaderKind::BlurCircle, "blur circle", WORLD_VERTEX, BLUR_CIRCLE, circular, parameter),
    record(ShaderKind::Grid, "grid", SCREEN_VERTEX, GRID, nothing, nothing),
    record(ShaderKind::Copy, "copy", WORLD_VERTEX, COPY, nothing, nothing),
];

pub fn record_for(kind: ShaderKind) -> &'static ShaderRecord {
    &REGISTRY[kind.index()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::shape::Shape;

    #[test]
    fn test_registry_indexed_by_kind() {
        for kind in ShaderKind::ALL {
            assert_eq!(record_for(kind).kind, kind);
        }
    }

    #[test]
    fn test_sources_have_entry_points() {
        for kind in ShaderKind::ALL {
            let source = record_for(kind).source();
            assert!(source.vertex.contains("fn vs_main"));
            assert!(source.fragment.contains("fn fs_main"));
            assert!(source.fragment.contains("struct Primitive"));
        }
    }

    #[test]
    fn test_grid_follows_rotation() {
        let source = record_for(ShaderKind::Grid).source();
        assert!(source.fragment.contains("cos(frame.rotation)"));
    }

    #[test]
    fn test_ring_slice_uniforms() {
        let primitive = DrawPrimitive::new(
            ShaderKind::DrawRingSlice,
            Shape::ring_slice([1.0, 2.0], 3.0, 5.0, 0.0, 1.0),
            Color::WHITE,
        );
        let uniforms = record_for(primitive.kind).uniforms(&primitive);
        assert_eq!(uniforms.center, [1.0, 2.0]);
        assert_eq!(uniforms.radii, [5.0, 3.0]);
        assert_eq!(uniforms.angles, [0.0, 1.0]);
        assert_eq!(uniforms.params, [1.5, 0.0]);
        assert_eq!(uniforms.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_copy_only_sets_color() {
        let primitive = DrawPrimitive::new(
            ShaderKind::Copy,
            Shape::Quad {
                corners: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            },
            Color::rgba(0.5, 0.5, 0.5, 1.0),
        );
        let uniforms = record_for(ShaderKind::Copy).uniforms(&primitive);
        assert_eq!(uniforms, PrimitiveUniforms::with_color(primitive.color));
    }
}
