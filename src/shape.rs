//! World-space shape geometry: tessellation into triangle strips, bounding
//! boxes and point containment for picking.

use std::f32::consts::TAU;

pub type Point = [f32; 2];

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle {
        center: Point,
        radius: f32,
    },
    /// Pie slice starting at `start` radians and sweeping `span` radians
    /// counter-clockwise.
    CircleSlice {
        center: Point,
        radius: f32,
        start: f32,
        span: f32,
    },
    RingSlice {
        center: Point,
        inner: f32,
        outer: f32,
        start: f32,
        span: f32,
    },
    /// Band of `width` world units centred on the circle of `radius`.
    Arc {
        center: Point,
        radius: f32,
        width: f32,
        start: f32,
        span: f32,
    },
    /// Convex quadrilateral, corners in winding order.
    Quad { corners: [Point; 4] },
}

impl Shape {
    /// Slice with its angles normalised so `start` lies in `[0, TAU)` and
    /// `span` in `[0, TAU]`.
    pub fn circle_slice(center: Point, radius: f32, start: f32, end: f32) -> Self {
        let (start, span) = normalize_angles(start, end);
        Shape::CircleSlice {
            center,
            radius,
            start,
            span,
        }
    }

    pub fn ring_slice(center: Point, inner: f32, outer: f32, start: f32, end: f32) -> Self {
        let (start, span) = normalize_angles(start, end);
        Shape::RingSlice {
            center,
            inner: inner.min(outer),
            outer: outer.max(inner),
            start,
            span,
        }
    }

    pub fn arc(center: Point, radius: f32, width: f32, start: f32, end: f32) -> Self {
        let (start, span) = normalize_angles(start, end);
        Shape::Arc {
            center,
            radius,
            width,
            start,
            span,
        }
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Point, Point) {
        match self {
            Shape::Quad { corners } => corners.iter().fold(
                ([f32::INFINITY; 2], [f32::NEG_INFINITY; 2]),
                |(min, max), c| {
                    (
                        [min[0].min(c[0]), min[1].min(c[1])],
                        [max[0].max(c[0]), max[1].max(c[1])],
                    )
                },
            ),
            _ => {
                let (center, extent) = self.circular_extent();
                (
                    [center[0] - extent, center[1] - extent],
                    [center[0] + extent, center[1] + extent],
                )
            }
        }
    }

    /// Centre and outer radius of the circle-family shapes.
    fn circular_extent(&self) -> (Point, f32) {
        match *self {
            Shape::Circle { center, radius } | Shape::CircleSlice { center, radius, .. } => {
                (center, radius)
            }
            Shape::RingSlice { center, outer, .. } => (center, outer),
            Shape::Arc {
                center,
                radius,
                width,
                ..
            } => (center, radius + width * 0.5),
            Shape::Quad { corners } => (corners[0], 0.0),
        }
    }

    /// Vertices drawn as a triangle strip. Curved shapes are cut out of
    /// their bounding square by the fragment stage.
    pub fn tessellate(&self) -> Vec<Point> {
        match self {
            Shape::Quad { corners } => vec![corners[0], corners[1], corners[3], corners[2]],
            _ => {
                let ([x0, y0], [x1, y1]) = self.bounds();
                vec![[x0, y0], [x1, y0], [x0, y1], [x1, y1]]
            }
        }
    }

    /// Boundary-inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        match *self {
            Shape::Circle { center, radius } => distance_sq(p, center) <= radius * radius,
            Shape::CircleSlice {
                center,
                radius,
                start,
                span,
            } => distance_sq(p, center) <= radius * radius && in_band(p, center, start, span),
            Shape::RingSlice {
                center,
                inner,
                outer,
                start,
                span,
            } => {
                let d = distance_sq(p, center);
                d >= inner * inner && d <= outer * outer && in_band(p, center, start, span)
            }
            Shape::Arc {
                center,
                radius,
                width,
                start,
                span,
            } => {
                let d = distance_sq(p, center).sqrt();
                (d - radius).abs() <= width * 0.5 && in_band(p, center, start, span)
            }
            Shape::Quad { corners } => {
                let mut sign = 0.0f32;
                for i in 0..4 {
                    let a = corners[i];
                    let b = corners[(i + 1) % 4];
                    let cross = (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
                    if cross != 0.0 {
                        if sign != 0.0 && cross.signum() != sign {
                            return false;
                        }
                        sign = cross.signum();
                    }
                }
                true
            }
        }
    }

    /// `[center_x, center_y]`, `[outer, inner]` radii and `[start, span]`
    /// angles, as consumed by the circle-family shaders.
    pub fn shader_params(&self) -> (Point, [f32; 2], [f32; 2]) {
        match *self {
            Shape::Circle { center, radius } => (center, [radius, 0.0], [0.0, TAU]),
            Shape::CircleSlice {
                center,
                radius,
                start,
                span,
            } => (center, [radius, 0.0], [start, span]),
            Shape::RingSlice {
                center,
                inner,
                outer,
                start,
                span,
            } => (center, [outer, inner], [start, span]),
            Shape::Arc {
                center,
                radius,
                width,
                start,
                span,
            } => (center, [radius, width], [start, span]),
            Shape::Quad { .. } => ([0.0, 0.0], [0.0, 0.0], [0.0, TAU]),
        }
    }
}

fn distance_sq(a: Point, b: Point) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn normalize_angles(start: f32, end: f32) -> (f32, f32) {
    let span = end - start;
    let span = if span >= TAU {
        TAU
    } else {
        span.rem_euclid(TAU)
    };
    (start.rem_euclid(TAU), span)
}

fn in_band(p: Point, center: Point, start: f32, span: f32) -> bool {
    if span >= TAU {
        return true;
    }
    let theta = (p[1] - center[1]).atan2(p[0] - center[0]);
    (theta - start).rem_euclid(TAU) <= span
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_circle_containment() {
        let circle = Shape::Circle {
            center: [10.0, -5.0],
            radius: 3.0,
        };
        assert!(circle.contains([12.9, -5.0]));
        assert!(circle.contains([13.0, -5.0]));
        assert!(!circle.contains([13.1, -5.0]));
        assert!(!circle.contains([12.5, -3.0]));
    }

    #[test]
    fn test_slice_angular_band() {
        let slice = Shape::circle_slice([0.0, 0.0], 10.0, 0.0, FRAC_PI_2);
        assert!(slice.contains([5.0, 5.0]));
        assert!(!slice.contains([-5.0, 5.0]));
        assert!(!slice.contains([5.0, -5.0]));
        assert!(!slice.contains([9.0, 9.0]));
    }

    #[test]
    fn test_slice_wrapping_zero() {
        let slice = Shape::circle_slice([0.0, 0.0], 10.0, -FRAC_PI_2 / 2.0, FRAC_PI_2 / 2.0);
        assert!(slice.contains([5.0, 1.0]));
        assert!(slice.contains([5.0, -1.0]));
        assert!(!slice.contains([-5.0, 0.5]));
    }

    #[test]
    fn test_ring_slice_radius_band() {
        let ring = Shape::ring_slice([0.0, 0.0], 4.0, 8.0, 0.0, PI);
        assert!(ring.contains([0.0, 6.0]));
        assert!(!ring.contains([0.0, 2.0]));
        assert!(!ring.contains([0.0, 9.0]));
        assert!(!ring.contains([0.0, -6.0]));
    }

    #[test]
    fn test_arc_band() {
        let arc = Shape::arc([0.0, 0.0], 10.0, 2.0, 0.0, TAU);
        assert!(arc.contains([10.9, 0.0]));
        assert!(arc.contains([0.0, -9.2]));
        assert!(!arc.contains([8.5, 0.0]));
    }

    #[test]
    fn test_full_turn_slice_is_circle() {
        let slice = Shape::circle_slice([0.0, 0.0], 1.0, 1.0, 1.0 + TAU);
        assert!(slice.contains([-0.5, -0.5]));
    }

    #[test]
    fn test_rotated_quad() {
        let quad = Shape::Quad {
            corners: [[0.0, -1.0], [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]],
        };
        assert!(quad.contains([0.0, 0.0]));
        assert!(quad.contains([0.4, 0.4]));
        assert!(!quad.contains([0.8, 0.8]));
        assert_eq!(quad.bounds(), ([-1.0, -1.0], [1.0, 1.0]));
    }

    #[test]
    fn test_tessellation_is_strip() {
        let quad = Shape::Quad {
            corners: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        };
        assert_eq!(
            quad.tessellate(),
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]
        );
        let circle = Shape::Circle {
            center: [1.0, 1.0],
            radius: 1.0,
        };
        assert_eq!(
            circle.tessellate(),
            vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0]]
        );
    }
}
