/// A 4x4 affine matrix in row-major order, used as the modelview matrix.
///
/// Only the 2D affine part (rotation, uniform or non-uniform scale and
/// translation in the XY plane) is ever populated, which keeps inversion
/// cheap for picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Row-major: element (row, col) lives at `row * 4 + col`
    pub data: [f32; 16],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
        ],
    };

    /// Build from the 2x3 affine part `[a b tx; c d ty]`.
    pub const fn affine(a: f32, b: f32, tx: f32, c: f32, d: f32, ty: f32) -> Self {
        Self {
            data: [
                a, b, 0.0, tx, //
                c, d, 0.0, ty, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, //
            ],
        }
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self::affine(1.0, 0.0, x, 0.0, 1.0, y)
    }

    /// Counter-clockwise rotation about the origin.
    pub fn rotate(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::affine(cos, -sin, 0.0, sin, cos, 0.0)
    }

    pub fn scale(s: f32) -> Self {
        Self::scale_xy(s, s)
    }

    pub fn scale_xy(sx: f32, sy: f32) -> Self {
        Self::affine(sx, 0.0, 0.0, 0.0, sy, 0.0)
    }

    /// `self * other`: `other` is applied first.
    pub fn then(&self, other: &Transform) -> Transform {
        let (a, b) = (&self.data, &other.data);
        let mut data = [0.0f32; 16];
        for row in 0..4 {
            for col in 0..4 {
                data[row * 4 + col] = (0..4).map(|k| a[row * 4 + k] * b[k * 4 + col]).sum();
            }
        }
        Transform { data }
    }

    fn determinant_2d(&self) -> f32 {
        self.data[0] * self.data[5] - self.data[1] * self.data[4]
    }

    /// Inverse of the 2D affine part, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Transform> {
        let det = self.determinant_2d();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let [a, b, _, tx, c, d, _, ty, ..] = self.data;
        let inv = 1.0 / det;
        Some(Self::affine(
            d * inv,
            -b * inv,
            (b * ty - d * tx) * inv,
            -c * inv,
            a * inv,
            (c * tx - a * ty) * inv,
        ))
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.data[0] * x + self.data[1] * y + self.data[3],
            self.data[4] * x + self.data[5] * y + self.data[7],
        )
    }

    /// Column-major layout expected by a WGSL `mat4x4<f32>` uniform.
    pub fn to_columns(&self) -> [[f32; 4]; 4] {
        let d = &self.data;
        [
            [d[0], d[4], d[8], d[12]],
            [d[1], d[5], d[9], d[13]],
            [d[2], d[6], d[10], d[14]],
            [d[3], d[7], d[11], d[15]],
        ]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let t = Transform::rotate(std::f32::consts::FRAC_PI_2);
        assert!(approx(t.transform_point(1.0, 0.0), (0.0, 1.0)));
    }

    #[test]
    fn test_compose_order() {
        // translate first, then scale
        let t = Transform::scale(2.0).then(&Transform::translate(10.0, 0.0));
        assert!(approx(t.transform_point(0.0, 0.0), (20.0, 0.0)));
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform::translate(30.0, -4.0)
            .then(&Transform::rotate(0.7))
            .then(&Transform::scale_xy(3.0, 0.5));
        let inv = t.inverse().unwrap();
        let (x, y) = t.transform_point(5.0, 7.0);
        assert!(approx(inv.transform_point(x, y), (5.0, 7.0)));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(Transform::scale(0.0).inverse().is_none());
    }

    #[test]
    fn test_columns() {
        let cols = Transform::translate(1.0, 2.0).to_columns();
        assert_eq!(cols[3], [1.0, 2.0, 0.0, 1.0]);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
