//! Pan/zoom/rotation state composed into the per-frame modelview matrix.
//!
//! World space is y-up with its origin at the centre of the surface when the
//! camera is at identity; one world unit equals one pixel at zoom 1. Pan is
//! kept in screen pixels (y-down, like pointer deltas) and zooming scales
//! about the centre of the surface.

use crate::transform::Transform;

/// Smallest factor a single [`Camera::scale`] call may apply.
pub const MIN_SCALE_FACTOR: f32 = 0.1;

/// Lowest absolute zoom; keeps the modelview matrix invertible.
pub const MIN_ZOOM: f32 = 1.0e-6;

/// Zoom level at which f32 rounding becomes visible (2^15).
pub const ZOOM_WARNING_THRESHOLD: f32 = 32768.0;

/// Non-fatal notice that the zoom level crossed the precision threshold.
/// Issued at most once per camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrecisionWarning {
    pub zoom: f32,
}

impl PrecisionWarning {
    pub fn message(&self) -> &'static str {
        "You've reached a zoom level where floating point rounding errors will start to \
         accumulate. If things don't look right anymore reset the transformations using 'T'."
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    width: f32,
    height: f32,
    pan: (f32, f32),
    zoom: f32,
    /// Radians, counter-clockwise on screen
    rotation: f32,
    warning_threshold: f32,
    warned: bool,
}

impl Camera {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            pan: (0.0, 0.0),
            zoom: 1.0,
            rotation: 0.0,
            warning_threshold: ZOOM_WARNING_THRESHOLD,
            warned: false,
        }
    }

    pub fn with_warning_threshold(mut self, threshold: f32) -> Self {
        self.warning_threshold = threshold;
        self
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Additive pan in screen pixels.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    /// Additive rotation in degrees.
    pub fn rotate(&mut self, degrees: f32) {
        self.rotation += degrees.to_radians();
    }

    /// Multiplicative zoom about the surface centre. The factor is clamped to
    /// at least [`MIN_SCALE_FACTOR`] and the resulting zoom stays within
    /// [`MIN_ZOOM`] and `f32::MAX`.
    pub fn scale(&mut self, multiplier: f32) -> Option<PrecisionWarning> {
        // f32::max discards NaN
        let factor = multiplier.max(MIN_SCALE_FACTOR);
        let zoom = (self.zoom * factor).clamp(MIN_ZOOM, f32::MAX);
        let applied = zoom / self.zoom;
        self.zoom = zoom;
        self.pan.0 *= applied;
        self.pan.1 *= applied;
        self.check_precision()
    }

    pub fn reset_zoom(&mut self) {
        let factor = 1.0 / self.zoom;
        if factor.is_finite() {
            self.pan.0 *= factor;
            self.pan.1 *= factor;
        } else {
            self.pan = (0.0, 0.0);
        }
        self.zoom = 1.0;
    }

    pub fn reset_transformations(&mut self) {
        self.pan = (0.0, 0.0);
        self.zoom = 1.0;
        self.rotation = 0.0;
    }

    /// Centre the view on a world point at the given zoom, clearing rotation.
    pub fn look_at(&mut self, x: f32, y: f32, zoom: f32) -> Option<PrecisionWarning> {
        self.rotation = 0.0;
        self.zoom = zoom.clamp(MIN_ZOOM, f32::MAX);
        self.pan = (-x * self.zoom, y * self.zoom);
        self.check_precision()
    }

    fn check_precision(&mut self) -> Option<PrecisionWarning> {
        if self.warned || self.zoom < self.warning_threshold {
            return None;
        }
        self.warned = true;
        log::warn!("Zoom level {} reached the precision threshold", self.zoom);
        Some(PrecisionWarning { zoom: self.zoom })
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Radians, counter-clockwise on screen.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation.to_degrees()
    }

    pub fn pan(&self) -> (f32, f32) {
        self.pan
    }

    /// World units covered by one screen pixel along x and y.
    pub fn pixel_ratio(&self) -> (f32, f32) {
        (1.0 / self.zoom, 1.0 / self.zoom)
    }

    /// World space to normalized device coordinates.
    pub fn modelview(&self) -> Transform {
        Transform::scale_xy(2.0 / self.width, 2.0 / self.height)
            .then(&Transform::translate(self.pan.0, -self.pan.1))
            .then(&Transform::rotate(self.rotation))
            .then(&Transform::scale(self.zoom))
    }

    /// Map a surface pixel position to world coordinates through the inverse
    /// of the modelview matrix.
    pub fn transform_point(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        let ndc_x = screen_x / self.width * 2.0 - 1.0;
        let ndc_y = 1.0 - screen_y / self.height * 2.0;
        self.modelview()
            .inverse()
            .unwrap_or_default()
            .transform_point(ndc_x, ndc_y)
    }

    /// Map a world position to surface pixels.
    pub fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let (ndc_x, ndc_y) = self.modelview().transform_point(x, y);
        ((ndc_x + 1.0) * 0.5 * self.width, (1.0 - ndc_y) * 0.5 * self.height)
    }
}
