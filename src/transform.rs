//! 2D affine transforms.
//!
//! `Transform` wraps a [`DAffine2`] (column vectors). `a * b` maps a point
//! through `b` first, then `a`, which is the same reading order as an SVG
//! transform list: `transform="A B"` is `A * B`.

use std::ops::{Mul, MulAssign};

use glam::{DAffine2, DVec2, dvec2};

use crate::types::{Angle, Rect};

/// An affine transform whose 3x3 matrix has a fixed `(0, 0, 1)` bottom row
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform(pub DAffine2);

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform(DAffine2::IDENTITY);

    /// SVG `matrix(a, b, c, d, e, f)`
    pub fn from_row(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Transform(DAffine2::from_cols_array(&[a, b, c, d, e, f]))
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Transform(DAffine2::from_translation(dvec2(tx, ty)))
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Transform(DAffine2::from_scale(dvec2(sx, sy)))
    }

    /// Rotation about the origin; positive angles turn +x toward +y
    pub fn rotate(angle: Angle) -> Self {
        Transform(DAffine2::from_angle(angle.radians()))
    }

    /// `rotate(angle, cx, cy)`: translate(-cx,-cy), rotate, translate(cx,cy)
    /// in point order.
    pub fn rotate_about(angle: Angle, cx: f64, cy: f64) -> Self {
        Self::translate(cx, cy) * Self::rotate(angle) * Self::translate(-cx, -cy)
    }

    pub fn skew_x(angle: Angle) -> Self {
        Self::from_row(1.0, 0.0, angle.radians().tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(angle: Angle) -> Self {
        Self::from_row(1.0, angle.radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    /// Maps the unit square onto `rect`: `[w, 0, 0, h, x, y]`.
    ///
    /// This is the objectBoundingBox-to-user transform for a shape whose
    /// bounding box is `rect`.
    pub fn from_bbox(rect: Rect) -> Self {
        Self::from_row(rect.width, 0.0, 0.0, rect.height, rect.x, rect.y)
    }

    /// `self` applied first, then `next`
    #[must_use]
    pub fn then(self, next: Transform) -> Transform {
        next * self
    }

    /// `[a, b, c, d, e, f]` in SVG `matrix()` order
    pub fn to_row(&self) -> [f64; 6] {
        self.0.to_cols_array()
    }

    pub fn translation(&self) -> DVec2 {
        self.0.translation
    }

    pub fn determinant(&self) -> f64 {
        self.0.matrix2.determinant()
    }

    pub fn is_identity(&self) -> bool {
        self.0 == DAffine2::IDENTITY
    }

    /// True when the transform is finite and does not collapse the plane
    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det.abs() > f64::EPSILON && self.0.translation.is_finite()
    }

    pub fn inverse(&self) -> Option<Transform> {
        self.is_invertible().then(|| Transform(self.0.inverse()))
    }

    pub fn map_point(&self, p: DVec2) -> DVec2 {
        self.0.transform_point2(p)
    }

    /// Maps a direction, ignoring translation
    pub fn map_vector(&self, v: DVec2) -> DVec2 {
        self.0.transform_vector2(v)
    }

    /// Axis-aligned bounds of the transformed rectangle
    pub fn map_rect(&self, rect: Rect) -> Rect {
        Rect::from_points(rect.corners().map(|c| self.map_point(c))).unwrap_or(rect)
    }

    /// Linear part only
    pub fn linear(&self) -> Transform {
        Transform(DAffine2::from_mat2(self.0.matrix2))
    }

    pub fn approx_eq(&self, other: &Transform, eps: f64) -> bool {
        self.0.abs_diff_eq(other.0, eps)
    }

    pub fn to_skia(&self) -> tiny_skia::Transform {
        let [a, b, c, d, e, f] = self.to_row();
        tiny_skia::Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
    }
}

impl Mul for Transform {
    type Output = Transform;
    fn mul(self, rhs: Transform) -> Transform {
        Transform(self.0 * rhs.0)
    }
}

impl MulAssign for Transform {
    fn mul_assign(&mut self, rhs: Transform) {
        self.0 = self.0 * rhs.0;
    }
}

impl From<DAffine2> for Transform {
    fn from(a: DAffine2) -> Self {
        Transform(a)
    }
}
