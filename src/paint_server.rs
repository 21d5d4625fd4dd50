//! Paint server coordinate spaces
//!
//! A gradient, pattern, clip path or mask is drawn in its own space and then
//! placed onto the consuming shape. Resolving a server against one shape
//! yields a [`BakedTransformChain`]:
//!
//! ```text
//! device <- shape_transform <- placement_to_user <- server_transform <- content_to_server <- content
//! ```
//!
//! - `placement_to_user` is the shape's bounding box transform when the
//!   server's placement units are `objectBoundingBox`.
//! - `server_transform` is `gradientTransform`, `patternTransform` or the
//!   clip path's `transform`.
//! - `content_to_server` brings content coordinates into the space the
//!   pattern cell lives in: the viewBox transform if there is one, otherwise
//!   whatever reconciles differing content and placement units.

use enum_dispatch::enum_dispatch;
use glam::DVec2;

use crate::aspect::AspectRatio;
use crate::errors::ResolveError;
use crate::log::{trace, warn};
use crate::transform::Transform;
use crate::types::Rect;
use crate::viewport::ViewportSpec;

// ============================================================================
// Units
// ============================================================================

/// `*Units` attribute values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Units {
    UserSpaceOnUse,
    ObjectBoundingBox,
}

impl Units {
    /// Parse a units attribute; absent or unknown values give `default`
    pub fn parse(value: Option<&str>, default: Units) -> Units {
        match value.map(str::trim) {
            None => default,
            Some("userSpaceOnUse") => Units::UserSpaceOnUse,
            Some("objectBoundingBox") => Units::ObjectBoundingBox,
            Some(other) => {
                warn!(value = other, "unknown units value, using default");
                default
            }
        }
    }

    pub fn is_obb(self) -> bool {
        self == Units::ObjectBoundingBox
    }
}

/// `spreadMethod` of a gradient
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Spread {
    #[default]
    Pad,
    Reflect,
    Repeat,
}

impl Spread {
    pub fn parse(value: Option<&str>) -> Spread {
        match value.map(str::trim) {
            Some("reflect") => Spread::Reflect,
            Some("repeat") => Spread::Repeat,
            _ => Spread::Pad,
        }
    }

    pub fn to_skia(self) -> tiny_skia::SpreadMode {
        match self {
            Spread::Pad => tiny_skia::SpreadMode::Pad,
            Spread::Reflect => tiny_skia::SpreadMode::Reflect,
            Spread::Repeat => tiny_skia::SpreadMode::Repeat,
        }
    }
}

// ============================================================================
// Server Specs
// ============================================================================

/// What every paint server kind contributes to the transform chain
#[enum_dispatch]
pub trait ServerSpace {
    /// Units of the placement rect (or, for gradients, of all geometry)
    fn placement_units(&self) -> Units;

    /// Units of child content
    fn content_units(&self) -> Units;

    /// `gradientTransform`, `patternTransform` or `transform`
    fn server_transform(&self) -> Transform {
        Transform::IDENTITY
    }

    /// Tile or region rect in placement units
    fn cell(&self) -> Option<Rect> {
        None
    }

    /// Content viewBox and how to fit it into the cell
    fn content_view_box(&self) -> Option<(Rect, AspectRatio)> {
        None
    }
}

/// Resolved gradient geometry, in the gradient's units
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientGeometry {
    Linear { x1: f64, y1: f64, x2: f64, y2: f64 },
    Radial { cx: f64, cy: f64, r: f64, fx: f64, fy: f64 },
}

impl GradientGeometry {
    /// `x1=0% y1=0% x2=100% y2=0%` in bounding box fractions
    pub const DEFAULT_LINEAR: GradientGeometry = GradientGeometry::Linear { x1: 0.0, y1: 0.0, x2: 1.0, y2: 0.0 };

    /// `cx=cy=r=50%`, focus on the center
    pub const DEFAULT_RADIAL: GradientGeometry = GradientGeometry::Radial {
        cx: 0.5,
        cy: 0.5,
        r: 0.5,
        fx: 0.5,
        fy: 0.5,
    };

    /// Start and end of the gradient vector (focus and center for radials)
    pub fn control_points(&self) -> [DVec2; 2] {
        match *self {
            GradientGeometry::Linear { x1, y1, x2, y2 } => [DVec2::new(x1, y1), DVec2::new(x2, y2)],
            GradientGeometry::Radial { cx, cy, fx, fy, .. } => [DVec2::new(fx, fy), DVec2::new(cx, cy)],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GradientSpec {
    pub units: Units,
    pub transform: Transform,
    pub spread: Spread,
    pub geometry: GradientGeometry,
}

impl ServerSpace for GradientSpec {
    fn placement_units(&self) -> Units {
        self.units
    }

    fn content_units(&self) -> Units {
        self.units
    }

    fn server_transform(&self) -> Transform {
        self.transform
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatternSpec {
    pub id: String,
    /// `patternUnits`
    pub units: Units,
    /// `patternContentUnits`; ignored when `view_box` is set
    pub content_units: Units,
    pub transform: Transform,
    /// `x, y, width, height`
    pub rect: Rect,
    pub view_box: Option<Rect>,
    pub aspect: AspectRatio,
}

impl ServerSpace for PatternSpec {
    fn placement_units(&self) -> Units {
        self.units
    }

    fn content_units(&self) -> Units {
        self.content_units
    }

    fn server_transform(&self) -> Transform {
        self.transform
    }

    fn cell(&self) -> Option<Rect> {
        Some(self.rect)
    }

    fn content_view_box(&self) -> Option<(Rect, AspectRatio)> {
        self.view_box.map(|vb| (vb, self.aspect))
    }
}

/// `clipPathUnits` applies to the clip content; there is no placement rect
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPathSpec {
    pub units: Units,
    pub transform: Transform,
}

impl ServerSpace for ClipPathSpec {
    fn placement_units(&self) -> Units {
        Units::UserSpaceOnUse
    }

    fn content_units(&self) -> Units {
        self.units
    }

    fn server_transform(&self) -> Transform {
        self.transform
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaskSpec {
    /// `maskUnits`
    pub units: Units,
    /// `maskContentUnits`
    pub content_units: Units,
    /// Mask region
    pub rect: Rect,
}

impl MaskSpec {
    /// `-10% -10% 120% 120%` of the bounding box
    pub const DEFAULT_REGION: Rect = Rect::new(-0.1, -0.1, 1.2, 1.2);
}

impl ServerSpace for MaskSpec {
    fn placement_units(&self) -> Units {
        self.units
    }

    fn content_units(&self) -> Units {
        self.content_units
    }

    fn cell(&self) -> Option<Rect> {
        Some(self.rect)
    }
}

/// A paint server, by kind
#[enum_dispatch(ServerSpace)]
#[derive(Clone, Debug, PartialEq)]
pub enum PaintServerSpec {
    Gradient(GradientSpec),
    Pattern(PatternSpec),
    ClipPath(ClipPathSpec),
    Mask(MaskSpec),
}

impl PaintServerSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PaintServerSpec::Gradient(g) => match g.geometry {
                GradientGeometry::Linear { .. } => "linearGradient",
                GradientGeometry::Radial { .. } => "radialGradient",
            },
            PaintServerSpec::Pattern(_) => "pattern",
            PaintServerSpec::ClipPath(_) => "clipPath",
            PaintServerSpec::Mask(_) => "mask",
        }
    }

    /// Shorthand for [`resolve`]
    pub fn resolve(&self, bbox: Rect, shape_transform: Transform) -> Result<BakedTransformChain, ResolveError> {
        resolve(self, bbox, shape_transform)
    }
}

// ============================================================================
// Baked Chain
// ============================================================================

/// The transform chain of one (paint server, consuming shape) pair
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BakedTransformChain {
    pub shape_transform: Transform,
    pub placement_to_user: Transform,
    pub server_transform: Transform,
    pub content_to_server: Transform,
    /// Pattern tile or mask region, in server space
    pub cell: Option<Rect>,
    /// Bounding box of the consuming shape, in its local user space
    pub bbox: Rect,
    pub placement_units: Units,
    pub content_units: Units,
    pub has_view_box: bool,
}

impl BakedTransformChain {
    /// Server space (cell coordinates) to device
    pub fn cell_to_device(&self) -> Transform {
        self.shape_transform * self.placement_to_user * self.server_transform
    }

    /// Content coordinates to device
    pub fn content_to_device(&self) -> Transform {
        self.cell_to_device() * self.content_to_server
    }

    pub fn map_content_point(&self, p: DVec2) -> DVec2 {
        self.content_to_device().map_point(p)
    }

    /// Whether content placed in the cell looks the same for every bounding box.
    ///
    /// False when exactly one of content and placement is in
    /// objectBoundingBox units and no viewBox decouples them.
    pub fn is_shape_independent(&self) -> bool {
        self.has_view_box || self.placement_units.is_obb() == self.content_units.is_obb()
    }

    /// Device-space corners of the cell, in `Rect::corners` order
    pub fn device_cell_corners(&self) -> Option<[DVec2; 4]> {
        let to_device = self.cell_to_device();
        self.cell.map(|cell| cell.corners().map(|c| to_device.map_point(c)))
    }
}

/// Resolve `spec` against a consuming shape.
///
/// `bbox` is the shape's bounding box in its local user space and
/// `shape_transform` maps that space to device. Any objectBoundingBox unit
/// needs a non-empty `bbox`.
pub fn resolve(
    spec: &PaintServerSpec,
    bbox: Rect,
    shape_transform: Transform,
) -> Result<BakedTransformChain, ResolveError> {
    let placement_units = spec.placement_units();
    let view_box = spec.content_view_box();
    // a viewBox overrides content units
    let content_units = if view_box.is_some() {
        Units::UserSpaceOnUse
    } else {
        spec.content_units()
    };

    let needs_bbox = placement_units.is_obb() || content_units.is_obb();
    if needs_bbox && (bbox.is_empty() || !bbox.is_finite()) {
        return Err(ResolveError::EmptyBoundingBox {
            width: bbox.width,
            height: bbox.height,
        });
    }
    let relative_to_shape = Transform::from_bbox(bbox);

    let cell = spec.cell();
    if let Some(c) = cell.filter(|c| c.is_empty()) {
        match spec {
            PaintServerSpec::Pattern(p) => return Err(ResolveError::EmptyPatternCell { id: p.id.clone() }),
            PaintServerSpec::Mask(_) => {
                return Err(ResolveError::EmptyMaskRegion {
                    width: c.width,
                    height: c.height,
                });
            }
            PaintServerSpec::Gradient(_) | PaintServerSpec::ClipPath(_) => {}
        }
    }

    let placement_to_user = if placement_units.is_obb() {
        relative_to_shape
    } else {
        Transform::IDENTITY
    };

    let content_to_server = match (view_box, cell) {
        (Some((vb, aspect)), Some(cell)) => ViewportSpec::new(vb, cell, aspect).resolve()?,
        _ => match (content_units.is_obb(), placement_units.is_obb()) {
            (true, false) => relative_to_shape,
            (false, true) => relative_to_shape.inverse().ok_or(ResolveError::EmptyBoundingBox {
                width: bbox.width,
                height: bbox.height,
            })?,
            _ => Transform::IDENTITY,
        },
    };

    let chain = BakedTransformChain {
        shape_transform,
        placement_to_user,
        server_transform: spec.server_transform(),
        content_to_server,
        cell,
        bbox,
        placement_units,
        content_units,
        has_view_box: view_box.is_some(),
    };
    trace!(kind = spec.kind_name(), ?bbox, "resolved paint server chain");
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::{Align, Fit};
    use crate::types::Angle;
    use glam::dvec2;

    const EPS: f64 = 1e-9;

    fn pattern(units: Units, content_units: Units, rect: Rect) -> PatternSpec {
        PatternSpec {
            id: "p".into(),
            units,
            content_units,
            transform: Transform::IDENTITY,
            rect,
            view_box: None,
            aspect: AspectRatio::default(),
        }
    }

    #[test]
    fn units_parse_with_defaults() {
        use Units::*;
        assert_eq!(Units::parse(None, ObjectBoundingBox), ObjectBoundingBox);
        assert_eq!(Units::parse(Some("userSpaceOnUse"), ObjectBoundingBox), UserSpaceOnUse);
        assert_eq!(Units::parse(Some(" objectBoundingBox "), UserSpaceOnUse), ObjectBoundingBox);
        assert_eq!(Units::parse(Some("userspaceonuse"), ObjectBoundingBox), ObjectBoundingBox);
    }

    #[test]
    fn obb_gradient_maps_fractions_onto_bbox() {
        let spec: PaintServerSpec = GradientSpec {
            units: Units::ObjectBoundingBox,
            transform: Transform::IDENTITY,
            spread: Spread::Pad,
            geometry: GradientGeometry::DEFAULT_LINEAR,
        }
        .into();
        let chain = spec.resolve(Rect::new(10.0, 20.0, 40.0, 120.0), Transform::IDENTITY).unwrap();
        let [start, end] = GradientGeometry::DEFAULT_LINEAR.control_points();
        assert_eq!(chain.map_content_point(start), dvec2(10.0, 20.0));
        assert_eq!(chain.map_content_point(end), dvec2(50.0, 20.0));
        assert!(chain.is_shape_independent());
    }

    #[test]
    fn gradient_transform_applies_inside_the_bbox() {
        let spec: PaintServerSpec = GradientSpec {
            units: Units::ObjectBoundingBox,
            transform: Transform::rotate(Angle(90.0)),
            spread: Spread::Pad,
            geometry: GradientGeometry::DEFAULT_LINEAR,
        }
        .into();
        let shape = Transform::translate(100.0, 0.0);
        let chain = spec.resolve(Rect::new(0.0, 0.0, 10.0, 20.0), shape).unwrap();
        // (1, 0) turns to (0, 1), the bottom-left of the bbox
        assert!(chain.map_content_point(dvec2(1.0, 0.0)).abs_diff_eq(dvec2(100.0, 20.0), EPS));
    }

    #[test]
    fn user_space_gradient_ignores_bbox() {
        let spec: PaintServerSpec = GradientSpec {
            units: Units::UserSpaceOnUse,
            transform: Transform::IDENTITY,
            spread: Spread::Repeat,
            geometry: GradientGeometry::Linear { x1: 3.0, y1: 4.0, x2: 5.0, y2: 6.0 },
        }
        .into();
        // no OBB anywhere, so an empty bbox is fine
        let chain = spec.resolve(Rect::default(), Transform::scale(2.0, 2.0)).unwrap();
        assert_eq!(chain.map_content_point(dvec2(3.0, 4.0)), dvec2(6.0, 8.0));
    }

    #[test]
    fn obb_with_empty_bbox_is_an_error() {
        let spec: PaintServerSpec = pattern(Units::ObjectBoundingBox, Units::UserSpaceOnUse, Rect::new(0.0, 0.0, 0.5, 0.5)).into();
        let err = spec.resolve(Rect::new(0.0, 0.0, 0.0, 10.0), Transform::IDENTITY).unwrap_err();
        assert!(matches!(err, ResolveError::EmptyBoundingBox { width, .. } if width == 0.0));
    }

    #[test]
    fn empty_pattern_cell_is_an_error() {
        let spec: PaintServerSpec = pattern(Units::UserSpaceOnUse, Units::UserSpaceOnUse, Rect::new(0.0, 0.0, 0.0, 5.0)).into();
        let err = spec.resolve(Rect::new(0.0, 0.0, 10.0, 10.0), Transform::IDENTITY).unwrap_err();
        assert!(matches!(err, ResolveError::EmptyPatternCell { ref id } if id == "p"));
    }

    #[test]
    fn obb_content_in_user_cell() {
        let spec: PaintServerSpec = pattern(Units::UserSpaceOnUse, Units::ObjectBoundingBox, Rect::new(0.0, 0.0, 20.0, 20.0)).into();
        let chain = spec.resolve(Rect::new(10.0, 10.0, 40.0, 20.0), Transform::IDENTITY).unwrap();
        assert_eq!(chain.map_content_point(dvec2(0.5, 0.5)), dvec2(30.0, 20.0));
        assert!(!chain.is_shape_independent());
    }

    #[test]
    fn user_content_in_obb_cell() {
        let spec: PaintServerSpec = pattern(Units::ObjectBoundingBox, Units::UserSpaceOnUse, Rect::new(0.0, 0.0, 0.5, 0.5)).into();
        let bbox = Rect::new(10.0, 10.0, 40.0, 20.0);
        let chain = spec.resolve(bbox, Transform::IDENTITY).unwrap();
        // user content lands at its own coordinates
        assert!(chain.map_content_point(dvec2(12.0, 15.0)).abs_diff_eq(dvec2(12.0, 15.0), EPS));
        let corners = chain.device_cell_corners().unwrap();
        assert!(corners[0].abs_diff_eq(dvec2(10.0, 10.0), EPS));
        assert!(corners[2].abs_diff_eq(dvec2(30.0, 20.0), EPS));
        assert!(!chain.is_shape_independent());
    }

    #[test]
    fn view_box_fits_content_into_cell() {
        let mut p = pattern(Units::UserSpaceOnUse, Units::ObjectBoundingBox, Rect::new(5.0, 5.0, 10.0, 10.0));
        p.view_box = Some(Rect::new(0.0, 0.0, 100.0, 50.0));
        p.aspect = AspectRatio::new(Align::Mid, Align::Mid, Fit::Meet);
        let chain = PaintServerSpec::from(p).resolve(Rect::new(0.0, 0.0, 1.0, 1.0), Transform::IDENTITY).unwrap();
        // scale 0.1, centered vertically: 2.5 of padding
        assert!(chain.map_content_point(dvec2(0.0, 0.0)).abs_diff_eq(dvec2(5.0, 7.5), EPS));
        assert!(chain.map_content_point(dvec2(100.0, 50.0)).abs_diff_eq(dvec2(15.0, 12.5), EPS));
        assert!(chain.is_shape_independent());
    }

    #[test]
    fn degenerate_pattern_view_box_is_reported() {
        let mut p = pattern(Units::UserSpaceOnUse, Units::UserSpaceOnUse, Rect::new(0.0, 0.0, 10.0, 10.0));
        p.view_box = Some(Rect::new(0.0, 0.0, 0.0, 10.0));
        let err = PaintServerSpec::from(p).resolve(Rect::new(0.0, 0.0, 1.0, 1.0), Transform::IDENTITY).unwrap_err();
        assert!(matches!(err, ResolveError::ViewBox(_)));
    }

    #[test]
    fn chain_order_is_not_commutative() {
        // rotated shape + OBB placement + rotated patternTransform
        let mut p = pattern(Units::ObjectBoundingBox, Units::ObjectBoundingBox, Rect::new(0.0, 0.0, 1.0, 1.0));
        p.transform = Transform::rotate(Angle(90.0));
        let shape = Transform::rotate(Angle(45.0));
        let bbox = Rect::new(0.0, 0.0, 10.0, 20.0);
        let chain = PaintServerSpec::from(p).resolve(bbox, shape).unwrap();

        let expected = shape * Transform::from_bbox(bbox) * Transform::rotate(Angle(90.0));
        assert!(chain.content_to_device().approx_eq(&expected, EPS));
        let swapped = shape * Transform::rotate(Angle(90.0)) * Transform::from_bbox(bbox);
        assert!(!chain.content_to_device().approx_eq(&swapped, 1e-6));
    }

    #[test]
    fn clip_path_obb_content() {
        let spec: PaintServerSpec = ClipPathSpec {
            units: Units::ObjectBoundingBox,
            transform: Transform::IDENTITY,
        }
        .into();
        let chain = spec.resolve(Rect::new(10.0, 20.0, 30.0, 40.0), Transform::IDENTITY).unwrap();
        assert_eq!(chain.map_content_point(dvec2(1.0, 1.0)), dvec2(40.0, 60.0));
        assert!(chain.cell.is_none());
    }

    #[test]
    fn mask_default_region_grows_the_bbox() {
        let spec: PaintServerSpec = MaskSpec {
            units: Units::ObjectBoundingBox,
            content_units: Units::UserSpaceOnUse,
            rect: MaskSpec::DEFAULT_REGION,
        }
        .into();
        let chain = spec.resolve(Rect::new(0.0, 0.0, 100.0, 50.0), Transform::IDENTITY).unwrap();
        let corners = chain.device_cell_corners().unwrap();
        assert!(corners[0].abs_diff_eq(dvec2(-10.0, -5.0), EPS));
        assert!(corners[2].abs_diff_eq(dvec2(110.0, 55.0), EPS));
        assert!(chain.map_content_point(dvec2(42.0, 7.0)).abs_diff_eq(dvec2(42.0, 7.0), EPS));
    }

    #[test]
    fn empty_mask_region_is_an_error() {
        let spec: PaintServerSpec = MaskSpec {
            units: Units::UserSpaceOnUse,
            content_units: Units::UserSpaceOnUse,
            rect: Rect::new(0.0, 0.0, 50.0, 0.0),
        }
        .into();
        let err = spec.resolve(Rect::new(0.0, 0.0, 100.0, 50.0), Transform::IDENTITY).unwrap_err();
        assert!(matches!(err, ResolveError::EmptyMaskRegion { width, height } if width == 50.0 && height == 0.0));

        // an OBB region collapses with a zero fraction too
        let spec: PaintServerSpec = MaskSpec {
            units: Units::ObjectBoundingBox,
            content_units: Units::UserSpaceOnUse,
            rect: Rect::new(-0.1, -0.1, 0.0, 1.2),
        }
        .into();
        let err = spec.resolve(Rect::new(0.0, 0.0, 100.0, 50.0), Transform::IDENTITY).unwrap_err();
        assert!(matches!(err, ResolveError::EmptyMaskRegion { .. }));
    }

    #[test]
    fn kind_names() {
        let g = PaintServerSpec::from(GradientSpec {
            units: Units::ObjectBoundingBox,
            transform: Transform::IDENTITY,
            spread: Spread::default(),
            geometry: GradientGeometry::DEFAULT_RADIAL,
        });
        assert_eq!(g.kind_name(), "radialGradient");
        assert_eq!(Spread::parse(Some("reflect")), Spread::Reflect);
        assert_eq!(Spread::parse(Some("bogus")), Spread::Pad);
    }
}
