//! Document resolution context and nested user spaces.
//!
//! The document's output unit is the point (1/72 in). The root user space is
//! CSS px at the context's ppi, so `document_transform()` is `scale(72 / ppi)`
//! and doubling ppi halves the size of a physical viewport.

use glam::DVec2;

use crate::aspect::AspectRatio;
use crate::errors::{LengthError, ResolveError, TransformSyntaxError};
use crate::log::{debug, warn};
use crate::transform::Transform;
use crate::transform_list::parse_transform;
use crate::types::{Length, NumericError, Rect, Size, positive};
use crate::units::{Axis, DEFAULT_FONT_SIZE, UnitResolver};
use crate::viewport::{ViewBox, ViewportSpec};

/// Points per inch of the document output space
pub const POINTS_PER_INCH: f64 = 72.0;

/// Supplied once per document load
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolutionContext {
    viewport: Rect,
    ppi: f64,
    font_size: f64,
}

impl ResolutionContext {
    /// `viewport` is the target rect in px; `ppi` must be finite and positive
    pub fn try_new(viewport: Rect, ppi: f64) -> Result<Self, NumericError> {
        Ok(ResolutionContext {
            viewport,
            ppi: positive(ppi)?,
            font_size: DEFAULT_FONT_SIZE,
        })
    }

    pub fn with_font_size(mut self, font_size: f64) -> Result<Self, NumericError> {
        self.font_size = positive(font_size)?;
        Ok(self)
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn ppi(&self) -> f64 {
        self.ppi
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn units(&self) -> UnitResolver {
        UnitResolver::new(self.ppi).with_font_size(self.font_size)
    }

    /// Root user space (px) to document space (pt)
    pub fn document_transform(&self) -> Transform {
        let s = POINTS_PER_INCH / self.ppi;
        Transform::scale(s, s)
    }
}

/// Raw attributes of a viewport-establishing element (`<svg>`)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SvgViewportAttrs<'a> {
    pub x: Option<&'a str>,
    pub y: Option<&'a str>,
    pub width: Option<&'a str>,
    pub height: Option<&'a str>,
    pub view_box: Option<&'a str>,
    pub preserve_aspect_ratio: Option<&'a str>,
    pub transform: Option<&'a str>,
}

/// One established coordinate system.
///
/// Carries the cumulative transform into document space, the size that `%`
/// lengths refer to and the unit resolver of the document.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UserSpace {
    transform: Transform,
    viewport: Size,
    units: UnitResolver,
    rendered: bool,
}

impl UserSpace {
    /// The root `<svg>`; width and height default to `100%` of the context viewport
    pub fn root(ctx: &ResolutionContext, attrs: &SvgViewportAttrs<'_>) -> Result<UserSpace, ResolveError> {
        let parent = UserSpace {
            transform: ctx.document_transform(),
            viewport: ctx.viewport().size(),
            units: ctx.units(),
            rendered: true,
        };
        let width = parent.length_attr(attrs.width, "100%", Axis::Horizontal)?;
        let height = parent.length_attr(attrs.height, "100%", Axis::Vertical)?;
        debug!(width, height, ppi = ctx.ppi(), "root viewport");
        if attrs.x.is_some() || attrs.y.is_some() {
            warn!("x and y on the outermost <svg> have no effect");
        }

        parent.establish(Rect::new(0.0, 0.0, width, height), attrs)
    }

    /// A nested `<svg>`: `x, y, width, height` resolve in `self`
    pub fn nested(&self, attrs: &SvgViewportAttrs<'_>) -> Result<UserSpace, ResolveError> {
        let x = self.length_attr(attrs.x, "0", Axis::Horizontal)?;
        let y = self.length_attr(attrs.y, "0", Axis::Vertical)?;
        let width = self.length_attr(attrs.width, "100%", Axis::Horizontal)?;
        let height = self.length_attr(attrs.height, "100%", Axis::Vertical)?;

        self.establish(Rect::new(x, y, width, height), attrs)
    }

    fn establish(&self, viewport: Rect, attrs: &SvgViewportAttrs<'_>) -> Result<UserSpace, ResolveError> {
        let own = match attrs.transform {
            Some(text) => parse_transform(text)?,
            None => Transform::IDENTITY,
        };

        let (inner, reference) = match attrs.view_box {
            Some(value) => {
                let view_box = ViewBox::parse(value)?;
                let aspect = AspectRatio::from_attr(attrs.preserve_aspect_ratio);
                let spec = ViewportSpec::new(view_box.rect(), viewport, aspect);
                let reference = if view_box.is_degenerate() {
                    viewport.size()
                } else {
                    view_box.rect().size()
                };
                (spec.resolve_or_identity(), reference)
            }
            None => (Transform::translate(viewport.x, viewport.y), viewport.size()),
        };

        Ok(UserSpace {
            transform: self.transform * own * inner,
            viewport: reference,
            ..*self
        })
    }

    /// Child space of an element with a `transform` attribute
    pub fn with_transform_attr(&self, text: &str) -> Result<UserSpace, TransformSyntaxError> {
        Ok(self.with_transform(parse_transform(text)?))
    }

    /// Child space: `parent * child`
    pub fn with_transform(&self, child: Transform) -> UserSpace {
        UserSpace {
            transform: self.transform * child,
            ..*self
        }
    }

    /// Child space of an element with a `display` value.
    ///
    /// `display: none` on any ancestor hides the whole subtree, even when a
    /// descendant sets another value.
    pub fn with_display(&self, display: Option<&str>) -> UserSpace {
        let hidden = display.is_some_and(|d| d.trim().eq_ignore_ascii_case("none"));
        if hidden && self.rendered {
            debug!("display: none, subtree hidden");
        }
        UserSpace {
            rendered: self.rendered && !hidden,
            ..*self
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Reference size for `%` lengths
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn units(&self) -> UnitResolver {
        self.units
    }

    pub fn resolve_length(&self, token: &str, axis: Axis) -> Result<Length, LengthError> {
        self.units.resolve_axis(token, axis, self.viewport)
    }

    pub fn resolve_rect(&self, x: &str, y: &str, width: &str, height: &str) -> Result<Rect, LengthError> {
        Ok(Rect::new(
            self.resolve_length(x, Axis::Horizontal)?.raw(),
            self.resolve_length(y, Axis::Vertical)?.raw(),
            self.resolve_length(width, Axis::Horizontal)?.raw(),
            self.resolve_length(height, Axis::Vertical)?.raw(),
        ))
    }

    /// User space point to document space
    pub fn map_point(&self, p: DVec2) -> DVec2 {
        self.transform.map_point(p)
    }

    /// An optional attribute with its SVG initial value
    pub fn length_attr(&self, value: Option<&str>, default: &str, axis: Axis) -> Result<f64, LengthError> {
        Ok(self.resolve_length(value.unwrap_or(default), axis)?.raw())
    }
}

impl Default for UserSpace {
    fn default() -> Self {
        UserSpace {
            transform: Transform::IDENTITY,
            viewport: Size::new(0.0, 0.0),
            units: UnitResolver::new(POINTS_PER_INCH),
            rendered: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    const EPS: f64 = 1e-9;

    fn ctx(ppi: f64) -> ResolutionContext {
        ResolutionContext::try_new(Rect::new(0.0, 0.0, 600.0, 400.0), ppi).unwrap()
    }

    fn attrs<'a>(width: &'a str, height: &'a str, view_box: &'a str) -> SvgViewportAttrs<'a> {
        SvgViewportAttrs {
            width: Some(width),
            height: Some(height),
            view_box: Some(view_box),
            ..Default::default()
        }
    }

    #[test]
    fn try_new_rejects_bad_ppi() {
        let vp = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(ResolutionContext::try_new(vp, 0.0), Err(NumericError::Zero));
        assert_eq!(ResolutionContext::try_new(vp, -72.0), Err(NumericError::Negative));
        assert_eq!(ResolutionContext::try_new(vp, f64::NAN), Err(NumericError::NaN));
        assert!(ctx(72.0).with_font_size(0.0).is_err());
    }

    #[test]
    fn ppi_doubling_halves_document_size() {
        let a = attrs("10px", "20px", "0 0 10 20");
        let at72 = UserSpace::root(&ctx(72.0), &a).unwrap();
        let at144 = UserSpace::root(&ctx(144.0), &a).unwrap();
        assert!(at72.transform().approx_eq(&Transform::IDENTITY, EPS));
        assert!(at144.transform().approx_eq(&Transform::scale(0.5, 0.5), EPS));
    }

    #[test]
    fn percentages_under_view_box_use_view_box_size() {
        let space = UserSpace::root(&ctx(72.0), &attrs("10px", "20px", "60 70 20 40")).unwrap();
        let r = space.resolve_rect("320%", "185%", "60%", "80%").unwrap();
        assert_eq!(r, Rect::new(64.0, 74.0, 12.0, 32.0));
        assert!(space.map_point(dvec2(r.x, r.y)).abs_diff_eq(dvec2(2.0, 2.0), EPS));
    }

    #[test]
    fn missing_size_defaults_to_full_viewport() {
        let space = UserSpace::root(&ctx(72.0), &SvgViewportAttrs::default()).unwrap();
        assert_eq!(space.viewport(), Size::new(600.0, 400.0));
        assert_eq!(space.transform(), Transform::IDENTITY);
    }

    #[test]
    fn nested_without_view_box_translates() {
        let root = UserSpace::root(&ctx(72.0), &SvgViewportAttrs::default()).unwrap();
        let nested = root
            .nested(&SvgViewportAttrs {
                x: Some("10%"),
                y: Some("5"),
                width: Some("50%"),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(nested.viewport(), Size::new(300.0, 400.0));
        assert_eq!(nested.map_point(dvec2(0.0, 0.0)), dvec2(60.0, 5.0));
    }

    #[test]
    fn degenerate_view_box_falls_back_to_identity() {
        let space = UserSpace::root(&ctx(72.0), &attrs("10", "20", "0 0 0 20")).unwrap();
        assert_eq!(space.transform(), Transform::IDENTITY);
        assert_eq!(space.viewport(), Size::new(10.0, 20.0));
    }

    #[test]
    fn errors_propagate() {
        let c = ctx(72.0);
        assert!(matches!(
            UserSpace::root(&c, &attrs("10qq", "20", "0 0 1 1")),
            Err(ResolveError::Length(LengthError::InvalidUnit { .. }))
        ));
        assert!(matches!(
            UserSpace::root(&c, &attrs("10", "20", "0 0 1")),
            Err(ResolveError::ViewBoxSyntax(_))
        ));
        let bad_transform = SvgViewportAttrs { transform: Some("scale(2"), ..Default::default() };
        assert!(matches!(UserSpace::root(&c, &bad_transform), Err(ResolveError::Transform(_))));
    }

    #[test]
    fn group_transforms_compose_parent_first() {
        let root = UserSpace::root(&ctx(72.0), &attrs("10px", "20px", "0 0 10 20")).unwrap();
        let shape = root.with_transform_attr("translate(10,10)").unwrap().with_transform_attr("scale(2, 1)").unwrap();
        assert!(shape.map_point(dvec2(10.0, 20.0)).abs_diff_eq(dvec2(30.0, 30.0), EPS));
        assert!(root.with_transform_attr("translate(1").is_err());
    }

    #[test]
    fn display_none_hides_the_subtree() {
        let root = UserSpace::default();
        assert!(root.is_rendered());
        let hidden = root.with_display(Some(" None "));
        assert!(!hidden.is_rendered());
        assert!(!hidden.with_display(Some("inline")).is_rendered());
        assert!(root.with_display(Some("block")).with_display(None).is_rendered());
    }
}
