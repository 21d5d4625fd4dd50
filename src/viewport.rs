//! viewBox parsing and the viewBox-to-viewport transform

use std::str::FromStr;

use pest::Parser;

use crate::aspect::{AspectRatio, Fit};
use crate::errors::{DegenerateViewBoxError, ViewBoxSyntaxError};
use crate::log::{trace, warn};
use crate::transform::Transform;
use crate::types::Rect;
use crate::{AttributeParser, Rule};

/// A parsed `viewBox` attribute: `min-x min-y width height`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBox(pub Rect);

impl ViewBox {
    /// Four numbers separated by whitespace and/or commas.
    ///
    /// A zero or negative size parses fine; it only fails once a transform
    /// is requested.
    pub fn parse(value: &str) -> Result<ViewBox, ViewBoxSyntaxError> {
        let malformed = || ViewBoxSyntaxError { value: value.to_string() };

        let pairs = AttributeParser::parse(Rule::view_box, value).map_err(|_| malformed())?;
        let numbers = pairs
            .flat_map(|p| p.into_inner())
            .filter(|p| p.as_rule() == Rule::number)
            .map(|p| p.as_str().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(malformed)?;

        let &[x, y, width, height] = numbers.as_slice() else {
            return Err(malformed());
        };
        Ok(ViewBox(Rect::new(x, y, width, height)))
    }

    pub fn rect(&self) -> Rect {
        self.0
    }

    pub fn is_degenerate(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for ViewBox {
    type Err = ViewBoxSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewBox::parse(s)
    }
}

/// Everything needed to map a viewBox onto a viewport.
///
/// Built once per viewport-establishing element (root `<svg>`, nested
/// `<svg>`, `<pattern viewBox>`); the viewport rect is in the parent's
/// user space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportSpec {
    pub view_box: Rect,
    pub viewport: Rect,
    pub aspect: AspectRatio,
}

impl ViewportSpec {
    pub fn new(view_box: Rect, viewport: Rect, aspect: AspectRatio) -> Self {
        ViewportSpec { view_box, viewport, aspect }
    }

    /// `translate(align) * scale * translate(-viewBox.origin)`.
    ///
    /// Under `meet` the viewBox lands fully inside the viewport, under
    /// `slice` it covers it; `none` stretches each axis on its own.
    pub fn resolve(&self) -> Result<Transform, DegenerateViewBoxError> {
        let vb = self.view_box;
        let vp = self.viewport;
        if vb.is_empty() || !vb.is_finite() {
            return Err(DegenerateViewBoxError { width: vb.width, height: vb.height });
        }

        let sx = vp.width / vb.width;
        let sy = vp.height / vb.height;
        let (sx, sy) = match self.aspect.fit {
            Fit::None => (sx, sy),
            Fit::Meet => {
                let s = sx.min(sy);
                (s, s)
            }
            Fit::Slice => {
                let s = sx.max(sy);
                (s, s)
            }
        };

        let dx = self.aspect.x_align.offset(vp.width, vb.width * sx);
        let dy = self.aspect.y_align.offset(vp.height, vb.height * sy);
        trace!(sx, sy, dx, dy, "viewport transform");

        Ok(Transform::translate(vp.x + dx, vp.y + dy)
            * Transform::scale(sx, sy)
            * Transform::translate(-vb.x, -vb.y))
    }

    /// [`resolve`](Self::resolve), with identity standing in for a
    /// degenerate viewBox
    pub fn resolve_or_identity(&self) -> Transform {
        self.resolve().unwrap_or_else(|e| {
            warn!(width = e.width, height = e.height, "degenerate viewBox, using identity");
            Transform::IDENTITY
        })
    }

    /// Where the viewBox lands in the viewport's space
    pub fn placed_view_box(&self) -> Result<Rect, DegenerateViewBoxError> {
        Ok(self.resolve()?.map_rect(self.view_box))
    }
}
