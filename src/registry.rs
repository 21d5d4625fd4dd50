//! Paint server definitions keyed by id, `url(#id)` references and `href`
//! attribute inheritance.
//!
//! Definitions are immutable once inserted and shared as `Rc`, so any number
//! of shapes can refer to the same one while the registry keeps ownership.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::str::FromStr;

use crate::aspect::AspectRatio;
use crate::document::UserSpace;
use crate::errors::{LengthError, ResolveError, UnresolvedReferenceError};
use crate::log::{debug, warn};
use crate::paint_server::{
    ClipPathSpec, GradientGeometry, GradientSpec, MaskSpec, PaintServerSpec, PatternSpec, Spread, Units,
};
use crate::transform::Transform;
use crate::transform_list::parse_transform;
use crate::types::Rect;
use crate::units::{Axis, LengthToken};
use crate::viewport::ViewBox;

// ============================================================================
// References
// ============================================================================

/// `url(#id)` with an optional fallback paint, as found in `fill`/`stroke`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaintReference {
    pub id: String,
    /// Raw fallback token (`none`, a color, `currentColor`...)
    pub fallback: Option<String>,
}

impl PaintReference {
    pub fn parse(value: &str) -> Result<PaintReference, UnresolvedReferenceError> {
        let malformed = || UnresolvedReferenceError::Malformed { value: value.to_string() };

        let rest = value.trim_start().strip_prefix("url(").ok_or_else(malformed)?;
        let close = rest.find(')').ok_or_else(malformed)?;
        let (inner, tail) = rest.split_at(close);

        let inner = inner.trim();
        let inner = strip_quotes(inner, '"')
            .or_else(|| strip_quotes(inner, '\''))
            .unwrap_or(inner);
        let id = inner.strip_prefix('#').ok_or_else(malformed)?.trim();
        if id.is_empty() {
            return Err(malformed());
        }

        let fallback = tail[1..].trim();
        Ok(PaintReference {
            id: id.to_string(),
            fallback: (!fallback.is_empty()).then(|| fallback.to_string()),
        })
    }
}

fn strip_quotes(s: &str, quote: char) -> Option<&str> {
    s.strip_prefix(quote)?.strip_suffix(quote)
}

impl FromStr for PaintReference {
    type Err = UnresolvedReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaintReference::parse(s)
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Element kind of a paint server definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServerKind {
    LinearGradient,
    RadialGradient,
    Pattern,
    ClipPath,
    Mask,
}

impl ServerKind {
    pub fn element_name(self) -> &'static str {
        match self {
            ServerKind::LinearGradient => "linearGradient",
            ServerKind::RadialGradient => "radialGradient",
            ServerKind::Pattern => "pattern",
            ServerKind::ClipPath => "clipPath",
            ServerKind::Mask => "mask",
        }
    }

    pub fn is_gradient(self) -> bool {
        matches!(self, ServerKind::LinearGradient | ServerKind::RadialGradient)
    }

    /// Whether `attr` of a `self` element may come from an `href` target of kind `from`
    fn inherits(self, from: ServerKind, attr: &str) -> bool {
        match self {
            ServerKind::Pattern => from == ServerKind::Pattern,
            ServerKind::LinearGradient | ServerKind::RadialGradient => match attr {
                "gradientUnits" | "gradientTransform" | "spreadMethod" => from.is_gradient(),
                _ => from == self,
            },
            ServerKind::ClipPath | ServerKind::Mask => false,
        }
    }
}

/// A paint server element as declared: kind, raw attributes, optional `href`
#[derive(Clone, Debug, PartialEq)]
pub struct PaintServerDef {
    pub id: String,
    pub kind: ServerKind,
    pub attributes: HashMap<String, String>,
    /// Target id, without the leading `#`
    pub href: Option<String>,
}

impl PaintServerDef {
    pub fn new(id: impl Into<String>, kind: ServerKind) -> Self {
        PaintServerDef {
            id: id.into(),
            kind,
            attributes: HashMap::new(),
            href: None,
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Accepts `#id` or a bare id
    #[must_use]
    pub fn with_href(mut self, href: &str) -> Self {
        let target = href.trim();
        self.href = Some(target.strip_prefix('#').unwrap_or(target).to_string());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Arena of paint server definitions owned by one document load
#[derive(Debug, Default)]
pub struct PaintServerRegistry {
    defs: HashMap<String, Rc<PaintServerDef>>,
}

impl PaintServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, returning the one it replaces
    pub fn insert(&mut self, def: PaintServerDef) -> Option<Rc<PaintServerDef>> {
        let previous = self.defs.insert(def.id.clone(), Rc::new(def));
        if let Some(prev) = &previous {
            debug!(id = %prev.id, "paint server redefined");
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<Rc<PaintServerDef>> {
        self.defs.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn lookup(&self, reference: &PaintReference) -> Result<Rc<PaintServerDef>, UnresolvedReferenceError> {
        self.get(&reference.id).ok_or_else(|| UnresolvedReferenceError::NotFound {
            id: reference.id.clone(),
        })
    }

    /// `def` followed by its `href` ancestors, nearest first.
    ///
    /// A dangling `href` ends the chain; a loop is an error.
    pub fn href_chain(&self, def: &Rc<PaintServerDef>) -> Result<Vec<Rc<PaintServerDef>>, UnresolvedReferenceError> {
        let mut chain = vec![Rc::clone(def)];
        let mut seen = HashSet::from([def.id.as_str()]);
        let mut current = def;

        while let Some(target) = current.href.as_deref() {
            if !seen.insert(target) {
                return Err(UnresolvedReferenceError::Cycle { id: def.id.clone() });
            }
            let Some(next) = self.defs.get(target) else {
                warn!(id = %current.id, href = target, "href target not found, ignoring");
                break;
            };
            chain.push(Rc::clone(next));
            current = next;
        }
        Ok(chain)
    }

    /// Look `name` up on `chain[0]`, then on the ancestors it may inherit from
    pub fn inherited_attr<'c>(chain: &'c [Rc<PaintServerDef>], name: &str) -> Option<&'c str> {
        let (first, ancestors) = chain.split_first()?;
        first.attr(name).or_else(|| {
            ancestors
                .iter()
                .filter(|a| first.kind.inherits(a.kind, name))
                .find_map(|a| a.attr(name))
        })
    }

    /// Resolve a reference into a spec, with percentages taken in `space`
    pub fn build(&self, reference: &PaintReference, space: &UserSpace) -> Result<PaintServerSpec, ResolveError> {
        let def = self.lookup(reference)?;
        let chain = self.href_chain(&def)?;
        let attrs = Attrs { chain: &chain, space };

        let spec = match def.kind {
            ServerKind::LinearGradient | ServerKind::RadialGradient => build_gradient(&attrs, def.kind)?,
            ServerKind::Pattern => build_pattern(&attrs, &def.id)?,
            ServerKind::ClipPath => PaintServerSpec::ClipPath(ClipPathSpec {
                units: Units::parse(attrs.get("clipPathUnits"), Units::UserSpaceOnUse),
                transform: attrs.transform("transform")?,
            }),
            ServerKind::Mask => build_mask(&attrs)?,
        };
        debug!(id = %reference.id, kind = def.kind.element_name(), "built paint server");
        Ok(spec)
    }

    /// A `fill`/`stroke` reference: gradients and patterns only
    pub fn build_paint(&self, reference: &PaintReference, space: &UserSpace) -> Result<PaintServerSpec, ResolveError> {
        self.build_expecting(reference, space, "paint server", |k| k.is_gradient() || k == ServerKind::Pattern)
    }

    pub fn build_clip_path(&self, reference: &PaintReference, space: &UserSpace) -> Result<PaintServerSpec, ResolveError> {
        self.build_expecting(reference, space, "clipPath", |k| k == ServerKind::ClipPath)
    }

    pub fn build_mask(&self, reference: &PaintReference, space: &UserSpace) -> Result<PaintServerSpec, ResolveError> {
        self.build_expecting(reference, space, "mask", |k| k == ServerKind::Mask)
    }

    fn build_expecting(
        &self,
        reference: &PaintReference,
        space: &UserSpace,
        expected: &'static str,
        accept: impl Fn(ServerKind) -> bool,
    ) -> Result<PaintServerSpec, ResolveError> {
        let def = self.lookup(reference)?;
        if !accept(def.kind) {
            return Err(UnresolvedReferenceError::WrongKind {
                id: reference.id.clone(),
                expected,
                found: def.kind.element_name(),
            }
            .into());
        }
        self.build(reference, space)
    }
}

// ============================================================================
// Spec Building
// ============================================================================

/// Attribute access along an href chain, plus length resolution
struct Attrs<'a> {
    chain: &'a [Rc<PaintServerDef>],
    space: &'a UserSpace,
}

impl Attrs<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        PaintServerRegistry::inherited_attr(self.chain, name)
    }

    fn transform(&self, name: &str) -> Result<Transform, ResolveError> {
        match self.get(name) {
            Some(text) => Ok(parse_transform(text)?),
            None => Ok(Transform::IDENTITY),
        }
    }

    /// A coordinate in `units`: bounding box fractions or user-space lengths
    fn coord(&self, name: &str, default: &str, axis: Axis, units: Units) -> Result<f64, LengthError> {
        let value = self.get(name).unwrap_or(default);
        match units {
            Units::UserSpaceOnUse => Ok(self.space.resolve_length(value, axis)?.raw()),
            Units::ObjectBoundingBox => {
                let token: LengthToken = value.parse()?;
                Ok(if token.is_percent() {
                    token.value / 100.0
                } else {
                    self.space.units().convert(token, 0.0).raw()
                })
            }
        }
    }

    fn rect(&self, defaults: [&str; 4], units: Units) -> Result<Rect, LengthError> {
        Ok(Rect::new(
            self.coord("x", defaults[0], Axis::Horizontal, units)?,
            self.coord("y", defaults[1], Axis::Vertical, units)?,
            self.coord("width", defaults[2], Axis::Horizontal, units)?,
            self.coord("height", defaults[3], Axis::Vertical, units)?,
        ))
    }
}

fn build_gradient(attrs: &Attrs<'_>, kind: ServerKind) -> Result<PaintServerSpec, ResolveError> {
    let units = Units::parse(attrs.get("gradientUnits"), Units::ObjectBoundingBox);

    let geometry = if kind == ServerKind::LinearGradient {
        GradientGeometry::Linear {
            x1: attrs.coord("x1", "0%", Axis::Horizontal, units)?,
            y1: attrs.coord("y1", "0%", Axis::Vertical, units)?,
            x2: attrs.coord("x2", "100%", Axis::Horizontal, units)?,
            y2: attrs.coord("y2", "0%", Axis::Vertical, units)?,
        }
    } else {
        let cx = attrs.coord("cx", "50%", Axis::Horizontal, units)?;
        let cy = attrs.coord("cy", "50%", Axis::Vertical, units)?;
        let r = attrs.coord("r", "50%", Axis::Other, units)?;
        // the focus defaults to the resolved center
        let fx = match attrs.get("fx") {
            Some(_) => attrs.coord("fx", "", Axis::Horizontal, units)?,
            None => cx,
        };
        let fy = match attrs.get("fy") {
            Some(_) => attrs.coord("fy", "", Axis::Vertical, units)?,
            None => cy,
        };
        GradientGeometry::Radial { cx, cy, r, fx, fy }
    };

    Ok(PaintServerSpec::Gradient(GradientSpec {
        units,
        transform: attrs.transform("gradientTransform")?,
        spread: Spread::parse(attrs.get("spreadMethod")),
        geometry,
    }))
}

fn build_pattern(attrs: &Attrs<'_>, id: &str) -> Result<PaintServerSpec, ResolveError> {
    let units = Units::parse(attrs.get("patternUnits"), Units::ObjectBoundingBox);
    let view_box = attrs.get("viewBox").map(ViewBox::parse).transpose()?;

    Ok(PaintServerSpec::Pattern(PatternSpec {
        id: id.to_string(),
        units,
        content_units: Units::parse(attrs.get("patternContentUnits"), Units::UserSpaceOnUse),
        transform: attrs.transform("patternTransform")?,
        rect: attrs.rect(["0", "0", "0", "0"], units)?,
        view_box: view_box.map(|vb| vb.rect()),
        aspect: AspectRatio::from_attr(attrs.get("preserveAspectRatio")),
    }))
}

fn build_mask(attrs: &Attrs<'_>) -> Result<PaintServerSpec, ResolveError> {
    let units = Units::parse(attrs.get("maskUnits"), Units::ObjectBoundingBox);
    Ok(PaintServerSpec::Mask(MaskSpec {
        units,
        content_units: Units::parse(attrs.get("maskContentUnits"), Units::UserSpaceOnUse),
        rect: attrs.rect(["-10%", "-10%", "120%", "120%"], units)?,
    }))
}
