//! Error types with rich diagnostics using miette
//!
//! Every failure the core can report is a value; nothing here unwinds
//! through the caller. Callers pick the fallback (identity transform,
//! plain color, `none`) themselves.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

// ============================================================================
// Length Errors
// ============================================================================

/// Errors produced while resolving a length token such as `12.5mm`
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum LengthError {
    #[error("empty length value")]
    #[diagnostic(
        code(svgbake::length::empty_value),
        help("a number with an optional unit suffix was expected")
    )]
    EmptyValue,

    #[error("invalid unit `{unit}` in `{token}`")]
    #[diagnostic(
        code(svgbake::length::invalid_unit),
        help("supported units: px, pt, pc, in, mm, cm, em, ex, %")
    )]
    InvalidUnit { token: String, unit: String },

    #[error("invalid number in `{token}`")]
    #[diagnostic(code(svgbake::length::invalid_number))]
    InvalidNumber { token: String },
}

// ============================================================================
// Transform Errors
// ============================================================================

/// A `transform` attribute that failed to parse.
///
/// One malformed primitive invalidates the whole list.
#[derive(Error, Diagnostic, Debug)]
#[error("invalid transform list: {message}")]
#[diagnostic(code(svgbake::transform::syntax))]
pub struct TransformSyntaxError {
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("parsing stopped here")]
    pub span: SourceSpan,
}

impl TransformSyntaxError {
    pub fn new(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let len = usize::from(offset < source.len());
        Self {
            message: message.into(),
            src: NamedSource::new("transform", source.to_string()),
            span: (offset, len).into(),
        }
    }

    /// Byte offset of the failure inside the attribute text
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

// ============================================================================
// ViewBox Errors
// ============================================================================

/// A viewBox whose width or height is zero or negative.
///
/// The scale is undefined; callers substitute the identity transform.
#[derive(Error, Diagnostic, Debug, Clone, Copy, PartialEq)]
#[error("degenerate viewBox: {width} x {height}")]
#[diagnostic(
    code(svgbake::viewport::degenerate_view_box),
    help("viewBox width and height must both be positive")
)]
pub struct DegenerateViewBoxError {
    pub width: f64,
    pub height: f64,
}

/// A `viewBox` attribute that is not four numbers
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
#[error("malformed viewBox `{value}`")]
#[diagnostic(
    code(svgbake::viewport::malformed_view_box),
    help("expected four numbers: min-x min-y width height")
)]
pub struct ViewBoxSyntaxError {
    pub value: String,
}

// ============================================================================
// Reference Errors
// ============================================================================

/// A paint-server `url(#id)` reference without a usable target
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum UnresolvedReferenceError {
    #[error("malformed paint reference `{value}`")]
    #[diagnostic(
        code(svgbake::reference::malformed),
        help("expected `url(#id)` optionally followed by a fallback paint")
    )]
    Malformed { value: String },

    #[error("no paint server with id `{id}`")]
    #[diagnostic(code(svgbake::reference::not_found))]
    NotFound { id: String },

    #[error("paint server `{id}` references itself through href")]
    #[diagnostic(code(svgbake::reference::cycle))]
    Cycle { id: String },

    #[error("`{id}` is a {found}, expected a {expected}")]
    #[diagnostic(code(svgbake::reference::wrong_kind))]
    WrongKind {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
}

// ============================================================================
// Resolution Errors
// ============================================================================

/// Any failure while resolving coordinate spaces
#[derive(Error, Diagnostic, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Length(#[from] LengthError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transform(#[from] TransformSyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ViewBox(#[from] DegenerateViewBoxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ViewBoxSyntax(#[from] ViewBoxSyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reference(#[from] UnresolvedReferenceError),

    #[error("objectBoundingBox units need a non-empty bounding box, got {width} x {height}")]
    #[diagnostic(code(svgbake::paint_server::empty_bounding_box))]
    EmptyBoundingBox { width: f64, height: f64 },

    #[error("pattern `{id}` has an empty tile")]
    #[diagnostic(code(svgbake::paint_server::empty_pattern_cell))]
    EmptyPatternCell { id: String },

    #[error("mask region is empty, got {width} x {height}")]
    #[diagnostic(
        code(svgbake::paint_server::empty_mask_region),
        help("an empty mask region hides the masked element entirely")
    )]
    EmptyMaskRegion { width: f64, height: f64 },
}

// ============================================================================
// Bake Errors
// ============================================================================

/// Errors that occur while baking or stamping a pattern tile
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum BakeError {
    #[error("paint server has no pattern cell to bake")]
    #[diagnostic(code(svgbake::bake::missing_cell))]
    MissingCell,

    #[error("cannot allocate a {width}x{height} tile")]
    #[diagnostic(code(svgbake::bake::allocation_failed))]
    AllocationFailed { width: u32, height: u32 },

    #[error("pattern cell maps to a degenerate device area")]
    #[diagnostic(
        code(svgbake::bake::degenerate_transform),
        help("the shape, placement or pattern transform collapses the cell")
    )]
    DegenerateTransform,

    #[error("target outline is empty or not finite")]
    #[diagnostic(code(svgbake::bake::invalid_outline))]
    InvalidOutline,

    #[error("tile was baked for another bounding box")]
    #[diagnostic(
        code(svgbake::bake::shape_dependent_tile),
        help("content and placement units differ, so the tile must be baked again for this shape")
    )]
    ShapeDependentTile,

    #[error("outline spans {count} pattern cells")]
    #[diagnostic(
        code(svgbake::bake::too_many_cells),
        help("direct rendering repeats content per cell; bake a tile instead")
    )]
    TooManyCells { count: u64 },
}
