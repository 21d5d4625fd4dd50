//! SVG coordinate resolution.
//!
//! Turns length tokens, `viewBox`/`preserveAspectRatio` pairs and `transform`
//! lists into affine transforms, resolves the coordinate spaces of gradients,
//! patterns, clip paths and masks against a consuming shape, and bakes
//! pattern content into tiles that can be stamped onto any shape.

use pest_derive::Parser;

pub mod aspect;
pub mod document;
pub mod errors;
pub mod log;
pub mod paint_server;
pub mod pattern;
pub mod registry;
pub mod transform;
pub mod transform_list;
pub mod types;
pub mod units;
pub mod viewport;

/// Lengths, viewBox values and transform lists
#[derive(Parser)]
#[grammar = "attributes.pest"]
pub struct AttributeParser;

pub use aspect::{Align, AspectRatio, Fit};
pub use document::{ResolutionContext, SvgViewportAttrs, UserSpace};
pub use errors::{
    BakeError, DegenerateViewBoxError, LengthError, ResolveError, TransformSyntaxError, UnresolvedReferenceError,
    ViewBoxSyntaxError,
};
pub use paint_server::{
    BakedTransformChain, ClipPathSpec, GradientGeometry, GradientSpec, MaskSpec, PaintServerSpec, PatternSpec,
    ServerSpace, Spread, Units,
};
pub use pattern::{PaintCommand, PatternTile, PatternTileBaker};
pub use registry::{PaintReference, PaintServerDef, PaintServerRegistry, ServerKind};
pub use transform::Transform;
pub use transform_list::{TransformList, TransformOp, parse_transform};
pub use types::{Angle, Length, NumericError, Rect, Size};
pub use units::{Axis, LengthToken, Unit, UnitResolver};
pub use viewport::{ViewBox, ViewportSpec};

#[cfg(test)]
mod tests {
    use super::*;
    use pest::Parser;

    #[test]
    fn parse_single_primitive() {
        let input = "translate(10)";
        let result = AttributeParser::parse(Rule::transform_list, input);
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn parse_comma_separated_list() {
        let input = "translate(10,10), scale(2, 1)";
        let result = AttributeParser::parse(Rule::transform_list, input);
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn parse_space_before_paren() {
        // Whitespace is allowed between the keyword and its argument list
        let input = "matrix (1 1 0 0 1, 3)";
        let result = AttributeParser::parse(Rule::transform_list, input);
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn parse_no_separator_between_primitives() {
        let input = "translate(1)scale(0.5)";
        let result = AttributeParser::parse(Rule::transform_list, input);
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn parse_number_rule() {
        for input in ["1", "-1.5", "+.5", "1e3", "2E-2", "3."] {
            let result = AttributeParser::parse(Rule::number, input);
            assert!(result.is_ok(), "Failed to parse number {input:?}: {:?}", result.err());
            assert_eq!(result.unwrap().as_str(), input);
        }
    }

    #[test]
    fn number_stops_before_dangling_exponent() {
        // "2e" is the number 2 followed by junk; the atomic rule must not eat the e
        let pair = AttributeParser::parse(Rule::number, "2em").unwrap().next().unwrap();
        assert_eq!(pair.as_str(), "2");
    }

    #[test]
    fn parse_length_rule() {
        for input in ["10", "12.5%", "2em", "1e3px", "-.5in"] {
            let result = AttributeParser::parse(Rule::length, input);
            assert!(result.is_ok(), "Failed to parse length {input:?}: {:?}", result.err());
        }
        for input in ["10 px", "px", "10PX", "1e"] {
            assert!(AttributeParser::parse(Rule::length, input).is_err(), "{input:?} must not parse");
        }
    }

    #[test]
    fn parse_view_box_rule() {
        assert!(AttributeParser::parse(Rule::view_box, "0 0 10 20").is_ok());
        assert!(AttributeParser::parse(Rule::view_box, " -1,2.5, 3e1\t4 ").is_ok());
        assert!(AttributeParser::parse(Rule::view_box, "0 0 10").is_err());
        assert!(AttributeParser::parse(Rule::view_box, "0 0 10 20 30").is_err());
    }

    #[test]
    fn parse_rotate_rule_arity() {
        assert!(AttributeParser::parse(Rule::rotate, "rotate(10)").is_ok());
        assert!(AttributeParser::parse(Rule::rotate, "rotate(10, 3 3)").is_ok());
        let partial = AttributeParser::parse(Rule::rotate, "rotate(10, 3)");
        assert!(partial.is_err(), "two-argument rotate must not parse");
    }

    #[test]
    fn reject_unclosed_list() {
        let input = "translate(-111.0, 33) translate(-111.0, 33 matrix (1 1 0 0 1, 3)";
        let result = AttributeParser::parse(Rule::transform_list, input);
        assert!(result.is_err());
    }
}
