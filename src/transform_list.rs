//! Parse pest pairs into a transform list

use std::str::FromStr;

use pest::Parser;
use pest::error::{Error as PestError, InputLocation};
use pest::iterators::Pair;

use crate::errors::TransformSyntaxError;
use crate::log::trace;
use crate::transform::Transform;
use crate::types::Angle;
use crate::{Rule, AttributeParser};

/// One primitive of a `transform` attribute, arguments as written
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformOp {
    Matrix([f64; 6]),
    Translate { tx: f64, ty: f64 },
    Scale { sx: f64, sy: f64 },
    Rotate { angle: Angle, center: Option<(f64, f64)> },
    SkewX(Angle),
    SkewY(Angle),
}

impl TransformOp {
    pub fn to_transform(&self) -> Transform {
        match *self {
            TransformOp::Matrix([a, b, c, d, e, f]) => Transform::from_row(a, b, c, d, e, f),
            TransformOp::Translate { tx, ty } => Transform::translate(tx, ty),
            TransformOp::Scale { sx, sy } => Transform::scale(sx, sy),
            TransformOp::Rotate { angle, center: None } => Transform::rotate(angle),
            TransformOp::Rotate { angle, center: Some((cx, cy)) } => Transform::rotate_about(angle, cx, cy),
            TransformOp::SkewX(angle) => Transform::skew_x(angle),
            TransformOp::SkewY(angle) => Transform::skew_y(angle),
        }
    }
}

/// An ordered, fully validated transform list
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformList {
    ops: Vec<TransformOp>,
}

impl TransformList {
    /// Parse a `transform` attribute.
    ///
    /// Fails for the whole string if any primitive is malformed, even when
    /// the primitives before it were fine.
    pub fn parse(text: &str) -> Result<Self, TransformSyntaxError> {
        let pairs = AttributeParser::parse(Rule::transform_list, text).map_err(|e| syntax_error(text, e))?;

        let mut ops = Vec::new();
        for pair in pairs {
            if pair.as_rule() == Rule::transform_list {
                for inner in pair.into_inner() {
                    if inner.as_rule() != Rule::EOI {
                        ops.push(parse_primitive(text, inner)?);
                    }
                }
            }
        }

        trace!(count = ops.len(), "parsed transform list");
        Ok(TransformList { ops })
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Compose the primitives: `T1 * T2 * ... * Tn`, so `Tn` touches a point first
    pub fn to_transform(&self) -> Transform {
        self.ops
            .iter()
            .fold(Transform::IDENTITY, |acc, op| acc * op.to_transform())
    }
}

impl FromStr for TransformList {
    type Err = TransformSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformList::parse(s)
    }
}

/// Parse and compose in one step
pub fn parse_transform(text: &str) -> Result<Transform, TransformSyntaxError> {
    TransformList::parse(text).map(|list| list.to_transform())
}

fn syntax_error(source: &str, e: PestError<Rule>) -> TransformSyntaxError {
    let offset = match e.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    TransformSyntaxError::new(source, offset, e.variant.message())
}

fn parse_primitive(source: &str, pair: Pair<'_, Rule>) -> Result<TransformOp, TransformSyntaxError> {
    let rule = pair.as_rule();
    let offset = pair.as_span().start();
    let args = pair
        .into_inner()
        .map(|n| parse_number(source, n))
        .collect::<Result<Vec<f64>, _>>()?;

    let op = match (rule, args.as_slice()) {
        (Rule::matrix, &[a, b, c, d, e, f]) => TransformOp::Matrix([a, b, c, d, e, f]),
        (Rule::translate, &[tx]) => TransformOp::Translate { tx, ty: 0.0 },
        (Rule::translate, &[tx, ty]) => TransformOp::Translate { tx, ty },
        (Rule::scale, &[s]) => TransformOp::Scale { sx: s, sy: s },
        (Rule::scale, &[sx, sy]) => TransformOp::Scale { sx, sy },
        (Rule::rotate, &[a]) => TransformOp::Rotate { angle: Angle(a), center: None },
        (Rule::rotate, &[a, cx, cy]) => TransformOp::Rotate {
            angle: Angle(a),
            center: Some((cx, cy)),
        },
        (Rule::skew_x, &[a]) => TransformOp::SkewX(Angle(a)),
        (Rule::skew_y, &[a]) => TransformOp::SkewY(Angle(a)),
        _ => {
            return Err(TransformSyntaxError::new(
                source,
                offset,
                format!("unexpected {:?} with {} arguments", rule, args.len()),
            ));
        }
    };
    Ok(op)
}

fn parse_number(source: &str, pair: Pair<'_, Rule>) -> Result<f64, TransformSyntaxError> {
    let offset = pair.as_span().start();
    match pair.as_str().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(TransformSyntaxError::new(
            source,
            offset,
            format!("number `{}` is out of range", pair.as_str()),
        )),
    }
}
