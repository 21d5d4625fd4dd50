//! Length tokens and their conversion into user-space units.
//!
//! User space is CSS pixels at the document's pixels-per-inch: unitless and
//! `px` values pass through, physical units scale with `ppi`, `%` scales with
//! a reference length chosen by [`Axis`].

use std::fmt;
use std::str::FromStr;

use pest::Parser;

use crate::errors::LengthError;
use crate::types::{Length, Size};
use crate::{AttributeParser, Rule};

/// Default `font-size` used for `em`/`ex` when the caller supplies none
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Unit suffix of a length token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    None,
    Px,
    Pt,
    Pc,
    In,
    Mm,
    Cm,
    Em,
    Ex,
    Percent,
}

impl Unit {
    fn from_suffix(suffix: &str) -> Option<Unit> {
        Some(match suffix {
            "" => Unit::None,
            "px" => Unit::Px,
            "pt" => Unit::Pt,
            "pc" => Unit::Pc,
            "in" => Unit::In,
            "mm" => Unit::Mm,
            "cm" => Unit::Cm,
            "em" => Unit::Em,
            "ex" => Unit::Ex,
            "%" => Unit::Percent,
            _ => return None,
        })
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Px => "px",
            Unit::Pt => "pt",
            Unit::Pc => "pc",
            Unit::In => "in",
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::Em => "em",
            Unit::Ex => "ex",
            Unit::Percent => "%",
        }
    }
}

/// A raw, unresolved length: mantissa plus unit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LengthToken {
    pub value: f64,
    pub unit: Unit,
}

impl LengthToken {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn is_percent(&self) -> bool {
        self.unit == Unit::Percent
    }
}

impl fmt::Display for LengthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for LengthToken {
    type Err = LengthError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(LengthError::EmptyValue);
        }

        let Ok(mut pairs) = AttributeParser::parse(Rule::length, trimmed) else {
            return Err(classify_failure(trimmed));
        };
        let mut value = None;
        let mut unit = Unit::None;
        for pair in pairs.next().into_iter().flat_map(|p| p.into_inner()) {
            match pair.as_rule() {
                Rule::number => value = Some(parse_finite(pair.as_str(), trimmed)?),
                Rule::unit => {
                    unit = Unit::from_suffix(pair.as_str()).ok_or_else(|| LengthError::InvalidUnit {
                        token: trimmed.to_string(),
                        unit: pair.as_str().to_string(),
                    })?;
                }
                _ => {}
            }
        }

        let value = value.ok_or_else(|| LengthError::InvalidNumber { token: trimmed.to_string() })?;
        Ok(LengthToken { value, unit })
    }
}

fn parse_finite(number: &str, token: &str) -> Result<f64, LengthError> {
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LengthError::InvalidNumber { token: token.to_string() })
}

/// Why `token` is not a length: no leading number, or junk after it
fn classify_failure(token: &str) -> LengthError {
    match AttributeParser::parse(Rule::number, token) {
        Ok(pairs) => {
            let end = pairs.last().map_or(0, |p| p.as_span().end());
            LengthError::InvalidUnit {
                token: token.to_string(),
                unit: token[end..].to_string(),
            }
        }
        Err(_) => LengthError::InvalidNumber { token: token.to_string() },
    }
}

/// Which reference length a percentage is taken against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// x, width, cx, rx, ...
    Horizontal,
    /// y, height, cy, ry, ...
    Vertical,
    /// Lengths tied to neither axis: stroke-width, dash lengths, r
    Other,
}

impl Axis {
    pub fn reference(self, viewport: Size) -> f64 {
        match self {
            Axis::Horizontal => viewport.width,
            Axis::Vertical => viewport.height,
            Axis::Other => viewport.diagonal(),
        }
    }
}

/// Converts length tokens to user-space units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitResolver {
    pub ppi: f64,
    pub font_size: f64,
}

impl UnitResolver {
    pub const fn new(ppi: f64) -> Self {
        Self { ppi, font_size: DEFAULT_FONT_SIZE }
    }

    #[must_use]
    pub const fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Parse `token` and convert it; `%` is taken of `reference`
    pub fn resolve(&self, token: &str, reference: f64) -> Result<Length, LengthError> {
        Ok(self.convert(token.parse()?, reference))
    }

    /// Percentages against the viewport width, height or diagonal
    pub fn resolve_axis(&self, token: &str, axis: Axis, viewport: Size) -> Result<Length, LengthError> {
        self.resolve(token, axis.reference(viewport))
    }

    /// Percentages against `sqrt(w² + h²) / sqrt(2)` of the viewport
    pub fn resolve_diagonal(&self, token: &str, viewport: Size) -> Result<Length, LengthError> {
        self.resolve_axis(token, Axis::Other, viewport)
    }

    pub fn convert(&self, token: LengthToken, reference: f64) -> Length {
        let v = token.value;
        Length(match token.unit {
            Unit::None | Unit::Px => v,
            Unit::Pt => v * self.ppi / 72.0,
            Unit::Pc => v * self.ppi / 6.0,
            Unit::In => v * self.ppi,
            Unit::Mm => v * self.ppi / 25.4,
            Unit::Cm => v * self.ppi / 2.54,
            Unit::Em => v * self.font_size,
            Unit::Ex => v * self.font_size / 2.0,
            Unit::Percent => v * reference / 100.0,
        })
    }
}
