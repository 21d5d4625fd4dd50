//! `preserveAspectRatio` values.
//!
//! Parsing never fails: anything unrecognised degrades to
//! `{ defer: false, xMin, yMin, none }`.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::log::warn;

/// Alignment of the scaled viewBox inside the viewport along one axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Min,
    Mid,
    Max,
}

impl Align {
    fn from_keyword(s: &str) -> Option<Align> {
        match s {
            "min" => Some(Align::Min),
            "mid" => Some(Align::Mid),
            "max" => Some(Align::Max),
            _ => None,
        }
    }

    /// Offset of content of length `content` inside a slot of length `slot`
    pub fn offset(self, slot: f64, content: f64) -> f64 {
        match self {
            Align::Min => 0.0,
            Align::Mid => (slot - content) / 2.0,
            Align::Max => slot - content,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Align::Min => "Min",
            Align::Mid => "Mid",
            Align::Max => "Max",
        }
    }
}

/// How the viewBox is scaled into the viewport
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Fit {
    /// Independent x and y scale
    #[default]
    None,
    /// Uniform scale, whole viewBox visible
    Meet,
    /// Uniform scale, viewport fully covered
    Slice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AspectRatio {
    /// Parsed but not acted on here; whether an embedding document may
    /// override the value is the scene builder's call.
    pub defer: bool,
    pub x_align: Align,
    pub y_align: Align,
    pub fit: Fit,
}

impl AspectRatio {
    /// Value used for unparsable input, and for `none`
    pub const FALLBACK: AspectRatio = AspectRatio {
        defer: false,
        x_align: Align::Min,
        y_align: Align::Min,
        fit: Fit::None,
    };

    pub const fn new(x_align: Align, y_align: Align, fit: Fit) -> Self {
        AspectRatio { defer: false, x_align, y_align, fit }
    }

    /// Parse an attribute value; keywords are case-insensitive
    pub fn parse(value: &str) -> AspectRatio {
        match Self::try_parse(value) {
            Some(parsed) => parsed,
            None => {
                warn!(value, "unparsable preserveAspectRatio, using xMinYMin none");
                Self::FALLBACK
            }
        }
    }

    /// The attribute value if present, the SVG initial value otherwise
    pub fn from_attr(value: Option<&str>) -> AspectRatio {
        value.map_or_else(AspectRatio::default, AspectRatio::parse)
    }

    fn try_parse(value: &str) -> Option<AspectRatio> {
        let lowered = value.to_ascii_lowercase();
        let mut tokens = lowered.split_ascii_whitespace().peekable();

        let defer = tokens.next_if_eq(&"defer").is_some();
        let align = tokens.next()?;
        if align == "none" {
            return Some(AspectRatio { defer, ..Self::FALLBACK });
        }

        let (x_align, y_align) = parse_align(align)?;
        let fit = match tokens.next() {
            None | Some("meet") => Fit::Meet,
            Some("slice") => Fit::Slice,
            Some(_) => return None,
        };
        Some(AspectRatio { defer, x_align, y_align, fit })
    }
}

/// `xMinYMid` (already lowercased) into its two alignments
fn parse_align(token: &str) -> Option<(Align, Align)> {
    let rest = token.strip_prefix('x')?;
    let (x, rest) = rest.split_at_checked(3)?;
    let y = rest.strip_prefix('y')?;
    Some((Align::from_keyword(x)?, Align::from_keyword(y)?))
}

impl Default for AspectRatio {
    /// `xMidYMid meet`
    fn default() -> Self {
        AspectRatio::new(Align::Mid, Align::Mid, Fit::Meet)
    }
}

impl FromStr for AspectRatio {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AspectRatio::parse(s))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defer {
            f.write_str("defer ")?;
        }
        match self.fit {
            Fit::None => f.write_str("none"),
            Fit::Meet | Fit::Slice => {
                write!(f, "x{}Y{}", self.x_align.keyword(), self.y_align.keyword())?;
                f.write_str(if self.fit == Fit::Slice { " slice" } else { " meet" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defer_and_alignment() {
        let p = AspectRatio::parse(" defer  xMinYMax meet");
        insta::assert_debug_snapshot!(p, @r#"
        AspectRatio {
            defer: true,
            x_align: Min,
            y_align: Max,
            fit: Meet,
        }
        "#);
    }

    #[test]
    fn slice() {
        let p = AspectRatio::parse(" xMinYMid slice");
        assert_eq!(p, AspectRatio::new(Align::Min, Align::Mid, Fit::Slice));
    }

    #[test]
    fn keywords_ignore_case_and_fit_defaults_to_meet() {
        assert_eq!(AspectRatio::parse(" xmidYMid "), AspectRatio::new(Align::Mid, Align::Mid, Fit::Meet));
        assert_eq!(AspectRatio::parse("XMAXYMIN SLICE"), AspectRatio::new(Align::Max, Align::Min, Fit::Slice));
    }

    #[test]
    fn none_keeps_defer() {
        assert_eq!(AspectRatio::parse(" NoNe "), AspectRatio::FALLBACK);
        assert_eq!(
            AspectRatio::parse("defer NoNe "),
            AspectRatio { defer: true, ..AspectRatio::FALLBACK }
        );
    }

    #[test]
    fn garbage_degrades_silently() {
        for garbage in [
            "sweet brown fox jumps over a nice svg file",
            "",
            "defer",
            "xMinYMin stretch",
            "xMinYMi",
            "yMinxMin",
            "xMédYMid",
        ] {
            assert_eq!(AspectRatio::parse(garbage), AspectRatio::FALLBACK, "{garbage:?}");
        }
    }

    #[test]
    fn absent_attribute_is_mid_meet() {
        assert_eq!(AspectRatio::from_attr(None), AspectRatio::new(Align::Mid, Align::Mid, Fit::Meet));
        assert_eq!(AspectRatio::from_attr(Some("none")).fit, Fit::None);
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(AspectRatio::parse("defer xmaxymid slice").to_string(), "defer xMaxYMid slice");
        assert_eq!(AspectRatio::parse("garbage").to_string(), "none");
        let round: AspectRatio = "xMinYMax".parse().unwrap();
        assert_eq!(round.to_string(), "xMinYMax meet");
    }

    #[test]
    fn align_offsets() {
        assert_eq!(Align::Min.offset(100.0, 40.0), 0.0);
        assert_eq!(Align::Mid.offset(100.0, 40.0), 30.0);
        assert_eq!(Align::Max.offset(100.0, 40.0), 60.0);
    }
}
