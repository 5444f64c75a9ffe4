#![forbid(unsafe_code)]

//! Proximity margin around the viewport.
//!
//! The margin uses CSS `margin` shorthand, the same syntax the browser accepts
//! for `IntersectionObserverInit.rootMargin`:
//!
//! ```text
//! "100% 0"            top/bottom = 100%, left/right = 0
//! "10px 0 20px"       top = 10px, left/right = 0, bottom = 20px
//! "1px 2px 3px 4px"   top, right, bottom, left
//! ```
//!
//! Percentages resolve against the root's height for the top and bottom
//! edges, and against its width for the left and right edges. The default
//! `"100% 0"` triggers once a marker is within one viewport height of
//! entering view.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};

/// One margin component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginLength {
    Px(f64),
    Percent(f64),
}

impl MarginLength {
    /// Length in pixels against a root extent on the same axis.
    #[must_use]
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => extent * pct / 100.0,
        }
    }

    fn parse(token: &str) -> std::result::Result<Self, String> {
        let (number, percent) = if let Some(n) = token.strip_suffix('%') {
            (n, true)
        } else if let Some(n) = token.strip_suffix("px") {
            (n, false)
        } else {
            (token, false)
        };
        let value: f64 = number
            .parse()
            .map_err(|_| format!("{token:?} is not a length"))?;
        if !value.is_finite() {
            return Err(format!("{token:?} is not finite"));
        }
        // Only zero may omit its unit.
        if number.len() == token.len() && value != 0.0 {
            return Err(format!("{token:?} needs a px or % unit"));
        }
        Ok(if percent {
            Self::Percent(value)
        } else {
            Self::Px(value)
        })
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(px) => write!(f, "{px}px"),
            Self::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap with `other`, edges inclusive. Touching rects yield an empty
    /// but present intersection.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < x || bottom < y {
            return None;
        }
        Some(Rect::new(x, y, right - x, bottom - y))
    }
}

/// Margin applied around the viewport before intersection testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootMargin {
    pub top: MarginLength,
    pub right: MarginLength,
    pub bottom: MarginLength,
    pub left: MarginLength,
}

impl RootMargin {
    /// One viewport height above and below, nothing sideways.
    pub const LOOK_AHEAD: Self = Self {
        top: MarginLength::Percent(100.0),
        right: MarginLength::Px(0.0),
        bottom: MarginLength::Percent(100.0),
        left: MarginLength::Px(0.0),
    };

    pub const NONE: Self = Self {
        top: MarginLength::Px(0.0),
        right: MarginLength::Px(0.0),
        bottom: MarginLength::Px(0.0),
        left: MarginLength::Px(0.0),
    };

    /// Parse CSS margin shorthand (1 to 4 components).
    pub fn parse(input: &str) -> Result<Self> {
        let parts = input
            .split_whitespace()
            .map(MarginLength::parse)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|reason| SentinelError::invalid_margin(input, reason))?;

        let [top, right, bottom, left] = match parts.as_slice() {
            [all] => [*all; 4],
            [vertical, horizontal] => [*vertical, *horizontal, *vertical, *horizontal],
            [top, horizontal, bottom] => [*top, *horizontal, *bottom, *horizontal],
            [top, right, bottom, left] => [*top, *right, *bottom, *left],
            [] => return Err(SentinelError::invalid_margin(input, "empty margin")),
            _ => {
                return Err(SentinelError::invalid_margin(
                    input,
                    "expected at most 4 components",
                ));
            }
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }

    /// Grow `root` by this margin.
    #[must_use]
    pub fn expand(&self, root: Rect) -> Rect {
        let top = self.top.resolve(root.height);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);
        let right = self.right.resolve(root.width);
        Rect::new(
            root.x - left,
            root.y - top,
            root.width + left + right,
            root.height + top + bottom,
        )
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::LOOK_AHEAD
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

impl FromStr for RootMargin {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RootMargin {
    type Error = SentinelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RootMargin> for String {
    fn from(margin: RootMargin) -> Self {
        margin.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_one_viewport_vertically() {
        assert_eq!(RootMargin::parse("100% 0").unwrap(), RootMargin::default());
    }

    #[test]
    fn shorthand_expansion() {
        let m = RootMargin::parse("10px 0 20px").unwrap();
        assert_eq!(m.top, MarginLength::Px(10.0));
        assert_eq!(m.right, MarginLength::Px(0.0));
        assert_eq!(m.bottom, MarginLength::Px(20.0));
        assert_eq!(m.left, MarginLength::Px(0.0));

        let m = RootMargin::parse("1px 2% 3px 4%").unwrap();
        assert_eq!(m.left, MarginLength::Percent(4.0));

        let m = RootMargin::parse("  -5px ").unwrap();
        assert_eq!(m, RootMargin {
            top: MarginLength::Px(-5.0),
            right: MarginLength::Px(-5.0),
            bottom: MarginLength::Px(-5.0),
            left: MarginLength::Px(-5.0),
        });
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "   ", "auto", "10", "10em", "1px 2px 3px 4px 5px", "NaN%", "inf%"] {
            let err = RootMargin::parse(input).unwrap_err();
            assert!(
                matches!(err, SentinelError::InvalidMargin { .. }),
                "{input:?} -> {err:?}"
            );
        }
    }

    #[test]
    fn display_is_valid_css_and_reparses() {
        let m = RootMargin::parse("100% 0 25.5px").unwrap();
        assert_eq!(m.to_string(), "100% 0px 25.5px 0px");
        assert_eq!(RootMargin::parse(&m.to_string()).unwrap(), m);
    }

    #[test]
    fn expand_resolves_percentages_per_axis() {
        let root = Rect::new(0.0, 0.0, 200.0, 100.0);
        let grown = RootMargin::parse("100% 10%").unwrap().expand(root);
        assert_eq!(grown, Rect::new(-20.0, -100.0, 240.0, 300.0));
        assert_eq!(RootMargin::NONE.expand(root), root);
    }

    #[test]
    fn intersection_is_edge_inclusive() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(0.0, 10.0, 10.0, 0.0);
        assert_eq!(a.intersection(&touching), Some(Rect::new(0.0, 10.0, 10.0, 0.0)));
        assert_eq!(a.intersection(&Rect::new(0.0, 11.0, 10.0, 5.0)), None);
    }

    #[test]
    fn serde_uses_css_string() {
        let m: RootMargin = serde_json::from_str("\"50% 0\"").unwrap();
        assert_eq!(m.top, MarginLength::Percent(50.0));
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"50% 0px 50% 0px\"");
        assert!(serde_json::from_str::<RootMargin>("\"wide\"").is_err());
    }
}
