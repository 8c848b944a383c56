//! The smallest unit of geometry: one motion command.
//!
//! A shape's outline is an ordered list of [`Motion`]s. The same type is
//! written to the document format and, with fixed precision, streamed to
//! the controller.

use crate::geometry::Point;
use cutkit_core::data::{strip_comments, words};
use cutkit_core::approx_eq;

#[derive(Debug, Clone)]
pub enum MotionKind {
    /// Non-cutting positioning move (G0)
    Rapid,
    /// Cutting move at the programmed feed (G1)
    Feed,
    /// Clockwise arc (G2); `i`/`j` is the centre offset from the start point
    ArcCw { i: f64, j: f64 },
    /// Counter-clockwise arc (G3)
    ArcCcw { i: f64, j: f64 },
    /// Bézier move. `c1` is the first control point relative to the start,
    /// `c2` (cubic only) the second control point relative to the end.
    Spline { c1: Point, c2: Option<Point> },
    /// Free text, carries no coordinates
    Comment(String),
    /// Drill cycle at the target position; the motion's `z` is the hole bottom
    Drill { retract: f64, peck: f64 },
}

#[derive(Debug, Clone)]
pub struct Motion {
    pub kind: MotionKind,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Motion {
    fn at(kind: MotionKind, p: Point) -> Self {
        Self {
            kind,
            x: p.x,
            y: p.y,
            z: None,
        }
    }

    pub fn rapid(p: Point) -> Self {
        Self::at(MotionKind::Rapid, p)
    }

    pub fn feed(p: Point) -> Self {
        Self::at(MotionKind::Feed, p)
    }

    /// Arc ending at `end`; `center_offset` is relative to the arc start.
    pub fn arc(end: Point, center_offset: Point, clockwise: bool) -> Self {
        let (i, j) = (center_offset.x, center_offset.y);
        let kind = if clockwise {
            MotionKind::ArcCw { i, j }
        } else {
            MotionKind::ArcCcw { i, j }
        };
        Self::at(kind, end)
    }

    pub fn spline(end: Point, c1: Point, c2: Option<Point>) -> Self {
        Self::at(MotionKind::Spline { c1, c2 }, end)
    }

    pub fn drill(p: Point, depth: f64, retract: f64, peck: f64) -> Self {
        Self {
            kind: MotionKind::Drill { retract, peck },
            x: p.x,
            y: p.y,
            z: Some(depth),
        }
    }

    /// Comment text is kept on one line and without parentheses so it can
    /// never be mistaken for a document header.
    pub fn comment(text: &str) -> Self {
        let clean: String = text
            .chars()
            .map(|c| match c {
                '(' => '[',
                ')' => ']',
                '\n' | '\r' => ' ',
                c => c,
            })
            .collect();
        Self {
            kind: MotionKind::Comment(clean),
            x: f64::NAN,
            y: f64::NAN,
            z: None,
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_point(&mut self, p: Point) {
        self.x = p.x;
        self.y = p.y;
    }

    /// Carries real coordinates and is not a pure comment.
    pub fn is_point(&self) -> bool {
        !self.is_comment() && self.x.is_finite() && self.y.is_finite()
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, MotionKind::Comment(_))
    }

    pub fn is_rapid(&self) -> bool {
        matches!(self.kind, MotionKind::Rapid)
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.kind, MotionKind::ArcCw { .. } | MotionKind::ArcCcw { .. })
    }

    /// Coordinates match within the engine epsilon.
    pub fn same_position(&self, other: &Motion) -> bool {
        self.is_point() && other.is_point() && self.point().approx_eq(&other.point())
    }

    /// Full-precision text, used by the document format.
    pub fn to_gcode(&self) -> String {
        self.format_with(None)
    }

    /// Command text with `precision` decimals, or shortest round-trip
    /// formatting when `None`.
    pub fn format_with(&self, precision: Option<usize>) -> String {
        let n = |v: f64| format_number(v, precision);
        let xy = format!("X{} Y{}", n(self.x), n(self.y));
        let z = self.z.map(|z| format!(" Z{}", n(z))).unwrap_or_default();
        match &self.kind {
            MotionKind::Rapid => format!("G0 {}{}", xy, z),
            MotionKind::Feed => format!("G1 {}{}", xy, z),
            MotionKind::ArcCw { i, j } => format!("G2 {}{} I{} J{}", xy, z, n(*i), n(*j)),
            MotionKind::ArcCcw { i, j } => format!("G3 {}{} I{} J{}", xy, z, n(*i), n(*j)),
            MotionKind::Spline { c1, c2: Some(c2) } => format!(
                "G5 I{} J{} P{} Q{} {}{}",
                n(c1.x),
                n(c1.y),
                n(c2.x),
                n(c2.y),
                xy,
                z
            ),
            MotionKind::Spline { c1, c2: None } => {
                format!("G5.1 I{} J{} {}{}", n(c1.x), n(c1.y), xy, z)
            }
            MotionKind::Comment(text) => format!("({})", text),
            MotionKind::Drill { retract, peck } => {
                if peck.is_finite() && *peck > 0.0 {
                    format!("G83 {}{} R{} Q{}", xy, z, n(*retract), n(*peck))
                } else {
                    format!("G81 {}{} R{}", xy, z, n(*retract))
                }
            }
        }
    }

    /// Parse one command line. Returns `None` for anything that is not a
    /// recognised motion or comment.
    pub fn parse(line: &str) -> Option<Motion> {
        let t = line.trim();
        if t.is_empty() {
            return None;
        }
        let code = strip_comments(t);
        if code.trim().is_empty() {
            if t.starts_with('(') && t.ends_with(')') && t.len() >= 2 {
                return Some(Motion::comment(&t[1..t.len() - 1]));
            }
            if let Some(rest) = t.strip_prefix(';') {
                return Some(Motion::comment(rest.trim()));
            }
        }

        let mut g = None;
        let (mut x, mut y, mut z) = (None, None, None);
        let (mut i, mut j, mut p, mut q, mut r) = (None, None, None, None, None);
        for (letter, value) in words(&code) {
            match letter {
                'G' if g.is_none() => g = Some(value),
                'X' => x = Some(value),
                'Y' => y = Some(value),
                'Z' => z = Some(value),
                'I' => i = Some(value),
                'J' => j = Some(value),
                'P' => p = Some(value),
                'Q' => q = Some(value),
                'R' => r = Some(value),
                _ => {}
            }
        }

        let end = Point::new(x?, y?);
        let code = (g? * 10.0).round() as i64;
        let mut motion = match code {
            0 => Motion::rapid(end),
            10 => Motion::feed(end),
            20 | 30 => Motion::arc(
                end,
                Point::new(i.unwrap_or(0.0), j.unwrap_or(0.0)),
                code == 20,
            ),
            50 => Motion::spline(
                end,
                Point::new(i.unwrap_or(0.0), j.unwrap_or(0.0)),
                Some(Point::new(p.unwrap_or(0.0), q.unwrap_or(0.0))),
            ),
            51 => Motion::spline(end, Point::new(i.unwrap_or(0.0), j.unwrap_or(0.0)), None),
            810 => Motion::drill(end, z?, r.unwrap_or(0.0), f64::NAN),
            830 => Motion::drill(end, z?, r.unwrap_or(0.0), q.unwrap_or(f64::NAN)),
            _ => return None,
        };
        if !matches!(motion.kind, MotionKind::Drill { .. }) {
            motion.z = z;
        }
        Some(motion)
    }
}

impl PartialEq for Motion {
    fn eq(&self, other: &Self) -> bool {
        let coords = match (self.is_comment(), other.is_comment()) {
            (true, true) => true,
            (false, false) => {
                approx_eq(self.x, other.x)
                    && approx_eq(self.y, other.y)
                    && match (self.z, other.z) {
                        (Some(a), Some(b)) => approx_eq(a, b),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => false,
        };
        coords
            && match (&self.kind, &other.kind) {
                (MotionKind::Rapid, MotionKind::Rapid) | (MotionKind::Feed, MotionKind::Feed) => {
                    true
                }
                (MotionKind::ArcCw { i, j }, MotionKind::ArcCw { i: i2, j: j2 })
                | (MotionKind::ArcCcw { i, j }, MotionKind::ArcCcw { i: i2, j: j2 }) => {
                    approx_eq(*i, *i2) && approx_eq(*j, *j2)
                }
                (MotionKind::Spline { c1, c2 }, MotionKind::Spline { c1: d1, c2: d2 }) => {
                    c1.approx_eq(d1)
                        && match (c2, d2) {
                            (Some(a), Some(b)) => a.approx_eq(b),
                            (None, None) => true,
                            _ => false,
                        }
                }
                (MotionKind::Comment(a), MotionKind::Comment(b)) => a == b,
                (
                    MotionKind::Drill { retract, peck },
                    MotionKind::Drill {
                        retract: r2,
                        peck: p2,
                    },
                ) => {
                    approx_eq(*retract, *r2)
                        && (approx_eq(*peck, *p2) || (peck.is_nan() && p2.is_nan()))
                }
                _ => false,
            }
    }
}

/// Format a number either with fixed decimals (trailing zeros trimmed) or
/// with the shortest representation that parses back to the same value.
pub fn format_number(value: f64, precision: Option<usize>) -> String {
    match precision {
        None => format!("{}", value),
        Some(p) => {
            let s = format!("{:.*}", p, value);
            let s = if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                s
            };
            if s == "-0" {
                "0".to_string()
            } else {
                s
            }
        }
    }
}
