use nalgebra::Matrix3;

use super::{CamShape, ShapeHeader};
use crate::geometry::{uniform_scale, Point};
use crate::motion::Motion;

/// Outline of one character, already scaled to the requested size.
///
/// Coordinates are relative to the glyph origin on the baseline; `advance`
/// is the distance to the next origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glyph {
    pub advance: f64,
    pub contours: Vec<Vec<Point>>,
}

/// Source of glyph outlines. Font loading and rasterising live outside
/// this crate.
pub trait GlyphOutliner {
    fn outline(&self, ch: char, size: f64) -> Option<Glyph>;
}

/// Text laid out along a guide path.
///
/// The placed contours are the geometry; they are rebuilt by
/// [`DesignTextPath::layout`] and otherwise only follow transforms.
#[derive(Debug, Clone)]
pub struct DesignTextPath {
    header: ShapeHeader,
    text: String,
    size: f64,
    guide: Vec<Point>,
    placed: Vec<Vec<Point>>,
}

impl DesignTextPath {
    pub fn new(name: impl Into<String>, text: impl Into<String>, size: f64, guide: Vec<Point>) -> Self {
        Self::from_parts(ShapeHeader::new(name), text.into(), size, guide, Vec::new())
    }

    pub(crate) fn from_parts(
        header: ShapeHeader,
        text: String,
        size: f64,
        guide: Vec<Point>,
        placed: Vec<Vec<Point>>,
    ) -> Self {
        Self {
            header,
            text,
            size,
            guide,
            placed,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn guide(&self) -> &[Point] {
        &self.guide
    }

    pub fn contours(&self) -> &[Vec<Point>] {
        &self.placed
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.placed.clear();
        self.header.touch();
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = size;
        self.placed.clear();
        self.header.touch();
    }

    pub fn set_guide(&mut self, guide: Vec<Point>) {
        self.guide = guide;
        self.placed.clear();
        self.header.touch();
    }

    /// Place every character along the guide.
    ///
    /// Each glyph origin sits on the guide at the running advance and is
    /// rotated to the local tangent. Characters the outliner does not know
    /// are skipped; characters past the end of the guide are dropped.
    /// Returns false when anything was dropped.
    pub fn layout(&mut self, outliner: &dyn GlyphOutliner) -> bool {
        let mut placed = Vec::new();
        let mut offset = 0.0;
        let mut complete = true;
        for ch in self.text.chars() {
            let Some(glyph) = outliner.outline(ch, self.size) else {
                continue;
            };
            match along(&self.guide, offset) {
                Some((origin, angle)) => {
                    for contour in &glyph.contours {
                        placed.push(
                            contour
                                .iter()
                                .map(|p| (origin + *p).rotate_about(&origin, angle))
                                .collect(),
                        );
                    }
                }
                None => {
                    complete = false;
                    break;
                }
            }
            offset += glyph.advance;
        }
        tracing::debug!("text '{}' laid out as {} contours", self.text, placed.len());
        self.placed = placed;
        self.header.touch();
        complete
    }
}

/// Point and tangent angle at arc length `s` along `path`.
fn along(path: &[Point], s: f64) -> Option<(Point, f64)> {
    if s < 0.0 {
        return None;
    }
    let mut walked = 0.0;
    for w in path.windows(2) {
        let seg = w[0].distance_to(&w[1]);
        if seg > 0.0 && walked + seg >= s {
            let t = (s - walked) / seg;
            return Some((w[0].lerp(&w[1], t), w[0].angle_to(&w[1])));
        }
        walked += seg;
    }
    None
}

impl CamShape for DesignTextPath {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        if self.placed.is_empty() {
            return self.guide.clone();
        }
        self.placed.iter().flatten().copied().collect()
    }

    fn motions(&self) -> Vec<Motion> {
        let mut out = Vec::new();
        for contour in &self.placed {
            for (i, p) in contour.iter().enumerate() {
                out.push(if i == 0 { Motion::rapid(*p) } else { Motion::feed(*p) });
            }
        }
        out
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        for p in self.guide.iter_mut().chain(self.placed.iter_mut().flatten()) {
            *p = p.transformed(m);
        }
        self.size *= uniform_scale(m);
        self.header.touch();
    }

    fn reverse(&mut self) {}

    fn is_closed(&self) -> bool {
        false
    }
}
