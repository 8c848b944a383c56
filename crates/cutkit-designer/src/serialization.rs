//! Line-oriented document format.
//!
//! ```text
//! (Group-name: root)
//! (Prop: true,,,,,,,false)
//! (Polyline-name: outline)
//! (Prop: true,80,1200,2,0,1,-2,false)
//! G0 X0 Y0
//! G1 X10 Y0
//! (EndGroup)
//! ```
//!
//! Every shape starts with a `(<Variant>-name: <name>)` header followed by a
//! `(Prop: ...)` line and its motion lines. Parametric shapes add a
//! `(Params: ...)` line. Groups run until `(EndGroup)`. Names are
//! percent-escaped so they never contain parentheses or newlines. Numbers
//! are written in shortest round-trip form.

use std::collections::HashMap;
use std::io::BufRead;

use crate::geometry::Point;
use crate::model::{
    CamShape, DesignArc, DesignCylinderPocket, DesignDrill, DesignGroup, DesignMixedPath,
    DesignPolyline, DesignSpherePocket, DesignSpline, DesignTextPath, PathElement, Shape,
    ShapeHeader,
};
use crate::motion::{format_number, Motion, MotionKind};
use crate::properties::EngravingProperties;
use cutkit_core::{Error, FormatError, Result};

const NAME_MARKER: &str = "-name: ";
const PROP_PREFIX: &str = "(Prop:";
const PARAMS_PREFIX: &str = "(Params:";
const TEXT_PREFIX: &str = "(Text:";
const GLYPHS_MARKER: &str = "(Glyphs)";
const END_GROUP: &str = "(EndGroup)";
const GROUP_KIND: &str = "Group";

/// Everything read for one shape before it is constructed.
#[derive(Debug, Clone)]
pub struct ShapeParts {
    pub header: ShapeHeader,
    pub motions: Vec<Motion>,
    pub params: Vec<f64>,
    pub text: Option<(f64, String)>,
    pub glyph_motions: Vec<Motion>,
}

pub type ShapeConstructor = fn(ShapeParts) -> Option<Shape>;

/// Header discriminant to constructor.
///
/// Groups are structural and handled by the reader itself.
#[derive(Debug, Clone)]
pub struct ShapeRegistry {
    constructors: HashMap<&'static str, ShapeConstructor>,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        let mut r = Self {
            constructors: HashMap::new(),
        };
        r.register("Polyline", build_polyline);
        r.register("Arc", build_arc);
        r.register("Spline", build_spline);
        r.register("MixedPath", build_mixed);
        r.register("Drill", build_drill);
        r.register("CylinderPocket", build_cylinder);
        r.register("SpherePocket", build_sphere);
        r.register("TextPath", build_text);
        r
    }
}

impl ShapeRegistry {
    pub fn register(&mut self, kind: &'static str, constructor: ShapeConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn get(&self, kind: &str) -> Option<ShapeConstructor> {
        self.constructors.get(kind).copied()
    }

    pub fn contains(&self, kind: &str) -> bool {
        kind == GROUP_KIND || self.constructors.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.constructors.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("%25"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            c => out.push(c),
        }
    }
    out
}

pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3);
        let decoded = match code {
            Some("25") => Some('%'),
            Some("28") => Some('('),
            Some("29") => Some(')'),
            Some("0A") | Some("0a") => Some('\n'),
            Some("0D") | Some("0d") => Some('\r'),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[pos + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Encode a document root.
pub fn write_document(root: &DesignGroup) -> String {
    let mut out = String::new();
    write_group(&mut out, root);
    out
}

/// Encode any shape, groups recursively.
pub fn write_shape(out: &mut String, shape: &Shape) {
    match shape {
        Shape::Group(g) => write_group(out, g),
        other => {
            write_header(out, other.kind_name(), other.header());
            write_body(out, other);
        }
    }
}

fn write_group(out: &mut String, group: &DesignGroup) {
    write_header(out, GROUP_KIND, group.header());
    for child in group.children() {
        write_shape(out, child);
    }
    out.push_str(END_GROUP);
    out.push('\n');
}

fn write_header(out: &mut String, kind: &str, header: &ShapeHeader) {
    out.push_str(&format!("({}{}{})\n", kind, NAME_MARKER, escape(header.name())));
    out.push_str(&format!("{} {})\n", PROP_PREFIX, header.properties().encode()));
}

fn write_motion(out: &mut String, m: &Motion) {
    match &m.kind {
        // comments go out in the `;` form so their text can never look like
        // a header or marker
        MotionKind::Comment(text) => out.push_str(&format!(";{}", text)),
        _ => out.push_str(&m.to_gcode()),
    }
    out.push('\n');
}

fn write_params(out: &mut String, values: &[f64]) {
    let body: Vec<String> = values.iter().map(|v| format_number(*v, None)).collect();
    out.push_str(&format!("{} {})\n", PARAMS_PREFIX, body.join(",")));
}

fn write_body(out: &mut String, shape: &Shape) {
    match shape {
        Shape::CylinderPocket(c) => write_params(
            out,
            &[
                c.center().x,
                c.center().y,
                c.radius(),
                c.length_param(),
                c.inlay_depth(),
                c.rotation(),
            ],
        ),
        Shape::SpherePocket(s) => {
            write_params(out, &[s.center().x, s.center().y, s.radius(), s.inlay_depth()])
        }
        Shape::TextPath(t) => {
            out.push_str(&format!(
                "{} {}|{})\n",
                TEXT_PREFIX,
                format_number(t.size(), None),
                escape(t.text())
            ));
            for (i, p) in t.guide().iter().enumerate() {
                let m = if i == 0 { Motion::rapid(*p) } else { Motion::feed(*p) };
                write_motion(out, &m);
            }
            out.push_str(GLYPHS_MARKER);
            out.push('\n');
            for m in t.motions() {
                write_motion(out, &m);
            }
        }
        other => {
            for m in other.motions() {
                write_motion(out, &m);
            }
        }
    }
}

enum Pending {
    None,
    Skip,
    Shape {
        kind: String,
        parts: ShapeParts,
        in_glyphs: bool,
    },
}

struct GroupFrame {
    header: ShapeHeader,
    children: Vec<Shape>,
}

enum PropTarget {
    None,
    Frame,
    Pending,
}

/// Streaming decoder. Feed lines in order, then call [`DocumentReader::finish`].
pub struct DocumentReader<'r> {
    registry: &'r ShapeRegistry,
    frames: Vec<GroupFrame>,
    top: Vec<Shape>,
    pending: Pending,
    prop_target: PropTarget,
    line_number: usize,
}

impl<'r> DocumentReader<'r> {
    pub fn new(registry: &'r ShapeRegistry) -> Self {
        Self {
            registry,
            frames: Vec::new(),
            top: Vec::new(),
            pending: Pending::None,
            prop_target: PropTarget::None,
            line_number: 0,
        }
    }

    pub fn feed_line(&mut self, raw: &str) -> std::result::Result<(), FormatError> {
        self.line_number += 1;
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }

        if line == END_GROUP {
            self.finish_pending();
            let frame = self.frames.pop().ok_or(FormatError::UnmatchedGroupEnd {
                line_number: self.line_number,
            })?;
            let group = DesignGroup::from_parts(frame.header, frame.children);
            self.attach(Shape::Group(group));
            self.prop_target = PropTarget::None;
            return Ok(());
        }

        if let Some((kind, name)) = parse_header(line) {
            self.finish_pending();
            let header = ShapeHeader::new(unescape(name));
            if kind == GROUP_KIND {
                self.frames.push(GroupFrame {
                    header,
                    children: Vec::new(),
                });
                self.prop_target = PropTarget::Frame;
            } else if self.registry.get(kind).is_some() {
                self.pending = Pending::Shape {
                    kind: kind.to_string(),
                    parts: ShapeParts {
                        header,
                        motions: Vec::new(),
                        params: Vec::new(),
                        text: None,
                        glyph_motions: Vec::new(),
                    },
                    in_glyphs: false,
                };
                self.prop_target = PropTarget::Pending;
            } else {
                tracing::warn!("line {}: unknown shape kind '{}', skipped", self.line_number, kind);
                self.pending = Pending::Skip;
                self.prop_target = PropTarget::None;
            }
            return Ok(());
        }

        if let Some(body) = strip_block(line, PROP_PREFIX) {
            let props = EngravingProperties::decode(body).map_err(|reason| {
                FormatError::InvalidProperties {
                    line_number: self.line_number,
                    reason,
                }
            })?;
            match self.prop_target {
                PropTarget::Frame => {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.header.set_properties(props);
                    }
                }
                PropTarget::Pending => {
                    if let Pending::Shape { parts, .. } = &mut self.pending {
                        parts.header.set_properties(props);
                    }
                }
                PropTarget::None => {
                    tracing::warn!("line {}: properties without a shape, ignored", self.line_number);
                }
            }
            self.prop_target = PropTarget::None;
            return Ok(());
        }

        let line_number = self.line_number;
        match &mut self.pending {
            Pending::Skip => Ok(()),
            Pending::None => {
                tracing::warn!("line {}: '{}' outside any shape, ignored", line_number, line);
                Ok(())
            }
            Pending::Shape {
                parts, in_glyphs, ..
            } => {
                if let Some(body) = strip_block(line, PARAMS_PREFIX) {
                    parts.params = parse_params(body, line_number)?;
                } else if let Some(body) = strip_block(line, TEXT_PREFIX) {
                    parts.text = Some(parse_text(body, line_number)?);
                } else if line == GLYPHS_MARKER {
                    *in_glyphs = true;
                } else {
                    let motion = Motion::parse(line).unwrap_or_else(|| {
                        tracing::warn!(
                            "line {}: unreadable command '{}' kept as comment",
                            line_number,
                            line
                        );
                        Motion::comment(line)
                    });
                    if *in_glyphs {
                        parts.glyph_motions.push(motion);
                    } else {
                        parts.motions.push(motion);
                    }
                }
                Ok(())
            }
        }
    }

    /// Close the document. A single top-level group becomes the root;
    /// anything else is wrapped in a new root group.
    pub fn finish(mut self) -> std::result::Result<DesignGroup, FormatError> {
        self.finish_pending();
        if let Some(open) = self.frames.last() {
            return Err(FormatError::UnterminatedGroup {
                name: open.header.name().to_string(),
                open: self.frames.len(),
            });
        }
        if self.top.is_empty() {
            return Err(FormatError::EmptyDocument);
        }
        if self.top.len() == 1 && matches!(self.top[0], Shape::Group(_)) {
            if let Some(Shape::Group(root)) = self.top.pop() {
                return Ok(root);
            }
        }
        let mut root = DesignGroup::new("root");
        for shape in self.top {
            root.add(shape);
        }
        Ok(root)
    }

    fn finish_pending(&mut self) {
        let pending = std::mem::replace(&mut self.pending, Pending::None);
        if let Pending::Shape { kind, parts, .. } = pending {
            let name = parts.header.name().to_string();
            match self.registry.get(&kind).and_then(|build| build(parts)) {
                Some(shape) => self.attach(shape),
                None => tracing::warn!("{} '{}' has no usable geometry, skipped", kind, name),
            }
        }
    }

    fn attach(&mut self, mut shape: Shape) {
        shape.clear_flags();
        match self.frames.last_mut() {
            Some(frame) => frame.children.push(shape),
            None => self.top.push(shape),
        }
    }
}

/// Decode a whole document from text.
pub fn read_document(text: &str, registry: &ShapeRegistry) -> std::result::Result<DesignGroup, FormatError> {
    let mut reader = DocumentReader::new(registry);
    for line in text.lines() {
        reader.feed_line(line)?;
    }
    let mut root = reader.finish()?;
    root.clear_flags();
    Ok(root)
}

/// Decode from any buffered reader.
pub fn read_from<R: BufRead>(input: R, registry: &ShapeRegistry) -> Result<DesignGroup> {
    let mut reader = DocumentReader::new(registry);
    for line in input.lines() {
        reader.feed_line(&line.map_err(Error::Io)?)?;
    }
    let mut root = reader.finish()?;
    root.clear_flags();
    Ok(root)
}

fn parse_header(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix('(')?.strip_suffix(')')?;
    let (kind, name) = inner.split_once(NAME_MARKER)?;
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((kind, name))
}

fn strip_block<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix)?.strip_suffix(')').map(str::trim)
}

fn parse_params(body: &str, line_number: usize) -> std::result::Result<Vec<f64>, FormatError> {
    body.split(',')
        .map(|f| {
            f.trim().parse::<f64>().map_err(|_| FormatError::MalformedLine {
                line_number,
                reason: format!("invalid parameter '{}'", f.trim()),
            })
        })
        .collect()
}

fn parse_text(body: &str, line_number: usize) -> std::result::Result<(f64, String), FormatError> {
    let (size, text) = body.split_once('|').ok_or(FormatError::MalformedLine {
        line_number,
        reason: "text block without size".to_string(),
    })?;
    let size = size.trim().parse::<f64>().map_err(|_| FormatError::MalformedLine {
        line_number,
        reason: format!("invalid text size '{}'", size.trim()),
    })?;
    Ok((size, unescape(text)))
}

fn build_polyline(parts: ShapeParts) -> Option<Shape> {
    Some(DesignPolyline::from_parts(parts.header, parts.motions).into())
}

/// Point of the last coordinate-carrying motion before `index`.
fn cursor_before(motions: &[Motion], index: usize) -> Option<Point> {
    motions[..index]
        .iter()
        .rev()
        .find(|m| m.is_point())
        .map(Motion::point)
}

fn build_arc(parts: ShapeParts) -> Option<Shape> {
    let index = parts.motions.iter().position(Motion::is_arc)?;
    let start = cursor_before(&parts.motions, index)?;
    let m = &parts.motions[index];
    let (offset, clockwise) = match m.kind {
        MotionKind::ArcCw { i, j } => (Point::new(i, j), true),
        MotionKind::ArcCcw { i, j } => (Point::new(i, j), false),
        _ => return None,
    };
    Some(DesignArc::from_parts(parts.header, start, m.point(), start + offset, clockwise).into())
}

fn spline_from(name: &str, header: Option<ShapeHeader>, start: Point, m: &Motion) -> Option<DesignSpline> {
    let MotionKind::Spline { c1, c2 } = m.kind else {
        return None;
    };
    let end = m.point();
    let controls: Vec<Point> = match c2 {
        Some(c2) => vec![start + c1, end + c2],
        None => vec![start + c1],
    };
    let header = header.unwrap_or_else(|| ShapeHeader::new(name));
    Some(DesignSpline::from_parts(header, start, end, &controls))
}

fn build_spline(parts: ShapeParts) -> Option<Shape> {
    let index = parts
        .motions
        .iter()
        .position(|m| matches!(m.kind, MotionKind::Spline { .. }))?;
    let start = cursor_before(&parts.motions, index)?;
    let m = parts.motions[index].clone();
    spline_from("", Some(parts.header), start, &m).map(Shape::from)
}

fn build_mixed(parts: ShapeParts) -> Option<Shape> {
    let name = parts.header.name().to_string();
    let mut elements = Vec::with_capacity(parts.motions.len());
    let mut cursor: Option<Point> = None;
    for m in parts.motions {
        match m.kind {
            MotionKind::ArcCw { i, j } | MotionKind::ArcCcw { i, j } => {
                let Some(start) = cursor else { continue };
                let clockwise = matches!(m.kind, MotionKind::ArcCw { .. });
                elements.push(PathElement::Arc(DesignArc::new(
                    name.clone(),
                    start,
                    m.point(),
                    start + Point::new(i, j),
                    clockwise,
                )));
            }
            MotionKind::Spline { .. } => {
                let Some(start) = cursor else { continue };
                if let Some(s) = spline_from(&name, None, start, &m) {
                    elements.push(PathElement::Spline(s));
                }
            }
            _ => {
                if m.is_point() {
                    cursor = Some(m.point());
                }
                elements.push(PathElement::Move(m));
                continue;
            }
        }
        cursor = Some(m.point());
    }
    Some(DesignMixedPath::from_parts(parts.header, elements).into())
}

fn build_drill(parts: ShapeParts) -> Option<Shape> {
    let m = parts
        .motions
        .iter()
        .find(|m| matches!(m.kind, MotionKind::Drill { .. }))?;
    let MotionKind::Drill { retract, peck } = m.kind else {
        return None;
    };
    let depth = m.z?;
    Some(DesignDrill::from_parts(parts.header, m.point(), depth, retract, peck).into())
}

fn build_cylinder(parts: ShapeParts) -> Option<Shape> {
    let &[cx, cy, radius, length, inlay, rotation] = parts.params.as_slice() else {
        return None;
    };
    Some(
        DesignCylinderPocket::from_parts(
            parts.header,
            Point::new(cx, cy),
            radius,
            length,
            inlay,
            rotation,
        )
        .into(),
    )
}

fn build_sphere(parts: ShapeParts) -> Option<Shape> {
    let &[cx, cy, radius, inlay] = parts.params.as_slice() else {
        return None;
    };
    Some(DesignSpherePocket::from_parts(parts.header, Point::new(cx, cy), radius, inlay).into())
}

fn build_text(parts: ShapeParts) -> Option<Shape> {
    let (size, text) = parts.text?;
    let guide: Vec<Point> = parts
        .motions
        .iter()
        .filter(|m| m.is_point())
        .map(Motion::point)
        .collect();
    let mut placed: Vec<Vec<Point>> = Vec::new();
    for m in parts.glyph_motions.iter().filter(|m| m.is_point()) {
        match placed.last_mut() {
            Some(contour) if !m.is_rapid() => contour.push(m.point()),
            _ => placed.push(vec![m.point()]),
        }
    }
    Some(DesignTextPath::from_parts(parts.header, text, size, guide, placed).into())
}
