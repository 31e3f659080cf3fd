//! Drawing surface: a small retained-mode shape list rendered to SVG.

use crate::error::CanvasResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 600.0;
pub const BACKGROUND: &str = "#f8f9fa";

/// Fill, stroke and font for one shape. Colors are CSS hex strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub line_width: f64,
}

impl Style {
    pub fn fill(color: &str) -> Self {
        Self {
            fill: Some(color.to_string()),
            stroke: None,
            line_width: 0.0,
        }
    }

    pub fn stroke(color: &str, line_width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color.to_string()),
            line_width,
        }
    }

    pub fn with_stroke(mut self, color: &str, line_width: f64) -> Self {
        self.stroke = Some(color.to_string());
        self.line_width = line_width;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathOp {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    /// Control point, then end point.
    QuadTo(f64, f64, f64, f64),
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        style: Style,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        style: Style,
    },
    Path {
        ops: Vec<PathOp>,
        style: Style,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        size: f64,
        color: String,
        /// Anchor at the middle of the text instead of its start.
        centered: bool,
    },
}

impl Shape {
    pub fn circle(cx: f64, cy: f64, r: f64, style: Style) -> Self {
        Shape::Ellipse { cx, cy, rx: r, ry: r, style }
    }

    pub fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64, style: Style) -> Self {
        Shape::Ellipse { cx, cy, rx, ry, style }
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64, style: Style) -> Self {
        Shape::Path {
            ops: vec![PathOp::MoveTo(x1, y1), PathOp::LineTo(x2, y2)],
            style,
        }
    }

    pub fn text(x: f64, y: f64, text: impl Into<String>, size: f64, color: &str) -> Self {
        Shape::Text {
            x,
            y,
            text: text.into(),
            size,
            color: color.to_string(),
            centered: false,
        }
    }

    pub fn centered_text(x: f64, y: f64, text: impl Into<String>, size: f64, color: &str) -> Self {
        Shape::Text {
            x,
            y,
            text: text.into(),
            size,
            color: color.to_string(),
            centered: true,
        }
    }

    fn write_svg(&self, out: &mut String) {
        // Writing to a String cannot fail.
        let _ = match self {
            Shape::Ellipse { cx, cy, rx, ry, style } => writeln!(
                out,
                r#"  <ellipse cx="{}" cy="{}" rx="{}" ry="{}"{}/>"#,
                num(*cx),
                num(*cy),
                num(*rx),
                num(*ry),
                paint(style)
            ),
            Shape::Rect { x, y, width, height, radius, style } => writeln!(
                out,
                r#"  <rect x="{}" y="{}" width="{}" height="{}" rx="{}"{}/>"#,
                num(*x),
                num(*y),
                num(*width),
                num(*height),
                num(*radius),
                paint(style)
            ),
            Shape::Path { ops, style } => writeln!(out, r#"  <path d="{}"{}/>"#, path_data(ops), paint(style)),
            Shape::Text { x, y, text, size, color, centered } => writeln!(
                out,
                r#"  <text x="{}" y="{}" font-family="Arial" font-size="{}" fill="{}"{}>{}</text>"#,
                num(*x),
                num(*y),
                num(*size),
                color,
                if *centered { r#" text-anchor="middle""# } else { "" },
                escape(text)
            ),
        };
    }
}

fn num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

fn paint(style: &Style) -> String {
    let mut attrs = String::new();
    match &style.fill {
        Some(fill) => attrs.push_str(&format!(r#" fill="{}""#, fill)),
        None => attrs.push_str(r#" fill="none""#),
    }
    if let Some(stroke) = &style.stroke {
        attrs.push_str(&format!(
            r#" stroke="{}" stroke-width="{}" stroke-linecap="round""#,
            stroke,
            num(style.line_width)
        ));
    }
    attrs
}

fn path_data(ops: &[PathOp]) -> String {
    ops.iter()
        .map(|op| match op {
            PathOp::MoveTo(x, y) => format!("M{} {}", num(*x), num(*y)),
            PathOp::LineTo(x, y) => format!("L{} {}", num(*x), num(*y)),
            PathOp::QuadTo(cx, cy, x, y) => format!("Q{} {} {} {}", num(*cx), num(*cy), num(*x), num(*y)),
            PathOp::Close => "Z".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 800×600 canvas that keeps every shape and renders them as one SVG document.
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    shapes: Vec<Shape>,
}

impl Default for SvgCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            shapes: Vec::new(),
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    pub fn draw(&mut self, shape: &Shape) {
        self.shapes.push(shape.clone());
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = num(self.width),
            h = num(self.height)
        );
        let _ = writeln!(out, r#"  <rect width="100%" height="100%" fill="{}"/>"#, BACKGROUND);
        for shape in &self.shapes {
            shape.write_svg(&mut out);
        }
        out.push_str("</svg>\n");
        out
    }

    pub fn save(&self, path: &Path) -> CanvasResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_svg())?;
        debug!(path = %path.display(), shapes = self.shapes.len(), "svg written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_shapes_in_order() {
        let mut canvas = SvgCanvas::new();
        canvas.draw(&Shape::ellipse(150.0, 200.0, 30.0, 15.0, Style::fill("#4CAF50")));
        canvas.draw(&Shape::text(130.0, 170.0, "lactobacillus", 12.0, "#333"));
        let svg = canvas.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r##"fill="#f8f9fa""##));
        let ellipse = svg.find("<ellipse").unwrap();
        let text = svg.find("<text").unwrap();
        assert!(ellipse < text);
        assert!(svg.contains(r#"cx="150" cy="200" rx="30" ry="15""#));
    }

    #[test]
    fn path_uses_quadratic_segments() {
        let mut canvas = SvgCanvas::new();
        canvas.draw(&Shape::Path {
            ops: vec![PathOp::MoveTo(100.0, 150.0), PathOp::QuadTo(200.0, 100.0, 300.0, 150.0)],
            style: Style::stroke("#2196F3", 8.0),
        });
        let svg = canvas.to_svg();
        assert!(svg.contains(r#"d="M100 150 Q200 100 300 150""#));
        assert!(svg.contains(r#"fill="none""#));
    }

    #[test]
    fn text_is_escaped() {
        let mut canvas = SvgCanvas::new();
        canvas.draw(&Shape::centered_text(0.0, 0.0, "<a & b>", 10.0, "#000"));
        assert!(canvas.to_svg().contains("&lt;a &amp; b&gt;"));
    }

    #[test]
    fn clear_empties_canvas() {
        let mut canvas = SvgCanvas::new();
        canvas.draw(&Shape::circle(1.0, 1.0, 1.0, Style::fill("#fff")));
        assert_eq!(canvas.shape_count(), 1);
        canvas.clear();
        assert_eq!(canvas.shape_count(), 0);
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sketch.svg");
        SvgCanvas::new().save(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("</svg>"));
    }
}
