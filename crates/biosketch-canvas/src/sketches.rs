//! 2D drawing routines, one per drawing key, at fixed coordinates on the 800×600 canvas.
//!
//! A routine is a list of timed steps. Most draw everything at once; the composite
//! ones (`microbiota`, `digestion`, `probioticos`) spread their parts over time.

use crate::canvas::{PathOp, Shape, Style};
use std::f64::consts::PI;
use std::time::Duration;

const LABEL: &str = "#333";
const INTESTINE_BLUE: &str = "#2196F3";
const FERMENT_ORANGE: &str = "#FF9800";
const GOOD_GREEN: &str = "#4CAF50";
const BAD_PINK: &str = "#E91E63";
const MICROBE_COLORS: [&str; 4] = ["#4CAF50", "#8BC34A", "#CDDC39", "#FFC107"];

/// Shapes drawn `at` after the routine starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchStep {
    pub at: Duration,
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub key: String,
    pub steps: Vec<SketchStep>,
}

impl Sketch {
    fn immediate(key: &str, shapes: Vec<Shape>) -> Self {
        Self {
            key: key.to_string(),
            steps: vec![SketchStep {
                at: Duration::ZERO,
                shapes,
            }],
        }
    }

    fn staged(key: &str, stages: Vec<(u64, Vec<Shape>)>) -> Self {
        Self {
            key: key.to_string(),
            steps: stages
                .into_iter()
                .map(|(ms, shapes)| SketchStep {
                    at: Duration::from_millis(ms),
                    shapes,
                })
                .collect(),
        }
    }

    /// Offset of the last step.
    pub fn duration(&self) -> Duration {
        self.steps.iter().map(|s| s.at).max().unwrap_or_default()
    }

    pub fn shape_count(&self) -> usize {
        self.steps.iter().map(|s| s.shapes.len()).sum()
    }
}

/// Routine for `key`, or `None` when the key has no drawing.
pub fn sketch(key: &str) -> Option<Sketch> {
    let sketch = match key {
        "probiotico" => Sketch::immediate(key, capsule()),
        "intestino" => Sketch::immediate(key, intestine()),
        "intestino_inflamado" => Sketch::immediate(key, inflamed_intestine()),
        "intestino_lento" => Sketch::immediate(key, slow_intestine()),
        "bacterias" => Sketch::immediate(key, colony()),
        "bacterias_buenas" => Sketch::immediate(key, good_bacteria()),
        "bacterias_malas" => Sketch::immediate(key, bad_bacteria()),
        "batalla" => Sketch::immediate(key, battle()),
        "equilibrio" => Sketch::immediate(key, balance()),
        "estomago" => Sketch::immediate(key, stomach()),
        "gases" => Sketch::immediate(key, gas_bubbles()),
        "alivio" => Sketch::immediate(key, relief()),
        "defensas" => Sketch::immediate(key, defenses()),
        "nutrientes" => Sketch::immediate(key, nutrients()),
        "reloj" => Sketch::immediate(key, clock()),
        "escudo" => Sketch::immediate(key, shield_of("#4CAF50", "ProBio+", "Protección")),
        "lactobacilo" => Sketch::immediate(key, bacterium("lactobacillus", 150.0, 200.0, "#4CAF50")),
        "bifidobacteria" => Sketch::immediate(key, bacterium("bifidobacterium", 300.0, 180.0, "#8BC34A")),
        "fermentacion" => Sketch::immediate(key, fermentation()),
        "beneficios" => Sketch::immediate(key, health_benefits()),
        "microbiota" => Sketch::staged(key, microbiome()),
        "digestion" => Sketch::staged(
            key,
            vec![(0, intestine()), (1000, fermentation()), (2000, health_benefits())],
        ),
        "probioticos" => Sketch::staged(
            key,
            vec![
                (0, bacterium("Probióticos", 200.0, 250.0, GOOD_GREEN)),
                (500, intestine()),
                (1000, health_benefits()),
            ],
        ),
        _ => return None,
    };
    Some(sketch)
}

/// Oval body with three flagella and a label above.
pub fn bacterium(label: &str, x: f64, y: f64, color: &str) -> Vec<Shape> {
    let mut shapes = vec![Shape::ellipse(x, y, 30.0, 15.0, Style::fill(color))];
    for i in 0..3 {
        let i = i as f64;
        shapes.push(Shape::Path {
            ops: vec![
                PathOp::MoveTo(x + 30.0, y + i * 10.0 - 10.0),
                PathOp::QuadTo(x + 50.0 + i * 5.0, y + i * 15.0 - 15.0, x + 70.0, y + i * 10.0 - 5.0),
            ],
            style: Style::stroke(color, 2.0),
        });
    }
    shapes.push(Shape::text(x - 20.0, y - 30.0, label, 12.0, LABEL));
    shapes
}

/// Line with a two-stroke head at the end point.
pub fn arrow(x1: f64, y1: f64, x2: f64, y2: f64, color: &str) -> Vec<Shape> {
    let head = 10.0;
    let angle = (y2 - y1).atan2(x2 - x1);
    let style = Style::stroke(color, 3.0);
    vec![
        Shape::line(x1, y1, x2, y2, style.clone()),
        Shape::line(
            x2,
            y2,
            x2 - head * (angle - PI / 6.0).cos(),
            y2 - head * (angle - PI / 6.0).sin(),
            style.clone(),
        ),
        Shape::line(
            x2,
            y2,
            x2 - head * (angle + PI / 6.0).cos(),
            y2 - head * (angle + PI / 6.0).sin(),
            style,
        ),
    ]
}

fn intestine_path(color: &str, width: f64) -> Shape {
    Shape::Path {
        ops: vec![
            PathOp::MoveTo(100.0, 150.0),
            PathOp::QuadTo(200.0, 100.0, 300.0, 150.0),
            PathOp::QuadTo(400.0, 200.0, 500.0, 150.0),
            PathOp::QuadTo(600.0, 100.0, 700.0, 150.0),
        ],
        style: Style::stroke(color, width),
    }
}

/// Winding small intestine with villi.
pub fn intestine() -> Vec<Shape> {
    let mut shapes = vec![intestine_path(INTESTINE_BLUE, 8.0)];
    let villus = Style::stroke(INTESTINE_BLUE, 3.0);
    for i in (150..650).step_by(50) {
        let x = i as f64;
        shapes.push(Shape::line(x, 140.0, x, 120.0, villus.clone()));
        shapes.push(Shape::line(x + 15.0, 145.0, x + 15.0, 125.0, villus.clone()));
        shapes.push(Shape::line(x + 30.0, 142.0, x + 30.0, 122.0, villus.clone()));
    }
    shapes.push(Shape::text(300.0, 100.0, "Intestino Delgado", 16.0, LABEL));
    shapes
}

fn inflamed_intestine() -> Vec<Shape> {
    let mut shapes = vec![intestine_path("#FF4444", 12.0)];
    for (x, y) in [(200.0, 125.0), (400.0, 175.0), (600.0, 125.0)] {
        shapes.push(Shape::circle(x, y, 14.0, Style::fill("#FF8A80")));
    }
    shapes.push(Shape::text(320.0, 90.0, "Inflamación", 16.0, "#D32F2F"));
    shapes
}

fn slow_intestine() -> Vec<Shape> {
    let mut shapes = vec![intestine_path("#64B5F6", 8.0)];
    for (x, y) in [(250.0, 138.0), (450.0, 168.0), (620.0, 130.0)] {
        shapes.push(Shape::ellipse(x, y, 14.0, 9.0, Style::fill("#8D6E63")));
    }
    shapes.push(Shape::text(320.0, 90.0, "Tránsito lento", 16.0, LABEL));
    shapes
}

fn fermentation() -> Vec<Shape> {
    let mut shapes = vec![
        Shape::circle(300.0, 300.0, 20.0, Style::fill(FERMENT_ORANGE)),
        Shape::text(280.0, 270.0, "Lactosa", 12.0, LABEL),
    ];
    shapes.extend(arrow(330.0, 300.0, 370.0, 300.0, FERMENT_ORANGE));
    shapes.push(Shape::ellipse(400.0, 300.0, 25.0, 15.0, Style::fill(GOOD_GREEN)));
    shapes.extend(arrow(430.0, 300.0, 470.0, 300.0, FERMENT_ORANGE));
    shapes.push(Shape::circle(500.0, 300.0, 15.0, Style::fill(FERMENT_ORANGE)));
    shapes.push(Shape::text(480.0, 270.0, "Ác. Láctico", 12.0, LABEL));
    shapes
}

fn health_benefits() -> Vec<Shape> {
    let benefits = [
        (150.0, 400.0, "Digestión", "💊"),
        (300.0, 420.0, "Inmunidad", "🛡️"),
        (450.0, 400.0, "Cardiovascular", "❤️"),
        (600.0, 420.0, "Mental", "🧠"),
    ];
    let mut shapes = Vec::new();
    for (x, y, label, icon) in benefits {
        shapes.push(Shape::circle(x, y, 25.0, Style::fill(BAD_PINK)));
        shapes.push(Shape::centered_text(x, y + 5.0, icon, 20.0, "#fff"));
        shapes.push(Shape::centered_text(x, y + 45.0, label, 12.0, LABEL));
    }
    shapes
}

fn microbiome() -> Vec<(u64, Vec<Shape>)> {
    (0..8)
        .map(|i| {
            let x = 200.0 + (i % 4) as f64 * 80.0;
            let y = 200.0 + (i / 4) as f64 * 60.0;
            let label = format!("Micro {}", i + 1);
            (i as u64 * 200, bacterium(&label, x, y, MICROBE_COLORS[i % 4]))
        })
        .collect()
}

fn capsule() -> Vec<Shape> {
    vec![
        Shape::Rect {
            x: 350.0,
            y: 170.0,
            width: 100.0,
            height: 140.0,
            radius: 50.0,
            style: Style::fill("#FF6B6B"),
        },
        Shape::Rect {
            x: 350.0,
            y: 280.0,
            width: 100.0,
            height: 140.0,
            radius: 50.0,
            style: Style::fill("#4ECDC4"),
        },
        Shape::centered_text(400.0, 470.0, "ProBio+", 20.0, LABEL),
    ]
}

fn colony() -> Vec<Shape> {
    let members = [
        (200.0, 200.0, "#4CAF50"),
        (560.0, 360.0, "#66BB6A"),
        (400.0, 290.0, "#81C784"),
        (300.0, 420.0, "#4CAF50"),
        (540.0, 160.0, "#66BB6A"),
    ];
    members
        .into_iter()
        .flat_map(|(x, y, color)| bacterium("Bacteria", x, y, color))
        .collect()
}

fn friendly(x: f64, y: f64) -> Vec<Shape> {
    vec![
        Shape::circle(x, y, 30.0, Style::fill(GOOD_GREEN)),
        Shape::centered_text(x, y + 8.0, "😊", 24.0, "#fff"),
    ]
}

fn hostile(x: f64, y: f64) -> Vec<Shape> {
    vec![
        Shape::Path {
            ops: vec![
                PathOp::MoveTo(x, y - 32.0),
                PathOp::LineTo(x + 28.0, y + 16.0),
                PathOp::LineTo(x - 28.0, y + 16.0),
                PathOp::Close,
            ],
            style: Style::fill(BAD_PINK),
        },
        Shape::centered_text(x, y + 8.0, "😈", 20.0, "#fff"),
    ]
}

fn good_bacteria() -> Vec<Shape> {
    let mut shapes: Vec<Shape> = [(250.0, 260.0), (400.0, 200.0), (550.0, 260.0), (400.0, 360.0)]
        .into_iter()
        .flat_map(|(x, y)| friendly(x, y))
        .collect();
    shapes.push(Shape::centered_text(400.0, 120.0, "Bacterias buenas", 16.0, LABEL));
    shapes
}

fn bad_bacteria() -> Vec<Shape> {
    let mut shapes: Vec<Shape> = [(550.0, 300.0), (250.0, 300.0), (400.0, 160.0), (400.0, 440.0)]
        .into_iter()
        .flat_map(|(x, y)| hostile(x, y))
        .collect();
    shapes.push(Shape::centered_text(400.0, 90.0, "Bacterias dañinas", 16.0, LABEL));
    shapes
}

fn battle() -> Vec<Shape> {
    let mut shapes: Vec<Shape> = [(200.0, 220.0), (170.0, 360.0), (260.0, 290.0)]
        .into_iter()
        .flat_map(|(x, y)| friendly(x, y))
        .collect();
    shapes.extend(
        [(600.0, 220.0), (630.0, 360.0), (540.0, 290.0)]
            .into_iter()
            .flat_map(|(x, y)| hostile(x, y)),
    );
    shapes.push(Shape::centered_text(400.0, 305.0, "⚔️", 40.0, LABEL));
    shapes
}

fn balance() -> Vec<Shape> {
    let frame = Style::stroke("#607D8B", 6.0);
    let string = Style::stroke("#607D8B", 2.0);
    vec![
        Shape::Path {
            ops: vec![
                PathOp::MoveTo(400.0, 430.0),
                PathOp::LineTo(440.0, 470.0),
                PathOp::LineTo(360.0, 470.0),
                PathOp::Close,
            ],
            style: Style::fill("#607D8B"),
        },
        Shape::line(400.0, 430.0, 400.0, 250.0, frame.clone()),
        Shape::line(250.0, 250.0, 550.0, 250.0, frame),
        Shape::line(250.0, 250.0, 250.0, 300.0, string.clone()),
        Shape::line(550.0, 250.0, 550.0, 300.0, string),
        Shape::ellipse(250.0, 300.0, 60.0, 12.0, Style::fill(GOOD_GREEN)),
        Shape::ellipse(550.0, 300.0, 60.0, 12.0, Style::fill("#64B5F6")),
        Shape::centered_text(250.0, 340.0, "Bacterias", 14.0, LABEL),
        Shape::centered_text(550.0, 340.0, "Intestino", 14.0, LABEL),
        Shape::centered_text(400.0, 520.0, "Equilibrio", 16.0, LABEL),
    ]
}

fn stomach() -> Vec<Shape> {
    vec![
        Shape::Path {
            ops: vec![
                PathOp::MoveTo(380.0, 150.0),
                PathOp::QuadTo(300.0, 250.0, 360.0, 380.0),
                PathOp::QuadTo(460.0, 460.0, 520.0, 360.0),
                PathOp::QuadTo(560.0, 260.0, 460.0, 240.0),
                PathOp::QuadTo(420.0, 230.0, 420.0, 150.0),
                PathOp::Close,
            ],
            style: Style::fill("#FFB74D").with_stroke("#E65100", 4.0),
        },
        Shape::centered_text(400.0, 520.0, "Estómago", 16.0, LABEL),
    ]
}

fn gas_bubbles() -> Vec<Shape> {
    let bubbles = [
        (300.0, 380.0, 40.0),
        (420.0, 320.0, 55.0),
        (520.0, 400.0, 30.0),
        (360.0, 240.0, 25.0),
        (480.0, 210.0, 35.0),
        (250.0, 280.0, 20.0),
    ];
    let mut shapes: Vec<Shape> = bubbles
        .into_iter()
        .map(|(x, y, r)| Shape::circle(x, y, r, Style::fill("#E3F2FD").with_stroke("#90CAF9", 3.0)))
        .collect();
    shapes.push(Shape::centered_text(400.0, 120.0, "Gases", 16.0, LABEL));
    shapes
}

fn relief() -> Vec<Shape> {
    vec![
        Shape::circle(400.0, 300.0, 80.0, Style::fill("#C8E6C9")),
        Shape::centered_text(400.0, 320.0, "😌", 60.0, GOOD_GREEN),
        Shape::centered_text(400.0, 430.0, "Alivio", 16.0, LABEL),
    ]
}

fn shield_of(color: &str, emblem: &str, caption: &str) -> Vec<Shape> {
    vec![
        Shape::Path {
            ops: vec![
                PathOp::MoveTo(400.0, 150.0),
                PathOp::QuadTo(520.0, 170.0, 540.0, 200.0),
                PathOp::QuadTo(540.0, 380.0, 400.0, 460.0),
                PathOp::QuadTo(260.0, 380.0, 260.0, 200.0),
                PathOp::QuadTo(280.0, 170.0, 400.0, 150.0),
                PathOp::Close,
            ],
            style: Style::fill(color),
        },
        Shape::centered_text(400.0, 320.0, emblem, 32.0, "#fff"),
        Shape::centered_text(400.0, 500.0, caption, 16.0, LABEL),
    ]
}

fn defenses() -> Vec<Shape> {
    shield_of(INTESTINE_BLUE, "🛡️", "Sistema inmune")
}

fn nutrients() -> Vec<Shape> {
    let mut shapes = intestine();
    for i in 0..5 {
        let x = 200.0 + i as f64 * 100.0;
        shapes.extend(arrow(x, 240.0, x, 190.0, FERMENT_ORANGE));
        shapes.push(Shape::circle(x, 255.0, 8.0, Style::fill("#FFC107")));
    }
    shapes.push(Shape::centered_text(400.0, 320.0, "Absorción de nutrientes", 16.0, LABEL));
    shapes
}

fn clock() -> Vec<Shape> {
    let (cx, cy) = (400.0, 300.0);
    let mut shapes = vec![Shape::circle(cx, cy, 120.0, Style::fill("#fff").with_stroke(LABEL, 6.0))];
    for hour in 0..12 {
        let angle = hour as f64 * PI / 6.0;
        let (s, c) = angle.sin_cos();
        shapes.push(Shape::line(
            cx + 100.0 * s,
            cy - 100.0 * c,
            cx + 112.0 * s,
            cy - 112.0 * c,
            Style::stroke(LABEL, 3.0),
        ));
    }
    shapes.push(Shape::line(cx, cy, cx, cy - 85.0, Style::stroke(LABEL, 6.0)));
    shapes.push(Shape::line(cx, cy, cx + 65.0, cy, Style::stroke(LABEL, 4.0)));
    shapes.push(Shape::circle(cx, cy, 6.0, Style::fill(LABEL)));
    shapes.push(Shape::centered_text(cx, 470.0, "Regularidad", 16.0, LABEL));
    shapes
}
