/// In-memory 2D drawing surface.
///
/// Mirrors the immediate-mode model of an HTML canvas: drawing state is set,
/// a path is built, and `stroke`/`fill` commit it as a shape that snapshots
/// the state at that moment. Committed shapes serialize to SVG.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub &'static str);

impl Color {
    pub const BLACK: Color = Color("black");
    pub const BLUE: Color = Color("blue");
    pub const GREEN: Color = Color("green");
    pub const RED: Color = Color("red");
    pub const ORANGE: Color = Color("orange");
    pub const GRID: Color = Color("rgba(0,0,0,0.1)");
    pub const TEXT: Color = Color("#666666");
    pub const LEGEND_FILL: Color = Color("rgba(0,0,0,0.1)");
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
    End,
}

impl TextAlign {
    fn svg_anchor(self) -> &'static str {
        match self {
            TextAlign::Start => "start",
            TextAlign::Center => "middle",
            TextAlign::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawState {
    pub stroke_color: Color,
    pub fill_color: Color,
    pub line_width: f64,
    pub line_dash: Vec<f64>,
    pub font: String,
    pub text_align: TextAlign,
}

impl Default for DrawState {
    fn default() -> Self {
        DrawState {
            stroke_color: Color::BLACK,
            fill_color: Color::BLACK,
            line_width: 1.0,
            line_dash: Vec::new(),
            font: "10px sans-serif".to_string(),
            text_align: TextAlign::Start,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathCmd {
    MoveTo(Point),
    LineTo(Point),
    CubicTo(Point, Point, Point),
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub dash: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Path {
        cmds: Vec<PathCmd>,
        stroke: Option<Stroke>,
        fill: Option<Color>,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Color,
        stroke: Stroke,
        title: Option<String>,
    },
    Text {
        text: String,
        at: Point,
        color: Color,
        font: String,
        align: TextAlign,
        rotation: f64,
    },
}

#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    state: DrawState,
    saved: Vec<DrawState>,
    path: Vec<PathCmd>,
    shapes: Vec<Shape>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Canvas {
            width,
            height,
            state: DrawState::default(),
            saved: Vec::new(),
            path: Vec::new(),
            shapes: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resizing resets the surface completely, including drawing state.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Canvas::new(width, height);
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.path.clear();
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn is_blank(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn save(&mut self) {
        self.saved.push(self.state.clone());
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    pub fn saved_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.state.stroke_color = color;
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill_color = color;
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
    }

    pub fn set_line_dash(&mut self, dash: &[f64]) {
        self.state.line_dash = dash.to_vec();
    }

    pub fn set_font(&mut self, font: &str) {
        self.state.font = font.to_string();
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.state.text_align = align;
    }

    pub fn begin_path(&mut self) {
        self.path.clear();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.path.push(PathCmd::MoveTo(Point::new(x, y)));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.path.push(PathCmd::LineTo(Point::new(x, y)));
    }

    pub fn bezier_curve_to(&mut self, cp1: Point, cp2: Point, to: Point) {
        self.path.push(PathCmd::CubicTo(cp1, cp2, to));
    }

    pub fn close_path(&mut self) {
        self.path.push(PathCmd::Close);
    }

    fn current_stroke(&self) -> Stroke {
        Stroke {
            color: self.state.stroke_color,
            width: self.state.line_width,
            dash: self.state.line_dash.clone(),
        }
    }

    pub fn stroke(&mut self) {
        if self.path.is_empty() {
            return;
        }
        self.shapes.push(Shape::Path {
            cmds: self.path.clone(),
            stroke: Some(self.current_stroke()),
            fill: None,
        });
    }

    pub fn fill(&mut self) {
        if self.path.is_empty() {
            return;
        }
        self.shapes.push(Shape::Path {
            cmds: self.path.clone(),
            stroke: None,
            fill: Some(self.state.fill_color),
        });
    }

    /// Filled and stroked circle. `title` becomes a hover tooltip in SVG output.
    pub fn circle(&mut self, center: Point, radius: f64, title: Option<String>) {
        self.shapes.push(Shape::Circle {
            center,
            radius,
            fill: self.state.fill_color,
            stroke: self.current_stroke(),
            title,
        });
    }

    pub fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.fill_text_rotated(text, x, y, 0.0);
    }

    pub fn fill_text_rotated(&mut self, text: &str, x: f64, y: f64, degrees: f64) {
        self.shapes.push(Shape::Text {
            text: text.to_string(),
            at: Point::new(x, y),
            color: self.state.fill_color,
            font: self.state.font.clone(),
            align: self.state.text_align,
            rotation: degrees,
        });
    }

    pub fn to_svg(&self) -> Result<String, String> {
        compose_svg(&[self])
    }
}

/// Writes the layers into one SVG document, first layer at the bottom.
/// The document takes the size of the first layer.
pub fn compose_svg(layers: &[&Canvas]) -> Result<String, String> {
    let (width, height) = layers
        .first()
        .map(|c| (c.width, c.height))
        .unwrap_or((0, 0));
    let mut writer = Writer::new(Vec::new());

    let width_attr = width.to_string();
    let height_attr = height.to_string();
    let view_box = format!("0 0 {width} {height}");
    let mut root = BytesStart::new("svg");
    root.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
    root.push_attribute(("width", width_attr.as_str()));
    root.push_attribute(("height", height_attr.as_str()));
    root.push_attribute(("viewBox", view_box.as_str()));
    write(&mut writer, Event::Start(root))?;

    for layer in layers {
        write(&mut writer, Event::Start(BytesStart::new("g")))?;
        for shape in &layer.shapes {
            write_shape(&mut writer, shape)?;
        }
        write(&mut writer, Event::End(BytesEnd::new("g")))?;
    }

    write(&mut writer, Event::End(BytesEnd::new("svg")))?;
    String::from_utf8(writer.into_inner()).map_err(|e| format!("svg utf8: {e}"))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer
        .write_event(event)
        .map_err(|e| format!("svg write: {e}"))
}

fn write_shape(writer: &mut Writer<Vec<u8>>, shape: &Shape) -> Result<(), String> {
    match shape {
        Shape::Path { cmds, stroke, fill } => {
            let d = path_data(cmds);
            let mut el = BytesStart::new("path");
            el.push_attribute(("d", d.as_str()));
            let fill_attr = fill.map(|c| c.0).unwrap_or("none");
            el.push_attribute(("fill", fill_attr));
            if let Some(stroke) = stroke {
                push_stroke(&mut el, stroke);
            }
            write(writer, Event::Empty(el))
        }
        Shape::Circle {
            center,
            radius,
            fill,
            stroke,
            title,
        } => {
            let cx = fmt_num(center.x);
            let cy = fmt_num(center.y);
            let r = fmt_num(*radius);
            let mut el = BytesStart::new("circle");
            el.push_attribute(("cx", cx.as_str()));
            el.push_attribute(("cy", cy.as_str()));
            el.push_attribute(("r", r.as_str()));
            el.push_attribute(("fill", fill.0));
            push_stroke(&mut el, stroke);
            match title {
                Some(title) => {
                    write(writer, Event::Start(el))?;
                    write(writer, Event::Start(BytesStart::new("title")))?;
                    write(writer, Event::Text(BytesText::new(title)))?;
                    write(writer, Event::End(BytesEnd::new("title")))?;
                    write(writer, Event::End(BytesEnd::new("circle")))
                }
                None => write(writer, Event::Empty(el)),
            }
        }
        Shape::Text {
            text,
            at,
            color,
            font,
            align,
            rotation,
        } => {
            let x = fmt_num(at.x);
            let y = fmt_num(at.y);
            let (size, family) = split_font(font);
            let mut el = BytesStart::new("text");
            el.push_attribute(("x", x.as_str()));
            el.push_attribute(("y", y.as_str()));
            el.push_attribute(("fill", color.0));
            el.push_attribute(("font-size", size));
            el.push_attribute(("font-family", family));
            el.push_attribute(("text-anchor", align.svg_anchor()));
            if *rotation != 0.0 {
                let transform = format!("rotate({} {} {})", fmt_num(*rotation), x, y);
                el.push_attribute(("transform", transform.as_str()));
            }
            write(writer, Event::Start(el))?;
            write(writer, Event::Text(BytesText::new(text)))?;
            write(writer, Event::End(BytesEnd::new("text")))
        }
    }
}

fn push_stroke(el: &mut BytesStart<'_>, stroke: &Stroke) {
    let width = fmt_num(stroke.width);
    el.push_attribute(("stroke", stroke.color.0));
    el.push_attribute(("stroke-width", width.as_str()));
    if !stroke.dash.is_empty() {
        let dash = stroke
            .dash
            .iter()
            .map(|d| fmt_num(*d))
            .collect::<Vec<_>>()
            .join(" ");
        el.push_attribute(("stroke-dasharray", dash.as_str()));
    }
}

fn path_data(cmds: &[PathCmd]) -> String {
    let mut parts = Vec::with_capacity(cmds.len());
    for cmd in cmds {
        let part = match cmd {
            PathCmd::MoveTo(p) => format!("M{} {}", fmt_num(p.x), fmt_num(p.y)),
            PathCmd::LineTo(p) => format!("L{} {}", fmt_num(p.x), fmt_num(p.y)),
            PathCmd::CubicTo(a, b, p) => format!(
                "C{} {} {} {} {} {}",
                fmt_num(a.x),
                fmt_num(a.y),
                fmt_num(b.x),
                fmt_num(b.y),
                fmt_num(p.x),
                fmt_num(p.y)
            ),
            PathCmd::Close => "Z".to_string(),
        };
        parts.push(part);
    }
    parts.join(" ")
}

/// "16px Arial" -> ("16px", "Arial")
fn split_font(font: &str) -> (&str, &str) {
    match font.split_once(' ') {
        Some((size, family)) => (size, family.trim()),
        None => ("10px", font),
    }
}

pub fn fmt_num(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}
