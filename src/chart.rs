/// Single-series line chart with a category x-axis and a linear y-axis.
///
/// Layout runs as its own pass after construction. Until it runs the chart
/// has no pixel scales; once it does, the scales are published on a watch
/// channel so anything waiting on them (the overlay) can proceed.

use tokio::sync::watch;

use crate::canvas::{Canvas, Color, Point, TextAlign};
use crate::profile::format_number;

const PADDING: f64 = 10.0;
const LEGEND_HEIGHT: f64 = 32.0;
const LEGEND_BOX_WIDTH: f64 = 40.0;
const LEGEND_BOX_HEIGHT: f64 = 12.0;
const AXIS_TITLE_HEIGHT: f64 = 22.0;
const TICK_LABEL_HEIGHT: f64 = 22.0;
const TICK_CHAR_WIDTH: f64 = 7.0;
const TICK_GAP: f64 = 8.0;
const MIN_TICK_SPACING: f64 = 40.0;
const MAX_TICKS: usize = 11;
const FONT: &str = "12px Helvetica";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChartId(pub u64);

#[derive(Debug, Clone)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: Color,
    pub point_color: Color,
    pub point_radius: f64,
    pub border_width: f64,
    pub fill: bool,
    /// Bezier tension, 0 draws straight segments.
    pub tension: f64,
}

/// Horizontal line drawn across the chart area at a fixed value.
#[derive(Debug, Clone)]
pub struct ReferenceLine {
    pub value: f64,
    pub color: Color,
    pub width: f64,
    pub dash: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub labels: Vec<String>,
    pub dataset: Dataset,
    pub reference_line: Option<ReferenceLine>,
    pub x_title: String,
    pub y_title: String,
    pub show_legend: bool,
    pub tooltip: fn(f64) -> String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryScale {
    pub left: f64,
    pub right: f64,
    pub count: usize,
}

impl CategoryScale {
    /// Categories span the full width: first at `left`, last at `right`.
    pub fn pixel_for_value(&self, index: f64) -> f64 {
        if self.count <= 1 {
            return (self.left + self.right) / 2.0;
        }
        self.left + index * (self.right - self.left) / (self.count - 1) as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub top: f64,
    pub bottom: f64,
}

impl LinearScale {
    pub fn pixel_for_value(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return (self.top + self.bottom) / 2.0;
        }
        // divide the pixel extent first so huge value spans cannot overflow
        self.bottom - (value - self.min) * ((self.bottom - self.top) / span)
    }

    pub fn ticks(&self) -> Vec<f64> {
        if self.step <= 0.0 {
            return vec![self.min];
        }
        let count = ((self.max - self.min) / self.step).round() as usize;
        (0..=count)
            .map(|i| round_to_step(self.min + i as f64 * self.step, self.step))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub x: CategoryScale,
    pub y: LinearScale,
}

/// Receiving end of a chart's layout notification.
#[derive(Debug, Clone)]
pub struct LayoutSignal {
    chart_id: ChartId,
    rx: watch::Receiver<Option<Scales>>,
}

impl LayoutSignal {
    pub fn chart_id(&self) -> ChartId {
        self.chart_id
    }

    /// Scales published so far, if the layout pass has run.
    pub fn scales(&self) -> Option<Scales> {
        *self.rx.borrow()
    }

    /// False once the chart has been destroyed.
    pub fn is_live(&self) -> bool {
        self.rx.has_changed().is_ok()
    }

    /// Resolves with the scales once layout has run, or `None` if the chart
    /// is destroyed first.
    pub async fn ready(&mut self) -> Option<Scales> {
        match self.rx.wait_for(|s| s.is_some()).await {
            Ok(scales) => *scales,
            Err(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Chart {
    id: ChartId,
    config: ChartConfig,
    width: f64,
    height: f64,
    scales: Option<Scales>,
    notify: watch::Sender<Option<Scales>>,
}

impl Chart {
    pub fn new(id: ChartId, config: ChartConfig, width: u32, height: u32) -> Self {
        let (notify, _) = watch::channel(None);
        Chart {
            id,
            config,
            width: width as f64,
            height: height as f64,
            scales: None,
            notify,
        }
    }

    pub fn id(&self) -> ChartId {
        self.id
    }

    pub fn scales(&self) -> Option<Scales> {
        self.scales
    }

    pub fn subscribe(&self) -> LayoutSignal {
        LayoutSignal {
            chart_id: self.id,
            rx: self.notify.subscribe(),
        }
    }

    /// Computes the chart area and both axis scales, then notifies subscribers.
    pub fn layout(&mut self) -> Scales {
        let top = PADDING + if self.config.show_legend { LEGEND_HEIGHT } else { 0.0 };
        let bottom = (self.height - PADDING - AXIS_TITLE_HEIGHT - TICK_LABEL_HEIGHT).max(top + 1.0);

        let (data_min, data_max) = self.value_range();
        let max_ticks = ((bottom - top) / MIN_TICK_SPACING).floor() as usize;
        let (min, max, step) = nice_range(data_min, data_max, max_ticks.clamp(2, MAX_TICKS));
        let y = LinearScale {
            min,
            max,
            step,
            top,
            bottom,
        };

        let widest_tick = y
            .ticks()
            .iter()
            .map(|t| format_tick(*t).chars().count())
            .max()
            .unwrap_or(1) as f64;
        let left = PADDING + AXIS_TITLE_HEIGHT + widest_tick * TICK_CHAR_WIDTH + TICK_GAP;
        let right = (self.width - PADDING).max(left + 1.0);

        let scales = Scales {
            x: CategoryScale {
                left,
                right,
                count: self.config.labels.len(),
            },
            y,
        };
        self.scales = Some(scales);
        self.notify.send_replace(Some(scales));
        scales
    }

    fn value_range(&self) -> (f64, f64) {
        let values = self
            .config
            .dataset
            .data
            .iter()
            .copied()
            .chain(self.config.reference_line.as_ref().map(|l| l.value));
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for v in values.filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if !lo.is_finite() {
            return (0.0, 1.0);
        }
        (lo, hi)
    }

    pub fn tooltip(&self, index: usize) -> Option<String> {
        self.config
            .dataset
            .data
            .get(index)
            .map(|v| (self.config.tooltip)(*v))
    }

    /// Pixel positions of every data point. Empty before layout.
    pub fn point_positions(&self) -> Vec<Point> {
        let Some(scales) = self.scales else {
            return Vec::new();
        };
        self.config
            .dataset
            .data
            .iter()
            .enumerate()
            .map(|(i, v)| Point::new(scales.x.pixel_for_value(i as f64), scales.y.pixel_for_value(*v)))
            .collect()
    }

    pub fn draw(&self, canvas: &mut Canvas) {
        let Some(scales) = self.scales else {
            return;
        };
        canvas.save();
        canvas.set_font(FONT);
        if self.config.show_legend {
            self.draw_legend(canvas);
        }
        self.draw_grid(canvas, &scales);
        self.draw_axis_titles(canvas, &scales);
        if let Some(line) = &self.config.reference_line {
            let y = scales.y.pixel_for_value(line.value);
            canvas.set_stroke_color(line.color);
            canvas.set_line_width(line.width);
            canvas.set_line_dash(&line.dash);
            canvas.begin_path();
            canvas.move_to(scales.x.left, y);
            canvas.line_to(scales.x.right, y);
            canvas.stroke();
            canvas.set_line_dash(&[]);
        }
        self.draw_series(canvas, &scales);
        canvas.restore();
    }

    fn draw_legend(&self, canvas: &mut Canvas) {
        let ds = &self.config.dataset;
        let text_width = ds.label.chars().count() as f64 * TICK_CHAR_WIDTH;
        let total = LEGEND_BOX_WIDTH + 10.0 + text_width;
        let x = (self.width - total) / 2.0;
        let y = PADDING;

        canvas.set_fill_color(Color::LEGEND_FILL);
        canvas.set_stroke_color(ds.border_color);
        canvas.set_line_width(ds.border_width);
        canvas.begin_path();
        canvas.move_to(x, y);
        canvas.line_to(x + LEGEND_BOX_WIDTH, y);
        canvas.line_to(x + LEGEND_BOX_WIDTH, y + LEGEND_BOX_HEIGHT);
        canvas.line_to(x, y + LEGEND_BOX_HEIGHT);
        canvas.close_path();
        canvas.fill();
        canvas.stroke();

        canvas.set_fill_color(Color::TEXT);
        canvas.set_text_align(TextAlign::Start);
        canvas.fill_text(&ds.label, x + LEGEND_BOX_WIDTH + 10.0, y + LEGEND_BOX_HEIGHT - 1.0);
    }

    fn draw_grid(&self, canvas: &mut Canvas, scales: &Scales) {
        canvas.set_stroke_color(Color::GRID);
        canvas.set_line_width(1.0);
        canvas.set_fill_color(Color::TEXT);

        canvas.set_text_align(TextAlign::End);
        for tick in scales.y.ticks() {
            let y = scales.y.pixel_for_value(tick);
            canvas.begin_path();
            canvas.move_to(scales.x.left, y);
            canvas.line_to(scales.x.right, y);
            canvas.stroke();
            canvas.fill_text(&format_tick(tick), scales.x.left - TICK_GAP, y + 4.0);
        }

        canvas.set_text_align(TextAlign::Center);
        for (i, label) in self.config.labels.iter().enumerate() {
            let x = scales.x.pixel_for_value(i as f64);
            canvas.begin_path();
            canvas.move_to(x, scales.y.top);
            canvas.line_to(x, scales.y.bottom);
            canvas.stroke();
            canvas.fill_text(label, x, scales.y.bottom + TICK_LABEL_HEIGHT - 6.0);
        }
    }

    fn draw_axis_titles(&self, canvas: &mut Canvas, scales: &Scales) {
        canvas.set_fill_color(Color::TEXT);
        canvas.set_text_align(TextAlign::Center);
        let x_mid = (scales.x.left + scales.x.right) / 2.0;
        canvas.fill_text(&self.config.x_title, x_mid, self.height - PADDING - 4.0);

        let y_mid = (scales.y.top + scales.y.bottom) / 2.0;
        canvas.fill_text_rotated(&self.config.y_title, PADDING + 12.0, y_mid, -90.0);
    }

    fn draw_series(&self, canvas: &mut Canvas, scales: &Scales) {
        let ds = &self.config.dataset;
        let points = self.point_positions();
        if points.is_empty() {
            return;
        }

        canvas.set_stroke_color(ds.border_color);
        canvas.set_line_width(ds.border_width);
        canvas.begin_path();
        canvas.move_to(points[0].x, points[0].y);
        if ds.tension > 0.0 {
            let controls = control_points(&points, ds.tension, scales.y.top, scales.y.bottom);
            for i in 1..points.len() {
                canvas.bezier_curve_to(controls[i - 1].1, controls[i].0, points[i]);
            }
        } else {
            for p in &points[1..] {
                canvas.line_to(p.x, p.y);
            }
        }
        if ds.fill {
            let last = points[points.len() - 1];
            let base = scales.y.pixel_for_value(0.0);
            canvas.line_to(last.x, base);
            canvas.line_to(points[0].x, base);
            canvas.close_path();
            canvas.set_fill_color(Color::LEGEND_FILL);
            canvas.fill();
        }
        canvas.stroke();

        canvas.set_fill_color(ds.point_color);
        canvas.set_line_width(1.0);
        for (i, p) in points.iter().enumerate() {
            canvas.circle(*p, ds.point_radius, self.tooltip(i));
        }
    }

    /// Consumes the chart. Subscribers see the channel close.
    pub fn destroy(self) {
        drop(self);
    }
}

/// Incoming and outgoing Bezier control points for each point of a smoothed
/// polyline. Control y values are clamped to the chart area.
pub fn control_points(points: &[Point], tension: f64, top: f64, bottom: f64) -> Vec<(Point, Point)> {
    let n = points.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let current = points[i];
        let previous = if i == 0 { current } else { points[i - 1] };
        let next = if i + 1 == n { current } else { points[i + 1] };

        let d01 = previous.distance(current);
        let d12 = current.distance(next);
        let total = d01 + d12;
        let (s01, s12) = if total > 0.0 {
            (d01 / total, d12 / total)
        } else {
            (0.0, 0.0)
        };
        let fa = tension * s01;
        let fb = tension * s12;

        let incoming = Point::new(
            current.x - fa * (next.x - previous.x),
            (current.y - fa * (next.y - previous.y)).clamp(top, bottom),
        );
        let outgoing = Point::new(
            current.x + fb * (next.x - previous.x),
            (current.y + fb * (next.y - previous.y)).clamp(top, bottom),
        );
        out.push((incoming, outgoing));
    }
    out
}

/// Expands `[lo, hi]` to tick-aligned bounds with a 1/2/5 step.
pub fn nice_range(lo: f64, hi: f64, max_ticks: usize) -> (f64, f64, f64) {
    let (lo, hi) = if hi - lo <= f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    };
    let spacing = nice_number(nice_number(hi - lo, false) / (max_ticks.max(2) - 1) as f64, true);
    let min = (lo / spacing).floor() * spacing;
    let max = (hi / spacing).ceil() * spacing;
    (round_to_step(min, spacing), round_to_step(max, spacing), spacing)
}

fn nice_number(value: f64, round: bool) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let exponent = value.abs().log10().floor();
    let fraction = value / 10f64.powf(exponent);
    let nice_fraction = if round {
        if fraction < 1.5 {
            1.0
        } else if fraction < 3.0 {
            2.0
        } else if fraction < 7.0 {
            5.0
        } else {
            10.0
        }
    } else if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice_fraction * 10f64.powf(exponent)
}

fn round_to_step(value: f64, step: f64) -> f64 {
    let decimals = (-step.log10().floor()).max(0.0) as i32;
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn format_tick(value: f64) -> String {
    format_number(value)
}
