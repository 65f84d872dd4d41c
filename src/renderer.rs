/// Owns the one live chart and the overlay surface stacked on top of it.

use tracing::{debug, info};

use crate::canvas::{compose_svg, Canvas, Color};
use crate::chart::{Chart, ChartConfig, ChartId, Dataset, LayoutSignal, ReferenceLine};
use crate::overlay::{self, OverlayGeometry};
use crate::profile::{format_number, EnergyProfile};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 400;

pub const ACTIVATED_COMPLEX_LABEL: &str = "Activated Complex";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Empty,
    Active,
}

#[derive(Debug)]
struct ActiveDiagram {
    chart: Chart,
    profile: EnergyProfile,
}

#[derive(Debug)]
pub struct DiagramRenderer {
    chart_surface: Canvas,
    overlay: Canvas,
    active: Option<ActiveDiagram>,
    next_id: u64,
}

/// Chart configuration for the three-point energy profile.
pub fn diagram_config(profile: &EnergyProfile) -> ChartConfig {
    let color = if profile.is_endothermic {
        Color::BLUE
    } else {
        Color::GREEN
    };
    ChartConfig {
        labels: vec![
            profile.reactants_label.clone(),
            ACTIVATED_COMPLEX_LABEL.to_string(),
            profile.products_label.clone(),
        ],
        dataset: Dataset {
            label: profile.series_label(),
            data: profile.energies().to_vec(),
            border_color: color,
            point_color: Color::BLACK,
            point_radius: 5.0,
            border_width: 3.0,
            fill: false,
            tension: 0.4,
        },
        reference_line: Some(ReferenceLine {
            value: 0.0,
            color: Color::BLACK,
            width: 2.0,
            dash: vec![5.0, 5.0],
        }),
        x_title: "Reaction Progress".to_string(),
        y_title: "Ep (kJ)".to_string(),
        show_legend: true,
        tooltip: |value| format!("Ep = {} kJ", format_number(value)),
    }
}

impl DiagramRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        DiagramRenderer {
            chart_surface: Canvas::new(width, height),
            overlay: Canvas::new(width, height),
            active: None,
            next_id: 0,
        }
    }

    pub fn state(&self) -> RendererState {
        if self.active.is_some() {
            RendererState::Active
        } else {
            RendererState::Empty
        }
    }

    pub fn current_chart_id(&self) -> Option<ChartId> {
        self.active.as_ref().map(|a| a.chart.id())
    }

    pub fn profile(&self) -> Option<&EnergyProfile> {
        self.active.as_ref().map(|a| &a.profile)
    }

    pub fn width(&self) -> u32 {
        self.chart_surface.width()
    }

    pub fn height(&self) -> u32 {
        self.chart_surface.height()
    }

    pub fn chart_surface(&self) -> &Canvas {
        &self.chart_surface
    }

    pub fn overlay(&self) -> &Canvas {
        &self.overlay
    }

    /// Replaces the current chart with one for `profile`. The previous chart
    /// is destroyed before the new one exists. Returns the new chart's layout
    /// signal; nothing is drawn until `layout` runs.
    pub fn render(&mut self, profile: EnergyProfile) -> LayoutSignal {
        self.overlay
            .resize(self.chart_surface.width(), self.chart_surface.height());

        if let Some(old) = self.active.take() {
            debug!(chart = old.chart.id().0, "destroying chart");
            old.chart.destroy();
        }
        self.chart_surface.clear();

        self.next_id += 1;
        let id = ChartId(self.next_id);
        let chart = Chart::new(
            id,
            diagram_config(&profile),
            self.chart_surface.width(),
            self.chart_surface.height(),
        );
        let signal = chart.subscribe();
        info!(
            chart = id.0,
            reactants = %profile.reactants_label,
            products = %profile.products_label,
            delta_h = profile.raw_delta_h,
            "rendering diagram"
        );
        self.active = Some(ActiveDiagram { chart, profile });
        signal
    }

    /// Layout pass of the current chart, then paints it.
    pub fn layout(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let scales = active.chart.layout();
        debug!(chart = active.chart.id().0, ?scales, "chart laid out");
        self.chart_surface.clear();
        active.chart.draw(&mut self.chart_surface);
    }

    /// Draws the Ea and ΔH arrows against the current chart's scales.
    /// Returns false without touching the overlay if there is no chart or it
    /// has not been laid out yet.
    pub fn draw_overlay_arrows(&mut self, profile: &EnergyProfile) -> bool {
        let Some(scales) = self.active.as_ref().and_then(|a| a.chart.scales()) else {
            return false;
        };
        let geometry = OverlayGeometry::from_scales(&scales, profile);
        overlay::draw_overlay_arrows(&mut self.overlay, &geometry, profile);
        true
    }

    /// Layout-ready callback. Signals from replaced charts are ignored.
    pub fn on_layout_ready(&mut self, signal: &LayoutSignal) -> bool {
        if self.current_chart_id() != Some(signal.chart_id()) {
            debug!(chart = signal.chart_id().0, "ignoring stale layout signal");
            return false;
        }
        if signal.scales().is_none() {
            return false;
        }
        let Some(profile) = self.profile().cloned() else {
            return false;
        };
        self.draw_overlay_arrows(&profile)
    }

    /// Waits for `signal` and then draws the overlay for it. Runs the layout
    /// pass itself if the current chart has not been laid out yet; signals
    /// from replaced charts return false immediately.
    pub async fn settle(&mut self, mut signal: LayoutSignal) -> bool {
        if self.current_chart_id() != Some(signal.chart_id()) {
            debug!(chart = signal.chart_id().0, "ignoring stale layout signal");
            return false;
        }
        if signal.scales().is_none() {
            self.layout();
        }
        if signal.ready().await.is_none() {
            return false;
        }
        self.on_layout_ready(&signal)
    }

    /// Full submission: render, lay out, and draw the overlay.
    pub async fn present(&mut self, profile: EnergyProfile) -> bool {
        let signal = self.render(profile);
        self.layout();
        self.settle(signal).await
    }

    pub fn chart_svg(&self) -> Result<String, String> {
        self.chart_surface.to_svg()
    }

    pub fn overlay_svg(&self) -> Result<String, String> {
        self.overlay.to_svg()
    }

    pub fn composite_svg(&self) -> Result<String, String> {
        compose_svg(&[&self.chart_surface, &self.overlay])
    }
}

impl Default for DiagramRenderer {
    fn default() -> Self {
        DiagramRenderer::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}
