/// Ea and ΔH annotation arrows drawn on the transparent layer above the chart.

use crate::canvas::{Canvas, Color, Point};
use crate::chart::Scales;
use crate::profile::{format_number, EnergyProfile};

/// Category index of the activated complex.
pub const ACTIVATED_COMPLEX_INDEX: f64 = 1.0;
/// The ΔH arrow sits this far right of the activated complex so it does not
/// overlap the Ea arrow.
pub const DELTA_H_OFFSET: f64 = 20.0;
pub const ARROWHEAD_LENGTH: f64 = 10.0;
pub const ARROWHEAD_WIDTH: f64 = 10.0;
pub const LABEL_GAP: f64 = 10.0;
/// Fixed distance of the Ea label left of centre, independent of text width.
pub const EA_LABEL_OFFSET: f64 = 90.0;
pub const LABEL_FONT: &str = "16px Arial";
const LINE_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowDirection {
    Up,
    Down,
}

impl ArrowDirection {
    /// Screen-space sign: +1 moving down, -1 moving up.
    pub fn sign(self) -> f64 {
        match self {
            ArrowDirection::Up => -1.0,
            ArrowDirection::Down => 1.0,
        }
    }
}

/// Direction of travel from `y_from` to `y_to` in pixel space (y grows downward).
pub fn arrow_direction(y_from: f64, y_to: f64) -> ArrowDirection {
    if y_to > y_from {
        ArrowDirection::Down
    } else {
        ArrowDirection::Up
    }
}

/// Triangle with its tip at `tip`, base set back against the direction of travel.
pub fn arrowhead(tip: Point, direction: ArrowDirection) -> [Point; 3] {
    let base_y = tip.y - ARROWHEAD_LENGTH * direction.sign();
    let half = ARROWHEAD_WIDTH / 2.0;
    [
        tip,
        Point::new(tip.x - half, base_y),
        Point::new(tip.x + half, base_y),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    pub x_middle: f64,
    pub y_reactants: f64,
    pub y_products: f64,
    pub y_activated: f64,
}

impl OverlayGeometry {
    pub fn from_scales(scales: &Scales, profile: &EnergyProfile) -> Self {
        OverlayGeometry {
            x_middle: scales.x.pixel_for_value(ACTIVATED_COMPLEX_INDEX),
            y_reactants: scales.y.pixel_for_value(profile.reactant_energy),
            y_products: scales.y.pixel_for_value(profile.product_energy),
            y_activated: scales.y.pixel_for_value(profile.activated_complex_energy),
        }
    }
}

pub fn delta_h_label(profile: &EnergyProfile) -> String {
    format!("ΔH = {} kJ", format_number(profile.raw_delta_h))
}

pub fn activation_label(profile: &EnergyProfile) -> String {
    format!("Ea = {} kJ", format_number(profile.activation_energy()))
}

/// Clears the overlay and draws both arrows with their labels. Drawing state
/// is restored before returning.
pub fn draw_overlay_arrows(canvas: &mut Canvas, geometry: &OverlayGeometry, profile: &EnergyProfile) {
    let OverlayGeometry {
        x_middle,
        y_reactants,
        y_products,
        y_activated,
    } = *geometry;

    canvas.clear();
    canvas.save();
    canvas.set_line_width(LINE_WIDTH);
    canvas.set_font(LABEL_FONT);

    // ΔH: reactants -> products, head at the product end
    let x_dh = x_middle + DELTA_H_OFFSET;
    vertical_line(canvas, x_dh, y_reactants, y_products, Color::RED);
    let toward_products = arrow_direction(y_reactants, y_products);
    fill_triangle(canvas, arrowhead(Point::new(x_dh, y_products), toward_products), Color::RED);
    canvas.set_fill_color(Color::RED);
    let mid_dh = (y_reactants + y_products) / 2.0;
    canvas.fill_text(&delta_h_label(profile), x_dh + LABEL_GAP, mid_dh - 5.0);

    // Ea: heads at both ends pointing away from each other
    vertical_line(canvas, x_middle, y_activated, y_reactants, Color::ORANGE);
    let top = arrowhead(
        Point::new(x_middle, y_activated),
        arrow_direction(y_reactants, y_activated),
    );
    let bottom = arrowhead(
        Point::new(x_middle, y_reactants),
        arrow_direction(y_activated, y_reactants),
    );
    fill_triangle(canvas, top, Color::ORANGE);
    fill_triangle(canvas, bottom, Color::ORANGE);
    canvas.set_fill_color(Color::ORANGE);
    let mid_ea = (y_reactants + y_activated) / 2.0;
    canvas.fill_text(&activation_label(profile), x_middle - EA_LABEL_OFFSET, mid_ea + 15.0);

    canvas.restore();
}

fn vertical_line(canvas: &mut Canvas, x: f64, y_from: f64, y_to: f64, color: Color) {
    canvas.begin_path();
    canvas.move_to(x, y_from);
    canvas.line_to(x, y_to);
    canvas.set_stroke_color(color);
    canvas.stroke();
}

fn fill_triangle(canvas: &mut Canvas, corners: [Point; 3], color: Color) {
    let [a, b, c] = corners;
    canvas.begin_path();
    canvas.move_to(a.x, a.y);
    canvas.line_to(b.x, b.y);
    canvas.line_to(c.x, c.y);
    canvas.close_path();
    canvas.set_fill_color(color);
    canvas.fill();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawState, PathCmd, Shape};
    use crate::chart::{CategoryScale, LinearScale};

    fn scales() -> Scales {
        Scales {
            x: CategoryScale {
                left: 100.0,
                right: 700.0,
                count: 3,
            },
            y: LinearScale {
                min: -300.0,
                max: 300.0,
                step: 100.0,
                top: 0.0,
                bottom: 600.0,
            },
        }
    }

    fn texts(canvas: &Canvas) -> Vec<(String, Point, Color)> {
        canvas
            .shapes()
            .iter()
            .filter_map(|s| match s {
                Shape::Text { text, at, color, .. } => Some((text.clone(), *at, *color)),
                _ => None,
            })
            .collect()
    }

    fn filled_triangles(canvas: &Canvas) -> Vec<(Vec<PathCmd>, Color)> {
        canvas
            .shapes()
            .iter()
            .filter_map(|s| match s {
                Shape::Path {
                    cmds,
                    fill: Some(color),
                    ..
                } => Some((cmds.clone(), *color)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_arrow_direction() {
        assert_eq!(arrow_direction(100.0, 200.0), ArrowDirection::Down);
        assert_eq!(arrow_direction(200.0, 100.0), ArrowDirection::Up);
    }

    #[test]
    fn test_arrowhead_geometry() {
        let down = arrowhead(Point::new(50.0, 100.0), ArrowDirection::Down);
        assert_eq!(down[0], Point::new(50.0, 100.0));
        assert_eq!(down[1], Point::new(45.0, 90.0));
        assert_eq!(down[2], Point::new(55.0, 90.0));

        let up = arrowhead(Point::new(50.0, 100.0), ArrowDirection::Up);
        assert_eq!(up[1], Point::new(45.0, 110.0));
        assert_eq!(up[2], Point::new(55.0, 110.0));
    }

    #[test]
    fn test_geometry_from_scales() {
        let profile = EnergyProfile::derive(&["A"], &["B"], -200.0);
        let g = OverlayGeometry::from_scales(&scales(), &profile);
        assert_eq!(g.x_middle, 400.0);
        assert_eq!(g.y_reactants, 300.0);
        assert_eq!(g.y_products, 500.0);
        assert_eq!(g.y_activated, 50.0);
    }

    #[test]
    fn test_exothermic_arrows() {
        let profile = EnergyProfile::derive(&["A"], &["B"], -200.0);
        let g = OverlayGeometry::from_scales(&scales(), &profile);
        let mut canvas = Canvas::new(800, 600);
        draw_overlay_arrows(&mut canvas, &g, &profile);

        let labels = texts(&canvas);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].0, "ΔH = -200 kJ");
        assert_eq!(labels[0].1, Point::new(430.0, 395.0));
        assert_eq!(labels[0].2, Color::RED);
        assert_eq!(labels[1].0, "Ea = 250 kJ");
        assert_eq!(labels[1].1, Point::new(310.0, 190.0));
        assert_eq!(labels[1].2, Color::ORANGE);

        let heads = filled_triangles(&canvas);
        assert_eq!(heads.len(), 3);
        // ΔH head points down toward the products
        assert_eq!(heads[0].0[0], PathCmd::MoveTo(Point::new(420.0, 500.0)));
        assert_eq!(heads[0].0[1], PathCmd::LineTo(Point::new(415.0, 490.0)));
        assert_eq!(heads[0].1, Color::RED);
        // Ea heads point outward
        assert_eq!(heads[1].0[1], PathCmd::LineTo(Point::new(395.0, 60.0)));
        assert_eq!(heads[2].0[1], PathCmd::LineTo(Point::new(395.0, 290.0)));
        assert!(heads[1..].iter().all(|(_, c)| *c == Color::ORANGE));
    }

    #[test]
    fn test_endothermic_delta_h_points_up() {
        let profile = EnergyProfile::derive(&["A"], &["B"], 100.0);
        let g = OverlayGeometry::from_scales(&scales(), &profile);
        let mut canvas = Canvas::new(800, 600);
        draw_overlay_arrows(&mut canvas, &g, &profile);

        let heads = filled_triangles(&canvas);
        assert_eq!(heads[0].0[0], PathCmd::MoveTo(Point::new(420.0, 200.0)));
        assert_eq!(heads[0].0[1], PathCmd::LineTo(Point::new(415.0, 210.0)));
    }

    #[test]
    fn test_lines_are_two_pixels() {
        let profile = EnergyProfile::derive(&["A"], &["B"], 100.0);
        let g = OverlayGeometry::from_scales(&scales(), &profile);
        let mut canvas = Canvas::new(800, 600);
        draw_overlay_arrows(&mut canvas, &g, &profile);

        let strokes: Vec<_> = canvas
            .shapes()
            .iter()
            .filter_map(|s| match s {
                Shape::Path { stroke: Some(stroke), .. } => Some(stroke.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].color, Color::RED);
        assert_eq!(strokes[1].color, Color::ORANGE);
        assert!(strokes.iter().all(|s| s.width == 2.0));
    }

    #[test]
    fn test_state_does_not_leak() {
        let profile = EnergyProfile::derive(&["A"], &["B"], 100.0);
        let g = OverlayGeometry::from_scales(&scales(), &profile);
        let mut canvas = Canvas::new(800, 600);
        draw_overlay_arrows(&mut canvas, &g, &profile);
        assert_eq!(canvas.state(), &DrawState::default());
        assert_eq!(canvas.saved_depth(), 0);
    }

    #[test]
    fn test_redraw_replaces_previous() {
        let profile = EnergyProfile::derive(&["A"], &["B"], 100.0);
        let g = OverlayGeometry::from_scales(&scales(), &profile);
        let mut canvas = Canvas::new(800, 600);
        draw_overlay_arrows(&mut canvas, &g, &profile);
        let first = canvas.shapes().len();
        draw_overlay_arrows(&mut canvas, &g, &profile);
        assert_eq!(canvas.shapes().len(), first);
    }
}
