//! Line plot of all hidden-unit activations over the context window.
//!
//! Selected units are drawn on top, excluded ones dimmed.  Dragging the plot
//! moves the threshold; hovering picks the closest curve.

use egui_plot::{HLine, Line, Plot};

use crate::events::{EventBus, EventKind, EventPayload};
use crate::panels::component::{Component, Render};
use crate::panels::palette::{self, Rgb};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinePlotData {
    /// Unit-major activation rows.
    pub values: Vec<Vec<f64>>,
    pub threshold: f64,
    pub selected: Vec<usize>,
    pub excluded: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePlotOptions {
    /// Horizontal space per timestep in points.
    pub cell_width: f32,
    pub height: f32,
    /// Draw the units that are not selected as a faint background.
    pub show_unselected: bool,
}

impl Default for LinePlotOptions {
    fn default() -> Self {
        Self {
            cell_width: 30.0,
            height: 200.0,
            show_unselected: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CurveRole {
    Other,
    Excluded,
    Selected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub unit: usize,
    pub role: CurveRole,
    pub points: Vec<[f64; 2]>,
}

impl Curve {
    pub fn color(&self) -> Rgb {
        match self.role {
            CurveRole::Selected => palette::SELECTED_CURVE,
            CurveRole::Excluded => palette::EXCLUDED_CURVE,
            CurveRole::Other => palette::OTHER_CURVE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinePlotRender {
    /// Drawing order: background units first, selected units last.
    pub curves: Vec<Curve>,
    pub threshold: f64,
    pub timesteps: usize,
    pub y_range: [f64; 2],
}

impl LinePlotRender {
    /// Unit whose value at the timestep nearest to `x` is closest to `y`.
    pub fn closest_unit(&self, x: f64, y: f64) -> Option<usize> {
        if self.timesteps == 0 || !x.is_finite() || !y.is_finite() {
            return None;
        }
        let t = x.round().clamp(0.0, (self.timesteps - 1) as f64) as usize;
        self.curves
            .iter()
            .filter_map(|c| c.points.get(t).map(|p| (c.unit, (p[1] - y).abs())))
            .filter(|(_, d)| d.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(u, _)| u)
    }
}

#[derive(Debug, Default)]
pub struct LinePlot {
    hovered: Option<usize>,
    last_published_hover: Option<usize>,
}

impl LinePlot {
    /// Highlight a unit hovered here or in a sibling view.
    pub fn set_hovered(&mut self, unit: Option<usize>) {
        self.hovered = unit;
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }
}

impl Component for LinePlot {
    const NAME: &'static str = "lineplot";
    type Data = LinePlotData;
    type RenderData = LinePlotRender;
    type Options = LinePlotOptions;

    fn wrangle(&self, data: &LinePlotData, options: &LinePlotOptions) -> LinePlotRender {
        let timesteps = data.values.first().map_or(0, Vec::len);
        if data.values.iter().any(|r| r.len() != timesteps) || !data.threshold.is_finite() {
            log::debug!("{}: malformed activations, showing empty plot", Self::NAME);
            return LinePlotRender::default();
        }

        let mut curves: Vec<Curve> = data
            .values
            .iter()
            .enumerate()
            .filter_map(|(unit, row)| {
                let role = if data.excluded.contains(&unit) && data.selected.contains(&unit) {
                    CurveRole::Excluded
                } else if data.selected.contains(&unit) {
                    CurveRole::Selected
                } else {
                    CurveRole::Other
                };
                if role == CurveRole::Other && !options.show_unselected {
                    return None;
                }
                let points = row
                    .iter()
                    .enumerate()
                    .map(|(t, &v)| [t as f64, v])
                    .collect();
                Some(Curve { unit, role, points })
            })
            .collect();
        curves.sort_by_key(|c| c.role);

        let (lo, hi) = data
            .values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold((data.threshold, data.threshold), |(lo, hi), v| (lo.min(v), hi.max(v)));

        LinePlotRender {
            curves,
            threshold: data.threshold,
            timesteps,
            y_range: [lo, hi],
        }
    }
}

impl Render for LinePlot {
    fn render(
        &mut self,
        render: &LinePlotRender,
        options: &LinePlotOptions,
        ui: &mut egui::Ui,
        bus: &EventBus,
    ) {
        if render.timesteps == 0 {
            ui.allocate_space(egui::vec2(ui.available_width(), options.height));
            return;
        }

        let width = render.timesteps as f32 * options.cell_width;
        let hovered = self.hovered;
        let plot = Plot::new("lstmvis_lineplot")
            .width(width)
            .height(options.height)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .show_axes([false, true])
            .include_x(-0.5)
            .include_x(render.timesteps as f64 - 0.5)
            .include_y(render.y_range[0])
            .include_y(render.y_range[1]);

        let resp = plot.show(ui, |plot_ui| {
            for curve in &render.curves {
                let mut color = palette::to_color32(curve.color());
                let mut w = if curve.role == CurveRole::Selected { 1.5 } else { 1.0 };
                if hovered == Some(curve.unit) {
                    color = egui::Color32::from_rgb(0xff, 0x7f, 0x0e);
                    w = 2.5;
                }
                let line = Line::new(format!("cell {}", curve.unit), curve.points.clone())
                    .color(color)
                    .width(w);
                plot_ui.line(line);
            }
            plot_ui.hline(
                HLine::new("threshold", render.threshold)
                    .color(palette::to_color32(palette::THRESHOLD_LINE))
                    .width(1.5),
            );
            let dragged = plot_ui
                .response()
                .dragged_by(egui::PointerButton::Primary);
            (plot_ui.pointer_coordinate(), dragged)
        });

        let (pointer, dragged) = resp.inner;
        match pointer {
            Some(p) if dragged => {
                let th = (p.y * 1000.0).round() / 1000.0;
                if th != render.threshold {
                    bus.publish(EventKind::THRESHOLD_CHANGED, EventPayload::Threshold(th));
                }
            }
            Some(p) => {
                let unit = render.closest_unit(p.x, p.y);
                if unit != self.last_published_hover {
                    self.last_published_hover = unit;
                    bus.publish(EventKind::CELL_HOVERED, EventPayload::Cell(unit));
                }
            }
            None => {
                if self.last_published_hover.take().is_some() {
                    bus.publish(EventKind::CELL_HOVERED, EventPayload::Cell(None));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> LinePlotData {
        LinePlotData {
            values: vec![vec![0.1, 0.9, 0.2], vec![-0.5, 0.0, 0.5], vec![0.3, 0.3, 0.3]],
            threshold: 0.4,
            selected: vec![0, 2],
            excluded: vec![2],
        }
    }

    #[test]
    fn selected_curves_draw_last() {
        let r = LinePlot::default().wrangle(&data(), &LinePlotOptions::default());
        let roles: Vec<(usize, CurveRole)> = r.curves.iter().map(|c| (c.unit, c.role)).collect();
        assert_eq!(
            roles,
            vec![
                (1, CurveRole::Other),
                (2, CurveRole::Excluded),
                (0, CurveRole::Selected),
            ]
        );
        assert_eq!(r.y_range, [-0.5, 0.9]);
        assert_eq!(r.timesteps, 3);
    }

    #[test]
    fn unselected_curves_can_be_hidden() {
        let opts = LinePlotOptions {
            show_unselected: false,
            ..Default::default()
        };
        let r = LinePlot::default().wrangle(&data(), &opts);
        assert_eq!(r.curves.len(), 2);
    }

    #[test]
    fn ragged_rows_render_empty() {
        let mut d = data();
        d.values[1].pop();
        let r = LinePlot::default().wrangle(&d, &LinePlotOptions::default());
        assert_eq!(r, LinePlotRender::default());
    }

    #[test]
    fn closest_unit_uses_nearest_timestep() {
        let r = LinePlot::default().wrangle(&data(), &LinePlotOptions::default());
        assert_eq!(r.closest_unit(1.2, 0.8), Some(0));
        assert_eq!(r.closest_unit(2.4, 0.45), Some(1));
        assert_eq!(r.closest_unit(f64::NAN, 0.0), None);
    }
}
