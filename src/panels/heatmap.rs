//! Grid of one value per match row and timestep.
//!
//! Scalar maps blend from white to blue over a range, categorical maps give
//! every distinct label its own colour.  Hovering a cell highlights its row
//! and column here and in the sibling heat maps.

use std::collections::BTreeSet;

use crate::data::query::MetaValue;
use crate::events::{EventBus, EventKind, EventPayload};
use crate::panels::component::{Component, Render};
use crate::panels::palette::{self, Rgb};

/// Key of the heat map built from the per-position cell counts.
pub const MATCH_COUNT_KEY: &str = "match count";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatMapData {
    /// One row per matched position.
    pub values: Vec<Vec<MetaValue>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeatMapChart {
    #[default]
    Scalar,
    Categorical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatMapOptions {
    /// Identifies the map in `HEATMAP_TOGGLED`.
    pub key: String,
    pub title: String,
    pub chart: HeatMapChart,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Fixed scalar range; the data range is used when unset.
    pub range: Option<[f64; 2]>,
}

impl Default for HeatMapOptions {
    fn default() -> Self {
        Self {
            key: MATCH_COUNT_KEY.to_string(),
            title: MATCH_COUNT_KEY.to_string(),
            chart: HeatMapChart::Scalar,
            cell_width: 30.0,
            cell_height: 16.0,
            range: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatMapRender {
    pub rows: usize,
    pub cols: usize,
    /// Row-major fills, `rows * cols` long.
    pub fills: Vec<Rgb>,
    pub legend: Vec<(String, Rgb)>,
    pub cell_width: f32,
    pub cell_height: f32,
}

impl HeatMapRender {
    pub fn fill(&self, row: usize, col: usize) -> Option<Rgb> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.fills.get(row * self.cols + col).copied()
    }
}

#[derive(Debug, Default)]
pub struct HeatMap {
    highlight: Option<(usize, usize)>,
    last_hover: Option<(usize, usize)>,
}

impl HeatMap {
    /// Highlight the row and column of a cell hovered in any synced view.
    pub fn set_hovered(&mut self, cell: Option<(usize, usize)>) {
        self.highlight = cell;
    }

    pub fn hovered(&self) -> Option<(usize, usize)> {
        self.highlight
    }
}

fn scalar_fills(values: &[Vec<MetaValue>], range: Option<[f64; 2]>) -> Option<Vec<Rgb>> {
    let numbers: Vec<f64> = values
        .iter()
        .flatten()
        .map(MetaValue::as_number)
        .collect::<Option<_>>()?;
    let [lo, hi] = range.unwrap_or_else(|| {
        numbers
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold([0.0, 0.0], |[lo, hi], v| [lo.min(v), hi.max(v)])
    });
    Some(numbers.iter().map(|&v| palette::intensity(v - lo, hi - lo)).collect())
}

fn categorical_fills(values: &[Vec<MetaValue>]) -> (Vec<Rgb>, Vec<(String, Rgb)>) {
    let labels: Vec<String> = values.iter().flatten().map(MetaValue::label).collect();
    let order: Vec<&String> = labels.iter().collect::<BTreeSet<_>>().into_iter().collect();
    let fills = labels
        .iter()
        .map(|l| palette::category(order.iter().position(|o| *o == l).unwrap_or(0)))
        .collect();
    let legend = order
        .iter()
        .enumerate()
        .map(|(i, l)| ((*l).clone(), palette::category(i)))
        .collect();
    (fills, legend)
}

impl Component for HeatMap {
    const NAME: &'static str = "heatmap";
    type Data = HeatMapData;
    type RenderData = HeatMapRender;
    type Options = HeatMapOptions;

    fn wrangle(&self, data: &HeatMapData, options: &HeatMapOptions) -> HeatMapRender {
        let rows = data.values.len();
        let cols = data.values.first().map_or(0, Vec::len);
        if rows == 0 || data.values.iter().any(|r| r.len() != cols) {
            return HeatMapRender::default();
        }

        let (fills, legend) = match options.chart {
            HeatMapChart::Scalar => match scalar_fills(&data.values, options.range) {
                Some(fills) => (fills, Vec::new()),
                None => {
                    log::debug!("{} '{}': non-numeric values", Self::NAME, options.key);
                    return HeatMapRender::default();
                }
            },
            HeatMapChart::Categorical => categorical_fills(&data.values),
        };

        HeatMapRender {
            rows,
            cols,
            fills,
            legend,
            cell_width: options.cell_width,
            cell_height: options.cell_height,
        }
    }
}

impl Render for HeatMap {
    fn render(
        &mut self,
        render: &HeatMapRender,
        options: &HeatMapOptions,
        ui: &mut egui::Ui,
        bus: &EventBus,
    ) {
        ui.horizontal(|ui| {
            ui.strong(&options.title);
            if ui.small_button("✕").on_hover_text("Hide").clicked() {
                bus.publish(
                    EventKind::HEATMAP_TOGGLED,
                    EventPayload::Heatmap(options.key.clone()),
                );
            }
            for (label, color) in &render.legend {
                ui.colored_label(palette::to_color32(*color), label);
            }
        });

        if render.rows == 0 {
            ui.weak("no data");
            return;
        }

        let size = egui::vec2(
            render.cols as f32 * render.cell_width,
            render.rows as f32 * render.cell_height,
        );
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let cell_rect = |row: usize, col: usize| {
            egui::Rect::from_min_size(
                rect.left_top()
                    + egui::vec2(col as f32 * render.cell_width, row as f32 * render.cell_height),
                egui::vec2(render.cell_width, render.cell_height),
            )
        };

        for row in 0..render.rows {
            for col in 0..render.cols {
                if let Some(fill) = render.fill(row, col) {
                    painter.rect_filled(cell_rect(row, col).shrink(0.5), 0.0, palette::to_color32(fill));
                }
            }
        }

        if let Some((row, col)) = self.highlight {
            let stroke = egui::Stroke::new(1.0, ui.visuals().strong_text_color());
            if row < render.rows {
                let r = egui::Rect::from_min_max(
                    cell_rect(row, 0).left_top(),
                    cell_rect(row, render.cols - 1).right_bottom(),
                );
                painter.rect_stroke(r, 0.0, stroke, egui::StrokeKind::Inside);
            }
            if col < render.cols {
                let r = egui::Rect::from_min_max(
                    cell_rect(0, col).left_top(),
                    cell_rect(render.rows - 1, col).right_bottom(),
                );
                painter.rect_stroke(r, 0.0, stroke, egui::StrokeKind::Inside);
            }
        }

        let hover = response.hover_pos().map(|p| {
            let local = p - rect.left_top();
            let col = (local.x / render.cell_width).floor().max(0.0) as usize;
            let row = (local.y / render.cell_height).floor().max(0.0) as usize;
            (row.min(render.rows - 1), col.min(render.cols - 1))
        });
        if hover != self.last_hover {
            match (hover, self.last_hover) {
                (Some((row, col)), _) => bus.publish(
                    EventKind::HEATMAP_HOVERED,
                    EventPayload::HeatmapCell { row, col, active: true },
                ),
                (None, Some((row, col))) => bus.publish(
                    EventKind::HEATMAP_HOVERED,
                    EventPayload::HeatmapCell { row, col, active: false },
                ),
                (None, None) => {}
            }
            self.last_hover = hover;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(rows: &[&[f64]]) -> HeatMapData {
        HeatMapData {
            values: rows
                .iter()
                .map(|r| r.iter().map(|&v| MetaValue::Number(v)).collect())
                .collect(),
        }
    }

    fn labels(rows: &[&[&str]]) -> HeatMapData {
        HeatMapData {
            values: rows
                .iter()
                .map(|r| r.iter().map(|&v| MetaValue::Label(v.to_string())).collect())
                .collect(),
        }
    }

    #[test]
    fn scalar_map_spans_data_range() {
        let r = HeatMap::default().wrangle(&numbers(&[&[0.0, 2.0], &[4.0, 1.0]]), &HeatMapOptions::default());
        assert_eq!((r.rows, r.cols), (2, 2));
        assert_eq!(r.fill(0, 0), Some(palette::WHITE));
        assert_eq!(r.fill(1, 0), Some(palette::SELECTION_BLUE));
        assert_eq!(r.fill(2, 0), None);
    }

    #[test]
    fn scalar_map_honours_fixed_range() {
        let opts = HeatMapOptions {
            range: Some([0.0, 8.0]),
            ..Default::default()
        };
        let r = HeatMap::default().wrangle(&numbers(&[&[4.0, 8.0]]), &opts);
        assert_ne!(r.fill(0, 0), Some(palette::SELECTION_BLUE));
        assert_eq!(r.fill(0, 1), Some(palette::SELECTION_BLUE));
    }

    #[test]
    fn labels_in_scalar_map_render_empty() {
        let r = HeatMap::default().wrangle(&labels(&[&["a"]]), &HeatMapOptions::default());
        assert_eq!(r, HeatMapRender::default());
    }

    #[test]
    fn categorical_map_builds_sorted_legend() {
        let opts = HeatMapOptions {
            chart: HeatMapChart::Categorical,
            ..Default::default()
        };
        let r = HeatMap::default().wrangle(&labels(&[&["VB", "NN"], &["NN", "DT"]]), &opts);
        let names: Vec<&str> = r.legend.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(names, vec!["DT", "NN", "VB"]);
        assert_eq!(r.fill(0, 1), r.fill(1, 0));
        assert_eq!(r.fill(1, 1), Some(palette::category(0)));
    }

    #[test]
    fn ragged_rows_render_empty() {
        let r = HeatMap::default().wrangle(&numbers(&[&[1.0, 2.0], &[1.0]]), &HeatMapOptions::default());
        assert_eq!(r, HeatMapRender::default());
    }
}
