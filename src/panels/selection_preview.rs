//! Preview of the current unit selection: how many selected units fire at
//! every timestep, how well the active set overlaps the selection, and where
//! each selected unit is on.

use crate::data::selection::UnitSegments;
use crate::events::{EventBus, EventKind, EventPayload};
use crate::panels::component::{Component, Render};
use crate::panels::palette;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewData {
    pub sum_vector: Vec<u32>,
    pub iou: Vec<f64>,
    pub segments: Vec<UnitSegments>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOptions {
    pub cell_width: f32,
    pub bar_height: f32,
    pub segment_height: f32,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            cell_width: 30.0,
            bar_height: 40.0,
            segment_height: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRow {
    pub unit: usize,
    /// Half-open timestep ranges.
    pub runs: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewRender {
    pub timesteps: usize,
    /// Sum vector scaled to `[0, 1]` by its maximum.
    pub bars: Vec<f32>,
    pub iou: Vec<f32>,
    pub segments: Vec<SegmentRow>,
}

#[derive(Debug, Default)]
pub struct SelectionPreview {
    last_hover: Option<usize>,
}

impl Component for SelectionPreview {
    const NAME: &'static str = "selection_preview";
    type Data = PreviewData;
    type RenderData = PreviewRender;
    type Options = PreviewOptions;

    fn wrangle(&self, data: &PreviewData, _options: &PreviewOptions) -> PreviewRender {
        let timesteps = data.sum_vector.len();
        if data.iou.len() != timesteps {
            log::debug!("{}: sum vector and IoU lengths differ", Self::NAME);
            return PreviewRender::default();
        }
        let max = data.sum_vector.iter().copied().max().unwrap_or(0);
        let bars = data
            .sum_vector
            .iter()
            .map(|&v| if max == 0 { 0.0 } else { v as f32 / max as f32 })
            .collect();
        let iou = data
            .iou
            .iter()
            .map(|&v| if v.is_finite() { v.clamp(0.0, 1.0) as f32 } else { 0.0 })
            .collect();
        let segments = data
            .segments
            .iter()
            .map(|s| SegmentRow {
                unit: s.unit,
                runs: s
                    .runs
                    .iter()
                    .map(|r| [r.start.min(timesteps), r.end.min(timesteps)])
                    .filter(|[a, b]| a < b)
                    .collect(),
            })
            .collect();

        PreviewRender {
            timesteps,
            bars,
            iou,
            segments,
        }
    }
}

impl Render for SelectionPreview {
    fn render(
        &mut self,
        render: &PreviewRender,
        options: &PreviewOptions,
        ui: &mut egui::Ui,
        bus: &EventBus,
    ) {
        if render.timesteps == 0 {
            ui.weak("empty selection");
            return;
        }

        let width = render.timesteps as f32 * options.cell_width;
        let height = options.bar_height + render.segments.len() as f32 * options.segment_height;
        let (rect, response) = ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let x = |t: usize| rect.left() + t as f32 * options.cell_width;
        let base = rect.top() + options.bar_height;

        let bar_color = palette::to_color32(palette::SELECTION_BLUE);
        for (t, &h) in render.bars.iter().enumerate() {
            if h > 0.0 {
                let r = egui::Rect::from_min_max(
                    egui::pos2(x(t) + 1.0, base - h * options.bar_height),
                    egui::pos2(x(t + 1) - 1.0, base),
                );
                painter.rect_filled(r, 0.0, bar_color);
            }
        }

        let iou_points: Vec<egui::Pos2> = render
            .iou
            .iter()
            .enumerate()
            .map(|(t, &v)| egui::pos2(x(t) + options.cell_width / 2.0, base - v * options.bar_height))
            .collect();
        painter.add(egui::Shape::line(
            iou_points,
            egui::Stroke::new(1.5, palette::to_color32(palette::THRESHOLD_LINE)),
        ));

        let seg_color = palette::to_color32(palette::SELECTED_CURVE);
        for (i, row) in render.segments.iter().enumerate() {
            let y = base + i as f32 * options.segment_height;
            for [a, b] in &row.runs {
                let r = egui::Rect::from_min_max(
                    egui::pos2(x(*a), y + 1.0),
                    egui::pos2(x(*b), y + options.segment_height - 1.0),
                );
                painter.rect_filled(r, 1.0, seg_color);
            }
        }

        let hover = response.hover_pos().and_then(|p| {
            if p.y < base || options.segment_height <= 0.0 {
                return None;
            }
            let i = ((p.y - base) / options.segment_height) as usize;
            render.segments.get(i).map(|s| s.unit)
        });
        if hover != self.last_hover {
            self.last_hover = hover;
            bus.publish(EventKind::CELL_HOVERED, EventPayload::Cell(hover));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::selection::RunSegment;

    #[test]
    fn bars_scale_by_maximum() {
        let data = PreviewData {
            sum_vector: vec![0, 2, 4],
            iou: vec![0.0, 0.5, 1.0],
            segments: Vec::new(),
        };
        let r = SelectionPreview::default().wrangle(&data, &PreviewOptions::default());
        assert_eq!(r.bars, vec![0.0, 0.5, 1.0]);
        assert_eq!(r.iou, vec![0.0, 0.5, 1.0]);
        assert_eq!(r.timesteps, 3);
    }

    #[test]
    fn all_zero_sum_vector_has_flat_bars() {
        let data = PreviewData {
            sum_vector: vec![0, 0],
            iou: vec![0.0, 0.0],
            segments: Vec::new(),
        };
        let r = SelectionPreview::default().wrangle(&data, &PreviewOptions::default());
        assert_eq!(r.bars, vec![0.0, 0.0]);
    }

    #[test]
    fn mismatched_lengths_render_empty() {
        let data = PreviewData {
            sum_vector: vec![1, 2],
            iou: vec![0.5],
            segments: Vec::new(),
        };
        let r = SelectionPreview::default().wrangle(&data, &PreviewOptions::default());
        assert_eq!(r, PreviewRender::default());
    }

    #[test]
    fn segment_runs_are_clipped_to_context() {
        let data = PreviewData {
            sum_vector: vec![1, 1, 1],
            iou: vec![1.0, 1.0, 1.0],
            segments: vec![UnitSegments {
                unit: 7,
                runs: vec![RunSegment { start: 1, end: 5 }, RunSegment { start: 4, end: 6 }],
                anchor: None,
            }],
        };
        let r = SelectionPreview::default().wrangle(&data, &PreviewOptions::default());
        assert_eq!(r.segments, vec![SegmentRow { unit: 7, runs: vec![[1, 3]] }]);
    }
}
