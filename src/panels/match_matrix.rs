//! Word rows of the match results, one per matched position.
//!
//! Each word is shaded by how many selected units are active there.  The
//! button in front of a row opens that position.

use crate::data::query::MatchResult;
use crate::events::{EventBus, EventKind, EventPayload};
use crate::panels::component::{Component, Render};
use crate::panels::palette::{self, Rgb};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchRow {
    pub pos: i64,
    pub words: Vec<String>,
    /// Active selected units per word.
    pub counts: Vec<u32>,
    /// Length of the matched phrase, if the server ranked it.
    pub length: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchMatrixData {
    pub rows: Vec<MatchRow>,
    /// Index of the matched position within every row.
    pub left_padding: usize,
}

impl MatchMatrixData {
    pub fn from_result(result: &MatchResult) -> Self {
        let ranking = &result.results.ranking_detail;
        let rows = result
            .word_rows()
            .iter()
            .enumerate()
            .map(|(i, block)| MatchRow {
                pos: block.pos,
                words: block.words.clone(),
                counts: result.cell_count().get(i).cloned().unwrap_or_default(),
                length: ranking
                    .iter()
                    .find(|r| r.pos == block.pos)
                    .and_then(|r| r.phrase_length()),
            })
            .collect();
        Self {
            rows,
            left_padding: result.left_padding(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchMatrixOptions {
    pub cell_width: f32,
    pub cell_height: f32,
}

impl Default for MatchMatrixOptions {
    fn default() -> Self {
        Self {
            cell_width: 30.0,
            cell_height: 18.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCell {
    pub text: String,
    pub fill: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRowRender {
    pub pos: i64,
    pub cells: Vec<MatchCell>,
    /// Half-open word range of the matched phrase.
    pub phrase: Option<[usize; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchMatrixRender {
    pub rows: Vec<MatchRowRender>,
    pub cols: usize,
    pub cell_width: f32,
    pub cell_height: f32,
}

#[derive(Debug, Default)]
pub struct MatchMatrix {
    highlight: Option<(usize, usize)>,
    last_hover: Option<(usize, usize)>,
}

impl MatchMatrix {
    pub fn set_hovered(&mut self, cell: Option<(usize, usize)>) {
        self.highlight = cell;
    }

    pub fn hovered(&self) -> Option<(usize, usize)> {
        self.highlight
    }
}

impl Component for MatchMatrix {
    const NAME: &'static str = "match_matrix";
    type Data = MatchMatrixData;
    type RenderData = MatchMatrixRender;
    type Options = MatchMatrixOptions;

    fn wrangle(&self, data: &MatchMatrixData, options: &MatchMatrixOptions) -> MatchMatrixRender {
        let max = data
            .rows
            .iter()
            .flat_map(|r| r.counts.iter().copied())
            .max()
            .unwrap_or(0) as f64;

        let rows: Vec<MatchRowRender> = data
            .rows
            .iter()
            .map(|row| {
                let cells = row
                    .words
                    .iter()
                    .enumerate()
                    .map(|(i, w)| MatchCell {
                        text: w.clone(),
                        fill: row
                            .counts
                            .get(i)
                            .map_or(palette::WHITE, |&c| palette::intensity(c as f64, max)),
                    })
                    .collect::<Vec<_>>();
                let phrase = row.length.and_then(|len| {
                    let start = data.left_padding;
                    let end = (start + len).min(cells.len());
                    (start < end).then_some([start, end])
                });
                MatchRowRender {
                    pos: row.pos,
                    cells,
                    phrase,
                }
            })
            .collect();

        MatchMatrixRender {
            cols: rows.iter().map(|r| r.cells.len()).max().unwrap_or(0),
            rows,
            cell_width: options.cell_width,
            cell_height: options.cell_height,
        }
    }
}

impl Render for MatchMatrix {
    fn render(
        &mut self,
        render: &MatchMatrixRender,
        _options: &MatchMatrixOptions,
        ui: &mut egui::Ui,
        bus: &EventBus,
    ) {
        if render.rows.is_empty() {
            ui.weak("no matches");
            return;
        }

        let text_color = ui.visuals().strong_text_color();
        let highlight_color = palette::to_color32(palette::THRESHOLD_LINE);
        let mut hover = None;

        for (row_idx, row) in render.rows.iter().enumerate() {
            ui.horizontal(|ui| {
                if ui
                    .small_button("➡")
                    .on_hover_text(format!("Open position {}", row.pos))
                    .clicked()
                {
                    bus.publish(EventKind::MATCH_ROW_OPENED, EventPayload::Position(row.pos));
                }

                let size = egui::vec2(
                    row.cells.len() as f32 * render.cell_width,
                    render.cell_height,
                );
                let (rect, response) = ui.allocate_exact_size(size, egui::Sense::hover());
                let painter = ui.painter_at(rect);
                let x = |i: usize| rect.left() + i as f32 * render.cell_width;

                for (col, cell) in row.cells.iter().enumerate() {
                    let r = egui::Rect::from_min_size(
                        egui::pos2(x(col), rect.top()),
                        egui::vec2(render.cell_width, render.cell_height),
                    );
                    painter.rect_filled(r.shrink(0.5), 0.0, palette::to_color32(cell.fill));
                    painter.text(
                        r.center(),
                        egui::Align2::CENTER_CENTER,
                        &cell.text,
                        egui::FontId::proportional(11.0),
                        text_color,
                    );
                }

                if let Some([a, b]) = row.phrase {
                    let y = rect.bottom() - 1.0;
                    painter.line_segment(
                        [egui::pos2(x(a), y), egui::pos2(x(b), y)],
                        egui::Stroke::new(2.0, highlight_color),
                    );
                }

                if let Some((hr, hc)) = self.highlight {
                    if hr == row_idx || hc < row.cells.len() {
                        let stroke = egui::Stroke::new(1.0, text_color);
                        let r = if hr == row_idx {
                            rect
                        } else {
                            egui::Rect::from_min_size(
                                egui::pos2(x(hc), rect.top()),
                                egui::vec2(render.cell_width, render.cell_height),
                            )
                        };
                        painter.rect_stroke(r, 0.0, stroke, egui::StrokeKind::Inside);
                    }
                }

                if let Some(p) = response.hover_pos() {
                    if !row.cells.is_empty() {
                        let col = ((p.x - rect.left()) / render.cell_width).floor().max(0.0) as usize;
                        hover = Some((row_idx, col.min(row.cells.len() - 1)));
                    }
                }
            });
        }

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

    fn row(pos: i64, words: &[&str], counts: &[u32]) -> MatchRow {
        MatchRow {
            pos,
            words: words.iter().map(|w| w.to_string()).collect(),
            counts: counts.to_vec(),
            length: Some(2),
        }
    }

    #[test]
    fn counts_shade_against_global_maximum() {
        let data = MatchMatrixData {
            rows: vec![row(10, &["a", "b", "c"], &[0, 4, 2]), row(50, &["d", "e", "f"], &[1, 1, 0])],
            left_padding: 1,
        };
        let r = MatchMatrix::default().wrangle(&data, &MatchMatrixOptions::default());
        assert_eq!(r.cols, 3);
        assert_eq!(r.rows[0].cells[1].fill, palette::SELECTION_BLUE);
        assert_eq!(r.rows[0].cells[0].fill, palette::WHITE);
        assert_eq!(r.rows[1].pos, 50);
        assert_eq!(r.rows[0].phrase, Some([1, 3]));
    }

    #[test]
    fn missing_counts_fall_back_to_white() {
        let mut r0 = row(3, &["x", "y"], &[]);
        r0.length = None;
        let data = MatchMatrixData {
            rows: vec![r0],
            left_padding: 0,
        };
        let r = MatchMatrix::default().wrangle(&data, &MatchMatrixOptions::default());
        assert!(r.rows[0].cells.iter().all(|c| c.fill == palette::WHITE));
        assert_eq!(r.rows[0].phrase, None);
    }

    #[test]
    fn rows_are_built_from_match_result() {
        let body = br#"{"request": {}, "results": {
            "rankingDetail": [{"pos": 120, "factors": [120, 0, 3, 0.5, 0, 4, 2]}],
            "positionDetail": {
                "words": [{"pos": 120, "left": 118, "right": 124, "words": ["a","b","c","d","e","f"]}],
                "cell_count": [[0, 1, 2, 2, 1, 0]]
            }
        }}"#;
        let result = MatchResult::from_json(body).unwrap();
        let data = MatchMatrixData::from_result(&result);
        assert_eq!(data.left_padding, 2);
        assert_eq!(data.rows[0].length, Some(3));
        assert_eq!(data.rows[0].counts, vec![0, 1, 2, 2, 1, 0]);
    }
}
