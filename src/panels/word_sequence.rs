//! Token sequence laid out on a fixed grid, with the word brush and its zero
//! padding drawn on top.
//!
//! In [`WordSequenceMode::Brushable`] a primary drag sets the brush, a click
//! clears it and a secondary drag outside the brush sets the padding.  The
//! simple mode only shows words (metadata tracks).

use std::collections::BTreeSet;

use crate::events::{EventBus, EventKind, EventPayload};
use crate::panels::component::{Component, Render};
use crate::panels::palette::{self, Rgb};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordSequenceData {
    pub words: Vec<String>,
    pub brush: Option<[i64; 2]>,
    pub zero_pad: Option<[i64; 2]>,
    /// Index of the word at the requested position.
    pub left_padding: usize,
    /// Per-word weights shown as background intensity (the sum vector).
    pub backgrounds: Option<Vec<f64>>,
    /// Per-word category labels shown as background colours.
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WordSequenceMode {
    #[default]
    Brushable,
    Simple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordSequenceOptions {
    pub cell_width: f32,
    pub cell_height: f32,
    pub mode: WordSequenceMode,
}

impl Default for WordSequenceOptions {
    fn default() -> Self {
        Self {
            cell_width: 30.0,
            cell_height: 20.0,
            mode: WordSequenceMode::Brushable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordCell {
    pub text: String,
    pub x: f32,
    pub fill: Rgb,
    pub focus: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordSequenceRender {
    pub cells: Vec<WordCell>,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Brush clamped to the words, as indices.
    pub brush: Option<[usize; 2]>,
    pub zero_pad: [usize; 2],
}

#[derive(Debug, Default)]
pub struct WordSequence {
    drag_anchor: Option<usize>,
    last_brush: Option<[usize; 2]>,
    last_hover: Option<usize>,
}

impl WordSequence {
    fn word_at(render: &WordSequenceRender, left: f32, x: f32) -> Option<usize> {
        if render.cells.is_empty() || render.cell_width <= 0.0 {
            return None;
        }
        let i = ((x - left) / render.cell_width).floor();
        Some(i.clamp(0.0, (render.cells.len() - 1) as f32) as usize)
    }
}

fn fills(data: &WordSequenceData) -> Vec<Rgb> {
    let n = data.words.len();
    if let Some(cats) = data.categories.as_ref().filter(|c| c.len() == n) {
        let order: Vec<&String> = cats.iter().collect::<BTreeSet<_>>().into_iter().collect();
        return cats
            .iter()
            .map(|c| palette::category(order.iter().position(|o| *o == c).unwrap_or(0)))
            .collect();
    }
    if let Some(bg) = data.backgrounds.as_ref().filter(|b| b.len() == n) {
        let max = bg.iter().copied().filter(|v| v.is_finite()).fold(0.0, f64::max);
        return bg.iter().map(|&v| palette::intensity(v, max)).collect();
    }
    vec![palette::WHITE; n]
}

impl Component for WordSequence {
    const NAME: &'static str = "word_sequence";
    type Data = WordSequenceData;
    type RenderData = WordSequenceRender;
    type Options = WordSequenceOptions;

    fn wrangle(&self, data: &WordSequenceData, options: &WordSequenceOptions) -> WordSequenceRender {
        let n = data.words.len();
        let cells = data
            .words
            .iter()
            .zip(fills(data))
            .enumerate()
            .map(|(i, (w, fill))| WordCell {
                text: w.clone(),
                x: i as f32 * options.cell_width,
                fill,
                focus: i == data.left_padding,
            })
            .collect();

        let brush = data.brush.and_then(|[a, b]| {
            let a = a.clamp(0, n as i64) as usize;
            let b = b.clamp(0, n as i64) as usize;
            (a < b).then_some([a, b])
        });
        let zero_pad = match (brush, data.zero_pad) {
            (Some(_), Some([l, r])) => [l.max(0) as usize, r.max(0) as usize],
            _ => [0, 0],
        };

        WordSequenceRender {
            cells,
            cell_width: options.cell_width,
            cell_height: options.cell_height,
            brush,
            zero_pad,
        }
    }
}

impl Render for WordSequence {
    fn render(
        &mut self,
        render: &WordSequenceRender,
        options: &WordSequenceOptions,
        ui: &mut egui::Ui,
        bus: &EventBus,
    ) {
        let whisker = if options.mode == WordSequenceMode::Brushable { 8.0 } else { 0.0 };
        let size = egui::vec2(
            render.cells.len() as f32 * render.cell_width,
            render.cell_height + whisker,
        );
        let sense = match options.mode {
            WordSequenceMode::Brushable => egui::Sense::click_and_drag(),
            WordSequenceMode::Simple => egui::Sense::hover(),
        };
        let (rect, response) = ui.allocate_exact_size(size, sense);
        let painter = ui.painter_at(rect);
        let text_color = ui.visuals().strong_text_color();

        for cell in &render.cells {
            let r = egui::Rect::from_min_size(
                rect.left_top() + egui::vec2(cell.x, 0.0),
                egui::vec2(render.cell_width, render.cell_height),
            );
            painter.rect_filled(r.shrink(0.5), 0.0, palette::to_color32(cell.fill));
            let font = if cell.focus {
                egui::FontId::proportional(13.0)
            } else {
                egui::FontId::proportional(11.0)
            };
            painter.text(r.center(), egui::Align2::CENTER_CENTER, &cell.text, font, text_color);
        }

        if let Some([a, b]) = render.brush {
            let x = |i: usize| rect.left() + i as f32 * render.cell_width;
            let brush_rect = egui::Rect::from_min_max(
                egui::pos2(x(a), rect.top()),
                egui::pos2(x(b), rect.top() + render.cell_height),
            );
            let stroke = egui::Stroke::new(2.0, palette::to_color32(palette::SELECTION_BLUE));
            painter.rect_stroke(brush_rect, 0.0, stroke, egui::StrokeKind::Inside);

            let [l, r] = render.zero_pad;
            let y = rect.top() + render.cell_height + whisker / 2.0;
            let pad_stroke = egui::Stroke::new(2.0, palette::to_color32(palette::THRESHOLD_LINE));
            if l > 0 {
                painter.line_segment([egui::pos2(x(a.saturating_sub(l)), y), egui::pos2(x(a), y)], pad_stroke);
            }
            if r > 0 {
                painter.line_segment([egui::pos2(x(b), y), egui::pos2(x(b.saturating_add(r)), y)], pad_stroke);
            }
        }

        let hover = response
            .hover_pos()
            .and_then(|p| Self::word_at(render, rect.left(), p.x));
        if hover != self.last_hover {
            self.last_hover = hover;
            bus.publish(EventKind::WORD_HOVERED, EventPayload::Word(hover));
        }

        if options.mode != WordSequenceMode::Brushable {
            return;
        }
        let pointer_word = response
            .interact_pointer_pos()
            .and_then(|p| Self::word_at(render, rect.left(), p.x));

        if response.drag_started_by(egui::PointerButton::Primary) {
            self.drag_anchor = pointer_word;
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let (Some(anchor), Some(w)) = (self.drag_anchor, pointer_word) {
                let brush = [anchor.min(w), anchor.max(w) + 1];
                if Some(brush) != self.last_brush {
                    self.last_brush = Some(brush);
                    bus.publish(EventKind::BRUSH_CHANGED, EventPayload::Brush(Some(brush)));
                }
            }
        }
        if response.drag_stopped() {
            self.drag_anchor = None;
        }
        if response.clicked() {
            self.last_brush = None;
            bus.publish(EventKind::BRUSH_CHANGED, EventPayload::Brush(None));
        }

        if response.dragged_by(egui::PointerButton::Secondary) {
            if let (Some([a, b]), Some(w)) = (render.brush, pointer_word) {
                let [mut l, mut r] = render.zero_pad;
                if w < a {
                    l = a - w;
                } else if w >= b {
                    r = w + 1 - b;
                }
                if [l, r] != render.zero_pad {
                    bus.publish(EventKind::ZERO_PAD_CHANGED, EventPayload::ZeroPad([l, r]));
                }
            }
        }
    }
}
