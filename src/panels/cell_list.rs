//! Sorted list of the selected hidden units.  Clicking a unit toggles its
//! exclusion.

use crate::events::{EventBus, EventKind, EventPayload};
use crate::panels::component::{Component, Render};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellListData {
    pub cells: Vec<usize>,
    pub excluded: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellListOptions {
    pub cell_width: f32,
    pub cell_height: f32,
}

impl Default for CellListOptions {
    fn default() -> Self {
        Self {
            cell_width: 30.0,
            cell_height: 18.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEntry {
    pub cell: usize,
    pub excluded: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellListRender {
    pub entries: Vec<CellEntry>,
}

#[derive(Debug, Default)]
pub struct CellList {
    hovered: Option<usize>,
    last_published_hover: Option<usize>,
}

impl CellList {
    pub fn set_hovered(&mut self, cell: Option<usize>) {
        self.hovered = cell;
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }
}

impl Component for CellList {
    const NAME: &'static str = "cell_list";
    type Data = CellListData;
    type RenderData = CellListRender;
    type Options = CellListOptions;

    fn wrangle(&self, data: &CellListData, _options: &CellListOptions) -> CellListRender {
        let mut cells = data.cells.clone();
        cells.sort_unstable();
        cells.dedup();
        CellListRender {
            entries: cells
                .into_iter()
                .map(|cell| CellEntry {
                    cell,
                    excluded: data.excluded.contains(&cell),
                })
                .collect(),
        }
    }
}

impl Render for CellList {
    fn render(
        &mut self,
        render: &CellListRender,
        options: &CellListOptions,
        ui: &mut egui::Ui,
        bus: &EventBus,
    ) {
        if render.entries.is_empty() {
            ui.weak("no cells selected");
            return;
        }
        let mut hover = None;
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().interact_size = egui::vec2(options.cell_width, options.cell_height);
            for entry in &render.entries {
                let mut text = egui::RichText::new(entry.cell.to_string()).monospace();
                if entry.excluded {
                    text = text.strikethrough().weak();
                }
                let selected = self.hovered == Some(entry.cell);
                let resp = ui.selectable_label(selected, text);
                if resp.hovered() {
                    hover = Some(entry.cell);
                }
                if resp.clicked() {
                    bus.publish(EventKind::CELL_TOGGLED, EventPayload::Cell(Some(entry.cell)));
                }
            }
        });
        if hover != self.last_published_hover {
            self.last_published_hover = hover;
            bus.publish(EventKind::CELL_HOVERED, EventPayload::Cell(hover));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_sorted_and_marked() {
        let data = CellListData {
            cells: vec![9, 2, 5, 2],
            excluded: vec![5],
        };
        let r = CellList::default().wrangle(&data, &CellListOptions::default());
        assert_eq!(
            r.entries,
            vec![
                CellEntry { cell: 2, excluded: false },
                CellEntry { cell: 5, excluded: true },
                CellEntry { cell: 9, excluded: false },
            ]
        );
    }

    #[test]
    fn empty_selection_is_empty_list() {
        let r = CellList::default().wrangle(&CellListData::default(), &CellListOptions::default());
        assert!(r.entries.is_empty());
    }
}
