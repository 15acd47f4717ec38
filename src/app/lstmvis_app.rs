//! Native window around the [`ViewCoordinator`].
//!
//! [`LstmVisApp`] lays out the toolbar, the selection panel and the matching
//! panel.  Toolbar actions publish on the panel buses like any view; the
//! coordinator handles them after drawing.

use std::time::Duration;

use eframe::egui;

use crate::config::LstmVisConfig;
use crate::coordinator::ViewCoordinator;
use crate::data::query::{MatchMode, MetaVisKind};
use crate::events::{EventKind, EventPayload};

pub struct LstmVisApp {
    coordinator: ViewCoordinator,
    config: LstmVisConfig,
    search_text: String,
    jump_text: String,
    started: bool,
    last_size: Option<[f32; 2]>,
}

impl LstmVisApp {
    pub fn new(coordinator: ViewCoordinator, config: LstmVisConfig) -> Self {
        Self {
            coordinator,
            config,
            search_text: String::new(),
            jump_text: String::new(),
            started: false,
            last_size: None,
        }
    }

    pub fn coordinator(&self) -> &ViewCoordinator {
        &self.coordinator
    }

    fn publish_resize(&mut self, ctx: &egui::Context) {
        let Some(rect) = ctx.input(|i| i.viewport().inner_rect) else {
            return;
        };
        let size = [rect.width(), rect.height()];
        let changed = self.last_size.map_or(true, |prev| {
            (prev[0] - size[0]).abs() > 0.5 || (prev[1] - size[1]).abs() > 0.5
        });
        if changed {
            self.last_size = Some(size);
            self.coordinator.global_bus().publish(
                EventKind::WINDOW_RESIZE,
                EventPayload::Resize {
                    width: size[0],
                    height: size[1],
                },
            );
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let ctrl = self.coordinator.controller();
        let project = ctrl.project().to_string();
        let pos = ctrl.pos();
        let cell_width = ctrl.cell_width();
        let mut threshold = ctrl.threshold();
        let step = self.config.position_step;
        let selection_bus = self.coordinator.selection.bus.clone();
        let global_bus = self.coordinator.global_bus().clone();

        ui.horizontal_wrapped(|ui| {
            ui.strong(&self.config.title);
            if !project.is_empty() {
                ui.label(format!("{} / {}", project, self.coordinator.controller().source()));
            }
            ui.separator();

            if ui.button("◀").on_hover_text(format!("Back {step}")).clicked() {
                selection_bus.publish(EventKind::POSITION_SHIFTED, EventPayload::Position(-step));
            }
            ui.label(format!("pos {pos}"));
            if ui.button("▶").on_hover_text(format!("Forward {step}")).clicked() {
                selection_bus.publish(EventKind::POSITION_SHIFTED, EventPayload::Position(step));
            }
            ui.separator();

            ui.label("Threshold");
            let resp = ui.add(egui::DragValue::new(&mut threshold).speed(0.01).range(-1.0..=1.0));
            if resp.changed() {
                selection_bus.publish(EventKind::THRESHOLD_CHANGED, EventPayload::Threshold(threshold));
            }
            ui.separator();

            ui.label("Cell width");
            let cw_step = self.config.cell_width_step;
            if ui.small_button("−").clicked() {
                global_bus.publish(
                    EventKind::CELL_WIDTH_CHANGED,
                    EventPayload::CellWidth(cell_width.saturating_sub(cw_step)),
                );
            }
            ui.label(cell_width.to_string());
            if ui.small_button("+").clicked() {
                global_bus.publish(
                    EventKind::CELL_WIDTH_CHANGED,
                    EventPayload::CellWidth(cell_width + cw_step),
                );
            }
            ui.separator();

            if ui.button("Copy link").clicked() {
                let link = format!("?{}", self.coordinator.controller().current_url());
                ui.ctx().copy_text(link);
            }
            if self.coordinator.status().loading {
                ui.spinner();
            }
        });
    }

    fn search_bar(&mut self, ui: &mut egui::Ui) {
        let searchable = self
            .coordinator
            .controller()
            .project_info()
            .is_some_and(|p| p.is_searchable);
        ui.horizontal(|ui| {
            ui.label("Go to");
            let resp = ui.add(egui::TextEdit::singleline(&mut self.jump_text).desired_width(80.0));
            if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                match self.jump_text.trim().parse::<i64>() {
                    Ok(pos) => {
                        self.coordinator.jump_to_position(pos);
                    }
                    Err(_) => log::debug!("not a position: {:?}", self.jump_text),
                }
            }
            if searchable {
                ui.separator();
                ui.label("Search");
                let resp = ui.add(egui::TextEdit::singleline(&mut self.search_text).desired_width(200.0));
                if resp.lost_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter))
                    && !self.search_text.trim().is_empty()
                {
                    let q = self.search_text.trim().to_string();
                    self.coordinator.controller_mut().request_search(&q);
                }
            }
        });

        let hits: Vec<(i64, String)> = self
            .coordinator
            .controller()
            .search_result()
            .map(|r| r.hits.iter().map(|h| (h.index, h.text.clone())).collect())
            .unwrap_or_default();
        if !hits.is_empty() {
            egui::CollapsingHeader::new(format!("{} search hits", hits.len()))
                .id_salt("search_hits")
                .show(ui, |ui| {
                    for (index, text) in hits {
                        if ui.link(format!("{index}: {text}")).clicked() {
                            self.coordinator.jump_to_position(index);
                        }
                    }
                });
        }
    }

    fn meta_menu(&mut self, ui: &mut egui::Ui) {
        let Some(info) = self.coordinator.controller().project_info() else {
            return;
        };
        let dims: Vec<String> = info
            .meta
            .iter()
            .filter(|(_, d)| matches!(d.vis.kind, MetaVisKind::Scalar | MetaVisKind::Discrete))
            .map(|(n, _)| n.clone())
            .collect();
        if dims.is_empty() {
            return;
        }
        let visible = self.coordinator.controller().visible_meta().to_vec();
        ui.menu_button("Metadata", |ui| {
            for name in dims {
                let mut shown = visible.contains(&name);
                if ui.checkbox(&mut shown, &name).changed() {
                    if shown {
                        self.coordinator.add_meta_track(&name);
                    } else {
                        self.coordinator.remove_meta_track(&name);
                    }
                }
            }
        });
    }

    fn selection_panel(&mut self, ui: &mut egui::Ui) {
        let panel = &mut self.coordinator.selection;
        panel.lineplot.show(ui);
        panel.words.show(ui);
        for (name, host) in &mut panel.meta_tracks {
            ui.label(egui::RichText::new(name.as_str()).small().weak());
            host.show(ui);
        }
        ui.add_space(4.0);
        panel.preview.show(ui);
        ui.add_space(4.0);
        ui.label("Selected cells");
        panel.cells.show(ui);
    }

    fn match_panel(&mut self, ui: &mut egui::Ui) {
        let mut mode = self.coordinator.match_mode();
        let has_cells = !self.coordinator.controller().effective_cells().is_empty();
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("match_mode")
                .selected_text(mode.as_str())
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut mode, MatchMode::Fast, MatchMode::Fast.as_str());
                    ui.selectable_value(&mut mode, MatchMode::Precise, MatchMode::Precise.as_str());
                });
            if ui.add_enabled(has_cells, egui::Button::new("Match")).clicked() {
                self.coordinator.set_match_mode(mode);
                self.coordinator.request_match();
            }
            let hidden: Vec<String> = self
                .coordinator
                .matching
                .heatmaps
                .iter()
                .filter(|s| !s.visible)
                .map(|s| s.key.clone())
                .collect();
            if !hidden.is_empty() {
                ui.menu_button("Heat maps", |ui| {
                    for key in hidden {
                        if ui.button(&key).clicked() {
                            self.coordinator.toggle_heatmap(&key);
                        }
                    }
                });
            }
        });
        self.coordinator.set_match_mode(mode);

        if let Some(link) = self.coordinator.status().opened_link.clone() {
            ui.horizontal(|ui| {
                ui.monospace(format!("?{link}"));
                if ui.small_button("Copy").clicked() {
                    ui.ctx().copy_text(format!("?{link}"));
                }
            });
        }

        let panel = &mut self.coordinator.matching;
        panel.matrix.show(ui);
        for slot in panel.heatmaps.iter_mut().filter(|s| s.visible) {
            ui.add_space(4.0);
            slot.host.show(ui);
        }
    }
}

impl eframe::App for LstmVisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.started {
            self.started = true;
            self.coordinator.start();
        }
        self.coordinator.tick();
        self.publish_resize(ctx);

        egui::TopBottomPanel::top("lstmvis_toolbar").show(ctx, |ui| {
            self.toolbar(ui);
            ui.horizontal(|ui| {
                self.meta_menu(ui);
            });
            self.search_bar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(query) = self.coordinator.status().wrong_parameters.clone() {
                ui.heading("Missing parameters");
                ui.label("project, pos and source are required, got:");
                ui.monospace(format!("?{query}"));
                return;
            }
            egui::ScrollArea::both().show(ui, |ui| {
                egui::CollapsingHeader::new("Select")
                    .default_open(true)
                    .show(ui, |ui| self.selection_panel(ui));
                egui::CollapsingHeader::new("Match")
                    .default_open(true)
                    .show(ui, |ui| self.match_panel(ui));
            });
        });

        self.coordinator.pump();

        if self.coordinator.has_pending() || self.coordinator.status().loading {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}
