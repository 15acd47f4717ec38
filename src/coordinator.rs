//! Wiring between the views and the [`StateController`].
//!
//! Two panels each get a local bus: the selection panel (line plot, word
//! sequence, metadata tracks, cell list, selection preview) and the matching
//! panel (match matrix, heat maps).  The controller broadcasts on the global
//! bus.  The coordinator listens on all three through channels and handles the
//! queued events in [`pump`](ViewCoordinator::pump), after rendering, so that
//! no handler runs while a view is still borrowed.
//!
//! Every interaction becomes exactly one controller call followed by a
//! selection recompute, a `SELECTION_CHANGED` broadcast on the selection bus
//! and one `update` per affected view.  Every controller broadcast becomes
//! exactly one `update` per view that shows its data.  Views never touch the
//! parameter map.

use std::rc::Rc;
use std::sync::mpsc::Receiver;

use crate::config::LstmVisConfig;
use crate::controllers::{MatchRequest, StateController};
use crate::data::params::{ParamKey, ParamValue};
use crate::data::query::{MatchMode, MetaValue, MetaVisKind};
use crate::events::{BusEvent, EventBus, EventFilter, EventKind, EventPayload, Subscription};
use crate::panels::cell_list::{CellList, CellListData, CellListOptions};
use crate::panels::component::ComponentHost;
use crate::panels::heatmap::{HeatMap, HeatMapChart, HeatMapData, HeatMapOptions, MATCH_COUNT_KEY};
use crate::panels::lineplot::{LinePlot, LinePlotData, LinePlotOptions};
use crate::panels::match_matrix::{MatchMatrix, MatchMatrixData, MatchMatrixOptions};
use crate::panels::selection_preview::{PreviewData, PreviewOptions, SelectionPreview};
use crate::panels::word_sequence::{
    WordSequence, WordSequenceData, WordSequenceMode, WordSequenceOptions,
};
use crate::throttle::{Clock, SystemClock, Throttle};
use crate::transport::Ticket;

/// Interactions the coordinator handles from the selection panel.
const SELECTION_INTERACTIONS: EventKind = EventKind::BRUSH_CHANGED
    .union(EventKind::ZERO_PAD_CHANGED)
    .union(EventKind::THRESHOLD_CHANGED)
    .union(EventKind::CELL_HOVERED)
    .union(EventKind::CELL_TOGGLED)
    .union(EventKind::POSITION_SHIFTED);

/// Interactions the coordinator handles from the matching panel.
const MATCH_INTERACTIONS: EventKind = EventKind::HEATMAP_HOVERED
    .union(EventKind::HEATMAP_TOGGLED)
    .union(EventKind::MATCH_ROW_OPENED);

/// Application-wide events the coordinator reacts to.
const GLOBAL_EVENTS: EventKind = EventKind::WRONG_PARAMETERS
    .union(EventKind::CONTEXT_REQUEST_SENT)
    .union(EventKind::NEW_CONTEXT_AVAILABLE)
    .union(EventKind::NEW_MATCH_RESULTS)
    .union(EventKind::PROJECTS_META_AVAILABLE)
    .union(EventKind::SEARCH_RESULTS)
    .union(EventKind::WINDOW_RESIZE)
    .union(EventKind::CELL_WIDTH_CHANGED);

/// Views of the selection panel.
pub struct SelectionPanel {
    pub bus: EventBus,
    pub lineplot: ComponentHost<LinePlot>,
    pub words: ComponentHost<WordSequence>,
    /// Metadata tracks under the words, in display order.
    pub meta_tracks: Vec<(String, ComponentHost<WordSequence>)>,
    pub cells: ComponentHost<CellList>,
    pub preview: ComponentHost<SelectionPreview>,
}

/// One heat map of the matching panel.
pub struct HeatmapSlot {
    pub key: String,
    pub visible: bool,
    pub host: ComponentHost<HeatMap>,
}

/// Views of the matching panel.
pub struct MatchPanel {
    pub bus: EventBus,
    pub matrix: ComponentHost<MatchMatrix>,
    pub heatmaps: Vec<HeatmapSlot>,
}

impl MatchPanel {
    pub fn heatmap(&self, key: &str) -> Option<&HeatmapSlot> {
        self.heatmaps.iter().find(|s| s.key == key)
    }
}

/// What the chrome around the panels shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    /// A context request is in flight.
    pub loading: bool,
    /// Query string that could not start the application.
    pub wrong_parameters: Option<String>,
    /// Link produced by the last opened match row.
    pub opened_link: Option<String>,
    pub window_size: Option<[f32; 2]>,
}

pub struct ViewCoordinator {
    controller: StateController,
    global: EventBus,
    pub selection: SelectionPanel,
    pub matching: MatchPanel,

    selection_rx: Receiver<BusEvent>,
    match_rx: Receiver<BusEvent>,
    global_rx: Receiver<BusEvent>,
    subscriptions: Vec<Subscription>,

    clock: Rc<dyn Clock>,
    brush_throttle: Throttle<Option<[usize; 2]>>,
    pad_throttle: Throttle<[usize; 2]>,
    threshold_throttle: Throttle<f64>,

    match_mode: MatchMode,
    position_step: i64,
    cell_width_step: u32,
    status: Status,
}

fn heatmap_slot(
    key: &str,
    chart: HeatMapChart,
    range: Option<[f64; 2]>,
    visible: bool,
    cell_width: f32,
    bus: &EventBus,
) -> HeatmapSlot {
    let options = HeatMapOptions {
        key: key.to_string(),
        title: key.to_string(),
        chart,
        range,
        cell_width,
        ..Default::default()
    };
    HeatmapSlot {
        key: key.to_string(),
        visible,
        host: ComponentHost::new(HeatMap::default(), options, bus.clone()),
    }
}

impl ViewCoordinator {
    /// Wire the views of both panels to `controller`, whose bus must be the
    /// global bus.
    pub fn new(controller: StateController, cfg: &LstmVisConfig) -> Self {
        let global = controller.bus().clone();
        let selection_bus = EventBus::local();
        let match_bus = EventBus::local();

        if let Err(e) = selection_bus.forward_to(&global, EventFilter::only(EventKind::SELECTION_CHANGED)) {
            log::warn!("selection bus not forwarded: {}", e);
        }
        if let Err(e) = match_bus.forward_to(&global, EventFilter::only(EventKind::MATCH_ROW_OPENED)) {
            log::warn!("match bus not forwarded: {}", e);
        }

        let (sel_sub, selection_rx) = selection_bus.subscribe_channel(EventFilter::only(SELECTION_INTERACTIONS));
        let (match_sub, match_rx) = match_bus.subscribe_channel(EventFilter::only(MATCH_INTERACTIONS));
        let (global_sub, global_rx) = global.subscribe_channel(EventFilter::only(GLOBAL_EVENTS));

        let cw = controller.cell_width() as f32;
        let selection = SelectionPanel {
            lineplot: ComponentHost::new(
                LinePlot::default(),
                LinePlotOptions {
                    cell_width: cw,
                    ..Default::default()
                },
                selection_bus.clone(),
            ),
            words: ComponentHost::new(
                WordSequence::default(),
                WordSequenceOptions {
                    cell_width: cw,
                    ..Default::default()
                },
                selection_bus.clone(),
            ),
            meta_tracks: Vec::new(),
            cells: ComponentHost::new(CellList::default(), CellListOptions::default(), selection_bus.clone()),
            preview: ComponentHost::new(
                SelectionPreview::default(),
                PreviewOptions {
                    cell_width: cw,
                    ..Default::default()
                },
                selection_bus.clone(),
            ),
            bus: selection_bus,
        };
        let matching = MatchPanel {
            matrix: ComponentHost::new(
                MatchMatrix::default(),
                MatchMatrixOptions {
                    cell_width: cw,
                    ..Default::default()
                },
                match_bus.clone(),
            ),
            heatmaps: vec![heatmap_slot(MATCH_COUNT_KEY, HeatMapChart::Scalar, None, true, cw, &match_bus)],
            bus: match_bus,
        };

        let interval = cfg.selection_throttle();
        let mut coordinator = Self {
            controller,
            global,
            selection,
            matching,
            selection_rx,
            match_rx,
            global_rx,
            subscriptions: vec![sel_sub, match_sub, global_sub],
            clock: Rc::new(SystemClock),
            brush_throttle: Throttle::new(interval),
            pad_throttle: Throttle::new(interval),
            threshold_throttle: Throttle::new(interval),
            match_mode: MatchMode::default(),
            position_step: cfg.position_step,
            cell_width_step: cfg.cell_width_step,
            status: Status::default(),
        };
        coordinator.sync_meta_tracks();
        coordinator
    }

    /// Time source of the gesture throttles.
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn controller(&self) -> &StateController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut StateController {
        &mut self.controller
    }

    pub fn global_bus(&self) -> &EventBus {
        &self.global
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn set_match_mode(&mut self, mode: MatchMode) {
        self.match_mode = mode;
    }

    /// Start from the URL parameters.
    pub fn start(&mut self) -> Option<Ticket> {
        let ticket = self.controller.init_by_url_and_run();
        self.pump();
        ticket
    }

    /// Periodic work: release held-back gestures, write the URL, apply
    /// arrived replies and handle everything they broadcast.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if let Some(brush) = self.brush_throttle.poll(now) {
            self.apply_brush(brush);
        }
        if let Some(pad) = self.pad_throttle.poll(now) {
            self.apply_zero_pad(pad);
        }
        if let Some(th) = self.threshold_throttle.poll(now) {
            self.apply_threshold(th);
        }
        self.controller.tick();
        self.controller.poll_responses();
        self.pump();
    }

    /// Whether a gesture or URL write is still held back.
    pub fn has_pending(&self) -> bool {
        self.brush_throttle.has_pending()
            || self.pad_throttle.has_pending()
            || self.threshold_throttle.has_pending()
            || self.controller.url_pending()
    }

    /// Handle every queued event.  Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let mut progressed = false;
            while let Ok(event) = self.selection_rx.try_recv() {
                self.on_selection_event(event);
                handled += 1;
                progressed = true;
            }
            while let Ok(event) = self.match_rx.try_recv() {
                self.on_match_event(event);
                handled += 1;
                progressed = true;
            }
            while let Ok(event) = self.global_rx.try_recv() {
                self.on_global_event(event);
                handled += 1;
                progressed = true;
            }
            if !progressed {
                return handled;
            }
        }
    }

    // ── Selection panel ─────────────────────────────────────────────────

    fn on_selection_event(&mut self, event: BusEvent) {
        let now = self.clock.now();
        match event.payload {
            EventPayload::Brush(brush) if event.kinds.contains(EventKind::BRUSH_CHANGED) => {
                if let Some(brush) = self.brush_throttle.offer(now, brush) {
                    self.apply_brush(brush);
                }
            }
            EventPayload::ZeroPad(pad) => {
                if let Some(pad) = self.pad_throttle.offer(now, pad) {
                    self.apply_zero_pad(pad);
                }
            }
            EventPayload::Threshold(th) => {
                if let Some(th) = self.threshold_throttle.offer(now, th) {
                    self.apply_threshold(th);
                }
            }
            EventPayload::Cell(cell) if event.kinds.contains(EventKind::CELL_HOVERED) => {
                self.hover_cell(cell);
            }
            EventPayload::Cell(Some(cell)) if event.kinds.contains(EventKind::CELL_TOGGLED) => {
                self.toggle_cell(cell);
            }
            EventPayload::Position(offset) if event.kinds.contains(EventKind::POSITION_SHIFTED) => {
                self.controller.shift_position(offset);
            }
            other => log::debug!("selection panel: ignoring {} with {:?}", event.kinds, other),
        }
    }

    /// Set or clear the brush.  Clearing it also drops the exclusions.
    pub fn apply_brush(&mut self, brush: Option<[usize; 2]>) {
        let brush = brush.map(|[a, b]| [a as i64, b as i64]);
        self.controller.set_word_brush(brush);
        self.selection_changed(true);
    }

    pub fn apply_zero_pad(&mut self, [left, right]: [usize; 2]) {
        self.controller
            .set_word_brush_zero(Some([left as i64, right as i64]));
        self.selection_changed(true);
    }

    pub fn apply_threshold(&mut self, threshold: f64) {
        self.controller.set_threshold(threshold);
        self.selection_changed(true);
    }

    /// Exclude a selected unit from the aggregates, or include it again.
    pub fn toggle_cell(&mut self, cell: usize) {
        self.controller.toggle_excluded(cell);
        self.selection_changed(false);
    }

    fn hover_cell(&mut self, cell: Option<usize>) {
        self.selection.lineplot.component_mut().set_hovered(cell);
        self.selection.cells.component_mut().set_hovered(cell);
    }

    fn selection_changed(&mut self, recalc: bool) {
        let cells = self.controller.update_cell_selection(recalc).to_vec();
        self.selection
            .bus
            .publish(EventKind::SELECTION_CHANGED, EventPayload::Selection { cells });
        self.refresh_selection_views();
    }

    fn refresh_selection_views(&mut self) {
        let ctrl = &self.controller;
        let Some(ctx) = ctrl.context() else {
            self.selection.lineplot.clear();
            self.selection.words.clear();
            self.selection.cells.clear();
            self.selection.preview.clear();
            return;
        };
        let selected = ctrl.cell_selection().to_vec();
        let excluded = ctrl.excluded_cells();
        let sum_vector = ctrl.sum_vector();

        self.selection.lineplot.update(LinePlotData {
            values: ctx.activations.rows().map(<[f64]>::to_vec).collect(),
            threshold: ctrl.threshold(),
            selected: selected.clone(),
            excluded: excluded.clone(),
        });
        self.selection.words.update(WordSequenceData {
            words: ctx.words().to_vec(),
            brush: ctrl.word_brush(),
            zero_pad: ctrl.word_brush_zero(),
            left_padding: ctx.left_padding(),
            backgrounds: Some(sum_vector.iter().map(|&v| v as f64).collect()),
            categories: None,
        });
        self.selection.cells.update(CellListData { cells: selected, excluded });
        self.selection.preview.update(PreviewData {
            sum_vector,
            iou: ctrl.iou_preview(),
            segments: ctrl.segments(),
        });
    }

    // ── Metadata tracks ─────────────────────────────────────────────────

    /// Show a metadata track under the words and fetch its values.
    pub fn add_meta_track(&mut self, name: &str) -> Option<Ticket> {
        let ticket = self.controller.add_meta_track(name);
        self.sync_meta_tracks();
        ticket
    }

    pub fn remove_meta_track(&mut self, name: &str) {
        self.controller.remove_meta_track(name);
        self.sync_meta_tracks();
    }

    /// Match the track hosts to the visible tracks and feed them the current
    /// context.
    fn sync_meta_tracks(&mut self) {
        let visible: Vec<String> = self
            .controller
            .visible_meta()
            .iter()
            .filter(|m| self.meta_kind(m) != Some(MetaVisKind::Wordvec))
            .cloned()
            .collect();
        let cw = self.controller.cell_width() as f32;
        let bus = self.selection.bus.clone();

        let mut old = std::mem::take(&mut self.selection.meta_tracks);
        for name in visible {
            let host = match old.iter().position(|(n, _)| *n == name) {
                Some(i) => old.swap_remove(i).1,
                None => ComponentHost::new(
                    WordSequence::default(),
                    WordSequenceOptions {
                        cell_width: cw,
                        mode: WordSequenceMode::Simple,
                        ..Default::default()
                    },
                    bus.clone(),
                ),
            };
            self.selection.meta_tracks.push((name, host));
        }
    }

    fn refresh_meta_tracks(&mut self) {
        self.sync_meta_tracks();
        let Some(ctx) = self.controller.context() else {
            for (_, host) in &mut self.selection.meta_tracks {
                host.clear();
            }
            return;
        };
        let words = ctx.words().to_vec();
        let left_padding = ctx.left_padding();
        let data: Vec<WordSequenceData> = self
            .selection
            .meta_tracks
            .iter()
            .map(|(name, _)| {
                let values = ctx.meta(name).unwrap_or_default();
                let scalar = self.meta_kind(name) == Some(MetaVisKind::Scalar);
                WordSequenceData {
                    words: words.clone(),
                    left_padding,
                    backgrounds: scalar
                        .then(|| values.iter().map(|v| v.as_number().unwrap_or(0.0)).collect()),
                    categories: (!scalar).then(|| values.iter().map(MetaValue::label).collect()),
                    ..Default::default()
                }
            })
            .collect();
        for ((_, host), d) in self.selection.meta_tracks.iter_mut().zip(data) {
            host.update(d);
        }
    }

    fn meta_kind(&self, name: &str) -> Option<MetaVisKind> {
        self.controller
            .project_info()?
            .meta
            .get(name)
            .map(|m| m.vis.kind)
    }

    // ── Matching panel ──────────────────────────────────────────────────

    /// Search the corpus for the current selection.  Metadata for every heat
    /// map is fetched along with it.
    pub fn request_match(&mut self) -> Option<Ticket> {
        let meta_dims = self
            .matching
            .heatmaps
            .iter()
            .filter(|s| s.key != MATCH_COUNT_KEY)
            .map(|s| s.key.clone())
            .collect();
        self.controller.request_match(MatchRequest {
            meta_dims,
            mode: self.match_mode,
        })
    }

    fn on_match_event(&mut self, event: BusEvent) {
        match event.payload {
            EventPayload::HeatmapCell { row, col, active } => {
                let cell = active.then_some((row, col));
                for slot in &mut self.matching.heatmaps {
                    slot.host.component_mut().set_hovered(cell);
                }
                self.matching.matrix.component_mut().set_hovered(cell);
            }
            EventPayload::Heatmap(key) => {
                self.toggle_heatmap(&key);
            }
            EventPayload::Position(pos) if event.kinds.contains(EventKind::MATCH_ROW_OPENED) => {
                let link = self.controller.new_link(
                    &[(ParamKey::Pos, ParamValue::Int(pos))],
                    &[ParamKey::WordBrush, ParamKey::WordBrushZero],
                );
                log::info!("match row {} opened: ?{}", pos, link);
                self.status.opened_link = Some(link);
            }
            other => log::debug!("match panel: ignoring {} with {:?}", event.kinds, other),
        }
    }

    /// Show or hide a heat map.  Returns whether it is visible now.
    pub fn toggle_heatmap(&mut self, key: &str) -> bool {
        match self.matching.heatmaps.iter_mut().find(|s| s.key == key) {
            Some(slot) => {
                slot.visible = !slot.visible;
                slot.visible
            }
            None => {
                log::debug!("no heat map '{}'", key);
                false
            }
        }
    }

    /// One heat map per scalar or categorical metadata dimension of the
    /// project, hidden until toggled.
    fn rebuild_heatmaps(&mut self) {
        let cw = self.controller.cell_width() as f32;
        let bus = self.matching.bus.clone();
        let mut slots: Vec<HeatmapSlot> = self
            .matching
            .heatmaps
            .drain(..)
            .filter(|s| s.key == MATCH_COUNT_KEY)
            .collect();
        if let Some(info) = self.controller.project_info() {
            for (name, dim) in &info.meta {
                let chart = match dim.vis.kind {
                    MetaVisKind::Scalar => HeatMapChart::Scalar,
                    MetaVisKind::Discrete => HeatMapChart::Categorical,
                    MetaVisKind::Wordvec | MetaVisKind::Other => continue,
                };
                slots.push(heatmap_slot(name, chart, dim.vis.range, false, cw, &bus));
            }
        }
        self.matching.heatmaps = slots;
    }

    fn refresh_match_views(&mut self) {
        let Some(result) = self.controller.match_result() else {
            return;
        };
        self.matching
            .matrix
            .update(MatchMatrixData::from_result(result));
        for slot in &mut self.matching.heatmaps {
            let values = if slot.key == MATCH_COUNT_KEY {
                result
                    .cell_count()
                    .iter()
                    .map(|row| row.iter().map(|&c| MetaValue::Number(c as f64)).collect())
                    .collect()
            } else {
                result.meta(&slot.key).unwrap_or_default()
            };
            slot.host.update(HeatMapData { values });
        }
    }

    // ── Global ──────────────────────────────────────────────────────────

    fn on_global_event(&mut self, event: BusEvent) {
        let kinds = event.kinds;
        if kinds.contains(EventKind::CONTEXT_REQUEST_SENT) {
            self.status.loading = true;
        } else if kinds.contains(EventKind::NEW_CONTEXT_AVAILABLE) {
            self.status.loading = false;
            self.status.wrong_parameters = None;
            self.selection.bus.publish(
                EventKind::SELECTION_CHANGED,
                EventPayload::Selection {
                    cells: self.controller.cell_selection().to_vec(),
                },
            );
            self.refresh_selection_views();
            self.refresh_meta_tracks();
        } else if kinds.contains(EventKind::NEW_MATCH_RESULTS) {
            self.refresh_match_views();
        } else if kinds.contains(EventKind::PROJECTS_META_AVAILABLE) {
            self.rebuild_heatmaps();
            self.sync_meta_tracks();
        } else if kinds.contains(EventKind::WRONG_PARAMETERS) {
            if let EventPayload::Query(q) = event.payload {
                self.status.wrong_parameters = Some(q);
            }
        } else if kinds.contains(EventKind::CELL_WIDTH_CHANGED) {
            if let EventPayload::CellWidth(w) = event.payload {
                self.set_cell_width(w);
            }
        } else if kinds.contains(EventKind::WINDOW_RESIZE) {
            if let EventPayload::Resize { width, height } = event.payload {
                self.status.window_size = Some([width, height]);
            }
        } else {
            log::debug!("coordinator: {} needs no view update", kinds);
        }
    }

    // ── Navigation and layout ───────────────────────────────────────────

    /// Move the context left (`direction < 0`) or right by one position step.
    pub fn step_position(&mut self, direction: i64) -> Ticket {
        self.controller
            .shift_position(direction.signum() * self.position_step)
    }

    /// Open an absolute position, e.g. a search hit.
    pub fn jump_to_position(&mut self, pos: i64) -> Ticket {
        self.controller.jump_to_position(pos)
    }

    /// Grow (`direction > 0`) or shrink the cell width by one step.
    pub fn step_cell_width(&mut self, direction: i64) {
        let current = self.controller.cell_width();
        let next = if direction < 0 {
            current.saturating_sub(self.cell_width_step)
        } else {
            current + self.cell_width_step
        };
        self.set_cell_width(next);
    }

    /// Change the cell width and lay out every view again.
    pub fn set_cell_width(&mut self, width: u32) {
        self.controller.set_cell_width(width);
        let cw = self.controller.cell_width() as f32;
        self.selection
            .lineplot
            .update_options(|o| o.cell_width = cw, true);
        self.selection.words.update_options(|o| o.cell_width = cw, true);
        for (_, host) in &mut self.selection.meta_tracks {
            host.update_options(|o| o.cell_width = cw, true);
        }
        self.selection
            .preview
            .update_options(|o| o.cell_width = cw, true);
        self.matching
            .matrix
            .update_options(|o| o.cell_width = cw, true);
        for slot in &mut self.matching.heatmaps {
            slot.host.update_options(|o| o.cell_width = cw, true);
        }
    }

    /// Drop every subscription this coordinator holds.
    pub fn dispose(self) {
        for sub in self.subscriptions {
            sub.dispose();
        }
    }
}
