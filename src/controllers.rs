//! The state controller: single owner of the parameter map and of the
//! current query results.
//!
//! Views never write parameters themselves.  They publish interactions, the
//! coordinator turns each one into a call on [`StateController`], and the
//! controller broadcasts the outcome on the global bus.
//!
//! Requests are tagged with a per-kind sequence number.  Only the reply to
//! the most recently issued request of a kind is applied; older replies are
//! dropped.  A failed request keeps the previous result and broadcasts
//! nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::config::{LstmVisConfig, MIN_CELL_WIDTH};
use crate::data::params::{ParamKey, ParamValue, ParameterMap};
use crate::data::query::{
    ContextResult, MatchMode, MatchResult, ProjectCatalogue, ProjectInfo, SearchResult,
};
use crate::data::selection::{Selection, SelectionParams, UnitSegments};
use crate::error::{ParamError, RequestError};
use crate::events::{EventBus, EventKind, EventPayload};
use crate::throttle::{Clock, SystemClock, Throttle};
use crate::transport::{ApiReply, ApiRequest, QueryKind, Ticket, Transport};
use crate::url_state::{self, MemoryHistory, UrlSink};

/// Parameters sent with every `/context` request.
const CONTEXT_PARAMS: [ParamKey; 8] = [
    ParamKey::Project,
    ParamKey::Pos,
    ParamKey::Source,
    ParamKey::Left,
    ParamKey::Right,
    ParamKey::Dims,
    ParamKey::Activation,
    ParamKey::Transform,
];

/// Parameters sent with every `/match` request.
const MATCH_PARAMS: [ParamKey; 6] = [
    ParamKey::Project,
    ParamKey::Source,
    ParamKey::Activation,
    ParamKey::Left,
    ParamKey::Right,
    ParamKey::Transform,
];

/// Options of a context request.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRequest {
    /// Values used instead of the current parameters for this request.
    pub overrides: Vec<(ParamKey, ParamValue)>,
    /// Write the overrides back into the parameter map.
    pub persist: bool,
    /// Keep the current unit selection when the result arrives instead of
    /// matching the brush again.
    pub preserve_selection: bool,
}

impl Default for ContextRequest {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            persist: true,
            preserve_selection: false,
        }
    }
}

impl ContextRequest {
    pub fn preserving() -> Self {
        Self {
            preserve_selection: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, key: ParamKey, value: ParamValue) -> Self {
        self.overrides.push((key, value));
        self
    }
}

/// Options of a match request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchRequest {
    /// Metadata dimensions to fetch for every matched position.
    pub meta_dims: Vec<String>,
    pub mode: MatchMode,
}

/// Owner of the application state.
pub struct StateController {
    params: ParameterMap,
    present: BTreeSet<ParamKey>,
    bus: EventBus,

    transport: Box<dyn Transport>,
    reply_tx: Sender<ApiReply>,
    reply_rx: Receiver<ApiReply>,
    issued: BTreeMap<QueryKind, u64>,
    context_flags: BTreeMap<u64, bool>,
    search_queries: BTreeMap<u64, String>,
    run_after_info: bool,

    catalogue: Option<ProjectCatalogue>,
    context: Option<ContextResult>,
    matches: Option<MatchResult>,
    search: Option<SearchResult>,
    selection: Selection,

    clock: Rc<dyn Clock>,
    url_throttle: Throttle<()>,
    url_sink: Box<dyn UrlSink>,
    last_url: Option<String>,

    segment_limit: usize,
    search_limit: usize,
}

impl StateController {
    /// Controller with default parameters broadcasting on `bus`.
    pub fn new(bus: EventBus, transport: Box<dyn Transport>) -> Self {
        let cfg = LstmVisConfig::default();
        let (reply_tx, reply_rx) = channel();
        Self {
            params: ParameterMap::new(),
            present: BTreeSet::new(),
            bus,
            transport,
            reply_tx,
            reply_rx,
            issued: BTreeMap::new(),
            context_flags: BTreeMap::new(),
            search_queries: BTreeMap::new(),
            run_after_info: false,
            catalogue: None,
            context: None,
            matches: None,
            search: None,
            selection: Selection::default(),
            clock: Rc::new(SystemClock),
            url_throttle: Throttle::new(cfg.url_sync_interval()),
            url_sink: Box::new(MemoryHistory::new()),
            last_url: None,
            segment_limit: cfg.segment_limit,
            search_limit: cfg.search_limit,
        }
    }

    pub fn with_config(mut self, cfg: &LstmVisConfig) -> Self {
        self.url_throttle = Throttle::new(cfg.url_sync_interval());
        self.segment_limit = cfg.segment_limit;
        self.search_limit = cfg.search_limit;
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_url_sink(mut self, sink: Box<dyn UrlSink>) -> Self {
        self.url_sink = sink;
        self
    }

    /// Start from the parameters of a URL query string.
    pub fn with_query(mut self, query: &str) -> Self {
        let parsed = url_state::parse_query(query);
        self.params = parsed.params;
        self.present = parsed.present;
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // ── Parameters ──────────────────────────────────────────────────────

    pub fn params(&self) -> &ParameterMap {
        &self.params
    }

    pub fn get(&self, key: ParamKey) -> &ParamValue {
        self.params.get(key)
    }

    /// Write a parameter.  Visible keys schedule a URL update.
    pub fn set(&mut self, key: ParamKey, value: ParamValue) -> Result<(), ParamError> {
        self.params.set(key, value)?;
        self.present.insert(key);
        if !key.is_hidden() {
            self.sync_url();
        }
        Ok(())
    }

    /// Setter for values whose shape is fixed by the caller.
    fn put(&mut self, key: ParamKey, value: ParamValue) {
        if let Err(e) = self.set(key, value) {
            log::warn!("{}", e);
        }
    }

    pub fn project(&self) -> &str {
        self.params.text(ParamKey::Project)
    }

    pub fn source(&self) -> &str {
        self.params.text(ParamKey::Source)
    }

    pub fn pos(&self) -> i64 {
        self.params.int(ParamKey::Pos)
    }

    pub fn set_pos(&mut self, pos: i64) {
        self.put(ParamKey::Pos, ParamValue::Int(pos));
    }

    pub fn threshold(&self) -> f64 {
        self.params.float(ParamKey::Activation)
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        if !threshold.is_finite() {
            log::debug!("ignoring non-finite threshold {}", threshold);
            return;
        }
        self.put(ParamKey::Activation, ParamValue::Float(threshold));
    }

    pub fn word_brush(&self) -> Option<[i64; 2]> {
        self.params.range(ParamKey::WordBrush)
    }

    /// Set or clear the brush.  A new brush without padding gets `[1, 0]`;
    /// clearing the brush clears the padding and the exclusions.
    pub fn set_word_brush(&mut self, brush: Option<[i64; 2]>) {
        self.put(ParamKey::WordBrush, ParamValue::Range(brush));
        if brush.is_none() {
            self.put(ParamKey::WordBrushZero, ParamValue::Range(None));
            self.reset_excluded();
        } else if self.word_brush_zero().is_none() {
            self.put(ParamKey::WordBrushZero, ParamValue::Range(Some([1, 0])));
        }
    }

    pub fn word_brush_zero(&self) -> Option<[i64; 2]> {
        self.params.range(ParamKey::WordBrushZero)
    }

    pub fn set_word_brush_zero(&mut self, pad: Option<[i64; 2]>) {
        self.put(ParamKey::WordBrushZero, ParamValue::Range(pad));
    }

    /// Zero padding as word counts; `[0, 0]` when unset.
    pub fn zero_pad(&self) -> [usize; 2] {
        self.word_brush_zero()
            .map_or([0, 0], |[l, r]| [l.max(0) as usize, r.max(0) as usize])
    }

    pub fn cell_width(&self) -> u32 {
        self.params.int(ParamKey::CellWidth).max(MIN_CELL_WIDTH as i64) as u32
    }

    pub fn set_cell_width(&mut self, width: u32) {
        let width = width.max(MIN_CELL_WIDTH);
        self.put(ParamKey::CellWidth, ParamValue::Int(width as i64));
    }

    pub fn visible_meta(&self) -> &[String] {
        self.params.text_list(ParamKey::VisibleMeta)
    }

    pub fn set_visible_meta(&mut self, meta: Vec<String>) {
        self.put(ParamKey::VisibleMeta, ParamValue::TextList(meta));
    }

    /// Show a metadata track and fetch its data.
    pub fn add_meta_track(&mut self, name: &str) -> Option<Ticket> {
        if self.visible_meta().iter().any(|m| m == name) {
            return None;
        }
        let mut meta = self.visible_meta().to_vec();
        meta.push(name.to_string());
        self.set_visible_meta(meta);
        Some(self.request_context(ContextRequest::preserving()))
    }

    /// Hide a metadata track.  No request is needed.
    pub fn remove_meta_track(&mut self, name: &str) {
        let meta: Vec<String> = self
            .visible_meta()
            .iter()
            .filter(|m| *m != name)
            .cloned()
            .collect();
        self.set_visible_meta(meta);
    }

    pub fn excluded_cells(&self) -> Vec<usize> {
        to_cells(self.params.int_list(ParamKey::ExcludedCells))
    }

    /// Flip the exclusion of `cell`.  Returns whether it is now excluded.
    pub fn toggle_excluded(&mut self, cell: usize) -> bool {
        let mut ex = self.excluded_cells();
        let now_excluded = match ex.iter().position(|&c| c == cell) {
            Some(i) => {
                ex.remove(i);
                false
            }
            None => {
                ex.push(cell);
                ex.sort_unstable();
                true
            }
        };
        self.put(ParamKey::ExcludedCells, ParamValue::IntList(to_ints(&ex)));
        now_excluded
    }

    pub fn reset_excluded(&mut self) {
        self.put(ParamKey::ExcludedCells, ParamValue::IntList(Vec::new()));
    }

    // ── Selection ───────────────────────────────────────────────────────

    pub fn selection_params(&self) -> SelectionParams {
        SelectionParams {
            threshold: self.threshold(),
            brush: self.word_brush(),
            zero_pad: self.zero_pad(),
        }
    }

    /// Recompute the unit selection.
    ///
    /// With `recalc` the brush signature is matched against the current
    /// context; without it the stored selection is kept and only the
    /// discretization is refreshed.
    pub fn update_cell_selection(&mut self, recalc: bool) -> &[usize] {
        let params = self.selection_params();
        let stored = to_cells(self.params.int_list(ParamKey::SelectedCells));
        let selection = match &self.context {
            Some(ctx) if recalc => Selection::compute(&ctx.activations, &params),
            Some(ctx) => Selection::preserved(&ctx.activations, &params, &stored),
            None => Selection::default(),
        };
        self.selection = selection;
        let cells = to_ints(self.selection.cells());
        self.put(ParamKey::SelectedCells, ParamValue::IntList(cells));
        self.selection.cells()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Currently selected units, ascending.
    pub fn cell_selection(&self) -> &[usize] {
        self.selection.cells()
    }

    /// Selected units minus the excluded ones.
    pub fn effective_cells(&self) -> Vec<usize> {
        self.selection.effective_cells(&self.excluded_cells())
    }

    pub fn sum_vector(&self) -> Vec<u32> {
        self.selection.sum_vector(&self.excluded_cells())
    }

    pub fn iou_preview(&self) -> Vec<f64> {
        self.selection.iou_preview(&self.excluded_cells())
    }

    pub fn segments(&self) -> Vec<UnitSegments> {
        self.selection
            .segments(&self.excluded_cells(), self.segment_limit)
    }

    // ── Query results ───────────────────────────────────────────────────

    pub fn catalogue(&self) -> Option<&ProjectCatalogue> {
        self.catalogue.as_ref()
    }

    /// Catalogue entry of the current project.
    pub fn project_info(&self) -> Option<&ProjectInfo> {
        self.catalogue.as_ref()?.get(self.project())
    }

    pub fn context(&self) -> Option<&ContextResult> {
        self.context.as_ref()
    }

    pub fn match_result(&self) -> Option<&MatchResult> {
        self.matches.as_ref()
    }

    pub fn search_result(&self) -> Option<&SearchResult> {
        self.search.as_ref()
    }

    /// Sequence number of the latest issued request of `kind` (0 if none).
    pub fn latest_seq(&self, kind: QueryKind) -> u64 {
        self.issued.get(&kind).copied().unwrap_or(0)
    }

    // ── Requests ────────────────────────────────────────────────────────

    fn next_ticket(&mut self, kind: QueryKind) -> Ticket {
        let seq = self.issued.entry(kind).or_insert(0);
        *seq += 1;
        Ticket { kind, seq: *seq }
    }

    fn issue(&mut self, request: ApiRequest) -> Ticket {
        let ticket = request.ticket;
        log::debug!("issuing {} request #{}", ticket.kind.path(), ticket.seq);
        self.transport.send(request, self.reply_tx.clone());
        ticket
    }

    /// Fetch the project catalogue.
    pub fn request_info(&mut self) -> Ticket {
        let ticket = self.next_ticket(QueryKind::Info);
        self.issue(ApiRequest::new(ticket))
    }

    /// Start the application from the URL parameters: load the catalogue and
    /// then the first context.  Broadcasts `WRONG_PARAMETERS` when project,
    /// position or source are missing.
    pub fn init_by_url_and_run(&mut self) -> Option<Ticket> {
        let required = [ParamKey::Project, ParamKey::Pos, ParamKey::Source];
        if required.iter().all(|k| self.present.contains(k)) {
            self.run_after_info = true;
            self.sync_url();
            Some(self.request_info())
        } else {
            log::info!("project, pos and source are required to start");
            self.bus.publish(
                EventKind::WRONG_PARAMETERS,
                EventPayload::Query(url_state::serialize_query(&self.params)),
            );
            None
        }
    }

    /// Fetch activations and words around the current position.
    pub fn request_context(&mut self, req: ContextRequest) -> Ticket {
        let mut payload = self.params.clone();
        for (key, value) in &req.overrides {
            if let Err(e) = payload.set(*key, value.clone()) {
                log::warn!("context override rejected: {}", e);
            }
        }
        if req.persist {
            for (key, _) in &req.overrides {
                if CONTEXT_PARAMS.contains(key) {
                    self.params.set(*key, payload.get(*key).clone()).ok();
                    self.present.insert(*key);
                }
            }
            self.sync_url();
        }

        let ticket = self.next_ticket(QueryKind::Context);
        let mut request = ApiRequest::new(ticket);
        for key in CONTEXT_PARAMS {
            let value = if key == ParamKey::Dims {
                context_dims(&payload)
            } else {
                payload.get(key).to_query_value()
            };
            request = request.with(key.url_name(), value);
        }
        self.context_flags.insert(ticket.seq, req.preserve_selection);
        self.issue(request);
        self.bus
            .publish(EventKind::CONTEXT_REQUEST_SENT, EventPayload::None);
        ticket
    }

    /// Search the corpus for matches of the selected units.  Does nothing
    /// while no (non-excluded) unit is selected.
    pub fn request_match(&mut self, req: MatchRequest) -> Option<Ticket> {
        let cells = self.effective_cells();
        if cells.is_empty() {
            log::debug!("match skipped: {}", RequestError::EmptySelection);
            return None;
        }

        let ticket = self.next_ticket(QueryKind::Match);
        let mut request = ApiRequest::new(ticket);
        for key in MATCH_PARAMS {
            request = request.with(key.url_name(), self.params.get(key).to_query_value());
        }
        let [l, r] = self.zero_pad();
        let dims: Vec<String> = req
            .meta_dims
            .iter()
            .map(|d| meta_dim(d))
            .chain(["states", "cell_count", "words"].map(String::from))
            .collect();
        request = request
            .with("cells", join(&cells))
            .with("constraints", format!("{l},{r}"))
            .with("dims", dims.join(","))
            .with("mode", req.mode.as_str());
        Some(self.issue(request))
    }

    /// Search the token index of the current project.
    pub fn request_search(&mut self, query: &str) -> Ticket {
        let ticket = self.next_ticket(QueryKind::Search);
        let request = ApiRequest::new(ticket)
            .with("project", self.project())
            .with("q", query)
            .with("limit", self.search_limit.to_string())
            .with("html", "false");
        self.search_queries.insert(ticket.seq, query.to_string());
        self.issue(request)
    }

    /// Move to an absolute position with a fresh selection.
    pub fn jump_to_position(&mut self, pos: i64) -> Ticket {
        self.set_word_brush(None);
        self.set_pos(pos);
        self.request_context(ContextRequest::default())
    }

    /// Move the position by `offset`; an existing brush keeps pointing at the
    /// same words.
    pub fn shift_position(&mut self, offset: i64) -> Ticket {
        if let Some([a, b]) = self.word_brush() {
            self.set_word_brush(Some([a.saturating_sub(offset), b.saturating_sub(offset)]));
        }
        let pos = self.pos() + offset;
        self.set_pos(pos);
        self.request_context(ContextRequest::preserving())
    }

    /// Apply every reply that has arrived.  Returns how many were applied.
    pub fn poll_responses(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(reply) = self.reply_rx.try_recv() {
            if self.complete(reply).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Apply one reply.
    ///
    /// Stale replies and failures leave every result untouched and broadcast
    /// nothing; the error is returned for the caller's information only.
    pub fn complete(&mut self, reply: ApiReply) -> Result<(), RequestError> {
        let Ticket { kind, seq } = reply.ticket;
        let preserve = if kind == QueryKind::Context {
            self.context_flags.remove(&seq)
        } else {
            None
        };
        let query = if kind == QueryKind::Search {
            self.search_queries.remove(&seq)
        } else {
            None
        };

        let latest = self.latest_seq(kind);
        if seq != latest {
            log::debug!(
                "discarding stale {} response #{} (latest #{})",
                kind.path(),
                seq,
                latest
            );
            return Err(RequestError::Stale { seq, latest });
        }

        let result = reply.body.and_then(|body| self.apply(kind, &body, preserve, query));
        if let Err(e) = &result {
            log::warn!("{} request #{} failed: {}", kind.path(), seq, e);
        }
        result
    }

    fn apply(
        &mut self,
        kind: QueryKind,
        body: &[u8],
        preserve: Option<bool>,
        query: Option<String>,
    ) -> Result<(), RequestError> {
        match kind {
            QueryKind::Info => {
                self.catalogue = Some(ProjectCatalogue::from_json(body)?);
                self.bus
                    .publish(EventKind::PROJECTS_META_AVAILABLE, EventPayload::None);
                if std::mem::take(&mut self.run_after_info) {
                    self.request_context(ContextRequest::default());
                }
            }
            QueryKind::Context => {
                self.context = Some(ContextResult::from_json(body)?);
                let keep_selected_cells = preserve.unwrap_or(false);
                self.update_cell_selection(!keep_selected_cells);
                self.bus.publish(
                    EventKind::NEW_CONTEXT_AVAILABLE,
                    EventPayload::Context { keep_selected_cells },
                );
            }
            QueryKind::Match => {
                self.matches = Some(MatchResult::from_json(body)?);
                self.bus
                    .publish(EventKind::NEW_MATCH_RESULTS, EventPayload::None);
            }
            QueryKind::Search => {
                let query = query.unwrap_or_default();
                self.search = Some(SearchResult::from_json(&query, body)?);
                self.bus
                    .publish(EventKind::SEARCH_RESULTS, EventPayload::Query(query));
            }
        }
        Ok(())
    }

    // ── URL ─────────────────────────────────────────────────────────────

    /// Current shareable query string.
    pub fn current_url(&self) -> String {
        url_state::serialize_query(&self.params)
    }

    /// Link to a derived state, e.g. another position of a match row.
    pub fn new_link(&self, overwrite: &[(ParamKey, ParamValue)], ignore: &[ParamKey]) -> String {
        url_state::new_link(&self.params, overwrite, ignore)
    }

    /// Schedule a URL update.  Bursts are coalesced; the final state is
    /// written once the interval has passed (see [`tick`](Self::tick)).
    pub fn sync_url(&mut self) {
        let now = self.clock.now();
        if self.url_throttle.offer(now, ()).is_some() {
            self.write_url();
        }
    }

    /// Write a held-back URL update once its interval has passed.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if self.url_throttle.poll(now).is_some() {
            self.write_url();
        }
    }

    /// Write a held-back URL update immediately.
    pub fn flush_url(&mut self) {
        let now = self.clock.now();
        if self.url_throttle.flush(now).is_some() {
            self.write_url();
        }
    }

    pub fn url_pending(&self) -> bool {
        self.url_throttle.has_pending()
    }

    fn write_url(&mut self) {
        let query = self.current_url();
        if self.last_url.as_deref() == Some(query.as_str()) {
            return;
        }
        self.url_sink.replace(&query);
        self.last_url = Some(query);
    }
}

fn meta_dim(name: &str) -> String {
    if name.starts_with("meta_") {
        name.to_string()
    } else {
        format!("meta_{name}")
    }
}

/// Requested dimensions plus one `meta_<name>` per visible metadata track.
fn context_dims(params: &ParameterMap) -> String {
    let mut dims = params.text_list(ParamKey::Dims).to_vec();
    for m in params.text_list(ParamKey::VisibleMeta) {
        let d = meta_dim(m);
        if !dims.contains(&d) {
            dims.push(d);
        }
    }
    dims.join(",")
}

fn to_cells(ints: &[i64]) -> Vec<usize> {
    ints.iter()
        .filter(|&&i| i >= 0)
        .map(|&i| i as usize)
        .collect()
}

fn to_ints(cells: &[usize]) -> Vec<i64> {
    cells.iter().map(|&c| c as i64).collect()
}

fn join(cells: &[usize]) -> String {
    cells
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
