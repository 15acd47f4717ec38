//! Typed publish/subscribe channel used by every panel and the controller.
//!
//! Events carry a set of [`EventKind`] flags (bitflags-style) so that a
//! single subscription can cover several event names, plus a typed
//! [`EventPayload`].  Subscribers pass an [`EventFilter`]; an event is
//! delivered when `(event.kinds & filter) != 0`.
//!
//! Two scopes exist.  Each panel (selection, matching) owns a *local* bus and
//! the application owns one *global* bus.  A local bus may forward selected
//! kinds into the global bus; the reverse direction is refused, which keeps
//! independently created panels from feeding events back into each other.
//!
//! Dispatch is synchronous and in subscription order.  A publish issued from
//! inside a handler is queued and delivered once the current dispatch has run
//! to completion.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{Receiver, Sender};

use crate::error::BusError;

// ─────────────────────────────────────────────────────────────────────────────
// EventKind – bitflags
// ─────────────────────────────────────────────────────────────────────────────

/// Bitflags describing the *categories* an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(pub u64);

impl EventKind {
    // ── Selection panel interaction ─────────────────────────────────────
    /// The word brush extent changed (or was cleared).
    pub const BRUSH_CHANGED: Self = Self(1 << 0);
    /// The zero-padding whiskers around the brush changed.
    pub const ZERO_PAD_CHANGED: Self = Self(1 << 1);
    /// The activation threshold was dragged or typed.
    pub const THRESHOLD_CHANGED: Self = Self(1 << 2);
    /// A hidden unit was hovered (or unhovered).
    pub const CELL_HOVERED: Self = Self(1 << 3);
    /// A hidden unit was toggled in or out of the excluded set.
    pub const CELL_TOGGLED: Self = Self(1 << 4);
    /// A word of the sequence was hovered.
    pub const WORD_HOVERED: Self = Self(1 << 5);
    /// The unit selection was recomputed.
    pub const SELECTION_CHANGED: Self = Self(1 << 6);
    /// The position was shifted by the navigation buttons.
    pub const POSITION_SHIFTED: Self = Self(1 << 7);

    // ── Matching panel interaction ──────────────────────────────────────
    /// A heat map or match matrix cell was hovered.
    pub const HEATMAP_HOVERED: Self = Self(1 << 8);
    /// A heat map was closed or reopened.
    pub const HEATMAP_TOGGLED: Self = Self(1 << 9);
    /// A match row link button was clicked.
    pub const MATCH_ROW_OPENED: Self = Self(1 << 10);

    // ── Controller broadcasts ───────────────────────────────────────────
    /// Startup parameters are incomplete (no project, source or position).
    pub const WRONG_PARAMETERS: Self = Self(1 << 16);
    /// A context request left the controller.
    pub const CONTEXT_REQUEST_SENT: Self = Self(1 << 17);
    /// A new context query result replaced the previous one.
    pub const NEW_CONTEXT_AVAILABLE: Self = Self(1 << 18);
    /// A new match query result replaced the previous one.
    pub const NEW_MATCH_RESULTS: Self = Self(1 << 19);
    /// The project catalogue was loaded.
    pub const PROJECTS_META_AVAILABLE: Self = Self(1 << 20);
    /// A token search finished.
    pub const SEARCH_RESULTS: Self = Self(1 << 21);

    // ── Application ─────────────────────────────────────────────────────
    /// The application window was resized.
    pub const WINDOW_RESIZE: Self = Self(1 << 24);
    /// The cell width changed.
    pub const CELL_WIDTH_CHANGED: Self = Self(1 << 25);

    /// Wildcard: matches *every* event kind.
    pub const ALL: Self = Self(u64::MAX);

    const NAMES: &'static [(EventKind, &'static str)] = &[
        (EventKind::BRUSH_CHANGED, "brush_changed"),
        (EventKind::ZERO_PAD_CHANGED, "zero_pad_changed"),
        (EventKind::THRESHOLD_CHANGED, "threshold_changed"),
        (EventKind::CELL_HOVERED, "cell_hovered"),
        (EventKind::CELL_TOGGLED, "cell_toggled"),
        (EventKind::WORD_HOVERED, "word_hovered"),
        (EventKind::SELECTION_CHANGED, "selection_changed"),
        (EventKind::POSITION_SHIFTED, "position_shifted"),
        (EventKind::HEATMAP_HOVERED, "heatmap_hovered"),
        (EventKind::HEATMAP_TOGGLED, "heatmap_toggled"),
        (EventKind::MATCH_ROW_OPENED, "match_row_opened"),
        (EventKind::WRONG_PARAMETERS, "wrong_parameters"),
        (EventKind::CONTEXT_REQUEST_SENT, "context_request_sent"),
        (EventKind::NEW_CONTEXT_AVAILABLE, "new_context_available"),
        (EventKind::NEW_MATCH_RESULTS, "new_match_results"),
        (EventKind::PROJECTS_META_AVAILABLE, "projects_meta_available"),
        (EventKind::SEARCH_RESULTS, "search_results"),
        (EventKind::WINDOW_RESIZE, "window_resize"),
        (EventKind::CELL_WIDTH_CHANGED, "cell_width_changed"),
    ];

    /// Combine two event kinds (bitwise OR).
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether `self` contains all bits in `other`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether `self` intersects with `other` (at least one bit in common).
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Returns `true` if no bits are set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Look up a single kind by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(k, _)| *k)
    }

    /// Parse a space- or comma-delimited list of names into one mask.
    ///
    /// Returns `None` if any name is unknown or the list is empty.
    pub fn from_names(list: &str) -> Option<Self> {
        let mut mask = Self(0);
        for name in list.split([' ', ',']).filter(|s| !s.is_empty()) {
            mask |= Self::from_name(name)?;
        }
        if mask.is_empty() {
            None
        } else {
            Some(mask)
        }
    }
}

impl std::ops::BitOr for EventKind {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EventKind {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EventKind {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        if *self == EventKind::ALL {
            return write!(f, "ALL");
        }

        let mut names = Vec::new();
        let mut known_bits: u64 = 0;
        for (kind, name) in Self::NAMES {
            known_bits |= kind.0;
            if self.contains(*kind) {
                names.push((*name).to_string());
            }
        }
        let extra = self.0 & !known_bits;
        if extra != 0 {
            names.push(format!("0x{:x}", extra));
        }
        write!(f, "{}", names.join("|"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Typed payload attached to a [`BusEvent`].
///
/// Each event kind documents which variant it carries; a subscriber receiving
/// an unexpected variant simply ignores the event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    None,
    /// `BRUSH_CHANGED`: half-open word range, `None` when the brush was cleared.
    Brush(Option<[usize; 2]>),
    /// `ZERO_PAD_CHANGED`: `[left, right]` padding in words.
    ZeroPad([usize; 2]),
    /// `THRESHOLD_CHANGED`.
    Threshold(f64),
    /// `CELL_HOVERED` (`None` = hover left) and `CELL_TOGGLED`.
    Cell(Option<usize>),
    /// `WORD_HOVERED`.
    Word(Option<usize>),
    /// `HEATMAP_HOVERED`.
    HeatmapCell { row: usize, col: usize, active: bool },
    /// `HEATMAP_TOGGLED`: heat map key.
    Heatmap(String),
    /// `POSITION_SHIFTED` offset and `MATCH_ROW_OPENED` position.
    Position(i64),
    /// `NEW_CONTEXT_AVAILABLE`.
    Context { keep_selected_cells: bool },
    /// `SELECTION_CHANGED`.
    Selection { cells: Vec<usize> },
    /// `WINDOW_RESIZE`.
    Resize { width: f32, height: f32 },
    /// `CELL_WIDTH_CHANGED`.
    CellWidth(u32),
    /// `WRONG_PARAMETERS`: the query string that failed to start the app.
    Query(String),
}

/// Which part of the application a bus belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusScope {
    /// One panel (selection or matching).
    Local,
    /// The whole application.
    Global,
}

/// A single published event.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    /// Bitflag set of categories this event belongs to.
    pub kinds: EventKind,
    /// Seconds since the publishing bus was created.
    pub timestamp: f64,
    /// Scope of the bus the event was originally published on.
    pub origin: BusScope,
    pub payload: EventPayload,
}

impl BusEvent {
    pub fn new(kinds: EventKind, payload: EventPayload) -> Self {
        Self {
            kinds,
            timestamp: 0.0,
            origin: BusScope::Local,
            payload,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventFilter
// ─────────────────────────────────────────────────────────────────────────────

/// OR-mask selecting which event categories a subscriber receives.
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub mask: EventKind,
}

impl EventFilter {
    /// Accept all events.
    pub const fn all() -> Self {
        Self {
            mask: EventKind::ALL,
        }
    }

    /// Accept only the specified event kinds.
    pub const fn only(mask: EventKind) -> Self {
        Self { mask }
    }

    #[inline]
    pub fn matches(&self, event: &BusEvent) -> bool {
        event.kinds.intersects(self.mask)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventBus
// ─────────────────────────────────────────────────────────────────────────────

type Handler = Rc<RefCell<dyn FnMut(&BusEvent)>>;

#[derive(Clone)]
enum Sink {
    Channel(Sender<BusEvent>),
    Handler(Handler),
}

#[derive(Clone)]
struct Subscriber {
    id: u64,
    filter: EventFilter,
    sink: Sink,
}

struct Forward {
    filter: EventFilter,
    target: Weak<RefCell<BusInner>>,
}

struct BusInner {
    scope: BusScope,
    next_id: u64,
    subscribers: Vec<Subscriber>,
    forwards: Vec<Forward>,
    start_instant: std::time::Instant,
    dispatching: bool,
    queue: VecDeque<BusEvent>,
    published: u64,
}

/// Publish/subscribe channel for one scope.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

/// Handle returned by the `subscribe*` methods; [`dispose`](Self::dispose)
/// removes the subscription.  Dropping the handle keeps the subscription alive.
#[must_use = "keep the subscription to be able to dispose it"]
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<BusInner>>,
}

impl Subscription {
    /// Remove the subscriber from its bus.  No-op if the bus is gone.
    pub fn dispose(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.borrow_mut().subscribers.retain(|s| s.id != self.id);
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl EventBus {
    pub fn new(scope: BusScope) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                scope,
                next_id: 0,
                subscribers: Vec::new(),
                forwards: Vec::new(),
                start_instant: std::time::Instant::now(),
                dispatching: false,
                queue: VecDeque::new(),
                published: 0,
            })),
        }
    }

    /// A bus scoped to one panel.
    pub fn local() -> Self {
        Self::new(BusScope::Local)
    }

    /// The application-wide bus.
    pub fn global() -> Self {
        Self::new(BusScope::Global)
    }

    pub fn scope(&self) -> BusScope {
        self.inner.borrow().scope
    }

    /// Number of events published on this bus so far (forwarded ones included).
    pub fn published_count(&self) -> u64 {
        self.inner.borrow().published
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn add_subscriber(&self, filter: EventFilter, sink: Sink) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber { id, filter, sink });
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Subscribe a handler, called synchronously for every matching event.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> Subscription
    where
        F: FnMut(&BusEvent) + 'static,
    {
        let handler: Handler = Rc::new(RefCell::new(handler));
        self.add_subscriber(filter, Sink::Handler(handler))
    }

    /// Subscribe one handler to several events given as a space/comma separated
    /// name list, e.g. `"cell_hovered word_hovered"`.  Returns `None` when a
    /// name is unknown.
    pub fn subscribe_names<F>(&self, names: &str, handler: F) -> Option<Subscription>
    where
        F: FnMut(&BusEvent) + 'static,
    {
        let mask = EventKind::from_names(names)?;
        Some(self.subscribe(EventFilter::only(mask), handler))
    }

    /// Subscribe with an `mpsc` channel.  Matching events are sent into the
    /// channel synchronously; the receiver drains them at its own pace.
    pub fn subscribe_channel(&self, filter: EventFilter) -> (Subscription, Receiver<BusEvent>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (self.add_subscriber(filter, Sink::Channel(tx)), rx)
    }

    /// Forward events matching `filter` into `target`.
    ///
    /// Only local → global forwarding is allowed.
    pub fn forward_to(&self, target: &EventBus, filter: EventFilter) -> Result<(), BusError> {
        if Rc::ptr_eq(&self.inner, &target.inner) {
            return Err(BusError::SelfForward);
        }
        let from = self.scope();
        let to = target.scope();
        if from != BusScope::Local || to != BusScope::Global {
            log::warn!("refusing to forward events from {:?} bus into {:?} bus", from, to);
            return Err(BusError::ForwardDirection { from, to });
        }
        self.inner.borrow_mut().forwards.push(Forward {
            filter,
            target: Rc::downgrade(&target.inner),
        });
        Ok(())
    }

    /// Publish an event with the given kinds and payload.
    pub fn publish(&self, kinds: EventKind, payload: EventPayload) {
        self.emit(BusEvent::new(kinds, payload));
    }

    /// Publish a prepared event.  The timestamp and origin are set here.
    pub fn emit(&self, mut event: BusEvent) {
        {
            let inner = self.inner.borrow();
            event.timestamp = inner.start_instant.elapsed().as_secs_f64();
            event.origin = inner.scope;
        }
        self.enqueue(event);
    }

    fn enqueue(&self, event: BusEvent) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.queue.push_back(event);
            if inner.dispatching {
                return;
            }
            inner.dispatching = true;
        }

        loop {
            let next = self.inner.borrow_mut().queue.pop_front();
            let Some(event) = next else { break };
            self.dispatch(&event);
        }
        self.inner.borrow_mut().dispatching = false;
    }

    fn dispatch(&self, event: &BusEvent) {
        // Snapshot so that handlers may subscribe, dispose or publish.
        let (subscribers, targets) = {
            let mut inner = self.inner.borrow_mut();
            inner.published += 1;
            let subs: Vec<Subscriber> = inner
                .subscribers
                .iter()
                .filter(|s| s.filter.matches(event))
                .cloned()
                .collect();
            let targets: Vec<Rc<RefCell<BusInner>>> = inner
                .forwards
                .iter()
                .filter(|f| f.filter.matches(event))
                .filter_map(|f| f.target.upgrade())
                .collect();
            (subs, targets)
        };

        let mut dead = Vec::new();
        for sub in subscribers {
            match &sub.sink {
                Sink::Channel(tx) => {
                    if tx.send(event.clone()).is_err() {
                        dead.push(sub.id);
                    }
                }
                Sink::Handler(h) => match h.try_borrow_mut() {
                    Ok(mut f) => (&mut *f)(event),
                    Err(_) => log::warn!("handler #{} re-entered for {}", sub.id, event.kinds),
                },
            }
        }
        if !dead.is_empty() {
            self.inner
                .borrow_mut()
                .subscribers
                .retain(|s| !dead.contains(&s.id));
        }

        for target in targets {
            EventBus { inner: target }.enqueue(event.clone());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────────────────────────
