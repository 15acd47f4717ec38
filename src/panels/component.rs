//! Lifecycle shared by every view.
//!
//! A view is split in two halves.  [`Component`] is the headless half: it
//! turns input data into render-ready state with a pure `wrangle`.  [`Render`]
//! draws that state with egui and publishes interactions on the view's own
//! local bus.  [`ComponentHost`] drives both and caches data, render state and
//! options.
//!
//! States: `Constructed → Initialized → (DataBound ⇄ Rendered)`.

use crate::events::{EventBus, EventKind, EventPayload};

/// Headless half of a view.
pub trait Component {
    /// Name used in logs.
    const NAME: &'static str;

    type Data: Clone;
    /// Render-ready state.  `Default` is the empty view shown for missing or
    /// malformed data.
    type RenderData: Clone + Default + PartialEq;
    type Options: Clone + Default;

    /// Build static structure.  Runs once, before any data is seen.
    fn init(&mut self, _options: &Self::Options) {}

    /// Pure transformation of `data` under `options`.
    fn wrangle(&self, data: &Self::Data, options: &Self::Options) -> Self::RenderData;
}

/// Drawing half of a view.
pub trait Render: Component {
    fn render(
        &mut self,
        render: &Self::RenderData,
        options: &Self::Options,
        ui: &mut egui::Ui,
        bus: &EventBus,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Initialized,
    DataBound,
    Rendered,
}

/// Owns one component together with its cached state.
pub struct ComponentHost<C: Component> {
    component: C,
    state: LifecycleState,
    options: C::Options,
    data: Option<C::Data>,
    render_data: C::RenderData,
    wrangles: u64,
    bus: EventBus,
}

impl<C: Component> ComponentHost<C> {
    /// Construct and initialize.  `bus` is the local bus interactions are
    /// published on.
    pub fn new(component: C, options: C::Options, bus: EventBus) -> Self {
        let mut host = Self {
            component,
            state: LifecycleState::Constructed,
            options,
            data: None,
            render_data: C::RenderData::default(),
            wrangles: 0,
            bus,
        };
        host.component.init(&host.options);
        host.state = LifecycleState::Initialized;
        host
    }

    /// Bind new data and recompute the render state.
    ///
    /// Never publishes; repeated calls with identical data yield identical
    /// render state.  Returns whether the render state changed.
    pub fn update(&mut self, data: C::Data) -> bool {
        self.state = LifecycleState::DataBound;
        self.data = Some(data);
        self.rewrangle()
    }

    /// Change options in place.  With `re_render` the last data is wrangled
    /// again under the new options.
    pub fn update_options(&mut self, f: impl FnOnce(&mut C::Options), re_render: bool) -> bool {
        f(&mut self.options);
        if re_render && self.data.is_some() {
            self.state = LifecycleState::DataBound;
            self.rewrangle()
        } else {
            false
        }
    }

    /// Drop the bound data and show the empty state.
    pub fn clear(&mut self) {
        self.data = None;
        self.render_data = C::RenderData::default();
        self.state = LifecycleState::Initialized;
    }

    fn rewrangle(&mut self) -> bool {
        let Some(data) = &self.data else {
            return false;
        };
        let next = self.component.wrangle(data, &self.options);
        self.wrangles += 1;
        self.state = LifecycleState::Rendered;
        if next == self.render_data {
            false
        } else {
            self.render_data = next;
            true
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn data(&self) -> Option<&C::Data> {
        self.data.as_ref()
    }

    pub fn render_data(&self) -> &C::RenderData {
        &self.render_data
    }

    pub fn options(&self) -> &C::Options {
        &self.options
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Number of wrangle passes so far.
    pub fn wrangle_count(&self) -> u64 {
        self.wrangles
    }

    /// Publish an interaction on the component's local bus.
    pub fn publish(&self, kinds: EventKind, payload: EventPayload) {
        self.bus.publish(kinds, payload);
    }
}

impl<C: Render> ComponentHost<C> {
    /// Draw the current render state.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.component
            .render(&self.render_data, &self.options, ui, &self.bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Doubler {
        inits: u32,
    }

    #[derive(Clone, Default)]
    struct Scale {
        factor: i64,
    }

    impl Component for Doubler {
        const NAME: &'static str = "doubler";
        type Data = Vec<i64>;
        type RenderData = Vec<i64>;
        type Options = Scale;

        fn init(&mut self, _options: &Scale) {
            self.inits += 1;
        }

        fn wrangle(&self, data: &Vec<i64>, options: &Scale) -> Vec<i64> {
            data.iter().map(|v| v * options.factor).collect()
        }
    }

    #[test]
    fn lifecycle_transitions() {
        let mut host = ComponentHost::new(Doubler::default(), Scale { factor: 2 }, EventBus::local());
        assert_eq!(host.state(), LifecycleState::Initialized);
        assert_eq!(host.component().inits, 1);

        assert!(host.update(vec![1, 2]));
        assert_eq!(host.state(), LifecycleState::Rendered);
        assert_eq!(host.render_data(), &vec![2, 4]);

        host.clear();
        assert_eq!(host.state(), LifecycleState::Initialized);
        assert!(host.render_data().is_empty());
        assert_eq!(host.component().inits, 1);
    }

    #[test]
    fn repeated_update_is_idempotent_and_silent() {
        let bus = EventBus::local();
        let (_sub, rx) = bus.subscribe_channel(crate::events::EventFilter::all());
        let mut host = ComponentHost::new(Doubler::default(), Scale { factor: 3 }, bus.clone());
        assert!(host.update(vec![1]));
        let first = host.render_data().clone();
        assert!(!host.update(vec![1]));
        assert_eq!(host.render_data(), &first);
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.published_count(), 0);
    }

    #[test]
    fn options_rerender_with_last_data() {
        let mut host = ComponentHost::new(Doubler::default(), Scale { factor: 1 }, EventBus::local());
        assert!(!host.update_options(|o| o.factor = 5, true));
        host.update(vec![2]);
        assert!(!host.update_options(|o| o.factor = 10, false));
        assert_eq!(host.render_data(), &vec![2]);
        assert!(host.update_options(|o| o.factor = 10, true));
        assert_eq!(host.render_data(), &vec![20]);
    }
}
