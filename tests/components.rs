use lstmvis::data::query::MetaValue;
use lstmvis::events::{EventBus, EventFilter};
use lstmvis::panels::cell_list::{CellList, CellListData, CellListOptions};
use lstmvis::panels::component::{ComponentHost, LifecycleState};
use lstmvis::panels::heatmap::{HeatMap, HeatMapData, HeatMapOptions, HeatMapRender};
use lstmvis::panels::lineplot::{LinePlot, LinePlotData, LinePlotOptions};
use lstmvis::panels::word_sequence::{WordSequence, WordSequenceData, WordSequenceOptions};

fn plot_data() -> LinePlotData {
    LinePlotData {
        values: vec![vec![0.1, 0.9, 0.2], vec![0.5, 0.5, 0.5]],
        threshold: 0.3,
        selected: vec![1],
        excluded: Vec::new(),
    }
}

#[test]
fn updates_never_publish() {
    let bus = EventBus::local();
    let (_sub, rx) = bus.subscribe_channel(EventFilter::all());

    let mut plot = ComponentHost::new(LinePlot::default(), LinePlotOptions::default(), bus.clone());
    let mut words = ComponentHost::new(WordSequence::default(), WordSequenceOptions::default(), bus.clone());
    let mut cells = ComponentHost::new(CellList::default(), CellListOptions::default(), bus.clone());

    plot.update(plot_data());
    plot.update_options(|o| o.cell_width = 12.0, true);
    words.update(WordSequenceData {
        words: vec!["a".into(), "b".into()],
        brush: Some([0, 1]),
        ..Default::default()
    });
    cells.update(CellListData {
        cells: vec![3, 1],
        excluded: vec![3],
    });
    plot.clear();

    assert!(rx.try_recv().is_err());
    assert_eq!(bus.published_count(), 0);
}

#[test]
fn identical_data_yields_identical_render_state() {
    let mut plot = ComponentHost::new(LinePlot::default(), LinePlotOptions::default(), EventBus::local());
    assert!(plot.update(plot_data()));
    let first = plot.render_data().clone();
    assert!(!plot.update(plot_data()));
    assert_eq!(plot.render_data(), &first);
    assert_eq!(plot.wrangle_count(), 2);
}

#[test]
fn malformed_data_shows_the_empty_state() {
    let mut map = ComponentHost::new(HeatMap::default(), HeatMapOptions::default(), EventBus::local());
    map.update(HeatMapData {
        values: vec![
            vec![MetaValue::Number(1.0), MetaValue::Number(2.0)],
            vec![MetaValue::Number(3.0)],
        ],
    });
    assert_eq!(map.state(), LifecycleState::Rendered);
    assert_eq!(map.render_data(), &HeatMapRender::default());
}

#[test]
fn clearing_returns_to_initialized() {
    let mut cells = ComponentHost::new(CellList::default(), CellListOptions::default(), EventBus::local());
    assert_eq!(cells.state(), LifecycleState::Initialized);
    cells.update(CellListData {
        cells: vec![2],
        excluded: Vec::new(),
    });
    assert_eq!(cells.render_data().entries.len(), 1);
    cells.clear();
    assert_eq!(cells.state(), LifecycleState::Initialized);
    assert!(cells.data().is_none());
    assert!(cells.render_data().entries.is_empty());
}

#[test]
fn options_without_data_do_not_wrangle() {
    let mut words = ComponentHost::new(WordSequence::default(), WordSequenceOptions::default(), EventBus::local());
    assert!(!words.update_options(|o| o.cell_width = 50.0, true));
    assert_eq!(words.wrangle_count(), 0);
    assert_eq!(words.options().cell_width, 50.0);
}
