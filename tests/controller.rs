mod common;

use std::rc::Rc;
use std::time::Duration;

use common::{context_json, info_json, match_json, scenario_rows, SharedHistory};
use lstmvis::controllers::{ContextRequest, MatchRequest, StateController};
use lstmvis::data::params::{ParamKey, ParamValue};
use lstmvis::data::query::MatchMode;
use lstmvis::error::RequestError;
use lstmvis::events::{EventBus, EventFilter, EventKind, EventPayload};
use lstmvis::throttle::ManualClock;
use lstmvis::transport::{ApiReply, QueryKind, RecordingTransport};

const START: &str = "project=ptb&source=states1&pos=100";

fn controller(query: &str) -> (StateController, RecordingTransport, EventBus) {
    let transport = RecordingTransport::new();
    let bus = EventBus::global();
    let ctrl = StateController::new(bus.clone(), Box::new(transport.clone())).with_query(query);
    (ctrl, transport, bus)
}

/// Controller that already shows the scenario context at position 100.
fn loaded(query: &str) -> (StateController, RecordingTransport, EventBus) {
    let (mut c, t, bus) = controller(query);
    let ticket = c.request_context(ContextRequest::default());
    assert!(t.respond_json(ticket, &context_json(100, &scenario_rows())));
    assert_eq!(c.poll_responses(), 1);
    (c, t, bus)
}

#[test]
fn late_reply_of_superseded_request_is_discarded() {
    let (mut c, t, _) = controller(START);
    let r1 = c.request_context(ContextRequest::default());
    let r2 = c.request_context(ContextRequest::default().with(ParamKey::Pos, ParamValue::Int(200)));
    assert!(r2.seq > r1.seq);

    t.respond_json(r2, &context_json(200, &scenario_rows()));
    assert_eq!(c.poll_responses(), 1);
    t.respond_json(r1, &context_json(100, &scenario_rows()));
    assert_eq!(c.poll_responses(), 0);

    assert_eq!(c.context().unwrap().pos, 200);
}

#[test]
fn stale_reply_reports_the_latest_sequence() {
    let (mut c, _, _) = controller(START);
    let r1 = c.request_context(ContextRequest::default());
    let r2 = c.request_context(ContextRequest::default());
    let err = c
        .complete(ApiReply {
            ticket: r1,
            body: Ok(context_json(100, &scenario_rows()).into_bytes()),
        })
        .unwrap_err();
    assert_eq!(err, RequestError::Stale { seq: r1.seq, latest: r2.seq });
    assert!(c.context().is_none());
}

#[test]
fn sequences_are_tracked_per_query_kind() {
    let (mut c, t, _) = loaded(START);
    c.set_word_brush(Some([2, 4]));
    c.set_word_brush_zero(Some([0, 0]));
    c.update_cell_selection(true);
    let m = c.request_match(MatchRequest::default()).unwrap();
    // a newer context request must not make the match reply stale
    c.request_context(ContextRequest::preserving());
    t.respond_json(m, &match_json());
    c.poll_responses();
    assert!(c.match_result().is_some());
}

#[test]
fn failed_request_keeps_previous_result_and_stays_silent() {
    let (mut c, t, bus) = loaded(START);
    let before = c.context().cloned();
    let (_sub, rx) = bus.subscribe_channel(EventFilter::only(EventKind::NEW_CONTEXT_AVAILABLE));

    let ticket = c.request_context(ContextRequest::default());
    t.respond(ticket, Err(RequestError::Network("connection refused".into())));
    assert_eq!(c.poll_responses(), 0);
    assert_eq!(c.context().cloned(), before);

    let garbage = c.request_context(ContextRequest::default());
    t.respond_json(garbage, "{\"results\": {\"states\": [{\"data\": [[1.0], [1.0, 2.0]]}]}}");
    assert_eq!(c.poll_responses(), 0);
    assert_eq!(c.context().cloned(), before);

    assert!(rx.try_recv().is_err());
}

#[test]
fn new_context_selects_by_brush_unless_preserving() {
    let (mut c, t, bus) = loaded(START);
    let (_sub, rx) = bus.subscribe_channel(EventFilter::only(EventKind::NEW_CONTEXT_AVAILABLE));
    c.set_word_brush(Some([2, 4]));
    c.set_word_brush_zero(Some([0, 0]));

    let ticket = c.request_context(ContextRequest::default());
    t.respond_json(ticket, &context_json(100, &scenario_rows()));
    c.poll_responses();
    assert_eq!(c.cell_selection(), &[0, 2]);
    assert_eq!(
        rx.try_recv().unwrap().payload,
        EventPayload::Context { keep_selected_cells: false }
    );

    // a preserving request keeps {0, 2} although the new activations differ
    let mut rows = scenario_rows();
    rows[0] = vec![0.0; 5];
    let ticket = c.request_context(ContextRequest::preserving());
    t.respond_json(ticket, &context_json(100, &rows));
    c.poll_responses();
    assert_eq!(c.cell_selection(), &[0, 2]);
    assert_eq!(
        rx.try_recv().unwrap().payload,
        EventPayload::Context { keep_selected_cells: true }
    );
}

#[test]
fn match_is_a_no_op_without_selected_cells() {
    let (mut c, t, _) = loaded(START);
    assert!(c.cell_selection().is_empty());
    assert_eq!(c.request_match(MatchRequest::default()), None);
    assert!(t.requests_of(QueryKind::Match).is_empty());

    // everything selected but excluded counts as empty too
    c.set_word_brush(Some([2, 4]));
    c.set_word_brush_zero(Some([0, 0]));
    c.update_cell_selection(true);
    c.toggle_excluded(0);
    c.toggle_excluded(2);
    assert_eq!(c.request_match(MatchRequest::default()), None);
}

#[test]
fn match_payload_carries_cells_constraints_and_dims() {
    let (mut c, t, bus) = loaded(START);
    let (_sub, rx) = bus.subscribe_channel(EventFilter::only(EventKind::NEW_MATCH_RESULTS));
    c.set_word_brush(Some([2, 4]));
    c.set_word_brush_zero(Some([0, 0]));
    c.update_cell_selection(true);
    c.toggle_excluded(0);

    let ticket = c
        .request_match(MatchRequest {
            meta_dims: vec!["pos".into()],
            mode: MatchMode::Precise,
        })
        .unwrap();
    let req = t.last(QueryKind::Match).unwrap();
    assert_eq!(req.param("cells"), Some("2"));
    assert_eq!(req.param("constraints"), Some("0,0"));
    assert_eq!(req.param("dims"), Some("meta_pos,states,cell_count,words"));
    assert_eq!(req.param("mode"), Some("precise"));
    assert_eq!(req.param("project"), Some("ptb"));

    t.respond_json(ticket, &match_json());
    assert_eq!(c.poll_responses(), 1);
    assert_eq!(c.match_result().unwrap().word_rows().len(), 2);
    assert!(rx.try_recv().is_ok());
}

#[test]
fn start_requires_project_position_and_source() {
    let (mut c, t, bus) = controller("project=ptb&pos=3");
    let (_sub, rx) = bus.subscribe_channel(EventFilter::only(EventKind::WRONG_PARAMETERS));
    assert_eq!(c.init_by_url_and_run(), None);
    assert!(t.is_empty());
    match rx.try_recv().unwrap().payload {
        EventPayload::Query(q) => assert!(q.contains("project=ptb")),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn start_loads_catalogue_then_context() {
    let (mut c, t, bus) = controller(START);
    let (_sub, rx) = bus.subscribe_channel(EventFilter::only(
        EventKind::PROJECTS_META_AVAILABLE | EventKind::CONTEXT_REQUEST_SENT,
    ));
    let info = c.init_by_url_and_run().unwrap();
    assert_eq!(info.kind, QueryKind::Info);
    assert!(t.requests_of(QueryKind::Context).is_empty());

    t.respond_json(info, &info_json());
    c.poll_responses();
    assert_eq!(c.project_info().unwrap().name, "Penn Treebank");
    assert_eq!(t.requests_of(QueryKind::Context).len(), 1);

    let kinds: Vec<EventKind> = rx.try_iter().map(|e| e.kinds).collect();
    assert_eq!(
        kinds,
        vec![EventKind::PROJECTS_META_AVAILABLE, EventKind::CONTEXT_REQUEST_SENT]
    );
}

#[test]
fn url_updates_are_coalesced_and_keep_the_last_value() {
    let clock = ManualClock::new();
    let history = SharedHistory::default();
    let (c, _, _) = controller(START);
    let mut c = c
        .with_clock(Rc::new(clock.clone()))
        .with_url_sink(Box::new(history.clone()));

    c.set_pos(101);
    assert_eq!(history.entries().len(), 1);
    c.set_pos(102);
    c.set_pos(103);
    c.tick();
    assert_eq!(history.entries().len(), 1);
    assert!(c.url_pending());

    clock.advance(Duration::from_millis(250));
    c.tick();
    assert_eq!(history.entries().len(), 2);
    assert!(history.last().unwrap().contains("pos=103"));
    assert!(!c.url_pending());
}

#[test]
fn hidden_parameters_do_not_touch_the_url() {
    let history = SharedHistory::default();
    let (c, _, _) = controller(START);
    let mut c = c.with_url_sink(Box::new(history.clone()));
    c.set(ParamKey::Left, ParamValue::Int(12)).unwrap();
    c.set(ParamKey::Transform, ParamValue::Text("none".into())).unwrap();
    assert!(history.entries().is_empty());
    assert!(!c.current_url().contains("left"));
}

#[test]
fn url_sync_leaves_parameters_untouched() {
    let (mut c, _, _) = controller(START);
    c.set_word_brush(Some([1, 3]));
    let before = c.params().clone();
    c.sync_url();
    c.flush_url();
    c.tick();
    assert_eq!(c.params(), &before);
}

#[test]
fn set_rejects_wrong_shapes() {
    let (mut c, _, _) = controller("");
    assert!(c.set(ParamKey::Pos, ParamValue::Text("x".into())).is_err());
    assert_eq!(c.pos(), 0);
}

#[test]
fn set_rejects_non_finite_threshold() {
    let (mut c, _, _) = controller(START);
    assert!(c.set(ParamKey::Activation, ParamValue::Float(f64::NAN)).is_err());
    assert!(c.set(ParamKey::Activation, ParamValue::Float(f64::INFINITY)).is_err());
    assert_eq!(c.threshold(), 0.3);
}

#[test]
fn url_brush_past_the_context_selects_nothing() {
    let (c, _, _) = loaded(
        "project=ptb&source=states1&pos=100&wordBrush=0,9000000000000000000&wordBrushZero=1,0",
    );
    assert!(c.cell_selection().is_empty());
    assert!(c.selection().signature().len() <= 5);
    // the shared link keeps what it asked for
    assert_eq!(c.word_brush(), Some([0, 9_000_000_000_000_000_000]));

    let (c, _, _) = loaded(
        "project=ptb&source=states1&pos=100&wordBrush=-9223372036854775808,9223372036854775807&wordBrushZero=9223372036854775807,9223372036854775807",
    );
    assert!(c.cell_selection().is_empty());
}

#[test]
fn url_brush_with_oversized_padding_still_matches() {
    let (c, _, _) = loaded("project=ptb&source=states1&pos=100&wordBrush=2,4&wordBrushZero=0,9000000000000000000");
    // unit 0 is the only one inactive from t=4 to the end of the context
    assert_eq!(c.cell_selection(), &[0]);
}

#[test]
fn clearing_the_brush_resets_exclusions() {
    let (mut c, _, _) = loaded(START);
    c.set_word_brush(Some([2, 4]));
    c.toggle_excluded(2);
    c.set_word_brush(None);
    assert_eq!(c.word_brush_zero(), None);
    assert!(c.excluded_cells().is_empty());
}

#[test]
fn shifting_position_moves_brush_and_preserves_selection() {
    let (mut c, t, _) = loaded(START);
    c.set_word_brush(Some([2, 4]));
    c.shift_position(5);
    assert_eq!(c.word_brush(), Some([-3, -1]));
    assert_eq!(c.pos(), 105);
    assert_eq!(t.last(QueryKind::Context).unwrap().param("pos"), Some("105"));
}

#[test]
fn jumping_clears_brush_and_exclusions() {
    let (mut c, t, _) = loaded(START);
    c.set_word_brush(Some([2, 4]));
    c.toggle_excluded(1);
    c.jump_to_position(4000);
    assert_eq!(c.word_brush(), None);
    assert_eq!(c.word_brush_zero(), None);
    assert!(c.excluded_cells().is_empty());
    assert_eq!(t.last(QueryKind::Context).unwrap().param("pos"), Some("4000"));
}

#[test]
fn search_results_are_broadcast_with_their_query() {
    let (mut c, t, bus) = controller(START);
    let (_sub, rx) = bus.subscribe_channel(EventFilter::only(EventKind::SEARCH_RESULTS));
    let ticket = c.request_search("the cat");
    t.respond_json(ticket, r#"{"request": {}, "res": [{"index": 55, "text": "the cat sat"}]}"#);
    c.poll_responses();
    assert_eq!(c.search_result().unwrap().hits[0].index, 55);
    assert_eq!(rx.try_recv().unwrap().payload, EventPayload::Query("the cat".into()));
}

#[test]
fn meta_tracks_request_context_only_when_added() {
    let (mut c, t, _) = loaded(START);
    let before = t.requests_of(QueryKind::Context).len();
    assert!(c.add_meta_track("pos").is_some());
    assert_eq!(c.visible_meta(), &["pos".to_string()]);
    assert_eq!(
        t.last(QueryKind::Context).unwrap().param("dims"),
        Some("states,words,meta_pos")
    );
    assert!(c.add_meta_track("pos").is_none());
    c.remove_meta_track("pos");
    assert!(c.visible_meta().is_empty());
    assert_eq!(t.requests_of(QueryKind::Context).len(), before + 1);
}
