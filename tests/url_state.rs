use lstmvis::data::params::{ParamKey, ParamValue, ParameterMap};
use lstmvis::url_state::{new_link, parse_query, serialize_query};

fn sample_state() -> ParameterMap {
    let mut p = ParameterMap::default();
    p.set(ParamKey::Project, ParamValue::Text("05childbook".into())).unwrap();
    p.set(ParamKey::Source, ParamValue::Text("states::states1".into())).unwrap();
    p.set(ParamKey::Pos, ParamValue::Int(1200)).unwrap();
    p.set(ParamKey::Activation, ParamValue::Float(0.35)).unwrap();
    p.set(ParamKey::CellWidth, ParamValue::Int(25)).unwrap();
    p.set(ParamKey::WordBrush, ParamValue::Range(Some([3, 7]))).unwrap();
    p.set(ParamKey::WordBrushZero, ParamValue::Range(Some([1, 0]))).unwrap();
    p.set(ParamKey::SelectedCells, ParamValue::IntList(vec![4, 17, 203])).unwrap();
    p.set(ParamKey::ExcludedCells, ParamValue::IntList(vec![17])).unwrap();
    p.set(ParamKey::VisibleMeta, ParamValue::TextList(vec!["pos".into(), "ner".into()])).unwrap();
    p
}

#[test]
fn visible_state_round_trips() {
    let state = sample_state();
    let query = serialize_query(&state);
    let parsed = parse_query(&query);
    for key in ParamKey::ALL.iter().copied().filter(|k| !k.is_hidden()) {
        assert_eq!(parsed.params.get(key), state.get(key), "key {}", key);
    }
}

#[test]
fn hidden_keys_never_reach_the_url() {
    let mut state = sample_state();
    state.set(ParamKey::Left, ParamValue::Int(12)).unwrap();
    state.set(ParamKey::Transform, ParamValue::Text("none".into())).unwrap();
    let query = serialize_query(&state);
    assert!(!query.contains("left="));
    assert!(!query.contains("transform="));
    assert!(!query.contains("dims="));

    let parsed = parse_query(&query);
    assert_eq!(parsed.params.get(ParamKey::Left), &ParamKey::Left.default_value());
}

#[test]
fn defaults_are_omitted() {
    assert_eq!(serialize_query(&ParameterMap::default()), "");
    let mut p = ParameterMap::default();
    p.set(ParamKey::Pos, ParamValue::Int(5)).unwrap();
    assert_eq!(serialize_query(&p), "pos=5");
}

#[test]
fn malformed_and_unknown_parameters_fall_back() {
    let parsed = parse_query("?pos=abc&activation=0.5&wordBrush=1,2,3&bogus=1&cw=40");
    assert_eq!(parsed.params.int(ParamKey::Pos), 0);
    assert!(!parsed.has(ParamKey::Pos));
    assert_eq!(parsed.params.float(ParamKey::Activation), 0.5);
    assert_eq!(parsed.params.range(ParamKey::WordBrush), None);
    assert_eq!(parsed.params.int(ParamKey::CellWidth), 40);
    assert!(parsed.has(ParamKey::CellWidth));
}

#[test]
fn lists_are_comma_joined() {
    let parsed = parse_query("sc=3,%208,12&meta=pos,ner");
    assert_eq!(parsed.params.int_list(ParamKey::SelectedCells), &[3, 8, 12]);
    assert_eq!(
        parsed.params.text_list(ParamKey::VisibleMeta),
        &["pos".to_string(), "ner".to_string()]
    );
}

#[test]
fn link_to_other_position_drops_brush() {
    let state = sample_state();
    let link = new_link(
        &state,
        &[(ParamKey::Pos, ParamValue::Int(88))],
        &[ParamKey::WordBrush, ParamKey::WordBrushZero],
    );
    let parsed = parse_query(&link);
    assert_eq!(parsed.params.int(ParamKey::Pos), 88);
    assert_eq!(parsed.params.range(ParamKey::WordBrush), None);
    assert_eq!(parsed.params.range(ParamKey::WordBrushZero), None);
    assert_eq!(parsed.params.text(ParamKey::Project), "05childbook");
    // the source state is untouched
    assert_eq!(state.int(ParamKey::Pos), 1200);
}

#[test]
fn edge_values_round_trip() {
    let cases: Vec<(ParamKey, ParamValue)> = vec![
        (ParamKey::Source, ParamValue::Text("states1 ".into())),
        (ParamKey::Project, ParamValue::Text("  a&b=c ".into())),
        (ParamKey::Project, ParamValue::Text(String::new())),
        (ParamKey::Pos, ParamValue::Int(-7)),
        (ParamKey::Activation, ParamValue::Float(1e-7)),
        (ParamKey::Activation, ParamValue::Float(-0.25)),
        (ParamKey::WordBrush, ParamValue::Range(Some([-3, -1]))),
        (ParamKey::WordBrush, ParamValue::Range(Some([4, 4]))),
        (ParamKey::WordBrushZero, ParamValue::Range(Some([0, 0]))),
        (ParamKey::SelectedCells, ParamValue::IntList(Vec::new())),
        (ParamKey::SelectedCells, ParamValue::IntList(vec![-1, 0, 9])),
        (ParamKey::VisibleMeta, ParamValue::TextList(Vec::new())),
        (ParamKey::VisibleMeta, ParamValue::TextList(vec![" pos".into(), "n e r ".into()])),
    ];
    for (key, value) in cases {
        let mut state = sample_state();
        state.set(key, value.clone()).unwrap();
        let parsed = parse_query(&serialize_query(&state));
        for k in ParamKey::ALL.iter().copied().filter(|k| !k.is_hidden()) {
            assert_eq!(parsed.params.get(k), state.get(k), "{} = {:?}, key {}", key, value, k);
        }
    }
}

#[test]
fn values_that_cannot_round_trip_are_rejected() {
    let mut state = sample_state();
    assert!(state
        .set(ParamKey::VisibleMeta, ParamValue::TextList(vec!["a,b".into()]))
        .is_err());
    assert!(state
        .set(ParamKey::VisibleMeta, ParamValue::TextList(vec![String::new()]))
        .is_err());
    assert!(state.set(ParamKey::Activation, ParamValue::Float(f64::NAN)).is_err());
    assert_eq!(state, sample_state());
}
