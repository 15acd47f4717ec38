#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use lstmvis::url_state::UrlSink;

/// History whose entries stay readable after the controller took the sink.
#[derive(Clone, Default)]
pub struct SharedHistory(pub Rc<RefCell<Vec<String>>>);

impl SharedHistory {
    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.0.borrow().last().cloned()
    }
}

impl UrlSink for SharedHistory {
    fn replace(&mut self, query: &str) {
        self.0.borrow_mut().push(query.to_string());
    }
}

/// 3 units over 5 timesteps; brushing `[2, 4)` at threshold 0.5 selects
/// units 0 and 2.
pub fn scenario_rows() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 0.0, 1.0, 1.0, 0.0],
        vec![0.0, 1.0, 1.0, 0.0, 0.0],
        vec![1.0, 1.0, 1.0, 1.0, 1.0],
    ]
}

/// `/context` reply for `pos` with the word window starting two tokens
/// before it.
pub fn context_json(pos: i64, rows: &[Vec<f64>]) -> String {
    let n = rows.first().map_or(0, Vec::len) as i64;
    let words: Vec<String> = (0..n).map(|i| format!("w{}", pos - 2 + i)).collect();
    serde_json::json!({
        "request": {"pos": pos},
        "results": {
            "states": [{"pos": pos, "left": pos - 2, "right": pos - 2 + n - 1, "data": rows}],
            "words": [{"pos": pos, "left": pos - 2, "right": pos - 2 + n - 1, "words": words}],
            "cells": [],
            "meta_pos": [words.iter().enumerate().map(|(i, _)| if i % 2 == 0 { "NN" } else { "DT" }).collect::<Vec<_>>()]
        }
    })
    .to_string()
}

pub fn info_json() -> String {
    serde_json::json!([
        {"project": "ptb", "info": {
            "name": "Penn Treebank",
            "description": "word level",
            "states": {"types": [{"type": "state", "layer": 1, "path": "states1"}]},
            "meta": {
                "pos": {"vis": {"type": "discrete"}},
                "depth": {"vis": {"type": "scalar", "range": [0, 8]}},
                "embedding": {"vis": {"type": "wordvec"}}
            },
            "is_searchable": true
        }}
    ])
    .to_string()
}

pub fn match_json() -> String {
    serde_json::json!({
        "request": {},
        "results": {
            "rankingDetail": [
                {"pos": 300, "factors": [300, 0, 2, 1.0, 0, 2, 2]},
                {"pos": 900, "factors": [900, 0, 2, 0.5, 1, 2, 1]}
            ],
            "positionDetail": {
                "words": [
                    {"pos": 300, "left": 298, "right": 302, "words": ["a", "b", "c", "d", "e"]},
                    {"pos": 900, "left": 898, "right": 902, "words": ["f", "g", "h", "i", "j"]}
                ],
                "cell_count": [[0, 1, 2, 2, 0], [0, 0, 2, 1, 0]],
                "meta_pos": [["NN", "DT", "NN", "DT", "NN"], ["DT", "DT", "NN", "NN", "DT"]],
                "meta_depth": [[0, 1, 2, 3, 4], [4, 3, 2, 1, 0]]
            },
            "fuzzyLengthHistogram": [0, 3, 1],
            "strictLengthHistogram": [0, 2, 0]
        }
    })
    .to_string()
}
