//! Server payloads and the query results built from them.
//!
//! Responses are decoded with serde; fields the views do not need are
//! tolerated but not modelled.  A result is replaced wholesale by the next
//! successful response of the same kind, never merged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::activations::ActivationMatrix;
use crate::error::RequestError;

// ─────────────────────────────────────────────────────────────────────────────
// /info
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of the `/info` catalogue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub project: String,
    #[serde(default)]
    pub info: ProjectInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub name: String,
    pub description: String,
    pub states: StatesInfo,
    pub meta: BTreeMap<String, MetaDimInfo>,
    pub is_searchable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatesInfo {
    pub types: Vec<StateSource>,
}

/// A hidden-state source (layer / state type) of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub layer: Option<u32>,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaDimInfo {
    pub vis: MetaVis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaVis {
    #[serde(rename = "type")]
    pub kind: MetaVisKind,
    pub range: Option<[f64; 2]>,
}

/// How a metadata dimension is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaVisKind {
    Scalar,
    #[default]
    Discrete,
    Wordvec,
    #[serde(other)]
    Other,
}

/// Decoded `/info` catalogue keyed by project id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectCatalogue {
    projects: BTreeMap<String, ProjectInfo>,
}

impl ProjectCatalogue {
    pub fn from_json(body: &[u8]) -> Result<Self, RequestError> {
        let entries: Vec<ProjectEntry> = serde_json::from_slice(body)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<ProjectEntry>) -> Self {
        Self {
            projects: entries.into_iter().map(|e| (e.project, e.info)).collect(),
        }
    }

    pub fn get(&self, project: &str) -> Option<&ProjectInfo> {
        self.projects.get(project)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dimension bundles shared by /context and /match
// ─────────────────────────────────────────────────────────────────────────────

/// Activations of one requested position.  `data` is unit-major.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatesBlock {
    pub pos: i64,
    pub left: i64,
    pub right: i64,
    pub data: Vec<Vec<f64>>,
}

/// Tokens around one requested position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordsBlock {
    pub pos: i64,
    pub left: i64,
    pub right: i64,
    pub words: Vec<String>,
    pub word_ids: Vec<i64>,
}

/// A metadata value: numbers for scalar tracks, labels for categorical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    Label(String),
}

impl MetaValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetaValue::Number(v) => Some(*v),
            MetaValue::Label(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            MetaValue::Number(v) => v.to_string(),
            MetaValue::Label(s) => s.clone(),
        }
    }
}

/// Requested dimensions for one or more positions.  Metadata dimensions arrive
/// as `meta_<name>` keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionBundle {
    pub states: Vec<StatesBlock>,
    pub words: Vec<WordsBlock>,
    pub cell_count: Vec<Vec<u32>>,
    pub cells: Vec<usize>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DimensionBundle {
    /// Values of metadata dimension `name`, one row per requested position.
    ///
    /// `None` when the dimension was not requested or is not a plain table
    /// (word-vector dimensions).
    pub fn meta(&self, name: &str) -> Option<Vec<Vec<MetaValue>>> {
        let raw = self.extra.get(&format!("meta_{name}"))?;
        serde_json::from_value(raw.clone()).ok()
    }

    /// Names of the metadata dimensions present in the bundle.
    pub fn meta_names(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().filter_map(|k| k.strip_prefix("meta_"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// /context
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextResponse {
    pub request: serde_json::Value,
    pub results: DimensionBundle,
}

/// Decoded `/context` result backing the selection panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextResult {
    pub bundle: DimensionBundle,
    pub activations: ActivationMatrix,
    /// Absolute position of the first timestep.
    pub left: i64,
    pub right: i64,
    pub pos: i64,
}

impl ContextResult {
    pub fn from_json(body: &[u8]) -> Result<Self, RequestError> {
        let response: ContextResponse = serde_json::from_slice(body)?;
        Self::from_bundle(response.results)
    }

    pub fn from_bundle(bundle: DimensionBundle) -> Result<Self, RequestError> {
        let (activations, pos, left, right) = match bundle.states.first() {
            Some(block) => (
                ActivationMatrix::from_rows(block.data.clone())
                    .map_err(|e| RequestError::Decode(e.to_string()))?,
                block.pos,
                block.left,
                block.right,
            ),
            None => (ActivationMatrix::default(), 0, 0, 0),
        };
        Ok(Self {
            bundle,
            activations,
            left,
            right,
            pos,
        })
    }

    pub fn words(&self) -> &[String] {
        self.bundle
            .words
            .first()
            .map_or(&[][..], |w| w.words.as_slice())
    }

    /// Number of context words left of the requested position.
    pub fn left_padding(&self) -> usize {
        (self.pos - self.left).max(0) as usize
    }

    pub fn meta(&self, name: &str) -> Option<Vec<MetaValue>> {
        self.bundle.meta(name)?.into_iter().next()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// /match
// ─────────────────────────────────────────────────────────────────────────────

/// Match precision requested from the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Fast,
    Precise,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Fast => "fast",
            MatchMode::Precise => "precise",
        }
    }
}

/// One ranked match position.
///
/// `factors` is `[pos, _, length, jaccard, missing, union, intersection]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingEntry {
    pub pos: i64,
    pub factors: Vec<f64>,
}

impl RankingEntry {
    pub fn phrase_length(&self) -> Option<usize> {
        self.factors.get(2).map(|v| *v as usize)
    }

    pub fn jaccard(&self) -> Option<f64> {
        self.factors.get(3).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchResults {
    pub ranking_detail: Vec<RankingEntry>,
    pub position_detail: DimensionBundle,
    pub fuzzy_length_histogram: Vec<u32>,
    pub strict_length_histogram: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchResponse {
    pub request: serde_json::Value,
    pub results: MatchResults,
}

/// Decoded `/match` result backing the matching panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub results: MatchResults,
}

impl MatchResult {
    pub fn from_json(body: &[u8]) -> Result<Self, RequestError> {
        let response: MatchResponse = serde_json::from_slice(body)?;
        Ok(Self {
            results: response.results,
        })
    }

    /// Word rows of all matched positions.
    pub fn word_rows(&self) -> &[WordsBlock] {
        &self.results.position_detail.words
    }

    /// Active selected cells per matched position and timestep.
    pub fn cell_count(&self) -> &[Vec<u32>] {
        &self.results.position_detail.cell_count
    }

    pub fn meta(&self, name: &str) -> Option<Vec<Vec<MetaValue>>> {
        self.results.position_detail.meta(name)
    }

    /// Left context of the matched rows, taken from the first row.
    pub fn left_padding(&self) -> usize {
        self.word_rows()
            .first()
            .map_or(0, |r| (r.pos - r.left).max(0) as usize)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// /search
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub index: i64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub request: serde_json::Value,
    pub res: Vec<SearchHit>,
}

/// Decoded `/search` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    pub fn from_json(query: &str, body: &[u8]) -> Result<Self, RequestError> {
        let response: SearchResponse = serde_json::from_slice(body)?;
        Ok(Self {
            query: query.to_string(),
            hits: response.res,
        })
    }
}
