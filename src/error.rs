//! Error types shared across the core.

use crate::data::params::ParamKey;
use crate::events::BusScope;

/// Failures while reading or writing the parameter map.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    UnknownKey(String),
    #[error("parameter '{key}' expects {expected}")]
    TypeMismatch { key: ParamKey, expected: &'static str },
    #[error("malformed value '{raw}' for parameter '{key}'")]
    Malformed { key: ParamKey, raw: String },
    #[error("parameter '{key}' must be finite, got {value}")]
    NonFinite { key: ParamKey, value: f64 },
}

/// Misuse of the event bus wiring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("cannot forward events from the {from:?} bus into the {to:?} bus")]
    ForwardDirection { from: BusScope, to: BusScope },
    #[error("a bus cannot forward into itself")]
    SelfForward,
}

/// Failures of a server query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("cannot decode response: {0}")]
    Decode(String),
    #[error("response for request #{seq} arrived after #{latest} was issued")]
    Stale { seq: u64, latest: u64 },
    #[error("no selected cells to match")]
    EmptySelection,
}

impl From<serde_json::Error> for RequestError {
    fn from(e: serde_json::Error) -> Self {
        RequestError::Decode(e.to_string())
    }
}

/// Failures while loading or saving the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HOME env var not set")]
    NoHome,
    #[error("config file {0:?} does not exist")]
    Missing(std::path::PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// A per-unit activation table whose rows differ in length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row} has {len} timesteps, expected {expected}")]
pub struct ShapeError {
    pub row: usize,
    pub len: usize,
    pub expected: usize,
}
