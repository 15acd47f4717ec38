//! LSTMVis crate root: re-exports and module wiring.
//!
//! Explore recurrent-network hidden-state activity: brush a span of tokens,
//! derive the activation signature of every hidden unit over that span, and
//! find the corpus positions whose activations match it.
//!
//! Modules:
//! - `events`: local/global event buses
//! - `throttle`: clock and leading-edge throttle
//! - `data`: activations, parameter map, selection engine, server payloads
//! - `url_state`: parameter map <-> shareable query string
//! - `transport`: server requests (HTTP and a recording double)
//! - `controllers`: the state controller owning parameters and results
//! - `panels`: the views, each a headless component plus its egui rendering
//! - `coordinator`: wiring between views and controller
//! - `app`: native window

pub mod app;
pub mod config;
pub mod controllers;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod events;
pub mod panels;
pub mod throttle;
pub mod transport;
pub mod url_state;

// Public re-exports for a compact external API
pub use app::{run_lstmvis, LstmVisApp};
pub use config::LstmVisConfig;
pub use controllers::{ContextRequest, MatchRequest, StateController};
pub use coordinator::ViewCoordinator;
pub use data::activations::ActivationMatrix;
pub use data::params::{ParamKey, ParamValue, ParameterMap};
pub use data::selection::{Selection, SelectionParams};
pub use error::{BusError, ConfigError, ParamError, RequestError};
pub use events::{BusEvent, BusScope, EventBus, EventFilter, EventKind, EventPayload, Subscription};
pub use transport::{HttpTransport, RecordingTransport, Transport};
