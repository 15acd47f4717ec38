//! Native application shell.
//!
//! | Sub-module        | Responsibility |
//! | ----------------- | -------------- |
//! | [`lstmvis_app`]   | [`LstmVisApp`] (eframe) laying out toolbar and panels |
//! | [`run`]           | [`run_lstmvis()`] entry point opening the window |

mod lstmvis_app;
mod run;

pub use lstmvis_app::LstmVisApp;
pub use run::run_lstmvis;
