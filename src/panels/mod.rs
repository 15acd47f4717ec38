pub mod cell_list;
pub mod component;
pub mod heatmap;
pub mod lineplot;
pub mod match_matrix;
pub mod palette;
pub mod selection_preview;
pub mod word_sequence;

pub use cell_list::CellList;
pub use component::{Component, ComponentHost, LifecycleState, Render};
pub use heatmap::HeatMap;
pub use lineplot::LinePlot;
pub use match_matrix::MatchMatrix;
pub use selection_preview::SelectionPreview;
pub use word_sequence::WordSequence;
