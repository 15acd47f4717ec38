pub mod activations;
pub mod params;
pub mod query;
pub mod selection;
