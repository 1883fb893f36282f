//! Error types for the Storyloom protocol layer.

mod agent;
mod generator;

pub use agent::*;
pub use generator::*;
