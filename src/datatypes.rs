//! Collection of the data-structures shared by the grounder and the translator
mod grounded;
mod ids;
mod task;

pub use grounded::*;
pub use ids::*;
pub use task::*;
