//! Directed "who evaluates whom" relations between project teams of one cohort.

pub mod queries;
pub mod types;

pub use queries::*;
pub use types::*;
