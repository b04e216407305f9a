//! Vote events: a published window in which registered voters pick among
//! candidate projects.

pub mod queries;
pub mod types;

pub use queries::*;
pub use types::*;
