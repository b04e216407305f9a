//! Team applications: anonymous form submissions against an Application
//! deadline, reviewed by administrators into real students and projects.

pub mod pipeline;
pub mod schema;
pub mod types;

pub use pipeline::*;
pub use schema::ApplicationSchemaV1;
pub use types::*;
