//! Append-only audit trail: who did what to which entity.

mod query;
mod types;
mod writer;

pub use query::*;
pub use types::*;
pub use writer::*;
