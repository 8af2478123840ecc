//! Database module for PostgreSQL persistence.

mod accounts;
mod documents;
mod pool;

pub use accounts::*;
pub use documents::*;
pub use pool::*;
