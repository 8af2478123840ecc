//! Accounts, sessions and request authentication.

mod accounts;
mod middleware;
mod password;

pub use accounts::*;
pub use middleware::*;
pub use password::PasswordHash;
