//! Authentication and authorization.
//!
//! HS512 JWTs carry an embedded user and a scope claim so access, refresh and
//! email-verification tokens cannot be swapped for one another.

mod middleware;
mod password;
mod tokens;

pub use middleware::*;
pub use password::*;
pub use tokens::*;
