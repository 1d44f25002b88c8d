//! Data models for the ReadCycle application.
//!
//! All wire types serialize in camelCase to match the frontend contract.

mod activity;
mod auth;
mod book;
mod borrow;
mod cart;
mod page;
mod role;
mod user;

pub use activity::*;
pub use auth::*;
pub use book::*;
pub use borrow::*;
pub use cart::*;
pub use page::*;
pub use role::*;
pub use user::*;
