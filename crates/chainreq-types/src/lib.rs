//! Shared types for the chainreq workspace.
//!
//! This crate holds the domain model used by every other crate: request
//! records, contract decorators, decoded events, observed transactions,
//! list filters, the API wire types and the error taxonomy.

pub mod api;
pub mod common;
pub mod decorator;
pub mod errors;
pub mod events;
pub mod filters;
pub mod project;
pub mod request;
pub mod transaction;

pub use common::*;
pub use decorator::*;
pub use errors::*;
pub use events::*;
pub use filters::*;
pub use project::*;
pub use request::*;
pub use transaction::*;
