//! Personal movie and series catalog.
//!
//! Items and tags live in a remote document store reached through
//! [`gateway`]; [`store::Store`] keeps the in-memory state in step with it
//! and [`pipeline`] derives the list the user actually sees.

pub mod config;
pub mod errors;
pub mod gateway;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod settings;
pub mod store;
pub mod validation;
