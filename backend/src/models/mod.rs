//! Domain models for the Construction Procurement Platform
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
