//! Shared types and domain logic for the Construction Procurement Platform
//!
//! This crate holds the domain model and the pure financial arithmetic shared
//! across the system. Everything here is database-free so the money rules can
//! be tested in isolation.

pub mod finance;
pub mod models;
pub mod types;
pub mod validation;

pub use finance::*;
pub use models::*;
pub use types::*;
pub use validation::*;
