//! Domain models for the Construction Procurement Platform

pub mod billing;
pub mod invoice;
pub mod material;
pub mod movement;
pub mod order;
pub mod payment;
pub mod quote;
pub mod supplier;
pub mod warehouse;

pub use billing::*;
pub use invoice::*;
pub use material::*;
pub use movement::*;
pub use order::*;
pub use payment::*;
pub use quote::*;
pub use supplier::*;
pub use warehouse::*;
