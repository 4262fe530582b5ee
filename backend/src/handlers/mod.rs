//! HTTP handlers for the Construction Procurement Platform

pub mod health;
pub mod invoice;
pub mod order;
pub mod payment;
pub mod quote;
pub mod rates;
pub mod reference;
pub mod stock;
pub mod supplier;
pub mod transfer;

pub use health::*;
pub use invoice::*;
pub use order::*;
pub use payment::*;
pub use quote::*;
pub use rates::*;
pub use reference::*;
pub use stock::*;
pub use supplier::*;
pub use transfer::*;
