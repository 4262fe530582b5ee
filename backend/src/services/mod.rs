//! Business logic services for the Construction Procurement Platform

pub mod allocation;
pub mod billing;
pub mod currency_lock;
pub mod invoice;
pub mod matching;
pub mod order;
pub mod reference;
pub mod statement;
pub mod stock;
pub mod transfer;

pub use allocation::PaymentAllocationService;
pub use billing::ProgressBillingService;
pub use currency_lock::CurrencyLockService;
pub use invoice::InvoiceService;
pub use matching::OrderFifoMatcher;
pub use order::OrderService;
pub use reference::ReferenceDataService;
pub use statement::StatementService;
pub use stock::StockLedgerService;
pub use transfer::TransferService;
