//! Shared schemas, error types, and unique-id generation for the payment ledger.

pub mod error;
pub mod types;
pub mod uid;

pub use error::{LedgerError, Result};
pub use types::{Account, AccountId, Favorite, Money, Payment, PaymentStatus};
pub use uid::{TokenUidSource, UidSource};
