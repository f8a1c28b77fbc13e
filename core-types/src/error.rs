use thiserror::Error;

use crate::types::{AccountId, Money};

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Closed error set for the ledger and its persistence layer. Callers match
/// by kind; IO and parse errors are fatal to the call, not to the process.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("phone already registered")]
    PhoneAlreadyRegistered,
    #[error("amount must be greater than 0")]
    AmountMustBePositive,
    #[error("account {id} not found")]
    AccountNotFound { id: AccountId },
    #[error("payment {id} not found")]
    PaymentNotFound { id: String },
    #[error("favorite {id} not found")]
    FavoriteNotFound { id: String },
    #[error("balance {balance} is less than amount {amount}")]
    InsufficientBalance { balance: Money, amount: Money },
    #[error("depositing {amount} onto balance {balance} overflows")]
    BalanceOverflow { balance: Money, amount: Money },
    #[error("records per file must be positive, got {count}")]
    InvalidRecordCount { count: usize },
    #[error("malformed record in {file} at line {line}, field {column}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        column: usize,
        reason: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
