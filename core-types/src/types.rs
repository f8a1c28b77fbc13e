use std::fmt;

/// Monetary amount in minor currency units.
pub type Money = i64;

/// Sequential account identifier, assigned at registration, never reused.
pub type AccountId = i64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub phone: String,
    pub balance: Money,
}

/// Lifecycle of a payment. There is no terminal-success state: a payment
/// stays `InProgress` until it is explicitly rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    InProgress,
    Fail,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::InProgress => "InProgress",
            PaymentStatus::Fail => "Fail",
        }
    }

    /// Strict parse of the serialized status literal.
    pub fn parse(value: &str) -> Option<PaymentStatus> {
        match value {
            "InProgress" => Some(PaymentStatus::InProgress),
            "Fail" => Some(PaymentStatus::Fail),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub id: String,
    pub account_id: AccountId,
    /// Greater than zero while active; forced to zero once rejected.
    pub amount: Money,
    pub category: String,
    pub status: PaymentStatus,
}

/// Immutable template captured from a prior payment, used to originate new
/// payments. A snapshot copy, not a live reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Favorite {
    pub id: String,
    pub account_id: AccountId,
    pub name: String,
    pub amount: Money,
    pub category: String,
}
