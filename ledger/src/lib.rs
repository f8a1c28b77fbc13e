//! In-memory payment ledger: accounts, payments, and favorite templates.
//!
//! The crate exposes [`Ledger`], which owns the three collections and
//! enforces the domain invariants, plus the aggregation entry points that
//! fan scans out over snapshots via the `aggregations` crate.

pub mod ledger;

pub use ledger::{Ledger, LedgerSnapshot};
