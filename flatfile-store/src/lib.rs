//! Flat-file persistence for ledger state.
//!
//! The crate exposes:
//! - [`DumpStore`]: per-collection dump files under one directory, plus the
//!   legacy single-stream accounts format.
//! - [`StoreConfig`]: path layout for the dump directory.
//! - [`history_to_files`]: bounded-size chunked export of one account's
//!   payment history.

pub mod codec;
pub mod config;
pub mod history;

pub use codec::DumpStore;
pub use config::StoreConfig;
pub use history::history_to_files;
