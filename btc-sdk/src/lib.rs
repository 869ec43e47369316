#![deny(missing_docs)]

//! Legacy Bitcoin-family SDK - Complete SDK.
//!
//! Re-exports all SDK components for convenient single-crate usage.

pub use btc_primitives as primitives;
pub use btc_script as script;
pub use btc_transaction as transaction;
