//! Wallet generation
//!
//! [`WalletGenerator`] ties the pieces together: mnemonic store, derivation
//! backend, key/address pipeline, verification and persistence.

mod generator;
mod layout;
mod pipeline;
mod verify;

pub use generator::*;
pub use layout::*;
pub use pipeline::*;
pub use verify::*;
