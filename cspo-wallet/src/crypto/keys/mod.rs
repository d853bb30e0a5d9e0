//! Key derivation types
//!
//! Paths follow CIP-1852 (`1852'/1815'/0'/<branch>/0`) for single-signature
//! roles and CIP-1854 for multisig roles.

mod derivation;

pub use derivation::*;
