//! At-rest protection of sensitive wallet files

pub mod cipher;
mod secure;

pub use secure::*;
