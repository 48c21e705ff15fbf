//! Shared utilities: directory resets, permissions, private key copies.

pub mod fs;
pub mod keys;

pub use keys::{copy_ca_keys, copy_private_keys};
