//! # Formgate Common
//!
//! Foundational types shared by every Formgate crate:
//!
//! - [`error`] - severity classification implemented by each crate's error enum
//! - [`logging`] - `Pretty` log formatting and tracing subscriber setup
//!
//! Library crates only emit `tracing` events. Installing a subscriber is left
//! to binaries via [`logging::init_tracing`].

pub mod error;
pub mod logging;

pub use error::{CommonError, ErrorSeverity, Result, Severity};
pub use logging::{init_tracing, Pretty};

/// Separator used by nested (embedded) field keys, e.g. `owner.email`.
pub const KEY_SEPARATOR: char = '.';

/// Returns true when the key addresses an embedded field rather than a
/// top-level one.
pub fn is_embedded_key(key: &str) -> bool {
    key.contains(KEY_SEPARATOR)
}
