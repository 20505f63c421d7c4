//! Error types for adapter operations.

use thiserror::Error;

/// Errors surfaced by adapter operations.
///
/// Store fetch failures never appear here: the loader swallows them and
/// retries on the poll cadence. Observer failures are delivered to the
/// failing subscription's own `on_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The operation was entered after the adapter was disposed.
    #[error("adapter already disposed")]
    Disposed,
}
