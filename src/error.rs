//! Error types for the projector controller.

/// Errors that can occur when talking to the projector.
///
/// Tolerated conditions (a sub-query that misses its response marker, an
/// unsupported control property, a cache patch before the first poll) are
/// logged and resolved locally; they never surface through this enum.
#[derive(Debug, thiserror::Error)]
pub enum ProjectorError {
    /// The underlying transport failed (connect, send or receive).
    #[error("TCP transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A control batch was submitted with no entries.
    #[error("Controllable properties cannot be empty")]
    EmptyBatch,
}
