use thiserror::Error;

/// Errors raised when building a [`Ring`](crate::Ring).
///
/// A full ring under `produce` and an empty ring under `consume` are not
/// errors; they are reported through the normal return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// The requested capacity is zero, negative or not a power of two.
    #[error("invalid capacity {requested}: must be a positive power of two")]
    InvalidCapacity {
        /// The capacity that was asked for.
        requested: i128,
    },
}

impl RingError {
    pub(crate) fn invalid_capacity(requested: impl Into<i128>) -> Self {
        Self::InvalidCapacity {
            requested: requested.into(),
        }
    }
}
