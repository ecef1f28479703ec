use thiserror::Error;

/// Result type for pool operations.
pub type Result<T, E = PoolError> = std::result::Result<T, E>;

/// Errors returned by [`crate::DynamicPool`] and [`crate::PoolRegistry`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// No free instance is available and the pool already holds `max_size`
    /// instances.
    #[error("pool exhausted: {max_size} instances already created")]
    PoolExhausted {
        /// The size cap in effect when the borrow failed.
        max_size: usize,
    },

    /// The reverted handle is not currently borrowed from this pool.
    #[error("instance is not borrowed from this pool")]
    UnknownInstance,

    /// The factory or the free list produced a handle equal to one that is
    /// already borrowed. The offending instance has been destroyed.
    #[error("instance is equal to one that is already borrowed")]
    DuplicateInstance,

    /// A pool already exists for the requested key.
    #[error("a pool already exists for this key")]
    DuplicatePool,

    /// No pool is registered for the requested key.
    #[error("no pool registered for this key")]
    UnknownPool,
}
