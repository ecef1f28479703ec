/// Sizing parameters for a [`crate::DynamicPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Upper bound on instances the pool creates on its own.
    pub max_size: usize,
    /// Instances created up front when the pool is built.
    pub precache: usize,
}

impl PoolConfig {
    /// Default size cap.
    pub const DEFAULT_MAX_SIZE: usize = 10;

    /// Creates a config with the given cap and nothing precached.
    pub const fn new(max_size: usize) -> Self {
        PoolConfig {
            max_size,
            precache: 0,
        }
    }

    /// Sets the size cap.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets how many instances are created up front. Never more than
    /// `max_size` instances are created.
    #[must_use]
    pub const fn with_precache(mut self, precache: usize) -> Self {
        self.precache = precache;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SIZE)
    }
}
