use crate::{DynamicPool, PoolConfig, PoolError, PoolFactory, PoolHooks, Result};
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    hash::Hash,
};

/// A caller-owned collection of pools, one per template key.
///
/// The key identifies whatever the instances of a pool are made from (a
/// prefab, a type id, a name). Pools are created either strictly with
/// [`Self::create_pool`], which refuses to replace an existing pool, or
/// lazily on first use with [`Self::get_or_create`] and [`Self::borrow`].
///
/// Removing a pool, or dropping the registry, depopulates the pools it owns.
pub struct PoolRegistry<K, F: PoolFactory<T>, H, T> {
    config: PoolConfig,
    pools: HashMap<K, DynamicPool<F, H, T>>,
}

impl<K, F: PoolFactory<T>, H, T> PoolRegistry<K, F, H, T> {
    /// Creates an empty registry. `config` applies to every pool the registry
    /// creates without an explicit config.
    pub fn new(config: PoolConfig) -> Self {
        PoolRegistry {
            config,
            pools: HashMap::new(),
        }
    }

    /// Returns the config used for pools created without an explicit one.
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Number of registered pools.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Checks if no pool is registered.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Iterates over the keys of all registered pools.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.pools.keys()
    }
}

impl<K, F, H, T> PoolRegistry<K, F, H, T>
where
    K: Eq + Hash + fmt::Debug,
    F: PoolFactory<T>,
    H: PoolHooks<T>,
    T: Clone + Eq + Hash,
{
    /// Creates a pool for `key` using the registry's default config.
    ///
    /// Returns [`PoolError::DuplicatePool`] if `key` already has a pool; the
    /// existing pool is left untouched.
    pub fn create_pool(&mut self, key: K, factory: F, hooks: H) -> Result<&DynamicPool<F, H, T>> {
        let config = self.config;
        self.create_pool_with(key, config, factory, hooks)
    }

    /// Same as [`Self::create_pool`] with an explicit config.
    pub fn create_pool_with(
        &mut self,
        key: K,
        config: PoolConfig,
        factory: F,
        hooks: H,
    ) -> Result<&DynamicPool<F, H, T>> {
        match self.pools.entry(key) {
            Entry::Occupied(entry) => {
                tracing::debug!(key = ?entry.key(), "pool already registered");
                Err(PoolError::DuplicatePool)
            }
            Entry::Vacant(entry) => {
                tracing::debug!(key = ?entry.key(), max_size = config.max_size, "created pool");
                Ok(&*entry.insert(DynamicPool::with_config(config, factory, hooks)))
            }
        }
    }

    /// Returns the pool for `key`, creating it with the registry's default
    /// config if it does not exist yet. `make` is only called on creation.
    pub fn get_or_create<M>(&mut self, key: K, make: M) -> &DynamicPool<F, H, T>
    where
        M: FnOnce(&K) -> (F, H),
    {
        let config = self.config;
        match self.pools.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (factory, hooks) = make(entry.key());
                tracing::debug!(key = ?entry.key(), max_size = config.max_size, "created pool on demand");
                entry.insert(DynamicPool::with_config(config, factory, hooks))
            }
        }
    }

    /// Looks up the pool for `key`.
    pub fn pool(&self, key: &K) -> Option<&DynamicPool<F, H, T>> {
        self.pools.get(key)
    }

    /// Borrows an instance from the pool for `key`, creating the pool first
    /// if needed.
    pub fn borrow<M>(&mut self, key: K, make: M) -> Result<T>
    where
        M: FnOnce(&K) -> (F, H),
    {
        self.get_or_create(key, make).borrow()
    }

    /// Reverts `obj` to the pool for `key`.
    ///
    /// Returns [`PoolError::UnknownPool`] if `key` has no pool.
    pub fn revert(&self, key: &K, obj: &T) -> Result<()> {
        self.pools
            .get(key)
            .ok_or(PoolError::UnknownPool)?
            .revert(obj)
    }

    /// Depopulates and removes the pool for `key`. Returns whether a pool
    /// was registered.
    pub fn destroy_pool(&mut self, key: &K) -> bool {
        match self.pools.remove(key) {
            Some(pool) => {
                pool.depopulate_all();
                tracing::debug!(key = ?key, "destroyed pool");
                true
            }
            None => false,
        }
    }

    /// Depopulates and removes every pool.
    pub fn clear(&mut self) {
        for (key, pool) in self.pools.drain() {
            pool.depopulate_all();
            tracing::debug!(key = ?key, "destroyed pool");
        }
    }
}

impl<K, F: PoolFactory<T>, H, T> fmt::Debug for PoolRegistry<K, F, H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("config", &self.config)
            .field("pools", &self.pools.len())
            .finish()
    }
}
