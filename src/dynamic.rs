use crate::{PoolConfig, PoolError, PoolFactory, PoolHooks, Result};
use std::{
    cell::RefCell,
    collections::{HashSet, VecDeque},
    fmt,
    hash::{Hash, Hasher},
    mem::{self, ManuallyDrop},
    ops::Deref,
    ptr,
    rc::Rc,
};

/// The two disjoint collections every known handle lives in, plus the cap.
struct Slots<T> {
    free: VecDeque<T>,
    borrowed: HashSet<T>,
    max_size: usize,
}

impl<T> Slots<T> {
    #[inline]
    fn size(&self) -> usize {
        self.free.len() + self.borrowed.len()
    }

    #[inline]
    fn has_room(&self) -> bool {
        self.size() < self.max_size
    }
}

/// A point-in-time view of a pool's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances waiting in the free list.
    pub free: usize,
    /// Instances currently lent out.
    pub borrowed: usize,
    /// Size cap in effect.
    pub max_size: usize,
}

impl PoolStats {
    /// Total instances tracked by the pool.
    pub fn size(&self) -> usize {
        self.free + self.borrowed
    }
}

/// A bounded pool of reusable instances for a single thread.
///
/// Instances are created through a [`PoolFactory`] when the pool needs to
/// grow and handed out in FIFO order: the instance that has been waiting the
/// longest in the free list is borrowed first. The pool never creates more
/// than `max_size` instances on its own.
///
/// The pool uses interior mutability and cannot be shared between threads.
/// Factory and hook callbacks run while no internal borrow is held, so they
/// may query the pool.
///
/// Handles are tracked by value: two live instances must never compare equal
/// (nor hash alike while equal), so `T` is usually an id or a pointer identity
/// rather than the resource's contents.
///
/// Dropping the pool depopulates it.
pub struct DynamicPool<F: PoolFactory<T>, H, T> {
    factory: F,
    hooks: H,
    slots: RefCell<Slots<T>>,
}

impl<F: PoolFactory<T>, H, T> DynamicPool<F, H, T> {
    /// Creates an empty pool that grows up to `max_size` instances.
    pub fn new(max_size: usize, factory: F, hooks: H) -> Self {
        DynamicPool {
            factory,
            hooks,
            slots: RefCell::new(Slots {
                free: VecDeque::new(),
                borrowed: HashSet::new(),
                max_size,
            }),
        }
    }

    /// Wraps the pool with a reference counter, enabling the use of
    /// [`Self::borrow_rc`] to obtain guards that are not tied to a borrow of
    /// the pool.
    pub fn to_rc(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Returns the factory this pool creates instances with.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns the hooks this pool runs on borrow and revert.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns the current size cap.
    pub fn max_size(&self) -> usize {
        self.slots.borrow().max_size
    }

    /// Changes the size cap.
    ///
    /// Lowering the cap below the current size neither evicts nor destroys
    /// anything; it only stops the pool from growing until enough instances
    /// have been rejected or depopulated.
    pub fn set_max_size(&self, max_size: usize) {
        let mut slots = self.slots.borrow_mut();
        if max_size < slots.size() {
            tracing::debug!(
                max_size,
                size = slots.size(),
                "pool cap lowered below current size"
            );
        }
        slots.max_size = max_size;
    }

    /// Number of instances currently lent out.
    pub fn borrowed_count(&self) -> usize {
        self.slots.borrow().borrowed.len()
    }

    /// Number of instances waiting in the free list.
    pub fn free_count(&self) -> usize {
        self.slots.borrow().free.len()
    }

    /// Total number of instances tracked by the pool, free or borrowed.
    pub fn size(&self) -> usize {
        self.slots.borrow().size()
    }

    /// Returns a snapshot of the pool's occupancy.
    pub fn stats(&self) -> PoolStats {
        let slots = self.slots.borrow();
        PoolStats {
            free: slots.free.len(),
            borrowed: slots.borrowed.len(),
            max_size: slots.max_size,
        }
    }

    /// Creates up to `amount` instances and appends them to the free list.
    ///
    /// Creation stops as soon as the pool reaches its cap; asking for more
    /// than fits is not an error. Returns how many instances were created.
    pub fn precache(&self, amount: usize) -> usize {
        let mut created = 0;
        while created < amount && self.slots.borrow().has_room() {
            let obj = self.factory.create_new();
            self.slots.borrow_mut().free.push_back(obj);
            created += 1;
        }
        if created > 0 {
            tracing::debug!(requested = amount, created, size = self.size(), "precached pool instances");
        }
        created
    }

    /// Destroys every instance the pool tracks.
    ///
    /// Free instances are destroyed first. Instances that are still borrowed
    /// are destroyed as well, and a warning is logged because their
    /// borrowers now hold dead handles. Both collections are empty afterwards.
    pub fn depopulate_all(&self) {
        let (free, borrowed) = {
            let mut slots = self.slots.borrow_mut();
            (
                mem::take(&mut slots.free),
                mem::take(&mut slots.borrowed),
            )
        };
        let (free_count, borrowed_count) = (free.len(), borrowed.len());
        for obj in free {
            self.factory.destroy_existing(obj);
        }
        if borrowed_count > 0 {
            tracing::warn!(
                borrowed = borrowed_count,
                "depopulating pool while instances are still borrowed"
            );
        }
        for obj in borrowed {
            self.factory.destroy_existing(obj);
        }
        if free_count + borrowed_count > 0 {
            tracing::debug!(free = free_count, borrowed = borrowed_count, "depopulated pool");
        }
    }
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> DynamicPool<F, H, T> {
    /// Creates a pool from a [`PoolConfig`], precaching `config.precache`
    /// instances right away.
    pub fn with_config(config: PoolConfig, factory: F, hooks: H) -> Self {
        let pool = Self::new(config.max_size, factory, hooks);
        pool.precache(config.precache);
        pool
    }

    /// Checks whether `obj` is currently borrowed from this pool.
    pub fn is_borrowed(&self, obj: &T) -> bool {
        self.slots.borrow().borrowed.contains(obj)
    }

    /// Borrows an instance.
    ///
    /// The oldest free instance is reused if there is one. Otherwise a new
    /// instance is created, unless the pool already holds `max_size`
    /// instances, in which case [`PoolError::PoolExhausted`] is returned and
    /// nothing changes.
    ///
    /// If the instance compares equal to one that is already borrowed, it is
    /// destroyed through the factory and [`PoolError::DuplicateInstance`] is
    /// returned, so the pool's counts stay exact.
    pub fn borrow(&self) -> Result<T> {
        let reused = self.slots.borrow_mut().free.pop_front();
        let obj = match reused {
            Some(obj) => obj,
            None => self.grow()?,
        };
        let inserted = self.slots.borrow_mut().borrowed.insert(obj.clone());
        if !inserted {
            tracing::warn!("pool instance equals a borrowed one, destroying it");
            self.factory.destroy_existing(obj);
            return Err(PoolError::DuplicateInstance);
        }
        self.hooks.on_borrow(&obj);
        tracing::trace!(borrowed = self.borrowed_count(), "borrowed pool instance");
        Ok(obj)
    }

    fn grow(&self) -> Result<T> {
        {
            let slots = self.slots.borrow();
            if !slots.has_room() {
                tracing::debug!(max_size = slots.max_size, "pool exhausted");
                return Err(PoolError::PoolExhausted {
                    max_size: slots.max_size,
                });
            }
        }
        Ok(self.factory.create_new())
    }

    /// Returns a borrowed instance to the pool.
    ///
    /// The hooks decide whether the instance may be reused. An accepted
    /// instance goes to the tail of the free list. A rejected one is released
    /// without being destroyed through the factory, and a fresh instance is
    /// precached in its place.
    ///
    /// Returns [`PoolError::UnknownInstance`] without running any hook if
    /// `obj` is not currently borrowed from this pool.
    pub fn revert(&self, obj: &T) -> Result<()> {
        if !self.is_borrowed(obj) {
            return Err(PoolError::UnknownInstance);
        }
        let can_return = self.hooks.on_revert(obj);
        let Some(obj) = self.slots.borrow_mut().borrowed.take(obj) else {
            // reverted from inside the hook
            return Err(PoolError::UnknownInstance);
        };
        if can_return {
            self.slots.borrow_mut().free.push_back(obj);
            tracing::trace!(free = self.free_count(), "reverted pool instance");
        } else {
            // Not destroyed: the rejected instance is handed back to its owner
            // as-is and the pool forgets about it.
            drop(obj);
            tracing::debug!("pool instance rejected on revert, backfilling");
            self.precache(1);
        }
        Ok(())
    }

    /// Reverts every borrowed instance and returns how many were reverted.
    pub fn revert_all(&self) -> usize {
        let snapshot: Vec<T> = self.slots.borrow().borrowed.iter().cloned().collect();
        snapshot
            .iter()
            .filter(|obj| self.revert(obj).is_ok())
            .count()
    }

    /// Borrows an instance wrapped in a guard that reverts it when dropped.
    pub fn borrow_guard(&self) -> Result<PoolGuard<'_, F, H, T>> {
        self.borrow().map(|obj| PoolGuard::new(obj, self))
    }

    /// Borrows an instance wrapped in a guard that holds an rc reference to
    /// the owning pool. Such guards are easier to move around as they are not
    /// limited by the pool's lifetime.
    pub fn borrow_rc(self: Rc<Self>) -> Result<RcPoolGuard<F, H, T>> {
        let obj = Self::borrow(&self)?;
        Ok(RcPoolGuard::new(obj, self))
    }
}

impl<F: PoolFactory<T>, H, T> Drop for DynamicPool<F, H, T> {
    fn drop(&mut self) {
        self.depopulate_all();
    }
}

impl<F: PoolFactory<T>, H, T> fmt::Debug for DynamicPool<F, H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.borrow();
        f.debug_struct("DynamicPool")
            .field("free", &slots.free.len())
            .field("borrowed", &slots.borrowed.len())
            .field("max_size", &slots.max_size)
            .finish()
    }
}

/// A guard over a borrowed instance.
///
/// The instance is reverted to the pool when the guard is dropped.
pub struct PoolGuard<'a, F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> {
    obj: ManuallyDrop<T>,
    pool: &'a DynamicPool<F, H, T>,
}

impl<'a, F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> PoolGuard<'a, F, H, T> {
    fn new(obj: T, pool: &'a DynamicPool<F, H, T>) -> Self {
        PoolGuard {
            obj: ManuallyDrop::new(obj),
            pool,
        }
    }

    /// Consumes the guard and returns the handle without reverting it.
    ///
    /// The instance stays borrowed until it is passed to
    /// [`DynamicPool::revert`].
    pub fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);
        // Safety: `this` is never dropped, so `obj` is taken exactly once.
        unsafe { ManuallyDrop::take(&mut this.obj) }
    }
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Deref for PoolGuard<'_, F, H, T> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.obj
    }
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Drop for PoolGuard<'_, F, H, T> {
    fn drop(&mut self) {
        // Already reverted by hand if this fails.
        let _ = self.pool.revert(&self.obj);
        // Safety: `obj` is not used after this point.
        unsafe { ManuallyDrop::drop(&mut self.obj) }
    }
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Hash for PoolGuard<'_, F, H, T> {
    #[inline]
    fn hash<S: Hasher>(&self, state: &mut S) {
        (**self).hash(state);
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash + fmt::Display> fmt::Display
    for PoolGuard<'_, F, H, T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash + fmt::Debug> fmt::Debug
    for PoolGuard<'_, F, H, T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> PartialEq for PoolGuard<'_, F, H, T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Eq for PoolGuard<'_, F, H, T> {}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> std::borrow::Borrow<T>
    for PoolGuard<'_, F, H, T>
{
    #[inline(always)]
    fn borrow(&self) -> &T {
        self
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> AsRef<T> for PoolGuard<'_, F, H, T> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}

/// A guard over a borrowed instance that keeps its pool alive.
///
/// The instance is reverted to the pool when the guard is dropped.
pub struct RcPoolGuard<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> {
    obj: ManuallyDrop<T>,
    pool: Rc<DynamicPool<F, H, T>>,
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> RcPoolGuard<F, H, T> {
    fn new(obj: T, pool: Rc<DynamicPool<F, H, T>>) -> Self {
        RcPoolGuard {
            obj: ManuallyDrop::new(obj),
            pool,
        }
    }

    /// Returns the pool this guard borrows from.
    pub fn pool(&self) -> &Rc<DynamicPool<F, H, T>> {
        &self.pool
    }

    /// Consumes the guard and returns the handle without reverting it.
    ///
    /// The instance stays borrowed until it is passed to
    /// [`DynamicPool::revert`]. If this guard holds the last reference to the
    /// pool, the pool is dropped here and depopulated, which destroys the
    /// returned instance through the factory; a warning is logged in that
    /// case. Keep another `Rc` to the pool to avoid it.
    pub fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);
        if Rc::strong_count(&this.pool) == 1 {
            tracing::warn!("detaching instance from the last reference to its pool");
        }
        // Safety: `this` is never dropped, so both fields are released
        // exactly once here.
        unsafe {
            let obj = ManuallyDrop::take(&mut this.obj);
            ptr::drop_in_place(&mut this.pool);
            obj
        }
    }
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Deref for RcPoolGuard<F, H, T> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.obj
    }
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Drop for RcPoolGuard<F, H, T> {
    fn drop(&mut self) {
        let _ = self.pool.revert(&self.obj);
        // Safety: `obj` is not used after this point.
        unsafe { ManuallyDrop::drop(&mut self.obj) }
    }
}

impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Hash for RcPoolGuard<F, H, T> {
    #[inline]
    fn hash<S: Hasher>(&self, state: &mut S) {
        (**self).hash(state);
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash + fmt::Display> fmt::Display
    for RcPoolGuard<F, H, T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash + fmt::Debug> fmt::Debug
    for RcPoolGuard<F, H, T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> PartialEq for RcPoolGuard<F, H, T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> Eq for RcPoolGuard<F, H, T> {}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> std::borrow::Borrow<T>
    for RcPoolGuard<F, H, T>
{
    #[inline(always)]
    fn borrow(&self) -> &T {
        self
    }
}
impl<F: PoolFactory<T>, H: PoolHooks<T>, T: Clone + Eq + Hash> AsRef<T> for RcPoolGuard<F, H, T> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}
