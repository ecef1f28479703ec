use std::fmt;

/// A trait defining how a pool creates and destroys its instances.
///
/// The pool calls [`Self::create_new`] only when it needs to grow and
/// [`Self::destroy_existing`] only on instances it currently tracks as free
/// or borrowed.
pub trait PoolFactory<T> {
    /// Creates a fresh, usable instance.
    ///
    /// The returned handle must not compare equal to any other live instance
    /// of the same pool; the pool tracks borrowed instances by value.
    fn create_new(&self) -> T;

    /// Releases every resource owned by `obj`.
    ///
    /// By default, this method simply drops the handle. Override this method
    /// when the handle refers to something that must be torn down explicitly.
    #[inline(always)]
    fn destroy_existing(&self, obj: T) {
        drop(obj);
    }
}

/// A [`PoolFactory`] built from a pair of closures.
pub struct FnFactory<C, D> {
    create: C,
    destroy: D,
}

impl<T, C: Fn() -> T> FnFactory<C, fn(T)> {
    /// Creates a factory that only knows how to create instances; destroyed
    /// instances are dropped.
    pub fn new(create: C) -> Self {
        FnFactory {
            create,
            destroy: drop::<T>,
        }
    }
}

impl<C, D> FnFactory<C, D> {
    /// Replaces the destroy callback.
    pub fn on_destroy<D2>(self, destroy: D2) -> FnFactory<C, D2> {
        FnFactory {
            create: self.create,
            destroy,
        }
    }
}

impl<T, C, D> PoolFactory<T> for FnFactory<C, D>
where
    C: Fn() -> T,
    D: Fn(T),
{
    #[inline(always)]
    fn create_new(&self) -> T {
        (self.create)()
    }

    #[inline(always)]
    fn destroy_existing(&self, obj: T) {
        (self.destroy)(obj)
    }
}

impl<C, D> fmt::Debug for FnFactory<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}
