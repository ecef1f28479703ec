use std::fmt;

/// A trait defining the callbacks a pool runs on every borrow and revert.
///
/// Both methods have defaults, so an implementor only overrides what it
/// needs. `()` implements this trait with the defaults and is the usual
/// choice for pools that need no hooks.
pub trait PoolHooks<T> {
    /// Runs after `obj` has been marked as borrowed, right before it is handed
    /// to the borrower.
    ///
    /// By default, this method do nothing.
    #[inline(always)]
    fn on_borrow(&self, _obj: &T) {}

    /// Runs when `obj` is reverted and decides whether it is fit to go back to
    /// the free list.
    ///
    /// By default, this method always returns true.
    #[inline(always)]
    fn on_revert(&self, _obj: &T) -> bool {
        true
    }
}

impl<T> PoolHooks<T> for () {}

/// An ordered list of hooks that acts as a single [`PoolHooks`].
///
/// Every registered hook is invoked exactly once per borrow and per revert,
/// in registration order. A revert is accepted only if every hook accepts it;
/// a rejection does not stop the remaining hooks from running.
pub struct HookChain<T> {
    hooks: Vec<Box<dyn PoolHooks<T>>>,
}

impl<T> HookChain<T> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        HookChain { hooks: Vec::new() }
    }

    /// Appends a hook to the end of the chain.
    pub fn push<H>(&mut self, hook: H)
    where
        H: PoolHooks<T> + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// Builder-style variant of [`Self::push`].
    pub fn with<H>(mut self, hook: H) -> Self
    where
        H: PoolHooks<T> + 'static,
    {
        self.push(hook);
        self
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Checks if no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<T> Default for HookChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PoolHooks<T> for HookChain<T> {
    fn on_borrow(&self, obj: &T) {
        for hook in &self.hooks {
            hook.on_borrow(obj);
        }
    }

    fn on_revert(&self, obj: &T) -> bool {
        self.hooks
            .iter()
            .fold(true, |accepted, hook| hook.on_revert(obj) && accepted)
    }
}

impl<T> fmt::Debug for HookChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("len", &self.hooks.len())
            .finish()
    }
}
