//! Mutual-exclusion hook around arena operations.
//!
//! Every public [`Arena`](crate::Arena) operation acquires the arena's lock
//! on entry and holds the returned guard until it returns. Release happens
//! when the guard drops, so early returns and `?` paths release too.
//!
//! [`NoLock`] is the default and costs nothing. Hosts that share an arena
//! across threads (behind their own `Sync` wrapper) or that need to
//! serialize arena work with other critical sections can plug in
//! [`MutexLock`], an `Arc` of either, or their own implementation.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Scoped acquisition capability.
pub trait ArenaLock {
    /// Held for the duration of one operation; dropping it releases the lock.
    type Guard<'a>
    where
        Self: 'a;

    fn acquire(&self) -> Self::Guard<'_>;
}

/// No-op lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl ArenaLock for NoLock {
    type Guard<'a> = ();

    #[inline(always)]
    fn acquire(&self) -> Self::Guard<'_> {}
}

/// Blocking lock backed by `parking_lot::Mutex`.
#[derive(Debug, Default)]
pub struct MutexLock {
    inner: Mutex<()>,
}

impl MutexLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// True while some operation holds the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl ArenaLock for MutexLock {
    type Guard<'a> = MutexGuard<'a, ()>;

    fn acquire(&self) -> Self::Guard<'_> {
        self.inner.lock()
    }
}

impl<L: ArenaLock> ArenaLock for Arc<L> {
    type Guard<'a>
        = L::Guard<'a>
    where
        Self: 'a;

    fn acquire(&self) -> Self::Guard<'_> {
        L::acquire(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutex_lock_releases_on_drop() {
        let lock = MutexLock::new();
        {
            let _guard = lock.acquire();
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn shared_lock_is_the_same_mutex() {
        let lock = Arc::new(MutexLock::new());
        let other = Arc::clone(&lock);
        let guard = other.acquire();
        assert!(lock.is_locked());
        drop(guard);
        assert!(!lock.is_locked());
    }
}
