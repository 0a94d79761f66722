//! Exclusive locks for shared state.
//!
//! A thin layer over `parking_lot`: non-reentrant exclusive locking with
//! RAII guards, so the explicit unlock/destroy steps of classical mutex
//! APIs cannot be forgotten or double-executed.

/// Guard of a held [`Mutex`]; the lock is released on drop.
pub type MutexGuard<'a, T> = parking_lot::MutexGuard<'a, T>;

/// Non-reentrant exclusive lock protecting a `T`.
///
/// Re-locking from the thread that already holds the lock deadlocks; this
/// mirrors the contract of the OS primitives underneath.
pub struct Mutex<T> {
    inner: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
    /// Create a mutex protecting `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: parking_lot::Mutex::new(value),
        }
    }

    /// Acquire the lock, blocking until it is available.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Try to acquire the lock without blocking.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock()
    }

    /// Consume the mutex and return the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}
