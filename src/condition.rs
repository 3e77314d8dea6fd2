use {
    crate::{error::AcquireError, owner::owner_id, stamp::StampLock},
    parking_lot::Condvar,
    static_assertions::assert_impl_all,
    std::time::{Duration, Instant},
};

#[cfg(test)]
mod tests;

/// A condition of the write lock of an [`Acquirable`].
///
/// Created by [`Acquirable::new_condition`]. A condition is not tied to a
/// particular acquisition; it is usable whenever the calling thread holds
/// the acquirable's write lock, and every operation fails with
/// [`AcquireError::WrongThread`] otherwise.
///
/// [`wait`] releases the write lock, sleeps until the condition is
/// signalled, and re-acquires the write lock before returning. As with any
/// condition variable, waits can wake spuriously and must be wrapped in a
/// predicate loop.
///
/// # Example
///
/// ```
/// use acquirable::Acquirable;
///
/// let acquirable = Acquirable::new(0);
/// let condition = acquirable.new_condition();
/// std::thread::scope(|s| {
///     s.spawn(|| {
///         let acquisition = acquirable.acquire_write().unwrap();
///         acquisition.set(1).unwrap();
///         condition.notify_one().unwrap();
///     });
///     let acquisition = acquirable.acquire_write().unwrap();
///     while acquisition.get().unwrap() == 0 {
///         condition.wait().unwrap();
///     }
/// });
/// ```
///
/// [`Acquirable`]: crate::Acquirable
/// [`Acquirable::new_condition`]: crate::Acquirable::new_condition
/// [`wait`]: Condition::wait
pub struct Condition<'a> {
    lock: &'a StampLock,
    cv: Condvar,
}

assert_impl_all!(Condition<'static>: Send, Sync);

impl<'a> Condition<'a> {
    pub(crate) fn new(lock: &'a StampLock) -> Self {
        Self {
            lock,
            cv: Condvar::new(),
        }
    }

    /// Releases the write lock, waits for a notification, and re-acquires
    /// the write lock.
    ///
    /// # Errors
    ///
    /// Fails with [`AcquireError::WrongThread`] if the calling thread does
    /// not hold the write lock.
    pub fn wait(&self) -> Result<(), AcquireError> {
        self.wait_internal(None).map(drop)
    }

    /// Like [`wait`], but gives up waiting after the timeout. Returns
    /// whether the timeout elapsed without a notification.
    ///
    /// The write lock is re-acquired before returning even when the wait
    /// timed out.
    ///
    /// [`wait`]: Condition::wait
    pub fn wait_for(&self, timeout: Duration) -> Result<bool, AcquireError> {
        self.wait_internal(Some(Instant::now() + timeout))
    }

    /// Like [`wait`], but gives up waiting at the deadline. Returns whether
    /// the deadline passed without a notification.
    ///
    /// The write lock is re-acquired before returning even when the wait
    /// timed out.
    ///
    /// [`wait`]: Condition::wait
    pub fn wait_until(&self, deadline: Instant) -> Result<bool, AcquireError> {
        self.wait_internal(Some(deadline))
    }

    /// Wakes one thread waiting on this condition.
    ///
    /// # Errors
    ///
    /// Fails with [`AcquireError::WrongThread`] if the calling thread does
    /// not hold the write lock.
    pub fn notify_one(&self) -> Result<(), AcquireError> {
        self.lock
            .condition_notify(&self.cv, owner_id(), false)
            .map_err(|_| AcquireError::WrongThread)
    }

    /// Wakes all threads waiting on this condition.
    ///
    /// # Errors
    ///
    /// Fails with [`AcquireError::WrongThread`] if the calling thread does
    /// not hold the write lock.
    pub fn notify_all(&self) -> Result<(), AcquireError> {
        self.lock
            .condition_notify(&self.cv, owner_id(), true)
            .map_err(|_| AcquireError::WrongThread)
    }

    fn wait_internal(&self, deadline: Option<Instant>) -> Result<bool, AcquireError> {
        self.lock
            .condition_wait(&self.cv, owner_id(), deadline)
            .map_err(|_| AcquireError::WrongThread)
    }
}
