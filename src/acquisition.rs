use {
    crate::{acquirable::Shared, error::AcquireError, owner::owner_id},
    static_assertions::{assert_impl_all, assert_not_impl_any},
    std::{
        cell::Cell,
        fmt::{Debug, Formatter},
        sync::{
            Arc,
            atomic::{
                AtomicBool, AtomicUsize,
                Ordering::Relaxed,
            },
        },
    },
};

#[cfg(test)]
mod tests;

/// The kind of access an acquisition grants.
///
/// The reported kind of an acquisition can change over its lifetime: a root
/// acquisition created with [`Acquirable::acquire_read`] reports
/// [`AcquisitionType::Write`] while an upgraded acquisition created from it
/// is live and reverts to [`AcquisitionType::Read`] once the last upgrade
/// has been closed.
///
/// [`Acquirable::acquire_read`]: crate::Acquirable::acquire_read
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AcquisitionType {
    /// The acquisition permits read operations.
    Read,
    /// The acquisition permits read and write operations.
    Write,
}

/// The capability surface shared by [`ReadAcquisition`] and
/// [`WriteAcquisition`].
///
/// This trait is sealed and cannot be implemented outside of this crate.
pub trait Acquisition: sealed::Sealed {
    /// Unlocks the acquisition.
    ///
    /// Closing is idempotent: closing an already closed acquisition does
    /// nothing. Closing a reused acquisition also does nothing; the
    /// outermost acquisition of the thread keeps the lock. Closing an
    /// upgraded acquisition converts the stamp back into a read stamp once
    /// the last upgrade has been closed.
    ///
    /// Acquisitions close themselves when dropped on their owner thread, so
    /// calling this is only necessary when the unlock point matters or when
    /// the result of a later [`is_unlocked`] call is of interest.
    ///
    /// # Errors
    ///
    /// Fails with [`AcquireError::WrongThread`] if the caller thread does
    /// not own the acquisition.
    ///
    /// # Panics
    ///
    /// Panics if this is a root acquisition and upgraded acquisitions
    /// created from it are still live. Acquisitions must be closed in the
    /// reverse order of their creation.
    ///
    /// [`is_unlocked`]: Acquisition::is_unlocked
    fn close(&self) -> Result<(), AcquireError>;

    /// Returns whether [`close`] has run.
    ///
    /// A reused acquisition always reports `true`, since its close is a
    /// no-op and its lock belongs to the outer acquisition. An upgraded
    /// acquisition reports whether its own close has run.
    ///
    /// # Errors
    ///
    /// Fails with [`AcquireError::WrongThread`] if the caller thread does
    /// not own the acquisition.
    ///
    /// [`close`]: Acquisition::close
    fn is_unlocked(&self) -> Result<bool, AcquireError>;

    /// Verifies that the caller thread owns the acquisition and that the
    /// acquisition still holds its lock.
    ///
    /// Every operation of every guarded view runs this check before
    /// touching the underlying container.
    ///
    /// # Errors
    ///
    /// Fails with [`AcquireError::WrongThread`] if the caller thread does
    /// not own the acquisition and with [`AcquireError::AlreadyUnlocked`]
    /// if the acquisition has been closed.
    fn ensure_permitted_and_locked(&self) -> Result<(), AcquireError>;

    /// Returns the kind of access the acquisition currently grants.
    ///
    /// See [`AcquisitionType`] for the transient effect of upgrades.
    fn acquisition_type(&self) -> AcquisitionType;
}

mod sealed {
    pub trait Sealed {}
}

/// The registered heart of a root acquisition.
///
/// The registry of an acquirable maps thread identities to root cores; at
/// most one per thread exists at any time. Reused and upgraded acquisitions
/// share the root core of the acquisition they were created from.
pub(crate) struct RootCore {
    /// Identity of the thread that created the acquisition. Never changes.
    pub(crate) owner: usize,
    /// The kind of stamp taken at construction. Never changes; upgrades are
    /// tracked by the depth counter instead.
    pub(crate) base: AcquisitionType,
    /// Number of live upgraded acquisitions sharing this root. Only the
    /// owner thread mutates this.
    upgrade_depth: AtomicUsize,
    /// Set by close. Only the owner thread mutates this.
    unlocked: AtomicBool,
}

impl RootCore {
    pub(crate) fn new(owner: usize, base: AcquisitionType) -> Self {
        Self {
            owner,
            base,
            upgrade_depth: AtomicUsize::new(0),
            unlocked: AtomicBool::new(false),
        }
    }

    /// The kind of stamp the root currently holds.
    pub(crate) fn reported_type(&self) -> AcquisitionType {
        match self.base {
            AcquisitionType::Write => AcquisitionType::Write,
            AcquisitionType::Read if self.upgrade_depth.load(Relaxed) > 0 => AcquisitionType::Write,
            AcquisitionType::Read => AcquisitionType::Read,
        }
    }

    pub(crate) fn upgrade_depth(&self) -> usize {
        self.upgrade_depth.load(Relaxed)
    }

    pub(crate) fn begin_upgrade(&self) {
        self.upgrade_depth.fetch_add(1, Relaxed);
    }
}

#[derive(Copy, Clone, PartialEq)]
enum Variant {
    Root,
    Reused,
    Upgraded,
}

/// State shared by the two public acquisition types.
pub(crate) struct Inner<'a, S> {
    pub(crate) shared: &'a Shared<S>,
    pub(crate) root: Arc<RootCore>,
    variant: Variant,
    // Close flag of an upgraded acquisition. Roots track their state on the
    // root core; reused acquisitions have no lifecycle of their own.
    closed: Cell<bool>,
}

impl<'a, S> Inner<'a, S> {
    pub(crate) fn root(shared: &'a Shared<S>, root: Arc<RootCore>) -> Self {
        Self::new(shared, root, Variant::Root)
    }

    pub(crate) fn reused(shared: &'a Shared<S>, root: Arc<RootCore>) -> Self {
        Self::new(shared, root, Variant::Reused)
    }

    pub(crate) fn upgraded(shared: &'a Shared<S>, root: Arc<RootCore>) -> Self {
        Self::new(shared, root, Variant::Upgraded)
    }

    fn new(shared: &'a Shared<S>, root: Arc<RootCore>, variant: Variant) -> Self {
        Self {
            shared,
            root,
            variant,
            closed: Cell::new(false),
        }
    }

    fn check_owner(&self) -> Result<(), AcquireError> {
        if self.root.owner != owner_id() {
            return Err(AcquireError::WrongThread);
        }
        Ok(())
    }

    pub(crate) fn ensure_permitted_and_locked(&self) -> Result<(), AcquireError> {
        self.check_owner()?;
        let dead = match self.variant {
            Variant::Root | Variant::Reused => self.root.unlocked.load(Relaxed),
            Variant::Upgraded => self.closed.get() || self.root.unlocked.load(Relaxed),
        };
        if dead {
            return Err(AcquireError::AlreadyUnlocked);
        }
        Ok(())
    }

    pub(crate) fn is_unlocked(&self) -> Result<bool, AcquireError> {
        self.check_owner()?;
        Ok(match self.variant {
            Variant::Root => self.root.unlocked.load(Relaxed),
            Variant::Reused => true,
            Variant::Upgraded => self.closed.get(),
        })
    }

    pub(crate) fn acquisition_type(&self) -> AcquisitionType {
        self.root.reported_type()
    }

    pub(crate) fn close(&self) -> Result<(), AcquireError> {
        self.check_owner()?;
        match self.variant {
            Variant::Reused => {}
            Variant::Root => {
                if !self.root.unlocked.load(Relaxed) {
                    self.close_root();
                }
            }
            Variant::Upgraded => {
                if !self.closed.get() {
                    self.closed.set(true);
                    self.unwind_upgrade();
                }
            }
        }
        Ok(())
    }

    fn close_root(&self) {
        let depth = self.root.upgrade_depth();
        assert!(
            depth == 0,
            "acquisition closed while {depth} upgraded acquisition(s) created from it are live",
        );
        self.root.unlocked.store(true, Relaxed);
        let mut registry = self.shared.registry.lock();
        registry.remove(&self.root.owner);
        match self.root.base {
            AcquisitionType::Read => self.shared.lock.unlock_shared(),
            AcquisitionType::Write => self.shared.lock.unlock_exclusive(),
        }
        drop(registry);
    }

    fn unwind_upgrade(&self) {
        let depth = self.root.upgrade_depth();
        debug_assert!(depth > 0);
        self.root.upgrade_depth.store(depth - 1, Relaxed);
        if depth == 1 {
            // The outermost upgrade hands the write stamp back for a read
            // stamp. This cannot block.
            self.shared
                .lock
                .convert_exclusive_to_shared(self.root.owner);
        }
    }

    /// Close-on-drop. Acquisitions dropped on a foreign thread leak their
    /// stamp, since unlocking on behalf of the owner would break the
    /// ownership contract.
    fn drop_close(&self) {
        if self.root.owner == owner_id() {
            let _ = self.close();
        }
    }
}

macro_rules! acquisition_impls {
    ($ty:ident) => {
        impl<S> sealed::Sealed for $ty<'_, S> {}

        impl<S> Acquisition for $ty<'_, S> {
            fn close(&self) -> Result<(), AcquireError> {
                self.inner.close()
            }

            fn is_unlocked(&self) -> Result<bool, AcquireError> {
                self.inner.is_unlocked()
            }

            fn ensure_permitted_and_locked(&self) -> Result<(), AcquireError> {
                self.inner.ensure_permitted_and_locked()
            }

            fn acquisition_type(&self) -> AcquisitionType {
                self.inner.acquisition_type()
            }
        }

        impl<S> Drop for $ty<'_, S> {
            fn drop(&mut self) {
                self.inner.drop_close();
            }
        }

        impl<S> Debug for $ty<'_, S> {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("type", &self.inner.acquisition_type())
                    .finish_non_exhaustive()
            }
        }
    };
}

/// An acquisition that permits read operations.
///
/// Created by [`Acquirable::acquire_read`] and its non-blocking and timed
/// variants. The acquisition is pinned to the thread that created it; it
/// can be sent to another thread, but every operation there fails with
/// [`AcquireError::WrongThread`].
///
/// # Example
///
/// ```
/// use acquirable::{Acquirable, Acquisition, AcquisitionType};
///
/// let acquirable = Acquirable::new(5);
/// let acquisition = acquirable.acquire_read();
/// assert_eq!(acquisition.acquisition_type(), AcquisitionType::Read);
/// assert_eq!(acquisition.get(), Ok(5));
/// ```
///
/// [`Acquirable::acquire_read`]: crate::Acquirable::acquire_read
pub struct ReadAcquisition<'a, S> {
    pub(crate) inner: Inner<'a, S>,
}

/// An acquisition that permits read and write operations.
///
/// Created by [`Acquirable::acquire_write`] and its non-blocking and timed
/// variants. The acquisition is pinned to the thread that created it; it
/// can be sent to another thread, but every operation there fails with
/// [`AcquireError::WrongThread`].
///
/// # Example
///
/// ```
/// use acquirable::{Acquirable, Acquisition, AcquisitionType};
///
/// let acquirable = Acquirable::new(5);
/// let acquisition = acquirable.acquire_write().unwrap();
/// assert_eq!(acquisition.acquisition_type(), AcquisitionType::Write);
/// acquisition.set(6).unwrap();
/// assert_eq!(acquisition.get(), Ok(6));
/// ```
///
/// [`Acquirable::acquire_write`]: crate::Acquirable::acquire_write
pub struct WriteAcquisition<'a, S> {
    pub(crate) inner: Inner<'a, S>,
}

acquisition_impls!(ReadAcquisition);
acquisition_impls!(WriteAcquisition);

assert_impl_all!(ReadAcquisition<'static, i32>: Send);
assert_impl_all!(WriteAcquisition<'static, i32>: Send);
assert_not_impl_any!(ReadAcquisition<'static, i32>: Sync);
assert_not_impl_any!(WriteAcquisition<'static, i32>: Sync);

impl<S> ReadAcquisition<'_, S>
where
    S: Clone,
{
    /// Returns a clone of the protected value.
    ///
    /// # Errors
    ///
    /// Fails if the caller thread does not own the acquisition or if the
    /// acquisition has been closed.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new("x".to_string());
    /// let acquisition = acquirable.acquire_read();
    /// assert_eq!(acquisition.get().unwrap(), "x");
    /// ```
    pub fn get(&self) -> Result<S, AcquireError> {
        self.inner.ensure_permitted_and_locked()?;
        Ok(self.inner.shared.with_state(|state| state.clone()))
    }
}

impl<S> WriteAcquisition<'_, S> {
    /// Returns a clone of the protected value.
    ///
    /// # Errors
    ///
    /// Fails if the caller thread does not own the acquisition or if the
    /// acquisition has been closed.
    pub fn get(&self) -> Result<S, AcquireError>
    where
        S: Clone,
    {
        self.inner.ensure_permitted_and_locked()?;
        Ok(self.inner.shared.with_state(|state| state.clone()))
    }

    /// Stores a new value.
    ///
    /// # Errors
    ///
    /// Fails if the caller thread does not own the acquisition or if the
    /// acquisition has been closed.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new(0);
    /// let acquisition = acquirable.acquire_write().unwrap();
    /// acquisition.set(42).unwrap();
    /// assert_eq!(acquisition.get(), Ok(42));
    /// ```
    pub fn set(&self, value: S) -> Result<(), AcquireError> {
        self.inner.ensure_permitted_and_locked()?;
        self.inner.shared.with_state_mut(|state| *state = value);
        Ok(())
    }
}
