use {
    crate::{
        acquisition::{AcquisitionType, Inner, ReadAcquisition, RootCore, WriteAcquisition},
        condition::Condition,
        error::AcquireError,
        owner::owner_id,
        stamp::StampLock,
    },
    debug_fn::debug_fn,
    parking_lot::Mutex,
    run_on_drop::on_drop,
    static_assertions::assert_impl_all,
    std::{
        cell::UnsafeCell,
        collections::HashMap,
        fmt::{Debug, Formatter},
        sync::{
            Arc,
            atomic::{
                AtomicIsize,
                Ordering::{Acquire, Relaxed, Release},
            },
        },
        time::{Duration, Instant},
    },
};

#[cfg(test)]
mod tests;

/// A value protected by a read/write lock that must be acquired before the
/// value can be used.
///
/// # Motivation
///
/// A plain lock couples the lifetime of the protected data to the lifetime
/// of a guard. That model breaks down when code wants to
///
/// 1. re-acquire the same lock further down the call stack without
///    deadlocking,
/// 2. upgrade a read acquisition to a write acquisition in place, and
/// 3. hand out views of a protected container whose operations keep
///    verifying that the lock is still held.
///
/// An [`Acquirable`] supports all three. Calling [`acquire_read`] or
/// [`acquire_write`] produces an acquisition bound to the calling thread.
/// While the thread holds an acquisition, further acquire calls return
/// lightweight acquisitions that share the outer lock, and
/// [`acquire_write`] converts a held read stamp into a write stamp where
/// the lock permits it.
///
/// # Example
///
/// ```
/// use acquirable::Acquirable;
///
/// let acquirable = Acquirable::new(0);
/// std::thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| {
///             let acquisition = acquirable.acquire_write().unwrap();
///             let value = acquisition.get().unwrap();
///             acquisition.set(value + 1).unwrap();
///         });
///     }
/// });
/// assert_eq!(acquirable.acquire_read().get(), Ok(4));
/// ```
///
/// Containers are exposed through guarded views instead of `get`/`set`:
///
/// ```
/// use acquirable::Acquirable;
///
/// let acquirable = Acquirable::new(vec![1, 2]);
/// let acquisition = acquirable.acquire_write().unwrap();
/// let view = acquisition.view();
/// view.push(3).unwrap();
/// assert_eq!(view.to_vec(), Ok(vec![1, 2, 3]));
/// ```
///
/// Cloning an `Acquirable` is cheap and produces a handle to the same
/// protected value.
///
/// [`acquire_read`]: Acquirable::acquire_read
/// [`acquire_write`]: Acquirable::acquire_write
pub struct Acquirable<S> {
    shared: Arc<Shared<S>>,
}

pub(crate) struct Shared<S> {
    pub(crate) lock: StampLock,
    // We enforce the following invariants:
    // 1. the registry contains at most one entry per thread identity
    // 2. every entry is a root that holds a stamp of its base kind
    // 3. the stamp lock is never blocked on while the registry is locked;
    //    the non-blocking upgrade conversion is the only stamp operation
    //    that runs under it
    pub(crate) registry: Mutex<HashMap<usize, Arc<RootCore>>>,
    // Dynamic borrow state of `state`: n > 0 counts shared borrows, -1 is
    // an exclusive borrow. Detects reentrant state access from user code
    // running inside a borrow, such as a clone implementation that turns
    // around and mutates the same acquirable.
    borrows: AtomicIsize,
    state: UnsafeCell<S>,
}

// SAFETY: - The state cell is only accessed through with_state and
//           with_state_mut, whose callers hold a stamp of the matching
//           kind on `lock`.
//         - Multiple threads can hold shared stamps at the same time and
//           read the state concurrently, which requires S: Sync.
//         - The exclusive stamp is held by a single thread, so mutation
//           can be modeled as handing ownership to that thread, which
//           requires S: Send.
unsafe impl<S> Sync for Shared<S> where S: Send + Sync {}

impl<S> Shared<S> {
    /// Runs `f` with a shared borrow of the state.
    ///
    /// # Panics
    ///
    /// Panics if the state is currently borrowed exclusively. This can only
    /// happen when user code inside a mutation re-enters the acquirable.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        match self.try_with_state(f) {
            Some(r) => r,
            None => panic!(
                "state read while it is mutably borrowed; \
                 reentrant access from user code running inside a mutation?"
            ),
        }
    }

    pub(crate) fn try_with_state<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        let prev = self.borrows.fetch_add(1, Acquire);
        if prev < 0 {
            self.borrows.fetch_sub(1, Release);
            return None;
        }
        let _release = on_drop(|| {
            self.borrows.fetch_sub(1, Release);
        });
        // SAFETY: - The caller holds a stamp on `lock`, so no other thread
        //           can borrow the state exclusively.
        //         - The borrow counter is positive for the duration of `f`,
        //           so no exclusive borrow can be created on this thread
        //           either.
        Some(f(unsafe { &*self.state.get() }))
    }

    /// Runs `f` with an exclusive borrow of the state.
    ///
    /// # Panics
    ///
    /// Panics if the state is currently borrowed. This can only happen when
    /// user code inside a borrow re-enters the acquirable.
    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        if self.borrows.compare_exchange(0, -1, Acquire, Relaxed).is_err() {
            panic!(
                "state mutated while it is borrowed; \
                 reentrant access from user code running inside a borrow?"
            );
        }
        let _release = on_drop(|| {
            self.borrows.store(0, Release);
        });
        // SAFETY: - The caller holds the exclusive stamp on `lock`, so no
        //           other thread has any borrow of the state.
        //         - The borrow counter is -1 for the duration of `f`, so no
        //           further borrow can be created on this thread either.
        f(unsafe { &mut *self.state.get() })
    }
}

assert_impl_all!(Acquirable<i32>: Send, Sync);
assert_impl_all!(Acquirable<Vec<String>>: Send, Sync);

impl<S> Acquirable<S> {
    /// Creates an acquirable protecting `state`.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new(5);
    /// assert_eq!(acquirable.acquire_read().get(), Ok(5));
    /// ```
    pub fn new(state: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                lock: StampLock::new(),
                registry: Mutex::new(HashMap::new()),
                borrows: AtomicIsize::new(0),
                state: UnsafeCell::new(state),
            }),
        }
    }

    /// Acquires the protected state for reading, blocking while another
    /// thread holds a write acquisition.
    ///
    /// If the calling thread already holds an acquisition of this
    /// acquirable, the returned acquisition reuses it: no lock operation
    /// happens, closing the returned acquisition is a no-op, and the lock
    /// is released when the outer acquisition is closed.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::{Acquirable, Acquisition};
    ///
    /// let acquirable = Acquirable::new("x");
    /// let outer = acquirable.acquire_read();
    /// let inner = acquirable.acquire_read(); // reused, no second lock
    /// assert_eq!(inner.get(), Ok("x"));
    /// inner.close().unwrap(); // no-op
    /// assert_eq!(outer.get(), Ok("x"));
    /// ```
    pub fn acquire_read(&self) -> ReadAcquisition<'_, S> {
        if let Some(reused) = self.reuse_read() {
            return reused;
        }
        self.shared.lock.lock_shared();
        ReadAcquisition {
            inner: self.register_root(AcquisitionType::Read),
        }
    }

    /// Acquires the protected state for reading if doing so would not
    /// block.
    ///
    /// Reuse behaves as in [`acquire_read`]; a reused acquisition is always
    /// available.
    ///
    /// [`acquire_read`]: Acquirable::acquire_read
    pub fn try_acquire_read(&self) -> Option<ReadAcquisition<'_, S>> {
        if let Some(reused) = self.reuse_read() {
            return Some(reused);
        }
        if !self.shared.lock.try_lock_shared() {
            return None;
        }
        Some(ReadAcquisition {
            inner: self.register_root(AcquisitionType::Read),
        })
    }

    /// Acquires the protected state for reading, giving up after the
    /// timeout.
    pub fn try_acquire_read_for(&self, timeout: Duration) -> Option<ReadAcquisition<'_, S>> {
        self.try_acquire_read_until(Instant::now() + timeout)
    }

    /// Acquires the protected state for reading, giving up at the deadline.
    pub fn try_acquire_read_until(&self, deadline: Instant) -> Option<ReadAcquisition<'_, S>> {
        if let Some(reused) = self.reuse_read() {
            return Some(reused);
        }
        if !self.shared.lock.try_lock_shared_until(deadline) {
            return None;
        }
        Some(ReadAcquisition {
            inner: self.register_root(AcquisitionType::Read),
        })
    }

    /// Acquires the protected state for writing, blocking while other
    /// threads hold acquisitions.
    ///
    /// If the calling thread already holds a write acquisition, the
    /// returned acquisition reuses it as described on [`acquire_read`]. If
    /// it holds a read acquisition, the read stamp is converted into a
    /// write stamp in place: the held read acquisition reports
    /// [`AcquisitionType::Write`] until the returned acquisition is closed,
    /// and the conversion is undone when the last such upgrade is closed.
    ///
    /// # Errors
    ///
    /// Fails with [`AcquireError::UpgradeRefused`] if an upgrade is
    /// required but other read stamps exist. The conversion never blocks
    /// and is never performed in multiple steps, so a refused upgrade
    /// leaves the read acquisition untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::{Acquirable, Acquisition, AcquisitionType};
    ///
    /// let acquirable = Acquirable::new(0);
    /// let read = acquirable.acquire_read();
    /// let write = acquirable.acquire_write().unwrap(); // upgraded
    /// write.set(42).unwrap();
    /// assert_eq!(read.acquisition_type(), AcquisitionType::Write);
    /// assert_eq!(read.get(), Ok(42));
    /// write.close().unwrap();
    /// assert_eq!(read.acquisition_type(), AcquisitionType::Read);
    /// ```
    pub fn acquire_write(&self) -> Result<WriteAcquisition<'_, S>, AcquireError> {
        if let Some(acquisition) = self.reuse_write()? {
            return Ok(acquisition);
        }
        self.shared.lock.lock_exclusive(owner_id());
        Ok(WriteAcquisition {
            inner: self.register_root(AcquisitionType::Write),
        })
    }

    /// Acquires the protected state for writing if doing so would not
    /// block.
    ///
    /// Returns `None` both when the lock is contended and when an upgrade
    /// would be required but is refused.
    pub fn try_acquire_write(&self) -> Option<WriteAcquisition<'_, S>> {
        match self.reuse_write() {
            Ok(Some(acquisition)) => Some(acquisition),
            Err(_) => None,
            Ok(None) => {
                if !self.shared.lock.try_lock_exclusive(owner_id()) {
                    return None;
                }
                Some(WriteAcquisition {
                    inner: self.register_root(AcquisitionType::Write),
                })
            }
        }
    }

    /// Acquires the protected state for writing, giving up after the
    /// timeout.
    ///
    /// A refused upgrade returns `None` immediately; the timeout only
    /// applies to waiting for a fresh write stamp.
    pub fn try_acquire_write_for(&self, timeout: Duration) -> Option<WriteAcquisition<'_, S>> {
        self.try_acquire_write_until(Instant::now() + timeout)
    }

    /// Acquires the protected state for writing, giving up at the deadline.
    ///
    /// A refused upgrade returns `None` immediately; the deadline only
    /// applies to waiting for a fresh write stamp.
    pub fn try_acquire_write_until(&self, deadline: Instant) -> Option<WriteAcquisition<'_, S>> {
        match self.reuse_write() {
            Ok(Some(acquisition)) => Some(acquisition),
            Err(_) => None,
            Ok(None) => {
                if !self.shared.lock.try_lock_exclusive_until(deadline, owner_id()) {
                    return None;
                }
                Some(WriteAcquisition {
                    inner: self.register_root(AcquisitionType::Write),
                })
            }
        }
    }

    /// Returns whether any thread holds an acquisition of this acquirable.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new(1);
    /// assert!(!acquirable.is_locked());
    /// let acquisition = acquirable.acquire_read();
    /// assert!(acquirable.is_locked());
    /// drop(acquisition);
    /// assert!(!acquirable.is_locked());
    /// ```
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.shared.lock.is_locked()
    }

    /// Returns the kind of acquisition the calling thread currently holds
    /// of this acquirable, if any.
    ///
    /// The reported kind tracks upgrades: while a read acquisition is
    /// upgraded, this returns [`AcquisitionType::Write`].
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::{Acquirable, AcquisitionType};
    ///
    /// let acquirable = Acquirable::new(1);
    /// assert_eq!(acquirable.current_acquisition_type(), None);
    /// let _acquisition = acquirable.acquire_read();
    /// assert_eq!(
    ///     acquirable.current_acquisition_type(),
    ///     Some(AcquisitionType::Read),
    /// );
    /// ```
    pub fn current_acquisition_type(&self) -> Option<AcquisitionType> {
        let registry = self.shared.registry.lock();
        registry.get(&owner_id()).map(|root| root.reported_type())
    }

    /// Creates a condition of the write lock of this acquirable.
    ///
    /// See [`Condition`] for the waiting and signalling contract.
    pub fn new_condition(&self) -> Condition<'_> {
        Condition::new(&self.shared.lock)
    }

    /// Unwraps the protected state, consuming this handle.
    ///
    /// Fails and returns the handle if other handles to the same state
    /// exist.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new(5);
    /// assert_eq!(acquirable.into_inner(), Ok(5));
    /// ```
    pub fn into_inner(self) -> Result<S, Self> {
        match Arc::try_unwrap(self.shared) {
            Ok(shared) => Ok(shared.state.into_inner()),
            Err(shared) => Err(Self { shared }),
        }
    }

    /// Returns a mutable reference to the protected state without locking.
    ///
    /// This is possible only while no other handle to the same state
    /// exists.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let mut acquirable = Acquirable::new(5);
    /// *acquirable.get_mut().unwrap() = 6;
    /// assert_eq!(acquirable.acquire_read().get(), Ok(6));
    /// ```
    pub fn get_mut(&mut self) -> Option<&mut S> {
        Arc::get_mut(&mut self.shared).map(|shared| shared.state.get_mut())
    }

    fn reuse_read(&self) -> Option<ReadAcquisition<'_, S>> {
        let registry = self.shared.registry.lock();
        let root = registry.get(&owner_id())?.clone();
        drop(registry);
        Some(ReadAcquisition {
            inner: Inner::reused(&self.shared, root),
        })
    }

    /// Reuses or upgrades the calling thread's registered acquisition.
    /// `Ok(None)` means no acquisition is registered and a fresh stamp must
    /// be taken.
    fn reuse_write(&self) -> Result<Option<WriteAcquisition<'_, S>>, AcquireError> {
        let registry = self.shared.registry.lock();
        let Some(root) = registry.get(&owner_id()) else {
            return Ok(None);
        };
        let root = root.clone();
        let inner = match root.base {
            AcquisitionType::Write => Inner::reused(&self.shared, root),
            AcquisitionType::Read => {
                // The outermost upgrade converts the stamp; nested upgrades
                // only deepen the counter. The conversion may not block
                // while the registry is locked.
                if root.upgrade_depth() == 0
                    && !self.shared.lock.try_convert_shared_to_exclusive(root.owner)
                {
                    return Err(AcquireError::UpgradeRefused);
                }
                root.begin_upgrade();
                Inner::upgraded(&self.shared, root)
            }
        };
        drop(registry);
        Ok(Some(WriteAcquisition { inner }))
    }

    fn register_root(&self, base: AcquisitionType) -> Inner<'_, S> {
        let root = Arc::new(RootCore::new(owner_id(), base));
        let mut registry = self.shared.registry.lock();
        let _prev = registry.insert(root.owner, root.clone());
        debug_assert!(_prev.is_none());
        drop(registry);
        Inner::root(&self.shared, root)
    }

    pub(crate) fn addr(&self) -> *const u8 {
        Arc::as_ptr(&self.shared).cast()
    }
}

impl<S> Clone for Acquirable<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S> Default for Acquirable<S>
where
    S: Default,
{
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> PartialEq for Acquirable<S> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<S> Eq for Acquirable<S> {}

impl<S> Debug for Acquirable<S>
where
    S: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquirable")
            .field("id", &self.addr())
            .field(
                "state",
                &debug_fn(|fmt| {
                    if !self.shared.lock.try_lock_shared() {
                        return fmt.write_str("<locked>");
                    }
                    let _unlock = on_drop(|| self.shared.lock.unlock_shared());
                    match self.shared.try_with_state(|state| Debug::fmt(state, fmt)) {
                        Some(result) => result,
                        None => fmt.write_str("<borrowed>"),
                    }
                }),
            )
            .finish_non_exhaustive()
    }
}
