use {
    parking_lot::{Condvar, Mutex},
    std::time::Instant,
};


/// A read/write lock whose acquisitions behave like stamps: a shared stamp
/// can be converted into an exclusive stamp without unlocking, and an
/// exclusive stamp can be converted back.
///
/// The lock does not block inside conversions. Converting shared to
/// exclusive succeeds only if the caller holds the sole shared stamp and no
/// exclusive stamp exists; otherwise the conversion is refused and the
/// caller keeps its shared stamp. Converting exclusive to shared always
/// succeeds.
///
/// The lock tracks the identity of the exclusive holder so that condition
/// waits can verify that the caller actually holds the exclusive stamp.
pub(crate) struct StampLock {
    // We enforce the following invariants:
    // 1. if writer != 0, then readers == 0 and the thread with that identity
    //    holds the exclusive stamp
    // 2. readers is the number of live shared stamps
    state: Mutex<State>,
    // Threads waiting for a shared stamp. Woken when the exclusive stamp is
    // released or converted to a shared stamp.
    readers: Condvar,
    // Threads waiting for an exclusive stamp. Woken when the lock becomes
    // free.
    writers: Condvar,
}

struct State {
    readers: usize,
    writer: usize,
}

/// Returned by the condition operations when the caller does not hold the
/// exclusive stamp.
pub(crate) struct NotWriter;

impl StampLock {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                readers: 0,
                writer: 0,
            }),
            readers: Condvar::new(),
            writers: Condvar::new(),
        }
    }

    /// Acquires a shared stamp, blocking while an exclusive stamp exists.
    pub(crate) fn lock_shared(&self) {
        let mut state = self.state.lock();
        while state.writer != 0 {
            self.readers.wait(&mut state);
        }
        state.readers += 1;
    }

    /// Acquires a shared stamp if no exclusive stamp exists.
    pub(crate) fn try_lock_shared(&self) -> bool {
        let mut state = self.state.lock();
        if state.writer != 0 {
            return false;
        }
        state.readers += 1;
        true
    }

    /// Acquires a shared stamp, blocking until the deadline.
    pub(crate) fn try_lock_shared_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while state.writer != 0 {
            if self.readers.wait_until(&mut state, deadline).timed_out() {
                if state.writer != 0 {
                    return false;
                }
                break;
            }
        }
        state.readers += 1;
        true
    }

    /// Releases a shared stamp.
    pub(crate) fn unlock_shared(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers > 0);
        state.readers -= 1;
        let wake = state.readers == 0;
        drop(state);
        if wake {
            self.writers.notify_one();
        }
    }

    /// Acquires the exclusive stamp for `owner`, blocking while any other
    /// stamp exists.
    pub(crate) fn lock_exclusive(&self, owner: usize) {
        let mut state = self.state.lock();
        while state.writer != 0 || state.readers > 0 {
            self.writers.wait(&mut state);
        }
        state.writer = owner;
    }

    /// Acquires the exclusive stamp for `owner` if the lock is free.
    pub(crate) fn try_lock_exclusive(&self, owner: usize) -> bool {
        let mut state = self.state.lock();
        if state.writer != 0 || state.readers > 0 {
            return false;
        }
        state.writer = owner;
        true
    }

    /// Acquires the exclusive stamp for `owner`, blocking until the
    /// deadline.
    pub(crate) fn try_lock_exclusive_until(&self, deadline: Instant, owner: usize) -> bool {
        let mut state = self.state.lock();
        while state.writer != 0 || state.readers > 0 {
            if self.writers.wait_until(&mut state, deadline).timed_out() {
                if state.writer != 0 || state.readers > 0 {
                    return false;
                }
                break;
            }
        }
        state.writer = owner;
        true
    }

    /// Releases the exclusive stamp.
    pub(crate) fn unlock_exclusive(&self) {
        let mut state = self.state.lock();
        debug_assert_ne!(state.writer, 0);
        debug_assert_eq!(state.readers, 0);
        state.writer = 0;
        drop(state);
        self.writers.notify_one();
        self.readers.notify_all();
    }

    /// Converts the caller's shared stamp into the exclusive stamp.
    ///
    /// Succeeds only if the caller holds the sole shared stamp and no
    /// exclusive stamp exists. On failure the caller keeps its shared stamp
    /// untouched; the lock never enters an intermediate unlocked state.
    pub(crate) fn try_convert_shared_to_exclusive(&self, owner: usize) -> bool {
        let mut state = self.state.lock();
        if state.readers != 1 || state.writer != 0 {
            return false;
        }
        state.readers = 0;
        state.writer = owner;
        true
    }

    /// Converts the exclusive stamp held by `owner` back into a shared
    /// stamp.
    ///
    /// # Panics
    ///
    /// Panics if `owner` does not hold the exclusive stamp. The lock state
    /// is inconsistent in that case and there is nothing sensible left to
    /// do.
    pub(crate) fn convert_exclusive_to_shared(&self, owner: usize) {
        let mut state = self.state.lock();
        assert!(
            state.writer == owner && state.readers == 0,
            "exclusive stamp conversion failed: the stamp is not held by the caller",
        );
        state.writer = 0;
        state.readers = 1;
        drop(state);
        self.readers.notify_all();
    }

    /// Returns whether any stamp exists.
    pub(crate) fn is_locked(&self) -> bool {
        let state = self.state.lock();
        state.writer != 0 || state.readers > 0
    }

    /// Releases the exclusive stamp held by `owner`, waits on `cv`, and
    /// re-acquires the exclusive stamp before returning.
    ///
    /// Returns whether the deadline elapsed before a notification arrived.
    /// The exclusive stamp is re-acquired even after a timeout.
    pub(crate) fn condition_wait(
        &self,
        cv: &Condvar,
        owner: usize,
        deadline: Option<Instant>,
    ) -> Result<bool, NotWriter> {
        let mut state = self.state.lock();
        if state.writer != owner {
            return Err(NotWriter);
        }
        // Hand the stamp back while waiting so that signalling threads can
        // acquire it.
        state.writer = 0;
        self.writers.notify_one();
        self.readers.notify_all();
        let timed_out = match deadline {
            None => {
                cv.wait(&mut state);
                false
            }
            Some(deadline) => cv.wait_until(&mut state, deadline).timed_out(),
        };
        while state.writer != 0 || state.readers > 0 {
            self.writers.wait(&mut state);
        }
        state.writer = owner;
        Ok(timed_out)
    }

    /// Notifies waiters of `cv`. The caller must hold the exclusive stamp.
    pub(crate) fn condition_notify(
        &self,
        cv: &Condvar,
        owner: usize,
        all: bool,
    ) -> Result<(), NotWriter> {
        let state = self.state.lock();
        if state.writer != owner {
            return Err(NotWriter);
        }
        if all {
            cv.notify_all();
        } else {
            cv.notify_one();
        }
        Ok(())
    }
}
