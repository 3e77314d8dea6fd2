use thiserror::Error;

/// Errors surfaced by acquisition and guarded-view operations.
///
/// Every operation that consults an acquisition can fail with one of these
/// kinds. None of them is recovered inside the crate; they always reach the
/// caller. Internal invariant violations, such as closing an acquisition
/// while upgraded acquisitions created from it are still live, are not
/// errors but panics.
///
/// # Example
///
/// ```
/// use acquirable::{AcquireError, Acquirable, Acquisition};
///
/// let acquirable = Acquirable::new(1);
/// let acquisition = acquirable.acquire_read();
/// acquisition.close().unwrap();
/// assert_eq!(acquisition.get(), Err(AcquireError::AlreadyUnlocked));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Error)]
pub enum AcquireError {
    /// The operation was invoked from a thread that does not own the
    /// acquisition, or a condition was used by a thread that does not hold
    /// the write lock.
    #[error("the caller thread does not own the acquisition")]
    WrongThread,
    /// The operation was invoked after the acquisition had been unlocked.
    #[error("the acquisition has already been unlocked")]
    AlreadyUnlocked,
    /// A read acquisition could not be upgraded because other read stamps
    /// or a write stamp prevented the conversion.
    #[error("the read stamp could not be converted to a write stamp")]
    UpgradeRefused,
}
