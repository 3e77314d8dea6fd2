//! This crate provides [`Acquirable`], a container for shared mutable state
//! that must be *acquired* before it can be read or mutated.
//!
//! # Motivation
//!
//! A read/write lock hands out guards whose lifetime is the only connection
//! between the guard and the protected data. Three patterns common in
//! systems with deep call stacks do not fit that model:
//!
//! 1. **Reentrance.** A function holding the lock calls a function that
//!    also wants the lock. With a plain lock this deadlocks or requires
//!    threading the guard through every call.
//! 2. **Upgrading.** A function reads the state, decides to mutate it, and
//!    wants to keep its read consistent across the transition.
//! 3. **Container views.** A function hands a protected collection to code
//!    that iterates it. The iterator must not outlive the lock, and with a
//!    plain lock nothing checks that at the iteration site.
//!
//! An [`Acquirable`] addresses all three. [`Acquirable::acquire_read`] and
//! [`Acquirable::acquire_write`] return *acquisitions*: capabilities bound
//! to the calling thread that hold a read or write stamp on the lock.
//! Acquiring again on the same thread returns a lightweight acquisition
//! that shares the outer stamp. Acquiring write while holding read converts
//! the stamp in place when the lock permits it. Containers are exposed
//! through [guarded views](guard) whose every operation re-verifies the
//! acquisition, so a leaked iterator fails loudly instead of observing
//! unprotected state.
//!
//! # Example
//!
//! ```
//! use {acquirable::Acquirable, std::collections::HashMap};
//!
//! let acquirable = Acquirable::new(HashMap::new());
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         let acquisition = acquirable.acquire_write().unwrap();
//!         acquisition.view().insert("a", 1).unwrap();
//!     });
//!     s.spawn(|| {
//!         let acquisition = acquirable.acquire_write().unwrap();
//!         acquisition.view().insert("b", 2).unwrap();
//!     });
//! });
//!
//! let acquisition = acquirable.acquire_read();
//! assert_eq!(acquisition.view().len(), Ok(2));
//! ```
//!
//! Upgrading a read acquisition:
//!
//! ```
//! use acquirable::{Acquirable, AcquireError};
//!
//! fn increment_if_small(acquirable: &Acquirable<i32>) -> Result<(), AcquireError> {
//!     let read = acquirable.acquire_read();
//!     if read.get()? < 10 {
//!         // Converts the read stamp to a write stamp in place. Fails with
//!         // UpgradeRefused if other threads also hold read acquisitions.
//!         let write = acquirable.acquire_write()?;
//!         write.set(write.get()? + 1)?;
//!     }
//!     Ok(())
//! }
//!
//! let acquirable = Acquirable::new(0);
//! increment_if_small(&acquirable).unwrap();
//! assert_eq!(acquirable.acquire_read().get(), Ok(1));
//! ```
//!
//! # Threading model
//!
//! Every acquisition is pinned to the thread that created it. Acquisitions
//! can be sent to other threads, but every operation there, including
//! close, fails with [`AcquireError::WrongThread`]. Guarded views borrow
//! their acquisition and cannot leave the owner thread at all. Dropping an
//! acquisition on its owner thread closes it; closing is also available
//! explicitly and is idempotent.

pub use {
    acquirable::Acquirable,
    acquisition::{Acquisition, AcquisitionType, ReadAcquisition, WriteAcquisition},
    condition::Condition,
    error::AcquireError,
};

mod acquirable;
mod acquisition;
mod condition;
mod error;
pub mod guard;
mod owner;
mod stamp;
pub mod value;
