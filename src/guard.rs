//! Guarded views over protected containers.
//!
//! A guarded view pairs a container held by an [`Acquirable`] with the
//! acquisition it was obtained from. Every operation of every view first
//! runs [`Acquisition::ensure_permitted_and_locked`] and only then touches
//! the container, so a view obtained from an acquisition becomes unusable
//! the moment that acquisition is closed. Views produced by views
//! (iterators, sub-lists, key and value projections, map entries) are bound
//! to the same acquisition and fail the same way.
//!
//! Views borrow their acquisition and therefore cannot outlive it or leave
//! the thread that owns it.
//!
//! [`Acquirable`]: crate::Acquirable
//! [`Acquisition::ensure_permitted_and_locked`]:
//! crate::Acquisition::ensure_permitted_and_locked

pub use {
    list::{GuardedList, GuardedListIter, GuardedListMut},
    map::{
        GuardedEntries, GuardedEntriesMut, GuardedEntry, GuardedEntryMut, GuardedKeys,
        GuardedMap, GuardedMapMut, GuardedValues,
    },
    set::{GuardedSet, GuardedSetIter, GuardedSetMut},
};

mod list;
mod map;
mod set;
