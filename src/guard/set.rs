use {
    crate::{
        acquisition::{Inner, ReadAcquisition, WriteAcquisition},
        error::AcquireError,
    },
    std::{collections::HashSet, hash::Hash, ops::Deref},
};


impl<'a, E> ReadAcquisition<'a, HashSet<E>> {
    /// Returns the guarded read-only view of the protected set.
    ///
    /// # Example
    ///
    /// ```
    /// use {acquirable::Acquirable, std::collections::HashSet};
    ///
    /// let acquirable = Acquirable::new(HashSet::from(["a", "b"]));
    /// let acquisition = acquirable.acquire_read();
    /// let view = acquisition.view();
    /// assert_eq!(view.contains(&"a"), Ok(true));
    /// assert_eq!(view.len(), Ok(2));
    /// ```
    pub fn view(&self) -> GuardedSet<'_, E> {
        GuardedSet { acq: &self.inner }
    }
}

impl<'a, E> WriteAcquisition<'a, HashSet<E>> {
    /// Returns the guarded mutable view of the protected set.
    ///
    /// The view derefs to the read-only view for all read operations.
    pub fn view(&self) -> GuardedSetMut<'_, E> {
        GuardedSetMut {
            view: GuardedSet { acq: &self.inner },
        }
    }
}

/// A guarded read-only view of a set.
///
/// Every operation verifies the acquisition before touching the set and
/// fails with [`AcquireError::AlreadyUnlocked`] once the acquisition has
/// been closed. Elements are returned as clones.
pub struct GuardedSet<'a, E> {
    acq: &'a Inner<'a, HashSet<E>>,
}

impl<'a, E> GuardedSet<'a, E>
where
    E: Eq + Hash,
{
    fn check(&self) -> Result<(), AcquireError> {
        self.acq.ensure_permitted_and_locked()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> Result<usize, AcquireError> {
        self.check()?;
        Ok(self.acq.shared.with_state(|set| set.len()))
    }

    /// Returns whether the set contains no elements.
    pub fn is_empty(&self) -> Result<bool, AcquireError> {
        self.check()?;
        Ok(self.acq.shared.with_state(|set| set.is_empty()))
    }

    /// Returns whether the set contains `element`.
    pub fn contains(&self, element: &E) -> Result<bool, AcquireError> {
        self.check()?;
        Ok(self.acq.shared.with_state(|set| set.contains(element)))
    }

    /// Returns the elements as a vector, in arbitrary order.
    pub fn to_vec(&self) -> Result<Vec<E>, AcquireError>
    where
        E: Clone,
    {
        self.check()?;
        Ok(self.acq.shared.with_state(|set| set.iter().cloned().collect()))
    }

    /// Returns a guarded iterator over clones of the elements.
    ///
    /// The iterator snapshots the membership at creation time and re-checks
    /// each element against the live set, so elements removed while the
    /// iterator is held are skipped. After the acquisition is closed, the
    /// next step reports [`AcquireError::AlreadyUnlocked`] and the iterator
    /// terminates.
    pub fn iter(&self) -> Result<GuardedSetIter<'a, E>, AcquireError>
    where
        E: Clone,
    {
        self.check()?;
        let elements: Vec<E> = self.acq.shared.with_state(|set| set.iter().cloned().collect());
        Ok(GuardedSetIter {
            set: *self,
            elements: elements.into_iter(),
            done: false,
        })
    }
}

impl<E> Clone for GuardedSet<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for GuardedSet<'_, E> {}

/// A guarded mutable view of a set.
///
/// Derefs to [`GuardedSet`] for the read operations.
pub struct GuardedSetMut<'a, E> {
    view: GuardedSet<'a, E>,
}

impl<'a, E> GuardedSetMut<'a, E>
where
    E: Eq + Hash,
{
    /// Adds an element, returning whether it was newly added.
    pub fn insert(&self, element: E) -> Result<bool, AcquireError> {
        self.check()?;
        Ok(self.view.acq.shared.with_state_mut(|set| set.insert(element)))
    }

    /// Removes an element, returning whether it was present.
    pub fn remove(&self, element: &E) -> Result<bool, AcquireError> {
        self.check()?;
        Ok(self.view.acq.shared.with_state_mut(|set| set.remove(element)))
    }

    /// Removes all elements.
    pub fn clear(&self) -> Result<(), AcquireError> {
        self.check()?;
        self.view.acq.shared.with_state_mut(|set| set.clear());
        Ok(())
    }

    /// Adds all elements of `elements`.
    pub fn extend<I>(&self, elements: I) -> Result<(), AcquireError>
    where
        I: IntoIterator<Item = E>,
    {
        self.check()?;
        // The iterator runs user code and must not run inside the state
        // borrow.
        let elements: Vec<E> = elements.into_iter().collect();
        self.view.acq.shared.with_state_mut(|set| set.extend(elements));
        Ok(())
    }
}

impl<'a, E> Deref for GuardedSetMut<'a, E> {
    type Target = GuardedSet<'a, E>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<E> Clone for GuardedSetMut<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for GuardedSetMut<'_, E> {}

/// A guarded iterator over a set view.
///
/// The first failed acquisition check is reported as an `Err` item, after
/// which the iterator terminates.
pub struct GuardedSetIter<'a, E> {
    set: GuardedSet<'a, E>,
    elements: std::vec::IntoIter<E>,
    done: bool,
}

impl<'a, E> Iterator for GuardedSetIter<'a, E>
where
    E: Eq + Hash + Clone,
{
    type Item = Result<E, AcquireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.set.check() {
            self.done = true;
            return Some(Err(e));
        }
        let set = self.set;
        for element in self.elements.by_ref() {
            // Skip elements that were removed after the snapshot was taken.
            if set.acq.shared.with_state(|live| live.contains(&element)) {
                return Some(Ok(element));
            }
        }
        self.done = true;
        None
    }
}
