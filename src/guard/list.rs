use {
    crate::{
        acquisition::{Inner, ReadAcquisition, WriteAcquisition},
        error::AcquireError,
    },
    std::ops::{Deref, Range},
};


impl<'a, E> ReadAcquisition<'a, Vec<E>> {
    /// Returns the guarded read-only view of the protected list.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new(vec![1, 2, 3]);
    /// let acquisition = acquirable.acquire_read();
    /// let view = acquisition.view();
    /// assert_eq!(view.len(), Ok(3));
    /// assert_eq!(view.get(1), Ok(Some(2)));
    /// ```
    pub fn view(&self) -> GuardedList<'_, E> {
        GuardedList {
            acq: &self.inner,
            bounds: None,
        }
    }
}

impl<'a, E> WriteAcquisition<'a, Vec<E>> {
    /// Returns the guarded mutable view of the protected list.
    ///
    /// The view derefs to the read-only view for all read operations.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new(Vec::new());
    /// let acquisition = acquirable.acquire_write().unwrap();
    /// let view = acquisition.view();
    /// view.push("a").unwrap();
    /// assert_eq!(view.len(), Ok(1));
    /// ```
    pub fn view(&self) -> GuardedListMut<'_, E> {
        GuardedListMut {
            view: GuardedList {
                acq: &self.inner,
                bounds: None,
            },
        }
    }
}

/// A guarded read-only view of a list.
///
/// Every operation verifies the acquisition before touching the list and
/// fails with [`AcquireError::AlreadyUnlocked`] once the acquisition has
/// been closed. Elements are returned as clones; no reference into the
/// list ever escapes the check.
pub struct GuardedList<'a, E> {
    acq: &'a Inner<'a, Vec<E>>,
    // Sub-list bounds; the whole list when absent. The bounds are clamped
    // to the live length at every operation, since the list can shrink
    // while a sub-list view is held.
    bounds: Option<(usize, usize)>,
}

impl<'a, E> GuardedList<'a, E> {
    fn check(&self) -> Result<(), AcquireError> {
        self.acq.ensure_permitted_and_locked()
    }

    /// The absolute element range this view covers for a list of `len`
    /// elements.
    fn span(&self, len: usize) -> (usize, usize) {
        match self.bounds {
            None => (0, len),
            Some((start, end)) => (start.min(len), end.min(len)),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> Result<usize, AcquireError> {
        self.check()?;
        Ok(self.acq.shared.with_state(|list| {
            let (start, end) = self.span(list.len());
            end - start
        }))
    }

    /// Returns whether the list contains no elements.
    pub fn is_empty(&self) -> Result<bool, AcquireError> {
        Ok(self.len()? == 0)
    }

    /// Returns a clone of the element at `index`, or `None` if the index is
    /// out of bounds.
    pub fn get(&self, index: usize) -> Result<Option<E>, AcquireError>
    where
        E: Clone,
    {
        self.check()?;
        Ok(self.acq.shared.with_state(|list| {
            let (start, end) = self.span(list.len());
            list[start..end].get(index).cloned()
        }))
    }

    /// Returns a clone of the first element.
    pub fn first(&self) -> Result<Option<E>, AcquireError>
    where
        E: Clone,
    {
        self.get(0)
    }

    /// Returns a clone of the last element.
    pub fn last(&self) -> Result<Option<E>, AcquireError>
    where
        E: Clone,
    {
        self.check()?;
        Ok(self.acq.shared.with_state(|list| {
            let (start, end) = self.span(list.len());
            list[start..end].last().cloned()
        }))
    }

    /// Returns whether the list contains `element`.
    pub fn contains(&self, element: &E) -> Result<bool, AcquireError>
    where
        E: PartialEq,
    {
        self.check()?;
        Ok(self.acq.shared.with_state(|list| {
            let (start, end) = self.span(list.len());
            list[start..end].contains(element)
        }))
    }

    /// Returns the index of the first occurrence of `element`.
    pub fn index_of(&self, element: &E) -> Result<Option<usize>, AcquireError>
    where
        E: PartialEq,
    {
        self.check()?;
        Ok(self.acq.shared.with_state(|list| {
            let (start, end) = self.span(list.len());
            list[start..end].iter().position(|e| e == element)
        }))
    }

    /// Returns a clone of the viewed elements.
    pub fn to_vec(&self) -> Result<Vec<E>, AcquireError>
    where
        E: Clone,
    {
        self.check()?;
        Ok(self.acq.shared.with_state(|list| {
            let (start, end) = self.span(list.len());
            list[start..end].to_vec()
        }))
    }

    /// Returns a guarded iterator over the viewed elements.
    ///
    /// The iterator is bound to the same acquisition as this view. It is
    /// live: elements pushed or removed while it is held are reflected in
    /// the remaining traversal. After the acquisition is closed, the next
    /// step reports [`AcquireError::AlreadyUnlocked`] and the iterator
    /// terminates.
    pub fn iter(&self) -> Result<GuardedListIter<'a, E>, AcquireError> {
        self.check()?;
        Ok(GuardedListIter {
            list: *self,
            front: 0,
            taken_back: 0,
            done: false,
        })
    }

    /// Returns a guarded view of the elements in `range`, relative to this
    /// view.
    ///
    /// Sub-list views are read-only. Their bounds are clamped to the live
    /// length of the list whenever an operation runs.
    ///
    /// # Panics
    ///
    /// Panics if the range's start is greater than its end.
    ///
    /// # Example
    ///
    /// ```
    /// use acquirable::Acquirable;
    ///
    /// let acquirable = Acquirable::new(vec![1, 2, 3, 4]);
    /// let acquisition = acquirable.acquire_read();
    /// let sub = acquisition.view().sub_list(1..3).unwrap();
    /// assert_eq!(sub.to_vec(), Ok(vec![2, 3]));
    /// ```
    pub fn sub_list(&self, range: Range<usize>) -> Result<GuardedList<'a, E>, AcquireError> {
        self.check()?;
        assert!(range.start <= range.end, "sub-list start is greater than end");
        let (base_start, base_end) = self.bounds.unwrap_or((0, usize::MAX));
        let start = base_start.saturating_add(range.start).min(base_end);
        let end = base_start.saturating_add(range.end).min(base_end);
        Ok(GuardedList {
            acq: self.acq,
            bounds: Some((start, end)),
        })
    }
}

impl<E> Clone for GuardedList<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for GuardedList<'_, E> {}

/// A guarded mutable view of a list.
///
/// Derefs to [`GuardedList`] for the read operations.
pub struct GuardedListMut<'a, E> {
    view: GuardedList<'a, E>,
}

impl<'a, E> GuardedListMut<'a, E> {
    /// Appends an element.
    pub fn push(&self, element: E) -> Result<(), AcquireError> {
        self.check()?;
        self.view.acq.shared.with_state_mut(|list| list.push(element));
        Ok(())
    }

    /// Removes and returns the last element.
    pub fn pop(&self) -> Result<Option<E>, AcquireError> {
        self.check()?;
        Ok(self.view.acq.shared.with_state_mut(|list| list.pop()))
    }

    /// Inserts an element at `index`, shifting later elements.
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than the length.
    pub fn insert(&self, index: usize, element: E) -> Result<(), AcquireError> {
        self.check()?;
        self.view
            .acq
            .shared
            .with_state_mut(|list| list.insert(index, element));
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting later elements.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&self, index: usize) -> Result<E, AcquireError> {
        self.check()?;
        Ok(self.view.acq.shared.with_state_mut(|list| list.remove(index)))
    }

    /// Replaces the element at `index` and returns the previous element.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&self, index: usize, element: E) -> Result<E, AcquireError> {
        self.check()?;
        Ok(self
            .view
            .acq
            .shared
            .with_state_mut(|list| std::mem::replace(&mut list[index], element)))
    }

    /// Removes all elements.
    pub fn clear(&self) -> Result<(), AcquireError> {
        self.check()?;
        self.view.acq.shared.with_state_mut(|list| list.clear());
        Ok(())
    }

    /// Shortens the list to `len` elements.
    pub fn truncate(&self, len: usize) -> Result<(), AcquireError> {
        self.check()?;
        self.view.acq.shared.with_state_mut(|list| list.truncate(len));
        Ok(())
    }

    /// Appends all elements of `elements`.
    pub fn extend<I>(&self, elements: I) -> Result<(), AcquireError>
    where
        I: IntoIterator<Item = E>,
    {
        self.check()?;
        // The iterator runs user code and must not run inside the state
        // borrow.
        let mut elements: Vec<E> = elements.into_iter().collect();
        self.view
            .acq
            .shared
            .with_state_mut(|list| list.append(&mut elements));
        Ok(())
    }
}

impl<'a, E> Deref for GuardedListMut<'a, E> {
    type Target = GuardedList<'a, E>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<E> Clone for GuardedListMut<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for GuardedListMut<'_, E> {}

/// A guarded iterator over a list view.
///
/// Yields clones of the elements. The first failed acquisition check is
/// reported as an `Err` item, after which the iterator terminates.
pub struct GuardedListIter<'a, E> {
    list: GuardedList<'a, E>,
    front: usize,
    taken_back: usize,
    done: bool,
}

impl<'a, E> GuardedListIter<'a, E>
where
    E: Clone,
{
    fn step(&mut self, back: bool) -> Option<Result<E, AcquireError>> {
        if self.done {
            return None;
        }
        if let Err(e) = self.list.check() {
            self.done = true;
            return Some(Err(e));
        }
        let view = self.list;
        let front_offset = self.front;
        let taken_back = self.taken_back;
        let next = view.acq.shared.with_state(|list| {
            let (start, end) = view.span(list.len());
            let front = start.saturating_add(front_offset).min(end);
            let back_end = end.saturating_sub(taken_back).max(front);
            if front == back_end {
                return None;
            }
            if back {
                Some(list[back_end - 1].clone())
            } else {
                Some(list[front].clone())
            }
        });
        match next {
            Some(element) => {
                if back {
                    self.taken_back += 1;
                } else {
                    self.front += 1;
                }
                Some(Ok(element))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl<'a, E> Iterator for GuardedListIter<'a, E>
where
    E: Clone,
{
    type Item = Result<E, AcquireError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step(false)
    }
}

impl<'a, E> DoubleEndedIterator for GuardedListIter<'a, E>
where
    E: Clone,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.step(true)
    }
}
