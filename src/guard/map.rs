use {
    crate::{
        acquisition::{Inner, ReadAcquisition, WriteAcquisition},
        error::AcquireError,
    },
    std::{collections::HashMap, hash::Hash, ops::Deref},
};


impl<'a, K, V> ReadAcquisition<'a, HashMap<K, V>> {
    /// Returns the guarded read-only view of the protected map.
    ///
    /// # Example
    ///
    /// ```
    /// use {acquirable::Acquirable, std::collections::HashMap};
    ///
    /// let acquirable = Acquirable::new(HashMap::from([("k", 1)]));
    /// let acquisition = acquirable.acquire_read();
    /// let view = acquisition.view();
    /// assert_eq!(view.get(&"k"), Ok(Some(1)));
    /// ```
    pub fn view(&self) -> GuardedMap<'_, K, V> {
        GuardedMap { acq: &self.inner }
    }
}

impl<'a, K, V> WriteAcquisition<'a, HashMap<K, V>> {
    /// Returns the guarded mutable view of the protected map.
    ///
    /// The view derefs to the read-only view for all read operations.
    pub fn view(&self) -> GuardedMapMut<'_, K, V> {
        GuardedMapMut {
            view: GuardedMap { acq: &self.inner },
        }
    }
}

/// A guarded read-only view of a map.
///
/// Every operation verifies the acquisition before touching the map and
/// fails with [`AcquireError::AlreadyUnlocked`] once the acquisition has
/// been closed. Keys and values are returned as clones.
pub struct GuardedMap<'a, K, V> {
    acq: &'a Inner<'a, HashMap<K, V>>,
}

impl<'a, K, V> GuardedMap<'a, K, V>
where
    K: Eq + Hash,
{
    fn check(&self) -> Result<(), AcquireError> {
        self.acq.ensure_permitted_and_locked()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> Result<usize, AcquireError> {
        self.check()?;
        Ok(self.acq.shared.with_state(|map| map.len()))
    }

    /// Returns whether the map contains no entries.
    pub fn is_empty(&self) -> Result<bool, AcquireError> {
        self.check()?;
        Ok(self.acq.shared.with_state(|map| map.is_empty()))
    }

    /// Returns whether the map contains `key`.
    pub fn contains_key(&self, key: &K) -> Result<bool, AcquireError> {
        self.check()?;
        Ok(self.acq.shared.with_state(|map| map.contains_key(key)))
    }

    /// Returns a clone of the value mapped to `key`.
    pub fn get(&self, key: &K) -> Result<Option<V>, AcquireError>
    where
        V: Clone,
    {
        self.check()?;
        Ok(self.acq.shared.with_state(|map| map.get(key).cloned()))
    }

    /// Returns a guarded iterator over clones of the keys.
    ///
    /// The iterator snapshots the key set at creation time and re-checks
    /// each key against the live map, so keys removed while the iterator is
    /// held are skipped. After the acquisition is closed, the next step
    /// reports [`AcquireError::AlreadyUnlocked`] and the iterator
    /// terminates.
    pub fn keys(&self) -> Result<GuardedKeys<'a, K, V>, AcquireError>
    where
        K: Clone,
    {
        Ok(GuardedKeys {
            keys: self.key_cursor()?,
        })
    }

    /// Returns a guarded iterator over clones of the values.
    ///
    /// Key liveness is handled as in [`keys`]; the values themselves are
    /// looked up in the live map, so a value replaced while the iterator is
    /// held is yielded in its current form.
    ///
    /// [`keys`]: GuardedMap::keys
    pub fn values(&self) -> Result<GuardedValues<'a, K, V>, AcquireError>
    where
        K: Clone,
    {
        Ok(GuardedValues {
            keys: self.key_cursor()?,
        })
    }

    /// Returns a guarded iterator over the entries.
    ///
    /// Every yielded [`GuardedEntry`] is itself bound to the acquisition of
    /// this view: its operations re-run the acquisition check and fail once
    /// the acquisition has been closed, even if the entry object is kept
    /// alive beyond it.
    pub fn entries(&self) -> Result<GuardedEntries<'a, K, V>, AcquireError>
    where
        K: Clone,
    {
        Ok(GuardedEntries {
            keys: self.key_cursor()?,
        })
    }

    fn key_cursor(&self) -> Result<KeyCursor<'a, K, V>, AcquireError>
    where
        K: Clone,
    {
        self.check()?;
        let keys: Vec<K> = self.acq.shared.with_state(|map| map.keys().cloned().collect());
        Ok(KeyCursor {
            map: *self,
            keys: keys.into_iter(),
            done: false,
        })
    }
}

impl<K, V> Clone for GuardedMap<'_, K, V> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for GuardedMap<'_, K, V> {}

/// A guarded mutable view of a map.
///
/// Derefs to [`GuardedMap`] for the read operations.
pub struct GuardedMapMut<'a, K, V> {
    view: GuardedMap<'a, K, V>,
}

impl<'a, K, V> GuardedMapMut<'a, K, V>
where
    K: Eq + Hash,
{
    /// Maps `key` to `value`, returning the previously mapped value.
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>, AcquireError> {
        self.check()?;
        Ok(self
            .view
            .acq
            .shared
            .with_state_mut(|map| map.insert(key, value)))
    }

    /// Removes the mapping of `key`, returning the mapped value.
    pub fn remove(&self, key: &K) -> Result<Option<V>, AcquireError> {
        self.check()?;
        Ok(self.view.acq.shared.with_state_mut(|map| map.remove(key)))
    }

    /// Removes all entries.
    pub fn clear(&self) -> Result<(), AcquireError> {
        self.check()?;
        self.view.acq.shared.with_state_mut(|map| map.clear());
        Ok(())
    }

    /// Adds all entries of `entries`, replacing existing mappings.
    pub fn extend<I>(&self, entries: I) -> Result<(), AcquireError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.check()?;
        // The iterator runs user code and must not run inside the state
        // borrow.
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        self.view.acq.shared.with_state_mut(|map| map.extend(entries));
        Ok(())
    }

    /// Returns a guarded iterator over the entries whose entry objects also
    /// permit replacing the mapped value.
    pub fn entries_mut(&self) -> Result<GuardedEntriesMut<'a, K, V>, AcquireError>
    where
        K: Clone,
    {
        Ok(GuardedEntriesMut {
            keys: self.view.key_cursor()?,
        })
    }
}

impl<'a, K, V> Deref for GuardedMapMut<'a, K, V> {
    type Target = GuardedMap<'a, K, V>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<K, V> Clone for GuardedMapMut<'_, K, V> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for GuardedMapMut<'_, K, V> {}

/// A guarded view of a single map entry.
///
/// Produced by [`GuardedMap::entries`]. The entry is bound to the same
/// acquisition as the view that produced it; [`key`] and [`value`] fail
/// with [`AcquireError::AlreadyUnlocked`] once that acquisition has been
/// closed.
///
/// [`key`]: GuardedEntry::key
/// [`value`]: GuardedEntry::value
pub struct GuardedEntry<'a, K, V> {
    map: GuardedMap<'a, K, V>,
    key: K,
}

impl<'a, K, V> GuardedEntry<'a, K, V>
where
    K: Eq + Hash,
{
    /// Returns a clone of the entry's key.
    pub fn key(&self) -> Result<K, AcquireError>
    where
        K: Clone,
    {
        self.map.check()?;
        Ok(self.key.clone())
    }

    /// Returns a clone of the value currently mapped to the entry's key,
    /// or `None` if the mapping has been removed since the entry was
    /// produced.
    pub fn value(&self) -> Result<Option<V>, AcquireError>
    where
        V: Clone,
    {
        self.map.check()?;
        Ok(self
            .map
            .acq
            .shared
            .with_state(|map| map.get(&self.key).cloned()))
    }
}

/// A guarded view of a single map entry that permits replacing the mapped
/// value.
///
/// Produced by [`GuardedMapMut::entries_mut`]. Derefs to [`GuardedEntry`]
/// for the read operations.
pub struct GuardedEntryMut<'a, K, V> {
    entry: GuardedEntry<'a, K, V>,
}

impl<'a, K, V> GuardedEntryMut<'a, K, V>
where
    K: Eq + Hash,
{
    /// Maps the entry's key to `value`, returning the previously mapped
    /// value. Re-creates the mapping if it has been removed since the entry
    /// was produced.
    pub fn set_value(&self, value: V) -> Result<Option<V>, AcquireError>
    where
        K: Clone,
    {
        self.entry.map.check()?;
        let key = self.entry.key.clone();
        Ok(self
            .entry
            .map
            .acq
            .shared
            .with_state_mut(|map| map.insert(key, value)))
    }
}

impl<'a, K, V> Deref for GuardedEntryMut<'a, K, V> {
    type Target = GuardedEntry<'a, K, V>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}

/// Shared cursor of the map iterators: a snapshot of the keys, stepped
/// against the live map.
struct KeyCursor<'a, K, V> {
    map: GuardedMap<'a, K, V>,
    keys: std::vec::IntoIter<K>,
    done: bool,
}

impl<'a, K, V> KeyCursor<'a, K, V>
where
    K: Eq + Hash,
{
    /// Yields the next snapshot key that is still present in the map.
    fn next_live(&mut self) -> Option<Result<K, AcquireError>> {
        if self.done {
            return None;
        }
        if let Err(e) = self.map.check() {
            self.done = true;
            return Some(Err(e));
        }
        let map = self.map;
        for key in self.keys.by_ref() {
            if map.acq.shared.with_state(|live| live.contains_key(&key)) {
                return Some(Ok(key));
            }
        }
        self.done = true;
        None
    }
}

/// A guarded iterator over the keys of a map view.
///
/// The first failed acquisition check is reported as an `Err` item, after
/// which the iterator terminates.
pub struct GuardedKeys<'a, K, V> {
    keys: KeyCursor<'a, K, V>,
}

impl<'a, K, V> Iterator for GuardedKeys<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = Result<K, AcquireError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.keys.next_live()
    }
}

/// A guarded iterator over the values of a map view.
///
/// The first failed acquisition check is reported as an `Err` item, after
/// which the iterator terminates.
pub struct GuardedValues<'a, K, V> {
    keys: KeyCursor<'a, K, V>,
}

impl<'a, K, V> Iterator for GuardedValues<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    type Item = Result<V, AcquireError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = match self.keys.next_live()? {
                Ok(key) => key,
                Err(e) => return Some(Err(e)),
            };
            let map = self.keys.map;
            let value = map.acq.shared.with_state(|live| live.get(&key).cloned());
            if let Some(value) = value {
                return Some(Ok(value));
            }
        }
    }
}

/// A guarded iterator over the entries of a map view, yielding
/// [`GuardedEntry`] objects.
///
/// The first failed acquisition check is reported as an `Err` item, after
/// which the iterator terminates.
pub struct GuardedEntries<'a, K, V> {
    keys: KeyCursor<'a, K, V>,
}

impl<'a, K, V> Iterator for GuardedEntries<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = Result<GuardedEntry<'a, K, V>, AcquireError>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = match self.keys.next_live()? {
            Ok(key) => key,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(GuardedEntry {
            map: self.keys.map,
            key,
        }))
    }
}

/// A guarded iterator over the entries of a mutable map view, yielding
/// [`GuardedEntryMut`] objects.
///
/// The first failed acquisition check is reported as an `Err` item, after
/// which the iterator terminates.
pub struct GuardedEntriesMut<'a, K, V> {
    keys: KeyCursor<'a, K, V>,
}

impl<'a, K, V> Iterator for GuardedEntriesMut<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = Result<GuardedEntryMut<'a, K, V>, AcquireError>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = match self.keys.next_live()? {
            Ok(key) => key,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(GuardedEntryMut {
            entry: GuardedEntry {
                map: self.keys.map,
                key,
            },
        }))
    }
}
