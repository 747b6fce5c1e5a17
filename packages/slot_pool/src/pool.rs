use std::any::type_name;
use std::{fmt, mem, ptr, thread};

use tracing::{debug, trace};

use crate::error::Result;
use crate::{CreateError, DropPolicy, Error, Handle, SlotPoolBuilder, SlotRef};

/// A fixed-capacity object pool holding up to `N` items of type `T`.
///
/// Storage for all `N` slots is reserved once, when the pool is built. After that the pool never
/// allocates, grows or moves its slots: creating an item fills a free slot in place and destroying
/// an item returns its slot to the free list for reuse.
///
/// There are multiple ways to create items in the pool:
///
/// * [`create()`][1] - creates an item and returns its [`Handle`]. This is the simplest way to add
///   an item but requires you to later look it up by the handle.
/// * [`create_mut()`][2] - also returns an exclusive reference to the new item.
/// * [`begin_create().create()`][3] - lets you obtain the handle in advance through
///   [`handle()`][4], which may be useful if the item needs to know its own handle. Abandoning the
///   creator leaves the pool untouched, so fallible construction can happen in between.
/// * [`try_create_with()`][5] - runs a fallible constructor that receives the handle.
///
/// # Handles
///
/// Every item is identified by a [`Handle`] that combines the slot index with a generation
/// counter. Once an item is destroyed, its handle is rejected by [`get()`][6], [`destroy()`][7]
/// and friends, even after the slot is reused by another item. The generation is a `u64` that
/// wraps around, so a stale handle could only match again after 2^64 reuses of the same slot.
///
/// # Failure modes
///
/// Operations never panic on bad input. A full pool yields [`Error::CapacityExhausted`] and a
/// handle, index or reference that does not identify a live item yields [`Error::EmptySlot`].
/// In both cases the pool is left unchanged.
///
/// # Thread safety
///
/// The pool has no internal synchronization. It is `Send`/`Sync` whenever `T` is, and all mutation
/// requires `&mut self`, so sharing between threads requires an external lock such as a `Mutex`.
///
/// [1]: Self::create
/// [2]: Self::create_mut
/// [3]: SlotCreator::create
/// [4]: SlotCreator::handle
/// [5]: Self::try_create_with
/// [6]: Self::get
/// [7]: Self::destroy
pub struct SlotPool<T, const N: usize> {
    /// Exactly `N` slots, allocated once in the constructor and never resized.
    slots: Box<[Slot<T>]>,

    /// Index of the next free slot. Think of this as a virtual stack of the most recently freed
    /// slots, with the stack entries stored in the vacant slots themselves (intrusive freelist).
    /// This is `N` if the pool is full.
    next_free_index: usize,

    /// The number of occupied slots.
    count: usize,

    drop_policy: DropPolicy,
}

#[derive(Debug)]
struct Slot<T> {
    /// Incremented every time the occupant of the slot is removed.
    generation: u64,

    entry: Entry<T>,
}

#[derive(Debug)]
enum Entry<T> {
    Occupied { value: T },

    Vacant { next_free_index: usize },
}

impl<T, const N: usize> SlotPool<T, N> {
    #[must_use]
    pub(crate) fn new_inner(drop_policy: DropPolicy) -> Self {
        // Initialize all slots to `Vacant`, each pointing at the next one. For the last slot this
        // points out of bounds, which means the pool is full once that slot is taken.
        let slots = (0..N)
            .map(|index| Slot {
                generation: 0,
                entry: Entry::Vacant {
                    next_free_index: index
                        .checked_add(1)
                        .expect("index < N so it cannot be usize::MAX"),
                },
            })
            .collect::<Box<[_]>>();

        Self {
            slots,
            next_free_index: 0,
            count: 0,
            drop_policy,
        }
    }

    /// Creates a new [`SlotPool`] with the default configuration.
    ///
    /// All `N` slots start out free.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String, 4>::new();
    ///
    /// assert_eq!(pool.count(), 0);
    /// assert_eq!(pool.capacity(), 4);
    ///
    /// let handle = pool.create("Hello".to_string()).unwrap();
    /// assert_eq!(pool.count(), 1);
    /// assert_eq!(pool.get(handle).unwrap(), "Hello");
    /// ```
    ///
    /// A pool with `N == 0` is valid and simply always full.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`SlotPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{DropPolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u32, 8>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder() -> SlotPoolBuilder<T, N> {
        SlotPoolBuilder::new()
    }

    /// The number of live items in the pool.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The fixed number of slots in the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        N
    }

    /// Whether the pool holds no live items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether every slot is occupied, so the next create will fail.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.next_free_index >= N
    }

    /// Creates an item in a free slot and returns its handle.
    ///
    /// Callers must not depend on which free slot is chosen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] if all `N` slots are occupied. The value is dropped
    /// and the pool is unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{Error, SlotPool};
    ///
    /// let mut pool = SlotPool::<u32, 1>::new();
    ///
    /// let handle = pool.create(42).unwrap();
    /// assert_eq!(*pool.get(handle).unwrap(), 42);
    ///
    /// assert_eq!(pool.create(43), Err(Error::CapacityExhausted { count: 1 }));
    /// ```
    pub fn create(&mut self, value: T) -> Result<Handle> {
        let creator = self.begin_create()?;
        let handle = creator.handle();
        creator.create(value);

        Ok(handle)
    }

    /// Creates an item in a free slot and returns both its handle and an exclusive reference to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] if all `N` slots are occupied.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String, 2>::new();
    ///
    /// let (handle, item) = pool.create_mut("Hello".to_string()).unwrap();
    /// item.push_str(", World!");
    ///
    /// assert_eq!(pool.get(handle).unwrap(), "Hello, World!");
    /// ```
    pub fn create_mut(&mut self, value: T) -> Result<(Handle, &mut T)> {
        let creator = self.begin_create()?;
        let handle = creator.handle();

        Ok((handle, creator.create(value)))
    }

    /// Reserves a free slot for a new item without filling it yet.
    ///
    /// The returned [`SlotCreator`] knows the handle the item will receive. Call
    /// [`SlotCreator::create()`] to complete the operation, or drop the creator to abandon it,
    /// which leaves the pool exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] if all `N` slots are occupied.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{Handle, SlotPool};
    ///
    /// struct Node {
    ///     me: Handle,
    /// }
    ///
    /// let mut pool = SlotPool::<Node, 4>::new();
    ///
    /// let creator = pool.begin_create().unwrap();
    /// let me = creator.handle();
    /// creator.create(Node { me });
    ///
    /// assert_eq!(pool.get(me).unwrap().me, me);
    /// ```
    pub fn begin_create(&mut self) -> Result<SlotCreator<'_, T, N>> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        if self.is_full() {
            debug!(
                item_type = type_name::<T>(),
                count = self.count,
                "pool capacity exhausted"
            );

            return Err(Error::CapacityExhausted { count: self.count });
        }

        // Peek at the top of the free stack. It is only popped once the creator completes.
        let index = self.next_free_index;
        let generation = self
            .slots
            .get(index)
            .expect("next_free_index is in bounds whenever the pool is not full")
            .generation;

        Ok(SlotCreator {
            pool: self,
            handle: Handle::new(index, generation),
        })
    }

    /// Creates an item using a fallible constructor that receives the handle of the new item.
    ///
    /// If the constructor fails, the slot it would have occupied stays free.
    ///
    /// # Errors
    ///
    /// Returns [`CreateError::Pool`] if all `N` slots are occupied, in which case the constructor
    /// is not called, or [`CreateError::Construct`] with the constructor's own error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{CreateError, SlotPool};
    ///
    /// let mut pool = SlotPool::<u8, 2>::new();
    ///
    /// let result = pool.try_create_with(|_| u8::try_from(300_u32));
    /// assert!(matches!(result, Err(CreateError::Construct(_))));
    /// assert_eq!(pool.count(), 0);
    ///
    /// let handle = pool.try_create_with(|_| u8::try_from(200_u32)).unwrap();
    /// assert_eq!(*pool.get(handle).unwrap(), 200);
    /// ```
    pub fn try_create_with<E, F>(&mut self, f: F) -> std::result::Result<Handle, CreateError<E>>
    where
        F: FnOnce(Handle) -> std::result::Result<T, E>,
    {
        let creator = self.begin_create()?;
        let handle = creator.handle();

        match f(handle) {
            Ok(value) => {
                creator.create(value);
                Ok(handle)
            }
            Err(error) => {
                debug!(
                    item_type = type_name::<T>(),
                    index = handle.index(),
                    "item construction failed, slot left free"
                );

                Err(CreateError::Construct(error))
            }
        }
    }

    /// Destroys the item identified by the handle and frees its slot for reuse.
    ///
    /// The handle, and every copy of it, is rejected by the pool from now on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySlot`] if the handle does not identify a live item, e.g. because
    /// the item was already destroyed. The pool is unchanged in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String, 2>::new();
    /// let handle = pool.create("short-lived".to_string()).unwrap();
    ///
    /// pool.destroy(handle).unwrap();
    ///
    /// assert!(pool.destroy(handle).is_err());
    /// assert!(pool.is_empty());
    /// ```
    pub fn destroy(&mut self, handle: Handle) -> Result<()> {
        self.take(handle).map(drop)
    }

    /// Removes the item identified by the handle and returns it, freeing its slot for reuse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySlot`] if the handle does not identify a live item.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String, 2>::new();
    /// let handle = pool.create("keep me".to_string()).unwrap();
    ///
    /// let value = pool.take(handle).unwrap();
    ///
    /// assert_eq!(value, "keep me");
    /// assert!(pool.is_empty());
    /// ```
    pub fn take(&mut self, handle: Handle) -> Result<T> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        self.vacate(handle)
    }

    /// Gets a shared reference to the item identified by the handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySlot`] if the handle does not identify a live item.
    pub fn get(&self, handle: Handle) -> Result<&T> {
        match self.slots.get(handle.index()) {
            Some(Slot {
                generation,
                entry: Entry::Occupied { value },
            }) if *generation == handle.generation() => Ok(value),
            _ => Err(Self::empty_slot(handle.index())),
        }
    }

    /// Gets an exclusive reference to the item identified by the handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySlot`] if the handle does not identify a live item.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u64, 2>::new();
    /// let handle = pool.create(1).unwrap();
    ///
    /// *pool.get_mut(handle).unwrap() += 1;
    ///
    /// assert_eq!(*pool.get(handle).unwrap(), 2);
    /// ```
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        match self.slots.get_mut(handle.index()) {
            Some(Slot {
                generation,
                entry: Entry::Occupied { value },
            }) if *generation == handle.generation() => Ok(value),
            _ => Err(Self::empty_slot(handle.index())),
        }
    }

    /// Whether the handle identifies a live item in the pool.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.live_handle(handle.index()) == Some(handle)
    }

    /// Returns the handle of the item currently living in the slot at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySlot`] if `index` is out of bounds or the slot is free.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<char, 3>::new();
    /// let handle = pool.create('a').unwrap();
    ///
    /// assert_eq!(pool.handle_at(handle.index()), Ok(handle));
    /// assert!(pool.handle_at(3).is_err());
    /// ```
    pub fn handle_at(&self, index: usize) -> Result<Handle> {
        self.live_handle(index)
            .ok_or_else(|| Self::empty_slot(index))
    }

    /// Finds the handle of an item by its identity, i.e. its memory address.
    ///
    /// This is a linear scan over the pool. Items are never compared by value, so two equal
    /// items in different slots are always told apart.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySlot`] if `item` does not live in this pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32, 4>::new();
    /// let first = pool.create(7).unwrap();
    /// let second = pool.create(7).unwrap();
    ///
    /// let item = pool.get(second).unwrap();
    /// assert_eq!(pool.position(item), Ok(second));
    ///
    /// // An equal value elsewhere is not an item of the pool.
    /// assert!(pool.position(&7).is_err());
    /// # _ = first;
    /// ```
    pub fn position(&self, item: &T) -> Result<Handle> {
        self.iter()
            .find_map(|(handle, value)| ptr::eq(value, item).then_some(handle))
            .ok_or_else(|| {
                let address = ptr::from_ref(item).addr();

                debug!(
                    item_type = type_name::<T>(),
                    address, "item does not live in this pool"
                );

                Error::EmptySlot {
                    slot: SlotRef::Address(address),
                }
            })
    }

    /// Iterates over the live items in slot order, together with their handles.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32, 4>::new();
    /// pool.create(1).unwrap();
    /// pool.create(2).unwrap();
    ///
    /// let sum: u32 = pool.iter().map(|(_, value)| *value).sum();
    /// assert_eq!(sum, 3);
    /// ```
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.entry {
                Entry::Occupied { value } => Some((Handle::new(index, slot.generation), value)),
                Entry::Vacant { .. } => None,
            })
    }

    /// Destroys every live item. All outstanding handles become stale.
    ///
    /// This is also the way to empty a pool built with [`DropPolicy::MustNotDropItems`] before
    /// dropping it.
    pub fn clear(&mut self) {
        for index in 0..N {
            if let Some(handle) = self.live_handle(index) {
                self.vacate(handle)
                    .map(drop)
                    .expect("handle was just read from a live slot");
            }
        }
    }

    fn live_handle(&self, index: usize) -> Option<Handle> {
        match self.slots.get(index) {
            Some(Slot {
                generation,
                entry: Entry::Occupied { .. },
            }) => Some(Handle::new(index, *generation)),
            _ => None,
        }
    }

    fn vacate(&mut self, handle: Handle) -> Result<T> {
        let next_free_index = self.next_free_index;

        let Some(slot) = self.slots.get_mut(handle.index()).filter(|slot| {
            slot.generation == handle.generation() && matches!(slot.entry, Entry::Occupied { .. })
        }) else {
            return Err(Self::empty_slot(handle.index()));
        };

        // Push the slot onto the free stack and retire the handle.
        let previous_entry = mem::replace(&mut slot.entry, Entry::Vacant { next_free_index });
        slot.generation = slot.generation.wrapping_add(1);

        let Entry::Occupied { value } = previous_entry else {
            panic!(
                "slot {} was not occupied when we vacated it in pool of {}",
                handle.index(),
                type_name::<T>()
            );
        };

        self.next_free_index = handle.index();

        self.count = self
            .count
            .checked_sub(1)
            .expect("we verified above that the slot is occupied so count must be non-zero");

        trace!(
            item_type = type_name::<T>(),
            index = handle.index(),
            generation = handle.generation(),
            count = self.count,
            "item removed"
        );

        Ok(value)
    }

    fn empty_slot(index: usize) -> Error {
        debug!(
            item_type = type_name::<T>(),
            index, "no live item for the requested slot"
        );

        Error::EmptySlot {
            slot: SlotRef::Index(index),
        }
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    fn integrity_check(&self) {
        let observed_occupied_count = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.entry, Entry::Occupied { .. }))
            .count();

        assert!(
            self.count == observed_occupied_count,
            "self.count {} does not match the observed occupied count {} in pool of {}",
            self.count,
            observed_occupied_count,
            type_name::<T>()
        );

        let vacant_count = N
            .checked_sub(observed_occupied_count)
            .expect("cannot observe more occupied slots than exist");

        // Walk the free stack. It must visit every vacant slot exactly once and end at N.
        let mut visited: usize = 0;
        let mut index = self.next_free_index;

        while index != N {
            match self.slots.get(index).map(|slot| &slot.entry) {
                Some(Entry::Vacant { next_free_index }) => index = *next_free_index,
                Some(Entry::Occupied { .. }) => panic!(
                    "free list reaches slot {index} which is occupied in pool of {}",
                    type_name::<T>()
                ),
                None => panic!(
                    "free list reaches out-of-bounds slot {index} in pool of {}",
                    type_name::<T>()
                ),
            }

            visited = visited
                .checked_add(1)
                .expect("bounded by the cycle check below");

            assert!(
                visited <= vacant_count,
                "free list is longer than the {vacant_count} vacant slots in pool of {}",
                type_name::<T>()
            );
        }

        assert!(
            visited == vacant_count,
            "free list covers {visited} of {vacant_count} vacant slots in pool of {}",
            type_name::<T>()
        );
    }
}

impl<T, const N: usize> Default for SlotPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for SlotPool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &N)
            .field("count", &self.count)
            .field("next_free_index", &self.next_free_index)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T, const N: usize> Drop for SlotPool<T, N> {
    fn drop(&mut self) {
        let was_empty = self.is_empty();

        // Dropping the storage drops every occupied slot's item exactly once.
        drop(mem::take(&mut self.slots));

        // We do this check at the end so we clean up the items first.
        //
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty pool of {} with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}

/// A reserved but not yet filled slot, returned by [`SlotPool::begin_create()`].
///
/// Holds the pool exclusively until it is consumed by [`create()`][Self::create] or dropped.
/// Dropping it without creating an item leaves the pool unchanged.
#[derive(Debug)]
pub struct SlotCreator<'p, T, const N: usize> {
    pool: &'p mut SlotPool<T, N>,

    /// Handle that the item will receive.
    handle: Handle,
}

impl<'p, T, const N: usize> SlotCreator<'p, T, N> {
    /// The handle the item will have once created.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Fills the reserved slot with `value` and returns an exclusive reference to the new item.
    pub fn create(self, value: T) -> &'p mut T {
        let index = self.handle.index();
        let pool = self.pool;

        let slot = pool
            .slots
            .get_mut(index)
            .expect("creator only exists for in-bounds free slots");

        let previous_entry = mem::replace(&mut slot.entry, Entry::Occupied { value });

        // Pop the slot off the free stack.
        pool.next_free_index = match previous_entry {
            Entry::Vacant { next_free_index } => next_free_index,
            Entry::Occupied { .. } => panic!(
                "slot {index} was not vacant when we created an item in it in pool of {}",
                type_name::<T>()
            ),
        };

        pool.count = pool
            .count
            .checked_add(1)
            .expect("count is bounded by N, which fits in usize");

        trace!(
            item_type = type_name::<T>(),
            index,
            generation = slot.generation,
            count = pool.count,
            "item created"
        );

        match &mut slot.entry {
            Entry::Occupied { value } => value,
            Entry::Vacant { .. } => panic!(
                "slot {index} was not occupied after we created an item in it in pool of {}",
                type_name::<T>()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(SlotPool<u32, 4>: Send, Sync, fmt::Debug, Default);
    assert_impl_all!(SlotPool<Mutex<u32>, 4>: Send, Sync);
    assert_not_impl_any!(SlotPool<Rc<u32>, 4>: Send, Sync);
    assert_not_impl_any!(SlotPool<Cell<u32>, 4>: Sync);

    /// Counts how many instances have been dropped.
    struct Droppable {
        drops: Rc<Cell<usize>>,
    }

    impl Droppable {
        fn new(drops: &Rc<Cell<usize>>) -> Self {
            Self {
                drops: Rc::clone(drops),
            }
        }
    }

    impl Drop for Droppable {
        fn drop(&mut self) {
            self.drops.set(self.drops.get().wrapping_add(1));
        }
    }

    #[test]
    fn smoke_test() {
        let mut pool = SlotPool::<u32, 3>::new();

        let a = pool.create(42).unwrap();
        let b = pool.create(43).unwrap();
        let c = pool.create(44).unwrap();

        assert_eq!(*pool.get(a).unwrap(), 42);
        assert_eq!(*pool.get(b).unwrap(), 43);
        assert_eq!(*pool.get(c).unwrap(), 44);

        assert_eq!(pool.count(), 3);

        pool.destroy(b).unwrap();

        assert_eq!(pool.count(), 2);

        let d = pool.create(45).unwrap();

        assert_eq!(*pool.get(a).unwrap(), 42);
        assert_eq!(*pool.get(c).unwrap(), 44);
        assert_eq!(*pool.get(d).unwrap(), 45);

        assert!(pool.is_full());
    }

    #[test]
    fn fills_to_capacity_then_fails() {
        let mut pool = SlotPool::<u32, 5>::new();

        for value in 0..5 {
            pool.create(value).unwrap();
        }

        assert_eq!(pool.create(5), Err(Error::CapacityExhausted { count: 5 }));
        assert_eq!(pool.count(), 5);
    }

    #[test]
    fn full_pool_drops_rejected_value_and_keeps_items() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = SlotPool::<Droppable, 1>::new();

        let kept = pool.create(Droppable::new(&drops)).unwrap();
        let result = pool.create(Droppable::new(&drops));

        assert_eq!(result, Err(Error::CapacityExhausted { count: 1 }));
        assert_eq!(drops.get(), 1);
        assert!(pool.contains(kept));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn handles_are_unique_while_live() {
        let mut pool = SlotPool::<u32, 8>::new();

        let handles = (0..8)
            .map(|value| pool.create(value).unwrap())
            .collect::<Vec<_>>();

        let indexes = handles.iter().map(Handle::index).collect::<HashSet<_>>();
        assert_eq!(indexes.len(), 8);
        assert!(indexes.iter().all(|index| *index < 8));
    }

    #[test]
    fn begin_create_predicts_handle() {
        let mut pool = SlotPool::<u32, 3>::new();

        for value in 10..13 {
            let creator = pool.begin_create().unwrap();
            let handle = creator.handle();
            creator.create(value);

            assert_eq!(*pool.get(handle).unwrap(), value);
        }
    }

    #[test]
    fn abandoned_creator_is_noop() {
        let mut pool = SlotPool::<u32, 3>::new();

        // If you abandon a creator, nothing happens.
        let abandoned = pool.begin_create().unwrap().handle();

        assert_eq!(pool.count(), 0);
        assert!(!pool.contains(abandoned));

        let creator = pool.begin_create().unwrap();
        assert_eq!(creator.handle(), abandoned);
        creator.create(20);

        assert_eq!(*pool.get(abandoned).unwrap(), 20);

        // There must still be room for 2 more.
        pool.create(123).unwrap();
        pool.create(456).unwrap();
        assert!(pool.is_full());
    }

    #[test]
    fn begin_create_on_full_pool_fails() {
        let mut pool = SlotPool::<u32, 1>::new();
        pool.create(1).unwrap();

        assert_eq!(
            pool.begin_create().map(|creator| creator.handle()),
            Err(Error::CapacityExhausted { count: 1 })
        );
    }

    #[test]
    fn create_mut_returns_live_item() {
        let mut pool = SlotPool::<String, 2>::new();

        let (handle, item) = pool.create_mut("abc".to_string()).unwrap();
        item.push('d');

        assert_eq!(pool.get(handle).unwrap(), "abcd");
    }

    #[test]
    fn try_create_with_failure_leaves_slot_free() {
        let mut pool = SlotPool::<u32, 1>::new();

        let result = pool.try_create_with(|_| Err::<u32, _>("nope"));

        assert_eq!(result, Err(CreateError::Construct("nope")));
        assert_eq!(pool.count(), 0);
        assert!(!pool.is_full());

        let handle = pool.try_create_with(|_| Ok::<_, &str>(5)).unwrap();
        assert_eq!(*pool.get(handle).unwrap(), 5);
    }

    #[test]
    fn try_create_with_on_full_pool_skips_constructor() {
        let mut pool = SlotPool::<u32, 1>::new();
        pool.create(1).unwrap();

        let called = Cell::new(false);
        let result = pool.try_create_with(|_| {
            called.set(true);
            Ok::<_, &str>(2)
        });

        assert_eq!(
            result,
            Err(CreateError::Pool(Error::CapacityExhausted { count: 1 }))
        );
        assert!(!called.get());
    }

    #[test]
    fn try_create_with_passes_own_handle() {
        let mut pool = SlotPool::<Handle, 2>::new();

        let handle = pool.try_create_with(Ok::<_, ()>).unwrap();

        assert_eq!(*pool.get(handle).unwrap(), handle);
    }

    #[test]
    fn destroy_makes_room() {
        let mut pool = SlotPool::<u32, 3>::new();

        let a = pool.create(42).unwrap();
        let b = pool.create(43).unwrap();
        let c = pool.create(44).unwrap();

        pool.destroy(b).unwrap();

        // Only one slot is free, so it must be the one we just freed.
        let d = pool.create(45).unwrap();
        assert_eq!(d.index(), b.index());
        assert_ne!(d, b);

        assert_eq!(*pool.get(a).unwrap(), 42);
        assert_eq!(*pool.get(c).unwrap(), 44);
        assert_eq!(*pool.get(d).unwrap(), 45);
    }

    #[test]
    fn destroy_then_get_fails() {
        let mut pool = SlotPool::<u32, 3>::new();
        let handle = pool.create(1).unwrap();

        pool.destroy(handle).unwrap();

        assert_eq!(
            pool.get(handle),
            Err(Error::EmptySlot {
                slot: SlotRef::Index(handle.index())
            })
        );
    }

    #[test]
    fn double_destroy_fails() {
        let mut pool = SlotPool::<u32, 3>::new();
        let handle = pool.create(1).unwrap();
        pool.create(2).unwrap();

        pool.destroy(handle).unwrap();

        assert!(pool.destroy(handle).is_err());
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn destroy_of_never_created_slot_fails() {
        let mut pool = SlotPool::<u32, 3>::new();
        pool.create(1).unwrap();

        let never_created = Handle::new(2, 0);
        assert!(pool.destroy(never_created).is_err());

        let out_of_bounds = Handle::new(1234, 0);
        assert!(pool.destroy(out_of_bounds).is_err());

        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn stale_handle_rejected_after_slot_reuse() {
        let mut pool = SlotPool::<&str, 1>::new();

        let old = pool.create("old").unwrap();
        pool.destroy(old).unwrap();
        let new = pool.create("new").unwrap();

        assert_eq!(old.index(), new.index());
        assert!(pool.get(old).is_err());
        assert!(pool.destroy(old).is_err());
        assert_eq!(*pool.get(new).unwrap(), "new");
    }

    #[test]
    fn get_out_of_bounds_fails() {
        let mut pool = SlotPool::<u32, 3>::new();
        pool.create(42).unwrap();

        assert!(pool.get(Handle::new(1234, 0)).is_err());
        assert!(pool.get_mut(Handle::new(1234, 0)).is_err());
    }

    #[test]
    fn get_vacant_fails() {
        let mut pool = SlotPool::<u32, 3>::new();

        assert!(pool.get(Handle::new(1, 0)).is_err());
        assert!(pool.get_mut(Handle::new(1, 0)).is_err());
    }

    #[test]
    fn take_returns_value_without_dropping() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = SlotPool::<Droppable, 2>::new();

        let handle = pool.create(Droppable::new(&drops)).unwrap();
        let value = pool.take(handle).unwrap();

        assert_eq!(drops.get(), 0);
        assert!(pool.is_empty());

        drop(value);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn calls_drop_on_destroy() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = SlotPool::<Droppable, 3>::new();

        let a = pool.create(Droppable::new(&drops)).unwrap();
        pool.destroy(a).unwrap();

        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn teardown_drops_exactly_live_items() {
        let drops = Rc::new(Cell::new(0));

        {
            let mut pool = SlotPool::<Droppable, 5>::new();

            let handles = (0..4)
                .map(|_| pool.create(Droppable::new(&drops)).unwrap())
                .collect::<Vec<_>>();

            pool.destroy(handles.get(1).copied().unwrap()).unwrap();
            assert_eq!(drops.get(), 1);
        }

        // One destroyed explicitly plus three still live at teardown.
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn clear_destroys_everything() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = SlotPool::<Droppable, 4>::new();

        let handles = (0..3)
            .map(|_| pool.create(Droppable::new(&drops)).unwrap())
            .collect::<Vec<_>>();

        pool.clear();

        assert_eq!(drops.get(), 3);
        assert!(pool.is_empty());
        assert!(handles.iter().all(|handle| !pool.contains(*handle)));

        // Full capacity is available again.
        for _ in 0..4 {
            pool.create(Droppable::new(&drops)).unwrap();
        }
        assert!(pool.is_full());
    }

    #[test]
    fn handle_at_tracks_occupant() {
        let mut pool = SlotPool::<u32, 2>::new();
        let handle = pool.create(1).unwrap();

        assert_eq!(pool.handle_at(handle.index()), Ok(handle));

        pool.destroy(handle).unwrap();
        assert!(pool.handle_at(handle.index()).is_err());
        assert!(pool.handle_at(2).is_err());
    }

    #[test]
    fn position_matches_create() {
        let mut pool = SlotPool::<u32, 4>::new();

        let handles = (0..4)
            .map(|value| pool.create(value).unwrap())
            .collect::<Vec<_>>();

        for handle in handles {
            let item = pool.get(handle).unwrap();
            assert_eq!(pool.position(item), Ok(handle));
        }
    }

    #[test]
    fn position_uses_identity_not_equality() {
        let mut pool = SlotPool::<String, 3>::new();

        let a = pool.create("same".to_string()).unwrap();
        let b = pool.create("same".to_string()).unwrap();

        assert_eq!(pool.position(pool.get(a).unwrap()), Ok(a));
        assert_eq!(pool.position(pool.get(b).unwrap()), Ok(b));

        let outside = "same".to_string();
        assert!(matches!(
            pool.position(&outside),
            Err(Error::EmptySlot {
                slot: SlotRef::Address(_)
            })
        ));
    }

    #[test]
    fn position_rejects_item_from_other_pool() {
        let mut pool = SlotPool::<u32, 2>::new();
        let mut other = SlotPool::<u32, 2>::new();

        pool.create(1).unwrap();
        let foreign = other.create(1).unwrap();

        assert!(pool.position(other.get(foreign).unwrap()).is_err());
    }

    #[test]
    fn iter_visits_live_items_in_slot_order() {
        let mut pool = SlotPool::<u32, 4>::new();

        let handles = (0..4)
            .map(|value| pool.create(value).unwrap())
            .collect::<Vec<_>>();
        let removed = handles.get(2).copied().unwrap();
        pool.destroy(removed).unwrap();

        let visited = pool.iter().collect::<Vec<_>>();

        assert_eq!(visited.len(), 3);
        assert!(
            visited
                .windows(2)
                .all(|pair| pair.first().unwrap().0.index() < pair.last().unwrap().0.index())
        );
        assert!(visited.iter().all(|(handle, value)| {
            *handle != removed && pool.get(*handle).unwrap() == *value
        }));

        let mut values = visited.iter().map(|(_, value)| **value).collect::<Vec<_>>();
        values.sort_unstable();
        assert_eq!(values, vec![0, 1, 3]);
    }

    #[test]
    fn in_refcell_works_fine() {
        let pool = RefCell::new(SlotPool::<u32, 3>::new());

        {
            let mut pool = pool.borrow_mut();
            let a = pool.create(42).unwrap();
            let b = pool.create(43).unwrap();
            let c = pool.create(44).unwrap();

            pool.destroy(b).unwrap();

            let d = pool.create(45).unwrap();

            assert_eq!(*pool.get(a).unwrap(), 42);
            assert_eq!(*pool.get(c).unwrap(), 44);
            assert_eq!(*pool.get(d).unwrap(), 45);
        }

        {
            let pool = pool.borrow();
            assert!(pool.is_full());
        }
    }

    #[test]
    fn multithreaded_via_mutex() {
        let pool = Arc::new(Mutex::new(SlotPool::<u32, 3>::new()));

        let (a, b, c) = {
            let mut pool = pool.lock().unwrap();
            (
                pool.create(42).unwrap(),
                pool.create(43).unwrap(),
                pool.create(44).unwrap(),
            )
        };

        let pool_clone = Arc::clone(&pool);
        thread::spawn(move || {
            let mut pool = pool_clone.lock().unwrap();

            pool.destroy(b).unwrap();

            let d = pool.create(45).unwrap();

            assert_eq!(*pool.get(a).unwrap(), 42);
            assert_eq!(*pool.get(c).unwrap(), 44);
            assert_eq!(*pool.get(d).unwrap(), 45);
        })
        .join()
        .unwrap();

        let pool = pool.lock().unwrap();
        assert!(pool.is_full());
        assert!(pool.get(b).is_err());
    }

    #[test]
    #[should_panic(expected = "dropped a non-empty pool")]
    fn drop_item_with_forbidden_to_drop_policy_panics() {
        let mut pool = SlotPool::<u32, 3>::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();
        _ = pool.create(123);
    }

    #[test]
    fn drop_itemless_with_forbidden_to_drop_policy_ok() {
        drop(
            SlotPool::<u32, 3>::builder()
                .drop_policy(DropPolicy::MustNotDropItems)
                .build(),
        );
    }

    #[test]
    fn drop_cleared_with_forbidden_to_drop_policy_ok() {
        let mut pool = SlotPool::<u32, 3>::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();
        pool.create(1).unwrap();

        pool.clear();
    }

    #[test]
    fn zst_items_are_supported() {
        let mut pool = SlotPool::<(), 3>::new();

        let a = pool.create(()).unwrap();
        let b = pool.create(()).unwrap();

        assert_ne!(a, b);
        assert_eq!(pool.position(pool.get(b).unwrap()), Ok(b));

        pool.destroy(a).unwrap();
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut pool = SlotPool::<u32, 0>::new();

        assert!(pool.is_full());
        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), 0);

        assert_eq!(pool.create(1), Err(Error::CapacityExhausted { count: 0 }));
        assert_eq!(pool.count(), 0);
        assert!(pool.handle_at(0).is_err());
        assert!(pool.position(&1).is_err());
        assert_eq!(pool.iter().count(), 0);

        pool.clear();
    }

    #[test]
    fn zero_capacity_try_create_skips_constructor() {
        let mut pool = SlotPool::<u32, 0>::new();

        let result = pool.try_create_with(|_| -> std::result::Result<u32, &str> {
            panic!("constructor must not run for a full pool")
        });

        assert_eq!(
            result,
            Err(CreateError::Pool(Error::CapacityExhausted { count: 0 }))
        );
    }

    #[test]
    #[should_panic(expected = "original failure")]
    fn panic_with_live_items_under_forbidden_to_drop_policy_keeps_original_message() {
        let mut pool = SlotPool::<u32, 2>::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();
        pool.create(1).unwrap();

        // The pool is dropped during unwinding and must not replace this panic with its own.
        panic!("original failure");
    }

    #[test]
    fn generation_wraps_after_exhausting_u64() {
        let mut pool = SlotPool::<u32, 1>::new();
        pool.slots.get_mut(0).unwrap().generation = u64::MAX;

        let last = pool.create(1).unwrap();
        assert_eq!(last.generation(), u64::MAX);
        pool.destroy(last).unwrap();

        let wrapped = pool.create(2).unwrap();
        assert_eq!(wrapped.generation(), 0);
        assert!(pool.get(last).is_err());
        assert_eq!(*pool.get(wrapped).unwrap(), 2);
    }

    #[test]
    fn debug_output_is_informative() {
        let mut pool = SlotPool::<u32, 2>::new();
        pool.create(1).unwrap();

        let debug = format!("{pool:?}");

        assert!(debug.contains("u32"));
        assert!(debug.contains("count: 1"));
    }
}
