/// Identifies one item in a [`SlotPool`][crate::SlotPool].
///
/// A handle pairs the index of the slot holding the item with the generation of that slot at the
/// time the item was created. Every time an item is destroyed its slot moves to a new generation,
/// so a handle kept around after its item is gone is rejected by the pool instead of silently
/// referring to whatever item reuses the slot later. Generations wrap around after 2^64 reuses
/// of one slot, which is the only way an old handle could become valid again.
///
/// # Example
///
/// ```rust
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<&str, 2>::new();
///
/// let first = pool.create("first").unwrap();
/// pool.destroy(first).unwrap();
///
/// // The slot may be reused but the old handle stays dead.
/// let second = pool.create("second").unwrap();
/// assert!(pool.get(first).is_err());
/// assert_eq!(*pool.get(second).unwrap(), "second");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle {
    index: usize,
    generation: u64,
}

impl Handle {
    pub(crate) fn new(index: usize, generation: u64) -> Self {
        Self { index, generation }
    }

    /// The position of the item in the pool.
    ///
    /// This never changes while the item is alive.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}
