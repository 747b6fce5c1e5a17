use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{DropPolicy, SlotPool};

/// Builder for creating an instance of [`SlotPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`SlotPool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<u32, 16>::builder()
///     .drop_policy(DropPolicy::MayDropItems)
///     .build();
///
/// assert_eq!(pool.capacity(), 16);
/// ```
///
/// [1]: SlotPool::new
#[must_use]
pub struct SlotPoolBuilder<T, const N: usize> {
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T, const N: usize> fmt::Debug for SlotPoolBuilder<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &N)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T, const N: usize> SlotPoolBuilder<T, N> {
    pub(crate) fn new() -> Self {
        Self {
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat remaining items in the pool when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{DropPolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u32, 4>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration, reserving storage for all `N` slots.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32, 4>::builder().build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn build(self) -> SlotPool<T, N> {
        SlotPool::new_inner(self.drop_policy)
    }
}
