/// Determines what happens to live items when a [`SlotPool`][crate::SlotPool] is dropped.
///
/// By default, the pool drops its remaining items when it is dropped.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = SlotPool::<u32, 8>::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool will drop any live items when the pool is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if it still contains items when it is dropped.
    ///
    /// Useful when items must be released through some controlled path (e.g. they are
    /// registered elsewhere by handle) and reaching pool teardown with live items is a bug.
    MustNotDropItems,
}
