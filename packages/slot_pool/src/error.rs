use std::fmt;

use thiserror::Error;

/// Errors returned by [`SlotPool`][crate::SlotPool] operations.
///
/// Both kinds are recoverable. The pool is left exactly as it was before the failed call.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Every slot is occupied, so no new item can be created.
    #[error("not enough slots: the pool already holds {count} live items")]
    CapacityExhausted {
        /// The number of live items at the time of the failed call.
        count: usize,
    },

    /// The referenced slot does not hold the expected live item.
    ///
    /// Returned for out-of-range indices, vacant slots, stale handles whose item was already
    /// destroyed and references to items that do not live in this pool.
    #[error("no live item at {slot}")]
    EmptySlot {
        /// How the caller identified the slot.
        slot: SlotRef,
    },
}

/// Identifies the slot that an [`Error::EmptySlot`] refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SlotRef {
    /// The slot was addressed by index, directly or through a handle.
    Index(usize),

    /// The slot was looked up by the memory address of an item.
    Address(usize),
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "slot index {index}"),
            Self::Address(address) => write!(f, "item address {address:#x}"),
        }
    }
}

/// Error returned by [`SlotPool::try_create_with()`][crate::SlotPool::try_create_with].
///
/// Either the pool had no room or the caller-supplied constructor failed. In both cases the
/// slot that would have been used remains free.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum CreateError<E> {
    /// The pool rejected the request before the constructor was called.
    #[error(transparent)]
    Pool(#[from] Error),

    /// The constructor returned an error.
    #[error("item construction failed: {0}")]
    Construct(E),
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
