//! A fixed-capacity typed object pool with stable slots and generation-checked handles.
//!
//! This crate provides [`SlotPool<T, N>`], a container that reserves storage for exactly `N`
//! items of type `T` up front. Items are created in place in a free slot and destroyed in place,
//! with freed slots recycled through an intrusive free list. The pool never grows, never moves
//! its items and never allocates after it has been built.
//!
//! # Key Features
//!
//! - **Fixed capacity**: `N` is part of the type; a full pool reports
//!   [`Error::CapacityExhausted`] instead of growing
//! - **Stable positions**: an item's slot index never changes while it is alive
//! - **Checked handles**: a [`Handle`] carries a generation, so using it after the item is
//!   destroyed yields [`Error::EmptySlot`] rather than reaching a different item
//! - **Identity lookup**: [`SlotPool::position()`] finds an item by address, never by value
//! - **Two-phase creation**: [`SlotPool::begin_create()`] hands out the handle before the item
//!   exists, and abandoning it leaves the pool untouched
//! - **Configurable teardown**: a [`DropPolicy`] decides whether live items may be dropped with
//!   the pool
//!
//! # Examples
//!
//! ```rust
//! use slot_pool::{Error, SlotPool};
//!
//! let mut pool = SlotPool::<String, 2>::new();
//!
//! let alice = pool.create("Alice".to_string()).unwrap();
//! let bob = pool.create("Bob".to_string()).unwrap();
//!
//! // No room for a third item.
//! assert_eq!(
//!     pool.create("Charlie".to_string()),
//!     Err(Error::CapacityExhausted { count: 2 })
//! );
//!
//! pool.destroy(bob).unwrap();
//!
//! // The handle of a destroyed item is rejected from now on.
//! assert!(pool.get(bob).is_err());
//!
//! // Its slot is available again.
//! let charlie = pool.create("Charlie".to_string()).unwrap();
//!
//! assert_eq!(pool.get(alice).unwrap(), "Alice");
//! assert_eq!(pool.get(charlie).unwrap(), "Charlie");
//! assert_eq!(pool.count(), 2);
//! ```
//!
//! # Diagnostics
//!
//! The pool emits [`tracing`] events: `TRACE` for every created and removed item and `DEBUG` for
//! rejected operations. Nothing is logged unless the application installs a subscriber.

mod builder;
mod drop_policy;
mod error;
mod handle;
mod pool;

pub use builder::*;
pub use drop_policy::*;
pub use error::{CreateError, Error, SlotRef};
pub use handle::*;
pub use pool::*;
