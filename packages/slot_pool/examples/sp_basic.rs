//! Basic usage of the `slot_pool` crate:
//!
//! * Creating a pool.
//! * Adding items.
//! * Retrieving items.
//! * Destroying items and reusing their slots.
//! * Handling a full pool.

use slot_pool::{Error, SlotPool};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut pool = SlotPool::<String, 3>::new();

    // Creating an item gives you a handle that you can later use to look up the item again.
    let alice = pool.create("Alice".to_string()).unwrap();
    let bob = pool.create("Bob".to_string()).unwrap();
    let charlie = pool.create("Charlie".to_string()).unwrap();

    println!(
        "Slot pool contains {} items, with a fixed capacity of {}",
        pool.count(),
        pool.capacity()
    );

    // A full pool refuses new items instead of growing.
    match pool.create("Dave".to_string()) {
        Err(Error::CapacityExhausted { count }) => {
            println!("Pool is full with {count} items, Dave has to wait");
        }
        other => println!("Unexpected result: {other:?}"),
    }

    println!("Retrieved item: {}", pool.get(alice).unwrap());

    pool.destroy(bob).unwrap();

    // Bob's handle is now dead, even after his slot gets reused.
    let dave = pool.create("Dave".to_string()).unwrap();

    if let Err(error) = pool.get(bob) {
        println!("Bob is gone: {error}");
    }

    println!(
        "Dave lives in slot {} that used to belong to Bob in slot {}",
        dave.index(),
        bob.index()
    );

    // Items can be modified in place.
    pool.get_mut(charlie).unwrap().push_str(" Smith");

    // An item can be found by identity, giving back its handle.
    let item = pool.get(charlie).unwrap();
    let found = pool.position(item).unwrap();
    println!("Found {item} at slot {}", found.index());

    for (handle, name) in pool.iter() {
        println!("Slot {}: {name}", handle.index());
    }
}
