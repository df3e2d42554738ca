// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A fixed-capacity, single-producer/single-consumer ring of slots.
//!
//! Every slot is an `AtomicU64` that holds either an encoded payload
//! or `SENTINEL`, which marks the slot empty.  The producer only ever
//! writes a slot that holds the sentinel and the consumer only ever
//! resets a slot that does not, so each slot has exactly one writer at
//! any moment and no lock is needed.
//!
//! `slot_queue` hands out the two halves separately.  Neither half is
//! `Clone` and both take `&mut self`, so a second producer or consumer
//! cannot attach to a queue: the halves are moved into their threads
//! once, at spawn time.

use crossbeam::utils::Backoff;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The reserved value of an empty slot.
pub const SENTINEL: u64 = u64::MAX;

/// A payload that can travel through a slot.  `encode` must never
/// produce `SENTINEL`.
pub trait SlotValue: Copy {
    /// Packs the value into a slot word.
    fn encode(self) -> u64;
    /// Unpacks a word previously produced by `encode`.
    fn decode(raw: u64) -> Self;
}

// Every u32 widens to something strictly below u64::MAX.
impl SlotValue for u32 {
    #[inline]
    fn encode(self) -> u64 {
        u64::from(self)
    }

    #[inline]
    fn decode(raw: u64) -> Self {
        raw as u32
    }
}

/// Creates a queue of `capacity` slots and returns its two halves.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn slot_queue<T: SlotValue>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "a slot queue needs at least one slot");
    let slots: Arc<[AtomicU64]> = (0..capacity)
        .map(|_| AtomicU64::new(SENTINEL))
        .collect::<Vec<_>>()
        .into();
    (
        Producer {
            slots: slots.clone(),
            tail: 0,
            _payload: PhantomData,
        },
        Consumer {
            slots,
            head: 0,
            _payload: PhantomData,
        },
    )
}

/// The writing half.  Owns the `tail` cursor.
pub struct Producer<T> {
    slots: Arc<[AtomicU64]>,
    tail: usize,
    _payload: PhantomData<T>,
}

impl<T: SlotValue> Producer<T> {
    /// Writes `value` at `tail` if that slot is empty.
    #[inline]
    pub fn try_push(&mut self, value: T) -> bool {
        let slot = &self.slots[self.tail];
        if slot.load(Ordering::Acquire) != SENTINEL {
            return false;
        }
        let raw = value.encode();
        debug_assert_ne!(raw, SENTINEL, "payload collides with the sentinel");
        slot.store(raw, Ordering::Release);
        self.tail = (self.tail + 1) % self.slots.len();
        true
    }

    /// Spins until `value` has been accepted.  Never gives up: if the
    /// consumer is gone this does not return.
    pub fn push(&mut self, value: T) {
        let backoff = Backoff::new();
        while !self.try_push(value) {
            backoff.snooze();
        }
    }

    /// True when the slot at `tail` still holds an unconsumed value.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots[self.tail].load(Ordering::Acquire) != SENTINEL
    }

    /// True when the consumer has taken every value pushed so far.
    pub fn is_drained(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.load(Ordering::Acquire) == SENTINEL)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// The reading half.  Owns the `head` cursor.
pub struct Consumer<T> {
    slots: Arc<[AtomicU64]>,
    head: usize,
    _payload: PhantomData<T>,
}

impl<T: SlotValue> Consumer<T> {
    /// Takes the value at `head`, if there is one, and marks the slot
    /// empty again.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let slot = &self.slots[self.head];
        let raw = slot.load(Ordering::Acquire);
        if raw == SENTINEL {
            return None;
        }
        slot.store(SENTINEL, Ordering::Release);
        self.head = (self.head + 1) % self.slots.len();
        Some(T::decode(raw))
    }

    /// Spins until a value arrives.
    pub fn pop(&mut self) -> T {
        let backoff = Backoff::new();
        loop {
            if let Some(value) = self.try_pop() {
                return value;
            }
            backoff.snooze();
        }
    }

    /// True when the slot at `head` holds nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots[self.head].load(Ordering::Acquire) == SENTINEL
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::thread;

    #[test]
    fn fills_up_then_refuses() {
        let (mut tx, mut rx) = slot_queue::<u32>(3);
        assert!(rx.is_empty());
        assert!(tx.try_push(7));
        assert!(tx.try_push(8));
        assert!(!tx.is_full());
        assert!(tx.try_push(9));
        assert!(tx.is_full());
        assert!(!tx.try_push(10));
        assert_eq!(rx.try_pop(), Some(7));
        assert!(!tx.is_full());
        assert!(tx.try_push(10));
        assert_eq!(rx.try_pop(), Some(8));
        assert_eq!(rx.try_pop(), Some(9));
        assert_eq!(rx.try_pop(), Some(10));
        assert_eq!(rx.try_pop(), None);
        assert!(tx.is_drained());
    }

    #[test]
    fn cursors_wrap_around() {
        let (mut tx, mut rx) = slot_queue::<u32>(2);
        for i in 0..11 {
            assert!(tx.try_push(i));
            assert_eq!(rx.try_pop(), Some(i));
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn drained_sees_pending_values() {
        let (mut tx, mut rx) = slot_queue::<u32>(4);
        assert!(tx.is_drained());
        tx.push(1);
        assert!(!tx.is_drained());
        assert_eq!(rx.pop(), 1);
        assert!(tx.is_drained());
    }

    #[test]
    fn largest_u32_is_a_legal_payload() {
        let (mut tx, mut rx) = slot_queue::<u32>(1);
        assert_ne!(u32::max_value().encode(), SENTINEL);
        tx.push(u32::max_value());
        assert_eq!(rx.pop(), u32::max_value());
    }

    #[test]
    fn hands_over_values_in_order_across_threads() {
        let (mut tx, mut rx) = slot_queue::<u32>(4);
        let received = thread::scope(|s| {
            s.spawn(move |_| {
                for i in 0..10_000 {
                    tx.push(i);
                }
            });
            let reader = s.spawn(move |_| (0..10_000).map(|_| rx.pop()).collect::<Vec<u32>>());
            reader.join().unwrap()
        })
        .unwrap();
        assert_eq!(received, (0..10_000).collect::<Vec<u32>>());
    }

    #[test]
    #[should_panic]
    fn zero_capacity_is_rejected() {
        let _ = slot_queue::<u32>(0);
    }
}
