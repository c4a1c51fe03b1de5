//! Lock-Free Ring Buffer for cross-thread messages
//!
//! This module implements the bounded SPSC (Single Producer, Single Consumer)
//! queues that connect the worker threads:
//!
//! - keyboard monitor → touch loop (`ControlCommand`s)
//! - touch loop → outbound publisher (`OutboundMessage`s)
//!
//! Producers never block. A full queue drops the item and counts the drop, so
//! a stalled consumer can never stall the touch reader.
//!
//! The design uses the `rtrb` crate for the core ring buffer implementation,
//! with shared statistics for monitoring.

use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default ring buffer capacity (must be power of 2)
pub const DEFAULT_CAPACITY: usize = 4096;

/// Bounded SPSC queue, split once into its two halves
pub struct MessageRing<T> {
    producer: Producer<T>,
    consumer: Consumer<T>,
    stats: Arc<RingStats>,
    capacity: usize,
}

/// Ring buffer statistics for monitoring
#[derive(Debug, Default)]
pub struct RingStats {
    /// Total items pushed
    pub pushed: AtomicU64,
    /// Items dropped due to full buffer
    pub dropped: AtomicU64,
    /// Items successfully consumed
    pub consumed: AtomicU64,
    /// Peak buffer occupancy
    pub peak_occupancy: AtomicU64,
}

impl<T> MessageRing<T> {
    /// Create a new ring buffer with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new ring buffer with specified capacity
    ///
    /// # Panics
    /// Panics if capacity is not a power of 2
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Ring buffer capacity must be a power of 2"
        );

        let (producer, consumer) = RingBuffer::new(capacity);

        Self {
            producer,
            consumer,
            stats: Arc::new(RingStats::default()),
            capacity,
        }
    }

    /// Split the ring buffer into producer and consumer halves
    pub fn split(self) -> (RingProducer<T>, RingConsumer<T>) {
        (
            RingProducer {
                inner: self.producer,
                stats: Arc::clone(&self.stats),
                capacity: self.capacity,
            },
            RingConsumer {
                inner: self.consumer,
                stats: Arc::clone(&self.stats),
            },
        )
    }

    /// Get statistics
    pub fn stats(&self) -> Arc<RingStats> {
        Arc::clone(&self.stats)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for MessageRing<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half of the ring buffer
pub struct RingProducer<T> {
    inner: Producer<T>,
    stats: Arc<RingStats>,
    capacity: usize,
}

impl<T> RingProducer<T> {
    /// Push an item into the ring buffer.
    ///
    /// This method is lock-free and will never block. If the buffer is full,
    /// the item is dropped and the drop counter is incremented.
    ///
    /// Returns true if the item was successfully pushed, false if dropped.
    #[inline]
    pub fn push(&mut self, item: T) -> bool {
        match self.inner.push(item) {
            Ok(()) => {
                self.stats.pushed.fetch_add(1, Ordering::Relaxed);

                let occupied = (self.capacity - self.inner.slots()) as u64;
                let mut peak = self.stats.peak_occupancy.load(Ordering::Relaxed);
                while occupied > peak {
                    match self.stats.peak_occupancy.compare_exchange_weak(
                        peak,
                        occupied,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(p) => peak = p,
                    }
                }

                true
            }
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Check available slots without pushing
    #[inline]
    pub fn available_slots(&self) -> usize {
        self.inner.slots()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Whether the consumer half has been dropped
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        self.inner.is_abandoned()
    }
}

/// Consumer half of the ring buffer
pub struct RingConsumer<T> {
    inner: Consumer<T>,
    stats: Arc<RingStats>,
}

impl<T> RingConsumer<T> {
    /// Pop an item from the ring buffer, if any
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        match self.inner.pop() {
            Ok(item) => {
                self.stats.consumed.fetch_add(1, Ordering::Relaxed);
                Some(item)
            }
            Err(_) => None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of items waiting
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Pop multiple items at once (batch processing)
    pub fn pop_batch(&mut self, max_count: usize) -> Vec<T> {
        let mut batch = Vec::with_capacity(max_count.min(self.available()));
        for _ in 0..max_count {
            match self.pop() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        batch
    }

    /// Pop everything currently queued
    pub fn drain(&mut self) -> Vec<T> {
        let n = self.available();
        self.pop_batch(n)
    }

    /// Whether the producer half has been dropped
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        self.inner.is_abandoned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_creation() {
        let ring: MessageRing<u32> = MessageRing::new();
        assert_eq!(ring.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn test_non_power_of_two_capacity_panics() {
        let _ring: MessageRing<u32> = MessageRing::with_capacity(1000);
    }

    #[test]
    fn test_push_and_pop_preserve_order() {
        let (mut producer, mut consumer) = MessageRing::with_capacity(16).split();
        for i in 0..5u32 {
            assert!(producer.push(i));
        }
        assert_eq!(consumer.drain(), vec![0, 1, 2, 3, 4]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_full_buffer_drops_and_counts() {
        let ring = MessageRing::with_capacity(4);
        let stats = ring.stats();
        let (mut producer, mut consumer) = ring.split();

        for i in 0..6u32 {
            producer.push(i);
        }
        assert!(producer.is_full());
        assert_eq!(stats.pushed.load(Ordering::Relaxed), 4);
        assert_eq!(stats.dropped.load(Ordering::Relaxed), 2);
        assert_eq!(stats.peak_occupancy.load(Ordering::Relaxed), 4);

        assert_eq!(consumer.pop_batch(10), vec![0, 1, 2, 3]);
        assert_eq!(stats.consumed.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_batch_pop_respects_limit() {
        let (mut producer, mut consumer) = MessageRing::with_capacity(16).split();
        for i in 0..10u32 {
            producer.push(i);
        }
        assert_eq!(consumer.pop_batch(3).len(), 3);
        assert_eq!(consumer.available(), 7);
    }

    #[test]
    fn test_abandoned_detection() {
        let (producer, consumer) = MessageRing::<u8>::with_capacity(2).split();
        assert!(!consumer.is_abandoned());
        drop(producer);
        assert!(consumer.is_abandoned());
    }

    #[test]
    fn test_cross_thread_flow() {
        let (mut producer, mut consumer) = MessageRing::with_capacity(256).split();
        let handle = std::thread::spawn(move || {
            for i in 0..100u32 {
                while !producer.push(i) {
                    std::thread::yield_now();
                }
            }
        });

        let mut received = Vec::new();
        while received.len() < 100 {
            received.extend(consumer.drain());
            std::thread::yield_now();
        }
        handle.join().unwrap();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }
}
