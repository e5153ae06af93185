//! Fixed-capacity single-producer single-consumer sample ring.
//!
//! Samples are stored as `f32` bit patterns in atomics so the producer and consumer can work
//! on the storage at the same time under a shared read lock. The write lock is only taken to
//! clear the ring. Cursors increase monotonically; positions are taken modulo the capacity.
//! A producer that laps the consumer overwrites the oldest samples; the consumer then skips
//! ahead to the oldest sample still present.

use std::sync::{
    PoisonError, RwLock,
    atomic::{AtomicU32, AtomicUsize, Ordering},
};

pub struct RingBuffer {
    samples: RwLock<Box<[AtomicU32]>>,
    capacity: usize,
    /// Total samples ever written.
    write: AtomicUsize,
    /// Total samples ever consumed (or skipped).
    read: AtomicUsize,
}

impl RingBuffer {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let samples = (0..capacity).map(|_| AtomicU32::new(0)).collect();
        Self {
            samples: RwLock::new(samples),
            capacity,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples written and not yet read, capped at the capacity.
    pub fn available(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.saturating_sub(read).min(self.capacity)
    }

    /// Append `data`, overwriting the oldest unread samples if the ring is full. Never blocks
    /// on the reader.
    pub fn write(&self, data: &[f32]) {
        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        let start = self.write.load(Ordering::Relaxed);
        for (i, &sample) in data.iter().enumerate() {
            samples[(start + i) % self.capacity].store(sample.to_bits(), Ordering::Relaxed);
        }
        self.write.store(start + data.len(), Ordering::Release);
    }

    /// Copy up to `out.len()` samples in write order. Returns how many were available; the rest
    /// of `out` is filled with silence.
    pub fn read(&self, out: &mut [f32]) -> usize {
        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        let write = self.write.load(Ordering::Acquire);
        let mut read = self.read.load(Ordering::Relaxed);
        if write.saturating_sub(read) > self.capacity {
            read = write - self.capacity;
        }

        let count = write.saturating_sub(read).min(out.len());
        for (i, slot) in out[..count].iter_mut().enumerate() {
            *slot = f32::from_bits(samples[(read + i) % self.capacity].load(Ordering::Relaxed));
        }
        out[count..].fill(0.0);

        self.read.store(read + count, Ordering::Release);
        count
    }

    /// Drop all buffered samples.
    pub fn clear(&self) {
        let samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
        for sample in samples.iter() {
            sample.store(0, Ordering::Relaxed);
        }
        let write = self.write.load(Ordering::Acquire);
        self.read.store(write, Ordering::Release);
    }
}
