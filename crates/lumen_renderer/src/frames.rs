//! Bookkeeping for samples rendered concurrently.
//!
//! A sample is submitted only after a permit is taken from the
//! [`InFlightLimiter`]; the worker hands the permit back when it finishes.
//! Submitted samples wait in a [`FrameRing`] until they can be retired in
//! sample order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use lumen_core::FrameUniforms;
use parking_lot::{Condvar, Mutex};

/// Number of samples that may be in flight at once.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Counting semaphore bounding the number of in-flight samples.
pub struct InFlightLimiter {
    available: Mutex<usize>,
    released: Condvar,
    completed: AtomicU32,
}

impl InFlightLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            completed: AtomicU32::new(0),
        }
    }

    /// Block until a slot is free and take it.
    pub fn acquire(&self) -> FramePermit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        FramePermit { limiter: self }
    }

    /// Samples whose workers have finished, successfully or not.
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
        let mut available = self.available.lock();
        *available += 1;
        self.released.notify_one();
    }
}

/// A taken slot. Dropping it is the completion signal.
pub struct FramePermit<'a> {
    limiter: &'a InFlightLimiter,
}

impl Drop for FramePermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

/// A submitted sample: its uniform snapshot and the pending result.
pub struct InFlightFrame<T> {
    pub uniforms: FrameUniforms,
    pub pending: T,
}

/// Fixed-capacity queue of in-flight frames, retired oldest first.
pub struct FrameRing<T> {
    frames: VecDeque<InFlightFrame<T>>,
    capacity: usize,
}

impl<T> FrameRing<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    /// Queue a frame. When the ring is full the oldest frame is displaced
    /// and handed back; the caller must retire it.
    pub fn push(&mut self, frame: InFlightFrame<T>) -> Option<InFlightFrame<T>> {
        let displaced = if self.is_full() {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        displaced
    }

    /// Remove the oldest frame.
    pub fn retire(&mut self) -> Option<InFlightFrame<T>> {
        self.frames.pop_front()
    }
}
