//! Single-producer/single-consumer triple buffer for surface frames.
//!
//! Three equally sized slots rotate between the producer (`back`), a shared
//! `middle` and the consumer (`front`). Publishing swaps `back` with `middle`
//! and sets the fresh bit; taking swaps `middle` with `front` only when the
//! fresh bit is set. Neither side ever waits on the other.
//!
//! The indices held by the producer, the shared atomic and the consumer are
//! always a permutation of `{0, 1, 2}`, so each slot has exactly one owner.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::types::SURFACE_BYTES;

/// Set in `middle` when it holds a frame the consumer has not taken yet.
const FRESH: u8 = 0b100;
const INDEX_MASK: u8 = 0b011;

struct Slots {
    buffers: [UnsafeCell<Box<[u8]>>; 3],
    middle: AtomicU8,
}

// Slots are only accessed through the index protocol above: the producer
// touches `back`, the consumer touches `front`, nobody touches `middle`.
unsafe impl Sync for Slots {}

impl Slots {
    fn new(len: usize) -> Self {
        let slot = || UnsafeCell::new(vec![0u8; len].into_boxed_slice());
        Self {
            buffers: [slot(), slot(), slot()],
            middle: AtomicU8::new(1),
        }
    }
}

/// Write side. Keeps a private canvas that accumulates partial updates.
pub struct FrameProducer {
    slots: Arc<Slots>,
    back: u8,
    canvas: Box<[u8]>,
    has_frame: bool,
}

/// Read side, owned by the worker thread.
pub struct FrameReader {
    slots: Arc<Slots>,
    front: u8,
}

/// Create a connected producer/reader pair of full-surface frames.
pub fn frame_channel() -> (FrameProducer, FrameReader) {
    channel_with_len(SURFACE_BYTES)
}

fn channel_with_len(len: usize) -> (FrameProducer, FrameReader) {
    let slots = Arc::new(Slots::new(len));
    let producer = FrameProducer {
        slots: Arc::clone(&slots),
        back: 0,
        canvas: vec![0u8; len].into_boxed_slice(),
        has_frame: false,
    };
    let reader = FrameReader { slots, front: 2 };
    (producer, reader)
}

impl FrameProducer {
    /// The full frame as the producer currently sees it.
    pub fn canvas(&self) -> &[u8] {
        &self.canvas
    }

    /// True once anything was published.
    pub fn has_frame(&self) -> bool {
        self.has_frame
    }

    pub fn canvas_mut(&mut self) -> &mut [u8] {
        &mut self.canvas
    }

    /// Hand the current canvas to the consumer and mark it fresh.
    pub fn publish(&mut self) {
        // SAFETY: `back` is owned exclusively by the producer.
        let back = unsafe { &mut *self.slots.buffers[self.back as usize].get() };
        back.copy_from_slice(&self.canvas);

        let previous = self
            .slots
            .middle
            .swap(self.back | FRESH, Ordering::AcqRel);
        self.back = previous & INDEX_MASK;
        self.has_frame = true;
    }
}

impl FrameReader {
    /// True when a frame was published since the last `take`.
    pub fn is_dirty(&self) -> bool {
        self.slots.middle.load(Ordering::Acquire) & FRESH != 0
    }

    /// Take the newest published frame, clearing the dirty state.
    ///
    /// Returns `None` when nothing was published since the last call.
    pub fn take(&mut self) -> Option<&[u8]> {
        if !self.is_dirty() {
            return None;
        }

        // Only the consumer clears FRESH, so the bit cannot vanish between
        // the check and the swap.
        let previous = self.slots.middle.swap(self.front, Ordering::AcqRel);
        self.front = previous & INDEX_MASK;

        // SAFETY: `front` is owned exclusively by the consumer.
        let front: &[u8] = unsafe { &*self.slots.buffers[self.front as usize].get() };
        Some(front)
    }
}
