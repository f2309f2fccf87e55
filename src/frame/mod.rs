//! CPU-side frame store for the overlay surfaces.
//!
//! Callers write rectangles into a per-surface canvas; each successful write
//! publishes the full canvas through a triple buffer so the worker can pick
//! up the newest frame without ever blocking the writer.

mod handoff;

pub use handoff::{frame_channel, FrameProducer, FrameReader};

use parking_lot::Mutex;

use crate::types::{Region, SurfaceId, BYTES_PER_PIXEL, SURFACE_BYTES, SURFACE_ROW_PITCH};

/// Write side of both surfaces. Shared by caller threads.
pub struct FrameStore {
    producers: [Mutex<FrameProducer>; 2],
}

/// Read side of both surfaces. Moved onto the worker thread.
pub struct FrameReaders {
    readers: [FrameReader; 2],
}

impl FrameReaders {
    pub fn get_mut(&mut self, surface: SurfaceId) -> &mut FrameReader {
        &mut self.readers[surface.index()]
    }

    pub fn is_dirty(&self, surface: SurfaceId) -> bool {
        self.readers[surface.index()].is_dirty()
    }
}

impl FrameStore {
    /// Create a store and the readers connected to it.
    pub fn new() -> (Self, FrameReaders) {
        let (hmd_producer, hmd_reader) = frame_channel();
        let (wrist_producer, wrist_reader) = frame_channel();

        let store = Self {
            producers: [Mutex::new(hmd_producer), Mutex::new(wrist_producer)],
        };
        let readers = FrameReaders {
            readers: [hmd_reader, wrist_reader],
        };
        (store, readers)
    }

    /// Copy `region` of `pixels` into the surface and mark it dirty.
    ///
    /// `pixels` is a full surface-sized BGRA buffer; only the pixels inside
    /// `region` are taken from it. Returns `false` without touching anything
    /// when the buffer size or rectangle is invalid.
    pub fn write_region(&self, surface: SurfaceId, region: Region, pixels: &[u8]) -> bool {
        if pixels.len() != SURFACE_BYTES || !region.fits_surface() {
            log::trace!(
                "[FRAME] Rejected {} write {:?} with {} bytes",
                surface,
                region,
                pixels.len()
            );
            return false;
        }

        let mut producer = self.producers[surface.index()].lock();
        copy_region(producer.canvas_mut(), pixels, region);
        producer.publish();
        true
    }

    /// Publish the last written frame of every surface again.
    ///
    /// A new worker starts with blank textures; this makes the frames it
    /// inherits dirty so its first render uploads them. Surfaces that were
    /// never written stay clean.
    pub fn republish(&self) {
        for surface in SurfaceId::ALL {
            let mut producer = self.producers[surface.index()].lock();
            if producer.has_frame() {
                producer.publish();
            }
        }
    }

    /// Reconnect fresh readers, e.g. after a worker thread was lost.
    ///
    /// The new readers start out dirty with the last written content so the
    /// next worker shows the same image.
    pub fn reset(&self) -> FrameReaders {
        FrameReaders {
            readers: [
                self.reconnect(SurfaceId::Hmd),
                self.reconnect(SurfaceId::Wrist),
            ],
        }
    }

    fn reconnect(&self, surface: SurfaceId) -> FrameReader {
        let (mut producer, reader) = frame_channel();
        let mut current = self.producers[surface.index()].lock();
        producer.canvas_mut().copy_from_slice(current.canvas());
        producer.publish();
        *current = producer;
        reader
    }
}

/// Copy one rectangle between two full-surface buffers at the same position.
pub fn copy_region(target: &mut [u8], source: &[u8], region: Region) {
    let offset = region.byte_offset();
    let row_bytes = (region.width * BYTES_PER_PIXEL) as usize;

    if region.is_full_width() {
        let len = row_bytes * region.height as usize;
        target[offset..offset + len].copy_from_slice(&source[offset..offset + len]);
        return;
    }

    let pitch = SURFACE_ROW_PITCH as usize;
    for row in 0..region.height as usize {
        let start = offset + row * pitch;
        target[start..start + row_bytes].copy_from_slice(&source[start..start + row_bytes]);
    }
}
