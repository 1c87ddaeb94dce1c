use crate::models::RawFrame;

/// A frame waiting in the buffer, tagged with its position in the session.
#[derive(Debug, Clone)]
pub struct BufferedFrame {
    pub index: u64,
    pub frame: RawFrame,
    /// Screen size whose aspect ratio the saved image is cropped to.
    pub crop_to: Option<(u32, u32)>,
}

/// Frames swapped out of the buffer in one go, in index order.
#[derive(Debug, Default)]
pub struct FlushBatch {
    pub frames: Vec<BufferedFrame>,
}

impl FlushBatch {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_index(&self) -> Option<u64> {
        self.frames.first().map(|f| f.index)
    }
}

/// Result of [`FrameBuffer::append`].
#[derive(Debug)]
pub struct BufferPush {
    /// Index assigned to the appended frame.
    pub index: u64,
    /// Set when this append filled the buffer.
    pub flushed: Option<FlushBatch>,
}

/// Bounded queue of frames awaiting disk writes.
///
/// The buffer never holds `capacity` frames after `append` returns: the
/// append that reaches the cap swaps the contents out as a [`FlushBatch`].
/// Encoding and writing the batch is the caller's job, so a slow disk never
/// holds the buffer.
#[derive(Debug)]
pub struct FrameBuffer {
    pending: Vec<BufferedFrame>,
    capacity: usize,
    next_index: u64,
    flush_count: u64,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
            next_index: 0,
            flush_count: 0,
        }
    }

    pub fn append(&mut self, frame: RawFrame) -> BufferPush {
        self.append_cropped(frame, None)
    }

    /// Append a frame that should be cropped to the `crop_to` aspect ratio
    /// when written.
    pub fn append_cropped(&mut self, frame: RawFrame, crop_to: Option<(u32, u32)>) -> BufferPush {
        let index = self.next_index;
        self.next_index += 1;
        self.pending.push(BufferedFrame {
            index,
            frame,
            crop_to,
        });

        let flushed = if self.pending.len() >= self.capacity {
            self.flush()
        } else {
            None
        };
        BufferPush { index, flushed }
    }

    /// Swap out everything buffered. `None` when there is nothing to flush.
    pub fn flush(&mut self) -> Option<FlushBatch> {
        if self.pending.is_empty() {
            return None;
        }
        let frames = std::mem::replace(&mut self.pending, Vec::with_capacity(self.capacity));
        self.flush_count += 1;
        Some(FlushBatch { frames })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index the next appended frame will get; also the number of frames seen.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }
}
