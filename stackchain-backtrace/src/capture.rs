use std::fmt;

/// Number of frames a capture records before it touches the heap.
pub const INLINE_FRAMES: usize = 128;

/// An unresolved stack frame.
///
/// This is the instruction pointer reported by the stack walk together with
/// the start address of the enclosing function when the unwinder knows it.
/// Neither value is stable across process runs.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpaqueFrame {
    ip: usize,
    symbol_address: usize,
}

impl OpaqueFrame {
    /// Creates a frame from a raw instruction pointer and symbol address.
    pub const fn new(ip: usize, symbol_address: usize) -> OpaqueFrame {
        OpaqueFrame { ip, symbol_address }
    }

    /// The instruction pointer as reported by the unwinder.
    ///
    /// For every frame but the innermost one this is a return address and
    /// therefore points just past the call instruction.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// The address of the call instruction itself.
    pub fn program_counter(&self) -> usize {
        self.ip.saturating_sub(1)
    }

    /// The start address of the enclosing function, or zero if unknown.
    pub fn symbol_address(&self) -> usize {
        self.symbol_address
    }
}

impl fmt::Debug for OpaqueFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueFrame({:#x}", self.ip)?;
        if self.symbol_address != 0 {
            write!(f, " in {:#x}", self.symbol_address)?;
        }
        write!(f, ")")
    }
}

/// Collects frames into a fixed array and spills into a `Vec` only once the
/// array is full.
struct FrameBuffer {
    inline: [OpaqueFrame; INLINE_FRAMES],
    len: usize,
    spilled: Vec<OpaqueFrame>,
}

impl FrameBuffer {
    fn new() -> FrameBuffer {
        FrameBuffer {
            inline: [OpaqueFrame::default(); INLINE_FRAMES],
            len: 0,
            spilled: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.spilled.len() + self.len
    }

    fn push(&mut self, frame: OpaqueFrame) {
        if self.len == INLINE_FRAMES {
            self.spilled.extend_from_slice(&self.inline);
            self.len = 0;
        }
        self.inline[self.len] = frame;
        self.len += 1;
    }

    /// Returns all frames from `start` on as an exactly sized slice.
    fn finish(self, start: usize) -> Box<[OpaqueFrame]> {
        let inline = &self.inline[..self.len];
        if self.spilled.is_empty() {
            return inline.get(start..).unwrap_or_default().into();
        }

        let mut frames = self.spilled;
        frames.extend_from_slice(inline);
        if start >= frames.len() {
            return Box::default();
        }
        frames.drain(..start);
        frames.into_boxed_slice()
    }
}

/// Captures the current call stack, innermost frame first.
///
/// The first returned frame belongs to the caller of this function; the
/// frames of the unwinder and of this function itself are never part of the
/// result.  `skip` drops that many additional frames above the caller, which
/// is useful for helpers that capture on behalf of their own caller.
///
/// The walk always runs to the root of the stack.  The first
/// [`INLINE_FRAMES`] frames are collected without any heap allocation besides
/// the returned slice.  If the unwinder is not supported on the platform the
/// result is empty.
#[inline(never)]
pub fn capture_frames(skip: usize) -> Box<[OpaqueFrame]> {
    let anchor = capture_frames as *const () as usize;
    let mut buffer = FrameBuffer::new();
    let mut anchor_index = None;
    // closest frame above the anchor in memory, used when the unwinder cannot
    // report symbol addresses
    let mut nearest: Option<(usize, usize)> = None;

    backtrace::trace(|frame| {
        let ip = frame.ip() as usize;
        let symbol_address = frame.symbol_address() as usize;
        let index = buffer.len();

        if anchor_index.is_none() {
            if symbol_address == anchor {
                anchor_index = Some(index);
            } else if ip > anchor {
                let distance = ip - anchor;
                if nearest.map_or(true, |(_, best)| distance < best) {
                    nearest = Some((index, distance));
                }
            }
        }

        buffer.push(OpaqueFrame::new(ip, symbol_address));
        true
    });

    let start = match anchor_index.or(nearest.map(|(index, _)| index)) {
        Some(index) => index + 1 + skip,
        None => skip,
    };
    buffer.finish(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> OpaqueFrame {
        OpaqueFrame::new(n, 0)
    }

    fn filled(count: usize) -> FrameBuffer {
        let mut buffer = FrameBuffer::new();
        for n in 0..count {
            buffer.push(frame(n));
        }
        buffer
    }

    #[test]
    fn test_buffer_inline() {
        let frames = filled(10).finish(3);
        assert_eq!(frames.len(), 7);
        assert_eq!(frames[0], frame(3));
        assert_eq!(frames[6], frame(9));
    }

    #[test]
    fn test_buffer_spills_without_truncating() {
        let buffer = filled(INLINE_FRAMES * 2 + 17);
        assert_eq!(buffer.len(), INLINE_FRAMES * 2 + 17);

        let frames = buffer.finish(5);
        assert_eq!(frames.len(), INLINE_FRAMES * 2 + 12);
        for (offset, f) in frames.iter().enumerate() {
            assert_eq!(*f, frame(offset + 5));
        }
    }

    #[test]
    fn test_buffer_exactly_full() {
        let frames = filled(INLINE_FRAMES).finish(0);
        assert_eq!(frames.len(), INLINE_FRAMES);
        assert_eq!(frames[INLINE_FRAMES - 1], frame(INLINE_FRAMES - 1));
    }

    #[test]
    fn test_buffer_start_out_of_range() {
        assert!(filled(4).finish(9).is_empty());
        assert!(filled(INLINE_FRAMES + 1).finish(INLINE_FRAMES + 1).is_empty());
    }

    #[test]
    fn test_program_counter() {
        assert_eq!(OpaqueFrame::new(0x1001, 0x1000).program_counter(), 0x1000);
        assert_eq!(OpaqueFrame::new(0, 0).program_counter(), 0);
    }

    #[test]
    fn test_capture_starts_at_caller() {
        let frames = capture_frames(0);
        assert!(!frames.is_empty());
        let this = test_capture_starts_at_caller as *const () as usize;
        let first = frames[0];
        if first.symbol_address() != 0 {
            assert_eq!(first.symbol_address(), this);
        }
    }
}
