use crate::error::Trap;

/// One active procedure invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Index of the procedure in the linked program.
    pub pou: usize,
    /// Offset of the frame in the stack area.
    pub base: u16,
    pub size: usize,
    /// Index of the statement being executed.
    pub pc: usize,
}

/// The call stack: frames laid end to end in the stack area.
pub struct CallStack {
    frames: Vec<Frame>,
    capacity: usize,
}

impl CallStack {
    /// Creates an empty call stack over a stack area of `capacity` bytes.
    /// Frames beyond the 16-bit offset space are not addressable.
    pub fn new(capacity: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            capacity: capacity.min(u16::MAX as usize + 1),
        }
    }

    /// The first free byte of the stack area.
    pub fn top(&self) -> usize {
        self.frames.last().map_or(0, |f| f.base as usize + f.size)
    }

    /// Returns the base of a region of `size` bytes at the top of the stack
    /// without claiming it.
    pub fn reserve(&self, size: usize) -> Result<u16, Trap> {
        let base = self.top();
        if base.checked_add(size).map_or(true, |end| end > self.capacity) {
            return Err(Trap::StackOverflow);
        }
        u16::try_from(base).map_err(|_| Trap::StackOverflow)
    }

    /// Pushes a frame of `size` bytes for procedure `pou`.
    pub fn push(&mut self, pou: usize, size: usize) -> Result<Frame, Trap> {
        let base = self.reserve(size)?;
        let frame = Frame {
            pou,
            base,
            size,
            pc: 0,
        };
        self.frames.push(frame);
        Ok(frame)
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<Frame> {
        self.frames.last().copied()
    }

    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
