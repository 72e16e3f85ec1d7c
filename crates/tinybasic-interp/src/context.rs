//! Execution contexts for GOSUB/RETURN.
//!
//! Frames live in an arena indexed by [`FrameId`]. Each frame keeps a link to
//! the frame that called it, so the arena doubles as the call stack: GOSUB
//! pushes a child of the current frame and RETURN pops back to its parent.
//! The root frame is created with the stack and can never be popped.

/// Index of a frame in the [`CallStack`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    pub const ROOT: FrameId = FrameId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Line being executed. May be negative after a GOSUB to a bad target.
    pub current_line: i64,
    pub parent: Option<FrameId>,
}

#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    /// A stack holding only the root frame, positioned at `line`.
    pub fn new(line: i64) -> Self {
        Self {
            frames: vec![Frame {
                current_line: line,
                parent: None,
            }],
        }
    }

    pub fn current_id(&self) -> FrameId {
        FrameId(self.frames.len() - 1)
    }

    pub fn current(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    /// Number of frames, the root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Enter a subroutine: push a child of the current frame starting at `line`.
    pub fn call(&mut self, line: i64) -> FrameId {
        let parent = self.current_id();
        self.frames.push(Frame {
            current_line: line,
            parent: Some(parent),
        });
        self.current_id()
    }

    /// Leave the current subroutine and resume its parent. Returns `None`,
    /// leaving the stack untouched, when the current frame is the root.
    pub fn ret(&mut self) -> Option<FrameId> {
        let parent = self.current().parent?;
        self.frames.pop();
        debug_assert_eq!(self.current_id(), parent);
        Some(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_frame() {
        let stack = CallStack::new(10);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current_id(), FrameId::ROOT);
        assert_eq!(stack.current().current_line, 10);
        assert_eq!(stack.current().parent, None);
    }

    #[test]
    fn test_call_links_parent() {
        let mut stack = CallStack::new(10);
        let child = stack.call(100);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current_id(), child);
        assert_eq!(stack.current().current_line, 100);
        assert_eq!(stack.current().parent, Some(FrameId::ROOT));
        // caller keeps the line of its GOSUB
        assert_eq!(stack.get(FrameId::ROOT).unwrap().current_line, 10);
    }

    #[test]
    fn test_ret_resumes_parent() {
        let mut stack = CallStack::new(10);
        stack.call(100);
        stack.current_mut().current_line = 110;
        stack.call(200);
        assert_eq!(stack.ret().map(FrameId::index), Some(1));
        assert_eq!(stack.current().current_line, 110);
        assert_eq!(stack.ret(), Some(FrameId::ROOT));
        assert_eq!(stack.current().current_line, 10);
    }

    #[test]
    fn test_ret_at_root() {
        let mut stack = CallStack::new(10);
        assert_eq!(stack.ret(), None);
        assert_eq!(stack.depth(), 1);
    }
}
