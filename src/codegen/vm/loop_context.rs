//! Loop-context stack for `break`/`continue` (spec §4.7). Pushed on
//! entry to any loop, popped on exit; `break`/`continue` emit a jump
//! to the top frame's break/continue label.

use super::bytecode::LabelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    For,
    ForOf,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopFrame {
    pub continue_label: LabelId,
    pub break_label: LabelId,
    pub kind: LoopKind,
}

#[derive(Debug, Default)]
pub struct LoopContextStack {
    frames: Vec<LoopFrame>,
}

impl LoopContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, continue_label: LabelId, break_label: LabelId, kind: LoopKind) {
        self.frames.push(LoopFrame { continue_label, break_label, kind });
    }

    pub fn pop(&mut self) -> Option<LoopFrame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&LoopFrame> {
        self.frames.last()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_is_empty_after_balanced_push_pop() {
        let mut stack = LoopContextStack::new();
        stack.push(LabelId(0), LabelId(1), LoopKind::While);
        stack.push(LabelId(2), LabelId(3), LoopKind::For);
        stack.pop();
        stack.pop();
        assert!(stack.is_empty());
    }

    #[test]
    fn current_frame_is_the_innermost_loop() {
        let mut stack = LoopContextStack::new();
        stack.push(LabelId(0), LabelId(1), LoopKind::While);
        stack.push(LabelId(2), LabelId(3), LoopKind::For);
        assert_eq!(stack.current().unwrap().break_label, LabelId(3));
    }
}
