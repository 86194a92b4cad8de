//! Logical call stack for parent-id capture.
//!
//! The witness records causal nesting: when a wrapped method invokes
//! another wrapped method before completing, the inner call's record
//! carries the outer call's trace id as `parent_id`.
//!
//! The parent is captured at call **start** — whatever is on top of the
//! stack at that instant — and never re-read at completion. With
//! concurrent independent call trees interleaving on one witness the
//! stack is not strictly nested; that case is flagged at debug level
//! and the captured parent stands.

use parking_lot::Mutex;
use sigil_core::TraceId;

#[derive(Debug, Default)]
pub struct CallStack {
    frames: Mutex<Vec<TraceId>>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a call frame, returning the parent id captured at this
    /// moment (the previous top of stack).
    pub fn begin(&self, id: TraceId) -> Option<TraceId> {
        let mut frames = self.frames.lock();
        let parent = frames.last().copied();
        frames.push(id);
        parent
    }

    /// Pop a call frame at completion.
    ///
    /// Completion order can differ from start order when independent
    /// call trees interleave; the frame is removed wherever it sits.
    pub fn end(&self, id: TraceId) {
        let mut frames = self.frames.lock();
        match frames.last() {
            Some(top) if *top == id => {
                frames.pop();
            }
            _ => {
                tracing::debug!(
                    trace_id = %id.as_uuid(),
                    "non-linear call completion, removing frame out of order"
                );
                frames.retain(|frame| *frame != id);
            }
        }
    }

    /// Current innermost in-flight call, if any.
    pub fn current(&self) -> Option<TraceId> {
        self.frames.lock().last().copied()
    }

    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_call_has_no_parent() {
        let stack = CallStack::new();
        let id = TraceId::new();
        assert_eq!(stack.begin(id), None);
        stack.end(id);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn nested_call_captures_outer_as_parent() {
        let stack = CallStack::new();
        let outer = TraceId::new();
        let inner = TraceId::new();

        assert_eq!(stack.begin(outer), None);
        assert_eq!(stack.begin(inner), Some(outer));
        stack.end(inner);
        assert_eq!(stack.current(), Some(outer));
        stack.end(outer);
    }

    #[test]
    fn sibling_calls_share_a_parent() {
        let stack = CallStack::new();
        let outer = TraceId::new();
        stack.begin(outer);

        let first = TraceId::new();
        assert_eq!(stack.begin(first), Some(outer));
        stack.end(first);

        let second = TraceId::new();
        assert_eq!(stack.begin(second), Some(outer));
        stack.end(second);
        stack.end(outer);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn out_of_order_completion_removes_the_right_frame() {
        let stack = CallStack::new();
        let a = TraceId::new();
        let b = TraceId::new();
        stack.begin(a);
        stack.begin(b);

        // a completes before b.
        stack.end(a);
        assert_eq!(stack.current(), Some(b));
        stack.end(b);
        assert_eq!(stack.depth(), 0);
    }
}
