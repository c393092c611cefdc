use std::fmt;

use super::RuntimeError;

/// Which of the machine's three stacks an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Value,
    Environment,
    Call,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StackKind::Value => "value",
            StackKind::Environment => "environment",
            StackKind::Call => "call",
        })
    }
}

/// Capacities of the three stacks, plus the longest string `MAKESTR` may build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub value_stack: usize,
    pub environment_stack: usize,
    pub call_stack: usize,
    pub string_length: usize,
}

impl Limits {
    /// Limits with the given call depth; the environment stack gets one extra
    /// slot for the global frame.
    pub fn with_call_depth(call_stack: usize) -> Self {
        Limits { call_stack, environment_stack: call_stack + 1, ..Limits::default() }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits { value_stack: 1 << 20, environment_stack: 1025, call_stack: 1024, string_length: 1 << 24 }
    }
}

/// A `Vec` with a hard capacity. Storage grows lazily.
pub(crate) struct BoundedStack<T> {
    items: Vec<T>,
    limit: usize,
    kind: StackKind,
}

impl<T> BoundedStack<T> {
    pub fn new(kind: StackKind, limit: usize) -> Self {
        BoundedStack { items: Vec::new(), limit, kind }
    }

    pub fn push(&mut self, item: T) -> Result<(), RuntimeError> {
        if self.items.len() >= self.limit {
            return Err(RuntimeError::StackOverflow { stack: self.kind });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<T, RuntimeError> {
        self.items.pop().ok_or(RuntimeError::StackUnderflow { stack: self.kind })
    }

    pub fn peek(&self) -> Result<&T, RuntimeError> {
        self.items.last().ok_or(RuntimeError::StackUnderflow { stack: self.kind })
    }

    pub fn peek_mut(&mut self) -> Result<&mut T, RuntimeError> {
        self.items.last_mut().ok_or(RuntimeError::StackUnderflow { stack: self.kind })
    }

    /// `depth` slots below the top; 0 is the top itself.
    pub fn peek_at(&self, depth: usize) -> Result<&T, RuntimeError> {
        let len = self.items.len();
        if depth >= len {
            return Err(RuntimeError::StackUnderflow { stack: self.kind });
        }
        Ok(&self.items[len - 1 - depth])
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_at_limit() {
        let mut s = BoundedStack::new(StackKind::Call, 2);
        s.push(1).unwrap();
        s.push(2).unwrap();
        assert!(matches!(
            s.push(3),
            Err(RuntimeError::StackOverflow { stack: StackKind::Call })
        ));
    }

    #[test]
    fn underflow_when_empty() {
        let mut s: BoundedStack<i32> = BoundedStack::new(StackKind::Value, 4);
        assert!(matches!(s.pop(), Err(RuntimeError::StackUnderflow { stack: StackKind::Value })));
        assert!(s.peek().is_err());
    }

    #[test]
    fn peek_at_depth() {
        let mut s = BoundedStack::new(StackKind::Value, 8);
        for i in 0..4 {
            s.push(i).unwrap();
        }
        assert_eq!(*s.peek_at(0).unwrap(), 3);
        assert_eq!(*s.peek_at(3).unwrap(), 0);
        assert!(s.peek_at(4).is_err());
    }

    #[test]
    fn default_limits() {
        let l = Limits::default();
        assert_eq!(l.value_stack, 1_048_576);
        assert_eq!(l.call_stack, 1024);
        assert_eq!(l.environment_stack, l.call_stack + 1);
        assert_eq!(Limits::with_call_depth(10).environment_stack, 11);
    }
}
