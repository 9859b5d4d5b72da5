use crate::value::Value;

static NULL: Value = Value::Null;

/// LIFO value stack. Underflow is tolerated: popping or peeking an empty
/// stack yields `Null`.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<Value>,
}

impl Stack {
    pub fn new() -> Self {
        Stack::default()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    pub fn pop(&mut self) -> Value {
        self.items.pop().unwrap_or_default()
    }

    pub fn peek(&self) -> &Value {
        self.items.last().unwrap_or(&NULL)
    }

    /// Element `depth` positions below the top (0 is the top).
    pub fn peek_at(&self, depth: usize) -> Option<&Value> {
        let index = self.items.len().checked_sub(depth + 1)?;
        self.items.get(index)
    }

    /// Element at `index` counted from the bottom.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn truncate(&mut self, size: usize) {
        self.items.truncate(size);
    }

    /// Exchanges the top two elements. Returns false when fewer than two exist.
    pub fn swap_top(&mut self) -> bool {
        let n = self.items.len();
        if n < 2 {
            return false;
        }
        self.items.swap(n - 1, n - 2);
        true
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_empty_yields_null() {
        let mut s = Stack::new();
        assert_eq!(s.pop(), Value::Null);
        assert_eq!(s.peek(), &Value::Null);
        assert!(s.is_empty());
    }

    #[test]
    fn peek_at_counts_from_top() {
        let mut s = Stack::new();
        s.push(1.0);
        s.push(2.0);
        s.push(3.0);
        assert_eq!(s.peek_at(0), Some(&Value::from(3.0)));
        assert_eq!(s.peek_at(2), Some(&Value::from(1.0)));
        assert_eq!(s.peek_at(3), None);
        assert_eq!(s.get(0), Some(&Value::from(1.0)));
    }

    #[test]
    fn swap_top_needs_two() {
        let mut s = Stack::new();
        s.push("a");
        assert!(!s.swap_top());
        s.push("b");
        assert!(s.swap_top());
        assert_eq!(s.pop(), Value::from("a"));
        assert_eq!(s.pop(), Value::from("b"));
    }

    #[test]
    fn truncate_shrinks_only() {
        let mut s = Stack::new();
        s.push(1.0);
        s.push(2.0);
        s.truncate(5);
        assert_eq!(s.len(), 2);
        s.truncate(1);
        assert_eq!(s.as_slice(), &[Value::from(1.0)]);
    }
}
