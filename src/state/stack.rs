//! Attribute stacks.
//!
//! One [`AttributeStack`] exists per ordinary attribute type, per
//! (texture unit, texture attribute type), per uniform name and for the
//! shader generator name. Its depth always equals the number of pushed state
//! sets that declared its key.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::attribute::{AttributeRef, OverrideMask};
use crate::state::resolve::resolve_override;
use crate::uniform::Uniform;
use crate::utils::interner::Symbol;

/// Identity comparison used for change detection.
pub trait StackValue: Clone {
    fn same(&self, other: &Self) -> bool;
}

impl StackValue for AttributeRef {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl StackValue for Uniform {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        Uniform::same(self, other)
    }
}

impl StackValue for Symbol {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

#[derive(Debug, Clone)]
pub struct StackEntry<T> {
    pub value: T,
    pub mask: OverrideMask,
}

#[derive(Debug)]
pub struct AttributeStack<T> {
    entries: SmallVec<[StackEntry<T>; 4]>,
    global_default: Option<T>,
    last_applied: Option<T>,
    changed: bool,
}

impl<T> Default for AttributeStack<T> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
            global_default: None,
            last_applied: None,
            changed: false,
        }
    }
}

impl<T: StackValue> AttributeStack<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_global_default(value: T) -> Self {
        Self {
            global_default: Some(value),
            ..Self::default()
        }
    }

    /// Resolves `(value, mask)` against the top and pushes the result.
    pub fn push(&mut self, value: &T, mask: OverrideMask) {
        let entry = resolve_override(self.entries.last(), value, mask);
        self.entries.push(entry);
        self.changed = true;
    }

    /// Pushes an already resolved entry.
    pub fn push_entry(&mut self, entry: StackEntry<T>) {
        self.entries.push(entry);
        self.changed = true;
    }

    pub fn pop(&mut self) -> Option<StackEntry<T>> {
        let entry = self.entries.pop()?;
        self.changed = true;
        Some(entry)
    }

    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<&StackEntry<T>> {
        self.entries.last()
    }

    /// Top-of-stack value, or the global default when empty.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.entries
            .last()
            .map(|e| &e.value)
            .or(self.global_default.as_ref())
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    #[inline]
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// If the stack changed since the last call, clears the flag and returns
    /// the current value.
    pub fn take_changed(&mut self) -> Option<T> {
        if !std::mem::take(&mut self.changed) {
            return None;
        }
        self.current().cloned()
    }

    #[inline]
    #[must_use]
    pub fn last_applied(&self) -> Option<&T> {
        self.last_applied.as_ref()
    }

    /// Whether `value` is what the driver last received from this stack.
    #[inline]
    #[must_use]
    pub fn is_applied(&self, value: &T) -> bool {
        self.last_applied.as_ref().is_some_and(|l| l.same(value))
    }

    #[inline]
    pub fn set_last_applied(&mut self, value: T) {
        self.last_applied = Some(value);
    }

    #[inline]
    #[must_use]
    pub fn global_default(&self) -> Option<&T> {
        self.global_default.as_ref()
    }

    pub fn set_global_default(&mut self, value: T) {
        self.global_default = Some(value);
        self.changed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::interner;

    #[test]
    fn test_current_falls_back_to_default() {
        let a = interner::intern("stack_test_a");
        let b = interner::intern("stack_test_b");
        let mut stack = AttributeStack::with_global_default(a);

        assert_eq!(stack.current(), Some(&a));
        stack.push(&b, OverrideMask::ON);
        assert_eq!(stack.current(), Some(&b));
        stack.pop();
        assert_eq!(stack.current(), Some(&a));
    }

    #[test]
    fn test_push_and_pop_mark_changed() {
        let a = interner::intern("stack_test_a");
        let mut stack = AttributeStack::new();

        stack.push(&a, OverrideMask::ON);
        assert_eq!(stack.take_changed(), Some(a));
        assert_eq!(stack.take_changed(), None);

        stack.pop();
        assert!(stack.is_changed());
        // Empty and no default: nothing to apply.
        assert_eq!(stack.take_changed(), None);
        assert!(!stack.is_changed());
    }

    #[test]
    fn test_push_resolves_overrides() {
        let a = interner::intern("stack_test_a");
        let b = interner::intern("stack_test_b");
        let mut stack = AttributeStack::new();

        stack.push(&a, OverrideMask::ON | OverrideMask::OVERRIDE);
        stack.push(&b, OverrideMask::ON);
        assert_eq!(stack.current(), Some(&a));
        assert_eq!(stack.depth(), 2);

        stack.push(&b, OverrideMask::ON | OverrideMask::PROTECTED);
        assert_eq!(stack.current(), Some(&b));
    }

    #[test]
    fn test_last_applied_is_identity() {
        let a = Uniform::float("uStackTest", 1.0);
        let twin = Uniform::float("uStackTest", 1.0);
        let mut stack = AttributeStack::new();

        stack.set_last_applied(a.clone());
        assert!(stack.is_applied(&a));
        assert!(!stack.is_applied(&twin));
    }
}
