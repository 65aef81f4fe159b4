//! Arena allocation for AST nodes.
//!
//! The original `tau-lang` compiler records every AST node it allocates in
//! a process-wide registry and frees the whole registry in one sweep after
//! emission. §9 of the design calls that pattern out as something a
//! systems-language port must replace with either an arena or a tree of
//! owned children; we pick the arena, since it keeps the rest of the
//! pipeline (in particular the analyzer's `node -> type descriptor` side
//! table, which is keyed by node identity) structured exactly like the
//! original.
//!
//! Every node the parser creates is allocated out of one [`Arena`] and
//! referenced by `&'arena` borrow from then on; the arena outlives the
//! parser, analyzer, and emitter, and is dropped only once bytecode has
//! been sealed.

use bumpalo::Bump;

/// A bump allocator producing stable `&'_ T` references.
///
/// References allocated from an `Arena` remain valid for as long as the
/// arena itself is alive, even as further values are allocated.
pub struct Arena<T> {
    bump: Bump,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena { bump: Bump::new(), _marker: std::marker::PhantomData }
    }

    /// Allocates `value`, returning a reference valid for the arena's lifetime.
    pub fn alloc(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Allocates a slice from an `ExactSizeIterator`, used for AST child lists
    /// (call arguments, block statements, struct fields, ...).
    pub fn alloc_slice<I>(&self, items: I) -> &[T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }

    /// Allocates a value of any type out of the same underlying bump region,
    /// ignoring `T`. The AST is a tree of several distinct node types
    /// (expressions, statements, declarations, ...) that all need to share
    /// one arena per §5's "single arena-like container", so callers that
    /// need heterogeneous allocation reach for this instead of `alloc`.
    pub fn alloc_any<V>(&self, value: V) -> &V {
        self.bump.alloc(value)
    }

    /// Heterogeneous counterpart to `alloc_slice`.
    pub fn alloc_slice_any<V, I>(&self, items: I) -> &[V]
    where
        I: IntoIterator<Item = V>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_stable_reference() {
        let arena: Arena<i32> = Arena::new();
        let r1 = arena.alloc(42);
        let r2 = arena.alloc(100);
        assert_eq!(*r1, 42);
        assert_eq!(*r2, 100);
    }

    #[test]
    fn references_remain_valid_after_many_allocations() {
        let arena: Arena<i32> = Arena::new();
        let refs: Vec<&i32> = (0..10_000).map(|i| arena.alloc(i)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i as i32);
        }
    }

    #[test]
    fn alloc_slice_from_vec() {
        let arena: Arena<i32> = Arena::new();
        let slice = arena.alloc_slice(vec![10, 20, 30]);
        assert_eq!(slice, &[10, 20, 30]);
    }

    #[test]
    fn alloc_empty_slice() {
        let arena: Arena<i32> = Arena::new();
        let empty: Vec<i32> = vec![];
        let slice = arena.alloc_slice(empty);
        assert!(slice.is_empty());
    }
}
