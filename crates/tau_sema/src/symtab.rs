//! Lexical scopes for name resolution.
//!
//! Grounded on §3.4: a scope is a hash map plus a parent pointer, lookup
//! falls through to the parent on miss. Rather than a tree of owning
//! scopes (which in Rust means either `Rc<RefCell<_>>` or self-referential
//! lifetimes), scopes live in one flat `Vec` and reference their parent by
//! index — the same "flat arena, index-based edges" shape `tau_base::Arena`
//! uses for AST nodes, applied to a tree that needs mutation instead of
//! one-shot allocation.

use std::collections::HashMap;

use tau_base::Symbol;
use tau_syntax::DeclRef;

/// An index into a [`SymbolTable`]'s scope list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

struct Scope<'a> {
    parent: Option<ScopeId>,
    entries: HashMap<Symbol, DeclRef<'a>>,
}

/// The full scope tree built while walking a program. Scopes are never
/// removed once pushed — a child scope's `ScopeId` stays valid for as long
/// as the table does, even after the analyzer has walked back out of it.
pub struct SymbolTable<'a> {
    scopes: Vec<Scope<'a>>,
}

impl<'a> SymbolTable<'a> {
    pub fn new() -> Self {
        SymbolTable { scopes: vec![Scope { parent: None, entries: HashMap::new() }] }
    }

    /// The module-level scope every other scope nests under.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope { parent: Some(parent), entries: HashMap::new() });
        ScopeId(self.scopes.len() - 1)
    }

    /// Inserts `name` into `scope`. Names are unique within one scope: a
    /// second insert of the same name doesn't overwrite the first (the
    /// table keeps only the first binding) and returns that first binding
    /// back to the caller so it can be reported as a redeclaration.
    pub fn insert(&mut self, scope: ScopeId, name: Symbol, decl: DeclRef<'a>) -> Option<DeclRef<'a>> {
        let entries = &mut self.scopes[scope.0].entries;
        if let Some(existing) = entries.get(&name) {
            return Some(*existing);
        }
        entries.insert(name, decl);
        None
    }

    /// Looks up `name` starting at `scope` and walking up through parents.
    pub fn lookup(&self, scope: ScopeId, name: Symbol) -> Option<DeclRef<'a>> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let s = &self.scopes[id.0];
            if let Some(decl) = s.entries.get(&name) {
                return Some(*decl);
            }
            cur = s.parent;
        }
        None
    }

    /// Looks up `name` in `scope` only, without falling through to parents.
    /// Used to tell "redeclared in this scope" (error) apart from
    /// "shadows an outer scope" (warning).
    pub fn lookup_local(&self, scope: ScopeId, name: Symbol) -> Option<DeclRef<'a>> {
        self.scopes[scope.0].entries.get(&name).copied()
    }

    /// True if `name` resolves in some strict ancestor of `scope` (not in
    /// `scope` itself). A fresh declaration that shadows such a binding
    /// gets a warning rather than an error.
    pub fn shadows_outer(&self, scope: ScopeId, name: Symbol) -> bool {
        let mut cur = self.scopes[scope.0].parent;
        while let Some(id) = cur {
            let s = &self.scopes[id.0];
            if s.entries.contains_key(&name) {
                return true;
            }
            cur = s.parent;
        }
        false
    }
}

impl<'a> Default for SymbolTable<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_base::{Interner, Span};
    use tau_syntax::{Decl, DeclKind, Ident};

    fn decl(name: &str) -> Decl<'static> {
        Decl {
            kind: DeclKind::Var { mutable: false, ty: None, init: None },
            name: Ident { name: Symbol::EMPTY, span: Span::new("t.tau", 0, 0, 0, name.len()) },
            span: Span::new("t.tau", 0, 0, 0, name.len()),
        }
    }

    #[test]
    fn lookup_falls_through_to_parent() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let d = decl("x");
        let mut table = SymbolTable::new();
        let root = table.root();
        table.insert(root, x, DeclRef::Decl(&d));
        let child = table.push_scope(root);
        assert!(table.lookup(child, x).is_some());
        assert!(table.lookup_local(child, x).is_none());
    }

    #[test]
    fn second_insert_in_same_scope_returns_the_first_and_keeps_it() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let first = decl("x");
        let second = decl("x");
        let mut table = SymbolTable::new();
        let root = table.root();
        assert!(table.insert(root, x, DeclRef::Decl(&first)).is_none());
        let shadowed = table.insert(root, x, DeclRef::Decl(&second));
        assert!(matches!(shadowed, Some(DeclRef::Decl(d)) if std::ptr::eq(d, &first)));
    }

    #[test]
    fn shadows_outer_is_true_only_for_ancestor_scopes() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let d = decl("x");
        let mut table = SymbolTable::new();
        let root = table.root();
        table.insert(root, x, DeclRef::Decl(&d));
        let child = table.push_scope(root);
        assert!(table.shadows_outer(child, x));
        assert!(!table.shadows_outer(root, x));
    }

    #[test]
    fn unresolved_name_returns_none() {
        let mut interner = Interner::new();
        let y = interner.intern("y");
        let table = SymbolTable::new();
        assert!(table.lookup(table.root(), y).is_none());
    }
}
