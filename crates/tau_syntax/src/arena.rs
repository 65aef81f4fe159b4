//! The arena backing every AST node the parser produces.
//!
//! §5 calls for "a single arena-like container" rather than the original's
//! process-wide node registry. `tau_base::Arena<T>` is generic per `T`, so
//! naively supporting six distinct node types would mean six separate bump
//! regions; instead we keep one region and reach for `Arena`'s type-erased
//! `_any` allocation methods, giving every node kind — expressions, types,
//! statements, declarations, parameters, enumerators — a stable `&'a`
//! reference out of the same underlying memory, the way the original keeps
//! one registry for the whole tree.

use tau_base::Arena;

use crate::ast::{Decl, Enumerator, Expr, Param, Stmt, TypeExpr};

#[derive(Default)]
pub struct AstArena {
    bump: Arena<()>,
}

impl AstArena {
    pub fn new() -> Self {
        AstArena { bump: Arena::new() }
    }

    pub fn alloc_expr<'a>(&'a self, value: Expr<'a>) -> &'a Expr<'a> {
        self.bump.alloc_any(value)
    }

    pub fn alloc_exprs<'a, I>(&'a self, items: I) -> &'a [&'a Expr<'a>]
    where
        I: IntoIterator<Item = &'a Expr<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_any(items)
    }

    pub fn alloc_type<'a>(&'a self, value: TypeExpr<'a>) -> &'a TypeExpr<'a> {
        self.bump.alloc_any(value)
    }

    pub fn alloc_types<'a, I>(&'a self, items: I) -> &'a [&'a TypeExpr<'a>]
    where
        I: IntoIterator<Item = &'a TypeExpr<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_any(items)
    }

    pub fn alloc_stmt<'a>(&'a self, value: Stmt<'a>) -> &'a Stmt<'a> {
        self.bump.alloc_any(value)
    }

    pub fn alloc_stmts<'a, I>(&'a self, items: I) -> &'a [&'a Stmt<'a>]
    where
        I: IntoIterator<Item = &'a Stmt<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_any(items)
    }

    pub fn alloc_decl<'a>(&'a self, value: Decl<'a>) -> &'a Decl<'a> {
        self.bump.alloc_any(value)
    }

    pub fn alloc_decls<'a, I>(&'a self, items: I) -> &'a [&'a Decl<'a>]
    where
        I: IntoIterator<Item = &'a Decl<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_any(items)
    }

    pub fn alloc_param<'a>(&'a self, value: Param<'a>) -> &'a Param<'a> {
        self.bump.alloc_any(value)
    }

    pub fn alloc_params<'a, I>(&'a self, items: I) -> &'a [&'a Param<'a>]
    where
        I: IntoIterator<Item = &'a Param<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_any(items)
    }

    pub fn alloc_enumerator(&self, value: Enumerator) -> &Enumerator {
        self.bump.alloc_any(value)
    }

    pub fn alloc_enumerators<'a, I>(&'a self, items: I) -> &'a [&'a Enumerator]
    where
        I: IntoIterator<Item = &'a Enumerator>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_any(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_base::Span;

    fn span() -> Span {
        Span::new("t.tau", 0, 0, 0, 1)
    }

    #[test]
    fn different_node_kinds_share_one_region() {
        let arena = AstArena::new();
        let e = arena.alloc_expr(Expr { kind: std::cell::Cell::new(crate::ast::ExprKind::LitInt(1)), span: span() });
        let t = arena.alloc_type(TypeExpr {
            kind: crate::ast::TypeExprKind::Primitive(crate::ast::PrimitiveType::I32),
            span: span(),
        });
        assert!(matches!(e.kind.get(), crate::ast::ExprKind::LitInt(1)));
        assert!(matches!(t.kind, crate::ast::TypeExprKind::Primitive(crate::ast::PrimitiveType::I32)));
    }

    #[test]
    fn slices_round_trip() {
        let arena = AstArena::new();
        let a = arena.alloc_expr(Expr { kind: std::cell::Cell::new(crate::ast::ExprKind::LitInt(1)), span: span() });
        let b = arena.alloc_expr(Expr { kind: std::cell::Cell::new(crate::ast::ExprKind::LitInt(2)), span: span() });
        let args = arena.alloc_exprs(vec![a, b]);
        assert_eq!(args.len(), 2);
    }
}
