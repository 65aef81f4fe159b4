//! The semantic analyzer (§4.4): name resolution, type checking, and the
//! in-place identifier-to-declaration rewrite.
//!
//! Mirrors the original's single-pass `analyzer_analyze_*` walk, generalized
//! the way the rest of this port generalizes the original's recursive tree
//! walks: one method per node kind, a `SymbolTable` for scopes, a
//! `NodeTypeTable` for the per-node result type, and a `TypeStore` for the
//! hash-consed descriptors themselves.

use std::collections::HashMap;

use tau_base::{Interner, Result as BaseResult, Span, SpannedError, Symbol, Warning};
use tau_syntax::{
    BinaryOp, Decl, DeclKind, DeclRef, Expr, ExprKind, MemberOp, Param, Program, Stmt, StmtKind, TypeExpr,
    TypeExprKind, UnaryOp,
};
use tau_types::{Abi as TypeAbi, DeclId, TypeId, TypeStore};

use crate::symtab::{ScopeId, SymbolTable};
use crate::typetable::NodeTypeTable;

/// What kind of construct encloses the statement currently being analyzed.
/// `break`/`continue` search this stack outward for the nearest `Loop`;
/// a `Defer` in between aborts that search (§4.4: "a `defer` severs the
/// break/continue search path").
enum Construct {
    Loop,
    Defer,
    Fun { ret: TypeId },
    Gen { yield_ty: TypeId },
}

/// Ties an analyzed program's warnings to its result, the ambient-stack
/// rule that the core never prints diagnostics itself.
pub struct Analysis {
    pub warnings: Vec<Warning>,
}

pub struct Analyzer<'a> {
    interner: &'a Interner,
    pub types: TypeStore,
    symtab: SymbolTable<'a>,
    type_table: NodeTypeTable,
    warnings: Vec<Warning>,
    /// `Decl` node address -> the `DeclId` assigned to it, so repeated
    /// references to the same struct/union/enum/mod collapse to one TypeId.
    decl_ids: HashMap<usize, DeclId>,
    /// The inverse of `decl_ids`, so member/field lookups can walk back
    /// from a `Struct`/`Union` descriptor to its field list.
    decls_by_id: HashMap<DeclId, &'a Decl<'a>>,
    constructs: Vec<Construct>,
    /// `For` stmt node address -> the synthetic placeholder its induction
    /// variable's references were bound to, so a downstream pass (the
    /// bytecode emitter) can find the same identity the loop body's
    /// `DeclRef::Param` occurrences already point at rather than minting a
    /// second, different placeholder of its own.
    for_loop_vars: HashMap<usize, &'a Param<'a>>,
}

impl<'a> Analyzer<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Analyzer {
            interner,
            types: TypeStore::new(),
            symtab: SymbolTable::new(),
            type_table: NodeTypeTable::new(),
            warnings: Vec::new(),
            decl_ids: HashMap::new(),
            decls_by_id: HashMap::new(),
            constructs: Vec::new(),
            for_loop_vars: HashMap::new(),
        }
    }

    pub fn type_of<T>(&self, node: &T) -> Option<TypeId> {
        self.type_table.get(node)
    }

    /// Looks up the declaration a `struct`/`union`/`enum`/`mod` `DeclId`
    /// was minted from, so a downstream pass (the bytecode emitter's
    /// struct layout computation) can walk its field list without
    /// re-deriving the node-identity mapping `decl_id_for` already built.
    pub fn decl_for(&self, id: DeclId) -> Option<&'a Decl<'a>> {
        self.decls_by_id.get(&id).copied()
    }

    /// Resolves a type expression to its hash-consed [`TypeId`], exposed so
    /// the bytecode emitter can type a struct/union field it walks outside
    /// of the analyzer's own statement/expression traversal.
    pub fn resolve_type(&mut self, ty: &'a TypeExpr<'a>) -> BaseResult<TypeId> {
        self.resolve_type_expr(ty)
    }

    /// The interner shared by every stage of the pipeline, exposed read-only
    /// so a downstream pass can resolve a declaration's name without its own
    /// copy of the interner (the bytecode emitter's `main`-entry-point
    /// lookup).
    pub fn interner(&self) -> &'a Interner {
        self.interner
    }

    /// The induction-variable placeholder a `for` loop's body was bound to,
    /// keyed by the `for` statement's own node address. `None` for any
    /// other statement kind.
    pub fn loop_var_for(&self, for_stmt: &Stmt<'a>) -> Option<&'a Param<'a>> {
        self.for_loop_vars.get(&(for_stmt as *const Stmt<'a> as usize)).copied()
    }

    pub fn analyze_program(&mut self, program: &Program<'a>) -> BaseResult<Analysis> {
        let root = self.symtab.root();
        self.declare_all(root, program.decls)?;
        for decl in program.decls {
            self.analyze_decl_body(root, decl)?;
        }
        Ok(Analysis { warnings: std::mem::take(&mut self.warnings) })
    }

    // --- declarations ---

    fn decl_id_for(&mut self, decl: &'a Decl<'a>) -> DeclId {
        let addr = decl as *const Decl<'a> as usize;
        if let Some(&id) = self.decl_ids.get(&addr) {
            return id;
        }
        let id = DeclId::from_ptr(decl as *const Decl<'a>);
        self.decl_ids.insert(addr, id);
        self.decls_by_id.insert(id, decl);
        id
    }

    /// Registers every name in `decls` into `scope` before analyzing any of
    /// their bodies, so mutually-recursive top-level declarations (and a
    /// function calling itself) resolve regardless of declaration order.
    fn declare_all(&mut self, scope: ScopeId, decls: &'a [&'a Decl<'a>]) -> BaseResult<()> {
        for decl in decls {
            self.declare_one(scope, decl)?;
        }
        Ok(())
    }

    fn declare_one(&mut self, scope: ScopeId, decl: &'a Decl<'a>) -> BaseResult<()> {
        let name_sym = decl.name.name;
        if self.symtab.lookup_local(scope, name_sym).is_some() {
            return Err(SpannedError::resolution(
                format!("'{}' is already declared in this scope", self.interner.resolve(name_sym)),
                decl.name.span.clone(),
            ));
        }
        if self.symtab.shadows_outer(scope, name_sym) {
            self.warnings.push(Warning::ShadowedSymbol {
                name: self.interner.resolve(name_sym).to_string(),
                span: decl.name.span.clone(),
            });
        }
        self.symtab.insert(scope, name_sym, DeclRef::Decl(decl));

        // Compute and cache the declaration's own type eagerly, so a
        // reference to it from elsewhere (including its own body, for
        // recursion) finds a type immediately.
        let ty = self.decl_type(scope, decl)?;
        self.type_table.insert(decl, ty);
        Ok(())
    }

    fn decl_type(&mut self, scope: ScopeId, decl: &'a Decl<'a>) -> BaseResult<TypeId> {
        // Matched by value (`DeclKind` is `Copy`) rather than `&decl.kind`,
        // so fields that are themselves `&'a` references (e.g. `params`)
        // come through with their original `'a` lifetime instead of being
        // re-wrapped behind the shorter lifetime of a `&decl.kind` borrow.
        match decl.kind {
            DeclKind::Module { .. } => {
                let id = self.decl_id_for(decl);
                Ok(self.types.mk_mod(id))
            }
            DeclKind::Struct { .. } => {
                let id = self.decl_id_for(decl);
                Ok(self.types.mk_struct(id))
            }
            DeclKind::Union { .. } => {
                let id = self.decl_id_for(decl);
                Ok(self.types.mk_union(id))
            }
            DeclKind::Enum { .. } => {
                let id = self.decl_id_for(decl);
                Ok(self.types.mk_enum(id))
            }
            DeclKind::Fun { abi, params, variadic, ret, .. } => {
                let param_tys = self.resolve_param_types(params)?;
                let ret_ty = self.resolve_type_expr(ret)?;
                let variadic = variadic || params.last().map_or(false, |p| p.variadic);
                let abi = lower_abi(abi.unwrap_or(tau_syntax::Abi::Tau));
                Ok(self.types.mk_fun(param_tys, variadic, ret_ty, abi))
            }
            DeclKind::Gen { params, yield_ty, .. } => {
                let param_tys = self.resolve_param_types(params)?;
                let yield_ty = self.resolve_type_expr(yield_ty)?;
                Ok(self.types.mk_gen(param_tys, yield_ty))
            }
            DeclKind::Var { mutable, ty, init } => {
                let base = match (ty, init) {
                    (Some(t), _) => self.resolve_type_expr(t)?,
                    // An expression's type is always a `ref` to its storage
                    // (§4.4); a variable with no declared type infers the
                    // referent type, not the reference itself.
                    (None, Some(expr)) => {
                        let expr_ty = self.analyze_expr(scope, expr)?;
                        self.types.remove_ref(expr_ty)
                    }
                    (None, None) => {
                        return Err(SpannedError::type_error(
                            "variable declaration needs either a type or an initializer",
                            decl.span.clone(),
                        ))
                    }
                };
                if mutable {
                    self.types.mk_mut(base).map_err(|e| SpannedError::type_error(e.0, decl.span.clone()))
                } else {
                    Ok(base)
                }
            }
        }
    }

    fn resolve_param_types(&mut self, params: &'a [&'a Param<'a>]) -> BaseResult<Vec<TypeId>> {
        params.iter().map(|p| self.resolve_type_expr(p.ty)).collect()
    }

    /// Analyzes a declaration's body (function/generator block, nested
    /// variable initializer) in `scope`. The declaration's own name and
    /// type were already installed by [`Analyzer::declare_one`].
    fn analyze_decl_body(&mut self, scope: ScopeId, decl: &'a Decl<'a>) -> BaseResult<()> {
        // Matched by value (`DeclKind` is `Copy`) so the `&'a`-lifetimed
        // fields keep their real lifetime instead of being bound behind the
        // shorter lifetime of a `&decl.kind` borrow.
        match decl.kind {
            DeclKind::Module { members } => {
                let inner = self.symtab.push_scope(scope);
                self.declare_all(inner, members)?;
                for member in members {
                    self.analyze_decl_body(inner, member)?;
                }
            }
            DeclKind::Struct { .. } | DeclKind::Union { .. } | DeclKind::Enum { .. } => {}
            DeclKind::Fun { params, ret, body, .. } => {
                let ret_ty = self.resolve_type_expr(ret)?;
                if let Some(body) = body {
                    let inner = self.symtab.push_scope(scope);
                    self.bind_params(inner, params)?;
                    self.constructs.push(Construct::Fun { ret: ret_ty });
                    self.analyze_stmt(inner, body)?;
                    self.constructs.pop();
                }
            }
            DeclKind::Gen { params, yield_ty, body, .. } => {
                let yield_ty = self.resolve_type_expr(yield_ty)?;
                if let Some(body) = body {
                    let inner = self.symtab.push_scope(scope);
                    self.bind_params(inner, params)?;
                    self.constructs.push(Construct::Gen { yield_ty });
                    self.analyze_stmt(inner, body)?;
                    self.constructs.pop();
                }
            }
            DeclKind::Var { init, .. } => {
                if let Some(init_expr) = init {
                    let init_ty = self.analyze_expr(scope, init_expr)?;
                    let declared = self.type_table.get(decl).expect("decl type computed in declare_one");
                    if !self.types.is_implicitly_convertible(init_ty, declared) {
                        return Err(SpannedError::type_error(
                            "initializer type doesn't match the declared variable type",
                            decl.span.clone(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn bind_params(&mut self, scope: ScopeId, params: &'a [&'a Param<'a>]) -> BaseResult<()> {
        for param in params {
            let ty = self.resolve_type_expr(param.ty)?;
            self.type_table.insert(*param, ty);
            if let Some(name) = param.name {
                if self.symtab.shadows_outer(scope, name.name) {
                    self.warnings
                        .push(Warning::ShadowedSymbol { name: self.interner.resolve(name.name).to_string(), span: name.span.clone() });
                }
                if let Some(_existing) = self.symtab.insert(scope, name.name, DeclRef::Param(*param)) {
                    return Err(SpannedError::resolution(
                        format!("parameter '{}' is declared twice", self.interner.resolve(name.name)),
                        name.span.clone(),
                    ));
                }
            }
        }
        Ok(())
    }

    // --- type expressions ---

    fn resolve_type_expr(&mut self, ty: &'a TypeExpr<'a>) -> BaseResult<TypeId> {
        // Matched by value (`TypeExprKind` is `Copy`) so the `&'a`-lifetimed
        // fields keep their real lifetime instead of being bound behind the
        // shorter lifetime of a `&ty.kind` borrow.
        let id = match ty.kind {
            TypeExprKind::Primitive(p) => self.primitive_type_id(p),
            TypeExprKind::Named(ident) => {
                let resolved = self
                    .symtab
                    .lookup(self.root_scope(), ident.name)
                    .ok_or_else(|| SpannedError::resolution(format!("undefined type '{}'", self.interner.resolve(ident.name)), ident.span.clone()))?;
                match resolved {
                    DeclRef::Decl(d) if matches!(d.kind, DeclKind::Struct { .. } | DeclKind::Union { .. } | DeclKind::Enum { .. }) => {
                        self.type_table.get(d).expect("decl type computed in declare_one")
                    }
                    _ => return Err(SpannedError::resolution("name does not refer to a struct, union, or enum", ident.span.clone())),
                }
            }
            TypeExprKind::Mut(inner) => {
                let base = self.resolve_type_expr(inner)?;
                self.types.mk_mut(base).map_err(|e| SpannedError::type_error(e.0, ty.span.clone()))?
            }
            TypeExprKind::Const(inner) => {
                let base = self.resolve_type_expr(inner)?;
                self.types.mk_const(base).map_err(|e| SpannedError::type_error(e.0, ty.span.clone()))?
            }
            TypeExprKind::Ptr(inner) => {
                let base = self.resolve_type_expr(inner)?;
                self.types.mk_ptr(base).map_err(|e| SpannedError::type_error(e.0, ty.span.clone()))?
            }
            TypeExprKind::Array(inner, len) => {
                let base = self.resolve_type_expr(inner)?;
                self.types.mk_array(base, len).map_err(|e| SpannedError::type_error(e.0, ty.span.clone()))?
            }
            TypeExprKind::Ref(inner) => {
                let base = self.resolve_type_expr(inner)?;
                self.types.mk_ref(base).map_err(|e| SpannedError::type_error(e.0, ty.span.clone()))?
            }
            TypeExprKind::Opt(inner) => {
                let base = self.resolve_type_expr(inner)?;
                self.types.mk_opt(base).map_err(|e| SpannedError::type_error(e.0, ty.span.clone()))?
            }
            TypeExprKind::Fun { abi, params, variadic, ret } => {
                let param_tys: Vec<TypeId> = params.iter().map(|p| self.resolve_type_expr(p)).collect::<BaseResult<_>>()?;
                let ret_ty = self.resolve_type_expr(ret)?;
                self.types.mk_fun(param_tys, variadic, ret_ty, lower_abi(abi))
            }
            TypeExprKind::Gen { params, yield_ty, .. } => {
                let param_tys: Vec<TypeId> = params.iter().map(|p| self.resolve_type_expr(p)).collect::<BaseResult<_>>()?;
                let yield_id = self.resolve_type_expr(yield_ty)?;
                self.types.mk_gen(param_tys, yield_id)
            }
        };
        Ok(id)
    }

    fn primitive_type_id(&self, p: tau_syntax::PrimitiveType) -> TypeId {
        use tau_syntax::PrimitiveType as P;
        match p {
            P::I8 => self.types.i8(),
            P::I16 => self.types.i16(),
            P::I32 => self.types.i32(),
            P::I64 => self.types.i64(),
            P::Isize => self.types.isize(),
            P::U8 => self.types.u8(),
            P::U16 => self.types.u16(),
            P::U32 => self.types.u32(),
            P::U64 => self.types.u64(),
            P::Usize => self.types.usize(),
            P::F32 => self.types.f32(),
            P::F64 => self.types.f64(),
            P::Bool => self.types.bool_(),
            P::Unit => self.types.unit(),
            P::Null => self.types.null(),
            P::Type => self.types.type_(),
        }
    }

    fn root_scope(&self) -> ScopeId {
        self.symtab.root()
    }

    // --- statements ---

    fn analyze_stmt(&mut self, scope: ScopeId, stmt: &'a Stmt<'a>) -> BaseResult<()> {
        // Matched by value (`StmtKind` is `Copy`) so the `&'a`-lifetimed
        // fields keep their real lifetime instead of being bound behind the
        // shorter lifetime of a `&stmt.kind` borrow.
        match stmt.kind {
            StmtKind::Expr(e) => {
                self.analyze_expr(scope, e)?;
            }
            StmtKind::Block(stmts) => {
                let inner = self.symtab.push_scope(scope);
                for s in stmts {
                    self.analyze_stmt(inner, s)?;
                }
            }
            StmtKind::If(cond, then, else_) => {
                let cond_ty = self.analyze_expr(scope, cond)?;
                self.require_bool(cond_ty, cond.span.clone())?;
                let then_scope = self.symtab.push_scope(scope);
                self.analyze_stmt(then_scope, then)?;
                if let Some(else_) = else_ {
                    let else_scope = self.symtab.push_scope(scope);
                    self.analyze_stmt(else_scope, else_)?;
                }
            }
            StmtKind::While(cond, body) => {
                let cond_ty = self.analyze_expr(scope, cond)?;
                self.require_bool(cond_ty, cond.span.clone())?;
                let inner = self.symtab.push_scope(scope);
                self.constructs.push(Construct::Loop);
                self.analyze_stmt(inner, body)?;
                self.constructs.pop();
            }
            StmtKind::For { var, range, body } => {
                // Restricted to explicit-bound ranges (`a..b`), which type
                // to a plain integer via binary-op typing; see DESIGN.md.
                let range_ty = self.analyze_expr(scope, range)?;
                if !self.types.is_integer(range_ty) {
                    return Err(SpannedError::type_error("`for` range must be an integer range expression", range.span.clone()));
                }
                let placeholder = self.loop_var_placeholder(var.name);
                self.type_table.insert(placeholder, range_ty);
                self.for_loop_vars.insert(stmt as *const Stmt<'a> as usize, placeholder);
                let inner = self.symtab.push_scope(scope);
                self.symtab.insert(inner, var.name, DeclRef::Param(placeholder));
                self.constructs.push(Construct::Loop);
                self.analyze_stmt(inner, body)?;
                self.constructs.pop();
            }
            StmtKind::Break | StmtKind::Continue => {
                self.require_enclosing_loop(stmt.span.clone())?;
            }
            StmtKind::Return(expr) => {
                let ret_ty = self
                    .enclosing_fun_ret()
                    .ok_or_else(|| SpannedError::flow("`return` outside a function", stmt.span.clone()))?;
                let value_ty = match expr {
                    Some(e) => self.analyze_expr(scope, e)?,
                    None => self.types.unit(),
                };
                if !self.types.is_implicitly_convertible(value_ty, ret_ty) {
                    return Err(SpannedError::type_error("return value doesn't match the function's return type", stmt.span.clone()));
                }
            }
            StmtKind::Yield(expr) => {
                let yield_ty = self
                    .enclosing_gen_yield()
                    .ok_or_else(|| SpannedError::flow("`yield` outside a generator", stmt.span.clone()))?;
                let value_ty = self.analyze_expr(scope, expr)?;
                if !self.types.is_implicitly_convertible(value_ty, yield_ty) {
                    return Err(SpannedError::type_error("yielded value doesn't match the generator's yield type", stmt.span.clone()));
                }
            }
            StmtKind::Defer(inner_stmt) => {
                self.constructs.push(Construct::Defer);
                self.analyze_stmt(scope, inner_stmt)?;
                self.constructs.pop();
            }
            StmtKind::Decl(decl) => {
                self.declare_one(scope, decl)?;
                self.analyze_decl_body(scope, decl)?;
            }
        }
        Ok(())
    }

    /// A synthetic parameter-shaped binding for a `for` loop's induction
    /// variable. The loop has no `Param` node of its own in the AST, but
    /// `SymbolTable`/`NodeTypeTable` both key off a node address, so the
    /// induction variable needs *some* address to hang its type off of;
    /// this leaks one rather than threading a new `DeclRef` variant through
    /// just for loop headers. Its own `ty` field is never read — the real
    /// type is recorded in `type_table` by the caller.
    fn loop_var_placeholder(&self, name: Symbol) -> &'a Param<'a> {
        Box::leak(Box::new(Param {
            name: Some(tau_syntax::Ident { name, span: Span::new("", 0, 0, 0, 0) }),
            ty: Box::leak(Box::new(TypeExpr { kind: TypeExprKind::Primitive(tau_syntax::PrimitiveType::I64), span: Span::new("", 0, 0, 0, 0) })),
            default: None,
            variadic: false,
            span: Span::new("", 0, 0, 0, 0),
        }))
    }

    fn require_bool(&self, ty: TypeId, span: Span) -> BaseResult<()> {
        if ty != self.types.bool_() {
            return Err(SpannedError::type_error("condition must be bool", span));
        }
        Ok(())
    }

    fn require_enclosing_loop(&self, span: Span) -> BaseResult<()> {
        for c in self.constructs.iter().rev() {
            match c {
                Construct::Loop => return Ok(()),
                Construct::Defer => {
                    return Err(SpannedError::flow("`break`/`continue` cannot cross a `defer`", span));
                }
                _ => continue,
            }
        }
        Err(SpannedError::flow("`break`/`continue` outside a loop", span))
    }

    fn enclosing_fun_ret(&self) -> Option<TypeId> {
        self.constructs.iter().rev().find_map(|c| match c {
            Construct::Fun { ret } => Some(*ret),
            _ => None,
        })
    }

    fn enclosing_gen_yield(&self) -> Option<TypeId> {
        self.constructs.iter().rev().find_map(|c| match c {
            Construct::Gen { yield_ty } => Some(*yield_ty),
            _ => None,
        })
    }

    // --- expressions ---

    fn analyze_expr(&mut self, scope: ScopeId, expr: &'a Expr<'a>) -> BaseResult<TypeId> {
        let ty = self.analyze_expr_kind(scope, expr)?;
        self.type_table.insert(expr, ty);
        Ok(ty)
    }

    fn analyze_expr_kind(&mut self, scope: ScopeId, expr: &'a Expr<'a>) -> BaseResult<TypeId> {
        match expr.kind.get() {
            ExprKind::LitInt(_) => Ok(self.types.i32()),
            ExprKind::LitFloat(_) => Ok(self.types.f64()),
            ExprKind::LitString(_) => {
                let u8 = self.types.u8();
                self.types.mk_ptr(u8).map_err(|e| SpannedError::type_error(e.0, expr.span.clone()))
            }
            ExprKind::LitChar(_) => Ok(self.types.u8()),
            ExprKind::LitBool(_) => Ok(self.types.bool_()),
            ExprKind::LitNull => Ok(self.types.null()),
            ExprKind::Ident(ident) => {
                let resolved = self
                    .symtab
                    .lookup(scope, ident.name)
                    .ok_or_else(|| SpannedError::resolution(format!("undefined symbol '{}'", self.interner.resolve(ident.name)), ident.span.clone()))?;
                let decl_ty = match resolved {
                    DeclRef::Decl(d) => {
                        if matches!(d.kind, DeclKind::Struct { .. } | DeclKind::Union { .. } | DeclKind::Enum { .. } | DeclKind::Module { .. }) {
                            return Err(SpannedError::resolution("a type or module name cannot be used as a value", ident.span.clone()));
                        }
                        self.type_table.get(d).expect("decl type computed in declare_one")
                    }
                    DeclRef::Param(p) => self.type_table.get(p).expect("param type computed in bind_params"),
                };
                expr.kind.set(ExprKind::Decl(resolved));
                let r = self.types.mk_ref(decl_ty).map_err(|e| SpannedError::type_error(e.0, expr.span.clone()))?;
                Ok(r)
            }
            ExprKind::Decl(resolved) => {
                // Already rewritten (e.g. the expression was re-analyzed).
                let decl_ty = match resolved {
                    DeclRef::Decl(d) => self.type_table.get(d).expect("decl type computed in declare_one"),
                    DeclRef::Param(p) => self.type_table.get(p).expect("param type computed in bind_params"),
                };
                self.types.mk_ref(decl_ty).map_err(|e| SpannedError::type_error(e.0, expr.span.clone()))
            }
            ExprKind::Member(base, member, op) => self.analyze_member(scope, base, member, op, expr.span.clone()),
            ExprKind::Call(callee, args) => self.analyze_call(scope, callee, args, expr.span.clone()),
            ExprKind::Subscript(base, index) => {
                let base_ty = self.analyze_expr(scope, base)?;
                let index_ty = self.analyze_expr(scope, index)?;
                if !self.types.is_integer(index_ty) {
                    return Err(SpannedError::type_error("subscript index must be an integer", index.span.clone()));
                }
                let underlying = self.types.underlying_type(base_ty);
                let elem = match self.types.resolve(underlying) {
                    tau_types::TypeKind::Array(inner, _) => *inner,
                    tau_types::TypeKind::Ptr(inner) => *inner,
                    _ => return Err(SpannedError::type_error("subscript requires an array or pointer", base.span.clone())),
                };
                self.types.mk_ref(elem).map_err(|e| SpannedError::type_error(e.0, expr.span.clone()))
            }
            ExprKind::Unary(op, operand) => self.analyze_unary(scope, op, operand, expr.span.clone()),
            ExprKind::Binary(op, lhs, rhs) => self.analyze_binary(scope, op, lhs, rhs, expr.span.clone()),
            ExprKind::Is(operand, ty) => {
                self.analyze_expr(scope, operand)?;
                self.resolve_type_expr(ty)?;
                Ok(self.types.bool_())
            }
            ExprKind::As(operand, ty) => {
                self.analyze_expr(scope, operand)?;
                self.resolve_type_expr(ty)
            }
            ExprKind::Sizeof(ty) | ExprKind::Alignof(ty) => {
                self.resolve_type_expr(ty)?;
                Ok(self.types.usize())
            }
        }
    }

    fn analyze_member(
        &mut self,
        scope: ScopeId,
        base: &'a Expr<'a>,
        member: tau_syntax::Ident,
        op: MemberOp,
        span: Span,
    ) -> BaseResult<TypeId> {
        let base_ty = self.analyze_expr(scope, base)?;
        let target = match op {
            MemberOp::Dot => self.types.underlying_type(base_ty),
            MemberOp::ArrowDot => {
                let stripped = self.types.remove_const_mut_ref(base_ty);
                match self.types.resolve(stripped) {
                    tau_types::TypeKind::Ptr(inner) => self.types.underlying_type(*inner),
                    _ => return Err(SpannedError::type_error("`*.` requires a pointer operand", base.span.clone())),
                }
            }
            MemberOp::OptDot => {
                let stripped = self.types.remove_const_mut_ref(base_ty);
                match self.types.resolve(stripped) {
                    tau_types::TypeKind::Opt(inner) => self.types.underlying_type(*inner),
                    _ => return Err(SpannedError::type_error("`?.` requires an optional operand", base.span.clone())),
                }
            }
        };
        if !self.types.is_composite(target) {
            return Err(SpannedError::type_error("member access requires a struct or union", base.span.clone()));
        }
        let decl_id = match self.types.resolve(target) {
            tau_types::TypeKind::Struct(id) | tau_types::TypeKind::Union(id) => *id,
            _ => unreachable!("is_composite guarantees Struct or Union"),
        };
        let decl = *self.decls_by_id.get(&decl_id).expect("composite TypeId always backed by a registered decl");
        // Matched by value (`DeclKind` is `Copy`) so `fields` keeps its real
        // `'a` lifetime instead of being bound behind a shorter reborrow.
        let fields = match decl.kind {
            DeclKind::Struct { fields } | DeclKind::Union { fields } => fields,
            _ => unreachable!("Struct/Union TypeKind always backed by a Struct/Union decl"),
        };
        let field = fields
            .iter()
            .find(|f| f.name.map(|n| n.name) == Some(member.name))
            .ok_or_else(|| SpannedError::resolution(format!("no member named '{}'", self.interner.resolve(member.name)), member.span.clone()))?;
        let field_ty = self.resolve_type_expr(field.ty)?;
        self.types.mk_ref(field_ty).map_err(|e| SpannedError::type_error(e.0, span))
    }

    fn analyze_call(&mut self, scope: ScopeId, callee: &'a Expr<'a>, args: &'a [&'a Expr<'a>], span: Span) -> BaseResult<TypeId> {
        let callee_ty = self.analyze_expr(scope, callee)?;
        let underlying = self.types.underlying_type(callee_ty);
        if !self.types.is_invokable(underlying) {
            return Err(SpannedError::type_error("callee is not a function or generator", callee.span.clone()));
        }
        let (params, variadic, result_ty) = match self.types.resolve(underlying) {
            tau_types::TypeKind::Fun { sig, ret, .. } => (sig.params.clone(), sig.variadic, *ret),
            tau_types::TypeKind::Gen { sig, yield_ty } => (sig.params.clone(), sig.variadic, *yield_ty),
            _ => unreachable!("is_invokable guarantees Fun or Gen"),
        };
        if variadic {
            if args.len() < params.len() {
                return Err(SpannedError::type_error("not enough arguments", span));
            }
        } else if args.len() != params.len() {
            return Err(SpannedError::type_error("wrong number of arguments", span));
        }
        for (arg, param_ty) in args.iter().zip(params.iter()) {
            let arg_ty = self.analyze_expr(scope, arg)?;
            if !self.types.is_implicitly_convertible(arg_ty, *param_ty) {
                return Err(SpannedError::type_error("argument type doesn't match parameter type", arg.span.clone()));
            }
        }
        for extra in args.iter().skip(params.len()) {
            self.analyze_expr(scope, extra)?;
        }
        Ok(result_ty)
    }

    fn analyze_unary(&mut self, scope: ScopeId, op: UnaryOp, operand: &'a Expr<'a>, span: Span) -> BaseResult<TypeId> {
        match op {
            UnaryOp::Sizeof | UnaryOp::Alignof => {
                self.analyze_expr(scope, operand)?;
                Ok(self.types.usize())
            }
            UnaryOp::PreIncr | UnaryOp::PreDecr | UnaryOp::PostIncr | UnaryOp::PostDecr => {
                let ty = self.analyze_expr(scope, operand)?;
                let (is_mut_ref, inner) = self.is_mut_ref(ty);
                if !is_mut_ref || !self.types.is_arithmetic(self.types.remove_const_mut(inner)) {
                    return Err(SpannedError::type_error("++/-- require a mutable arithmetic reference", operand.span.clone()));
                }
                Ok(ty)
            }
            UnaryOp::Pos | UnaryOp::Neg | UnaryOp::BitNot => {
                let ty = self.analyze_expr(scope, operand)?;
                let stripped = self.types.remove_const_mut_ref(ty);
                if !self.types.is_arithmetic(stripped) {
                    return Err(SpannedError::type_error("unary +/-/~ require an arithmetic operand", operand.span.clone()));
                }
                Ok(stripped)
            }
            UnaryOp::Not => {
                let ty = self.analyze_expr(scope, operand)?;
                let stripped = self.types.remove_const_mut_ref(ty);
                if stripped != self.types.bool_() {
                    return Err(SpannedError::type_error("`!` requires a bool operand", operand.span.clone()));
                }
                Ok(self.types.bool_())
            }
            UnaryOp::Deref => {
                let ty = self.analyze_expr(scope, operand)?;
                let stripped = self.types.remove_const_mut_ref(ty);
                match self.types.resolve(stripped) {
                    tau_types::TypeKind::Ptr(inner) => self.types.mk_ref(*inner).map_err(|e| SpannedError::type_error(e.0, span)),
                    _ => Err(SpannedError::type_error("`*` requires a pointer operand", operand.span.clone())),
                }
            }
            UnaryOp::AddrOf => {
                let ty = self.analyze_expr(scope, operand)?;
                let stripped = self.types.remove_const_mut(ty);
                match self.types.resolve(stripped) {
                    tau_types::TypeKind::Ref(inner) => self.types.mk_ptr(*inner).map_err(|e| SpannedError::type_error(e.0, span)),
                    _ => Err(SpannedError::type_error("`&` requires a reference operand", operand.span.clone())),
                }
            }
        }
    }

    /// True if `ty` is `ref mut T` (after stripping an outer `const`), along
    /// with the `ref`'s pointee type (still wrapped in `mut` if present).
    fn is_mut_ref(&self, ty: TypeId) -> (bool, TypeId) {
        let stripped = self.types.remove_const(ty);
        match self.types.resolve(stripped) {
            tau_types::TypeKind::Ref(inner) => {
                let is_mut = matches!(self.types.resolve(*inner), tau_types::TypeKind::Mut(_));
                (is_mut, *inner)
            }
            _ => (false, ty),
        }
    }

    fn analyze_binary(&mut self, scope: ScopeId, op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>, span: Span) -> BaseResult<TypeId> {
        if op == BinaryOp::Assign {
            let lhs_ty = self.analyze_expr(scope, lhs)?;
            let rhs_ty = self.analyze_expr(scope, rhs)?;
            let (is_mut, inner) = self.is_mut_ref(lhs_ty);
            if !is_mut {
                return Err(SpannedError::type_error("assignment target must be a mutable reference", lhs.span.clone()));
            }
            let target = self.types.remove_mut(inner);
            if !self.types.is_implicitly_convertible(rhs_ty, target) {
                return Err(SpannedError::type_error("assigned value's type doesn't match the target", rhs.span.clone()));
            }
            return Ok(lhs_ty);
        }

        let lhs_ty = self.analyze_expr(scope, lhs)?;
        let rhs_ty = self.analyze_expr(scope, rhs)?;
        let lhs_bare = self.types.remove_const_mut_ref(lhs_ty);
        let rhs_bare = self.types.remove_const_mut_ref(rhs_ty);
        let both_const = self.is_const_qualified(lhs_ty) && self.is_const_qualified(rhs_ty);

        let result = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if !self.types.is_arithmetic(lhs_bare) || !self.types.is_arithmetic(rhs_bare) {
                    return Err(SpannedError::type_error("arithmetic operators require arithmetic operands", span));
                }
                if self.types.is_signed(lhs_bare) != self.types.is_signed(rhs_bare)
                    && self.types.is_integer(lhs_bare)
                    && self.types.is_integer(rhs_bare)
                {
                    self.warnings.push(Warning::MixedSignedness { span: span.clone() });
                }
                self.types.promote(lhs_bare, rhs_bare)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if !self.types.is_integer(lhs_bare) || !self.types.is_integer(rhs_bare) {
                    return Err(SpannedError::type_error("bitwise operators require integer operands", span));
                }
                self.types.promote(lhs_bare, rhs_bare)
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                if !self.types.is_integer(lhs_bare) || !self.types.is_integer(rhs_bare) {
                    return Err(SpannedError::type_error("shift operators require integer operands", span));
                }
                lhs_bare
            }
            BinaryOp::And | BinaryOp::Or => {
                if lhs_bare != self.types.bool_() || rhs_bare != self.types.bool_() {
                    return Err(SpannedError::type_error("logical operators require bool operands", span));
                }
                self.types.bool_()
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !self.types.is_arithmetic(lhs_bare) || !self.types.is_arithmetic(rhs_bare) {
                    return Err(SpannedError::type_error("comparison operators require arithmetic operands", span));
                }
                self.types.bool_()
            }
            BinaryOp::Range => {
                if !self.types.is_integer(lhs_bare) || !self.types.is_integer(rhs_bare) {
                    return Err(SpannedError::type_error("range bounds must be integers", span));
                }
                self.types.promote(lhs_bare, rhs_bare)
            }
            BinaryOp::Assign => unreachable!("handled above"),
        };

        if both_const {
            self.types.mk_const(result).map_err(|e| SpannedError::type_error(e.0, span))
        } else {
            Ok(result)
        }
    }

    fn is_const_qualified(&self, ty: TypeId) -> bool {
        let stripped = self.types.remove_ref(ty);
        matches!(self.types.resolve(stripped), tau_types::TypeKind::Const(_))
    }
}

fn lower_abi(abi: tau_syntax::Abi) -> TypeAbi {
    match abi {
        tau_syntax::Abi::Tau => TypeAbi::Tau,
        tau_syntax::Abi::Cdecl => TypeAbi::Cdecl,
        tau_syntax::Abi::Stdcall => TypeAbi::Stdcall,
        tau_syntax::Abi::Win64 => TypeAbi::Win64,
        tau_syntax::Abi::Sysv64 => TypeAbi::Sysv64,
        tau_syntax::Abi::Aapcs => TypeAbi::Aapcs,
        tau_syntax::Abi::Fastcall => TypeAbi::Fastcall,
        tau_syntax::Abi::Vectorcall => TypeAbi::Vectorcall,
        tau_syntax::Abi::Thiscall => TypeAbi::Thiscall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_base::{Interner, Span};
    use tau_syntax::{AstArena, Ident, PrimitiveType};

    fn span() -> Span {
        Span::new("t.tau", 0, 0, 0, 1)
    }

    #[test]
    fn resolves_and_rewrites_a_top_level_variable_reference() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let x = interner.intern("x");

        let ty_i32 = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::I32), span: span() });
        let lit = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitInt(1)), span: span() });
        let var_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_i32), init: Some(lit) },
            name: Ident { name: x, span: span() },
            span: span(),
        });

        let ident_expr = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Ident(Ident { name: x, span: span() })), span: span() });
        let use_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_i32), init: Some(ident_expr) },
            name: Ident { name: interner.intern("y"), span: span() },
            span: span(),
        });

        let program = Program { decls: arena.alloc_decls(vec![var_decl, use_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        analyzer.analyze_program(&program).unwrap();

        assert!(matches!(ident_expr.kind.get(), ExprKind::Decl(DeclRef::Decl(d)) if std::ptr::eq(d, var_decl)));
    }

    #[test]
    fn undefined_identifier_is_a_resolution_error() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let ident_expr = arena.alloc_expr(Expr {
            kind: std::cell::Cell::new(ExprKind::Ident(Ident { name: interner.intern("missing"), span: span() })),
            span: span(),
        });
        let stmt = arena.alloc_stmt(Stmt { kind: StmtKind::Expr(ident_expr), span: span() });
        let ty_unit = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::Unit), span: span() });
        let fun_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Fun { abi: None, params: &[], variadic: false, ret: ty_unit, body: Some(stmt) },
            name: Ident { name: interner.intern("f"), span: span() },
            span: span(),
        });
        let program = Program { decls: arena.alloc_decls(vec![fun_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        let err = analyzer.analyze_program(&program).unwrap_err();
        assert_eq!(err.kind, tau_base::Kind::Resolution);
    }

    #[test]
    fn redeclaration_in_the_same_scope_is_an_error() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let ty_i32 = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::I32), span: span() });
        let lit = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitInt(1)), span: span() });
        let first = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_i32), init: Some(lit) },
            name: Ident { name: x, span: span() },
            span: span(),
        });
        let second = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_i32), init: Some(lit) },
            name: Ident { name: x, span: span() },
            span: span(),
        });
        let program = Program { decls: arena.alloc_decls(vec![first, second]) };
        let mut analyzer = Analyzer::new(&interner);
        let err = analyzer.analyze_program(&program).unwrap_err();
        assert_eq!(err.kind, tau_base::Kind::Resolution);
    }

    #[test]
    fn recursive_function_resolves_its_own_name() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let f = interner.intern("f");
        let ty_unit = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::Unit), span: span() });

        let self_ref = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Ident(Ident { name: f, span: span() })), span: span() });
        let call = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Call(self_ref, &[])), span: span() });
        let stmt = arena.alloc_stmt(Stmt { kind: StmtKind::Expr(call), span: span() });

        let fun_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Fun { abi: None, params: &[], variadic: false, ret: ty_unit, body: Some(stmt) },
            name: Ident { name: f, span: span() },
            span: span(),
        });
        let program = Program { decls: arena.alloc_decls(vec![fun_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        analyzer.analyze_program(&program).unwrap();
        assert!(matches!(self_ref.kind.get(), ExprKind::Decl(DeclRef::Decl(d)) if std::ptr::eq(d, fun_decl)));
    }

    #[test]
    fn break_outside_a_loop_is_a_flow_error() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let brk = arena.alloc_stmt(Stmt { kind: StmtKind::Break, span: span() });
        let ty_unit = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::Unit), span: span() });
        let fun_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Fun { abi: None, params: &[], variadic: false, ret: ty_unit, body: Some(brk) },
            name: Ident { name: interner.intern("f"), span: span() },
            span: span(),
        });
        let program = Program { decls: arena.alloc_decls(vec![fun_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        let err = analyzer.analyze_program(&program).unwrap_err();
        assert_eq!(err.kind, tau_base::Kind::Flow);
    }

    #[test]
    fn defer_severs_the_break_search_path() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let brk = arena.alloc_stmt(Stmt { kind: StmtKind::Break, span: span() });
        let deferred = arena.alloc_stmt(Stmt { kind: StmtKind::Defer(brk), span: span() });
        let cond = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitBool(true)), span: span() });
        let while_stmt = arena.alloc_stmt(Stmt { kind: StmtKind::While(cond, deferred), span: span() });
        let ty_unit = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::Unit), span: span() });
        let fun_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Fun { abi: None, params: &[], variadic: false, ret: ty_unit, body: Some(while_stmt) },
            name: Ident { name: interner.intern("f"), span: span() },
            span: span(),
        });
        let program = Program { decls: arena.alloc_decls(vec![fun_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        let err = analyzer.analyze_program(&program).unwrap_err();
        assert_eq!(err.kind, tau_base::Kind::Flow);
    }

    #[test]
    fn mixed_signedness_arithmetic_is_a_warning_not_an_error() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let ty_i32 = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::I32), span: span() });
        let lit_i = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitInt(1)), span: span() });
        let x = interner.intern("x");
        let var_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_i32), init: Some(lit_i) },
            name: Ident { name: x, span: span() },
            span: span(),
        });
        let ty_u32 = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::U32), span: span() });
        let lit_u = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitInt(2)), span: span() });
        let y_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_u32), init: Some(lit_u) },
            name: Ident { name: interner.intern("y"), span: span() },
            span: span(),
        });
        let x_ref = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Ident(Ident { name: x, span: span() })), span: span() });
        let y_ref = arena.alloc_expr(Expr {
            kind: std::cell::Cell::new(ExprKind::Ident(Ident { name: interner.intern("y"), span: span() })),
            span: span(),
        });
        let sum = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Binary(BinaryOp::Add, x_ref, y_ref)), span: span() });
        let z_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: None, init: Some(sum) },
            name: Ident { name: interner.intern("z"), span: span() },
            span: span(),
        });
        let program = Program { decls: arena.alloc_decls(vec![var_decl, y_decl, z_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        let analysis = analyzer.analyze_program(&program).unwrap();
        assert!(analysis.warnings.iter().any(|w| matches!(w, Warning::MixedSignedness { .. })));
    }
}
