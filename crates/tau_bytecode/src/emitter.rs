//! Walks an analyzed AST and emits a [`crate::Program`] (§3.5, §4.5, §6).
//!
//! Tau's bytecode is a register machine, but the emitter treats it as a
//! stack machine laid on top: every expression's codegen leaves exactly one
//! value of its own type pushed on `SP`, and every consumer pops its
//! operands back off. `A`/`B`/`C`/`D` are scratch registers with no meaning
//! across statement boundaries; `F` is the one exception, reserved for the
//! module's frame base (see `emit_program`) so a function body can still
//! reach a top-level `var` after its own prologue has moved `BP`.
//!
//! Grounded on `original_source/src/codegen.c`'s single-pass
//! `codegen_emit_*` walk: one method per statement/expression kind, address
//! computation split out from value loading the same way `codegen_lvalue`
//! is split from `codegen_expr`.

use std::collections::HashMap;
use std::fmt;

use tau_base::SpannedError;
use tau_syntax::{
    BinaryOp, Decl, DeclKind, DeclRef, Expr, ExprKind, MemberOp, Param, Program as AstProgram, Stmt, StmtKind,
    UnaryOp,
};
use tau_sema::Analyzer;
use tau_types::{DeclId, TypeId, TypeKind};

use crate::addr::Addr;
use crate::opcode::{Opcode, Width};
use crate::operand::{Imm, Operand};
use crate::program::{LabelId, Program, UnresolvedLabel};
use crate::register::Register;

/// Everything that can go wrong turning an analyzed AST into bytecode: the
/// analysis itself failing, an unresolved label surviving to `backpatch`,
/// or one of this pass's own lowering limitations (see the module doc and
/// DESIGN.md's `tau_bytecode` section for the full list).
#[derive(Debug)]
pub enum EmitError {
    Analysis(SpannedError),
    Label(UnresolvedLabel),
    Lowering(String),
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::Analysis(e) => write!(f, "{e}"),
            EmitError::Label(e) => write!(f, "{e}"),
            EmitError::Lowering(msg) => write!(f, "emit error: {msg}"),
        }
    }
}

impl std::error::Error for EmitError {}

impl From<SpannedError> for EmitError {
    fn from(e: SpannedError) -> Self {
        EmitError::Analysis(e)
    }
}

impl From<UnresolvedLabel> for EmitError {
    fn from(e: UnresolvedLabel) -> Self {
        EmitError::Label(e)
    }
}

fn lowering(msg: impl Into<String>) -> EmitError {
    EmitError::Lowering(msg.into())
}

// Scratch register family indices, in `Register::decode`'s W64 numbering
// (see register.rs). `F`'s index (10) is never used here: it is reserved
// for the module frame base.
const REG_A: u8 = 0;
const REG_B: u8 = 2;
const REG_C: u8 = 4;
const REG_D: u8 = 6;

fn reg(width: Width, family_index: u8) -> Register {
    Register::decode(family_index, width).expect("scratch family index has a view at every width")
}

/// A function body's local storage: `BP`-relative offsets for its params
/// and locals, plus the `continue`/`break` targets of any loop currently
/// being emitted.
#[derive(Default)]
struct Frame {
    locals: HashMap<usize, (i64, TypeId)>,
    next_local_offset: i64,
    loop_labels: Vec<(LabelId, LabelId)>,
}

impl Frame {
    fn new() -> Frame {
        Frame::default()
    }
}

/// A struct/union's field layout, computed on demand and cached per
/// `DeclId` since a type can be accessed many times across a function body.
struct Layout {
    fields: Vec<(tau_base::Symbol, i64, TypeId)>,
    total_size: u64,
}

struct Emitter<'e, 'a> {
    analyzer: &'e mut Analyzer<'a>,
    program: Program,
    decl_labels: HashMap<usize, LabelId>,
    /// Top-level `var` declarations, addressed relative to the persistent
    /// `F` register rather than the current function's `BP`.
    globals: HashMap<usize, (i64, TypeId)>,
    layouts: HashMap<DeclId, Layout>,
    frame: Frame,
}

/// Walks `program` (already analyzed by `analyzer`) and emits a complete,
/// backpatched [`Program`]. Fails if analysis itself rejects the program,
/// if a label is referenced but never defined (an emitter bug, not a user
/// error), or if the program uses a construct this lowering doesn't support
/// (see DESIGN.md).
pub fn emit_program<'a>(analyzer: &mut Analyzer<'a>, program: &AstProgram<'a>) -> Result<Program, EmitError> {
    let mut emitter = Emitter {
        analyzer,
        program: Program::new(),
        decl_labels: HashMap::new(),
        globals: HashMap::new(),
        layouts: HashMap::new(),
        frame: Frame::new(),
    };
    emitter.emit_program(program)?;
    emitter.program.backpatch()?;
    Ok(emitter.program)
}

fn decl_addr(decl: &Decl) -> usize {
    decl as *const Decl as usize
}

fn param_addr(param: &Param) -> usize {
    param as *const Param as usize
}

impl<'e, 'a> Emitter<'e, 'a> {
    // --- expression type normalization ---

    /// An expression's value type, stripped of the `ref` (and any
    /// `mut`/`const`/`opt`) wrapping the analyzer places around every
    /// place-producing expression's result. Declaration/parameter types are
    /// never `ref`-wrapped in the first place, so callers reading a
    /// `Decl`/`Param`'s own type use `analyzer.type_of` directly instead of
    /// this helper.
    fn expr_type(&self, expr: &Expr) -> TypeId {
        let ty = self.analyzer.type_of(expr).expect("expression typed during analysis");
        self.analyzer.types.underlying_type(ty)
    }

    fn width_of(&mut self, ty: TypeId) -> Result<Width, EmitError> {
        Ok(Width::from_bytes(self.type_size(ty)?))
    }

    fn is_signed_or_float(&self, ty: TypeId) -> bool {
        self.analyzer.types.is_signed(ty) || self.analyzer.types.is_float(ty)
    }

    // --- sizing ---

    /// A type's size in bytes. `TypeStore::size_of` panics on aggregate
    /// kinds, so every kind it can't answer for is handled here first.
    fn type_size(&mut self, ty: TypeId) -> Result<u64, EmitError> {
        match self.analyzer.types.resolve(ty).clone() {
            TypeKind::Struct(id) | TypeKind::Union(id) => Ok(self.struct_layout(id)?.total_size),
            // No tag representation exists in this lowering; every
            // enumerator is carried as a plain 8-byte integer.
            TypeKind::Enum(_) => Ok(8),
            // A function/generator value is its code pointer.
            TypeKind::Fun { .. } | TypeKind::Gen { .. } => Ok(8),
            TypeKind::Mod(_) | TypeKind::Type => Ok(0),
            TypeKind::Array(inner, len) => Ok(self.type_size(inner)? * len),
            TypeKind::Mut(inner) | TypeKind::Const(inner) | TypeKind::Opt(inner) => self.type_size(inner),
            _ => Ok(self.analyzer.types.size_of(ty)),
        }
    }

    fn struct_decl_id(&self, ty: TypeId) -> Result<DeclId, EmitError> {
        let ty = self.analyzer.types.underlying_type(ty);
        match self.analyzer.types.resolve(ty) {
            TypeKind::Struct(id) | TypeKind::Union(id) => Ok(*id),
            other => Err(lowering(format!("expected a struct or union type, found {other:?}"))),
        }
    }

    fn pointee_type(&self, ty: TypeId) -> Result<TypeId, EmitError> {
        match self.analyzer.types.resolve(ty) {
            TypeKind::Ptr(inner) => Ok(*inner),
            other => Err(lowering(format!("expected a pointer type, found {other:?}"))),
        }
    }

    fn struct_layout(&mut self, id: DeclId) -> Result<&Layout, EmitError> {
        if !self.layouts.contains_key(&id) {
            let decl = self.analyzer.decl_for(id).ok_or_else(|| lowering("struct/union decl not found"))?;
            let fields = match decl.kind {
                DeclKind::Struct { fields } => fields,
                DeclKind::Union { fields } => fields,
                _ => return Err(lowering("decl id does not name a struct or union")),
            };
            let is_union = matches!(decl.kind, DeclKind::Union { .. });
            let mut laid_out = Vec::new();
            let mut offset = 0i64;
            let mut total = 0u64;
            for field in fields {
                let field_ty = self.analyzer.resolve_type(field.ty)?;
                let size = self.type_size(field_ty)?;
                let name = field.name.map(|i| i.name).unwrap_or(tau_base::Symbol::EMPTY);
                if is_union {
                    laid_out.push((name, 0, field_ty));
                    total = total.max(size);
                } else {
                    laid_out.push((name, offset, field_ty));
                    offset += size as i64;
                    total += size;
                }
            }
            self.layouts.insert(id, Layout { fields: laid_out, total_size: total });
        }
        Ok(self.layouts.get(&id).unwrap())
    }

    // --- storage lookup ---

    fn lookup_storage(&self, addr: usize) -> Option<(Register, i64, TypeId)> {
        if let Some(&(offset, ty)) = self.frame.locals.get(&addr) {
            return Some((Register::Bp, offset, ty));
        }
        self.globals.get(&addr).map(|&(offset, ty)| (Register::F, offset, ty))
    }

    // --- top-level program ---

    fn emit_program(&mut self, program: &AstProgram<'a>) -> Result<(), EmitError> {
        self.predeclare(program.decls);
        let main = self.find_main(program.decls)?;

        self.program.emit2(Opcode::Mov, &Operand::Reg(Register::Bp), &Operand::Reg(Register::Sp), Width::W64);
        self.program.emit2(Opcode::Mov, &Operand::Reg(Register::F), &Operand::Reg(Register::Bp), Width::W64);

        let locals_size = self.measure_toplevel(program.decls)?;
        if locals_size > 0 {
            self.program.emit2(
                Opcode::Sub,
                &Operand::Reg(Register::Sp),
                &Operand::Imm(Imm::Int(locals_size as i64)),
                Width::W64,
            );
        }
        self.emit_toplevel_inits(program.decls)?;

        if let Some((label, ret_ty)) = main {
            self.program.emit_jump(Opcode::Call, label);
            let width = self.width_of(ret_ty)?;
            if width != Width::None {
                self.program.emit1(Opcode::Psh, &Operand::Reg(reg(width, REG_A)), width);
            }
        }
        self.program.emit0(Opcode::Hlt);

        self.emit_fun_bodies(program.decls)?;
        Ok(())
    }

    fn predeclare(&mut self, decls: &'a [&'a Decl<'a>]) {
        for decl in decls {
            match decl.kind {
                DeclKind::Module { members } => self.predeclare(members),
                DeclKind::Fun { .. } | DeclKind::Gen { .. } => {
                    let label = self.program.new_label();
                    self.decl_labels.insert(decl_addr(decl), label);
                }
                _ => {}
            }
        }
    }

    fn find_main(&mut self, decls: &'a [&'a Decl<'a>]) -> Result<Option<(LabelId, TypeId)>, EmitError> {
        let main_sym = match self.analyzer.interner().lookup("main") {
            Some(sym) => sym,
            None => return Ok(None),
        };
        for decl in decls {
            match decl.kind {
                DeclKind::Module { members } => {
                    if let Some(found) = self.find_main(members)? {
                        return Ok(Some(found));
                    }
                }
                DeclKind::Fun { ret, .. } if decl.name.name == main_sym => {
                    let label = self.decl_labels[&decl_addr(decl)];
                    let ret_ty = self.analyzer.resolve_type(ret)?;
                    return Ok(Some((label, ret_ty)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn measure_toplevel(&mut self, decls: &'a [&'a Decl<'a>]) -> Result<u64, EmitError> {
        let mut total = 0u64;
        for decl in decls {
            match decl.kind {
                DeclKind::Module { members } => total += self.measure_toplevel(members)?,
                DeclKind::Var { .. } => {
                    let ty = self.analyzer.type_of(*decl).expect("decl typed during analysis");
                    total += self.type_size(ty)?;
                }
                _ => {}
            }
        }
        Ok(total)
    }

    fn emit_toplevel_inits(&mut self, decls: &'a [&'a Decl<'a>]) -> Result<(), EmitError> {
        for decl in decls {
            match decl.kind {
                DeclKind::Module { members } => self.emit_toplevel_inits(members)?,
                DeclKind::Var { init, .. } => self.emit_var_decl(decl, init, true)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn emit_fun_bodies(&mut self, decls: &'a [&'a Decl<'a>]) -> Result<(), EmitError> {
        for decl in decls {
            match decl.kind {
                DeclKind::Module { members } => self.emit_fun_bodies(members)?,
                DeclKind::Fun { params, body: Some(body), .. } => self.emit_fun_body(decl, params, body)?,
                DeclKind::Gen { params, body: Some(body), .. } => self.emit_fun_body(decl, params, body)?,
                _ => {}
            }
        }
        Ok(())
    }

    // --- var declarations ---

    /// Emits a `var` declaration's initializer. At top level there is no
    /// pre-pass, so storage is allocated here (bookkeeping shares
    /// `frame.next_local_offset` with the per-function pre-pass, but lands
    /// in `globals` rather than `frame.locals`). Inside a function body,
    /// `measure_stmt`'s pre-pass has already allocated the local's offset;
    /// this only looks it up, so emission never advances the offset twice.
    fn emit_var_decl(&mut self, decl: &'a Decl<'a>, init: Option<&'a Expr<'a>>, toplevel: bool) -> Result<(), EmitError> {
        let (base, offset, ty) = if toplevel {
            let ty = self.analyzer.type_of(decl).expect("decl typed during analysis");
            let size = self.type_size(ty)?;
            let offset = self.frame.next_local_offset - size as i64;
            self.frame.next_local_offset = offset;
            self.globals.insert(decl_addr(decl), (offset, ty));
            (Register::F, offset, ty)
        } else {
            let (offset, ty) = *self
                .frame
                .locals
                .get(&decl_addr(decl))
                .expect("local var offset already computed by measure_stmt");
            (Register::Bp, offset, ty)
        };

        if let Some(init) = init {
            let width = self.width_of(ty)?;
            if width != Width::None {
                self.emit_expr(init)?;
                let r = reg(width, REG_A);
                self.program.emit1(Opcode::Pop, &Operand::Reg(r), width);
                self.program.emit2(Opcode::Mov, &Operand::Mem(Addr::base_offset(base, offset)), &Operand::Reg(r), width);
            }
        }
        Ok(())
    }

    // --- functions ---

    fn emit_fun_body(&mut self, decl: &'a Decl<'a>, params: &'a [&'a Param<'a>], body: &'a Stmt<'a>) -> Result<(), EmitError> {
        self.frame = Frame::new();
        let label = self.decl_labels[&decl_addr(decl)];
        self.program.define_label(label);
        self.program.emit1(Opcode::Psh, &Operand::Reg(Register::Bp), Width::W64);
        self.program.emit2(Opcode::Mov, &Operand::Reg(Register::Bp), &Operand::Reg(Register::Sp), Width::W64);

        // Params sit above the return address and saved BP (`BP+0` = saved
        // BP, `BP+8` = return IP), in the order the caller pushed them.
        let mut offset = 16i64;
        for param in params {
            let ty = self.analyzer.type_of(*param).expect("param typed during analysis");
            let size = self.type_size(ty)?;
            self.frame.locals.insert(param_addr(param), (offset, ty));
            offset += size as i64;
        }

        let locals_size = self.measure_stmt(body)?;
        if locals_size > 0 {
            self.program.emit2(
                Opcode::Sub,
                &Operand::Reg(Register::Sp),
                &Operand::Imm(Imm::Int(locals_size as i64)),
                Width::W64,
            );
        }

        self.emit_stmt(body)?;

        // Fallthrough epilogue, for a body with no explicit `return` on
        // every path (analysis doesn't enforce exhaustive returns; falling
        // off the end of a non-`unit` function is a lowering gap we accept).
        self.program.emit2(Opcode::Mov, &Operand::Reg(Register::Sp), &Operand::Reg(Register::Bp), Width::W64);
        self.program.emit1(Opcode::Pop, &Operand::Reg(Register::Bp), Width::W64);
        self.program.emit0(Opcode::Ret);
        Ok(())
    }

    /// Pre-pass over a function body computing each local's `BP`-relative
    /// offset and the frame's total size, in the same structural order
    /// `emit_stmt` visits. Both branches of an `if` get real offsets even
    /// though only one runs at a time — a documented over-allocation.
    fn measure_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<u64, EmitError> {
        match stmt.kind {
            StmtKind::Block(stmts) => {
                let mut total = 0;
                for s in stmts {
                    total += self.measure_stmt(s)?;
                }
                Ok(total)
            }
            StmtKind::If(_, then, else_) => {
                let mut total = self.measure_stmt(then)?;
                if let Some(else_) = else_ {
                    total += self.measure_stmt(else_)?;
                }
                Ok(total)
            }
            StmtKind::While(_, body) => self.measure_stmt(body),
            StmtKind::For { body, .. } => {
                let placeholder = self.analyzer.loop_var_for(stmt).expect("for loop has a bound induction variable");
                let mut total = 0u64;
                let ty = self.analyzer.type_of(placeholder).expect("induction var typed during analysis");
                let size = self.type_size(ty)?;
                // induction variable and the cached end bound, both `size` wide.
                let off1 = self.frame.next_local_offset - size as i64;
                self.frame.next_local_offset = off1;
                self.frame.locals.insert(param_addr(placeholder), (off1, ty));
                let off2 = self.frame.next_local_offset - size as i64;
                self.frame.next_local_offset = off2;
                total += size * 2;
                total += self.measure_stmt(body)?;
                Ok(total)
            }
            StmtKind::Defer(inner) => self.measure_stmt(inner),
            StmtKind::Decl(decl) => {
                if let DeclKind::Var { .. } = decl.kind {
                    let ty = self.analyzer.type_of(decl).expect("decl typed during analysis");
                    let size = self.type_size(ty)?;
                    let offset = self.frame.next_local_offset - size as i64;
                    self.frame.next_local_offset = offset;
                    self.frame.locals.insert(decl_addr(decl), (offset, ty));
                    Ok(size)
                } else {
                    Ok(0)
                }
            }
            StmtKind::Expr(_) | StmtKind::Break | StmtKind::Continue | StmtKind::Return(_) | StmtKind::Yield(_) => Ok(0),
        }
    }

    // --- statements ---

    fn emit_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<(), EmitError> {
        match stmt.kind {
            StmtKind::Expr(expr) => {
                let ty = self.expr_type(expr);
                let width = self.width_of(ty)?;
                self.emit_expr(expr)?;
                if width != Width::None {
                    self.program.emit1(Opcode::Pop, &Operand::Reg(reg(width, REG_A)), width);
                }
                Ok(())
            }
            StmtKind::Block(stmts) => {
                let mut defers = Vec::new();
                for s in stmts {
                    if let StmtKind::Defer(inner) = s.kind {
                        defers.push(inner);
                    } else {
                        self.emit_stmt(s)?;
                    }
                }
                for inner in defers.into_iter().rev() {
                    self.emit_stmt(inner)?;
                }
                Ok(())
            }
            StmtKind::If(cond, then, else_) => self.emit_if(cond, then, else_),
            StmtKind::While(cond, body) => self.emit_while(cond, body),
            StmtKind::For { range, body, .. } => self.emit_for(stmt, range, body),
            StmtKind::Break => {
                let (_, end) = *self.frame.loop_labels.last().expect("break only occurs inside a loop");
                self.program.emit_jump(Opcode::Jmp, end);
                Ok(())
            }
            StmtKind::Continue => {
                let (cont, _) = *self.frame.loop_labels.last().expect("continue only occurs inside a loop");
                self.program.emit_jump(Opcode::Jmp, cont);
                Ok(())
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    let ty = self.expr_type(value);
                    let width = self.width_of(ty)?;
                    self.emit_expr(value)?;
                    if width != Width::None {
                        self.program.emit1(Opcode::Pop, &Operand::Reg(reg(width, REG_A)), width);
                    }
                }
                self.program.emit2(Opcode::Mov, &Operand::Reg(Register::Sp), &Operand::Reg(Register::Bp), Width::W64);
                self.program.emit1(Opcode::Pop, &Operand::Reg(Register::Bp), Width::W64);
                self.program.emit0(Opcode::Ret);
                Ok(())
            }
            // No coroutine/generator state machine exists in this lowering;
            // a `yield` is emitted as a plain discard (its value is
            // computed, for side effects, then dropped).
            StmtKind::Yield(value) => {
                let ty = self.expr_type(value);
                let width = self.width_of(ty)?;
                self.emit_expr(value)?;
                if width != Width::None {
                    self.program.emit1(Opcode::Pop, &Operand::Reg(reg(width, REG_A)), width);
                }
                Ok(())
            }
            StmtKind::Defer(inner) => self.emit_stmt(inner),
            StmtKind::Decl(decl) => match decl.kind {
                DeclKind::Var { init, .. } => self.emit_var_decl(decl, init, false),
                _ => Ok(()),
            },
        }
    }

    fn emit_branch_if_false(&mut self, cond: &'a Expr<'a>, target: LabelId) -> Result<(), EmitError> {
        self.emit_expr(cond)?;
        let r = reg(Width::W8, REG_A);
        self.program.emit1(Opcode::Pop, &Operand::Reg(r), Width::W8);
        self.program.emit2(Opcode::Cmp, &Operand::Reg(r), &Operand::Imm(Imm::Int(0)), Width::W8);
        self.program.emit_jump(Opcode::Je, target);
        Ok(())
    }

    fn emit_branch_if_true(&mut self, cond: &'a Expr<'a>, target: LabelId) -> Result<(), EmitError> {
        self.emit_expr(cond)?;
        let r = reg(Width::W8, REG_A);
        self.program.emit1(Opcode::Pop, &Operand::Reg(r), Width::W8);
        self.program.emit2(Opcode::Cmp, &Operand::Reg(r), &Operand::Imm(Imm::Int(0)), Width::W8);
        self.program.emit_jump(Opcode::Jne, target);
        Ok(())
    }

    fn emit_if(&mut self, cond: &'a Expr<'a>, then: &'a Stmt<'a>, else_: Option<&'a Stmt<'a>>) -> Result<(), EmitError> {
        let else_label = self.program.new_label();
        let end_label = self.program.new_label();
        self.emit_branch_if_false(cond, else_label)?;
        self.emit_stmt(then)?;
        self.program.emit_jump(Opcode::Jmp, end_label);
        self.program.define_label(else_label);
        if let Some(else_) = else_ {
            self.emit_stmt(else_)?;
        }
        self.program.define_label(end_label);
        Ok(())
    }

    fn emit_while(&mut self, cond: &'a Expr<'a>, body: &'a Stmt<'a>) -> Result<(), EmitError> {
        let cond_label = self.program.new_label();
        let end_label = self.program.new_label();
        self.program.define_label(cond_label);
        self.emit_branch_if_false(cond, end_label)?;
        self.frame.loop_labels.push((cond_label, end_label));
        self.emit_stmt(body)?;
        self.frame.loop_labels.pop();
        self.program.emit_jump(Opcode::Jmp, cond_label);
        self.program.define_label(end_label);
        Ok(())
    }

    fn emit_for(&mut self, for_stmt: &'a Stmt<'a>, range: &'a Expr<'a>, body: &'a Stmt<'a>) -> Result<(), EmitError> {
        let placeholder = self.analyzer.loop_var_for(for_stmt).expect("for loop has a bound induction variable");
        let (base, var_offset, var_ty) =
            self.lookup_storage(param_addr(placeholder)).expect("induction var offset computed during measure_stmt");
        let end_offset = var_offset - self.type_size(var_ty)? as i64;
        let width = self.width_of(var_ty)?;
        let signed = self.is_signed_or_float(var_ty);

        let (start, end) = match range.kind.get() {
            ExprKind::Binary(BinaryOp::Range, start, end) => (start, end),
            _ => unreachable!("a `for` range is always a `Binary(Range, ..)` expression, enforced by analysis"),
        };

        self.emit_expr(start)?;
        self.program.emit1(Opcode::Pop, &Operand::Reg(reg(width, REG_A)), width);
        self.program.emit2(
            Opcode::Mov,
            &Operand::Mem(Addr::base_offset(base, var_offset)),
            &Operand::Reg(reg(width, REG_A)),
            width,
        );
        self.emit_expr(end)?;
        self.program.emit1(Opcode::Pop, &Operand::Reg(reg(width, REG_A)), width);
        self.program.emit2(
            Opcode::Mov,
            &Operand::Mem(Addr::base_offset(base, end_offset)),
            &Operand::Reg(reg(width, REG_A)),
            width,
        );

        let cond_label = self.program.new_label();
        let body_label = self.program.new_label();
        let incr_label = self.program.new_label();
        let end_label = self.program.new_label();

        self.program.emit_jump(Opcode::Jmp, cond_label);
        self.program.define_label(body_label);
        self.frame.loop_labels.push((incr_label, end_label));
        self.emit_stmt(body)?;
        self.frame.loop_labels.pop();

        self.program.define_label(incr_label);
        let a = reg(width, REG_A);
        self.program.emit2(Opcode::Mov, &Operand::Reg(a), &Operand::Mem(Addr::base_offset(base, var_offset)), width);
        let inc_op = if signed { Opcode::Iinc } else { Opcode::Inc };
        self.program.emit1(inc_op, &Operand::Reg(a), width);
        self.program.emit2(Opcode::Mov, &Operand::Mem(Addr::base_offset(base, var_offset)), &Operand::Reg(a), width);

        self.program.define_label(cond_label);
        let a = reg(width, REG_A);
        let b = reg(width, REG_B);
        self.program.emit2(Opcode::Mov, &Operand::Reg(a), &Operand::Mem(Addr::base_offset(base, var_offset)), width);
        self.program.emit2(Opcode::Mov, &Operand::Reg(b), &Operand::Mem(Addr::base_offset(base, end_offset)), width);
        let cmp_op = if signed { Opcode::Icmp } else { Opcode::Cmp };
        self.program.emit2(cmp_op, &Operand::Reg(a), &Operand::Reg(b), width);
        self.program.emit_jump(Opcode::Jl, body_label);
        self.program.define_label(end_label);
        Ok(())
    }

    // --- expressions ---

    fn emit_expr(&mut self, expr: &'a Expr<'a>) -> Result<(), EmitError> {
        match expr.kind.get() {
            ExprKind::LitInt(v) => {
                let width = self.width_of(self.expr_type(expr))?;
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(v as i64)), width);
                Ok(())
            }
            ExprKind::LitFloat(v) => {
                let width = self.width_of(self.expr_type(expr))?;
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Float(v)), width);
                Ok(())
            }
            ExprKind::LitChar(c) => {
                let width = self.width_of(self.expr_type(expr))?;
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(c as i64)), width);
                Ok(())
            }
            ExprKind::LitBool(b) => {
                let width = self.width_of(self.expr_type(expr))?;
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(b as i64)), width);
                Ok(())
            }
            ExprKind::LitNull => {
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(0)), Width::W64);
                Ok(())
            }
            // No string/heap representation exists in this lowering.
            ExprKind::LitString(_) => Ok(()),
            ExprKind::Ident(_) => unreachable!("analysis rewrites every resolved identifier to ExprKind::Decl"),
            ExprKind::Decl(decl_ref) => self.emit_decl_ref(expr, decl_ref),
            ExprKind::Member(..) => self.emit_load_via_address(expr),
            ExprKind::Subscript(..) => self.emit_load_via_address(expr),
            ExprKind::Call(callee, args) => self.emit_call(expr, callee, args),
            ExprKind::Unary(op, operand) => self.emit_unary(expr, op, operand),
            ExprKind::Binary(op, lhs, rhs) => self.emit_binary(expr, op, lhs, rhs),
            ExprKind::Is(operand, _) => {
                let ty = self.expr_type(operand);
                let width = self.width_of(ty)?;
                self.emit_expr(operand)?;
                if width != Width::None {
                    self.program.emit1(Opcode::Pop, &Operand::Reg(reg(width, REG_A)), width);
                }
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(1)), Width::W8);
                Ok(())
            }
            ExprKind::As(operand, _) => {
                let from_ty = self.expr_type(operand);
                let to_ty = self.expr_type(expr);
                let from_width = self.width_of(from_ty)?;
                let to_width = self.width_of(to_ty)?;
                self.emit_expr(operand)?;
                if from_width != Width::None {
                    self.program.emit1(Opcode::Pop, &Operand::Reg(reg(from_width, REG_A)), from_width);
                }
                if to_width != Width::None {
                    self.program.emit1(Opcode::Psh, &Operand::Reg(reg(to_width, REG_A)), to_width);
                }
                Ok(())
            }
            ExprKind::Sizeof(ty) => {
                let resolved = self.analyzer.resolve_type(ty)?;
                let size = self.type_size(resolved)?;
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(size as i64)), Width::W64);
                Ok(())
            }
            ExprKind::Alignof(ty) => {
                let resolved = self.analyzer.resolve_type(ty)?;
                let size = self.type_size(resolved)?.clamp(1, 8);
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(size as i64)), Width::W64);
                Ok(())
            }
        }
    }

    fn emit_decl_ref(&mut self, expr: &'a Expr<'a>, decl_ref: DeclRef<'a>) -> Result<(), EmitError> {
        let addr = match decl_ref {
            DeclRef::Decl(d) => decl_addr(d),
            DeclRef::Param(p) => param_addr(p),
        };
        let (base, offset, _) = self.lookup_storage(addr).ok_or_else(|| lowering("reference to undeclared storage"))?;
        let width = self.width_of(self.expr_type(expr))?;
        if width != Width::None {
            self.program.emit2(
                Opcode::Mov,
                &Operand::Reg(reg(width, REG_A)),
                &Operand::Mem(Addr::base_offset(base, offset)),
                width,
            );
            self.program.emit1(Opcode::Psh, &Operand::Reg(reg(width, REG_A)), width);
        }
        Ok(())
    }

    fn emit_load_via_address(&mut self, expr: &'a Expr<'a>) -> Result<(), EmitError> {
        let addr = self.compute_address(expr)?;
        let width = self.width_of(self.expr_type(expr))?;
        if width != Width::None {
            self.program.emit2(Opcode::Mov, &Operand::Reg(reg(width, REG_A)), &Operand::Mem(addr), width);
            self.program.emit1(Opcode::Psh, &Operand::Reg(reg(width, REG_A)), width);
        }
        Ok(())
    }

    // --- lvalue addressing ---

    fn compute_address(&mut self, expr: &'a Expr<'a>) -> Result<Addr, EmitError> {
        match expr.kind.get() {
            ExprKind::Decl(decl_ref) => {
                let addr = match decl_ref {
                    DeclRef::Decl(d) => decl_addr(d),
                    DeclRef::Param(p) => param_addr(p),
                };
                let (base, offset, _) =
                    self.lookup_storage(addr).ok_or_else(|| lowering("reference to undeclared storage"))?;
                Ok(Addr::base_offset(base, offset))
            }
            ExprKind::Unary(UnaryOp::Deref, inner) => {
                self.emit_expr(inner)?;
                self.program.emit1(Opcode::Pop, &Operand::Reg(Register::C), Width::W64);
                Ok(Addr::base(Register::C))
            }
            ExprKind::Member(base, field, op) => self.compute_member_address(base, field.name, op),
            ExprKind::Subscript(base, index) => self.compute_subscript_address(base, index),
            _ => Err(lowering("expression is not an lvalue")),
        }
    }

    fn compute_member_address(
        &mut self,
        base: &'a Expr<'a>,
        field: tau_base::Symbol,
        op: MemberOp,
    ) -> Result<Addr, EmitError> {
        let base_addr = match op {
            MemberOp::Dot => self.compute_address(base)?,
            MemberOp::ArrowDot | MemberOp::OptDot => {
                self.emit_expr(base)?;
                self.program.emit1(Opcode::Pop, &Operand::Reg(Register::C), Width::W64);
                Addr::base(Register::C)
            }
        };
        let base_ty = self.expr_type(base);
        let decl_id = match op {
            MemberOp::Dot => self.struct_decl_id(base_ty)?,
            MemberOp::ArrowDot | MemberOp::OptDot => {
                let pointee = self.pointee_type(base_ty)?;
                self.struct_decl_id(pointee)?
            }
        };
        let layout = self.struct_layout(decl_id)?;
        let field_offset = layout
            .fields
            .iter()
            .find(|(name, _, _)| *name == field)
            .map(|(_, offset, _)| *offset)
            .ok_or_else(|| lowering("field not found in struct layout"))?;

        match base_addr.mode {
            crate::addr::AddrMode::BaseOffset => {
                let base_reg = base_addr.base.expect("BaseOffset always carries a base register");
                Ok(Addr::base_offset(base_reg, base_addr.offset.unwrap_or(0) + field_offset))
            }
            crate::addr::AddrMode::Base => {
                let base_reg = base_addr.base.expect("Base always carries a base register");
                Ok(Addr::base_offset(base_reg, field_offset))
            }
            _ => Err(lowering("member access root must be a simple variable or pointer")),
        }
    }

    fn compute_subscript_address(&mut self, base: &'a Expr<'a>, index: &'a Expr<'a>) -> Result<Addr, EmitError> {
        let base_ty = self.expr_type(base);
        let elem_ty = match self.analyzer.types.resolve(base_ty) {
            TypeKind::Array(inner, _) => *inner,
            TypeKind::Ptr(inner) => *inner,
            other => return Err(lowering(format!("expected an array or pointer type, found {other:?}"))),
        };
        let elem_size = self.type_size(elem_ty)?;

        match self.analyzer.types.resolve(base_ty) {
            TypeKind::Ptr(_) => {
                self.emit_expr(base)?;
                self.program.emit1(Opcode::Pop, &Operand::Reg(Register::C), Width::W64);
            }
            _ => {
                let array_addr = self.compute_address(base)?;
                self.program.emit2(Opcode::Lea, &Operand::Reg(Register::C), &Operand::Mem(array_addr), Width::W64);
            }
        }

        self.emit_expr(index)?;
        self.program.emit1(Opcode::Pop, &Operand::Reg(Register::D), Width::W64);
        self.program.emit2(
            Opcode::Mul,
            &Operand::Reg(Register::D),
            &Operand::Imm(Imm::Int(elem_size as i64)),
            Width::W64,
        );
        self.program.emit2(Opcode::Add, &Operand::Reg(Register::C), &Operand::Reg(Register::D), Width::W64);
        Ok(Addr::base(Register::C))
    }

    // --- calls ---

    fn emit_call(&mut self, expr: &'a Expr<'a>, callee: &'a Expr<'a>, args: &'a [&'a Expr<'a>]) -> Result<(), EmitError> {
        let decl = match callee.kind.get() {
            ExprKind::Decl(DeclRef::Decl(d)) => d,
            _ => return Err(lowering("only a direct function reference can be called in this lowering")),
        };
        let label = *self
            .decl_labels
            .get(&decl_addr(decl))
            .ok_or_else(|| lowering("call target is not a declared function"))?;

        let mut args_size = 0u64;
        for arg in args.iter().rev() {
            let ty = self.expr_type(arg);
            args_size += self.type_size(ty)?;
            self.emit_expr(arg)?;
        }

        self.program.emit_jump(Opcode::Call, label);

        if args_size > 0 {
            self.program.emit2(
                Opcode::Add,
                &Operand::Reg(Register::Sp),
                &Operand::Imm(Imm::Int(args_size as i64)),
                Width::W64,
            );
        }

        let width = self.width_of(self.expr_type(expr))?;
        if width != Width::None {
            self.program.emit1(Opcode::Psh, &Operand::Reg(reg(width, REG_A)), width);
        }
        Ok(())
    }

    // --- unary ---

    fn emit_unary(&mut self, expr: &'a Expr<'a>, op: UnaryOp, operand: &'a Expr<'a>) -> Result<(), EmitError> {
        match op {
            UnaryOp::Pos => self.emit_expr(operand),
            // No unsigned `neg` opcode exists (two's-complement negation is
            // the same bit operation regardless of signedness), so `Ineg`
            // covers both signed and unsigned operands.
            UnaryOp::Neg => self.emit_load_compute_store(operand, |is_float, _| if is_float { Opcode::Fneg } else { Opcode::Ineg }),
            UnaryOp::BitNot => self.emit_load_compute_store(operand, |_, _| Opcode::Not),
            UnaryOp::Not => {
                let true_label = self.program.new_label();
                let end_label = self.program.new_label();
                self.emit_branch_if_true(operand, true_label)?;
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(0)), Width::W8);
                self.program.emit_jump(Opcode::Jmp, end_label);
                self.program.define_label(true_label);
                self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(1)), Width::W8);
                self.program.define_label(end_label);
                Ok(())
            }
            UnaryOp::Deref => {
                self.emit_expr(operand)?;
                self.program.emit1(Opcode::Pop, &Operand::Reg(Register::C), Width::W64);
                let ptr_ty = self.expr_type(operand);
                let pointee = self.pointee_type(ptr_ty)?;
                let width = self.width_of(pointee)?;
                if width != Width::None {
                    self.program.emit2(
                        Opcode::Mov,
                        &Operand::Reg(reg(width, REG_A)),
                        &Operand::Mem(Addr::base(Register::C)),
                        width,
                    );
                    self.program.emit1(Opcode::Psh, &Operand::Reg(reg(width, REG_A)), width);
                }
                Ok(())
            }
            UnaryOp::AddrOf => {
                let addr = self.compute_address(operand)?;
                self.program.emit2(Opcode::Lea, &Operand::Reg(Register::C), &Operand::Mem(addr), Width::W64);
                self.program.emit1(Opcode::Psh, &Operand::Reg(Register::C), Width::W64);
                Ok(())
            }
            UnaryOp::PreIncr | UnaryOp::PreDecr | UnaryOp::PostIncr | UnaryOp::PostDecr => {
                self.emit_incr_decr(expr, op, operand)
            }
        }
    }

    fn emit_load_compute_store(
        &mut self,
        operand: &'a Expr<'a>,
        pick_op: impl FnOnce(bool, bool) -> Opcode,
    ) -> Result<(), EmitError> {
        let ty = self.expr_type(operand);
        let width = self.width_of(ty)?;
        let is_float = self.analyzer.types.is_float(ty);
        let is_signed = self.analyzer.types.is_signed(ty);
        self.emit_expr(operand)?;
        let r = reg(width, REG_A);
        self.program.emit1(Opcode::Pop, &Operand::Reg(r), width);
        let op = pick_op(is_float, is_signed);
        self.program.emit1(op, &Operand::Reg(r), width);
        self.program.emit1(Opcode::Psh, &Operand::Reg(r), width);
        Ok(())
    }

    fn emit_incr_decr(&mut self, expr: &'a Expr<'a>, op: UnaryOp, operand: &'a Expr<'a>) -> Result<(), EmitError> {
        let ty = self.expr_type(operand);
        let width = self.width_of(ty)?;
        let is_signed = self.analyzer.types.is_signed(ty) || self.analyzer.types.is_float(ty);
        let addr = self.compute_address(operand)?;
        let a = reg(width, REG_A);
        self.program.emit2(Opcode::Mov, &Operand::Reg(a), &Operand::Mem(addr), width);

        let post = matches!(op, UnaryOp::PostIncr | UnaryOp::PostDecr);
        let b = reg(width, REG_B);
        if post {
            self.program.emit2(Opcode::Mov, &Operand::Reg(b), &Operand::Reg(a), width);
        }

        let incr = matches!(op, UnaryOp::PreIncr | UnaryOp::PostIncr);
        let mutate_op = match (incr, is_signed) {
            (true, true) => Opcode::Iinc,
            (true, false) => Opcode::Inc,
            (false, true) => Opcode::Idec,
            (false, false) => Opcode::Dec,
        };
        self.program.emit1(mutate_op, &Operand::Reg(a), width);
        self.program.emit2(Opcode::Mov, &Operand::Mem(addr), &Operand::Reg(a), width);

        let _ = expr;
        self.program.emit1(Opcode::Psh, &Operand::Reg(if post { b } else { a }), width);
        Ok(())
    }

    // --- binary ---

    fn emit_binary(&mut self, expr: &'a Expr<'a>, op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> Result<(), EmitError> {
        match op {
            BinaryOp::Assign => self.emit_assign(lhs, rhs),
            BinaryOp::And => self.emit_logical_and(lhs, rhs),
            BinaryOp::Or => self.emit_logical_or(lhs, rhs),
            // Lowered in full only inside `for`; elsewhere this evaluates
            // just the range's start, an accepted gap (see DESIGN.md).
            BinaryOp::Range => self.emit_expr(lhs),
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.emit_comparison(op, lhs, rhs)
            }
            _ => self.emit_arith(expr, op, lhs, rhs),
        }
    }

    fn emit_assign(&mut self, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> Result<(), EmitError> {
        let ty = self.expr_type(lhs);
        let width = self.width_of(ty)?;
        self.emit_expr(rhs)?;
        let addr = self.compute_address(lhs)?;
        if width != Width::None {
            let r = reg(width, REG_A);
            self.program.emit1(Opcode::Pop, &Operand::Reg(r), width);
            self.program.emit2(Opcode::Mov, &Operand::Mem(addr), &Operand::Reg(r), width);
            self.program.emit1(Opcode::Psh, &Operand::Reg(r), width);
        }
        Ok(())
    }

    fn emit_logical_and(&mut self, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> Result<(), EmitError> {
        let false_label = self.program.new_label();
        let end_label = self.program.new_label();
        self.emit_branch_if_false(lhs, false_label)?;
        self.emit_branch_if_false(rhs, false_label)?;
        self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(1)), Width::W8);
        self.program.emit_jump(Opcode::Jmp, end_label);
        self.program.define_label(false_label);
        self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(0)), Width::W8);
        self.program.define_label(end_label);
        Ok(())
    }

    fn emit_logical_or(&mut self, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> Result<(), EmitError> {
        let true_label = self.program.new_label();
        let end_label = self.program.new_label();
        self.emit_branch_if_true(lhs, true_label)?;
        self.emit_branch_if_true(rhs, true_label)?;
        self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(0)), Width::W8);
        self.program.emit_jump(Opcode::Jmp, end_label);
        self.program.define_label(true_label);
        self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(1)), Width::W8);
        self.program.define_label(end_label);
        Ok(())
    }

    fn emit_comparison(&mut self, op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> Result<(), EmitError> {
        let ty = self.expr_type(lhs);
        let width = self.width_of(ty)?;
        let signed_or_float = self.is_signed_or_float(ty);

        self.emit_expr(lhs)?;
        self.emit_expr(rhs)?;
        let a = reg(width, REG_A);
        let b = reg(width, REG_B);
        self.program.emit1(Opcode::Pop, &Operand::Reg(b), width);
        self.program.emit1(Opcode::Pop, &Operand::Reg(a), width);

        let cmp_op = if signed_or_float { Opcode::Icmp } else { Opcode::Cmp };
        self.program.emit2(cmp_op, &Operand::Reg(a), &Operand::Reg(b), width);

        let jump_op = match op {
            BinaryOp::Eq => Opcode::Je,
            BinaryOp::Ne => Opcode::Jne,
            BinaryOp::Lt => Opcode::Jl,
            BinaryOp::Le => Opcode::Jle,
            BinaryOp::Gt => Opcode::Jg,
            BinaryOp::Ge => Opcode::Jge,
            _ => unreachable!("emit_comparison only dispatches on comparison operators"),
        };

        let true_label = self.program.new_label();
        let end_label = self.program.new_label();
        self.program.emit_jump(jump_op, true_label);
        self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(0)), Width::W8);
        self.program.emit_jump(Opcode::Jmp, end_label);
        self.program.define_label(true_label);
        self.program.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(1)), Width::W8);
        self.program.define_label(end_label);
        Ok(())
    }

    fn emit_arith(&mut self, expr: &'a Expr<'a>, op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> Result<(), EmitError> {
        let ty = self.expr_type(expr);
        let width = self.width_of(ty)?;
        let is_float = self.analyzer.types.is_float(ty);
        let is_signed = self.analyzer.types.is_signed(ty);

        self.emit_expr(lhs)?;
        self.emit_expr(rhs)?;
        let a = reg(width, REG_A);
        let b = reg(width, REG_B);
        self.program.emit1(Opcode::Pop, &Operand::Reg(b), width);
        self.program.emit1(Opcode::Pop, &Operand::Reg(a), width);

        let opcode = match (op, is_float, is_signed) {
            (BinaryOp::Add, true, _) => Opcode::Fadd,
            (BinaryOp::Sub, true, _) => Opcode::Fsub,
            (BinaryOp::Mul, true, _) => Opcode::Fmul,
            (BinaryOp::Div, true, _) => Opcode::Fdiv,
            (BinaryOp::Mod, true, _) => Opcode::Fmod,
            (BinaryOp::Add, false, true) => Opcode::Iadd,
            (BinaryOp::Sub, false, true) => Opcode::Isub,
            (BinaryOp::Mul, false, true) => Opcode::Imul,
            (BinaryOp::Div, false, true) => Opcode::Idiv,
            (BinaryOp::Mod, false, true) => Opcode::Imod,
            (BinaryOp::Add, false, false) => Opcode::Add,
            (BinaryOp::Sub, false, false) => Opcode::Sub,
            (BinaryOp::Mul, false, false) => Opcode::Mul,
            (BinaryOp::Div, false, false) => Opcode::Div,
            (BinaryOp::Mod, false, false) => Opcode::Mod,
            (BinaryOp::BitAnd, _, _) => Opcode::And,
            (BinaryOp::BitOr, _, _) => Opcode::Or,
            (BinaryOp::BitXor, _, _) => Opcode::Xor,
            (BinaryOp::Shl, _, _) => Opcode::Shl,
            (BinaryOp::Shr, _, _) => Opcode::Shr,
            _ => unreachable!("emit_arith only dispatches on arithmetic/bitwise operators"),
        };
        self.program.emit2(opcode, &Operand::Reg(a), &Operand::Reg(b), width);
        self.program.emit1(Opcode::Psh, &Operand::Reg(a), width);
        Ok(())
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
    fn returns_a_literal_sum_through_call_and_hlt() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let ty_i32 = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::I32), span: span() });
        let one = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitInt(1)), span: span() });
        let two = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitInt(2)), span: span() });
        let sum =
            arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Binary(BinaryOp::Add, one, two)), span: span() });
        let ret = arena.alloc_stmt(Stmt { kind: StmtKind::Return(Some(sum)), span: span() });
        let main_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Fun { abi: None, params: &[], variadic: false, ret: ty_i32, body: Some(ret) },
            name: Ident { name: interner.intern("main"), span: span() },
            span: span(),
        });
        let program = AstProgram { decls: arena.alloc_decls(vec![main_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        analyzer.analyze_program(&program).unwrap();

        let bytecode = emit_program(&mut analyzer, &program).unwrap();
        let text = bytecode.disassemble();
        // LitInt defaults to i32, so the sum lowers through the signed path.
        assert!(text.contains("IADD"));
        assert!(text.contains("CALL"));
        assert!(text.contains("HLT"));
        assert!(text.contains("RET"));
    }

    #[test]
    fn program_without_main_skips_the_call_and_only_halts() {
        let arena = AstArena::new();
        let interner = Interner::new();
        let program = AstProgram { decls: arena.alloc_decls(vec![]) };
        let mut analyzer = Analyzer::new(&interner);
        analyzer.analyze_program(&program).unwrap();

        let bytecode = emit_program(&mut analyzer, &program).unwrap();
        let text = bytecode.disassemble();
        assert!(!text.contains("CALL"));
        assert!(text.contains("HLT"));
    }

    #[test]
    fn a_function_reads_a_top_level_var_through_the_frame_register() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let ty_i32 = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::I32), span: span() });
        let five = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::LitInt(5)), span: span() });
        let g = interner.intern("g");
        let g_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_i32), init: Some(five) },
            name: Ident { name: g, span: span() },
            span: span(),
        });

        let g_ref = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Ident(Ident { name: g, span: span() })), span: span() });
        let ret = arena.alloc_stmt(Stmt { kind: StmtKind::Return(Some(g_ref)), span: span() });
        let main_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Fun { abi: None, params: &[], variadic: false, ret: ty_i32, body: Some(ret) },
            name: Ident { name: interner.intern("main"), span: span() },
            span: span(),
        });

        let program = AstProgram { decls: arena.alloc_decls(vec![g_decl, main_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        analyzer.analyze_program(&program).unwrap();

        let bytecode = emit_program(&mut analyzer, &program).unwrap();
        let text = bytecode.disassemble();
        // `g` is a top-level var: its load inside `main`'s body addresses
        // through the persistent `F` register rather than `BP`.
        assert!(text.contains("Some(F)"));
        assert!(text.contains("CALL"));
        assert!(text.contains("HLT"));
    }

    #[test]
    fn struct_field_access_resolves_through_the_cached_layout() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let ty_i32 = arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(PrimitiveType::I32), span: span() });
        let field_x = tau_syntax::Param {
            name: Some(Ident { name: interner.intern("x"), span: span() }),
            ty: ty_i32,
            default: None,
            variadic: false,
            span: span(),
        };
        let point_name = interner.intern("Point");
        let point_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Struct { fields: arena.alloc_params(vec![field_x]) },
            name: Ident { name: point_name, span: span() },
            span: span(),
        });

        let ty_point =
            arena.alloc_type(TypeExpr { kind: TypeExprKind::Named(Ident { name: point_name, span: span() }), span: span() });
        let p = interner.intern("p");
        let p_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Var { mutable: false, ty: Some(ty_point), init: None },
            name: Ident { name: p, span: span() },
            span: span(),
        });

        let p_ref = arena.alloc_expr(Expr { kind: std::cell::Cell::new(ExprKind::Ident(Ident { name: p, span: span() })), span: span() });
        let member = arena.alloc_expr(Expr {
            kind: std::cell::Cell::new(ExprKind::Member(p_ref, Ident { name: interner.intern("x"), span: span() }, MemberOp::Dot)),
            span: span(),
        });
        let ret = arena.alloc_stmt(Stmt { kind: StmtKind::Return(Some(member)), span: span() });
        let main_decl = arena.alloc_decl(Decl {
            kind: DeclKind::Fun { abi: None, params: &[], variadic: false, ret: ty_i32, body: Some(ret) },
            name: Ident { name: interner.intern("main"), span: span() },
            span: span(),
        });

        let program = AstProgram { decls: arena.alloc_decls(vec![point_decl, p_decl, main_decl]) };
        let mut analyzer = Analyzer::new(&interner);
        analyzer.analyze_program(&program).unwrap();

        let bytecode = emit_program(&mut analyzer, &program).unwrap();
        let text = bytecode.disassemble();
        assert!(text.contains("CALL"));
        assert!(text.contains("HLT"));
    }
}
