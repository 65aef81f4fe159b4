//! Recursive-descent parser for declarations, statements, and types.
//!
//! Driven by one token of lookahead, per §4.2: each parsing function is
//! named after the production it recognizes and either returns a freshly
//! allocated node or fails with a diagnostic. Expressions are delegated to
//! [`crate::shyd`]; this module covers everything Shunting-Yard doesn't.

use tau_base::{Interner, Kind, Span, SpannedError};

use crate::arena::AstArena;
use crate::ast::{
    Abi, Decl, DeclKind, Enumerator, Ident, Param, PrimitiveType, Program, Stmt, StmtKind, TypeExpr, TypeExprKind,
};
use crate::token::{Token, TokenKind};

pub struct Parser<'a> {
    arena: &'a AstArena,
    interner: &'a Interner,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, arena: &'a AstArena, interner: &'a Interner) -> Self {
        Parser { arena, interner, tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program<'a>, SpannedError> {
        let mut decls = Vec::new();
        while !self.at_eof() {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls: self.arena.alloc_decls(decls) })
    }

    // --- token-stream plumbing ---

    fn at_eof(&self) -> bool {
        self.tokens[self.pos].is_eof()
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        tok
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.cur().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SpannedError> {
        if self.cur().kind == kind {
            Ok(self.bump())
        } else {
            Err(unexpected(self.cur(), &format!("{kind:?}")))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, SpannedError> {
        let tok = self.expect(TokenKind::Ident)?;
        Ok(Ident { name: tok.lexeme, span: tok.span })
    }

    fn parse_until<T>(
        &mut self,
        terminator: TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T, SpannedError>,
    ) -> Result<Vec<T>, SpannedError> {
        let mut items = Vec::new();
        while self.cur().kind != terminator {
            if self.at_eof() {
                return Err(unexpected(self.cur(), &format!("{terminator:?}")));
            }
            items.push(item(self)?);
        }
        self.expect(terminator)?;
        Ok(items)
    }

    // --- expressions and types ---

    fn parse_expr(&mut self) -> Result<&'a crate::ast::Expr<'a>, SpannedError> {
        let arena = self.arena;
        let interner = self.interner;
        crate::shyd::parse_expr(arena, interner, &self.tokens, &mut self.pos, |tokens, pos| {
            parse_type(arena, interner, tokens, pos)
        })
    }

    fn parse_type(&mut self) -> Result<&'a TypeExpr<'a>, SpannedError> {
        parse_type(self.arena, self.interner, &self.tokens, &mut self.pos)
    }

    // --- declarations ---

    fn parse_decl(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        match self.cur().kind {
            TokenKind::Ident => self.parse_decl_var(),
            TokenKind::KwExtern => self.parse_decl_extern(),
            TokenKind::KwFun => self.parse_decl_fun(None),
            TokenKind::KwGen => self.parse_decl_gen(),
            TokenKind::KwStruct => self.parse_decl_struct(),
            TokenKind::KwUnion => self.parse_decl_union(),
            TokenKind::KwEnum => self.parse_decl_enum(),
            TokenKind::KwMod => self.parse_decl_mod(),
            _ => Err(unexpected(self.cur(), "a declaration")),
        }
    }

    fn parse_decl_var(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        let start = self.cur().span.clone();
        let mutable = self.consume(TokenKind::KwMut);
        let name = self.expect_ident()?;
        self.expect(TokenKind::PunctColon)?;
        let ty = self.parse_type()?;
        let init = if self.consume(TokenKind::PunctEqual) { Some(self.parse_expr()?) } else { None };
        let span = start.merge(&name.span);
        Ok(self.arena.alloc_decl(Decl { kind: DeclKind::Var { mutable, ty: Some(ty), init }, name, span }))
    }

    fn parse_decl_extern(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        self.expect(TokenKind::KwExtern)?;
        let abi = if self.cur().kind == TokenKind::LitString {
            let tok = self.bump();
            parse_abi(self.interner.resolve(tok.lexeme), &tok.span)?
        } else {
            Abi::Cdecl
        };
        self.parse_decl_fun(Some(abi))
    }

    fn parse_decl_fun(&mut self, abi: Option<Abi>) -> Result<&'a Decl<'a>, SpannedError> {
        let is_extern = abi.is_some();
        let is_cdecl = matches!(abi, Some(Abi::Cdecl));
        let start = self.expect(TokenKind::KwFun)?.span;
        let name = self.expect_ident()?;
        let (params, variadic) = self.parse_params(is_extern && is_cdecl)?;
        self.expect(TokenKind::PunctColon)?;
        let ret = self.parse_type()?;
        let body = if is_extern { None } else { Some(self.parse_stmt()?) };
        let span = start.merge(&name.span);
        Ok(self.arena.alloc_decl(Decl { kind: DeclKind::Fun { abi, params, variadic, ret, body }, name, span }))
    }

    fn parse_decl_gen(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwGen)?.span;
        let name = self.expect_ident()?;
        let (params, _variadic) = self.parse_params(false)?;
        self.expect(TokenKind::PunctColon)?;
        let yield_ty = self.parse_type()?;
        let body = Some(self.parse_stmt()?);
        let span = start.merge(&name.span);
        Ok(self.arena.alloc_decl(Decl { kind: DeclKind::Gen { abi: None, params, yield_ty, body }, name, span }))
    }

    /// Parses a parenthesized parameter list. `allow_cdecl_vararg` gates the
    /// C-style nameless `...` (only legal on `extern "cdecl"` functions);
    /// named (Tau-style) variadics are always allowed as the final parameter.
    fn parse_params(&mut self, allow_cdecl_vararg: bool) -> Result<(&'a [&'a Param<'a>], bool), SpannedError> {
        self.expect(TokenKind::PunctParenLeft)?;
        let mut params: Vec<&'a Param<'a>> = Vec::new();
        let mut seen_default = false;
        let mut cdecl_vararg = false;
        if self.cur().kind != TokenKind::PunctParenRight {
            loop {
                if self.consume(TokenKind::PunctDotDotDot) {
                    if self.cur().kind == TokenKind::Ident {
                        let param = self.parse_param(true)?;
                        if seen_default {
                            return Err(SpannedError::parse(
                                "variadic parameter cannot follow a default parameter",
                                param.span.clone(),
                            ));
                        }
                        params.push(param);
                    } else if allow_cdecl_vararg {
                        cdecl_vararg = true;
                    } else {
                        return Err(unexpected(self.cur(), "a variadic parameter name"));
                    }
                    break;
                }
                let param = self.parse_param(false)?;
                if param.default.is_some() {
                    seen_default = true;
                } else if seen_default {
                    return Err(SpannedError::parse(
                        "a non-default parameter cannot follow a default parameter",
                        param.span.clone(),
                    ));
                }
                params.push(param);
                if !self.consume(TokenKind::PunctComma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::PunctParenRight)?;
        Ok((self.arena.alloc_params(params), cdecl_vararg))
    }

    fn parse_param(&mut self, variadic: bool) -> Result<&'a Param<'a>, SpannedError> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::PunctColon)?;
        let ty = self.parse_type()?;
        let default = if self.consume(TokenKind::PunctEqual) { Some(self.parse_expr()?) } else { None };
        let span = name.span.merge(&ty.span);
        Ok(self.arena.alloc_param(Param { name: Some(name), ty, default, variadic, span }))
    }

    fn parse_decl_struct(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwStruct)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::PunctBraceLeft)?;
        let fields = self.parse_until(TokenKind::PunctBraceRight, |p| p.parse_field())?;
        let span = start.merge(&name.span);
        Ok(self.arena.alloc_decl(Decl { kind: DeclKind::Struct { fields: self.arena.alloc_params(fields) }, name, span }))
    }

    fn parse_decl_union(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwUnion)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::PunctBraceLeft)?;
        let fields = self.parse_until(TokenKind::PunctBraceRight, |p| p.parse_field())?;
        let span = start.merge(&name.span);
        Ok(self.arena.alloc_decl(Decl { kind: DeclKind::Union { fields: self.arena.alloc_params(fields) }, name, span }))
    }

    /// Struct/union members are plain `name: type` fields; the original
    /// forbids initializers here, so this stops short of `parse_decl_var`.
    fn parse_field(&mut self) -> Result<&'a Param<'a>, SpannedError> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::PunctColon)?;
        let ty = self.parse_type()?;
        let span = name.span.merge(&ty.span);
        Ok(self.arena.alloc_param(Param { name: Some(name), ty, default: None, variadic: false, span }))
    }

    fn parse_decl_enum(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwEnum)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::PunctBraceLeft)?;
        let enumerators = self.parse_until(TokenKind::PunctBraceRight, |p| p.parse_enumerator())?;
        let span = start.merge(&name.span);
        Ok(self.arena.alloc_decl(Decl {
            kind: DeclKind::Enum { enumerators: self.arena.alloc_enumerators(enumerators) },
            name,
            span,
        }))
    }

    fn parse_enumerator(&mut self) -> Result<&'a Enumerator, SpannedError> {
        let name = self.expect_ident()?;
        let span = name.span.clone();
        Ok(self.arena.alloc_enumerator(Enumerator { name, value: None, span }))
    }

    fn parse_decl_mod(&mut self) -> Result<&'a Decl<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwMod)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::PunctBraceLeft)?;
        let members = self.parse_until(TokenKind::PunctBraceRight, |p| p.parse_decl())?;
        let span = start.merge(&name.span);
        Ok(self.arena.alloc_decl(Decl { kind: DeclKind::Module { members: self.arena.alloc_decls(members) }, name, span }))
    }

    // --- statements ---

    fn parse_stmt(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        match self.cur().kind {
            TokenKind::Ident if self.peek().kind == TokenKind::PunctColon => self.parse_stmt_var(),
            TokenKind::KwMut => self.parse_stmt_var(),
            TokenKind::KwIf => self.parse_stmt_if(),
            TokenKind::KwWhile => self.parse_stmt_while(),
            TokenKind::KwFor => self.parse_stmt_for(),
            TokenKind::KwBreak => self.parse_simple_stmt(StmtKind::Break),
            TokenKind::KwContinue => self.parse_simple_stmt(StmtKind::Continue),
            TokenKind::KwReturn => self.parse_stmt_return(),
            TokenKind::KwYield => self.parse_stmt_yield(),
            TokenKind::KwDefer => self.parse_stmt_defer(),
            TokenKind::PunctBraceLeft => self.parse_stmt_block(),
            _ => self.parse_stmt_expr(),
        }
    }

    fn parse_stmt_var(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let decl = self.parse_decl_var()?;
        let span = decl.span.clone();
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::Decl(decl), span }))
    }

    fn parse_simple_stmt(&mut self, kind: StmtKind<'a>) -> Result<&'a Stmt<'a>, SpannedError> {
        let span = self.bump().span;
        Ok(self.arena.alloc_stmt(Stmt { kind, span }))
    }

    fn parse_stmt_if(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwIf)?.span;
        let cond = self.parse_expr()?;
        let then = self.parse_stmt()?;
        let else_ = if self.consume(TokenKind::KwElse) { Some(self.parse_stmt()?) } else { None };
        let span = start.merge(&then.span);
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::If(cond, then, else_), span }))
    }

    fn parse_stmt_while(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwWhile)?.span;
        let cond = self.parse_expr()?;
        let body = self.parse_stmt()?;
        let span = start.merge(&body.span);
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::While(cond, body), span }))
    }

    fn parse_stmt_for(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwFor)?.span;
        let var = self.expect_ident()?;
        self.expect(TokenKind::KwIn)?;
        let range = self.parse_expr()?;
        let body = self.parse_stmt()?;
        let span = start.merge(&body.span);
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::For { var, range, body }, span }))
    }

    fn parse_stmt_return(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwReturn)?.span;
        let value = if self.at_stmt_end() { None } else { Some(self.parse_expr()?) };
        let span = value.map(|v| start.merge(&v.span)).unwrap_or(start);
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::Return(value), span }))
    }

    fn parse_stmt_yield(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwYield)?.span;
        let value = self.parse_expr()?;
        let span = start.merge(&value.span);
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::Yield(value), span }))
    }

    fn parse_stmt_defer(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let start = self.expect(TokenKind::KwDefer)?.span;
        let inner = self.parse_stmt()?;
        let span = start.merge(&inner.span);
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::Defer(inner), span }))
    }

    fn parse_stmt_block(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let start = self.expect(TokenKind::PunctBraceLeft)?.span;
        let stmts = self.parse_until(TokenKind::PunctBraceRight, |p| p.parse_stmt())?;
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::Block(self.arena.alloc_stmts(stmts)), span: start }))
    }

    fn parse_stmt_expr(&mut self) -> Result<&'a Stmt<'a>, SpannedError> {
        let expr = self.parse_expr()?;
        let span = expr.span.clone();
        Ok(self.arena.alloc_stmt(Stmt { kind: StmtKind::Expr(expr), span }))
    }

    /// A bare `return`/`break` with no following expression is recognized by
    /// the next token closing the enclosing block or starting a new
    /// statement, since the grammar has no statement terminator.
    fn at_stmt_end(&self) -> bool {
        matches!(self.cur().kind, TokenKind::PunctBraceRight) || self.at_eof()
    }
}

/// Parses a type out of `tokens[*pos..]`. Free function (rather than a
/// `Parser` method) so [`crate::shyd::parse_expr`] can call back into it
/// for `is`/`as`/`sizeof`/`alignof` without borrowing the whole parser.
fn parse_type<'a>(
    arena: &'a AstArena,
    interner: &Interner,
    tokens: &[Token],
    pos: &mut usize,
) -> Result<&'a TypeExpr<'a>, SpannedError> {
    let tok = tokens[*pos].clone();
    match tok.kind {
        TokenKind::KwMut => {
            *pos += 1;
            let inner = parse_type(arena, interner, tokens, pos)?;
            let span = tok.span.merge(&inner.span);
            Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Mut(inner), span }))
        }
        TokenKind::KwConst => {
            *pos += 1;
            let inner = parse_type(arena, interner, tokens, pos)?;
            let span = tok.span.merge(&inner.span);
            Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Const(inner), span }))
        }
        TokenKind::PunctStar => {
            *pos += 1;
            let inner = parse_type(arena, interner, tokens, pos)?;
            let span = tok.span.merge(&inner.span);
            Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Ptr(inner), span }))
        }
        TokenKind::PunctAmp => {
            *pos += 1;
            let inner = parse_type(arena, interner, tokens, pos)?;
            let span = tok.span.merge(&inner.span);
            Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Ref(inner), span }))
        }
        TokenKind::PunctQuestion => {
            *pos += 1;
            let inner = parse_type(arena, interner, tokens, pos)?;
            let span = tok.span.merge(&inner.span);
            Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Opt(inner), span }))
        }
        TokenKind::PunctBracketLeft => {
            *pos += 1;
            let len = if tokens[*pos].kind == TokenKind::PunctBracketRight {
                0
            } else {
                let len_tok = &tokens[*pos];
                if len_tok.kind != TokenKind::LitInt {
                    return Err(unexpected(len_tok, "an array length"));
                }
                let len = interner.resolve(len_tok.lexeme).parse::<u64>().unwrap_or(0);
                *pos += 1;
                len
            };
            if tokens[*pos].kind != TokenKind::PunctBracketRight {
                return Err(unexpected(&tokens[*pos], "']'"));
            }
            *pos += 1;
            let inner = parse_type(arena, interner, tokens, pos)?;
            let span = tok.span.merge(&inner.span);
            Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Array(inner, len), span }))
        }
        TokenKind::KwFun => parse_type_callable(arena, interner, tokens, pos, Abi::Tau, false),
        TokenKind::KwExtern => {
            *pos += 1;
            let abi_tok = &tokens[*pos];
            if abi_tok.kind != TokenKind::LitString {
                return Err(unexpected(abi_tok, "an ABI string"));
            }
            let abi = parse_abi(interner.resolve(abi_tok.lexeme), &abi_tok.span)?;
            *pos += 1;
            parse_type_callable(arena, interner, tokens, pos, abi, false)
        }
        TokenKind::KwGen => parse_type_callable(arena, interner, tokens, pos, Abi::Tau, true),
        TokenKind::Ident => {
            *pos += 1;
            Ok(arena.alloc_type(TypeExpr {
                kind: TypeExprKind::Named(Ident { name: tok.lexeme, span: tok.span.clone() }),
                span: tok.span,
            }))
        }
        _ => {
            if let Some(prim) = primitive_from_kind(tok.kind) {
                *pos += 1;
                Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Primitive(prim), span: tok.span }))
            } else {
                Err(unexpected(&tok, "a type"))
            }
        }
    }
}

fn parse_type_callable<'a>(
    arena: &'a AstArena,
    interner: &Interner,
    tokens: &[Token],
    pos: &mut usize,
    abi: Abi,
    is_gen: bool,
) -> Result<&'a TypeExpr<'a>, SpannedError> {
    let start = tokens[*pos].span.clone();
    *pos += 1;
    if tokens[*pos].kind != TokenKind::PunctParenLeft {
        return Err(unexpected(&tokens[*pos], "'('"));
    }
    *pos += 1;
    let mut params: Vec<&'a TypeExpr<'a>> = Vec::new();
    let mut variadic = false;
    if tokens[*pos].kind != TokenKind::PunctParenRight {
        loop {
            if tokens[*pos].kind == TokenKind::PunctDotDotDot {
                *pos += 1;
                variadic = true;
                break;
            }
            params.push(parse_type(arena, interner, tokens, pos)?);
            if tokens[*pos].kind == TokenKind::PunctComma {
                *pos += 1;
                continue;
            }
            break;
        }
    }
    if tokens[*pos].kind != TokenKind::PunctParenRight {
        return Err(unexpected(&tokens[*pos], "')'"));
    }
    *pos += 1;
    if tokens[*pos].kind != TokenKind::PunctColon {
        return Err(unexpected(&tokens[*pos], "':'"));
    }
    *pos += 1;
    let ret = parse_type(arena, interner, tokens, pos)?;
    let span = start.merge(&ret.span);
    let params = arena.alloc_types(params);
    if is_gen {
        Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Gen { abi, params, yield_ty: ret }, span }))
    } else {
        Ok(arena.alloc_type(TypeExpr { kind: TypeExprKind::Fun { abi, params, variadic, ret }, span }))
    }
}

fn primitive_from_kind(kind: TokenKind) -> Option<PrimitiveType> {
    use TokenKind::*;
    Some(match kind {
        KwI8 => PrimitiveType::I8,
        KwI16 => PrimitiveType::I16,
        KwI32 => PrimitiveType::I32,
        KwI64 => PrimitiveType::I64,
        KwIsize => PrimitiveType::Isize,
        KwU8 => PrimitiveType::U8,
        KwU16 => PrimitiveType::U16,
        KwU32 => PrimitiveType::U32,
        KwU64 => PrimitiveType::U64,
        KwUsize => PrimitiveType::Usize,
        KwF32 => PrimitiveType::F32,
        KwF64 => PrimitiveType::F64,
        KwBool => PrimitiveType::Bool,
        KwUnit => PrimitiveType::Unit,
        _ => return None,
    })
}

fn parse_abi(name: &str, span: &Span) -> Result<Abi, SpannedError> {
    Ok(match name {
        "Tau" | "tau" => Abi::Tau,
        "cdecl" => Abi::Cdecl,
        "stdcall" => Abi::Stdcall,
        "win64" => Abi::Win64,
        "sysv64" => Abi::Sysv64,
        "aapcs" => Abi::Aapcs,
        "fastcall" => Abi::Fastcall,
        "vectorcall" => Abi::Vectorcall,
        "thiscall" => Abi::Thiscall,
        _ => return Err(SpannedError::new(Kind::Parse, format!("unknown ABI '{name}'"), span.clone())),
    })
}

fn unexpected(tok: &Token, expected: &str) -> SpannedError {
    SpannedError::parse(format!("expected {expected}, found {:?}", tok.kind), tok.span.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_base::Interner;

    macro_rules! parse {
        ($src:expr) => {{
            let arena = AstArena::new();
            let mut interner = Interner::new();
            let tokens = crate::Lexer::new("t.tau", $src, &mut interner).tokenize().unwrap();
            let mut parser = Parser::new(tokens, &arena, &interner);
            parser.parse_program().unwrap()
        }};
    }

    #[test]
    fn parses_a_function_returning_an_integer_literal() {
        let program = parse!("fun main(): i32 { return 0 }");
        assert_eq!(program.decls.len(), 1);
        match program.decls[0].kind {
            DeclKind::Fun { ref params, body, .. } => {
                assert!(params.is_empty());
                assert!(body.is_some());
            }
            _ => panic!("expected a function declaration"),
        }
    }

    #[test]
    fn parses_struct_fields() {
        let program = parse!("struct Point { x: i32 y: i32 }");
        match program.decls[0].kind {
            DeclKind::Struct { fields } => assert_eq!(fields.len(), 2),
            _ => panic!("expected a struct declaration"),
        }
    }

    #[test]
    fn parses_extern_cdecl_function_with_vararg() {
        let program = parse!(r#"extern "cdecl" fun printf(fmt: *i8, ...): i32"#);
        match program.decls[0].kind {
            DeclKind::Fun { abi: Some(Abi::Cdecl), ref params, body, .. } => {
                assert_eq!(params.len(), 1);
                assert!(body.is_none());
            }
            _ => panic!("expected an extern cdecl function"),
        }
    }

    #[test]
    fn default_parameter_must_be_a_contiguous_suffix() {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let tokens =
            crate::Lexer::new("t.tau", "fun f(a: i32 = 1, b: i32): unit { }", &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &arena, &interner);
        assert!(parser.parse_program().is_err());
    }

    #[test]
    fn for_loop_over_a_range() {
        let program = parse!("fun main(): unit { for i in 0..10 { } }");
        match program.decls[0].kind {
            DeclKind::Fun { body: Some(body), .. } => match body.kind {
                StmtKind::Block(stmts) => assert!(matches!(stmts[0].kind, StmtKind::For { .. })),
                _ => panic!("expected a block body"),
            },
            _ => panic!("expected a function declaration"),
        }
    }
}
