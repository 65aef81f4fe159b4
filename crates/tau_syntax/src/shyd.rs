//! Shunting-Yard expression parsing.
//!
//! Precedence, associativity, and prefix/postfix disambiguation are easier
//! to encode as a table-driven operator pump than as a mutual-recursion
//! precedence-climbing parser, so expressions get their own engine: a first
//! pass turns the token stream into a postfix queue of [`PostfixElem`]s, a
//! second pass folds that queue into a single `Expr` tree.

use std::cell::Cell;

use tau_base::{Interner, Span, SpannedError};

use crate::arena::AstArena;
use crate::ast::{BinaryOp, Expr, ExprKind, Ident, MemberOp, TypeExpr, UnaryOp};
use crate::token::{Token, TokenKind};

/// One element of the postfix queue built by the first pass.
enum PostfixElem<'a> {
    Term(&'a Expr<'a>),
    Type(&'a TypeExpr<'a>),
    Unary(UnaryOp, Span),
    Binary(BinaryOp, Span),
    Is(Span),
    As(Span),
    Sizeof(Span),
    Alignof(Span),
    Call(&'a [&'a Expr<'a>], Span),
    Subscript(Span),
    Member(Ident, MemberOp, Span),
}

/// An operator sitting on the shunting-yard stack, together with the
/// precedence it flushes against. Parenthesis/bracket markers carry no
/// precedence and are only ever popped by their matching close token.
enum StackOp {
    Unary(UnaryOp, Span),
    Binary(BinaryOp, Span),
    Is(Span),
    As(Span),
    Sizeof(Span),
    Alignof(Span),
    Member(Ident, MemberOp, Span),
    Subscript(Span),
    OpenParen,
    OpenBracket,
}

impl StackOp {
    /// `None` for markers: they never get flushed by precedence, only by
    /// their matching close token.
    fn precedence(&self) -> Option<u8> {
        match self {
            StackOp::Member(..) | StackOp::Subscript(_) => Some(1),
            StackOp::Unary(..) | StackOp::Is(_) | StackOp::As(_) | StackOp::Sizeof(_) | StackOp::Alignof(_) => Some(2),
            StackOp::Binary(op, _) => Some(op.precedence()),
            StackOp::OpenParen | StackOp::OpenBracket => None,
        }
    }
}

/// Parses one expression out of `tokens[*pos..]`, advancing `*pos` past it.
/// `parse_type` is supplied by the recursive-descent parser so the type
/// grammar stays in one place; shyd only needs to call into it when it hits
/// `is`/`as`/`sizeof`/`alignof`.
pub fn parse_expr<'a>(
    arena: &'a AstArena,
    interner: &Interner,
    tokens: &[Token],
    pos: &mut usize,
    mut parse_type: impl FnMut(&[Token], &mut usize) -> Result<&'a TypeExpr<'a>, SpannedError>,
) -> Result<&'a Expr<'a>, SpannedError> {
    let mut queue: Vec<PostfixElem<'a>> = Vec::new();
    let mut stack: Vec<StackOp> = Vec::new();
    let mut prev_term = false;

    loop {
        let tok = &tokens[*pos];
        match tok.kind {
            TokenKind::KwIs | TokenKind::KwAs => {
                if !prev_term {
                    return Err(unexpected(tok, "a value before 'is'/'as'"));
                }
                *pos += 1;
                let ty = parse_type(tokens, pos)?;
                if tok.kind == TokenKind::KwIs {
                    flush_to(&mut stack, &mut queue, 2);
                    stack.push(StackOp::Is(tok.span.clone()));
                } else {
                    flush_to(&mut stack, &mut queue, 2);
                    stack.push(StackOp::As(tok.span.clone()));
                }
                queue.push(PostfixElem::Type(ty));
                prev_term = true;
            }
            TokenKind::KwSizeof | TokenKind::KwAlignof => {
                if prev_term {
                    return Err(unexpected(tok, "an operator or end of expression"));
                }
                *pos += 1;
                let ty = parse_type(tokens, pos)?;
                if tok.kind == TokenKind::KwSizeof {
                    stack.push(StackOp::Sizeof(tok.span.clone()));
                } else {
                    stack.push(StackOp::Alignof(tok.span.clone()));
                }
                queue.push(PostfixElem::Type(ty));
                prev_term = true;
            }
            TokenKind::PunctParenLeft => {
                if prev_term {
                    let call_span = tok.span.clone();
                    *pos += 1;
                    let args = parse_call_args(arena, interner, tokens, pos, &mut parse_type)?;
                    flush_to(&mut stack, &mut queue, 1);
                    queue.push(PostfixElem::Call(args, call_span));
                    prev_term = true;
                } else {
                    *pos += 1;
                    stack.push(StackOp::OpenParen);
                    prev_term = false;
                }
            }
            TokenKind::PunctParenRight => {
                if !flush_until_marker(&mut stack, &mut queue, /*bracket=*/ false) {
                    return Err(unexpected(tok, "a matching '('"));
                }
                *pos += 1;
                prev_term = true;
            }
            TokenKind::PunctBracketLeft => {
                if !prev_term {
                    return Err(unexpected(tok, "a value before '['"));
                }
                *pos += 1;
                stack.push(StackOp::OpenBracket);
                prev_term = false;
            }
            TokenKind::PunctBracketRight => {
                let span = tok.span.clone();
                if !flush_until_marker(&mut stack, &mut queue, /*bracket=*/ true) {
                    return Err(unexpected(tok, "a matching '['"));
                }
                flush_to(&mut stack, &mut queue, 1);
                stack.push(StackOp::Subscript(span));
                *pos += 1;
                prev_term = true;
            }
            TokenKind::PunctDot | TokenKind::PunctStarDot | TokenKind::PunctQuestionDot => {
                let op = match tok.kind {
                    TokenKind::PunctDot => MemberOp::Dot,
                    TokenKind::PunctStarDot => MemberOp::ArrowDot,
                    _ => MemberOp::OptDot,
                };
                let span = tok.span.clone();
                *pos += 1;
                let name = expect_ident(tokens, pos)?;
                flush_to(&mut stack, &mut queue, 1);
                stack.push(StackOp::Member(name, op, span));
                prev_term = true;
            }
            TokenKind::Ident | TokenKind::LitInt | TokenKind::LitFloat | TokenKind::LitString | TokenKind::LitChar
            | TokenKind::LitBool | TokenKind::LitNull => {
                if prev_term {
                    return Err(unexpected(tok, "an operator or end of expression"));
                }
                let expr = term_from_token(arena, interner, tok);
                queue.push(PostfixElem::Term(expr));
                *pos += 1;
                prev_term = true;
            }
            _ => {
                if let Some((op, prec)) = operator_for(tok.kind, prev_term) {
                    flush_to(&mut stack, &mut queue, prec);
                    match op {
                        OpKind::Unary(u) => {
                            stack.push(StackOp::Unary(u, tok.span.clone()));
                            prev_term = u.is_postfix();
                        }
                        OpKind::Binary(b) => {
                            stack.push(StackOp::Binary(b, tok.span.clone()));
                            prev_term = false;
                        }
                    }
                    *pos += 1;
                } else {
                    break;
                }
            }
        }
    }

    while let Some(op) = stack.pop() {
        if matches!(op, StackOp::OpenParen | StackOp::OpenBracket) {
            return Err(SpannedError::parse("unmatched opening bracket", Span::default()));
        }
        push_op_to_queue(&mut queue, op);
    }

    build_tree(arena, queue)
}

enum OpKind {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

/// Disambiguates operators that have both a prefix-unary and an
/// infix-binary reading (`+`, `-`, `*`, `&`, `++`, `--`) using `prev_term`,
/// per §4.2.
fn operator_for(kind: TokenKind, prev_term: bool) -> Option<(OpKind, u8)> {
    use TokenKind::*;
    let op = match kind {
        PunctPlus => {
            if prev_term {
                OpKind::Binary(BinaryOp::Add)
            } else {
                OpKind::Unary(UnaryOp::Pos)
            }
        }
        PunctMinus => {
            if prev_term {
                OpKind::Binary(BinaryOp::Sub)
            } else {
                OpKind::Unary(UnaryOp::Neg)
            }
        }
        PunctStar => {
            if prev_term {
                OpKind::Binary(BinaryOp::Mul)
            } else {
                OpKind::Unary(UnaryOp::Deref)
            }
        }
        PunctAmp => {
            if prev_term {
                OpKind::Binary(BinaryOp::BitAnd)
            } else {
                OpKind::Unary(UnaryOp::AddrOf)
            }
        }
        PunctPlusPlus => {
            if prev_term {
                OpKind::Unary(UnaryOp::PostIncr)
            } else {
                OpKind::Unary(UnaryOp::PreIncr)
            }
        }
        PunctMinusMinus => {
            if prev_term {
                OpKind::Unary(UnaryOp::PostDecr)
            } else {
                OpKind::Unary(UnaryOp::PreDecr)
            }
        }
        PunctTilde => OpKind::Unary(UnaryOp::BitNot),
        PunctBang => OpKind::Unary(UnaryOp::Not),
        PunctSlash => OpKind::Binary(BinaryOp::Div),
        PunctPercent => OpKind::Binary(BinaryOp::Mod),
        PunctLessLess => OpKind::Binary(BinaryOp::Shl),
        PunctGreaterGreater => OpKind::Binary(BinaryOp::Shr),
        PunctLess => OpKind::Binary(BinaryOp::Lt),
        PunctLessEqual => OpKind::Binary(BinaryOp::Le),
        PunctGreater => OpKind::Binary(BinaryOp::Gt),
        PunctGreaterEqual => OpKind::Binary(BinaryOp::Ge),
        PunctEqualEqual => OpKind::Binary(BinaryOp::Eq),
        PunctBangEqual => OpKind::Binary(BinaryOp::Ne),
        PunctPipe => OpKind::Binary(BinaryOp::BitOr),
        PunctCaret => OpKind::Binary(BinaryOp::BitXor),
        PunctAmpAmp => OpKind::Binary(BinaryOp::And),
        PunctPipePipe => OpKind::Binary(BinaryOp::Or),
        PunctDotDot => OpKind::Binary(BinaryOp::Range),
        PunctEqual => OpKind::Binary(BinaryOp::Assign),
        _ => return None,
    };
    let prec = match &op {
        OpKind::Unary(_) => 2,
        OpKind::Binary(b) => b.precedence(),
    };
    Some((op, prec))
}

/// Pops and queues operators whose precedence is numerically <= `prec`
/// (binds at least as tightly as the incoming operator), stopping at
/// markers. Assignment's right-associativity means it never flushes an
/// equal-precedence `Assign` already on the stack.
fn flush_to<'a>(stack: &mut Vec<StackOp>, queue: &mut Vec<PostfixElem<'a>>, prec: u8) {
    while let Some(top) = stack.last() {
        match top.precedence() {
            None => break,
            Some(top_prec) => {
                let flush = if matches!(top, StackOp::Binary(BinaryOp::Assign, _)) {
                    top_prec < prec
                } else {
                    top_prec <= prec
                };
                if !flush {
                    break;
                }
                let op = stack.pop().unwrap();
                push_op_to_queue(queue, op);
            }
        }
    }
}

fn flush_until_marker<'a>(stack: &mut Vec<StackOp>, queue: &mut Vec<PostfixElem<'a>>, bracket: bool) -> bool {
    loop {
        match stack.last() {
            Some(StackOp::OpenParen) if !bracket => {
                stack.pop();
                return true;
            }
            Some(StackOp::OpenBracket) if bracket => {
                stack.pop();
                return true;
            }
            Some(StackOp::OpenParen) | Some(StackOp::OpenBracket) => return false,
            Some(_) => {
                let op = stack.pop().unwrap();
                push_op_to_queue(queue, op);
            }
            None => return false,
        }
    }
}

fn push_op_to_queue<'a>(queue: &mut Vec<PostfixElem<'a>>, op: StackOp) {
    queue.push(match op {
        StackOp::Unary(u, s) => PostfixElem::Unary(u, s),
        StackOp::Binary(b, s) => PostfixElem::Binary(b, s),
        StackOp::Is(s) => PostfixElem::Is(s),
        StackOp::As(s) => PostfixElem::As(s),
        StackOp::Sizeof(s) => PostfixElem::Sizeof(s),
        StackOp::Alignof(s) => PostfixElem::Alignof(s),
        StackOp::Member(name, mop, s) => PostfixElem::Member(name, mop, s),
        StackOp::Subscript(s) => PostfixElem::Subscript(s),
        StackOp::OpenParen | StackOp::OpenBracket => unreachable!("markers are never queued"),
    });
}

fn term_from_token<'a>(arena: &'a AstArena, interner: &Interner, tok: &Token) -> &'a Expr<'a> {
    let kind = match tok.kind {
        TokenKind::LitInt => ExprKind::LitInt(parse_int_lexeme(interner, tok)),
        TokenKind::LitFloat => ExprKind::LitFloat(interner.resolve(tok.lexeme).parse().unwrap_or(0.0)),
        TokenKind::LitString => ExprKind::LitString(tok.lexeme),
        TokenKind::LitChar => ExprKind::LitChar(interner.resolve(tok.lexeme).chars().next().unwrap_or('\0')),
        TokenKind::LitBool => ExprKind::LitBool(interner.resolve(tok.lexeme) == "true"),
        TokenKind::LitNull => ExprKind::LitNull,
        TokenKind::Ident => ExprKind::Ident(Ident { name: tok.lexeme, span: tok.span.clone() }),
        _ => unreachable!("term_from_token called on a non-term token"),
    };
    arena.alloc_expr(Expr { kind: Cell::new(kind), span: tok.span.clone() })
}

/// Integer lexemes keep any radix prefix and suffix (`0xFFu8`); only the
/// digit run matters for the value, so non-digit/non-prefix characters are
/// dropped before parsing.
fn parse_int_lexeme(interner: &Interner, tok: &Token) -> u64 {
    let lexeme = interner.resolve(tok.lexeme);
    let (radix, digits) = if let Some(rest) = lexeme.strip_prefix("0x").or_else(|| lexeme.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = lexeme.strip_prefix("0o").or_else(|| lexeme.strip_prefix("0O")) {
        (8, rest)
    } else if let Some(rest) = lexeme.strip_prefix("0b").or_else(|| lexeme.strip_prefix("0B")) {
        (2, rest)
    } else {
        (10, lexeme)
    };
    let digits: String = digits.chars().take_while(|c| c.is_digit(radix)).collect();
    u64::from_str_radix(&digits, radix).unwrap_or(0)
}

fn parse_call_args<'a>(
    arena: &'a AstArena,
    interner: &Interner,
    tokens: &[Token],
    pos: &mut usize,
    parse_type: &mut impl FnMut(&[Token], &mut usize) -> Result<&'a TypeExpr<'a>, SpannedError>,
) -> Result<&'a [&'a Expr<'a>], SpannedError> {
    let mut args = Vec::new();
    if tokens[*pos].kind != TokenKind::PunctParenRight {
        loop {
            let arg = parse_expr(arena, interner, tokens, pos, &mut *parse_type)?;
            args.push(arg);
            if tokens[*pos].kind == TokenKind::PunctComma {
                *pos += 1;
                continue;
            }
            break;
        }
    }
    if tokens[*pos].kind != TokenKind::PunctParenRight {
        return Err(unexpected(&tokens[*pos], "',' or ')'"));
    }
    *pos += 1;
    Ok(arena.alloc_exprs(args))
}

fn expect_ident(tokens: &[Token], pos: &mut usize) -> Result<Ident, SpannedError> {
    let tok = &tokens[*pos];
    if tok.kind != TokenKind::Ident {
        return Err(unexpected(tok, "a member name"));
    }
    *pos += 1;
    Ok(Ident { name: tok.lexeme, span: tok.span.clone() })
}

fn unexpected(tok: &Token, expected: &str) -> SpannedError {
    SpannedError::parse(format!("expected {expected}, found {:?}", tok.kind), tok.span.clone())
}

/// Second pass: folds the postfix queue into a tree by popping each
/// operator's arity worth of operands off a single node stack.
fn build_tree<'a>(arena: &'a AstArena, queue: Vec<PostfixElem<'a>>) -> Result<&'a Expr<'a>, SpannedError> {
    enum Node<'a> {
        Expr(&'a Expr<'a>),
        Type(&'a TypeExpr<'a>),
    }

    let mut stack: Vec<Node<'a>> = Vec::new();
    let pop_expr = |stack: &mut Vec<Node<'a>>, span: &Span| -> Result<&'a Expr<'a>, SpannedError> {
        match stack.pop() {
            Some(Node::Expr(e)) => Ok(e),
            _ => Err(SpannedError::parse("malformed expression", span.clone())),
        }
    };
    let pop_type = |stack: &mut Vec<Node<'a>>, span: &Span| -> Result<&'a TypeExpr<'a>, SpannedError> {
        match stack.pop() {
            Some(Node::Type(t)) => Ok(t),
            _ => Err(SpannedError::parse("malformed expression", span.clone())),
        }
    };

    for elem in queue {
        match elem {
            PostfixElem::Term(e) => stack.push(Node::Expr(e)),
            PostfixElem::Type(t) => stack.push(Node::Type(t)),
            PostfixElem::Unary(op, span) => {
                let operand = pop_expr(&mut stack, &span)?;
                let node_span = span.merge(&operand.span);
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Unary(op, operand)), span: node_span })));
            }
            PostfixElem::Binary(op, span) => {
                let rhs = pop_expr(&mut stack, &span)?;
                let lhs = pop_expr(&mut stack, &span)?;
                let node_span = lhs.span.merge(&rhs.span);
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Binary(op, lhs, rhs)), span: node_span })));
            }
            PostfixElem::Is(span) => {
                let ty = pop_type(&mut stack, &span)?;
                let operand = pop_expr(&mut stack, &span)?;
                let node_span = operand.span.merge(&span);
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Is(operand, ty)), span: node_span })));
            }
            PostfixElem::As(span) => {
                let ty = pop_type(&mut stack, &span)?;
                let operand = pop_expr(&mut stack, &span)?;
                let node_span = operand.span.merge(&span);
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::As(operand, ty)), span: node_span })));
            }
            PostfixElem::Sizeof(span) => {
                let ty = pop_type(&mut stack, &span)?;
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Sizeof(ty)), span })));
            }
            PostfixElem::Alignof(span) => {
                let ty = pop_type(&mut stack, &span)?;
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Alignof(ty)), span })));
            }
            PostfixElem::Call(args, span) => {
                let callee = pop_expr(&mut stack, &span)?;
                let node_span = callee.span.merge(&span);
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Call(callee, args)), span: node_span })));
            }
            PostfixElem::Subscript(span) => {
                let index = pop_expr(&mut stack, &span)?;
                let base = pop_expr(&mut stack, &span)?;
                let node_span = base.span.merge(&span);
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Subscript(base, index)), span: node_span })));
            }
            PostfixElem::Member(name, mop, span) => {
                let base = pop_expr(&mut stack, &span)?;
                let node_span = base.span.merge(&name.span);
                stack.push(Node::Expr(arena.alloc_expr(Expr { kind: Cell::new(ExprKind::Member(base, name, mop)), span: node_span })));
            }
        }
    }

    match stack.pop() {
        Some(Node::Expr(e)) if stack.is_empty() => Ok(e),
        _ => Err(SpannedError::parse("malformed expression", Span::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_base::Interner;

    fn lex(src: &str) -> (Vec<Token>, Interner) {
        let mut interner = Interner::new();
        let tokens = crate::Lexer::new("t.tau", src, &mut interner).tokenize().unwrap();
        (tokens, interner)
    }

    fn no_type<'a>(_tokens: &[Token], _pos: &mut usize) -> Result<&'a TypeExpr<'a>, SpannedError> {
        unreachable!("no type operators in this expression")
    }

    #[test]
    fn precedence_groups_multiplication_before_addition() {
        let arena = AstArena::new();
        let (tokens, interner) = lex("1 + 2 * 3");
        let mut pos = 0;
        let expr = parse_expr(&arena, &interner, &tokens, &mut pos, no_type).unwrap();
        match expr.kind.get() {
            ExprKind::Binary(BinaryOp::Add, lhs, rhs) => {
                assert!(matches!(lhs.kind.get(), ExprKind::LitInt(1)));
                assert!(matches!(rhs.kind.get(), ExprKind::Binary(BinaryOp::Mul, _, _)));
            }
            _ => panic!("expected top-level Add"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let arena = AstArena::new();
        let (tokens, interner) = lex("a = b = c");
        let mut pos = 0;
        let expr = parse_expr(&arena, &interner, &tokens, &mut pos, no_type).unwrap();
        match expr.kind.get() {
            ExprKind::Binary(BinaryOp::Assign, _, rhs) => {
                assert!(matches!(rhs.kind.get(), ExprKind::Binary(BinaryOp::Assign, _, _)));
            }
            _ => panic!("expected top-level Assign"),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let arena = AstArena::new();
        let (tokens, interner) = lex("-1 * 2");
        let mut pos = 0;
        let expr = parse_expr(&arena, &interner, &tokens, &mut pos, no_type).unwrap();
        match expr.kind.get() {
            ExprKind::Binary(BinaryOp::Mul, lhs, _) => {
                assert!(matches!(lhs.kind.get(), ExprKind::Unary(UnaryOp::Neg, _)));
            }
            _ => panic!("expected top-level Mul"),
        }
    }

    #[test]
    fn call_then_member_then_subscript_chain() {
        let arena = AstArena::new();
        let (tokens, interner) = lex("f(1).x[0]");
        let mut pos = 0;
        let expr = parse_expr(&arena, &interner, &tokens, &mut pos, no_type).unwrap();
        assert!(matches!(expr.kind.get(), ExprKind::Subscript(_, _)));
        if let ExprKind::Subscript(base, _) = expr.kind.get() {
            assert!(matches!(base.kind.get(), ExprKind::Member(_, _, MemberOp::Dot)));
        }
    }

    #[test]
    fn two_terms_in_a_row_is_an_error() {
        let arena = AstArena::new();
        let (tokens, interner) = lex("1 2");
        let mut pos = 0;
        assert!(parse_expr(&arena, &interner, &tokens, &mut pos, no_type).is_err());
    }
}
