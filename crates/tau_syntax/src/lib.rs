//! Lexer, AST, and Shunting-Yard expression parser for the Tau language.

mod arena;
mod ast;
mod lexer;
mod parser;
mod shyd;
mod token;

pub use arena::AstArena;
pub use ast::{
    Abi, BinaryOp, Decl, DeclKind, DeclRef, Enumerator, Expr, ExprKind, Ident, MemberOp, Param, PrimitiveType,
    Program, Stmt, StmtKind, TypeExpr, TypeExprKind, UnaryOp,
};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenCategory, TokenKind};
