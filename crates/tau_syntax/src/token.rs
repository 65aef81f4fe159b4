//! Token types produced by the lexer and consumed by the parser.
//!
//! A token's kind is drawn from a closed enumeration split into five
//! categories (identifier, literal, keyword, punctuation, EOF, plus the
//! `Unknown` sentinel). Each category occupies its own bit in the
//! discriminant's high byte, the way the original `tau-lang` lexer tags
//! `token_kind_t` values with a `token_flag_t` — so testing which
//! category a token belongs to is a single bitwise AND, not a multi-way
//! match.

use tau_base::{Span, Symbol};

const FLAG_ID: u16 = 1 << 8;
const FLAG_LIT: u16 = 2 << 8;
const FLAG_KW: u16 = 4 << 8;
const FLAG_PUNCT: u16 = 8 << 8;
const FLAG_EOF: u16 = 16 << 8;
const CATEGORY_MASK: u16 = 0xFF00;

/// Which of the five closed categories a [`TokenKind`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    Unknown,
    Identifier,
    Literal,
    Keyword,
    Punctuation,
    Eof,
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Unknown = 0,

    Ident = FLAG_ID,

    LitInt = FLAG_LIT,
    LitFloat,
    LitString,
    LitChar,
    LitBool,
    LitNull,

    KwIs = FLAG_KW,
    KwAs,
    KwSizeof,
    KwAlignof,
    KwIn,
    KwFun,
    KwGen,
    KwStruct,
    KwUnion,
    KwEnum,
    KwMod,
    KwIf,
    KwElse,
    KwFor,
    KwWhile,
    KwBreak,
    KwContinue,
    KwReturn,
    KwYield,
    KwMut,
    KwConst,
    KwRef,
    KwDefer,
    KwExtern,
    KwTrue,
    KwFalse,
    KwI8,
    KwI16,
    KwI32,
    KwI64,
    KwIsize,
    KwU8,
    KwU16,
    KwU32,
    KwU64,
    KwUsize,
    KwF32,
    KwF64,
    KwBool,
    KwUnit,

    PunctPlus = FLAG_PUNCT,
    PunctPlusPlus,
    PunctPlusEqual,
    PunctMinus,
    PunctMinusMinus,
    PunctMinusEqual,
    PunctStar,
    PunctStarDot,
    PunctStarEqual,
    PunctSlash,
    PunctSlashEqual,
    PunctPercent,
    PunctPercentEqual,
    PunctAmp,
    PunctAmpAmp,
    PunctAmpEqual,
    PunctPipe,
    PunctPipePipe,
    PunctPipeEqual,
    PunctCaret,
    PunctCaretEqual,
    PunctTilde,
    PunctLess,
    PunctLessLess,
    PunctLessLessEqual,
    PunctLessEqual,
    PunctGreater,
    PunctGreaterGreater,
    PunctGreaterGreaterEqual,
    PunctGreaterEqual,
    PunctBang,
    PunctBangEqual,
    PunctDot,
    PunctDotDot,
    PunctDotDotDot,
    PunctQuestion,
    PunctQuestionDot,
    PunctEqual,
    PunctEqualEqual,
    PunctComma,
    PunctColon,
    PunctSemicolon,
    PunctParenLeft,
    PunctParenRight,
    PunctBracketLeft,
    PunctBracketRight,
    PunctBraceLeft,
    PunctBraceRight,
    PunctHash,

    Eof = FLAG_EOF,
}

impl TokenKind {
    pub fn category(self) -> TokenCategory {
        match (self as u16) & CATEGORY_MASK {
            0 if matches!(self, TokenKind::Unknown) => TokenCategory::Unknown,
            FLAG_ID => TokenCategory::Identifier,
            FLAG_LIT => TokenCategory::Literal,
            FLAG_KW => TokenCategory::Keyword,
            FLAG_PUNCT => TokenCategory::Punctuation,
            FLAG_EOF => TokenCategory::Eof,
            _ => TokenCategory::Unknown,
        }
    }

    pub fn is_literal(self) -> bool {
        self.category() == TokenCategory::Literal
    }

    pub fn is_keyword(self) -> bool {
        self.category() == TokenCategory::Keyword
    }

    /// Maps a scanned word to its keyword kind, or `None` if it's a plain identifier.
    pub fn keyword_from_str(word: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match word {
            "is" => KwIs,
            "as" => KwAs,
            "sizeof" => KwSizeof,
            "alignof" => KwAlignof,
            "in" => KwIn,
            "fun" => KwFun,
            "gen" => KwGen,
            "struct" => KwStruct,
            "union" => KwUnion,
            "enum" => KwEnum,
            "mod" => KwMod,
            "if" => KwIf,
            "else" => KwElse,
            "for" => KwFor,
            "while" => KwWhile,
            "break" => KwBreak,
            "continue" => KwContinue,
            "return" => KwReturn,
            "yield" => KwYield,
            "mut" => KwMut,
            "const" => KwConst,
            "ref" => KwRef,
            "defer" => KwDefer,
            "extern" => KwExtern,
            "true" => KwTrue,
            "false" => KwFalse,
            "null" => LitNull,
            "i8" => KwI8,
            "i16" => KwI16,
            "i32" => KwI32,
            "i64" => KwI64,
            "isize" => KwIsize,
            "u8" => KwU8,
            "u16" => KwU16,
            "u32" => KwU32,
            "u64" => KwU64,
            "usize" => KwUsize,
            "f32" => KwF32,
            "f64" => KwF64,
            "bool" => KwBool,
            "unit" => KwUnit,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// The raw lexeme text, interned. For string/char literals this is the
    /// *decoded* contents (escapes already resolved); for everything else
    /// it is the exact source slice.
    pub lexeme: Symbol,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: Symbol, span: Span) -> Self {
        Token { kind, lexeme, span }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_a_single_bit_test() {
        assert_eq!(TokenKind::Ident.category(), TokenCategory::Identifier);
        assert_eq!(TokenKind::LitInt.category(), TokenCategory::Literal);
        assert_eq!(TokenKind::KwFun.category(), TokenCategory::Keyword);
        assert_eq!(TokenKind::PunctPlus.category(), TokenCategory::Punctuation);
        assert_eq!(TokenKind::Eof.category(), TokenCategory::Eof);
        assert_eq!(TokenKind::Unknown.category(), TokenCategory::Unknown);
    }

    #[test]
    fn every_literal_variant_reports_literal_category() {
        for k in [TokenKind::LitInt, TokenKind::LitFloat, TokenKind::LitString, TokenKind::LitChar, TokenKind::LitBool, TokenKind::LitNull] {
            assert!(k.is_literal());
        }
    }

    #[test]
    fn keyword_from_str_recognizes_type_operators() {
        assert_eq!(TokenKind::keyword_from_str("sizeof"), Some(TokenKind::KwSizeof));
        assert_eq!(TokenKind::keyword_from_str("notakeyword"), None);
    }

    #[test]
    fn true_false_null_are_literal_not_keyword() {
        assert_eq!(TokenKind::keyword_from_str("true"), Some(TokenKind::KwTrue));
        assert!(TokenKind::KwTrue.is_keyword());
        assert_eq!(TokenKind::keyword_from_str("null"), Some(TokenKind::LitNull));
        assert!(TokenKind::LitNull.is_literal());
    }
}
