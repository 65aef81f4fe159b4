//! Single-pass, greedy scanner turning source bytes into a token stream.
//!
//! Mirrors the sub-scanner dispatch of a classic hand-written C lexer: the
//! first non-whitespace character picks a sub-scanner (word, number,
//! string, char, punctuation) which consumes as much input as it can
//! before returning a token.

use tau_base::{Interner, SpannedError, Span, Symbol};

use crate::token::{Token, TokenKind};

const MAX_IDENT_LEN: usize = 255;

const INTEGER_SUFFIXES: &[&str] = &["i8", "i16", "i32", "i64", "iz", "u8", "u16", "u32", "u64", "uz"];

pub struct Lexer<'a> {
    file: String,
    bytes: &'a [u8],
    pos: usize,
    row: usize,
    col: usize,
    interner: &'a mut Interner,
}

impl<'a> Lexer<'a> {
    pub fn new(file: impl Into<String>, src: &'a str, interner: &'a mut Interner) -> Self {
        Lexer { file: file.into(), bytes: src.as_bytes(), pos: 0, row: 0, col: 0, interner }
    }

    fn current(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.current();
        if ch == 0 {
            return 0;
        }
        if ch == b'\n' {
            self.row += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn consume(&mut self, ch: u8) -> bool {
        if self.current() == ch {
            self.advance();
            true
        } else {
            false
        }
    }

    fn mark(&self) -> Span {
        Span::new(self.file.clone(), self.pos, self.row, self.col, 0)
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) -> usize {
        let start = self.pos;
        while !self.at_end() && pred(self.current()) {
            self.advance();
        }
        self.pos - start
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), SpannedError> {
        loop {
            self.skip_while(|c| c.is_ascii_whitespace());
            if self.current() == b'/' && self.peek() == b'/' {
                self.advance();
                self.advance();
                self.skip_while(|c| c != b'\n');
                continue;
            }
            if self.current() == b'/' && self.peek() == b'*' {
                let span = self.mark();
                self.advance();
                self.advance();
                loop {
                    if self.at_end() {
                        return Err(SpannedError::lex("unterminated block comment", span));
                    }
                    if self.consume(b'*') {
                        if self.consume(b'/') {
                            break;
                        }
                    } else {
                        self.advance();
                    }
                }
                continue;
            }
            break;
        }
        Ok(())
    }

    fn finish(&mut self, mut span: Span, kind: TokenKind, lexeme: &str) -> Token {
        span.len = self.pos - span.start;
        Token::new(kind, self.interner.intern(lexeme), span)
    }

    fn read_word(&mut self) -> Result<Token, SpannedError> {
        let span = self.mark();
        let start = self.pos;
        self.skip_while(is_word_char);
        let len = self.pos - start;
        if len > MAX_IDENT_LEN {
            return Err(SpannedError::lex(format!("identifier exceeds {} bytes", MAX_IDENT_LEN), span));
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("").to_string();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident);
        let mut span = span;
        span.len = len;
        Ok(Token::new(kind, self.interner.intern(&text), span))
    }

    fn skip_integer_suffix(&mut self) -> Result<usize, SpannedError> {
        let span = self.mark();
        let start = self.pos;
        self.skip_while(is_word_char);
        let len = self.pos - start;
        if len == 0 {
            return Ok(0);
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        if INTEGER_SUFFIXES.contains(&text) {
            Ok(len)
        } else {
            Err(SpannedError::lex(format!("invalid integer literal suffix '{}'", text), span))
        }
    }

    fn read_radix_integer(&mut self, is_digit: impl Fn(u8) -> bool) -> Result<Token, SpannedError> {
        let span = self.mark();
        self.advance();
        self.advance();
        let digits = self.skip_while(is_digit);
        self.skip_integer_suffix()?;
        if digits == 0 {
            return Err(SpannedError::lex("ill-formed integer literal: no digits after radix prefix", span));
        }
        if is_word_char(self.current()) {
            return Err(SpannedError::lex("ill-formed integer literal", span));
        }
        Ok(self.finish(span, TokenKind::LitInt, &self.slice_from(span.start)))
    }

    fn slice_from(&self, start: usize) -> String {
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("").to_string()
    }

    fn read_decimal_number(&mut self) -> Result<Token, SpannedError> {
        let span = self.mark();
        self.skip_while(|c| c.is_ascii_digit());

        if self.current() == b'.' && self.peek().is_ascii_digit() {
            self.advance();
            self.skip_while(|c| c.is_ascii_digit());
            if self.current() == b'e' || self.current() == b'E' {
                self.advance();
                if self.current() == b'+' || self.current() == b'-' {
                    self.advance();
                }
                self.skip_while(|c| c.is_ascii_digit());
            }
            if is_word_char(self.current()) {
                return Err(SpannedError::lex("ill-formed floating point literal", span));
            }
            return Ok(self.finish(span, TokenKind::LitFloat, &self.slice_from(span.start)));
        }

        self.skip_integer_suffix()?;
        if is_word_char(self.current()) {
            return Err(SpannedError::lex("ill-formed integer literal", span));
        }
        Ok(self.finish(span, TokenKind::LitInt, &self.slice_from(span.start)))
    }

    fn read_number(&mut self) -> Result<Token, SpannedError> {
        if self.current() == b'0' {
            match self.peek() {
                b'x' | b'X' => return self.read_radix_integer(|c| c.is_ascii_hexdigit()),
                b'o' | b'O' => return self.read_radix_integer(|c| (b'0'..=b'7').contains(&c)),
                b'b' | b'B' => return self.read_radix_integer(|c| c == b'0' || c == b'1'),
                _ => {}
            }
        }
        self.read_decimal_number()
    }

    /// Reads one escape sequence after a consumed `\`, appending the decoded
    /// byte(s) to `out`. Returns the escape's source length (including the
    /// backslash, not including any hex digits already accounted for).
    fn read_escape(&mut self, out: &mut String) -> Result<(), SpannedError> {
        let esc_span = self.mark();
        if self.at_end() {
            return Err(SpannedError::lex("unterminated escape sequence", esc_span));
        }
        let c = self.advance();
        match c {
            b'\\' => out.push('\\'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'\'' => out.push('\''),
            b'"' => out.push('"'),
            b'x' | b'X' => {
                let start = self.pos;
                if !self.current().is_ascii_hexdigit() {
                    return Err(SpannedError::lex("missing hex digits in escape sequence", esc_span));
                }
                self.skip_while(|c| c.is_ascii_hexdigit());
                let hex = self.slice_from(start);
                let value = u32::from_str_radix(&hex, 16).unwrap_or(0);
                if let Some(decoded) = char::from_u32(value) {
                    out.push(decoded);
                }
            }
            _ => return Err(SpannedError::lex("unknown escape sequence", esc_span)),
        }
        Ok(())
    }

    fn read_string(&mut self) -> Result<Token, SpannedError> {
        let span = self.mark();
        self.advance();
        let mut content = String::new();
        loop {
            if self.at_end() {
                return Err(SpannedError::lex("missing terminating double quote", span));
            }
            let c = self.current();
            if c == b'"' {
                self.advance();
                break;
            }
            if c == b'\\' {
                self.advance();
                self.read_escape(&mut content)?;
            } else {
                content.push(self.advance() as char);
            }
        }
        Ok(self.finish(span, TokenKind::LitString, &content))
    }

    fn read_char(&mut self) -> Result<Token, SpannedError> {
        let span = self.mark();
        self.advance();
        if self.current() == b'\'' {
            return Err(SpannedError::lex("empty character literal", span));
        }
        let mut content = String::new();
        if self.current() == b'\\' {
            self.advance();
            self.read_escape(&mut content)?;
        } else {
            if self.at_end() {
                return Err(SpannedError::lex("unterminated character literal", span));
            }
            content.push(self.advance() as char);
        }
        if !self.consume(b'\'') {
            return Err(SpannedError::lex("missing terminating single quote", span));
        }
        Ok(self.finish(span, TokenKind::LitChar, &content))
    }

    fn read_punctuation(&mut self) -> Result<Token, SpannedError> {
        use TokenKind::*;
        let span = self.mark();
        let kind = if self.consume(b'+') {
            if self.consume(b'+') { PunctPlusPlus } else if self.consume(b'=') { PunctPlusEqual } else { PunctPlus }
        } else if self.consume(b'-') {
            if self.consume(b'-') { PunctMinusMinus } else if self.consume(b'=') { PunctMinusEqual } else { PunctMinus }
        } else if self.consume(b'*') {
            if self.consume(b'.') { PunctStarDot } else if self.consume(b'=') { PunctStarEqual } else { PunctStar }
        } else if self.consume(b'/') {
            if self.consume(b'=') { PunctSlashEqual } else { PunctSlash }
        } else if self.consume(b'%') {
            if self.consume(b'=') { PunctPercentEqual } else { PunctPercent }
        } else if self.consume(b'&') {
            if self.consume(b'&') { PunctAmpAmp } else if self.consume(b'=') { PunctAmpEqual } else { PunctAmp }
        } else if self.consume(b'|') {
            if self.consume(b'|') { PunctPipePipe } else if self.consume(b'=') { PunctPipeEqual } else { PunctPipe }
        } else if self.consume(b'^') {
            if self.consume(b'=') { PunctCaretEqual } else { PunctCaret }
        } else if self.consume(b'~') {
            PunctTilde
        } else if self.consume(b'<') {
            if self.consume(b'<') {
                if self.consume(b'=') { PunctLessLessEqual } else { PunctLessLess }
            } else if self.consume(b'=') {
                PunctLessEqual
            } else {
                PunctLess
            }
        } else if self.consume(b'>') {
            if self.consume(b'>') {
                if self.consume(b'=') { PunctGreaterGreaterEqual } else { PunctGreaterGreater }
            } else if self.consume(b'=') {
                PunctGreaterEqual
            } else {
                PunctGreater
            }
        } else if self.consume(b'!') {
            if self.consume(b'=') { PunctBangEqual } else { PunctBang }
        } else if self.consume(b'.') {
            if self.consume(b'.') {
                if self.consume(b'.') { PunctDotDotDot } else { PunctDotDot }
            } else {
                PunctDot
            }
        } else if self.consume(b'?') {
            if self.consume(b'.') { PunctQuestionDot } else { PunctQuestion }
        } else if self.consume(b'=') {
            if self.consume(b'=') { PunctEqualEqual } else { PunctEqual }
        } else if self.consume(b',') {
            PunctComma
        } else if self.consume(b':') {
            PunctColon
        } else if self.consume(b';') {
            PunctSemicolon
        } else if self.consume(b'(') {
            PunctParenLeft
        } else if self.consume(b')') {
            PunctParenRight
        } else if self.consume(b'[') {
            PunctBracketLeft
        } else if self.consume(b']') {
            PunctBracketRight
        } else if self.consume(b'{') {
            PunctBraceLeft
        } else if self.consume(b'}') {
            PunctBraceRight
        } else if self.consume(b'#') {
            PunctHash
        } else {
            let bad = self.advance();
            return Err(SpannedError::lex(format!("unexpected character '{}'", bad as char), span));
        };
        Ok(self.finish(span, kind, ""))
    }

    fn next_token(&mut self) -> Result<Token, SpannedError> {
        self.skip_whitespace_and_comments()?;

        if self.at_end() {
            let span = self.mark();
            return Ok(Token::new(TokenKind::Eof, Symbol::EMPTY, span));
        }

        let c = self.current();
        if is_word_begin(c) {
            self.read_word()
        } else if c.is_ascii_digit() {
            self.read_number()
        } else if c == b'"' {
            self.read_string()
        } else if c == b'\'' {
            self.read_char()
        } else {
            self.read_punctuation()
        }
    }

    /// Scans the entire source into a token vector ending with `Eof`.
    /// Stops at the first lex error, matching the pipeline's abort-on-error
    /// convention.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SpannedError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.is_eof();
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

fn is_word_begin(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_word_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_simple_function_signature() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "fun main(): i32 { return 0 }", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::KwFun,
                TokenKind::Ident,
                TokenKind::PunctParenLeft,
                TokenKind::PunctParenRight,
                TokenKind::PunctColon,
                TokenKind::KwI32,
                TokenKind::PunctBraceLeft,
                TokenKind::KwReturn,
                TokenKind::LitInt,
                TokenKind::PunctBraceRight,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn decimal_integer_literal_length() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "123", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LitInt);
        assert_eq!(tokens[0].span.len, 3);
    }

    #[test]
    fn hex_integer_with_suffix() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "0xFFu8", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LitInt);
        assert_eq!(tokens[0].span.len, 6);
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "\"a\\nb\"", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LitString);
        assert_eq!(interner.resolve(tokens[0].lexeme), "a\nb");
        assert_eq!(tokens[0].span.len, 6);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "\"abc", &mut interner);
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn identifier_over_255_bytes_is_an_error() {
        let mut interner = Interner::new();
        let long = "a".repeat(300);
        let lexer = Lexer::new("t.tau", &long, &mut interner);
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn floating_point_literal_with_exponent() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "1.5e-10", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LitFloat);
    }

    #[test]
    fn line_comment_is_skipped() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "1 // comment\n2", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::LitInt, TokenKind::LitInt, TokenKind::Eof]);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "/* never closes", &mut interner);
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn longest_match_punctuation() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "<<=", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::PunctLessLessEqual);
    }

    #[test]
    fn keyword_true_is_a_literal_not_an_identifier() {
        let mut interner = Interner::new();
        let lexer = Lexer::new("t.tau", "true", &mut interner);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::KwTrue);
    }
}
