//! Error types with source location tracking.
//!
//! Every error the core produces carries a [`Span`] and a [`Kind`]
//! classifying it per the taxonomy in the specification's error-handling
//! section, so an external driver can decide how to render it (color,
//! grouping, exit code) without the core crates taking on that job
//! themselves — diagnostic pretty-printing is explicitly an external
//! collaborator's concern, not the core's.

use crate::span::Span;
use std::fmt;

/// Which stage of the pipeline raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Lex,
    Parse,
    Resolution,
    Type,
    Flow,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Lex => "lex error",
            Kind::Parse => "parse error",
            Kind::Resolution => "resolution error",
            Kind::Type => "type error",
            Kind::Flow => "flow error",
        };
        f.write_str(s)
    }
}

/// An error annotated with its kind and source location.
#[derive(Debug, Clone)]
pub struct SpannedError {
    pub kind: Kind,
    pub message: String,
    pub span: Span,
}

impl SpannedError {
    pub fn new(kind: Kind, message: impl Into<String>, span: Span) -> Self {
        Self { kind, message: message.into(), span }
    }

    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        Self::new(Kind::Lex, message, span)
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Self::new(Kind::Parse, message, span)
    }

    pub fn resolution(message: impl Into<String>, span: Span) -> Self {
        Self::new(Kind::Resolution, message, span)
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Kind::Type, message, span)
    }

    pub fn flow(message: impl Into<String>, span: Span) -> Self {
        Self::new(Kind::Flow, message, span)
    }
}

impl fmt::Display for SpannedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}:{}]> {}: {}",
            self.span.file, self.span.row, self.span.col, self.kind, self.message
        )
    }
}

impl std::error::Error for SpannedError {}

/// A non-fatal diagnostic the analyzer collects and returns alongside a
/// successful result (shadowed names, mixed-signedness arithmetic).
/// Unlike [`SpannedError`] these never abort analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    ShadowedSymbol { name: String, span: Span },
    MixedSignedness { span: Span },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ShadowedSymbol { name, span } => {
                write!(f, "[{}:{}:{}]> warning: '{}' shadows an outer declaration", span.file, span.row, span.col, name)
            }
            Warning::MixedSignedness { span } => {
                write!(f, "[{}:{}:{}]> warning: mixed signedness in arithmetic", span.file, span.row, span.col)
            }
        }
    }
}

/// Alias for `std::result::Result<T, SpannedError>`, the return type of
/// every fallible function in the Tau pipeline.
pub type Result<T> = std::result::Result<T, SpannedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanned_error_display_includes_location_and_message() {
        let err = SpannedError::lex("unexpected character", Span::new("a.tau", 5, 0, 5, 1));
        let display = format!("{}", err);
        assert!(display.contains("a.tau:0:5"));
        assert!(display.contains("unexpected character"));
        assert!(display.contains("lex error"));
    }

    #[test]
    fn warning_display_names_the_shadowed_symbol() {
        let w = Warning::ShadowedSymbol { name: "x".into(), span: Span::new("a.tau", 0, 1, 2, 1) };
        assert!(format!("{}", w).contains('x'));
    }
}
