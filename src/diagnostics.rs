use crate::span::Span;
use crate::token::TokenKind;
use std::cmp;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindgenError {
    #[error("lexing error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("type model error: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Error)]
pub enum LexError {
    #[error("unexpected character `{ch}` at {span:?}")]
    UnexpectedChar { ch: char, span: Span },
    #[error("invalid numeric literal at {span:?}")]
    InvalidNumber { span: Span },
    #[error("unterminated block comment starting at {span:?}")]
    UnterminatedComment { span: Span },
    #[error("malformed preprocessor linemarker at {span:?}")]
    MalformedLineMarker { span: Span },
}

impl LexError {
    pub fn span(&self) -> Option<Span> {
        match self {
            LexError::UnexpectedChar { span, .. }
            | LexError::InvalidNumber { span }
            | LexError::UnterminatedComment { span }
            | LexError::MalformedLineMarker { span } => Some(*span),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum ParseError {
    #[error("unexpected token {found:?} expected {expected} at {span:?}")]
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
        span: Span,
    },
    #[error("unexpected end of file while parsing {context}")]
    UnexpectedEof { context: &'static str },
    #[error("invalid literal for array size at {span:?}")]
    InvalidArraySize { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { span, .. } | ParseError::InvalidArraySize { span } => {
                Some(*span)
            }
            ParseError::UnexpectedEof { .. } => None,
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum ModelError {
    #[error("unknown C type `{name}` in declaration at {coord}")]
    UnknownType { name: String, coord: String },
    #[error("unsupported declaration at {coord}: {detail}")]
    UnsupportedType { detail: String, coord: String },
    #[error("enum declared at {coord} has neither a tag nor a typedef name")]
    AnonymousEnum { coord: String },
}

pub fn format_error(source: &str, error: &BindgenError) -> String {
    match error {
        BindgenError::Lex(err) => format_with_span(source, err.span(), &err.to_string()),
        BindgenError::Parse(err) => format_with_span(source, err.span(), &err.to_string()),
        BindgenError::Model(err) => format!("error: {err}"),
    }
}

pub fn print_error(source: &str, error: &BindgenError) {
    eprintln!("{}", format_error(source, error));
}

fn format_with_span(source: &str, span: Option<Span>, message: &str) -> String {
    if let Some(span) = span {
        let line_str = line_containing(source, span.start);
        let pointer_len = cmp::max(1, span.end.saturating_sub(span.start));
        let caret_offset = span.column.saturating_sub(1);
        let caret = format!(
            "{}{}",
            " ".repeat(caret_offset),
            "^".repeat(cmp::min(
                pointer_len,
                line_str.len().saturating_sub(caret_offset).max(1)
            ))
        );
        format!(
            "error: {message}\n --> line {}, column {}\n{:>4} | {}\n     | {}\n",
            span.line, span.column, span.line, line_str, caret
        )
    } else {
        format!("error: {message}")
    }
}

/// Recover the text of the line holding `index`. Lines are looked up by byte
/// offset, not by `span.line`: linemarkers make token line numbers refer to
/// the original header, while `source` is the preprocessed unit.
fn line_containing(source: &str, index: usize) -> String {
    let index = index.min(source.len());
    let start = source[..index].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = source[index..]
        .find('\n')
        .map(|i| index + i)
        .unwrap_or(source.len());
    source[start..end].to_string()
}
