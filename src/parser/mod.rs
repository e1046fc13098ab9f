//! Query parser for docshell
//!
//! Turns `db.<collection>.<op>(args).<modifier>(args)...` text into a
//! [`QueryChain`] without evaluating anything: call arguments go through a
//! closed literal grammar, so expressions, calls and identifiers in value
//! position are rejected instead of run.
//!
//! # Architecture
//!
//! - `lexer`: error-tolerant tokenizer shared with the completion engine
//! - `literal`: argument splitting and the literal grammar
//! - `value`: the `LiteralValue` tree and its re-serialization
//! - `ast`: `QueryChain` and `Call`
//!
//! # Examples
//!
//! ```
//! use docshell::parser::QueryParser;
//!
//! let chain = QueryParser::parse("db.users.find({ age: { $gt: 18 } }).limit(5)").unwrap();
//! assert_eq!(chain.collection, "users");
//! assert_eq!(chain.operation_names(), vec!["find", "limit"]);
//! ```

mod ast;
pub mod lexer;
pub mod literal;
pub mod value;

// Re-export public API
pub use ast::{Call, QueryChain, Span};
pub use literal::ArgumentParser;
pub use value::{LiteralObject, LiteralValue};

use tracing::debug;

use crate::error::{QueryError, Result};
use lexer::{Lexer, Token, TokenKind};

type ParseResult<T> = std::result::Result<T, QueryError>;

/// Parser for `db.<collection>` query chains
///
/// Parsing is a pure function of the input text; every error carries the
/// query text and, where it can be pinned down, a byte offset into it.
pub struct QueryParser;

impl QueryParser {
    /// Parse query text into a [`QueryChain`].
    ///
    /// Surrounding whitespace and trailing semicolons are ignored. Offsets in
    /// errors index into `input` as given.
    pub fn parse(input: &str) -> Result<QueryChain> {
        let chain = Self::parse_chain(input).map_err(|e| e.with_query(input))?;
        debug!(
            "Parsed query on '{}': {:?}",
            chain.collection,
            chain.operation_names()
        );
        Ok(chain)
    }

    /// Collection named by the `db.<collection>` prefix of `input`
    ///
    /// The rest of the query may be incomplete; only the prefix must parse.
    pub fn target_collection(input: &str) -> Option<String> {
        let start = input.len() - input.trim_start().len();
        Self::parse_prefix(input, start).ok().map(|(name, _)| name)
    }

    fn parse_chain(input: &str) -> ParseResult<QueryChain> {
        let start = input.len() - input.trim_start().len();
        let mut end = input.trim_end().len();
        while input[..end].ends_with(';') {
            end = input[..end - 1].trim_end().len();
        }

        if end <= start {
            return Err(QueryError::malformed("empty query").at(0));
        }

        let text = &input[..end];
        let (collection, rest_start) = Self::parse_prefix(text, start)?;
        let calls = Self::parse_calls(&text[rest_start..], rest_start)?;

        if calls.is_empty() {
            return Err(QueryError::malformed(format!(
                "expected a call after 'db.{collection}', e.g. 'db.{collection}.find()'"
            ))
            .at(end));
        }

        Ok(QueryChain { collection, calls })
    }

    /// Parse the `db.<collection>` prefix, returning the collection name and
    /// the offset just past it.
    fn parse_prefix(text: &str, start: usize) -> ParseResult<(String, usize)> {
        let bytes = text.as_bytes();
        let missing_prefix =
            || QueryError::malformed("query must start with 'db.<collection>.'").at(start);

        if !text[start..].starts_with("db") || bytes.get(start + 2).is_some_and(|b| is_word_byte(*b))
        {
            return Err(missing_prefix());
        }

        let mut pos = skip_whitespace(text, start + 2);
        if bytes.get(pos) != Some(&b'.') {
            return Err(missing_prefix());
        }
        pos = skip_whitespace(text, pos + 1);

        let name_start = pos;
        while bytes
            .get(pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            pos += 1;
        }

        if pos == name_start {
            return Err(QueryError::malformed("missing collection name after 'db.'").at(pos));
        }

        Ok((text[name_start..pos].to_string(), pos))
    }

    /// Parse `.name(args)` calls until the end of input.
    fn parse_calls(rest: &str, base: usize) -> ParseResult<Vec<Call>> {
        let tokens = Lexer::tokenize(rest);
        let mut calls = Vec::new();
        let mut i = 0;

        loop {
            match &tokens[i].kind {
                TokenKind::EOF => break,
                TokenKind::Dot => i += 1,
                other => {
                    return Err(QueryError::malformed(format!(
                        "expected '.' before the next call, found {}",
                        describe(other)
                    ))
                    .at(base + tokens[i].span.start));
                }
            }

            let index = calls.len();
            let name_token = &tokens[i];
            let name = match &name_token.kind {
                TokenKind::Ident(name) if is_call_name(name) => name.clone(),
                TokenKind::Db => "db".to_string(),
                _ => {
                    return Err(QueryError::malformed("expected an operation name after '.'")
                        .at(base + name_token.span.start)
                        .in_call(index));
                }
            };
            i += 1;

            if !matches!(tokens[i].kind, TokenKind::LParen) {
                return Err(QueryError::malformed(format!("'{name}' must be called with '(...)'"))
                    .at(base + tokens[i].span.start)
                    .in_call(index));
            }

            let open = i;
            let close = Self::matching_paren(&tokens, open, index, base)?;
            let args_start = tokens[open].span.end;
            let args_text = &rest[args_start..tokens[close].span.start];

            let args = ArgumentParser::parse(args_text)
                .map_err(|e| e.shifted(base + args_start).in_call(index))?;

            calls.push(Call::new(
                name,
                args,
                (base + name_token.span.start)..(base + tokens[close].span.end),
            ));
            i = close + 1;
        }

        Ok(calls)
    }

    /// Index of the `)` closing the `(` at `open`.
    fn matching_paren(tokens: &[Token], open: usize, index: usize, base: usize) -> ParseResult<usize> {
        let mut depth = 0usize;

        for (j, token) in tokens.iter().enumerate().skip(open) {
            if token.is_unterminated() {
                let what = match token.kind {
                    TokenKind::Regex { .. } => "regex literal",
                    _ => "string literal",
                };
                return Err(QueryError::unterminated(format!("{what} is never closed"))
                    .at(base + token.span.start)
                    .in_call(index));
            }
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(j);
                    }
                }
                TokenKind::EOF => break,
                _ => {}
            }
        }

        Err(QueryError::malformed("unbalanced parentheses in call")
            .at(base + tokens[open].span.start)
            .in_call(index))
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn skip_whitespace(text: &str, pos: usize) -> usize {
    let tail = &text[pos..];
    pos + tail.len() - tail.trim_start().len()
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_call_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("'{name}'"),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Unknown(ch) | TokenKind::Operator(ch) => format!("'{ch}'"),
        _ => "unexpected input".to_string(),
    }
}
