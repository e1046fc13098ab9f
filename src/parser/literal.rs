//! Argument literal parser
//!
//! Parses the text between a call's parentheses into a list of
//! [`LiteralValue`]s. The grammar is closed: JSON literals, bare identifiers
//! as object keys, single-quoted strings and `/pattern/flags` regexes. Any
//! other expression form (identifiers in value position, calls, member
//! access, operators, `new`) is rejected with `UnsupportedConstruct`; nothing
//! is ever evaluated.
//!
//! Arguments are first split on top-level commas. The split runs over the
//! token stream, so commas inside `{}`, `[]`, strings and regexes never split.

use std::ops::Range;

use super::lexer::{Lexer, Token, TokenKind};
use super::value::{LiteralObject, LiteralValue};
use crate::error::QueryError;

/// Nesting limit for objects and arrays
const MAX_DEPTH: usize = 128;

type ParseResult<T> = std::result::Result<T, QueryError>;

/// Parser for call arguments
pub struct ArgumentParser;

impl ArgumentParser {
    /// Parse raw argument text into one value per top-level argument.
    ///
    /// Error offsets are byte offsets into `input`.
    pub fn parse(input: &str) -> ParseResult<Vec<LiteralValue>> {
        let tokens = Lexer::tokenize(input);

        if let Some(token) = tokens.iter().find(|t| t.is_unterminated()) {
            return Err(unterminated_token(token));
        }

        Self::split(&tokens)?
            .into_iter()
            .map(|range| LiteralParser::new(&tokens[range]).parse_argument())
            .collect()
    }

    /// Split the token stream (ending in EOF) into per-argument token ranges.
    fn split(tokens: &[Token]) -> ParseResult<Vec<Range<usize>>> {
        let eof = tokens.len().saturating_sub(1);
        let mut ranges = Vec::new();
        let mut openers: Vec<&Token> = Vec::new();
        let mut start = 0;

        for (i, token) in tokens[..eof].iter().enumerate() {
            if token.is_opener() {
                openers.push(token);
            } else if token.is_closer() {
                let Some(opener) = openers.pop() else {
                    return Err(QueryError::invalid_literal(format!(
                        "unmatched '{}'",
                        closer_char(&token.kind)
                    ))
                    .at(token.span.start));
                };
                if !closes(&opener.kind, &token.kind) {
                    return Err(QueryError::invalid_literal(format!(
                        "'{}' does not close '{}'",
                        closer_char(&token.kind),
                        opener_char(&opener.kind)
                    ))
                    .at(token.span.start));
                }
            } else if matches!(token.kind, TokenKind::Comma) && openers.is_empty() {
                if i == start {
                    return Err(QueryError::invalid_literal("empty argument").at(token.span.start));
                }
                ranges.push(start..i);
                start = i + 1;
            }
        }

        if let Some(opener) = openers.last() {
            return Err(QueryError::unterminated(format!(
                "'{}' is never closed",
                opener_char(&opener.kind)
            ))
            .at(opener.span.start));
        }

        // A single trailing comma is allowed.
        if start < eof {
            ranges.push(start..eof);
        }

        Ok(ranges)
    }
}

fn unterminated_token(token: &Token) -> QueryError {
    let what = match token.kind {
        TokenKind::Regex { .. } => "regex literal",
        _ => "string literal",
    };
    QueryError::unterminated(format!("{what} is never closed")).at(token.span.start)
}

fn closes(opener: &TokenKind, closer: &TokenKind) -> bool {
    matches!(
        (opener, closer),
        (TokenKind::LParen, TokenKind::RParen)
            | (TokenKind::LBracket, TokenKind::RBracket)
            | (TokenKind::LBrace, TokenKind::RBrace)
    )
}

fn opener_char(kind: &TokenKind) -> char {
    match kind {
        TokenKind::LParen => '(',
        TokenKind::LBracket => '[',
        _ => '{',
    }
}

fn closer_char(kind: &TokenKind) -> char {
    match kind {
        TokenKind::RParen => ')',
        TokenKind::RBracket => ']',
        _ => '}',
    }
}

/// Recursive-descent parser over the tokens of one argument
struct LiteralParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse exactly one value spanning the whole token slice.
    fn parse_argument(mut self) -> ParseResult<LiteralValue> {
        let value = self.parse_value()?;
        match self.current() {
            None => Ok(value),
            Some(token) => Err(trailing_token_error(token)),
        }
    }

    fn parse_value(&mut self) -> ParseResult<LiteralValue> {
        let Some(token) = self.current() else {
            return Err(QueryError::invalid_literal("expected a value").at(self.end_offset()));
        };
        let start = token.span.start;

        match &token.kind {
            TokenKind::LBrace => self.parse_object(),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::String { quote: '`', .. } => Err(QueryError::unsupported_construct(
                "template literals are not supported",
            )
            .at(start)),
            TokenKind::String { value, .. } => {
                let value = value.clone();
                self.advance();
                Ok(LiteralValue::String(value))
            }
            TokenKind::Number(text) => {
                let n = parse_number(text, start)?;
                self.advance();
                Ok(LiteralValue::Number(n))
            }
            TokenKind::Operator('-') => {
                self.advance();
                match self.current() {
                    Some(Token {
                        kind: TokenKind::Number(text),
                        span,
                    }) => {
                        let n = parse_number(text, span.start)?;
                        self.advance();
                        Ok(LiteralValue::Number(-n))
                    }
                    _ => Err(QueryError::unsupported_construct(
                        "unary '-' only applies to a number literal",
                    )
                    .at(start)),
                }
            }
            TokenKind::Regex { pattern, flags, .. } => {
                validate_flags(flags, start)?;
                let value = LiteralValue::Regex {
                    pattern: pattern.clone(),
                    flags: flags.clone(),
                };
                self.advance();
                Ok(value)
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" => {
                    self.advance();
                    Ok(LiteralValue::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(LiteralValue::Bool(false))
                }
                "null" => {
                    self.advance();
                    Ok(LiteralValue::Null)
                }
                "new" => Err(QueryError::unsupported_construct(
                    "constructor calls are not supported",
                )
                .at(start)),
                _ => Err(identifier_error(name, self.peek(1)).at(start)),
            },
            TokenKind::Db => Err(identifier_error("db", self.peek(1)).at(start)),
            TokenKind::LParen => Err(QueryError::unsupported_construct(
                "parenthesized expressions are not supported",
            )
            .at(start)),
            TokenKind::Operator(op) => Err(QueryError::unsupported_construct(format!(
                "operator '{op}' is not supported"
            ))
            .at(start)),
            TokenKind::Unknown(ch) => {
                Err(QueryError::invalid_literal(format!("unexpected character '{ch}'")).at(start))
            }
            other => Err(
                QueryError::invalid_literal(format!("expected a value, found {}", describe(other)))
                    .at(start),
            ),
        }
    }

    /// Parse object literal: { key: value, ... }
    fn parse_object(&mut self) -> ParseResult<LiteralValue> {
        self.enter()?;
        self.advance(); // '{'

        let mut object = LiteralObject::new();

        loop {
            if self.match_kind(|k| matches!(k, TokenKind::RBrace)) {
                break;
            }

            let key = self.parse_key()?;
            self.expect(
                |k| matches!(k, TokenKind::Colon),
                "expected ':' after object key",
            )?;
            let value = self.parse_value()?;
            object.insert(key, value);

            if self.match_kind(|k| matches!(k, TokenKind::Comma)) {
                continue;
            }
            self.expect(
                |k| matches!(k, TokenKind::RBrace),
                "expected ',' or '}' after object property",
            )?;
            break;
        }

        self.depth -= 1;
        Ok(LiteralValue::Object(object))
    }

    /// Parse property key (bare identifier, string, or number)
    fn parse_key(&mut self) -> ParseResult<String> {
        let Some(token) = self.current() else {
            return Err(QueryError::invalid_literal("expected an object key").at(self.end_offset()));
        };

        let key = match &token.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Db => "db".to_string(),
            TokenKind::String { quote: '`', .. } => {
                return Err(QueryError::unsupported_construct(
                    "template literals are not supported",
                )
                .at(token.span.start));
            }
            TokenKind::String { value, .. } => value.clone(),
            TokenKind::Number(text) => {
                let n = parse_number(text, token.span.start)?;
                LiteralValue::Number(n).to_string()
            }
            TokenKind::LBracket => {
                return Err(QueryError::unsupported_construct(
                    "computed object keys are not supported",
                )
                .at(token.span.start));
            }
            other => {
                return Err(QueryError::invalid_literal(format!(
                    "expected an object key, found {}",
                    describe(other)
                ))
                .at(token.span.start));
            }
        };

        self.advance();
        Ok(key)
    }

    /// Parse array literal: [elem1, elem2, ...]
    fn parse_array(&mut self) -> ParseResult<LiteralValue> {
        self.enter()?;
        self.advance(); // '['

        let mut items = Vec::new();

        loop {
            if self.match_kind(|k| matches!(k, TokenKind::RBracket)) {
                break;
            }
            if let Some(token) = self.current() {
                if matches!(token.kind, TokenKind::Comma) {
                    return Err(QueryError::invalid_literal("array holes are not supported")
                        .at(token.span.start));
                }
            }

            items.push(self.parse_value()?);

            if self.match_kind(|k| matches!(k, TokenKind::Comma)) {
                continue;
            }
            self.expect(
                |k| matches!(k, TokenKind::RBracket),
                "expected ',' or ']' after array element",
            )?;
            break;
        }

        self.depth -= 1;
        Ok(LiteralValue::Array(items))
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let offset = self.current().map_or(0, |t| t.span.start);
            return Err(QueryError::invalid_literal(format!(
                "literal nesting exceeds {MAX_DEPTH} levels"
            ))
            .at(offset));
        }
        Ok(())
    }

    // Token manipulation methods

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek(&self, ahead: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn match_kind(&mut self, pred: impl Fn(&TokenKind) -> bool) -> bool {
        if self.current().is_some_and(|t| pred(&t.kind)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, pred: impl Fn(&TokenKind) -> bool, message: &str) -> ParseResult<()> {
        match self.current() {
            Some(token) if pred(&token.kind) => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(classify_unexpected(token, message)),
            None => Err(QueryError::invalid_literal(message).at(self.end_offset())),
        }
    }

    fn end_offset(&self) -> usize {
        self.tokens.last().map_or(0, |t| t.span.end)
    }
}

/// Error for an identifier in value position
fn identifier_error(name: &str, next: Option<&Token>) -> QueryError {
    match next.map(|t| &t.kind) {
        Some(TokenKind::LParen) => {
            QueryError::unsupported_construct(format!("call expression '{name}(...)' is not a literal"))
        }
        Some(TokenKind::Dot) => QueryError::unsupported_construct(format!(
            "property access on '{name}' is not a literal"
        )),
        _ => QueryError::unsupported_construct(format!(
            "identifier '{name}' is only allowed as an object key"
        )),
    }
}

/// Error for a token left over after a complete value or where a separator was expected
fn classify_unexpected(token: &Token, message: &str) -> QueryError {
    let err = match &token.kind {
        TokenKind::LParen => QueryError::unsupported_construct("call expressions are not supported"),
        TokenKind::Dot => QueryError::unsupported_construct("property access is not supported"),
        TokenKind::LBracket => {
            QueryError::unsupported_construct("index expressions are not supported")
        }
        TokenKind::Operator(op) => {
            QueryError::unsupported_construct(format!("operator '{op}' is not supported"))
        }
        _ => QueryError::invalid_literal(format!("{message}, found {}", describe(&token.kind))),
    };
    err.at(token.span.start)
}

fn trailing_token_error(token: &Token) -> QueryError {
    classify_unexpected(token, "expected ',' between arguments")
}

fn parse_number(text: &str, offset: usize) -> ParseResult<f64> {
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        Ok(_) => Err(QueryError::invalid_literal(format!("number '{text}' is out of range")).at(offset)),
        Err(_) => Err(QueryError::invalid_literal(format!("invalid number '{text}'")).at(offset)),
    }
}

fn validate_flags(flags: &str, offset: usize) -> ParseResult<()> {
    for (i, flag) in flags.char_indices() {
        if !"dgimsuvxy".contains(flag) {
            return Err(
                QueryError::invalid_literal(format!("invalid regex flag '{flag}'")).at(offset),
            );
        }
        if flags[..i].contains(flag) {
            return Err(
                QueryError::invalid_literal(format!("duplicate regex flag '{flag}'")).at(offset),
            );
        }
    }
    Ok(())
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Db => "'db'".to_string(),
        TokenKind::Ident(name) => format!("identifier '{name}'"),
        TokenKind::Dot => "'.'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::String { .. } => "string".to_string(),
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::Regex { .. } => "regex".to_string(),
        TokenKind::Operator(op) => format!("'{op}'"),
        TokenKind::EOF => "end of input".to_string(),
        TokenKind::Unknown(ch) => format!("'{ch}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryErrorKind;

    fn parse_one(input: &str) -> LiteralValue {
        let mut values = ArgumentParser::parse(input).unwrap();
        assert_eq!(values.len(), 1, "expected one argument in {input}");
        values.remove(0)
    }

    fn error_kind(input: &str) -> QueryErrorKind {
        ArgumentParser::parse(input).unwrap_err().kind
    }

    #[test]
    fn test_empty_arguments() {
        assert!(ArgumentParser::parse("").unwrap().is_empty());
        assert!(ArgumentParser::parse("   \n ").unwrap().is_empty());
    }

    #[test]
    fn test_nested_commas_do_not_split() {
        let value = parse_one("{ $or: [ {a:1}, {b:2} ] }");
        let obj = value.as_object().unwrap();
        match obj.get("$or") {
            Some(LiteralValue::Array(items)) => assert_eq!(items.len(), 2),
            other => panic!("Expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_commas_inside_strings_and_regexes() {
        let values = ArgumentParser::parse(r#""a,b", /x,y/, 'c,d'"#).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], LiteralValue::String("a,b".into()));
        assert_eq!(
            values[1],
            LiteralValue::Regex {
                pattern: "x,y".into(),
                flags: String::new()
            }
        );
    }

    #[test]
    fn test_multiple_arguments() {
        let values = ArgumentParser::parse("{ name: 'Alice' }, { $set: { age: 31 } }").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_object().unwrap().get("name").unwrap().as_str(), Some("Alice"));
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse_one("true"), LiteralValue::Bool(true));
        assert_eq!(parse_one("null"), LiteralValue::Null);
        assert_eq!(parse_one("-1"), LiteralValue::Number(-1.0));
        assert_eq!(parse_one("2.5e2"), LiteralValue::Number(250.0));
        assert_eq!(parse_one("'x'"), LiteralValue::String("x".into()));
    }

    #[test]
    fn test_keys() {
        let value = parse_one(r#"{ bare: 1, "quoted key": 2, 'single': 3, 4: 5, $gt: 6, db: 7 }"#);
        let keys: Vec<&str> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["bare", "quoted key", "single", "4", "$gt", "db"]);
    }

    #[test]
    fn test_trailing_commas() {
        let values = ArgumentParser::parse("{ a: 1, }, [1, 2, ],").unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_call_expression_is_unsupported() {
        assert_eq!(error_kind("someFunc()"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("{ _id: ObjectId('abc') }"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("new Date()"), QueryErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn test_other_expression_forms_are_unsupported() {
        assert_eq!(error_kind("{ a: x }"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("{ a: this.b }"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("1 + 2"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("{ a: 1 }.a"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("(1)"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("{ [k]: 1 }"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("`x${y}`"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("-x"), QueryErrorKind::UnsupportedConstruct);
        assert_eq!(error_kind("db.users"), QueryErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn test_invalid_literals() {
        assert_eq!(error_kind("{ a: }"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("{ a 1 }"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("[1,,2]"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("1, , 2"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("{ a: 1 }}"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("[1}"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("1e999"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("/a/q"), QueryErrorKind::InvalidLiteral);
        assert_eq!(error_kind("@"), QueryErrorKind::InvalidLiteral);
    }

    #[test]
    fn test_unterminated_literals() {
        let err = ArgumentParser::parse("{ name: 'Ali }").unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::UnterminatedLiteral);
        assert_eq!(err.offset, Some(8));

        let err = ArgumentParser::parse("{ a: [1, 2 }").unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::InvalidLiteral);

        let err = ArgumentParser::parse("{ a: [1, 2]").unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::UnterminatedLiteral);
        assert_eq!(err.offset, Some(0));

        assert_eq!(error_kind("/abc"), QueryErrorKind::UnterminatedLiteral);
    }

    #[test]
    fn test_error_offsets_point_at_token() {
        let err = ArgumentParser::parse("{ a: 1 }, someFunc()").unwrap_err();
        assert_eq!(err.offset, Some(10));
    }

    #[test]
    fn test_round_trip_through_display() {
        let inputs = [
            r#"{ name: "Bob", age: { $gte: 18, $lt: 65 }, tags: ["a", 'b'], "x.y": null }"#,
            "[1, -2.5, true, false, {}, [], /^a\\/b/i]",
            "{ z: 1, a: 2, m: { q: [ { r: 's' } ] } }",
        ];
        for input in inputs {
            let value = parse_one(input);
            let rendered = value.to_string();
            assert_eq!(parse_one(&rendered), value, "round trip of {input}");
        }
    }

    #[test]
    fn test_round_trip_edge_literals() {
        let inputs = [
            r#""line\nbreak\ttab""#,
            r#"'caf\u00e9'"#,
            "\"bell\u{7} nul\\0 esc\\u001b\"",
            r#""quote \" and backslash \\""#,
            "/a[/]b/",
            r#"/x\/y/i"#,
            r#"{ "a b": 1, "1x": 2, $ne: "z", "": null }"#,
            "1e300",
            "1e-300",
            "2E-2",
            "-1.5e-7",
            "123456789012345678",
            "-0",
        ];
        for input in inputs {
            let value = parse_one(input);
            let rendered = value.to_string();
            assert_eq!(parse_one(&rendered), value, "round trip of {input} via {rendered}");
        }

        assert_eq!(parse_one(r#""caf\u00e9""#), LiteralValue::String("café".into()));
        assert_eq!(parse_one("2E-2"), LiteralValue::Number(0.02));
        match parse_one(&parse_one("-0").to_string()) {
            LiteralValue::Number(n) => assert!(n == 0.0 && n.is_sign_negative()),
            other => panic!("Expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert_eq!(error_kind(&deep), QueryErrorKind::InvalidLiteral);

        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(ArgumentParser::parse(&ok).is_ok());
    }
}
