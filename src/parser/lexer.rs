//! Shell lexer for query text
//!
//! Tokenizes `db.collection.operation(...)` text and the literal arguments
//! inside the parentheses. The same lexer serves the parser and the
//! completion engine, so it is forgiving:
//!
//! - **Never panics** - always returns a token stream ending in `EOF`
//! - **Never rejects input** - unknown characters become `Unknown` tokens
//! - **Reports unterminated literals** - strings and regexes carry a
//!   `terminated` flag instead of failing
//!
//! Spans are byte ranges into the input.

use std::ops::Range;

/// Token types for shell syntax
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// "db" keyword
    Db,
    /// Identifier (collection name, operation name, object key, ...)
    Ident(String),
    /// Dot separator
    Dot,
    /// Left parenthesis
    LParen,
    /// Right parenthesis
    RParen,
    /// Left brace
    LBrace,
    /// Right brace
    RBrace,
    /// Left bracket
    LBracket,
    /// Right bracket
    RBracket,
    /// Comma
    Comma,
    /// Colon
    Colon,
    /// Semicolon
    Semicolon,
    /// String literal with its decoded value
    String {
        value: String,
        quote: char,
        terminated: bool,
    },
    /// Number literal, unsigned; a leading minus is a separate `Operator('-')`
    Number(String),
    /// Regex literal: `/pattern/flags`
    Regex {
        pattern: String,
        flags: String,
        terminated: bool,
    },
    /// Arithmetic, comparison or logical operator character
    Operator(char),
    /// End of input
    EOF,
    /// Unknown character
    Unknown(char),
}

/// Token with position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// True for `(`, `[` and `{`
    pub fn is_opener(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace
        )
    }

    /// True for `)`, `]` and `}`
    pub fn is_closer(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
        )
    }

    /// True for a string or regex literal that runs to the end of input
    pub fn is_unterminated(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::String {
                terminated: false,
                ..
            } | TokenKind::Regex {
                terminated: false,
                ..
            }
        )
    }
}

/// Error-tolerant tokenizer
pub struct Lexer {
    input: Vec<(usize, char)>,
    len: usize,
    pos: usize,
    /// Whether a `/` at the current position starts a regex literal
    regex_allowed: bool,
}

impl Lexer {
    /// Create a new lexer from input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.char_indices().collect(),
            len: input.len(),
            pos: 0,
            regex_allowed: true,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Self::new(input);
        let mut tokens = Vec::new();

        loop {
            let token = lexer.next_token();
            let is_eof = matches!(token.kind, TokenKind::EOF);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token
    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.offset();

        if self.is_at_end() {
            return Token::new(TokenKind::EOF, start..start);
        }

        let ch = self.current_char();

        let token = match ch {
            '.' => self.single(TokenKind::Dot, start),
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            ',' => self.single(TokenKind::Comma, start),
            ':' => self.single(TokenKind::Colon, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '\'' | '"' | '`' => self.scan_string(ch, start),
            '/' if self.regex_allowed => self.scan_regex(start),
            '0'..='9' => self.scan_number(start),
            'a'..='z' | 'A'..='Z' | '_' | '$' => self.scan_identifier(start),
            '+' | '-' | '*' | '/' | '%' | '!' | '<' | '>' | '=' | '&' | '|' | '?' | '^' | '~' => {
                self.single(TokenKind::Operator(ch), start)
            }
            _ => self.single(TokenKind::Unknown(ch), start),
        };

        // A regex may start wherever a value may start.
        self.regex_allowed = matches!(
            token.kind,
            TokenKind::LParen
                | TokenKind::LBrace
                | TokenKind::LBracket
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::Semicolon
                | TokenKind::Operator(_)
        );

        token
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.advance();
        Token::new(kind, start..self.offset())
    }

    /// Scan a string literal
    fn scan_string(&mut self, quote: char, start: usize) -> Token {
        self.advance(); // Skip opening quote

        let mut value = String::new();
        let mut terminated = false;

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch == quote {
                self.advance();
                terminated = true;
                break;
            }
            if ch == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                match self.current_char() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'b' => value.push('\u{8}'),
                    'f' => value.push('\u{c}'),
                    '0' => value.push('\0'),
                    'u' => {
                        if let Some(decoded) = self.scan_unicode_escape() {
                            value.push(decoded);
                            continue;
                        }
                        value.push_str("\\u");
                    }
                    other => value.push(other),
                }
            } else {
                value.push(ch);
            }
            self.advance();
        }

        Token::new(
            TokenKind::String {
                value,
                quote,
                terminated,
            },
            start..self.offset(),
        )
    }

    /// Decode the four hex digits after `\u`, leaving the lexer after them.
    fn scan_unicode_escape(&mut self) -> Option<char> {
        let digits: String = (1..=4)
            .filter_map(|i| self.input.get(self.pos + i).map(|(_, c)| *c))
            .collect();
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let decoded = u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)?;
        for _ in 0..5 {
            self.advance();
        }
        Some(decoded)
    }

    /// Scan a regex literal: `/pattern/flags`
    fn scan_regex(&mut self, start: usize) -> Token {
        self.advance(); // Skip opening slash

        let mut pattern = String::new();
        let mut in_class = false;
        let mut terminated = false;

        while !self.is_at_end() {
            let ch = self.current_char();
            match ch {
                '\\' => {
                    pattern.push(ch);
                    self.advance();
                    if !self.is_at_end() {
                        pattern.push(self.current_char());
                        self.advance();
                    }
                    continue;
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    self.advance();
                    terminated = true;
                    break;
                }
                '\n' => break,
                _ => {}
            }
            pattern.push(ch);
            self.advance();
        }

        let mut flags = String::new();
        if terminated {
            while !self.is_at_end() && self.current_char().is_ascii_alphabetic() {
                flags.push(self.current_char());
                self.advance();
            }
        }

        Token::new(
            TokenKind::Regex {
                pattern,
                flags,
                terminated,
            },
            start..self.offset(),
        )
    }

    /// Scan a number (integer, decimal, optional exponent)
    fn scan_number(&mut self, start: usize) -> Token {
        let mut value = String::new();

        self.take_digits(&mut value);

        // Handle decimal point
        if self.current_char() == '.' && self.peek_char().is_ascii_digit() {
            value.push('.');
            self.advance();
            self.take_digits(&mut value);
        }

        // Handle exponent
        if matches!(self.current_char(), 'e' | 'E') {
            let next = self.peek_char();
            let signed_digit = matches!(next, '+' | '-')
                && self
                    .input
                    .get(self.pos + 2)
                    .is_some_and(|(_, c)| c.is_ascii_digit());
            if next.is_ascii_digit() || signed_digit {
                value.push(self.current_char());
                self.advance();
                if matches!(self.current_char(), '+' | '-') {
                    value.push(self.current_char());
                    self.advance();
                }
                self.take_digits(&mut value);
            }
        }

        Token::new(TokenKind::Number(value), start..self.offset())
    }

    fn take_digits(&mut self, value: &mut String) {
        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self, start: usize) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Check if it's the "db" keyword
        let kind = if value == "db" {
            TokenKind::Db
        } else {
            TokenKind::Ident(value)
        };

        Token::new(kind, start..self.offset())
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Byte offset of the current position
    fn offset(&self) -> usize {
        self.input.get(self.pos).map_or(self.len, |(offset, _)| *offset)
    }

    /// Get current character
    fn current_char(&self) -> char {
        self.input.get(self.pos).map_or('\0', |(_, c)| *c)
    }

    /// Peek at next character
    fn peek_char(&self) -> char {
        self.input.get(self.pos + 1).map_or('\0', |(_, c)| *c)
    }

    /// Advance position
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_db_collection_operation() {
        let tokens = Lexer::tokenize("db.users.find");
        assert!(matches!(tokens[0].kind, TokenKind::Db));
        assert!(matches!(tokens[1].kind, TokenKind::Dot));
        assert!(matches!(tokens[2].kind, TokenKind::Ident(ref s) if s == "users"));
        assert!(matches!(tokens[3].kind, TokenKind::Dot));
        assert!(matches!(tokens[4].kind, TokenKind::Ident(ref s) if s == "find"));
        assert!(matches!(tokens[5].kind, TokenKind::EOF));
    }

    #[test]
    fn test_tokenize_empty_input() {
        let tokens = Lexer::tokenize("");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0].kind, TokenKind::EOF));
    }

    #[test]
    fn test_string_escapes_and_quotes() {
        let tokens = Lexer::tokenize(r#"'it\'s' "a\nb" "A""#);
        assert!(matches!(
            &tokens[0].kind,
            TokenKind::String { value, quote: '\'', terminated: true } if value == "it's"
        ));
        assert!(matches!(
            &tokens[1].kind,
            TokenKind::String { value, .. } if value == "a\nb"
        ));
        assert!(matches!(
            &tokens[2].kind,
            TokenKind::String { value, .. } if value == "A"
        ));
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::tokenize("{ name: 'Ali");
        let last = &tokens[tokens.len() - 2];
        assert!(last.is_unterminated());
        assert_eq!(last.span.start, 8);
    }

    #[test]
    fn test_regex_versus_division() {
        let tokens = Lexer::tokenize("{ name: /^al[/]ice/i }");
        assert!(matches!(
            &tokens[3].kind,
            TokenKind::Regex { pattern, flags, terminated: true } if pattern == "^al[/]ice" && flags == "i"
        ));

        let tokens = Lexer::tokenize("10 / 2");
        assert!(matches!(tokens[1].kind, TokenKind::Operator('/')));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("3.14 1e3 2E-2 -7"),
            vec![
                TokenKind::Number("3.14".into()),
                TokenKind::Number("1e3".into()),
                TokenKind::Number("2E-2".into()),
                TokenKind::Operator('-'),
                TokenKind::Number("7".into()),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = Lexer::tokenize("'é' x");
        assert_eq!(tokens[0].span, 0..4);
        assert_eq!(tokens[1].span, 5..6);
    }

    #[test]
    fn test_dollar_identifiers() {
        let tokens = Lexer::tokenize("{$match: {}}");
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "$match"));
    }

    #[test]
    fn test_unknown_chars() {
        let tokens = Lexer::tokenize("db.users@");
        assert!(
            tokens
                .iter()
                .any(|t| matches!(t.kind, TokenKind::Unknown('@')))
        );
    }
}
