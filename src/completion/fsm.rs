//! Finite State Machine for completion context determination
//!
//! The machine walks the tokens in front of the cursor once and keeps two
//! things: where in the `db.<collection>.<call>(...)` chain the cursor is,
//! and a stack of the brackets open inside call arguments. The context is
//! then picked by testing, in order:
//!
//! 1. after `db.` → collections
//! 2. after `db.<collection>.` → base methods, after `).` → cursor modifiers
//! 3. at a stage-start position of an `aggregate([...])` pipeline → stages
//! 4. on a `$` token, or after `{` / `,` inside an argument object → operators
//! 5. directly after an opening quote, with a schema → fields
//!
//! Anything else yields no context. The machine never fails on bad input; it
//! settles in `Invalid` instead.

use super::context::CompletionContext;
use crate::parser::lexer::{Lexer, Token, TokenKind};

/// FSM states representing positions in a query chain
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionState {
    /// Initial state
    Start,
    /// After "db" keyword
    AfterDb,
    /// After "db." - should complete collection names
    AfterDbDot,
    /// After "db.collection"
    AfterCollection,
    /// After "db.collection." - should complete operation names
    AfterCollectionDot,
    /// After an operation name, before its `(`
    AfterMethod { aggregate: bool },
    /// Between a call's parentheses
    InsideArguments,
    /// After a call's closing `)`
    AfterCall,
    /// After "db.collection.call()." - should complete modifiers
    AfterCallDot,
    /// Input that cannot be part of a query chain
    Invalid,
}

/// An open bracket inside call arguments
#[derive(Debug, Clone, Copy, PartialEq)]
enum Frame {
    Paren { aggregate: bool },
    Object,
    Array { pipeline: bool },
}

/// Token-driven context machine
#[derive(Debug, Clone)]
pub struct ContextMachine {
    state: CompletionState,
    frames: Vec<Frame>,
    last: Option<TokenKind>,
}

impl Default for ContextMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextMachine {
    pub fn new() -> Self {
        Self {
            state: CompletionState::Start,
            frames: Vec::new(),
            last: None,
        }
    }

    pub fn state(&self) -> &CompletionState {
        &self.state
    }

    /// Perform the transition for one token
    pub fn feed(&mut self, token: &Token) {
        use CompletionState::*;

        let next = match (self.state.clone(), &token.kind) {
            (Invalid, _) => Invalid,
            (state, TokenKind::EOF) => state,

            (Start, TokenKind::Db) => AfterDb,
            (AfterDb, TokenKind::Dot) => AfterDbDot,
            (AfterDbDot, TokenKind::Ident(_) | TokenKind::Db | TokenKind::Number(_)) => {
                AfterCollection
            }
            // "2024_logs" lexes as a number followed by an identifier
            (AfterCollection, TokenKind::Ident(_))
                if matches!(self.last, Some(TokenKind::Number(_))) =>
            {
                AfterCollection
            }
            (AfterCollection, TokenKind::Dot) => AfterCollectionDot,
            (AfterCollectionDot, TokenKind::Ident(name)) => AfterMethod {
                aggregate: name == "aggregate",
            },
            (AfterCallDot, TokenKind::Ident(_)) => AfterMethod { aggregate: false },
            (AfterMethod { aggregate }, TokenKind::LParen) => {
                self.frames.push(Frame::Paren { aggregate });
                InsideArguments
            }

            (InsideArguments, kind) => self.inside_arguments(kind),

            (AfterCall, TokenKind::Dot) => AfterCallDot,

            _ => Invalid,
        };

        self.state = next;
        self.last = Some(token.kind.clone());
    }

    fn inside_arguments(&mut self, kind: &TokenKind) -> CompletionState {
        let frame = match kind {
            TokenKind::LParen => Some(Frame::Paren { aggregate: false }),
            TokenKind::LBrace => Some(Frame::Object),
            TokenKind::LBracket => {
                let first_argument_of_aggregate =
                    matches!(self.frames.last(), Some(Frame::Paren { aggregate: true }))
                        && self.frames.len() == 1
                        && matches!(self.last, Some(TokenKind::LParen));
                Some(Frame::Array {
                    pipeline: first_argument_of_aggregate,
                })
            }
            _ => None,
        };

        if let Some(frame) = frame {
            self.frames.push(frame);
            return CompletionState::InsideArguments;
        }

        let closes = |frame: &Frame| match kind {
            TokenKind::RParen => matches!(frame, Frame::Paren { .. }),
            TokenKind::RBrace => matches!(frame, Frame::Object),
            TokenKind::RBracket => matches!(frame, Frame::Array { .. }),
            _ => false,
        };

        if !matches!(
            kind,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket
        ) {
            return CompletionState::InsideArguments;
        }

        match self.frames.last() {
            Some(top) if closes(top) => {
                self.frames.pop();
                if self.frames.is_empty() {
                    CompletionState::AfterCall
                } else {
                    CompletionState::InsideArguments
                }
            }
            _ => CompletionState::Invalid,
        }
    }

    /// Context for a cursor outside any string or regex literal
    ///
    /// `typed` is the part of the word under the cursor that precedes it.
    pub fn to_context(&self, typed: &str) -> CompletionContext {
        let prefix = typed.to_string();

        match self.state {
            CompletionState::AfterDbDot => CompletionContext::Collection { prefix },
            CompletionState::AfterCollectionDot => CompletionContext::Method { prefix },
            CompletionState::AfterCallDot => CompletionContext::Modifier { prefix },
            CompletionState::InsideArguments => {
                let after_separator = |opener: TokenKind| {
                    self.last == Some(opener) || self.last == Some(TokenKind::Comma)
                };

                match self.frames.last() {
                    Some(Frame::Array { pipeline: true }) if after_separator(TokenKind::LBracket) => {
                        CompletionContext::Stage { prefix }
                    }
                    _ if typed.starts_with('$') => CompletionContext::Operator { prefix },
                    Some(Frame::Object) if after_separator(TokenKind::LBrace) => {
                        CompletionContext::Operator { prefix }
                    }
                    _ => CompletionContext::None,
                }
            }
            _ => CompletionContext::None,
        }
    }
}

/// Classify the cursor position in `text`
///
/// `word_start` is where the word under the cursor begins; tokens from there
/// on are the partially typed word and are not fed to the machine.
/// `has_schema` enables field completion inside strings.
pub fn analyze(text: &str, cursor: usize, word_start: usize, has_schema: bool) -> CompletionContext {
    let before = &text[..cursor];
    let typed = &before[word_start..];
    let tokens = Lexer::tokenize(before);

    let mut machine = ContextMachine::new();
    for token in &tokens {
        if token.is_unterminated() {
            return literal_context(&machine, token, typed, word_start, has_schema);
        }
        if token.span.start >= word_start || matches!(token.kind, TokenKind::EOF) {
            break;
        }
        machine.feed(token);
    }

    machine.to_context(typed)
}

/// Context for a cursor inside an open string or regex literal
fn literal_context(
    machine: &ContextMachine,
    literal: &Token,
    typed: &str,
    word_start: usize,
    has_schema: bool,
) -> CompletionContext {
    let TokenKind::String { quote, .. } = literal.kind else {
        return CompletionContext::None;
    };

    let directly_after_quote = word_start == literal.span.start + quote.len_utf8();
    if !has_schema
        || !matches!(quote, '"' | '\'')
        || !directly_after_quote
        || *machine.state() != CompletionState::InsideArguments
    {
        return CompletionContext::None;
    }

    match typed.strip_prefix('$') {
        Some(rest) => CompletionContext::Field {
            prefix: rest.to_string(),
            reference: true,
        },
        None => CompletionContext::Field {
            prefix: typed.to_string(),
            reference: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::context::word_range;

    fn context_at_end(text: &str, has_schema: bool) -> CompletionContext {
        let range = word_range(text, text.len());
        analyze(text, text.len(), range.start, has_schema)
    }

    fn state_of(text: &str) -> CompletionState {
        let mut machine = ContextMachine::new();
        for token in &Lexer::tokenize(text) {
            machine.feed(token);
        }
        machine.state().clone()
    }

    #[test]
    fn test_chain_states() {
        assert_eq!(state_of("db"), CompletionState::AfterDb);
        assert_eq!(state_of("db."), CompletionState::AfterDbDot);
        assert_eq!(state_of("db.users"), CompletionState::AfterCollection);
        assert_eq!(state_of("db.users."), CompletionState::AfterCollectionDot);
        assert_eq!(
            state_of("db.users.aggregate"),
            CompletionState::AfterMethod { aggregate: true }
        );
        assert_eq!(state_of("db.users.find({"), CompletionState::InsideArguments);
        assert_eq!(state_of("db.users.find({})"), CompletionState::AfterCall);
        assert_eq!(state_of("db.users.find({})."), CompletionState::AfterCallDot);
    }

    #[test]
    fn test_invalid_input_settles() {
        assert_eq!(state_of("users."), CompletionState::Invalid);
        assert_eq!(state_of("db.users.find(})."), CompletionState::Invalid);
        assert_eq!(state_of("db.users.find();"), CompletionState::Invalid);
    }

    #[test]
    fn test_numeric_collection_name() {
        assert_eq!(state_of("db.2024_logs."), CompletionState::AfterCollectionDot);
    }

    #[test]
    fn test_collection_context() {
        assert_eq!(
            context_at_end("db.", false),
            CompletionContext::Collection {
                prefix: String::new()
            }
        );
        assert_eq!(
            context_at_end("  db . us", false),
            CompletionContext::Collection {
                prefix: "us".to_string()
            }
        );
    }

    #[test]
    fn test_method_and_modifier_context() {
        assert_eq!(
            context_at_end("db.users.fi", false),
            CompletionContext::Method {
                prefix: "fi".to_string()
            }
        );
        assert_eq!(
            context_at_end("db.users.find({ a: 1 }).li", false),
            CompletionContext::Modifier {
                prefix: "li".to_string()
            }
        );
    }

    #[test]
    fn test_stage_context() {
        assert!(matches!(
            context_at_end("db.orders.aggregate([", false),
            CompletionContext::Stage { .. }
        ));
        assert!(matches!(
            context_at_end("db.orders.aggregate([ { $match: {} }, ", false),
            CompletionContext::Stage { .. }
        ));
        assert_eq!(
            context_at_end("db.orders.aggregate([$gr", false),
            CompletionContext::Stage {
                prefix: "$gr".to_string()
            }
        );
    }

    #[test]
    fn test_nested_array_is_not_a_pipeline() {
        // A second argument array, or an array inside a stage, is not a stage-start
        assert!(context_at_end("db.orders.aggregate([], [", false).is_none());
        assert!(context_at_end("db.orders.find({ tags: [", false).is_none());
    }

    #[test]
    fn test_operator_context() {
        assert_eq!(
            context_at_end("db.users.find({ $", false),
            CompletionContext::Operator {
                prefix: "$".to_string()
            }
        );
        assert!(matches!(
            context_at_end("db.users.find({ age: 1, ", false),
            CompletionContext::Operator { .. }
        ));
        assert!(matches!(
            context_at_end("db.orders.aggregate([{ $", false),
            CompletionContext::Operator { .. }
        ));
        assert!(matches!(
            context_at_end("db.users.find({ age: { $g", false),
            CompletionContext::Operator { .. }
        ));
    }

    #[test]
    fn test_field_context_requires_schema() {
        assert!(context_at_end("db.users.find({ \"", false).is_none());
        assert_eq!(
            context_at_end("db.users.find({ \"na", true),
            CompletionContext::Field {
                prefix: "na".to_string(),
                reference: false
            }
        );
    }

    #[test]
    fn test_field_reference_context() {
        assert_eq!(
            context_at_end("db.orders.aggregate([{ $group: { _id: \"$", true),
            CompletionContext::Field {
                prefix: String::new(),
                reference: true
            }
        );
        assert_eq!(
            context_at_end("db.orders.distinct('", true),
            CompletionContext::Field {
                prefix: String::new(),
                reference: false
            }
        );
    }

    #[test]
    fn test_no_field_context_mid_string() {
        assert!(context_at_end("db.users.find({ name: \"Al ", true).is_none());
        assert!(context_at_end("db.users.find({ name: `", true).is_none());
        assert!(context_at_end("db.users.find({ name: /ab", true).is_none());
    }

    #[test]
    fn test_no_context() {
        assert!(context_at_end("", false).is_none());
        assert!(context_at_end("db.users.find({ age: ", false).is_none());
        assert!(context_at_end("db.users.find({ age: 1 }) ", false).is_none());
        assert!(context_at_end("show ", false).is_none());
    }
}
