//! Completion context definitions
//!
//! This module defines what kind of completion should be provided for a
//! cursor position, and the word-boundary scan that finds the partially typed
//! token under the cursor.

use std::ops::Range;

/// Represents the type of completion needed based on the current context
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionContext {
    /// Complete collection names after `db.`
    Collection {
        /// Prefix to filter collections
        prefix: String,
    },

    /// Complete base operation names after `db.<collection>.`
    Method {
        /// Prefix to filter operations
        prefix: String,
    },

    /// Complete cursor modifiers after `db.<collection>.<call>(...).`
    Modifier {
        /// Prefix to filter modifiers
        prefix: String,
    },

    /// Complete aggregation stages at a pipeline stage-start position
    Stage {
        /// Prefix to filter stages
        prefix: String,
    },

    /// Complete query operators and accumulators
    Operator {
        /// Prefix to filter operators
        prefix: String,
    },

    /// Complete field paths from the active schema
    Field {
        /// Prefix to filter field paths, without a leading `$`
        prefix: String,
        /// The field is being written as a `$field` reference
        reference: bool,
    },

    /// No completion available
    None,
}

impl CompletionContext {
    /// Get the prefix for this context
    pub fn prefix(&self) -> &str {
        match self {
            Self::Collection { prefix }
            | Self::Method { prefix }
            | Self::Modifier { prefix }
            | Self::Stage { prefix }
            | Self::Operator { prefix }
            | Self::Field { prefix, .. } => prefix,
            Self::None => "",
        }
    }

    /// Check if this is a None context
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Characters that make up a completable word
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Move `cursor` into `text` and back onto a character boundary.
pub fn clamp_cursor(text: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(text.len());
    while !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

/// Byte range of the word around `cursor`, scanning backward and forward
/// over word characters. Empty at `cursor` when no word touches it.
pub fn word_range(text: &str, cursor: usize) -> Range<usize> {
    let cursor = clamp_cursor(text, cursor);

    let start = text[..cursor]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_word_char(*ch))
        .last()
        .map_or(cursor, |(i, _)| i);

    let end = cursor
        + text[cursor..]
            .chars()
            .take_while(|ch| is_word_char(*ch))
            .map(char::len_utf8)
            .sum::<usize>();

    start..end
}
