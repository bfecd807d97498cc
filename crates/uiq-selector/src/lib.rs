//! uiq selectors
//!
//! CSS-like selectors over UI trees. A selector is a chain of segments joined
//! by connectives; the rightmost segment is the target.
//!
//! ```text
//! FrameLayout > Button[vid='submit'][clickable=true]
//! ListView <2 *[text^='Item']
//! ```

mod ast;
mod parser;

pub use ast::{Connective, Literal, Operator, Predicate, Relation, Segment, Selector};
pub use parser::{is_valid_name, parse};

/// Selector parsing error; offsets are byte offsets into the source string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Unexpected character {ch:?} at {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unexpected end of selector at {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("Invalid literal at {offset}")]
    InvalidLiteral { offset: usize },

    #[error("Invalid offset window at {offset}")]
    InvalidWindow { offset: usize },

    #[error("Unknown attribute {name:?} at {offset}")]
    UnknownAttribute { name: String, offset: usize },

    #[error("Invalid regex at {offset}: {message}")]
    InvalidRegex { offset: usize, message: String },
}
