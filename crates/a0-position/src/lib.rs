//! Source-location primitives shared by every stage of the A0 pipeline:
//! the lexer and parser track [`ByteSpan`]s internally and convert to
//! [`Span`] (1-based file/line/column) only when constructing a token
//! or diagnostic, via a cached [`LineIndex`].

mod line_index;
mod span;

pub use line_index::LineIndex;
pub use span::{ByteSpan, Span};
