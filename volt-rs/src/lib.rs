//! Reading Microsoft VOLT project sources.
//!
//! VOLT stores its project (glyph definitions, groups, anchors, and the
//! lookups themselves) as plain text, either in a `.vtp` file or embedded
//! in a font's private `TSIV` table. This crate parses that text into the
//! statements in [`ast`].
//!
//! ```
//! let file = volt_rs::parse(r#"DEF_GLYPH "a" ID 1 TYPE BASE END_GLYPH END"#).unwrap();
//! assert_eq!(file.statements.len(), 1);
//! ```

pub mod ast;
mod lexer;
mod parser;

pub use parser::{parse, ParseError};
