//! Convert Microsoft VOLT layout sources into OpenType feature files.
//!
//! Conversion runs in two passes over the parsed source. [`collect`] gathers
//! glyphs, groups, anchors and language systems into a [`SymbolTable`], then
//! [`translate`] turns each lookup into feature file rules against that
//! (frozen) table. [`assemble`] puts the result together:
//!
//! ```
//! let source = r#"
//! DEF_GLYPH "a" ID 1 TYPE BASE END_GLYPH
//! DEF_GLYPH "b" ID 2 TYPE BASE END_GLYPH
//! DEF_SCRIPT NAME "Latin" TAG "latn"
//! DEF_LANGSYS NAME "Default" TAG "dflt"
//! DEF_FEATURE NAME "Standard Ligatures" TAG "liga"
//! LOOKUP "a to b"
//! END_FEATURE
//! END_LANGSYS
//! END_SCRIPT
//! DEF_LOOKUP "a to b" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR
//! IN_CONTEXT
//! END_CONTEXT
//! AS_SUBSTITUTION
//! SUB GLYPH "a"
//! WITH GLYPH "b"
//! END_SUB
//! END_SUBSTITUTION
//! END
//! "#;
//! let fea = volt2fea::convert_str(source, None, &Default::default()).unwrap();
//! assert!(fea.contains("sub a by b;"));
//! ```

#[cfg(feature = "cli")]
mod args;
mod assemble;
mod collect;
mod config;
mod coverage;
mod error;
pub mod fea;
mod lookups;
mod names;
mod source;
mod split;

use std::path::Path;

use log::debug;
use volt_rs::ast::VoltFile;

#[cfg(feature = "cli")]
pub use args::Args;
pub use assemble::assemble;
pub use collect::{collect, Group, MarkAnchorKey, SymbolTable};
pub use config::Options;
pub use error::{Error, GlyphOrderError, Limitation};
pub use lookups::{translate, LookupKind, TranslatedLookup, Translation};
pub use names::{NameKind, NameSanitizer};
pub use source::{load, GlyphOrder, Source, TSIV};
pub use split::LookupId;

/// Convert a parsed VOLT source.
pub fn convert(
    file: &VoltFile,
    glyph_order: Option<GlyphOrder>,
    options: &Options,
) -> Result<fea::FeatureFile, Error> {
    let table = collect(file, glyph_order)?;
    let translation = translate(file, &table, options)?;
    assemble(&table, translation)
}

/// Convert VOLT source text to feature file text.
pub fn convert_str(
    text: &str,
    glyph_order: Option<GlyphOrder>,
    options: &Options,
) -> Result<String, Error> {
    let file = volt_rs::parse(text)?;
    debug!("parsed {} statements", file.statements.len());
    convert(&file, glyph_order, options).map(|fea| fea.to_string())
}

/// Convert the font or VOLT project at `path` to feature file text.
pub fn convert_path(path: &Path, options: &Options) -> Result<String, Error> {
    let source = load(path)?;
    convert_str(&source.text, source.glyph_order, options)
}
