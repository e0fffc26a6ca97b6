use std::{fmt::Display, io, path::PathBuf};

use smol_str::SmolStr;
use thiserror::Error;
use volt_rs::{
    ast::{GlyphName, Location, SubstitutionKind},
    ParseError,
};
use write_fonts::{read::ReadError, types::Tag};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{location}: feature '{feature}' is defined more than once for script '{script}' language '{language}'")]
    DuplicateLanguageSystem {
        feature: Tag,
        script: Tag,
        language: Tag,
        location: Location,
    },
    #[error("{location}: reference to undefined group '{name}'")]
    UndefinedGroup { name: SmolStr, location: Location },
    #[error("{location}: mark glyph '{glyph}' has no anchor for mark class '{class}'")]
    UndefinedMarkAnchor {
        glyph: GlyphName,
        class: SmolStr,
        location: Location,
    },
    #[error("{location}: glyph '{glyph}' has no anchor '{anchor}'")]
    UndefinedAnchor {
        glyph: GlyphName,
        anchor: SmolStr,
        location: Location,
    },
    #[error("{location}: feature '{feature}' references undefined lookup '{name}'")]
    UndefinedLookup {
        name: SmolStr,
        feature: Tag,
        location: Location,
    },
    #[error("{location}: {kind} substitution cannot map {input} item(s) to {output} item(s)")]
    SubstitutionArity {
        kind: SubstitutionKind,
        input: usize,
        output: usize,
        location: Location,
    },
    #[error("{location}: pair {first} {second} is outside the {num_first}x{num_second} FIRST/SECOND lists")]
    PairIndexOutOfRange {
        first: u16,
        second: u16,
        num_first: usize,
        num_second: usize,
        location: Location,
    },
    #[error("{location}: {construct} is not supported")]
    Unsupported { construct: String, location: Location },
    #[error("{location}: the range starting at '{glyph}' needs the font's glyph order")]
    MissingGlyphOrder { glyph: GlyphName, location: Location },
    #[error("{location}: glyph '{glyph}' has id {id}, but the font has only {num_glyphs} glyphs")]
    GlyphIdOutOfRange {
        glyph: GlyphName,
        id: u16,
        num_glyphs: usize,
        location: Location,
    },
    #[error("{location}: range endpoint '{glyph}' has no DEF_GLYPH")]
    UnknownRangeGlyph { glyph: GlyphName, location: Location },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to read font '{path}': '{source}'")]
    FontRead {
        path: PathBuf,
        #[source]
        source: GlyphOrderError,
    },
    #[error("io failed for '{path}': '{source}'")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Problems reading the glyph order from a font.
#[derive(Debug, Error)]
pub enum GlyphOrderError {
    #[error("Failed to read font data: '{0}'")]
    ReadError(
        #[from]
        #[source]
        ReadError,
    ),
    /// Post table is missing glyph names
    #[error("The post table exists, but did not include all glyph names")]
    MissingNames,
}

/// Known simplifications, reported as warnings rather than errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Limitation {
    /// Anchors have no advance, so `ADV ADJUST_BY` on a `DEF_ANCHOR` is dropped.
    AnchorAdvanceDevice,
}

impl Display for Limitation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limitation::AnchorAdvanceDevice => {
                f.write_str("anchor advance device adjustments are dropped")
            }
        }
    }
}
