//! Finding the VOLT source to convert.
//!
//! The input is either a font carrying the project in its `TSIV` table, or
//! a plain VOLT project file.

use std::path::Path;

use log::{debug, warn};
use smol_str::SmolStr;
use write_fonts::{
    read::{FontRef, TableProvider},
    types::{GlyphId16, Tag},
};

use crate::error::{Error, GlyphOrderError};

/// The private table VOLT stores its project source in.
pub const TSIV: Tag = Tag::new(b"TSIV");

/// Glyph names, indexed by glyph id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphOrder(Vec<SmolStr>);

impl GlyphOrder {
    /// Read the glyph order from a font's `maxp` and `post` tables.
    pub fn from_font(font: &FontRef) -> Result<Self, GlyphOrderError> {
        let num_glyphs = font.maxp()?.num_glyphs();
        let post = font.post()?;
        (0..num_glyphs)
            .map(|gid| {
                post.glyph_name(GlyphId16::new(gid))
                    .map(SmolStr::new)
                    .ok_or(GlyphOrderError::MissingNames)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The name of the glyph with this id, if it exists.
    pub fn get(&self, id: u16) -> Option<&SmolStr> {
        self.0.get(id as usize)
    }
}

impl FromIterator<SmolStr> for GlyphOrder {
    fn from_iter<T: IntoIterator<Item = SmolStr>>(iter: T) -> Self {
        GlyphOrder(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for GlyphOrder {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        GlyphOrder(iter.into_iter().map(SmolStr::new).collect())
    }
}

/// VOLT source text, and the glyph order of the font it came from (if any).
#[derive(Clone, Debug)]
pub struct Source {
    pub text: String,
    pub glyph_order: Option<GlyphOrder>,
}

impl Source {
    /// Load a source from raw bytes, which may be a font or VOLT text.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Source, Error> {
        let Ok(font) = FontRef::new(bytes) else {
            debug!("'{}' is not a font, reading it as VOLT text", path.display());
            return Ok(Source {
                text: String::from_utf8_lossy(bytes).into_owned(),
                glyph_order: None,
            });
        };
        let glyph_order = GlyphOrder::from_font(&font).map_err(|source| Error::FontRead {
            path: path.to_owned(),
            source,
        })?;
        debug!(
            "'{}' is a font with {} glyphs",
            path.display(),
            glyph_order.len()
        );
        let text = match font.table_data(TSIV) {
            Some(data) => String::from_utf8_lossy(data.as_bytes()).into_owned(),
            None => {
                warn!(
                    "'{}' has no {TSIV} table, reading it as VOLT text",
                    path.display()
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        };
        Ok(Source {
            text,
            glyph_order: Some(glyph_order),
        })
    }
}

/// Read the VOLT source at `path`.
pub fn load(path: &Path) -> Result<Source, Error> {
    let bytes = std::fs::read(path).map_err(|source| Error::FileIo {
        path: path.to_owned(),
        source,
    })?;
    Source::from_bytes(path, &bytes)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use write_fonts::{
        dump_table,
        tables::{maxp::Maxp, post::Post},
        FontBuilder,
    };

    use super::*;

    fn maxp(num_glyphs: u16) -> Maxp {
        Maxp {
            num_glyphs,
            max_points: Some(0),
            max_contours: Some(0),
            max_composite_points: Some(0),
            max_composite_contours: Some(0),
            max_zones: Some(1),
            max_twilight_points: Some(0),
            max_storage: Some(0),
            max_function_defs: Some(0),
            max_instruction_defs: Some(0),
            max_stack_elements: Some(0),
            max_size_of_instructions: Some(0),
            max_component_elements: Some(0),
            max_component_depth: Some(0),
        }
    }

    fn font(names: &[&str], tsiv: Option<&str>) -> Vec<u8> {
        let mut builder = FontBuilder::default();
        builder.add_raw(
            Tag::new(b"maxp"),
            dump_table(&maxp(names.len() as u16)).unwrap(),
        );
        builder.add_raw(
            Tag::new(b"post"),
            dump_table(&Post::new_v2(names.iter().copied())).unwrap(),
        );
        if let Some(text) = tsiv {
            builder.add_raw(TSIV, text.as_bytes().to_vec());
        }
        builder.build()
    }

    #[test]
    fn plain_text() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("test.vtp");
        std::fs::write(&path, "GRID_PPEM 20\nEND\n").unwrap();
        let source = load(&path).unwrap();
        assert_eq!(source.text, "GRID_PPEM 20\nEND\n");
        assert!(source.glyph_order.is_none());
    }

    #[test]
    fn font_with_tsiv() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("test.ttf");
        let text = r#"DEF_GLYPH "a" ID 1 TYPE BASE END_GLYPH END"#;
        std::fs::write(&path, font(&[".notdef", "a", "b"], Some(text))).unwrap();
        let source = load(&path).unwrap();
        assert_eq!(source.text, text);
        let order = source.glyph_order.unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order.get(2).map(SmolStr::as_str), Some("b"));
        assert_eq!(order.get(3), None);
    }

    #[test]
    fn missing_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nope.vtp");
        assert!(matches!(load(&path), Err(Error::FileIo { .. })));
    }
}
