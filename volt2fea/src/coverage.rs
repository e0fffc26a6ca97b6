//! Resolving VOLT coverage expressions against the symbol table.

use smol_str::SmolStr;
use volt_rs::ast::{CoverageItem, GlyphName, Location};

use crate::{collect::SymbolTable, error::Error, fea::GlyphOrClass};

impl SymbolTable {
    /// The output name of a glyph.
    ///
    /// Glyphs without a `DEF_GLYPH` are passed through unchanged.
    pub fn glyph_name(&self, name: &GlyphName) -> SmolStr {
        match self.glyphs.get(name) {
            Some(info) => info.output_name.clone(),
            None => name.as_str().into(),
        }
    }

    /// Resolve each item of a coverage in turn.
    pub fn resolve_coverage(
        &self,
        coverage: &[CoverageItem],
        location: Location,
    ) -> Result<Vec<GlyphOrClass>, Error> {
        coverage
            .iter()
            .map(|item| self.resolve_item(item, location))
            .collect()
    }

    /// Resolve a list of coverages (such as the entries of a `LEFT`
    /// context) into one sequence.
    pub fn resolve_sequence(
        &self,
        coverages: &[Vec<CoverageItem>],
        location: Location,
    ) -> Result<Vec<GlyphOrClass>, Error> {
        let mut items = Vec::new();
        for coverage in coverages {
            items.extend(self.resolve_coverage(coverage, location)?);
        }
        Ok(items)
    }

    pub fn resolve_item(
        &self,
        item: &CoverageItem,
        location: Location,
    ) -> Result<GlyphOrClass, Error> {
        match item {
            CoverageItem::Glyph(name) => Ok(GlyphOrClass::Glyph(self.glyph_name(name))),
            CoverageItem::Group(name) => self
                .group(name, location)
                .map(|group| GlyphOrClass::Class(group.name.clone())),
            CoverageItem::Enum(items) => self
                .resolve_coverage(items, location)
                .map(GlyphOrClass::literal),
            CoverageItem::Range(start, end) => {
                let names = self
                    .range_ids(start, end, location)?
                    .map(|id| self.glyph_at(start, id, location))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GlyphOrClass::Literal(
                    names.into_iter().map(GlyphOrClass::Glyph).collect(),
                ))
            }
        }
    }

    /// Every glyph covered, as VOLT names, with groups expanded.
    pub fn glyph_set(
        &self,
        coverage: &[CoverageItem],
        location: Location,
    ) -> Result<Vec<GlyphName>, Error> {
        let mut glyphs = Vec::new();
        for item in coverage {
            match item {
                CoverageItem::Glyph(name) => glyphs.push(name.clone()),
                CoverageItem::Group(name) => {
                    glyphs.extend(self.group(name, location)?.glyphs.iter().cloned())
                }
                CoverageItem::Enum(items) => glyphs.extend(self.glyph_set(items, location)?),
                CoverageItem::Range(start, end) => {
                    for id in self.range_ids(start, end, location)? {
                        let name = match self.names_by_id.get(&id) {
                            Some(name) => name.clone(),
                            None => self.glyph_at(start, id, location)?.into(),
                        };
                        glyphs.push(name);
                    }
                }
            }
        }
        Ok(glyphs)
    }

    /// The number of glyphs covered, counting duplicates.
    pub fn glyph_count(
        &self,
        coverage: &[CoverageItem],
        location: Location,
    ) -> Result<usize, Error> {
        self.glyph_set(coverage, location).map(|glyphs| glyphs.len())
    }

    fn range_ids(
        &self,
        start: &GlyphName,
        end: &GlyphName,
        location: Location,
    ) -> Result<std::ops::RangeInclusive<u16>, Error> {
        if self.glyph_order.is_none() {
            return Err(Error::MissingGlyphOrder {
                glyph: start.clone(),
                location,
            });
        }
        let id = |name: &GlyphName| {
            self.glyphs
                .get(name)
                .map(|info| info.id)
                .ok_or_else(|| Error::UnknownRangeGlyph {
                    glyph: name.clone(),
                    location,
                })
        };
        Ok(id(start)?..=id(end)?)
    }

    fn glyph_at(&self, start: &GlyphName, id: u16, location: Location) -> Result<SmolStr, Error> {
        let Some(order) = &self.glyph_order else {
            return Err(Error::MissingGlyphOrder {
                glyph: start.clone(),
                location,
            });
        };
        order
            .get(id)
            .cloned()
            .ok_or_else(|| Error::GlyphIdOutOfRange {
                glyph: start.clone(),
                id,
                num_glyphs: order.len(),
                location,
            })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{collect::collect, source::GlyphOrder};

    use super::*;

    const GLYPHS: &str = r#"DEF_GLYPH "a" ID 1 TYPE BASE END_GLYPH
        DEF_GLYPH "b" ID 2 TYPE BASE END_GLYPH
        DEF_GLYPH "c" ID 3 TYPE BASE END_GLYPH
        DEF_GLYPH "d" ID 4 TYPE BASE END_GLYPH
        DEF_GROUP "bc" ENUM GLYPH "b" GLYPH "c" END_ENUM END_GROUP
    "#;

    fn table(order: Option<GlyphOrder>) -> SymbolTable {
        collect(&volt_rs::parse(GLYPHS).unwrap(), order).unwrap()
    }

    fn order() -> GlyphOrder {
        [".notdef", "a", "b", "c", "d"].into_iter().collect()
    }

    fn glyph(name: &str) -> GlyphOrClass {
        GlyphOrClass::Glyph(name.into())
    }

    #[test]
    fn glyphs_groups_and_enums() {
        let table = table(None);
        let coverage = vec![
            CoverageItem::Glyph("a".into()),
            CoverageItem::Group("BC".into()),
            CoverageItem::Enum(vec![
                CoverageItem::Glyph("d".into()),
                CoverageItem::Glyph("undefined".into()),
            ]),
        ];
        let resolved = table
            .resolve_coverage(&coverage, Location::default())
            .unwrap();
        assert_eq!(
            resolved,
            vec![
                glyph("a"),
                GlyphOrClass::Class("bc".into()),
                GlyphOrClass::Literal(vec![glyph("d"), glyph("undefined")]),
            ]
        );
        assert_eq!(table.glyph_count(&coverage, Location::default()).unwrap(), 5);
    }

    #[test]
    fn ranges_expand_from_glyph_order() {
        let table = table(Some(order()));
        let range = CoverageItem::Range("b".into(), "d".into());
        assert_eq!(
            table.resolve_item(&range, Location::default()).unwrap(),
            GlyphOrClass::Literal(vec![glyph("b"), glyph("c"), glyph("d")])
        );
        assert_eq!(
            table.glyph_set(&[range], Location::default()).unwrap(),
            vec![GlyphName::from("b"), "c".into(), "d".into()]
        );
    }

    #[test]
    fn ranges_need_a_glyph_order() {
        let table = table(None);
        let range = CoverageItem::Range("a".into(), "c".into());
        assert!(matches!(
            table.resolve_item(&range, Location::default()),
            Err(Error::MissingGlyphOrder { .. })
        ));
    }

    #[test]
    fn range_endpoints_must_be_defined() {
        let table = table(Some(order()));
        let range = CoverageItem::Range("a".into(), "zzz".into());
        assert!(matches!(
            table.resolve_item(&range, Location::default()),
            Err(Error::UnknownRangeGlyph { glyph, .. }) if glyph.as_str() == "zzz"
        ));
    }

    #[test]
    fn undefined_group() {
        let table = table(None);
        assert!(matches!(
            table.resolve_item(&CoverageItem::Group("nope".into()), Location::default()),
            Err(Error::UndefinedGroup { .. })
        ));
    }
}
