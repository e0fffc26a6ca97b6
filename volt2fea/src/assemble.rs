//! Putting the translated pieces together into a feature file.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, warn};
use smol_str::SmolStr;
use write_fonts::types::Tag;

use crate::{
    collect::SymbolTable,
    error::Error,
    fea::{
        FeatureBlock, FeatureFile, GlyphClassDef, GlyphOrClass, LanguageLookups, LookupBlock,
        MarkClassDef, Rule,
    },
    lookups::{LookupKind, TranslatedLookup, Translation},
};

const DFLT: Tag = Tag::new(b"DFLT");

/// Build the feature file from the symbol table and the translated lookups.
pub fn assemble(table: &SymbolTable, translation: Translation) -> Result<FeatureFile, Error> {
    let glyph_classes = table
        .groups()
        .map(|group| GlyphClassDef {
            name: group.name.clone(),
            members: group.members.clone(),
        })
        .collect();

    let mark_classes = table
        .mark_anchors()
        .map(|(key, anchor)| MarkClassDef {
            glyph: GlyphOrClass::Glyph(table.glyph_name(&key.glyph)),
            anchor: anchor.clone(),
            class: table
                .mark_class_name(&key.class)
                .cloned()
                .unwrap_or_else(|| key.class.clone()),
            used: translation
                .used_marks
                .contains(&(key.glyph.clone(), key.class.clone())),
        })
        .collect();

    let Lookups { blocks, labels } = Lookups::merge(translation);
    let features = features(table, &labels)?;
    let gdef = Some(table.gdef().clone()).filter(|gdef| !gdef.is_empty());

    Ok(FeatureFile {
        glyph_classes,
        mark_classes,
        lookups: blocks,
        features,
        gdef,
    })
}

/// The lookup blocks to write, and the label each VOLT lookup is known by.
struct Lookups {
    blocks: Vec<LookupBlock>,
    /// `None` for subtable pieces only reachable through their first piece
    labels: HashMap<SmolStr, Option<SmolStr>>,
}

impl Lookups {
    /// Merge the pair positioning subtable pieces of each lookup into one
    /// block. Other pieces stay separate lookups.
    fn merge(mut translation: Translation) -> Self {
        let mut pieces: IndexMap<SmolStr, Vec<&SmolStr>> = IndexMap::new();
        for (key, lookup) in &translation.lookups {
            if !lookup.id.is_piece() {
                continue;
            }
            if lookup.kind != LookupKind::PairPos {
                warn!(
                    "Lookup should be a subtable, but feature files allow subtables only in pair positioning lookups: {}",
                    lookup.volt_name
                );
                continue;
            }
            pieces
                .entry(SmolStr::new(lookup.id.base.to_lowercase()))
                .or_default()
                .push(key);
        }
        // a lone pair piece has nothing to merge with
        pieces.retain(|_, group| group.len() > 1);

        // first pieces of each group, and the pieces merged into them
        let mut first_pieces = HashSet::new();
        let mut merged_pieces = HashSet::new();
        for group in pieces.values() {
            let Some((first, rest)) = group.split_first() else {
                continue;
            };
            first_pieces.insert(*first);
            merged_pieces.extend(rest.iter().copied());
        }

        let mut blocks = Vec::with_capacity(translation.lookups.len());
        let mut labels = HashMap::with_capacity(translation.lookups.len());
        for (key, lookup) in &translation.lookups {
            if merged_pieces.contains(key) {
                labels.insert(key.clone(), None);
                continue;
            }
            if !first_pieces.contains(key) {
                labels.insert(key.clone(), Some(lookup.name.clone()));
                blocks.push(lookup.to_block());
                continue;
            }
            let group = pieces[&SmolStr::new(lookup.id.base.to_lowercase())]
                .iter()
                .map(|key| &translation.lookups[*key])
                .collect::<Vec<_>>();
            let name = translation.names.sanitize(&lookup.id.base);
            labels.insert(key.clone(), Some(name.clone()));
            blocks.push(merge_pieces(name, &group));
        }
        Lookups { blocks, labels }
    }
}

fn merge_pieces(name: SmolStr, pieces: &[&TranslatedLookup]) -> LookupBlock {
    debug!("merging {} subtables into '{name}'", pieces.len());
    let mut block = LookupBlock::new(name);
    block.use_extension = pieces.iter().any(|piece| piece.use_extension);
    if let Some(first) = pieces.first() {
        if !first.flags.is_default() {
            block.rules.push(Rule::LookupFlag(first.flags.clone()));
        }
        if let Some(piece) = pieces.iter().find(|piece| piece.flags != first.flags) {
            warn!(
                "subtable '{}' has different lookup flags from '{}', using those of '{}'",
                piece.volt_name, first.volt_name, first.volt_name
            );
        }
    }
    for (i, piece) in pieces.iter().enumerate() {
        if i > 0 {
            block.rules.push(Rule::Subtable);
        }
        block.rules.push(Rule::Comment(piece.volt_name.to_string()));
        if let Some(comments) = &piece.comments {
            block.rules.push(Rule::Comment(comments.clone()));
        }
        block.rules.extend(piece.rules.iter().cloned());
    }
    block
}

/// One block per feature, scripts ordered DFLT first then by tag.
fn features(
    table: &SymbolTable,
    labels: &HashMap<SmolStr, Option<SmolStr>>,
) -> Result<Vec<FeatureBlock>, Error> {
    let mut blocks = Vec::with_capacity(table.features().len());
    for (feature, scripts) in table.features() {
        let mut script_tags = scripts.keys().copied().collect::<Vec<_>>();
        script_tags.sort_by_key(|tag| (*tag != DFLT, *tag));
        let mut languages = Vec::new();
        for script in script_tags {
            for (language, lookups) in &scripts[&script] {
                let mut names: Vec<SmolStr> = Vec::with_capacity(lookups.lookups.len());
                for lookup in &lookups.lookups {
                    match labels.get(lookup.to_lowercase().as_str()) {
                        None => {
                            return Err(Error::UndefinedLookup {
                                name: lookup.clone(),
                                feature: *feature,
                                location: lookups.location,
                            })
                        }
                        Some(None) => debug!("'{lookup}' is a subtable of an earlier lookup"),
                        Some(Some(name)) if !names.contains(name) => names.push(name.clone()),
                        Some(Some(_)) => (),
                    }
                }
                languages.push(LanguageLookups {
                    script,
                    language: *language,
                    lookups: names,
                });
            }
        }
        blocks.push(FeatureBlock {
            tag: *feature,
            languages,
        });
    }
    Ok(blocks)
}
