//! Positioning lookups
//!
//! Positioning rules cannot be written inline in a chaining rule, so a
//! positioning lookup with contexts becomes two lookups: a helper holding the
//! plain rules, and the lookup itself holding one chaining rule per context
//! that applies the helper.

use std::collections::{hash_map::Entry, BTreeSet, HashMap};

use indexmap::IndexMap;
use log::{debug, warn};
use smol_str::SmolStr;
use volt_rs::ast::{
    AdjustPair, AdjustSingle, Attach, AttachCursive, Coverage, CoverageItem, GlyphName,
    LookupDefinition, PairAdjustment, Position,
};

use crate::{
    error::Error,
    fea::{Anchor, GlyphOrClass, MarkAttachment, Rule, ValueRecord},
    split::{self, LookupId},
};

use super::{Context, LookupKind, TranslatedLookup, Translator};

const ENTRY: &str = "entry";
const EXIT: &str = "exit";

/// A resolved pair, and the coverages it came from.
struct Pair<'a> {
    first: &'a Coverage,
    second: &'a Coverage,
    rule: Rule,
}

impl Translator<'_> {
    pub(super) fn add_position(
        &mut self,
        lookup: &LookupDefinition,
        pos: &Position,
        contexts: &[Context],
        mut translated: TranslatedLookup,
    ) -> Result<(), Error> {
        if let Position::AdjustPair(adjust) = pos {
            self.warn_overlapping_classes(lookup, adjust)?;
            if contexts.iter().all(|context| !context.is_contextual()) {
                translated.kind = LookupKind::PairPos;
                return self.add_pair_lookup(lookup, adjust, translated);
            }
        }
        translated.kind = LookupKind::Position;
        let mut helper = None;
        for context in contexts {
            if !context.is_contextual() {
                translated.rules.extend(self.position_rules(lookup, pos)?);
                continue;
            }
            if lookup.reversal {
                self.unsupported("REVERSAL in a contextual positioning lookup", lookup.location)?;
                continue;
            }
            if matches!(pos, Position::AttachCursive(_)) {
                self.unsupported("ATTACH_CURSIVE in a contextual lookup", lookup.location)?;
                continue;
            }
            let target = if context.ignore {
                None
            } else {
                if helper.is_none() {
                    helper = Some(self.add_helper(lookup, pos, &translated)?);
                }
                helper.clone()
            };
            translated.rules.extend(self.contextual_position_rules(
                lookup,
                pos,
                context,
                target.as_ref(),
            )?);
        }
        self.register(translated);
        Ok(())
    }

    /// Create the lookup holding the plain rules that chaining rules apply.
    fn add_helper(
        &mut self,
        lookup: &LookupDefinition,
        pos: &Position,
        parent: &TranslatedLookup,
    ) -> Result<SmolStr, Error> {
        let volt_name = SmolStr::new(format!("{} target", lookup.name));
        let name = self.names.sanitize(&volt_name);
        debug!("'{}' applies positioning through '{name}'", lookup.name);
        let helper = TranslatedLookup {
            id: LookupId {
                base: volt_name.clone(),
                piece: None,
            },
            volt_name,
            name: name.clone(),
            kind: LookupKind::Position,
            comments: None,
            flags: parent.flags.clone(),
            use_extension: parent.use_extension,
            rules: self.position_rules(lookup, pos)?,
        };
        self.register(helper);
        Ok(name)
    }

    /// The plain (context free) rules for a positioning payload.
    fn position_rules(
        &mut self,
        lookup: &LookupDefinition,
        pos: &Position,
    ) -> Result<Vec<Rule>, Error> {
        match pos {
            Position::AdjustPair(adjust) => Ok(self
                .pairs(lookup, adjust)?
                .into_iter()
                .map(|pair| pair.rule)
                .collect()),
            Position::AdjustSingle(adjust) => self.single_rules(lookup, adjust),
            Position::Attach(attach) => self.attach_rules(lookup, attach),
            Position::AttachCursive(cursive) => self.cursive_rules(lookup, cursive),
        }
    }

    fn add_pair_lookup(
        &mut self,
        lookup: &LookupDefinition,
        adjust: &AdjustPair,
        mut translated: TranslatedLookup,
    ) -> Result<(), Error> {
        let pairs = self.pairs(lookup, adjust)?;
        let max = match self.options.max_pairs_per_subtable {
            Some(max) if !translated.id.is_piece() => max,
            _ => {
                translated.rules = pairs.into_iter().map(|pair| pair.rule).collect();
                self.register(translated);
                return Ok(());
            }
        };
        let sizes = pairs
            .iter()
            .map(|pair| self.pair_size(lookup, pair))
            .collect::<Result<Vec<_>, _>>()?;
        let pieces = split::partition(&sizes, max);
        if pieces.len() < 2 {
            translated.rules = pairs.into_iter().map(|pair| pair.rule).collect();
            self.register(translated);
            return Ok(());
        }
        debug!(
            "splitting '{}' into {} subtables of at most {max} pairs",
            lookup.name,
            pieces.len()
        );
        let mut rules = pairs.into_iter().map(|pair| pair.rule);
        for (i, range) in pieces.into_iter().enumerate() {
            let volt_name = split::piece_name(&lookup.name, i);
            let name = if i == 0 {
                translated.name.clone()
            } else {
                self.names.sanitize(&volt_name)
            };
            self.register(TranslatedLookup {
                id: LookupId {
                    base: lookup.name.clone(),
                    piece: Some(i as u32 + 1),
                },
                volt_name,
                name,
                kind: LookupKind::PairPos,
                comments: if i == 0 {
                    translated.comments.clone()
                } else {
                    None
                },
                flags: translated.flags.clone(),
                use_extension: translated.use_extension,
                rules: rules.by_ref().take(range.len()).collect(),
            });
        }
        Ok(())
    }

    fn pair_coverages<'p>(
        &self,
        lookup: &LookupDefinition,
        adjust: &'p AdjustPair,
        pair: &PairAdjustment,
    ) -> Result<(&'p Coverage, &'p Coverage), Error> {
        let get = |list: &'p [Coverage], index: u16| {
            (index as usize)
                .checked_sub(1)
                .and_then(|index| list.get(index))
        };
        match (get(&adjust.first, pair.first), get(&adjust.second, pair.second)) {
            (Some(first), Some(second)) => Ok((first, second)),
            _ => Err(Error::PairIndexOutOfRange {
                first: pair.first,
                second: pair.second,
                num_first: adjust.first.len(),
                num_second: adjust.second.len(),
                location: lookup.location,
            }),
        }
    }

    fn pairs<'p>(
        &self,
        lookup: &LookupDefinition,
        adjust: &'p AdjustPair,
    ) -> Result<Vec<Pair<'p>>, Error> {
        adjust
            .pairs
            .iter()
            .map(|pair| {
                let (first, second) = self.pair_coverages(lookup, adjust, pair)?;
                // class pairs may only be written when both sides are classes
                let enumerated = first
                    .iter()
                    .chain(second)
                    .any(|item| !matches!(item, CoverageItem::Group(_)));
                let rule = Rule::PairPos {
                    enumerated,
                    first: self.collapsed(first, lookup)?,
                    first_value: ValueRecord::from(&pair.first_pos),
                    second: self.collapsed(second, lookup)?,
                    second_value: ValueRecord::from(&pair.second_pos),
                };
                Ok(Pair {
                    first,
                    second,
                    rule,
                })
            })
            .collect()
    }

    /// How much a pair counts towards the subtable limit.
    fn pair_size(&self, lookup: &LookupDefinition, pair: &Pair) -> Result<usize, Error> {
        let is_one = |coverage: &Coverage, group: bool| {
            coverage.len() == 1
                && match &coverage[0] {
                    CoverageItem::Group(_) => group,
                    CoverageItem::Glyph(_) => !group,
                    _ => false,
                }
        };
        if (is_one(pair.first, true) && is_one(pair.second, true))
            || (is_one(pair.first, false) && is_one(pair.second, false))
        {
            return Ok(1);
        }
        Ok(self.table.glyph_count(pair.first, lookup.location)?
            * self.table.glyph_count(pair.second, lookup.location)?)
    }

    /// Warn about glyphs that belong to more than one class on either side.
    fn warn_overlapping_classes(
        &self,
        lookup: &LookupDefinition,
        adjust: &AdjustPair,
    ) -> Result<(), Error> {
        for (side, coverages) in [("FIRST", &adjust.first), ("SECOND", &adjust.second)] {
            let mut seen = HashMap::new();
            let mut shared = BTreeSet::new();
            for (i, coverage) in coverages.iter().enumerate() {
                let glyphs = self.table.glyph_set(coverage, lookup.location)?;
                if glyphs.len() < 2 {
                    continue;
                }
                for glyph in glyphs {
                    match seen.entry(glyph) {
                        Entry::Occupied(entry) if *entry.get() != i => {
                            shared.insert(entry.key().clone());
                        }
                        Entry::Occupied(_) => (),
                        Entry::Vacant(entry) => {
                            entry.insert(i);
                        }
                    }
                }
            }
            if !shared.is_empty() {
                let names = shared
                    .iter()
                    .map(GlyphName::as_str)
                    .collect::<Vec<_>>()
                    .join(" ");
                warn!(
                    "{}: kerning classes in {side} of '{}' overlap on: {names}",
                    lookup.location, lookup.name
                );
            }
        }
        Ok(())
    }

    fn single_rules(
        &self,
        lookup: &LookupDefinition,
        adjust: &AdjustSingle,
    ) -> Result<Vec<Rule>, Error> {
        adjust
            .adjustments
            .iter()
            .map(|(coverage, pos)| {
                Ok(Rule::SinglePos {
                    target: self.collapsed(coverage, lookup)?,
                    value: pos.into(),
                })
            })
            .collect()
    }

    fn attach_rules(
        &mut self,
        lookup: &LookupDefinition,
        attach: &Attach,
    ) -> Result<Vec<Rule>, Error> {
        let location = lookup.location;
        for (marks, class) in &attach.marks {
            for glyph in self.table.glyph_set(marks, location)? {
                if !self.table.has_mark_anchor(&glyph, class) {
                    return Err(Error::UndefinedMarkAnchor {
                        glyph,
                        class: class.clone(),
                        location,
                    });
                }
                self.used_marks.insert((glyph, class.clone()));
            }
        }

        let base_glyphs = self.table.glyph_set(&attach.bases, location)?;
        let mut bases: IndexMap<GlyphName, Vec<&SmolStr>> = IndexMap::new();
        for (_, class) in &attach.marks {
            for glyph in &base_glyphs {
                let classes = bases.entry(glyph.clone()).or_default();
                if !classes.contains(&class) {
                    classes.push(class);
                }
            }
        }

        let mut rules = Vec::with_capacity(bases.len());
        for (glyph, classes) in bases {
            let num_components = self.table.ligature_components(&glyph).unwrap_or(1);
            let mut components = vec![Vec::new(); num_components as usize];
            for class in classes {
                let Some(anchors) = self.table.anchor(&glyph, class) else {
                    return Err(Error::UndefinedAnchor {
                        glyph,
                        anchor: class.clone(),
                        location,
                    });
                };
                let mark_class = self.table.mark_class_name(class).cloned().ok_or_else(|| {
                    Error::UndefinedMarkAnchor {
                        glyph: glyph.clone(),
                        class: class.clone(),
                        location,
                    }
                })?;
                for (i, marks) in components.iter_mut().enumerate() {
                    marks.push(MarkAttachment {
                        anchor: anchors.get(&(i as u16 + 1)).cloned(),
                        mark_class: mark_class.clone(),
                    });
                }
            }
            let base = GlyphOrClass::Glyph(self.table.glyph_name(&glyph));
            rules.push(if self.table.is_mark(&glyph) {
                Rule::MarkToMark {
                    base,
                    marks: components.into_iter().next().unwrap_or_default(),
                }
            } else if self.table.ligature_components(&glyph).is_some() {
                Rule::MarkToLigature { base, components }
            } else {
                Rule::MarkToBase {
                    base,
                    marks: components.into_iter().next().unwrap_or_default(),
                }
            });
        }
        Ok(rules)
    }

    fn cursive_rules(
        &self,
        lookup: &LookupDefinition,
        cursive: &AttachCursive,
    ) -> Result<Vec<Rule>, Error> {
        let location = lookup.location;
        let mut enter = Vec::new();
        for coverage in &cursive.enter {
            enter.extend(self.table.glyph_set(coverage, location)?);
        }
        let mut exit = Vec::new();
        for coverage in &cursive.exit {
            exit.extend(self.table.glyph_set(coverage, location)?);
        }
        let anchor = |glyph: &GlyphName, name: &str| -> Result<Anchor, Error> {
            self.table
                .anchor(glyph, name)
                .and_then(|anchors| anchors.get(&1))
                .cloned()
                .ok_or_else(|| Error::UndefinedAnchor {
                    glyph: glyph.clone(),
                    anchor: name.into(),
                    location,
                })
        };

        let mut rules = Vec::with_capacity(enter.len() + exit.len());
        for glyph in enter {
            let entry = anchor(&glyph, ENTRY)?;
            let also_exit = exit.iter().position(|name| name == &glyph);
            let exit_anchor = match also_exit {
                Some(i) => {
                    exit.remove(i);
                    Some(anchor(&glyph, EXIT)?)
                }
                None => None,
            };
            rules.push(Rule::Cursive {
                glyph: GlyphOrClass::Glyph(self.table.glyph_name(&glyph)),
                entry: Some(entry),
                exit: exit_anchor,
            });
        }
        for glyph in exit {
            rules.push(Rule::Cursive {
                glyph: GlyphOrClass::Glyph(self.table.glyph_name(&glyph)),
                entry: None,
                exit: Some(anchor(&glyph, EXIT)?),
            });
        }
        Ok(rules)
    }

    /// Chaining rules applying `target` to the payload's input in `context`,
    /// or ignore rules when `target` is `None`.
    fn contextual_position_rules(
        &self,
        lookup: &LookupDefinition,
        pos: &Position,
        context: &Context,
        target: Option<&SmolStr>,
    ) -> Result<Vec<Rule>, Error> {
        let inputs = match pos {
            Position::AdjustPair(adjust) => adjust
                .pairs
                .iter()
                .map(|pair| {
                    let (first, second) = self.pair_coverages(lookup, adjust, pair)?;
                    Ok(vec![
                        self.collapsed(first, lookup)?,
                        self.collapsed(second, lookup)?,
                    ])
                })
                .collect::<Result<Vec<_>, Error>>()?,
            Position::AdjustSingle(adjust) => {
                let mut items = Vec::new();
                for (coverage, _) in &adjust.adjustments {
                    items.extend(self.table.resolve_coverage(coverage, lookup.location)?);
                }
                vec![vec![GlyphOrClass::literal(items)]]
            }
            Position::Attach(attach) => {
                let mut items = Vec::new();
                for (coverage, _) in &attach.marks {
                    items.extend(self.table.resolve_coverage(coverage, lookup.location)?);
                }
                vec![vec![GlyphOrClass::literal(items)]]
            }
            Position::AttachCursive(_) => Vec::new(),
        };
        Ok(inputs
            .into_iter()
            .map(|input| match target {
                None => Rule::IgnorePos {
                    context: context.chain.clone(),
                    input,
                },
                Some(target) => Rule::ChainPos {
                    context: context.chain.clone(),
                    input: input
                        .into_iter()
                        .map(|item| (item, Some(target.clone())))
                        .collect(),
                },
            })
            .collect())
    }

    /// Resolve a coverage into a single item.
    fn collapsed(
        &self,
        coverage: &Coverage,
        lookup: &LookupDefinition,
    ) -> Result<GlyphOrClass, Error> {
        self.table
            .resolve_coverage(coverage, lookup.location)
            .map(GlyphOrClass::collapse)
    }
}
