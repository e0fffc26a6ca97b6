//! The second pass: translating each `DEF_LOOKUP` into feature file lookups.
//!
//! Translation reads the frozen [`SymbolTable`] and produces one
//! [`TranslatedLookup`] per VOLT lookup, plus the helper lookups that
//! contextual positioning needs and the pieces of any split pair lookups.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, warn};
use smol_str::SmolStr;
use volt_rs::ast::{
    ContextKind, Direction, GlyphName, Location, LookupDefinition, LookupPayload, ProcessMarks,
    Statement, VoltFile,
};

use crate::{
    collect::SymbolTable,
    config::Options,
    error::Error,
    fea::{ChainContext, LookupBlock, LookupFlagRule, LookupFlags, Rule},
    names::{NameKind, NameSanitizer},
    split::LookupId,
};

mod gpos;
mod gsub;

/// What kind of rules a lookup holds.
///
/// Only plain pair positioning lookups may be merged as subtables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
    Substitution,
    PairPos,
    /// Any other positioning, including contextual pair positioning.
    Position,
}

/// A lookup ready to be written, along with what we know about its origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatedLookup {
    pub id: LookupId,
    pub volt_name: SmolStr,
    /// The feature file label.
    pub name: SmolStr,
    pub kind: LookupKind,
    pub comments: Option<String>,
    pub flags: LookupFlagRule,
    pub use_extension: bool,
    pub rules: Vec<Rule>,
}

impl TranslatedLookup {
    /// The complete lookup block, comments and flags first.
    pub fn to_block(&self) -> LookupBlock {
        let mut block = LookupBlock::new(self.name.clone());
        block.use_extension = self.use_extension;
        if let Some(comments) = &self.comments {
            block.rules.push(Rule::Comment(comments.clone()));
        }
        if !self.flags.is_default() {
            block.rules.push(Rule::LookupFlag(self.flags.clone()));
        }
        block.rules.extend(self.rules.iter().cloned());
        block
    }
}

/// The result of translating every lookup in a source.
#[derive(Clone, Debug)]
pub struct Translation {
    /// keyed by lowercased VOLT name, in the order lookups should be written
    pub lookups: IndexMap<SmolStr, TranslatedLookup>,
    /// The lookup name sanitizer, for naming merged lookups.
    pub names: NameSanitizer,
    /// (mark glyph, VOLT mark class) pairs referenced by an attachment
    pub used_marks: HashSet<(GlyphName, SmolStr)>,
}

/// Translate every lookup in `file`, in source order.
pub fn translate(
    file: &VoltFile,
    table: &SymbolTable,
    options: &Options,
) -> Result<Translation, Error> {
    let mut translator = Translator::new(table, options);
    for statement in &file.statements {
        if let Statement::Lookup(lookup) = statement {
            translator.add_lookup(lookup)?;
        }
    }
    debug!("translated {} lookups", translator.lookups.len());
    Ok(Translation {
        lookups: translator.lookups,
        names: translator.names,
        used_marks: translator.used_marks,
    })
}

/// One context a lookup's rules are written for.
#[derive(Clone, Debug, Default)]
struct Context {
    chain: ChainContext,
    ignore: bool,
}

impl Context {
    /// A context that needs chaining rules to express.
    fn is_contextual(&self) -> bool {
        self.ignore || self.chain.is_contextual()
    }
}

struct Translator<'a> {
    table: &'a SymbolTable,
    options: &'a Options,
    names: NameSanitizer,
    lookups: IndexMap<SmolStr, TranslatedLookup>,
    used_marks: HashSet<(GlyphName, SmolStr)>,
    /// unsupported constructs we have already warned about
    reported: HashSet<&'static str>,
}

impl<'a> Translator<'a> {
    fn new(table: &'a SymbolTable, options: &'a Options) -> Self {
        Translator {
            table,
            options,
            names: NameSanitizer::new(NameKind::Lookup),
            lookups: Default::default(),
            used_marks: Default::default(),
            reported: Default::default(),
        }
    }

    fn add_lookup(&mut self, lookup: &LookupDefinition) -> Result<(), Error> {
        let flags = self.flags(lookup)?;
        let contexts = self.contexts(lookup)?;
        let mut translated = TranslatedLookup {
            id: LookupId::parse(&lookup.name),
            volt_name: lookup.name.clone(),
            name: self.names.sanitize(&lookup.name),
            kind: LookupKind::Substitution,
            comments: lookup.comments.clone(),
            flags,
            use_extension: false,
            rules: Vec::new(),
        };
        match &lookup.payload {
            LookupPayload::Substitution(sub) => {
                for context in &contexts {
                    translated
                        .rules
                        .extend(self.substitution_rules(sub, context)?);
                }
                self.register(translated);
                Ok(())
            }
            LookupPayload::Position(pos) => {
                translated.use_extension = self.table.use_extension();
                self.add_position(lookup, pos, &contexts, translated)
            }
        }
    }

    fn flags(&self, lookup: &LookupDefinition) -> Result<LookupFlagRule, Error> {
        let mut rule = LookupFlagRule::default();
        if lookup.direction == Some(Direction::Rtl) {
            rule.flags |= LookupFlags::RIGHT_TO_LEFT;
        }
        if !lookup.process_base {
            rule.flags |= LookupFlags::IGNORE_BASE_GLYPHS;
        }
        match &lookup.process_marks {
            ProcessMarks::All => (),
            ProcessMarks::None => rule.flags |= LookupFlags::IGNORE_MARKS,
            ProcessMarks::Attachment(group) => {
                rule.mark_attachment = Some(self.table.group(group, lookup.location)?.name.clone())
            }
            ProcessMarks::FilterSet(group) => {
                rule.mark_filtering = Some(self.table.group(group, lookup.location)?.name.clone())
            }
        }
        Ok(rule)
    }

    /// Resolve the lookup's contexts.
    ///
    /// A lookup whose only context is an `EXCEPT_CONTEXT` also applies
    /// everywhere else, so it gets a second context that always matches.
    fn contexts(&self, lookup: &LookupDefinition) -> Result<Vec<Context>, Error> {
        if lookup.contexts.is_empty() {
            return Ok(vec![Context::default()]);
        }
        let mut contexts = Vec::with_capacity(lookup.contexts.len() + 1);
        for def in &lookup.contexts {
            let ignore = def.kind == ContextKind::Exclude;
            contexts.push(Context {
                chain: ChainContext {
                    prefix: self.table.resolve_sequence(&def.left, lookup.location)?,
                    suffix: self.table.resolve_sequence(&def.right, lookup.location)?,
                    force_chain: false,
                },
                ignore,
            });
            if ignore && lookup.contexts.len() == 1 {
                contexts.push(Context {
                    chain: ChainContext {
                        force_chain: true,
                        ..Default::default()
                    },
                    ignore: false,
                });
            }
        }
        Ok(contexts)
    }

    /// Fail on a construct we cannot translate, or warn (once) and carry on.
    fn unsupported(&mut self, construct: &'static str, location: Location) -> Result<(), Error> {
        if self.options.strict {
            return Err(Error::Unsupported {
                construct: construct.into(),
                location,
            });
        }
        if self.reported.insert(construct) {
            warn!("{location}: {construct} is not supported, skipping it");
        }
        Ok(())
    }

    fn register(&mut self, lookup: TranslatedLookup) {
        let key = SmolStr::new(lookup.volt_name.to_lowercase());
        if self.lookups.contains_key(&key) {
            warn!("lookup '{}' is defined more than once", lookup.volt_name);
        }
        self.lookups.insert(key, lookup);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{collect::collect, fea::GlyphOrClass};

    use super::*;

    pub(super) fn translate_str(text: &str, options: &Options) -> Result<Translation, Error> {
        let file = volt_rs::parse(text).unwrap();
        let table = collect(&file, None)?;
        translate(&file, &table, options)
    }

    pub(super) fn rules(translation: &Translation, key: &str) -> Vec<String> {
        translation.lookups[key]
            .to_block()
            .rules
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn flags() {
        let translation = translate_str(
            r#"DEF_GROUP "marks" ENUM GLYPH "acutecomb" END_ENUM END_GROUP
            DEF_LOOKUP "test" SKIP_BASE PROCESS_MARKS MARK_GLYPH_SET "marks" DIRECTION RTL
            IN_CONTEXT
            END_CONTEXT
            AS_SUBSTITUTION
            SUB GLYPH "a"
            WITH GLYPH "b"
            END_SUB
            END_SUBSTITUTION"#,
            &Options::default(),
        )
        .unwrap();
        assert_eq!(
            translation.lookups["test"].flags,
            LookupFlagRule {
                flags: LookupFlags::RIGHT_TO_LEFT | LookupFlags::IGNORE_BASE_GLYPHS,
                mark_attachment: None,
                mark_filtering: Some("marks".into()),
            }
        );
        assert_eq!(
            rules(&translation, "test"),
            [
                "lookupflag RightToLeft IgnoreBaseGlyphs UseMarkFilteringSet @marks;",
                "sub a by b;"
            ]
        );
    }

    #[test]
    fn undefined_attachment_group() {
        let err = translate_str(
            r#"DEF_LOOKUP "test" PROCESS_BASE PROCESS_MARKS "nope" DIRECTION LTR
            IN_CONTEXT
            END_CONTEXT
            AS_SUBSTITUTION
            SUB GLYPH "a"
            WITH GLYPH "b"
            END_SUB
            END_SUBSTITUTION"#,
            &Options::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UndefinedGroup { name, .. } if name == "nope"));
    }

    #[test]
    fn lone_except_context_adds_a_catch_all() {
        let translation = translate_str(
            r#"DEF_LOOKUP "test" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR
            EXCEPT_CONTEXT
            LEFT GLYPH "x"
            END_CONTEXT
            AS_SUBSTITUTION
            SUB GLYPH "a"
            WITH GLYPH "b"
            END_SUB
            END_SUBSTITUTION"#,
            &Options::default(),
        )
        .unwrap();
        assert_eq!(
            rules(&translation, "test"),
            ["ignore sub x a';", "sub a' by b;"]
        );
    }

    #[test]
    fn lookup_names_are_sanitized() {
        let translation = translate_str(
            r#"DEF_LOOKUP "1st lookup" PROCESS_BASE PROCESS_MARKS ALL DIRECTION LTR
            IN_CONTEXT
            END_CONTEXT
            AS_SUBSTITUTION
            SUB GLYPH "a"
            WITH GLYPH "b"
            END_SUB
            END_SUBSTITUTION"#,
            &Options::default(),
        )
        .unwrap();
        let lookup = &translation.lookups["1st lookup"];
        assert_eq!(lookup.name, "_1st_lookup");
        assert_eq!(lookup.kind, LookupKind::Substitution);
        assert_eq!(
            lookup.rules,
            vec![Rule::SingleSub {
                context: ChainContext::default(),
                target: GlyphOrClass::Glyph("a".into()),
                replacement: GlyphOrClass::Glyph("b".into()),
            }]
        );
    }
}
