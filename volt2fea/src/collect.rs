//! The first pass: gathering everything lookups may refer to.
//!
//! Lookups may mention groups and anchors that are defined later in the
//! source, so every non-lookup statement is collected into a [`SymbolTable`]
//! before any lookup is translated. The table is not modified afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::{map::Entry, IndexMap};
use log::{debug, warn};
use smol_str::SmolStr;
use volt_rs::ast::{
    AnchorDefinition, GlyphDefinition, GlyphName, GlyphType, GroupDefinition, Location,
    ScriptDefinition, SettingDefinition, Statement, VoltFile,
};
use write_fonts::types::Tag;

use crate::{
    error::{Error, Limitation},
    fea::{Anchor, GdefClasses, GlyphOrClass},
    names::{NameKind, NameSanitizer},
    source::GlyphOrder,
};

/// Anchor names starting with this prefix position a mark glyph.
pub(crate) const MARK_PREFIX: &str = "MARK_";

const USE_EXTENSION: &str = "COMPILER_USEEXTENSIONLOOKUPS";

/// A glyph known from a `DEF_GLYPH`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GlyphInfo {
    pub(crate) id: u16,
    /// The name to use in the output.
    pub(crate) output_name: SmolStr,
}

/// A `DEF_GROUP`, resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    /// The class name used in the output.
    pub name: SmolStr,
    pub members: Vec<GlyphOrClass>,
    /// Every glyph in the group, with nested groups expanded, as VOLT names.
    pub glyphs: Vec<GlyphName>,
}

/// The lookups one `DEF_FEATURE` assigns to a language system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureLookups {
    pub lookups: Vec<SmolStr>,
    pub location: Location,
}

/// feature → script → language → lookups, in source order.
pub type FeatureMap = IndexMap<Tag, IndexMap<Tag, IndexMap<Tag, FeatureLookups>>>;

/// Identifies a mark glyph's position in a mark class.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkAnchorKey {
    pub glyph: GlyphName,
    /// The VOLT mark class name (the anchor name without its prefix).
    pub class: SmolStr,
    pub component: u16,
}

/// Everything collected from the non-lookup statements of a VOLT source.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    pub(crate) glyph_order: Option<GlyphOrder>,
    pub(crate) glyphs: HashMap<GlyphName, GlyphInfo>,
    /// The VOLT name of each `DEF_GLYPH` id, first definition wins.
    pub(crate) names_by_id: HashMap<u16, GlyphName>,
    pub(crate) gdef: GdefClasses,
    pub(crate) marks: HashSet<GlyphName>,
    pub(crate) ligatures: HashMap<GlyphName, u16>,
    /// keyed by lowercased VOLT name
    pub(crate) groups: IndexMap<SmolStr, Group>,
    pub(crate) features: FeatureMap,
    pub(crate) anchors: HashMap<GlyphName, HashMap<SmolStr, BTreeMap<u16, Anchor>>>,
    pub(crate) mark_anchors: BTreeMap<MarkAnchorKey, Anchor>,
    /// VOLT mark class name to output class name
    pub(crate) mark_classes: HashMap<SmolStr, SmolStr>,
    pub(crate) settings: IndexMap<SmolStr, Vec<i32>>,
    class_names: NameSanitizer,
}

/// Collect all glyphs, groups, anchors, language systems and settings.
pub fn collect(file: &VoltFile, glyph_order: Option<GlyphOrder>) -> Result<SymbolTable, Error> {
    let mut table = SymbolTable::new(glyph_order);
    for statement in &file.statements {
        match statement {
            Statement::Glyph(glyph) => table.add_glyph(glyph)?,
            Statement::Group(group) => table.add_group(group)?,
            Statement::Script(script) => table.add_script(script)?,
            Statement::Anchor(anchor) => table.add_anchor(anchor),
            Statement::Setting(setting) => table.add_setting(setting),
            Statement::Lookup(_) => (),
        }
    }
    debug!(
        "collected {} glyphs, {} groups, {} anchored glyphs, {} features",
        table.glyphs.len(),
        table.groups.len(),
        table.anchors.len(),
        table.features.len()
    );
    Ok(table)
}

impl SymbolTable {
    fn new(glyph_order: Option<GlyphOrder>) -> Self {
        SymbolTable {
            glyph_order,
            glyphs: Default::default(),
            names_by_id: Default::default(),
            gdef: Default::default(),
            marks: Default::default(),
            ligatures: Default::default(),
            groups: Default::default(),
            features: Default::default(),
            anchors: Default::default(),
            mark_anchors: Default::default(),
            mark_classes: Default::default(),
            settings: Default::default(),
            class_names: NameSanitizer::new(NameKind::Class),
        }
    }

    fn add_glyph(&mut self, glyph: &GlyphDefinition) -> Result<(), Error> {
        let output_name = match &self.glyph_order {
            Some(order) => order.get(glyph.id).cloned().ok_or_else(|| Error::GlyphIdOutOfRange {
                glyph: glyph.name.clone(),
                id: glyph.id,
                num_glyphs: order.len(),
                location: glyph.location,
            })?,
            None => glyph.name.as_str().into(),
        };
        let output = GlyphOrClass::Glyph(output_name.clone());
        match glyph.glyph_type {
            Some(GlyphType::Base) => self.gdef.base.push(output),
            Some(GlyphType::Ligature) => {
                self.gdef.ligature.push(output);
                self.ligatures
                    .insert(glyph.name.clone(), glyph.components.unwrap_or(1).max(1));
            }
            Some(GlyphType::Mark) => {
                self.gdef.mark.push(output);
                self.marks.insert(glyph.name.clone());
            }
            Some(GlyphType::Component) => self.gdef.component.push(output),
            None => (),
        }
        self.names_by_id
            .entry(glyph.id)
            .or_insert_with(|| glyph.name.clone());
        self.glyphs.insert(
            glyph.name.clone(),
            GlyphInfo {
                id: glyph.id,
                output_name,
            },
        );
        Ok(())
    }

    fn add_group(&mut self, group: &GroupDefinition) -> Result<(), Error> {
        let members = self
            .resolve_coverage(&group.members, group.location)?
            .into_iter()
            .flat_map(|item| match item {
                GlyphOrClass::Literal(items) => items,
                other => vec![other],
            })
            .collect();
        let glyphs = self.glyph_set(&group.members, group.location)?;
        let name = self.class_names.sanitize(&group.name);
        let key = SmolStr::new(group.name.to_lowercase());
        if self.groups.contains_key(&key) {
            warn!("{}: group '{}' is redefined", group.location, group.name);
        }
        self.groups.insert(
            key,
            Group {
                name,
                members,
                glyphs,
            },
        );
        Ok(())
    }

    fn add_script(&mut self, script: &ScriptDefinition) -> Result<(), Error> {
        for lang in &script.langs {
            for feature in &lang.features {
                let languages = self
                    .features
                    .entry(feature.tag)
                    .or_default()
                    .entry(script.tag)
                    .or_default();
                match languages.entry(lang.tag) {
                    Entry::Occupied(_) => {
                        return Err(Error::DuplicateLanguageSystem {
                            feature: feature.tag,
                            script: script.tag,
                            language: lang.tag,
                            location: feature.location,
                        })
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(FeatureLookups {
                            lookups: feature.lookups.clone(),
                            location: feature.location,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn add_anchor(&mut self, anchor: &AnchorDefinition) {
        if !anchor.pos.adv_adjust.is_empty() {
            warn!(
                "{}: anchor '{}' on '{}': {}",
                anchor.location,
                anchor.name,
                anchor.glyph,
                Limitation::AnchorAdvanceDevice
            );
        }
        let point = Anchor {
            x: anchor.pos.dx.unwrap_or_default(),
            y: anchor.pos.dy.unwrap_or_default(),
            x_device: anchor.pos.dx_adjust.clone(),
            y_device: anchor.pos.dy_adjust.clone(),
        };
        match anchor.name.strip_prefix(MARK_PREFIX) {
            Some(class) => {
                let class = SmolStr::new(class);
                if !self.mark_classes.contains_key(&class) {
                    let name = self.class_names.sanitize(&class);
                    self.mark_classes.insert(class.clone(), name);
                }
                self.mark_anchors.insert(
                    MarkAnchorKey {
                        glyph: anchor.glyph.clone(),
                        class,
                        component: anchor.component,
                    },
                    point,
                );
            }
            None => {
                self.anchors
                    .entry(anchor.glyph.clone())
                    .or_default()
                    .entry(anchor.name.clone())
                    .or_default()
                    .insert(anchor.component, point);
            }
        }
    }

    fn add_setting(&mut self, setting: &SettingDefinition) {
        if setting.name.starts_with("COMPILER_") {
            self.settings
                .insert(setting.name.clone(), setting.values.clone());
        } else {
            warn!("Unsupported setting ignored: {}", setting.name);
        }
    }

    /// Look up a group by its (case-insensitive) VOLT name.
    pub fn group(&self, name: &str, location: Location) -> Result<&Group, Error> {
        self.groups
            .get(name.to_lowercase().as_str())
            .ok_or_else(|| Error::UndefinedGroup {
                name: name.into(),
                location,
            })
    }

    /// All groups, in definition order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn features(&self) -> &FeatureMap {
        &self.features
    }

    pub fn gdef(&self) -> &GdefClasses {
        &self.gdef
    }

    pub fn is_mark(&self, glyph: &GlyphName) -> bool {
        self.marks.contains(glyph)
    }

    /// The component count, if this glyph is a ligature.
    pub fn ligature_components(&self, glyph: &GlyphName) -> Option<u16> {
        self.ligatures.get(glyph).copied()
    }

    /// The per-component positions of a glyph's anchor.
    pub fn anchor(&self, glyph: &GlyphName, name: &str) -> Option<&BTreeMap<u16, Anchor>> {
        self.anchors.get(glyph)?.get(name)
    }

    /// The output class name for a VOLT mark class, if any mark defines it.
    pub fn mark_class_name(&self, class: &str) -> Option<&SmolStr> {
        self.mark_classes.get(class)
    }

    /// Every mark anchor, sorted by glyph, class and component.
    pub fn mark_anchors(&self) -> impl Iterator<Item = (&MarkAnchorKey, &Anchor)> {
        self.mark_anchors.iter()
    }

    pub fn has_mark_anchor(&self, glyph: &GlyphName, class: &str) -> bool {
        let start = MarkAnchorKey {
            glyph: glyph.clone(),
            class: class.into(),
            component: 0,
        };
        self.mark_anchors
            .range(start..)
            .next()
            .is_some_and(|(key, _)| &key.glyph == glyph && key.class == class)
    }

    /// `true` if positioning lookups should use the extension lookup type.
    pub fn use_extension(&self) -> bool {
        self.settings.contains_key(USE_EXTENSION)
    }
}
