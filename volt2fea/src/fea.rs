//! A small model of the feature file syntax we generate.
//!
//! This is not a general purpose feature file AST; it covers only the
//! statements a VOLT project can be translated into. Everything renders via
//! [`Display`], and the rendered text is what the converter returns.

use std::fmt::{Display, Formatter, Result as FmtResult};

use bitflags::bitflags;
use smol_str::SmolStr;
use volt_rs::ast::{DeviceAdjustment, Pos};
use write_fonts::types::Tag;

const INDENT: &str = "    ";

// words that would be read as keywords if used as a bare glyph name
const RESERVED: &[&str] = &[
    "anchor",
    "anchorDef",
    "anon",
    "anonymous",
    "by",
    "contour",
    "cursive",
    "device",
    "enum",
    "enumerate",
    "exclude_dflt",
    "excludeDFLT",
    "feature",
    "from",
    "ignore",
    "IgnoreBaseGlyphs",
    "IgnoreLigatures",
    "IgnoreMarks",
    "include",
    "include_dflt",
    "includeDFLT",
    "language",
    "languagesystem",
    "lookup",
    "lookupflag",
    "mark",
    "MarkAttachmentType",
    "markClass",
    "nameid",
    "NULL",
    "parameters",
    "pos",
    "position",
    "required",
    "reversesub",
    "RightToLeft",
    "rsub",
    "script",
    "sub",
    "substitute",
    "subtable",
    "table",
    "useExtension",
    "UseMarkFilteringSet",
    "valueRecordDef",
];

/// A glyph, a named class, or an inline class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlyphOrClass {
    Glyph(SmolStr),
    /// A reference to a named class, without the leading `@`.
    Class(SmolStr),
    /// An inline class; its members are never themselves inline classes.
    Literal(Vec<GlyphOrClass>),
}

impl GlyphOrClass {
    /// Build an inline class, splicing in the members of any nested inline classes.
    pub fn literal(items: impl IntoIterator<Item = GlyphOrClass>) -> Self {
        let mut members = Vec::new();
        for item in items {
            match item {
                GlyphOrClass::Literal(inner) => members.extend(inner),
                other => members.push(other),
            }
        }
        GlyphOrClass::Literal(members)
    }

    /// Collapse a sequence into one item: itself if there is exactly one,
    /// otherwise an inline class of all of them.
    pub fn collapse(mut items: Vec<GlyphOrClass>) -> Self {
        if items.len() == 1 {
            return items.remove(0);
        }
        GlyphOrClass::literal(items)
    }
}

impl Display for GlyphOrClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GlyphOrClass::Glyph(name) if RESERVED.contains(&name.as_str()) => {
                write!(f, "\\{name}")
            }
            GlyphOrClass::Glyph(name) => f.write_str(name),
            GlyphOrClass::Class(name) => write!(f, "@{name}"),
            GlyphOrClass::Literal(items) => {
                f.write_str("[")?;
                write_separated(f, items, " ")?;
                f.write_str("]")
            }
        }
    }
}

fn write_separated<T: Display>(f: &mut Formatter<'_>, items: &[T], sep: &str) -> FmtResult {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

struct Device<'a>(&'a [DeviceAdjustment]);

impl Display for Device<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.0.is_empty() {
            return f.write_str("<device NULL>");
        }
        f.write_str("<device ")?;
        for (i, adj) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", adj.ppem, adj.delta)?;
        }
        f.write_str(">")
    }
}

/// An anchor point, with optional device adjustments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
    pub x_device: Vec<DeviceAdjustment>,
    pub y_device: Vec<DeviceAdjustment>,
}

impl Anchor {
    pub fn new(x: i16, y: i16) -> Self {
        Anchor {
            x,
            y,
            ..Default::default()
        }
    }
}

impl Display for Anchor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "<anchor {} {}", self.x, self.y)?;
        if !self.x_device.is_empty() || !self.y_device.is_empty() {
            write!(f, " {} {}", Device(&self.x_device), Device(&self.y_device))?;
        }
        f.write_str(">")
    }
}

/// An anchor that may be absent, rendered as `<anchor NULL>`.
struct MaybeAnchor<'a>(Option<&'a Anchor>);

impl Display for MaybeAnchor<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.0 {
            Some(anchor) => anchor.fmt(f),
            None => f.write_str("<anchor NULL>"),
        }
    }
}

/// A positioning value record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueRecord {
    pub x_placement: Option<i16>,
    pub y_placement: Option<i16>,
    pub x_advance: Option<i16>,
    pub x_placement_device: Vec<DeviceAdjustment>,
    pub y_placement_device: Vec<DeviceAdjustment>,
    pub x_advance_device: Vec<DeviceAdjustment>,
}

impl ValueRecord {
    pub fn is_empty(&self) -> bool {
        self.x_placement.is_none()
            && self.y_placement.is_none()
            && self.x_advance.is_none()
            && !self.has_devices()
    }

    fn has_devices(&self) -> bool {
        !(self.x_placement_device.is_empty()
            && self.y_placement_device.is_empty()
            && self.x_advance_device.is_empty())
    }

    /// The advance, if that is the only thing this record sets.
    fn just_advance(&self) -> Option<i16> {
        if self.x_placement.is_none() && self.y_placement.is_none() && !self.has_devices() {
            return self.x_advance;
        }
        None
    }

    /// Always render in the bracketed `<x y adv 0>` form.
    fn full(&self) -> FullValueRecord<'_> {
        FullValueRecord(self)
    }
}

impl From<&Pos> for ValueRecord {
    fn from(pos: &Pos) -> Self {
        ValueRecord {
            x_placement: pos.dx,
            y_placement: pos.dy,
            x_advance: pos.adv,
            x_placement_device: pos.dx_adjust.clone(),
            y_placement_device: pos.dy_adjust.clone(),
            x_advance_device: pos.adv_adjust.clone(),
        }
    }
}

impl Display for ValueRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.just_advance() {
            Some(adv) => write!(f, "{adv}"),
            None => self.full().fmt(f),
        }
    }
}

struct FullValueRecord<'a>(&'a ValueRecord);

impl Display for FullValueRecord<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let record = self.0;
        write!(
            f,
            "<{} {} {} 0",
            record.x_placement.unwrap_or_default(),
            record.y_placement.unwrap_or_default(),
            record.x_advance.unwrap_or_default()
        )?;
        if record.has_devices() {
            write!(
                f,
                " {} {} {} {}",
                Device(&record.x_placement_device),
                Device(&record.y_placement_device),
                Device(&record.x_advance_device),
                Device(&[])
            )?;
        }
        f.write_str(">")
    }
}

bitflags! {
    /// The lookup flag bits we can express.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LookupFlags: u16 {
        const RIGHT_TO_LEFT = 0x0001;
        const IGNORE_BASE_GLYPHS = 0x0002;
        const IGNORE_LIGATURES = 0x0004;
        const IGNORE_MARKS = 0x0008;
    }
}

/// A `lookupflag` statement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupFlagRule {
    pub flags: LookupFlags,
    /// Class name for `MarkAttachmentType`
    pub mark_attachment: Option<SmolStr>,
    /// Class name for `UseMarkFilteringSet`
    pub mark_filtering: Option<SmolStr>,
}

impl LookupFlagRule {
    /// `true` if this would have no effect.
    pub fn is_default(&self) -> bool {
        self.flags.is_empty() && self.mark_attachment.is_none() && self.mark_filtering.is_none()
    }
}

impl Display for LookupFlagRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut parts = Vec::new();
        for (flag, keyword) in [
            (LookupFlags::RIGHT_TO_LEFT, "RightToLeft"),
            (LookupFlags::IGNORE_BASE_GLYPHS, "IgnoreBaseGlyphs"),
            (LookupFlags::IGNORE_LIGATURES, "IgnoreLigatures"),
            (LookupFlags::IGNORE_MARKS, "IgnoreMarks"),
        ] {
            if self.flags.contains(flag) {
                parts.push(keyword.to_string());
            }
        }
        if let Some(class) = &self.mark_attachment {
            parts.push(format!("MarkAttachmentType @{class}"));
        }
        if let Some(class) = &self.mark_filtering {
            parts.push(format!("UseMarkFilteringSet @{class}"));
        }
        if parts.is_empty() {
            return f.write_str("lookupflag 0;");
        }
        write!(f, "lookupflag {};", parts.join(" "))
    }
}

/// Backtrack and lookahead sequences around a rule's input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainContext {
    pub prefix: Vec<GlyphOrClass>,
    pub suffix: Vec<GlyphOrClass>,
    /// Write the input as marked (`a'`) even with no prefix or suffix.
    pub force_chain: bool,
}

impl ChainContext {
    pub fn is_contextual(&self) -> bool {
        self.force_chain || !self.prefix.is_empty() || !self.suffix.is_empty()
    }

    fn write_sequence(
        &self,
        f: &mut Formatter<'_>,
        input: &[GlyphOrClass],
        marked: bool,
    ) -> FmtResult {
        let mut first = true;
        let mut sep = |f: &mut Formatter<'_>| -> FmtResult {
            if !std::mem::take(&mut first) {
                f.write_str(" ")?;
            }
            Ok(())
        };
        for item in &self.prefix {
            sep(f)?;
            write!(f, "{item}")?;
        }
        for item in input {
            sep(f)?;
            write!(f, "{item}")?;
            if marked {
                f.write_str("'")?;
            }
        }
        for item in &self.suffix {
            sep(f)?;
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// One `<anchor> mark @class` attachment point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkAttachment {
    pub anchor: Option<Anchor>,
    pub mark_class: SmolStr,
}

impl Display for MarkAttachment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} mark @{}",
            MaybeAnchor(self.anchor.as_ref()),
            self.mark_class
        )
    }
}

/// A statement inside a lookup block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    Comment(String),
    LookupFlag(LookupFlagRule),
    Subtable,
    SingleSub {
        context: ChainContext,
        target: GlyphOrClass,
        replacement: GlyphOrClass,
    },
    MultipleSub {
        context: ChainContext,
        target: GlyphOrClass,
        replacement: Vec<GlyphOrClass>,
    },
    LigatureSub {
        context: ChainContext,
        components: Vec<GlyphOrClass>,
        replacement: GlyphOrClass,
    },
    ReverseSub {
        context: ChainContext,
        target: GlyphOrClass,
        replacement: GlyphOrClass,
    },
    IgnoreSub {
        context: ChainContext,
        input: Vec<GlyphOrClass>,
    },
    PairPos {
        enumerated: bool,
        first: GlyphOrClass,
        first_value: ValueRecord,
        second: GlyphOrClass,
        second_value: ValueRecord,
    },
    SinglePos {
        target: GlyphOrClass,
        value: ValueRecord,
    },
    MarkToBase {
        base: GlyphOrClass,
        marks: Vec<MarkAttachment>,
    },
    MarkToLigature {
        base: GlyphOrClass,
        components: Vec<Vec<MarkAttachment>>,
    },
    MarkToMark {
        base: GlyphOrClass,
        marks: Vec<MarkAttachment>,
    },
    Cursive {
        glyph: GlyphOrClass,
        entry: Option<Anchor>,
        exit: Option<Anchor>,
    },
    /// Contextual positioning; each input item may name a lookup to apply there.
    ChainPos {
        context: ChainContext,
        input: Vec<(GlyphOrClass, Option<SmolStr>)>,
    },
    IgnorePos {
        context: ChainContext,
        input: Vec<GlyphOrClass>,
    },
}

impl Rule {
    pub fn is_pair_pos(&self) -> bool {
        matches!(self, Rule::PairPos { .. })
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Rule::Comment(text) => {
                for (i, line) in text.lines().enumerate() {
                    if i > 0 {
                        write!(f, "\n{INDENT}")?;
                    }
                    write!(f, "# {line}")?;
                }
                Ok(())
            }
            Rule::LookupFlag(flags) => flags.fmt(f),
            Rule::Subtable => f.write_str("subtable;"),
            Rule::SingleSub {
                context,
                target,
                replacement,
            } => {
                f.write_str("sub ")?;
                context.write_sequence(f, std::slice::from_ref(target), context.is_contextual())?;
                write!(f, " by {replacement};")
            }
            Rule::MultipleSub {
                context,
                target,
                replacement,
            } => {
                f.write_str("sub ")?;
                context.write_sequence(f, std::slice::from_ref(target), context.is_contextual())?;
                f.write_str(" by ")?;
                write_separated(f, replacement, " ")?;
                f.write_str(";")
            }
            Rule::LigatureSub {
                context,
                components,
                replacement,
            } => {
                f.write_str("sub ")?;
                context.write_sequence(f, components, context.is_contextual())?;
                write!(f, " by {replacement};")
            }
            Rule::ReverseSub {
                context,
                target,
                replacement,
            } => {
                f.write_str("rsub ")?;
                context.write_sequence(f, std::slice::from_ref(target), context.is_contextual())?;
                write!(f, " by {replacement};")
            }
            Rule::IgnoreSub { context, input } => {
                f.write_str("ignore sub ")?;
                context.write_sequence(f, input, true)?;
                f.write_str(";")
            }
            Rule::PairPos {
                enumerated,
                first,
                first_value,
                second,
                second_value,
            } => {
                if *enumerated {
                    f.write_str("enum ")?;
                }
                if second_value.is_empty() {
                    write!(f, "pos {first} {second} {first_value};")
                } else {
                    write!(
                        f,
                        "pos {first} {} {second} {};",
                        first_value.full(),
                        second_value.full()
                    )
                }
            }
            Rule::SinglePos { target, value } => write!(f, "pos {target} {value};"),
            Rule::MarkToBase { base, marks } => {
                write!(f, "pos base {base} ")?;
                write_separated(f, marks, " ")?;
                f.write_str(";")
            }
            Rule::MarkToMark { base, marks } => {
                write!(f, "pos mark {base} ")?;
                write_separated(f, marks, " ")?;
                f.write_str(";")
            }
            Rule::MarkToLigature { base, components } => {
                write!(f, "pos ligature {base} ")?;
                for (i, marks) in components.iter().enumerate() {
                    if i > 0 {
                        write!(f, "\n{INDENT}{INDENT}ligComponent ")?;
                    }
                    if marks.iter().all(|mark| mark.anchor.is_none()) {
                        f.write_str("<anchor NULL>")?;
                        continue;
                    }
                    let present = marks
                        .iter()
                        .filter(|mark| mark.anchor.is_some())
                        .cloned()
                        .collect::<Vec<_>>();
                    write_separated(f, &present, " ")?;
                }
                f.write_str(";")
            }
            Rule::Cursive { glyph, entry, exit } => write!(
                f,
                "pos cursive {glyph} {} {};",
                MaybeAnchor(entry.as_ref()),
                MaybeAnchor(exit.as_ref())
            ),
            Rule::ChainPos { context, input } => {
                f.write_str("pos ")?;
                let mut first = true;
                for item in context
                    .prefix
                    .iter()
                    .map(|g| (g, None, false))
                    .chain(input.iter().map(|(g, l)| (g, l.as_ref(), true)))
                    .chain(context.suffix.iter().map(|g| (g, None, false)))
                {
                    if !std::mem::take(&mut first) {
                        f.write_str(" ")?;
                    }
                    let (glyphs, lookup, marked) = item;
                    write!(f, "{glyphs}")?;
                    if marked {
                        f.write_str("'")?;
                    }
                    if let Some(lookup) = lookup {
                        write!(f, " lookup {lookup}")?;
                    }
                }
                f.write_str(";")
            }
            Rule::IgnorePos { context, input } => {
                f.write_str("ignore pos ")?;
                context.write_sequence(f, input, true)?;
                f.write_str(";")
            }
        }
    }
}

/// A named `lookup` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupBlock {
    pub name: SmolStr,
    pub use_extension: bool,
    pub rules: Vec<Rule>,
}

impl LookupBlock {
    pub fn new(name: SmolStr) -> Self {
        LookupBlock {
            name,
            use_extension: false,
            rules: Vec::new(),
        }
    }
}

impl Display for LookupBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "lookup {}", self.name)?;
        if self.use_extension {
            f.write_str(" useExtension")?;
        }
        f.write_str(" {\n")?;
        for rule in &self.rules {
            writeln!(f, "{INDENT}{rule}")?;
        }
        write!(f, "}} {};", self.name)
    }
}

/// `@name = [...];`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphClassDef {
    pub name: SmolStr,
    pub members: Vec<GlyphOrClass>,
}

impl Display for GlyphClassDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "@{} = [", self.name)?;
        write_separated(f, &self.members, " ")?;
        f.write_str("];")
    }
}

/// `markClass glyph <anchor> @class;`, commented out unless used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkClassDef {
    pub glyph: GlyphOrClass,
    pub anchor: Anchor,
    pub class: SmolStr,
    pub used: bool,
}

impl Display for MarkClassDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if !self.used {
            f.write_str("#")?;
        }
        write!(f, "markClass {} {} @{};", self.glyph, self.anchor, self.class)
    }
}

/// Writes a tag without its trailing padding.
struct TrimmedTag(Tag);

impl Display for TrimmedTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.0.to_string().trim_end())
    }
}

/// The lookups registered for one language system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageLookups {
    pub script: Tag,
    pub language: Tag,
    pub lookups: Vec<SmolStr>,
}

/// A `feature` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureBlock {
    pub tag: Tag,
    pub languages: Vec<LanguageLookups>,
}

impl Display for FeatureBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let tag = TrimmedTag(self.tag);
        writeln!(f, "feature {tag} {{")?;
        let mut current_script = None;
        for lang in &self.languages {
            if current_script != Some(lang.script) {
                writeln!(f, "{INDENT}script {};", TrimmedTag(lang.script))?;
                current_script = Some(lang.script);
            }
            writeln!(f, "{INDENT}language {};", TrimmedTag(lang.language))?;
            for lookup in &lang.lookups {
                writeln!(f, "{INDENT}lookup {lookup};")?;
            }
        }
        write!(f, "}} {tag};")
    }
}

/// The GDEF glyph class definitions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GdefClasses {
    pub base: Vec<GlyphOrClass>,
    pub ligature: Vec<GlyphOrClass>,
    pub mark: Vec<GlyphOrClass>,
    pub component: Vec<GlyphOrClass>,
}

impl GdefClasses {
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
            && self.ligature.is_empty()
            && self.mark.is_empty()
            && self.component.is_empty()
    }
}

impl Display for GdefClasses {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "table GDEF {{")?;
        write!(f, "{INDENT}GlyphClassDef ")?;
        for (i, class) in [&self.base, &self.ligature, &self.mark, &self.component]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                f.write_str(", ")?;
            }
            if !class.is_empty() {
                write!(f, "{}", GlyphOrClass::Literal(class.clone()))?;
            }
        }
        writeln!(f, ";")?;
        f.write_str("} GDEF;")
    }
}

/// A complete generated feature file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureFile {
    pub glyph_classes: Vec<GlyphClassDef>,
    pub mark_classes: Vec<MarkClassDef>,
    pub lookups: Vec<LookupBlock>,
    pub features: Vec<FeatureBlock>,
    pub gdef: Option<GdefClasses>,
}

impl Display for FeatureFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut sections = Vec::new();
        if !self.glyph_classes.is_empty() {
            sections.push(section("Glyph classes", &self.glyph_classes, "\n"));
        }
        if !self.mark_classes.is_empty() {
            sections.push(section("Mark classes", &self.mark_classes, "\n"));
        }
        if !self.lookups.is_empty() {
            sections.push(section("Lookups", &self.lookups, "\n\n"));
        }
        if !self.features.is_empty() {
            sections.push(section("Features", &self.features, "\n\n"));
        }
        if let Some(gdef) = self.gdef.as_ref().filter(|gdef| !gdef.is_empty()) {
            sections.push(format!("{gdef}\n"));
        }
        f.write_str(&sections.join("\n"))
    }
}

fn section<T: Display>(title: &str, items: &[T], sep: &str) -> String {
    let body = items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep);
    format!("# {title}\n{body}\n")
}
