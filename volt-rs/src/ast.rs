//! The statements of a VOLT project source.
//!
//! A VOLT source is a flat sequence of definitions. Nothing here is resolved:
//! glyph and group references are kept as written, and lookups refer to
//! groups and anchors that may be defined later in the file.

use std::fmt::Display;

use smol_str::SmolStr;
use write_fonts::types::Tag;

/// A glyph name, as written in the source.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlyphName(SmolStr);

impl GlyphName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for GlyphName {
    fn from(value: &str) -> Self {
        GlyphName(value.into())
    }
}

impl From<SmolStr> for GlyphName {
    fn from(value: SmolStr) -> Self {
        GlyphName(value)
    }
}

impl Display for GlyphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position in the source text.
///
/// Lines and columns are both one-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A parsed VOLT source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoltFile {
    pub statements: Vec<Statement>,
}

/// A top-level definition.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Glyph(GlyphDefinition),
    Group(GroupDefinition),
    Script(ScriptDefinition),
    Lookup(LookupDefinition),
    Anchor(AnchorDefinition),
    Setting(SettingDefinition),
}

impl Statement {
    /// The location of the keyword that opened this statement.
    pub fn location(&self) -> Location {
        match self {
            Statement::Glyph(def) => def.location,
            Statement::Group(def) => def.location,
            Statement::Script(def) => def.location,
            Statement::Lookup(def) => def.location,
            Statement::Anchor(def) => def.location,
            Statement::Setting(def) => def.location,
        }
    }
}

/// The GDEF class assigned by a `DEF_GLYPH` statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlyphType {
    Base,
    Ligature,
    Mark,
    Component,
}

impl GlyphType {
    pub(crate) fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "BASE" => Some(GlyphType::Base),
            "LIGATURE" => Some(GlyphType::Ligature),
            "MARK" => Some(GlyphType::Mark),
            "COMPONENT" => Some(GlyphType::Component),
            _ => None,
        }
    }
}

/// `DEF_GLYPH "name" ID n [UNICODE n] [TYPE t] [COMPONENTS n] END_GLYPH`
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphDefinition {
    pub name: GlyphName,
    pub id: u16,
    pub unicodes: Vec<u32>,
    pub glyph_type: Option<GlyphType>,
    pub components: Option<u16>,
    pub location: Location,
}

/// A single element of a coverage expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CoverageItem {
    /// `GLYPH "name"`
    Glyph(GlyphName),
    /// `GROUP "name"`
    Group(SmolStr),
    /// `ENUM ... END_ENUM`
    Enum(Vec<CoverageItem>),
    /// `RANGE "first" TO "last"`
    Range(GlyphName, GlyphName),
}

/// An ordered sequence of coverage items.
pub type Coverage = Vec<CoverageItem>;

/// `DEF_GROUP "name" ENUM ... END_ENUM END_GROUP`
#[derive(Clone, Debug, PartialEq)]
pub struct GroupDefinition {
    pub name: SmolStr,
    pub members: Coverage,
    pub location: Location,
}

/// `DEF_SCRIPT [NAME "name"] TAG "tag" ... END_SCRIPT`
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptDefinition {
    pub name: Option<String>,
    pub tag: Tag,
    pub langs: Vec<LangSysDefinition>,
    pub location: Location,
}

/// `DEF_LANGSYS [NAME "name"] TAG "tag" ... END_LANGSYS`
#[derive(Clone, Debug, PartialEq)]
pub struct LangSysDefinition {
    pub name: Option<String>,
    pub tag: Tag,
    pub features: Vec<FeatureDefinition>,
    pub location: Location,
}

/// `DEF_FEATURE NAME "name" TAG "tag" (LOOKUP "name")* END_FEATURE`
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureDefinition {
    pub name: Option<String>,
    pub tag: Tag,
    pub lookups: Vec<SmolStr>,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

/// Which mark glyphs a lookup processes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProcessMarks {
    /// `PROCESS_MARKS ALL`
    #[default]
    All,
    /// `SKIP_MARKS` or `PROCESS_MARKS NONE`
    None,
    /// `PROCESS_MARKS "group"`: only marks in the group are processed.
    Attachment(SmolStr),
    /// `PROCESS_MARKS MARK_GLYPH_SET "group"`
    FilterSet(SmolStr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextKind {
    /// `IN_CONTEXT`
    Include,
    /// `EXCEPT_CONTEXT`
    Exclude,
}

/// One `IN_CONTEXT`/`EXCEPT_CONTEXT` block.
///
/// Each `LEFT`/`RIGHT` entry is a coverage; entries are in source order,
/// so `left` reads outward-in and `right` reads inward-out.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextDefinition {
    pub kind: ContextKind,
    pub left: Vec<Coverage>,
    pub right: Vec<Coverage>,
}

/// `DEF_LOOKUP "name" ... (AS_SUBSTITUTION | AS_POSITION) ...`
#[derive(Clone, Debug, PartialEq)]
pub struct LookupDefinition {
    pub name: SmolStr,
    pub process_base: bool,
    pub process_marks: ProcessMarks,
    pub direction: Option<Direction>,
    pub reversal: bool,
    pub comments: Option<String>,
    pub contexts: Vec<ContextDefinition>,
    pub payload: LookupPayload,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LookupPayload {
    Substitution(Substitution),
    Position(Position),
}

/// The shape of a substitution, decided from the mapping's cardinalities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubstitutionKind {
    Single,
    Multiple,
    Ligature,
    ReverseChainingSingle,
}

impl Display for SubstitutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SubstitutionKind::Single => "single",
            SubstitutionKind::Multiple => "multiple",
            SubstitutionKind::Ligature => "ligature",
            SubstitutionKind::ReverseChainingSingle => "reverse chaining single",
        })
    }
}

/// One `SUB ... WITH ... END_SUB` entry.
#[derive(Clone, Debug, PartialEq)]
pub struct SubstitutionMapping {
    pub input: Coverage,
    pub output: Coverage,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Substitution {
    pub kind: SubstitutionKind,
    pub mappings: Vec<SubstitutionMapping>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Position {
    AdjustPair(AdjustPair),
    AdjustSingle(AdjustSingle),
    Attach(Attach),
    AttachCursive(AttachCursive),
}

impl Position {
    /// The VOLT keyword introducing this kind of positioning.
    pub fn keyword(&self) -> &'static str {
        match self {
            Position::AdjustPair(_) => "ADJUST_PAIR",
            Position::AdjustSingle(_) => "ADJUST_SINGLE",
            Position::Attach(_) => "ATTACH",
            Position::AttachCursive(_) => "ATTACH_CURSIVE",
        }
    }
}

/// A single `n m BY POS ... END_POS POS ... END_POS` entry.
///
/// The indices are one-based positions in the `FIRST` and `SECOND` lists.
#[derive(Clone, Debug, PartialEq)]
pub struct PairAdjustment {
    pub first: u16,
    pub second: u16,
    pub first_pos: Pos,
    pub second_pos: Pos,
}

/// `ADJUST_PAIR (FIRST ..)* (SECOND ..)* (n m BY pos pos)* END_ADJUST`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjustPair {
    pub first: Vec<Coverage>,
    pub second: Vec<Coverage>,
    pub pairs: Vec<PairAdjustment>,
}

/// `ADJUST_SINGLE (coverage BY pos)* END_ADJUST`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjustSingle {
    pub adjustments: Vec<(Coverage, Pos)>,
}

/// `ATTACH coverage TO (coverage AT ANCHOR "name")* END_ATTACH`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attach {
    pub bases: Coverage,
    pub marks: Vec<(Coverage, SmolStr)>,
}

/// `ATTACH_CURSIVE (EXIT coverage)* (ENTER coverage)* END_ATTACH`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttachCursive {
    pub exit: Vec<Coverage>,
    pub enter: Vec<Coverage>,
}

/// A device adjustment: `ADJUST_BY delta AT ppem`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAdjustment {
    pub ppem: u16,
    pub delta: i16,
}

/// `POS [ADV n] [DX n] [DY n] END_POS`, each with optional device adjustments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pos {
    pub adv: Option<i16>,
    pub dx: Option<i16>,
    pub dy: Option<i16>,
    pub adv_adjust: Vec<DeviceAdjustment>,
    pub dx_adjust: Vec<DeviceAdjustment>,
    pub dy_adjust: Vec<DeviceAdjustment>,
}

impl Pos {
    /// `true` if no value or adjustment was given (`POS END_POS`).
    pub fn is_empty(&self) -> bool {
        self.adv.is_none()
            && self.dx.is_none()
            && self.dy.is_none()
            && self.adv_adjust.is_empty()
            && self.dx_adjust.is_empty()
            && self.dy_adjust.is_empty()
    }
}

/// `DEF_ANCHOR "name" ON gid GLYPH name COMPONENT n [LOCKED] AT pos END_ANCHOR`
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorDefinition {
    pub name: SmolStr,
    pub glyph_id: u16,
    pub glyph: GlyphName,
    pub component: u16,
    pub locked: bool,
    pub pos: Pos,
    pub location: Location,
}

/// A project-wide setting such as `GRID_PPEM 20` or `COMPILER_USEEXTENSIONLOOKUPS`.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingDefinition {
    pub name: SmolStr,
    pub values: Vec<i32>,
    pub location: Location,
}
