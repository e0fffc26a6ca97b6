//! Build [`VoltFile`]s from source text.
//!
//! This is a straightforward recursive-descent parser. VOLT sources are
//! machine-written and regular, so we stop at the first error instead of
//! attempting any recovery.

use std::str::FromStr;

use smol_str::SmolStr;
use write_fonts::types::Tag;

use crate::{
    ast::{
        AdjustPair, AdjustSingle, AnchorDefinition, Attach, AttachCursive, ContextDefinition,
        ContextKind, Coverage, CoverageItem, DeviceAdjustment, Direction, FeatureDefinition,
        GlyphDefinition, GlyphType, GroupDefinition, LangSysDefinition, Location,
        LookupDefinition, LookupPayload, PairAdjustment, Pos, Position, ProcessMarks,
        ScriptDefinition, SettingDefinition, Statement, Substitution, SubstitutionKind,
        SubstitutionMapping, VoltFile,
    },
    lexer::{Kind, Lexer, Token},
};

/// An error encountered while parsing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {message}")]
pub struct ParseError {
    pub message: String,
    pub location: Location,
}

/// Parse a complete VOLT source.
pub fn parse(text: &str) -> Result<VoltFile, ParseError> {
    Parser::new(text).file()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let mut lexer = Lexer::new(text);
        let current = lexer.next_token();
        Parser { lexer, current }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            message: message.into(),
            location: self.current.location,
        })
    }

    fn describe_current(&self) -> String {
        match self.current.kind {
            Kind::Eof => "end of file".to_string(),
            Kind::String | Kind::StringUnterminated => {
                format!("string \"{}\"", self.lexer.text(&self.current))
            }
            Kind::Word => format!("'{}'", self.lexer.text(&self.current)),
        }
    }

    fn bump(&mut self) -> Token {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn word(&self) -> Option<&'a str> {
        (self.current.kind == Kind::Word).then(|| self.lexer.text(&self.current))
    }

    fn at(&self, keyword: &str) -> bool {
        self.word() == Some(keyword)
    }

    fn eat(&mut self, keyword: &str) -> bool {
        if self.at(keyword) {
            self.bump();
            return true;
        }
        false
    }

    fn expect(&mut self, keyword: &str) -> Result<Location, ParseError> {
        if self.at(keyword) {
            return Ok(self.bump().location);
        }
        self.error(format!(
            "expected '{keyword}', found {}",
            self.describe_current()
        ))
    }

    fn expect_string(&mut self) -> Result<&'a str, ParseError> {
        match self.current.kind {
            Kind::String => {
                let token = self.bump();
                Ok(self.lexer.text(&token))
            }
            Kind::StringUnterminated => self.error("unterminated string"),
            _ => self.error(format!(
                "expected a quoted string, found {}",
                self.describe_current()
            )),
        }
    }

    /// A name that may or may not be quoted (`GLYPH a` and `GLYPH "a"` are both valid).
    fn expect_name(&mut self) -> Result<&'a str, ParseError> {
        match self.current.kind {
            Kind::Word => {
                let token = self.bump();
                Ok(self.lexer.text(&token))
            }
            _ => self.expect_string(),
        }
    }

    fn expect_number<T: FromStr>(&mut self, what: &str) -> Result<T, ParseError> {
        match self.word().and_then(|word| word.parse().ok()) {
            Some(value) => {
                self.bump();
                Ok(value)
            }
            None => self.error(format!(
                "expected {what}, found {}",
                self.describe_current()
            )),
        }
    }

    fn at_number(&self) -> bool {
        self.word().is_some_and(|word| word.parse::<i64>().is_ok())
    }

    fn expect_tag(&mut self) -> Result<Tag, ParseError> {
        let location = self.current.location;
        let raw = self.expect_string()?;
        Tag::new_checked(raw.as_bytes()).map_err(|err| ParseError {
            message: format!("invalid tag '{raw}': {err}"),
            location,
        })
    }

    fn file(mut self) -> Result<VoltFile, ParseError> {
        let mut statements = Vec::new();
        loop {
            let location = self.current.location;
            let statement = match self.current.kind {
                Kind::Eof => break,
                Kind::Word => match self.lexer.text(&self.current) {
                    "END" => {
                        self.bump();
                        if self.current.kind != Kind::Eof {
                            return self.error(format!(
                                "unexpected {} after END",
                                self.describe_current()
                            ));
                        }
                        break;
                    }
                    "DEF_GLYPH" => Statement::Glyph(self.glyph()?),
                    "DEF_GROUP" => Statement::Group(self.group()?),
                    "DEF_SCRIPT" => Statement::Script(self.script()?),
                    "DEF_LOOKUP" => Statement::Lookup(self.lookup()?),
                    "DEF_ANCHOR" => Statement::Anchor(self.anchor()?),
                    _ => Statement::Setting(self.setting()?),
                },
                _ => {
                    return self.error(format!(
                        "expected a definition, found {}",
                        self.describe_current()
                    ))
                }
            };
            debug_assert!(statement.location() == location);
            statements.push(statement);
        }
        Ok(VoltFile { statements })
    }

    fn setting(&mut self) -> Result<SettingDefinition, ParseError> {
        let token = self.bump();
        let name = SmolStr::new(self.lexer.text(&token));
        if !name.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_') {
            return Err(ParseError {
                message: format!("expected a definition, found '{name}'"),
                location: token.location,
            });
        }
        let mut values = Vec::new();
        while self.at_number() {
            values.push(self.expect_number("a setting value")?);
        }
        Ok(SettingDefinition {
            name,
            values,
            location: token.location,
        })
    }

    fn glyph(&mut self) -> Result<GlyphDefinition, ParseError> {
        let location = self.expect("DEF_GLYPH")?;
        let name = self.expect_string()?.into();
        self.expect("ID")?;
        let id = self.expect_number("a glyph id")?;
        let mut unicodes = Vec::new();
        if self.eat("UNICODE") {
            unicodes.push(self.expect_number("a unicode value")?);
        } else if self.eat("UNICODEVALUES") {
            let values_location = self.current.location;
            let values = self.expect_string()?;
            for value in values.split(',') {
                let hex = value.trim().trim_start_matches("U+");
                let parsed = u32::from_str_radix(hex, 16).map_err(|_| ParseError {
                    message: format!("invalid unicode value '{value}'"),
                    location: values_location,
                })?;
                unicodes.push(parsed);
            }
        }
        let mut glyph_type = None;
        if self.eat("TYPE") {
            let Some(parsed) = self.word().and_then(GlyphType::from_keyword) else {
                return self.error(format!(
                    "expected a glyph type, found {}",
                    self.describe_current()
                ));
            };
            self.bump();
            glyph_type = Some(parsed);
        }
        let mut components = None;
        if self.eat("COMPONENTS") {
            components = Some(self.expect_number("a component count")?);
        }
        self.expect("END_GLYPH")?;
        Ok(GlyphDefinition {
            name,
            id,
            unicodes,
            glyph_type,
            components,
            location,
        })
    }

    fn group(&mut self) -> Result<GroupDefinition, ParseError> {
        let location = self.expect("DEF_GROUP")?;
        let name = self.expect_string()?.into();
        let mut members = Vec::new();
        if self.eat("ENUM") {
            members = self.coverage()?;
            self.expect("END_ENUM")?;
        }
        self.expect("END_GROUP")?;
        Ok(GroupDefinition {
            name,
            members,
            location,
        })
    }

    /// Zero or more coverage items.
    fn coverage(&mut self) -> Result<Coverage, ParseError> {
        let mut items = Vec::new();
        loop {
            let item = match self.word() {
                Some("GLYPH") => {
                    self.bump();
                    CoverageItem::Glyph(self.expect_name()?.into())
                }
                Some("GROUP") => {
                    self.bump();
                    CoverageItem::Group(self.expect_name()?.into())
                }
                Some("RANGE") => {
                    self.bump();
                    let start = self.expect_name()?.into();
                    self.expect("TO")?;
                    let end = self.expect_name()?.into();
                    CoverageItem::Range(start, end)
                }
                Some("ENUM") => {
                    self.bump();
                    let inner = self.coverage()?;
                    self.expect("END_ENUM")?;
                    CoverageItem::Enum(inner)
                }
                _ => break,
            };
            items.push(item);
        }
        Ok(items)
    }

    fn optional_name(&mut self) -> Result<Option<String>, ParseError> {
        if self.eat("NAME") {
            return Ok(Some(self.expect_string()?.to_string()));
        }
        Ok(None)
    }

    fn script(&mut self) -> Result<ScriptDefinition, ParseError> {
        let location = self.expect("DEF_SCRIPT")?;
        let name = self.optional_name()?;
        self.expect("TAG")?;
        let tag = self.expect_tag()?;
        let mut langs = Vec::new();
        while self.at("DEF_LANGSYS") {
            langs.push(self.langsys()?);
        }
        self.expect("END_SCRIPT")?;
        Ok(ScriptDefinition {
            name,
            tag,
            langs,
            location,
        })
    }

    fn langsys(&mut self) -> Result<LangSysDefinition, ParseError> {
        let location = self.expect("DEF_LANGSYS")?;
        let name = self.optional_name()?;
        self.expect("TAG")?;
        let tag = self.expect_tag()?;
        let mut features = Vec::new();
        while self.at("DEF_FEATURE") {
            features.push(self.feature()?);
        }
        self.expect("END_LANGSYS")?;
        Ok(LangSysDefinition {
            name,
            tag,
            features,
            location,
        })
    }

    fn feature(&mut self) -> Result<FeatureDefinition, ParseError> {
        let location = self.expect("DEF_FEATURE")?;
        let name = self.optional_name()?;
        self.expect("TAG")?;
        let tag = self.expect_tag()?;
        let mut lookups = Vec::new();
        while self.eat("LOOKUP") {
            lookups.push(self.expect_string()?.into());
        }
        self.expect("END_FEATURE")?;
        Ok(FeatureDefinition {
            name,
            tag,
            lookups,
            location,
        })
    }

    fn lookup(&mut self) -> Result<LookupDefinition, ParseError> {
        let location = self.expect("DEF_LOOKUP")?;
        let name = self.expect_string()?.into();
        let mut process_base = true;
        let mut process_marks = ProcessMarks::All;
        let mut direction = None;
        let mut reversal = false;
        let mut comments = None;
        loop {
            match self.word() {
                Some("PROCESS_BASE") => {
                    self.bump();
                    process_base = true;
                }
                Some("SKIP_BASE") => {
                    self.bump();
                    process_base = false;
                }
                Some("PROCESS_MARKS") => {
                    self.bump();
                    let kind = self.current.kind;
                    process_marks = match kind {
                        Kind::String => ProcessMarks::Attachment(self.expect_string()?.into()),
                        _ if self.eat("ALL") => ProcessMarks::All,
                        _ if self.eat("NONE") => ProcessMarks::None,
                        _ if self.eat("MARK_GLYPH_SET") => {
                            ProcessMarks::FilterSet(self.expect_string()?.into())
                        }
                        _ => ProcessMarks::All,
                    };
                }
                Some("SKIP_MARKS") => {
                    self.bump();
                    process_marks = ProcessMarks::None;
                }
                Some("DIRECTION") => {
                    self.bump();
                    direction = Some(match self.word() {
                        Some("LTR") => Direction::Ltr,
                        Some("RTL") => Direction::Rtl,
                        _ => {
                            return self.error(format!(
                                "expected LTR or RTL, found {}",
                                self.describe_current()
                            ))
                        }
                    });
                    self.bump();
                }
                Some("REVERSAL") => {
                    self.bump();
                    reversal = true;
                }
                Some("COMMENTS") => {
                    self.bump();
                    comments = Some(self.expect_string()?.replace("\\n", "\n"));
                }
                _ => break,
            }
        }

        let mut contexts = Vec::new();
        loop {
            let kind = if self.eat("IN_CONTEXT") {
                ContextKind::Include
            } else if self.eat("EXCEPT_CONTEXT") {
                ContextKind::Exclude
            } else {
                break;
            };
            let mut left = Vec::new();
            let mut right = Vec::new();
            loop {
                if self.eat("LEFT") {
                    left.push(self.coverage()?);
                } else if self.eat("RIGHT") {
                    right.push(self.coverage()?);
                } else {
                    break;
                }
            }
            self.expect("END_CONTEXT")?;
            // an empty context block of either kind is the same as no context
            if left.is_empty() && right.is_empty() {
                continue;
            }
            contexts.push(ContextDefinition { kind, left, right });
        }

        let payload = match self.word() {
            Some("AS_SUBSTITUTION") => LookupPayload::Substitution(self.substitution(reversal)?),
            Some("AS_POSITION") => LookupPayload::Position(self.position()?),
            _ => {
                return self.error(format!(
                    "expected AS_SUBSTITUTION or AS_POSITION, found {}",
                    self.describe_current()
                ))
            }
        };

        Ok(LookupDefinition {
            name,
            process_base,
            process_marks,
            direction,
            reversal,
            comments,
            contexts,
            payload,
            location,
        })
    }

    fn substitution(&mut self, reversal: bool) -> Result<Substitution, ParseError> {
        let location = self.expect("AS_SUBSTITUTION")?;
        let mut mappings = Vec::new();
        while self.at("SUB") {
            let location = self.bump().location;
            let input = self.coverage()?;
            self.expect("WITH")?;
            let output = self.coverage()?;
            self.expect("END_SUB")?;
            mappings.push(SubstitutionMapping {
                input,
                output,
                location,
            });
        }
        self.expect("END_SUBSTITUTION")?;

        let max_input = mappings.iter().map(|m| m.input.len()).max().unwrap_or(0);
        let max_output = mappings.iter().map(|m| m.output.len()).max().unwrap_or(0);
        let kind = if max_input > 1 && max_output > 1 {
            return Err(ParseError {
                message: "many-to-many substitutions are not valid".into(),
                location,
            });
        } else if reversal {
            SubstitutionKind::ReverseChainingSingle
        } else if max_input > 1 {
            SubstitutionKind::Ligature
        } else if max_output > 1 {
            SubstitutionKind::Multiple
        } else {
            SubstitutionKind::Single
        };
        Ok(Substitution {
            kind,
            mappings,
            location,
        })
    }

    fn position(&mut self) -> Result<Position, ParseError> {
        self.expect("AS_POSITION")?;
        let position = match self.word() {
            Some("ATTACH") => Position::Attach(self.attach()?),
            Some("ATTACH_CURSIVE") => Position::AttachCursive(self.attach_cursive()?),
            Some("ADJUST_PAIR") => Position::AdjustPair(self.adjust_pair()?),
            Some("ADJUST_SINGLE") => Position::AdjustSingle(self.adjust_single()?),
            _ => {
                return self.error(format!(
                    "expected a positioning type, found {}",
                    self.describe_current()
                ))
            }
        };
        self.expect("END_POSITION")?;
        Ok(position)
    }

    fn attach(&mut self) -> Result<Attach, ParseError> {
        self.expect("ATTACH")?;
        let bases = self.coverage()?;
        self.expect("TO")?;
        let mut marks = Vec::new();
        while !self.at("END_ATTACH") {
            let coverage = self.coverage()?;
            self.expect("AT")?;
            self.expect("ANCHOR")?;
            let anchor = self.expect_string()?;
            marks.push((coverage, anchor.into()));
        }
        self.expect("END_ATTACH")?;
        Ok(Attach { bases, marks })
    }

    fn attach_cursive(&mut self) -> Result<AttachCursive, ParseError> {
        self.expect("ATTACH_CURSIVE")?;
        let mut cursive = AttachCursive::default();
        loop {
            if self.eat("EXIT") {
                cursive.exit.push(self.coverage()?);
            } else if self.eat("ENTER") {
                cursive.enter.push(self.coverage()?);
            } else {
                break;
            }
        }
        self.expect("END_ATTACH")?;
        Ok(cursive)
    }

    fn adjust_pair(&mut self) -> Result<AdjustPair, ParseError> {
        self.expect("ADJUST_PAIR")?;
        let mut adjust = AdjustPair::default();
        while self.eat("FIRST") {
            adjust.first.push(self.coverage()?);
        }
        while self.eat("SECOND") {
            adjust.second.push(self.coverage()?);
        }
        while self.at_number() {
            let first = self.expect_number("a FIRST index")?;
            let second = self.expect_number("a SECOND index")?;
            self.expect("BY")?;
            let first_pos = self.pos()?;
            let second_pos = self.pos()?;
            adjust.pairs.push(PairAdjustment {
                first,
                second,
                first_pos,
                second_pos,
            });
        }
        self.expect("END_ADJUST")?;
        Ok(adjust)
    }

    fn adjust_single(&mut self) -> Result<AdjustSingle, ParseError> {
        self.expect("ADJUST_SINGLE")?;
        let mut adjust = AdjustSingle::default();
        while !self.at("END_ADJUST") {
            let coverage = self.coverage()?;
            self.expect("BY")?;
            let pos = self.pos()?;
            adjust.adjustments.push((coverage, pos));
        }
        self.expect("END_ADJUST")?;
        Ok(adjust)
    }

    fn pos(&mut self) -> Result<Pos, ParseError> {
        self.expect("POS")?;
        let mut pos = Pos::default();
        if self.eat("ADV") {
            pos.adv = Some(self.expect_number("an advance")?);
            pos.adv_adjust = self.device_adjustments()?;
        }
        if self.eat("DX") {
            pos.dx = Some(self.expect_number("an x offset")?);
            pos.dx_adjust = self.device_adjustments()?;
        }
        if self.eat("DY") {
            pos.dy = Some(self.expect_number("a y offset")?);
            pos.dy_adjust = self.device_adjustments()?;
        }
        self.expect("END_POS")?;
        Ok(pos)
    }

    fn device_adjustments(&mut self) -> Result<Vec<DeviceAdjustment>, ParseError> {
        let mut adjustments = Vec::new();
        while self.eat("ADJUST_BY") {
            let delta = self.expect_number("a device delta")?;
            self.expect("AT")?;
            let ppem = self.expect_number("a ppem size")?;
            adjustments.push(DeviceAdjustment { ppem, delta });
        }
        Ok(adjustments)
    }

    fn anchor(&mut self) -> Result<AnchorDefinition, ParseError> {
        let location = self.expect("DEF_ANCHOR")?;
        let name = self.expect_string()?.into();
        self.expect("ON")?;
        let glyph_id = self.expect_number("a glyph id")?;
        self.expect("GLYPH")?;
        let glyph = self.expect_name()?.into();
        self.expect("COMPONENT")?;
        let component = self.expect_number("a component index")?;
        let locked = self.eat("LOCKED");
        self.expect("AT")?;
        let pos = self.pos()?;
        self.expect("END_ANCHOR")?;
        Ok(AnchorDefinition {
            name,
            glyph_id,
            glyph,
            component,
            locked,
            pos,
            location,
        })
    }
}
