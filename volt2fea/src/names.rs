//! Turning VOLT names into feature file identifiers.

use std::collections::{HashMap, HashSet};

use smol_str::SmolStr;

const ESCAPE: char = '_';
const FILLER: char = '_';

/// Which kind of identifier a [`NameSanitizer`] produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    /// Lookup labels: letters, digits, `_`, `.` and `-`.
    Lookup,
    /// Glyph and mark class names: letters, digits, `_` and `.`.
    Class,
}

impl NameKind {
    fn allows(self, c: char) -> bool {
        match self {
            NameKind::Lookup => c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'),
            NameKind::Class => c.is_ascii_alphanumeric() || matches!(c, '_' | '.'),
        }
    }

    fn allows_start(self, c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }
}

/// Maps arbitrary names to unique, syntactically valid identifiers.
///
/// The same input always produces the same output, and two different inputs
/// never produce the same output.
#[derive(Clone, Debug)]
pub struct NameSanitizer {
    kind: NameKind,
    cache: HashMap<SmolStr, SmolStr>,
    emitted: HashSet<SmolStr>,
}

impl NameSanitizer {
    pub fn new(kind: NameKind) -> Self {
        NameSanitizer {
            kind,
            cache: Default::default(),
            emitted: Default::default(),
        }
    }

    pub fn kind(&self) -> NameKind {
        self.kind
    }

    /// Return the identifier for `name`, creating it on first use.
    pub fn sanitize(&mut self, name: &str) -> SmolStr {
        if let Some(existing) = self.cache.get(name) {
            return existing.clone();
        }
        let mut candidate = String::with_capacity(name.len() + 1);
        if !name.chars().next().is_some_and(|c| self.kind.allows_start(c)) {
            candidate.push(ESCAPE);
        }
        candidate.extend(
            name.chars()
                .map(|c| if self.kind.allows(c) { c } else { FILLER }),
        );
        while self.emitted.contains(candidate.as_str()) {
            candidate.push(FILLER);
        }
        let result = SmolStr::new(candidate);
        self.emitted.insert(result.clone());
        self.cache.insert(name.into(), result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::legal(NameKind::Lookup, "kern_1", "kern_1")]
    #[case::space(NameKind::Lookup, "Test Lookup", "Test_Lookup")]
    #[case::lookup_hyphen(NameKind::Lookup, "Test-Lookup", "Test-Lookup")]
    #[case::class_hyphen(NameKind::Class, "KERN-lc", "KERN_lc")]
    #[case::leading_digit(NameKind::Class, "1st", "_1st")]
    #[case::leading_period(NameKind::Lookup, ".hidden", "_.hidden")]
    #[case::non_ascii(NameKind::Class, "élan", "__lan")]
    #[case::empty(NameKind::Lookup, "", "_")]
    fn sanitize(#[case] kind: NameKind, #[case] input: &str, #[case] expected: &str) {
        let mut names = NameSanitizer::new(kind);
        assert_eq!(names.sanitize(input), expected);
    }

    #[test]
    fn repeated_lookups_are_stable() {
        let mut names = NameSanitizer::new(NameKind::Class);
        let first = names.sanitize("aaccented glyphs");
        let second = names.sanitize("aaccented glyphs");
        assert_eq!(first, second);
        assert_eq!(first, "aaccented_glyphs");
    }

    #[test]
    fn collisions_get_filler() {
        let mut names = NameSanitizer::new(NameKind::Class);
        assert_eq!(names.sanitize("aaccented glyphs"), "aaccented_glyphs");
        assert_eq!(names.sanitize("aaccented+glyphs"), "aaccented_glyphs_");
        assert_eq!(names.sanitize("aaccented/glyphs"), "aaccented_glyphs__");
        // a legal name that happens to equal an earlier result
        assert_eq!(names.sanitize("aaccented_glyphs_"), "aaccented_glyphs___");
    }

    #[test]
    fn outputs_are_unique() {
        let inputs = ["a b", "a-b", "a+b", "a_b", "a.b", "a b ", "a  b"];
        let mut names = NameSanitizer::new(NameKind::Class);
        let outputs = inputs
            .iter()
            .map(|input| names.sanitize(input))
            .collect::<HashSet<_>>();
        assert_eq!(outputs.len(), inputs.len());
    }
}
