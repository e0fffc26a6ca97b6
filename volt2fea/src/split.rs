//! Limiting the size of pair positioning subtables.
//!
//! A pair lookup with more pairs than allowed is cut into pieces named
//! `name`, `name\2`, `name\3`, ... which the assembler merges back into one
//! lookup with a subtable break between each piece.

use std::ops::Range;

use smol_str::SmolStr;

/// Separates a lookup's base name from its piece number.
pub(crate) const PIECE_SEPARATOR: char = '\\';

/// Identifies a lookup, and which subtable piece of its base lookup it is.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupId {
    pub base: SmolStr,
    /// The one-based piece number, for lookups that are subtable pieces.
    pub piece: Option<u32>,
}

impl LookupId {
    /// Recognise VOLT's `name\N` subtable convention.
    pub fn parse(name: &str) -> Self {
        if let Some((base, piece)) = name.rsplit_once(PIECE_SEPARATOR) {
            if !base.is_empty() && !piece.is_empty() && piece.bytes().all(|b| b.is_ascii_digit())
            {
                if let Ok(piece) = piece.parse() {
                    return LookupId {
                        base: base.into(),
                        piece: Some(piece),
                    };
                }
            }
        }
        LookupId {
            base: name.into(),
            piece: None,
        }
    }

    pub fn is_piece(&self) -> bool {
        self.piece.is_some()
    }
}

/// The VOLT-style name of the piece at `index` (zero-based) of `base`.
pub(crate) fn piece_name(base: &str, index: usize) -> SmolStr {
    if index == 0 {
        base.into()
    } else {
        SmolStr::new(format!("{base}{PIECE_SEPARATOR}{}", index + 1))
    }
}

/// Cut a run of pairs, given the size of each, into consecutive pieces.
///
/// A new piece starts whenever adding the next pair would take the current
/// piece over `max`. A single pair larger than `max` gets a piece to itself.
pub(crate) fn partition(sizes: &[usize], max: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut current = 0;
    for (i, size) in sizes.iter().copied().enumerate() {
        if current > 0 && current + size > max {
            pieces.push(start..i);
            start = i;
            current = 0;
        }
        current += size;
    }
    if start < sizes.len() {
        pieces.push(start..sizes.len());
    }
    pieces
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("kern", "kern", None)]
    #[case("kern\\2", "kern", Some(2))]
    #[case("kern\\pairs\\10", "kern\\pairs", Some(10))]
    #[case("kern\\", "kern\\", None)]
    #[case("kern\\x2", "kern\\x2", None)]
    #[case("\\3", "\\3", None)]
    fn parse_lookup_id(#[case] name: &str, #[case] base: &str, #[case] piece: Option<u32>) {
        assert_eq!(
            LookupId::parse(name),
            LookupId {
                base: base.into(),
                piece
            }
        );
    }

    #[test]
    fn piece_names() {
        assert_eq!(piece_name("kern", 0), "kern");
        assert_eq!(piece_name("kern", 1), "kern\\2");
    }

    #[rstest]
    #[case(&[], 3, &[])]
    #[case(&[1, 1, 1], 3, &[0..3])]
    #[case(&[1, 1, 1, 1], 3, &[0..3, 3..4])]
    #[case(&[2, 2, 2], 3, &[0..1, 1..2, 2..3])]
    #[case(&[5, 1], 3, &[0..1, 1..2])]
    #[case(&[1, 5], 3, &[0..1, 1..2])]
    fn partition_pairs(
        #[case] sizes: &[usize],
        #[case] max: usize,
        #[case] expected: &[Range<usize>],
    ) {
        assert_eq!(partition(sizes, max), expected);
    }
}
