//! Conversion options

/// Options controlling a conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Abort on source constructs we cannot translate.
    ///
    /// When `false` such constructs are logged (once per kind) and skipped.
    pub strict: bool,
    /// Split pair positioning lookups so that no subtable holds more pairs than this.
    pub max_pairs_per_subtable: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            strict: true,
            max_pairs_per_subtable: None,
        }
    }
}

impl Options {
    pub fn permissive(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn with_max_pairs_per_subtable(mut self, max: usize) -> Self {
        self.max_pairs_per_subtable = Some(max);
        self
    }
}
