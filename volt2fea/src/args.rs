//! Command line arguments

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::Options;

/// Convert a VOLT project, or a font that carries one, to a feature file.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, long_about = None)]
pub struct Args {
    /// A font with a TSIV table, or a VOLT project (.vtp) file
    pub input: PathBuf,

    /// Where to write the feature file
    pub output: PathBuf,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Skip constructs that cannot be converted, with a warning, instead of failing.
    #[arg(long)]
    pub permissive: bool,

    /// Split pair positioning lookups so no subtable holds more than this many pairs
    #[arg(long)]
    pub max_pairs: Option<usize>,
}

impl Args {
    /// Collect the conversion settings into an [`Options`] object.
    pub fn options(&self) -> Options {
        let mut options = Options::default();
        if self.permissive {
            options = options.permissive();
        }
        if let Some(max) = self.max_pairs {
            options = options.with_max_pairs_per_subtable(max);
        }
        options
    }

    /// The level logging defaults to when `RUST_LOG` is not set.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Warn
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["volt2fea", "font.ttf", "out.fea"]);
        assert_eq!(args.options(), Options::default());
        assert_eq!(args.log_level(), LevelFilter::Warn);
    }

    #[test]
    fn all_flags() {
        let args = Args::parse_from([
            "volt2fea",
            "-q",
            "--permissive",
            "--max-pairs",
            "1000",
            "font.vtp",
            "out.fea",
        ]);
        assert_eq!(args.log_level(), LevelFilter::Error);
        assert_eq!(
            args.options(),
            Options::default()
                .permissive()
                .with_max_pairs_per_subtable(1000)
        );
    }
}
