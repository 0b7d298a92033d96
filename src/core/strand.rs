//! The strand upon which an interval or locus is located.

use std::io;
use std::str::FromStr;

/// An error related to the parsing of a strand.
#[derive(Debug)]
pub struct ParseStrandError(io::Error);

impl std::fmt::Display for ParseStrandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse strand error: {}", self.0)
    }
}

impl std::error::Error for ParseStrandError {}

/// The strand of a genomic interval or locus.
///
/// Designed regions frequently carry no strand information at all, so unlike
/// an alignment record, a strand here may be [`Strand::Unknown`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Strand {
    /// The forward strand (`+`).
    Forward,
    /// The reverse strand (`-`).
    Reverse,
    /// No strand information (`.`).
    #[default]
    Unknown,
}

impl Strand {
    /// Creates a [`Strand`] from a reverse-strand flag.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Strand;
    ///
    /// assert_eq!(Strand::from_reverse_flag(true), Strand::Reverse);
    /// assert_eq!(Strand::from_reverse_flag(false), Strand::Forward);
    /// ```
    pub fn from_reverse_flag(reverse: bool) -> Strand {
        if reverse {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    /// Indicates whether this strand is the reverse strand.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Strand;
    ///
    /// assert!(Strand::Reverse.is_reverse());
    /// assert!(!Strand::Forward.is_reverse());
    /// assert!(!Strand::Unknown.is_reverse());
    /// ```
    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

impl FromStr for Strand {
    type Err = ParseStrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Self::Forward),
            "-" => Ok(Self::Reverse),
            "." => Ok(Self::Unknown),
            c => Err(ParseStrandError(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not a valid strand", c),
            ))),
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
            Strand::Unknown => write!(f, "."),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_strand_from_str() -> Result<(), Box<dyn std::error::Error>> {
        let strand: Strand = "+".parse()?;
        assert_eq!(strand, Strand::Forward);

        let strand: Strand = "-".parse()?;
        assert_eq!(strand, Strand::Reverse);

        let strand: Strand = ".".parse()?;
        assert_eq!(strand, Strand::Unknown);

        let err = "?".parse::<Strand>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse strand error: ? is not a valid strand"
        );

        Ok(())
    }

    #[test]
    fn test_strand_display() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(Strand::Forward.to_string(), "+");
        assert_eq!(Strand::Reverse.to_string(), "-");
        assert_eq!(Strand::Unknown.to_string(), ".");
        Ok(())
    }
}
