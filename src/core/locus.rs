//! A stranded, positioned alignment hit of fixed length.

use std::cmp::Ordering;
use std::hash::Hash;
use std::hash::Hasher;

use crate::core::Strand;

/// One observed (or intended) genomic binding position of a primer sequence.
///
/// A locus is the unit produced by specificity alignment: each alignment of a
/// primer to the genome yields one locus with the alignment's heterodimer
/// melting temperature attached. Ordering is by `(contig, offset)`; equality
/// requires an exact match of the contig, offset, length, and strand. The
/// melting temperature is an observation about the alignment, not part of
/// the locus's identity, and is excluded from both equality and hashing.
#[derive(Clone, Debug)]
pub struct Locus {
    /// The contig upon which the locus is located.
    contig: String,
    /// The 0-based position of the 5'-most aligned base.
    offset: u64,
    /// The length of the alignment.
    length: u64,
    /// The strand upon which the locus is located.
    strand: Strand,
    /// The melting temperature of the alignment, if computed.
    melting_temperature: Option<f64>,
}

impl Locus {
    /// Creates a new [`Locus`].
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Locus;
    /// use primercheck::core::Strand;
    ///
    /// let locus = Locus::new("chr1", 100, 20, Strand::Forward, Some(61.2));
    /// assert_eq!(locus.contig(), "chr1");
    /// assert_eq!(locus.offset(), 100);
    /// assert_eq!(locus.end(), 120);
    /// ```
    pub fn new(
        contig: impl Into<String>,
        offset: u64,
        length: u64,
        strand: Strand,
        melting_temperature: Option<f64>,
    ) -> Locus {
        Locus {
            contig: contig.into(),
            offset,
            length,
            strand,
            melting_temperature,
        }
    }

    /// Gets the contig upon which the locus is located.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Gets the 0-based position of the 5'-most aligned base.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Gets the length of the alignment.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Gets the position one past the last aligned base.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Gets the strand upon which the locus is located.
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Gets the melting temperature of the alignment, if computed.
    pub fn melting_temperature(&self) -> Option<f64> {
        self.melting_temperature
    }
}

impl PartialEq for Locus {
    fn eq(&self, other: &Self) -> bool {
        self.contig == other.contig
            && self.offset == other.offset
            && self.length == other.length
            && self.strand == other.strand
    }
}

impl Eq for Locus {}

impl PartialOrd for Locus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Locus {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.contig, self.offset).cmp(&(&other.contig, other.offset))
    }
}

impl Hash for Locus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.contig.hash(state);
        self.offset.hash(state);
        self.length.hash(state);
        self.strand.hash(state);
    }
}

impl std::fmt::Display for Locus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.contig, self.offset, self.strand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_excludes_the_melting_temperature() {
        let a = Locus::new("chr1", 100, 20, Strand::Forward, Some(61.2));
        let b = Locus::new("chr1", 100, 20, Strand::Forward, None);

        assert_eq!(a, b);
        assert_ne!(a, Locus::new("chr1", 100, 21, Strand::Forward, Some(61.2)));
        assert_ne!(a, Locus::new("chr1", 100, 20, Strand::Reverse, Some(61.2)));
    }

    #[test]
    fn test_ordering_is_by_contig_then_offset() {
        let mut loci = vec![
            Locus::new("chr2", 50, 20, Strand::Forward, None),
            Locus::new("chr1", 500, 20, Strand::Forward, None),
            Locus::new("chr1", 100, 20, Strand::Forward, None),
        ];

        loci.sort();

        assert_eq!(loci[0].offset(), 100);
        assert_eq!(loci[1].offset(), 500);
        assert_eq!(loci[2].contig(), "chr2");
    }

    #[test]
    fn test_display() {
        let locus = Locus::new("chr1", 100, 20, Strand::Reverse, None);
        assert_eq!(locus.to_string(), "chr1:100:-");
    }
}
