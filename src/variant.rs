//! Known genetic variation overlapping a locus.
//!
//! A primer that straddles a common variant can silently fail in the samples
//! that carry it, so every candidate primer's intended binding site is
//! checked against one or more variant stores. This module holds the
//! [`Variant`] record produced by those checks and the two query modes the
//! engine supports:
//!
//! - [`overlapping()`] returns every variant overlapping a locus.
//! - [`frequency_filtered()`] additionally classifies each variant by its
//!   population allele frequency, splitting out "outliers" whose frequency
//!   exceeds a configured cutoff and therefore disqualify the primer.
//!
//! Raw store records are whitespace-delimited lines in the standard
//! variant-call text layout (`CHROM POS ID REF ALT ... INFO`), with 1-based
//! positions. The engine converts positions to 0-based offsets relative to
//! the queried locus's start, which is the coordinate system every
//! downstream scoring rule (e.g., 3'-proximity) operates in.

pub mod store;

use std::hash::Hash;
use std::hash::Hasher;

use crate::core::Locus;

pub use store::Stores;
pub use store::VariantStore;

/// An error related to a variant query.
#[derive(Debug)]
pub enum Error {
    /// A store error.
    Store(store::Error),
    /// A raw record did not have the expected column layout.
    MalformedRecord(String),
    /// A raw record's `INFO` field carried no `AF` key while a frequency
    /// cutoff was in force. The store is assumed to be frequency-annotated,
    /// so this is a broken data contract, not an acceptable gap.
    MissingAlleleFrequency(String),
    /// A raw record's `AF` value could not be parsed as a decimal fraction.
    InvalidAlleleFrequency(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Store(err) => write!(f, "store error: {}", err),
            Error::MalformedRecord(line) => write!(f, "malformed variant record: {}", line),
            Error::MissingAlleleFrequency(id) => {
                write!(f, "variant record {} carries no AF annotation", id)
            }
            Error::InvalidAlleleFrequency(value) => {
                write!(f, "invalid allele frequency: {}", value)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<store::Error> for Error {
    fn from(err: store::Error) -> Self {
        Error::Store(err)
    }
}

/// A variant record overlapping a queried locus.
///
/// The offset is 0-based and relative to the queried locus's start; it may
/// be negative when the variant starts upstream of the locus but overlaps
/// it. The length is the maximum length over the reference allele and all
/// listed alternate alleles. Equality and hashing are over
/// `(contig, offset, length, id)`; the allele frequency is an annotation,
/// not part of the variant's identity.
#[derive(Clone, Debug)]
pub struct Variant {
    /// The contig upon which the variant is located.
    contig: String,
    /// The 0-based offset relative to the queried locus's start.
    offset: i64,
    /// The maximum allele length.
    length: u64,
    /// The variant identifier (e.g., an rsID).
    id: String,
    /// The population allele frequency, when queried in frequency-filtered
    /// mode.
    allele_frequency: Option<f64>,
}

impl Variant {
    /// Parses a [`Variant`] from a raw store line, relativizing the record's
    /// 1-based position against the queried locus's start.
    ///
    /// When `require_frequency` is set, the record's `INFO` field must carry
    /// an `AF` key.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::variant::Variant;
    ///
    /// let line = "1\t151\trs42\tA\tAT,ACT\t.\t.\tAC=5;AF=0.30";
    /// let variant = Variant::try_from_line(line, 140, false)?;
    ///
    /// assert_eq!(variant.contig(), "1");
    /// assert_eq!(variant.offset(), 10);
    /// assert_eq!(variant.length(), 3);
    /// assert_eq!(variant.id(), "rs42");
    /// assert_eq!(variant.allele_frequency(), None);
    ///
    /// let variant = Variant::try_from_line(line, 140, true)?;
    /// assert_eq!(variant.allele_frequency(), Some(0.30));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_from_line(
        line: &str,
        locus_offset: u64,
        require_frequency: bool,
    ) -> Result<Variant, Error> {
        let fields = line.split_whitespace().collect::<Vec<_>>();

        if fields.len() < 5 {
            return Err(Error::MalformedRecord(line.to_string()));
        }

        let position = fields[1]
            .parse::<i64>()
            .map_err(|_| Error::MalformedRecord(line.to_string()))?;

        // Source positions are 1-based; engine offsets are 0-based and
        // relative to the locus start.
        let offset = (position - 1) - locus_offset as i64;

        let length = std::iter::once(fields[3])
            .chain(fields[4].split(','))
            .map(|allele| allele.len() as u64)
            .max()
            // SAFETY: the iterator always contains the reference allele.
            .unwrap();

        let allele_frequency = if require_frequency {
            let info = fields
                .get(7)
                .ok_or_else(|| Error::MalformedRecord(line.to_string()))?;

            let value = info
                .split(';')
                .filter_map(|entry| entry.split_once('='))
                .find(|(key, _)| *key == "AF")
                .map(|(_, value)| value)
                .ok_or_else(|| Error::MissingAlleleFrequency(fields[2].to_string()))?;

            Some(
                value
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidAlleleFrequency(value.to_string()))?,
            )
        } else {
            None
        };

        Ok(Variant {
            contig: fields[0].to_string(),
            offset,
            length,
            id: fields[2].to_string(),
            allele_frequency,
        })
    }

    /// Gets the contig upon which the variant is located.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Gets the 0-based offset relative to the queried locus's start.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Gets the maximum allele length.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Gets the variant identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the population allele frequency, when queried in
    /// frequency-filtered mode.
    pub fn allele_frequency(&self) -> Option<f64> {
        self.allele_frequency
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        (&self.contig, self.offset, self.length, &self.id)
            == (&other.contig, other.offset, other.length, &other.id)
    }
}

impl Eq for Variant {}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.contig.hash(state);
        self.offset.hash(state);
        self.length.hash(state);
        self.id.hash(state);
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}+{} ({})", self.id, self.contig, self.offset, self.length)
    }
}

/// Queries a store for every variant overlapping a locus.
///
/// An unknown contig is not an error: the store simply has no data for that
/// target and the result is empty.
///
/// # Examples
///
/// ```
/// use primercheck::core::Locus;
/// use primercheck::core::Strand;
/// use primercheck::variant;
/// use primercheck::variant::store::MemoryStore;
///
/// let mut store = MemoryStore::from_lines([
///     "1\t151\trs42\tA\tT\t.\t.\tAF=0.30",
/// ])?;
///
/// let locus = Locus::new("1", 140, 20, Strand::Forward, None);
/// let variants = variant::overlapping(&mut store, &locus)?;
///
/// assert_eq!(variants.len(), 1);
/// assert_eq!(variants[0].offset(), 10);
///
/// let elsewhere = Locus::new("unknown", 140, 20, Strand::Forward, None);
/// assert!(variant::overlapping(&mut store, &elsewhere)?.is_empty());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn overlapping(
    store: &mut dyn VariantStore,
    locus: &Locus,
) -> Result<Vec<Variant>, Error> {
    store
        .query(locus.contig(), locus.offset(), locus.end())?
        .iter()
        .map(|line| Variant::try_from_line(line, locus.offset(), false))
        .collect()
}

/// Queries a store for every variant overlapping a locus and classifies
/// each by its allele frequency.
///
/// The cutoff is a percentage in `0..=100`. Returns `(all, outliers)` where
/// the outliers are the records whose allele frequency exceeds
/// `cutoff / 100`; a primer whose binding site carries an outlier is
/// disqualified by the caller. Every record must carry an `AF` annotation.
///
/// # Examples
///
/// ```
/// use primercheck::core::Locus;
/// use primercheck::core::Strand;
/// use primercheck::variant;
/// use primercheck::variant::store::MemoryStore;
///
/// let mut store = MemoryStore::from_lines([
///     "1\t151\trs42\tA\tT\t.\t.\tAF=0.30",
/// ])?;
/// let locus = Locus::new("1", 140, 20, Strand::Forward, None);
///
/// let (all, outliers) = variant::frequency_filtered(&mut store, &locus, 20.0)?;
/// assert_eq!(all.len(), 1);
/// assert_eq!(outliers.len(), 1);
///
/// let (all, outliers) = variant::frequency_filtered(&mut store, &locus, 40.0)?;
/// assert_eq!(all.len(), 1);
/// assert!(outliers.is_empty());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn frequency_filtered(
    store: &mut dyn VariantStore,
    locus: &Locus,
    cutoff_percent: f64,
) -> Result<(Vec<Variant>, Vec<Variant>), Error> {
    let cutoff = cutoff_percent / 100.0;

    let mut all = Vec::new();
    let mut outliers = Vec::new();

    for line in store.query(locus.contig(), locus.offset(), locus.end())? {
        let variant = Variant::try_from_line(&line, locus.offset(), true)?;

        // SAFETY: `try_from_line` with `require_frequency` always populates
        // the allele frequency.
        let frequency = variant.allele_frequency().unwrap();

        if frequency > cutoff {
            tracing::debug!(%variant, frequency, cutoff, "rejected high-frequency variant");
            outliers.push(variant.clone());
        } else {
            tracing::debug!(%variant, frequency, cutoff, "accepted variant");
        }

        all.push(variant);
    }

    Ok((all, outliers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Strand;
    use crate::variant::store::MemoryStore;

    #[test]
    fn test_offsets_are_relative_and_may_be_negative() -> Result<(), Box<dyn std::error::Error>> {
        // Deletion starting upstream of the locus, overlapping its start.
        let mut store = MemoryStore::from_lines(["1\t96\trs1\tAAAAAAAAAA\tA\t.\t.\tAF=0.01"])?;
        let locus = Locus::new("1", 100, 20, Strand::Forward, None);

        let variants = overlapping(&mut store, &locus)?;
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].offset(), -5);
        assert_eq!(variants[0].length(), 10);

        Ok(())
    }

    #[test]
    fn test_empty_store_yields_no_variants() -> Result<(), Box<dyn std::error::Error>> {
        let mut store = MemoryStore::from_lines(Vec::<String>::new())?;
        let locus = Locus::new("1", 100, 20, Strand::Forward, None);

        assert!(overlapping(&mut store, &locus)?.is_empty());

        Ok(())
    }

    #[test]
    fn test_frequency_classification_against_the_cutoff()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut store = MemoryStore::from_lines(["1\t105\trs42\tA\tT\t.\t.\tAC=5;AF=0.30"])?;
        let locus = Locus::new("1", 100, 20, Strand::Forward, None);

        let (all, outliers) = frequency_filtered(&mut store, &locus, 20.0)?;
        assert_eq!(all.len(), 1);
        assert_eq!(outliers, all);

        let (all, outliers) = frequency_filtered(&mut store, &locus, 40.0)?;
        assert_eq!(all.len(), 1);
        assert!(outliers.is_empty());

        Ok(())
    }

    #[test]
    fn test_missing_af_is_fatal_in_frequency_mode() -> Result<(), Box<dyn std::error::Error>> {
        let mut store = MemoryStore::from_lines(["1\t105\trs42\tA\tT\t.\t.\tAC=5"])?;
        let locus = Locus::new("1", 100, 20, Strand::Forward, None);

        // Plain mode tolerates the missing annotation...
        assert_eq!(overlapping(&mut store, &locus)?.len(), 1);

        // ...frequency-filtered mode does not.
        let err = frequency_filtered(&mut store, &locus, 20.0).unwrap_err();
        assert!(matches!(err, Error::MissingAlleleFrequency(_)));

        Ok(())
    }

    #[test]
    fn test_malformed_records_are_fatal() {
        let err = Variant::try_from_line("1\t105", 100, false).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));

        let err = Variant::try_from_line("1\tnot-a-position\trs1\tA\tT", 100, false).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }
}
