//! An ordered pair of primers forming a designable and reportable unit.
//!
//! A [`PrimerPair`] holds shared handles to its primers rather than owning
//! them, since the same primer is typically referenced both by the design
//! result set and by the pair built from it. The pair aggregates the
//! evidence attached to its members into the scoring surface used for
//! ranking and acceptance: predicted amplicons, mispriming counts, variant
//! counts, and the design-tool rank.

use std::cell::Ref;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use sha1::Digest as _;
use sha1::Sha1;

use crate::core::Interval;
use crate::core::Locus;
use crate::core::Strand;
use crate::primer::Primer;
use crate::selection::Criterion;
use crate::selection::Limits;

/// A shared, non-owning handle to a primer.
pub type SharedPrimer = Rc<RefCell<Primer>>;

/// The number of primer slots a pair holds by default.
pub const DEFAULT_CAPACITY: usize = 2;

/// The amplicon size range used for ranking: anything longer is not
/// considered a plausible amplification product.
pub const DEFAULT_SIZE_RANGE: (u64, u64) = (0, 10_000);

/// An error related to a primer pair.
#[derive(Debug)]
pub enum Error {
    /// A mutation would have exceeded the pair's fixed capacity. The pair
    /// is unchanged.
    CapacityExceeded(usize),
    /// An aggregate score was requested for a pair that does not hold two
    /// primers.
    IncompletePair(String),
    /// The two primers carry different design-tool ranks.
    RankMismatch(i32, i32),
    /// No integer rank could be extracted from a primer name.
    RankParse(String),
    /// The pair name does not end with the rank suffix shared by its
    /// primer names.
    MissingRankSuffix(String, String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CapacityExceeded(capacity) => {
                write!(f, "pair capacity of {} primers exceeded", capacity)
            }
            Error::IncompletePair(name) => {
                write!(f, "pair {} does not hold two primers", name)
            }
            Error::RankMismatch(first, second) => {
                write!(f, "primer ranks disagree: {} versus {}", first, second)
            }
            Error::RankParse(name) => {
                write!(f, "no rank could be parsed from primer name {}", name)
            }
            Error::MissingRankSuffix(name, suffix) => {
                write!(f, "pair name {} does not end with rank suffix {}", name, suffix)
            }
        }
    }
}

impl std::error::Error for Error {}

/// One predicted amplification product: a mapped locus of each primer on
/// the same contig and the genomic interval they span.
#[derive(Clone, Debug)]
pub struct Amplicon {
    /// The forward primer's mapped locus.
    forward: Locus,
    /// The reverse primer's mapped locus.
    reverse: Locus,
    /// The interval spanned by the product.
    span: Interval,
}

impl Amplicon {
    /// Gets the forward primer's mapped locus.
    pub fn forward(&self) -> &Locus {
        &self.forward
    }

    /// Gets the reverse primer's mapped locus.
    pub fn reverse(&self) -> &Locus {
        &self.reverse
    }

    /// Gets the interval spanned by the product.
    pub fn span(&self) -> &Interval {
        &self.span
    }
}

/// The composite ranking key of a pair.
///
/// Keys order lexicographically ascending, so a lower value on an earlier
/// axis always wins regardless of the later axes.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct SortKey {
    /// Amplicon count within [`DEFAULT_SIZE_RANGE`], minus one.
    ambiguity: i64,
    /// Variants in the extension-critical 3' third of either primer.
    critical_snps: u64,
    /// Extra binding sites beyond the intended one.
    mispriming: u64,
    /// Total variant count across both primers.
    snp_count: u64,
    /// The design-tool rank.
    design_rank: i32,
}

/// An ordered pair of primers.
#[derive(Clone, Debug)]
pub struct PrimerPair {
    /// The pair name.
    name: String,
    /// The primer slots, in 5' to 3' order on the forward strand. Either
    /// slot may be empty, so a primer's side survives a missing mate.
    primers: [Option<SharedPrimer>; DEFAULT_CAPACITY],
    /// Whether the slots have been flipped relative to the design output.
    reversed: bool,
    /// Variant annotations carried over from the input table.
    annotations: Vec<Interval>,
    /// Free-text comments for the report row.
    comments: String,
}

impl PrimerPair {
    /// Attempts to create a new [`PrimerPair`] with the default capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// use primercheck::pair::PrimerPair;
    /// use primercheck::primer::Primer;
    ///
    /// let left = Rc::new(RefCell::new(Primer::try_new(
    ///     "BRCA1_0_LEFT",
    ///     "ACGTACGTACGTACGTACGT",
    ///     None,
    ///     None,
    /// )?));
    ///
    /// let pair = PrimerPair::try_new("BRCA1_0", vec![left])?;
    /// assert_eq!(pair.name(), "BRCA1_0");
    /// assert_eq!(pair.len(), 1);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        name: impl Into<String>,
        primers: Vec<SharedPrimer>,
    ) -> Result<PrimerPair, Error> {
        if primers.len() > DEFAULT_CAPACITY {
            return Err(Error::CapacityExceeded(DEFAULT_CAPACITY));
        }

        let mut slots: [Option<SharedPrimer>; DEFAULT_CAPACITY] = Default::default();

        for (slot, primer) in slots.iter_mut().zip(primers) {
            *slot = Some(primer);
        }

        Ok(PrimerPair {
            name: name.into(),
            primers: slots,
            reversed: false,
            annotations: Vec::new(),
            comments: String::new(),
        })
    }

    /// Gets the pair name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the number of filled slots.
    pub fn len(&self) -> usize {
        self.primers.iter().flatten().count()
    }

    /// Indicates whether no slots are filled.
    pub fn is_empty(&self) -> bool {
        self.primers.iter().all(|slot| slot.is_none())
    }

    /// Gets the primer in the given slot, if filled.
    pub fn slot(&self, index: usize) -> Option<&SharedPrimer> {
        self.primers.get(index)?.as_ref()
    }

    /// Gets the slots in order.
    pub fn primers(&self) -> &[Option<SharedPrimer>] {
        &self.primers
    }

    /// Indicates whether the slots have been flipped relative to the
    /// design output.
    pub fn reversed(&self) -> bool {
        self.reversed
    }

    /// Gets the variant annotations carried over from the input table.
    pub fn annotations(&self) -> &[Interval] {
        &self.annotations
    }

    /// Adds a variant annotation from the input table.
    pub fn add_annotation(&mut self, annotation: Interval) {
        self.annotations.push(annotation);
    }

    /// Gets the free-text comments.
    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// Sets the free-text comments.
    pub fn set_comments(&mut self, comments: impl Into<String>) {
        self.comments = comments.into();
    }

    /// Appends a primer to the next free slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// use primercheck::pair::PrimerPair;
    /// use primercheck::primer::Primer;
    ///
    /// let primer = || {
    ///     Ok::<_, primercheck::primer::Error>(Rc::new(RefCell::new(Primer::try_new(
    ///         "p", "ACGT", None, None,
    ///     )?)))
    /// };
    ///
    /// let mut pair = PrimerPair::try_new("p", Vec::new())?;
    /// pair.append(primer()?)?;
    /// pair.append(primer()?)?;
    /// assert!(pair.append(primer()?).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn append(&mut self, primer: SharedPrimer) -> Result<(), Error> {
        let slot = self
            .primers
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(Error::CapacityExceeded(DEFAULT_CAPACITY))?;

        *slot = Some(primer);
        Ok(())
    }

    /// Places a primer into a specific slot, replacing any previous
    /// occupant. The slot index must be within capacity.
    pub fn set_slot(&mut self, index: usize, primer: SharedPrimer) -> Result<(), Error> {
        let slot = self
            .primers
            .get_mut(index)
            .ok_or(Error::CapacityExceeded(DEFAULT_CAPACITY))?;

        *slot = Some(primer);
        Ok(())
    }

    /// Inserts a primer at the given slot, shifting later occupants toward
    /// the end. Fails when the shift would push a primer out of the last
    /// slot.
    pub fn insert(&mut self, index: usize, primer: SharedPrimer) -> Result<(), Error> {
        let last_filled = self
            .primers
            .last()
            .map(|slot| slot.is_some())
            .unwrap_or(true);

        if index >= DEFAULT_CAPACITY || last_filled {
            return Err(Error::CapacityExceeded(DEFAULT_CAPACITY));
        }

        self.primers[index..].rotate_right(1);
        self.primers[index] = Some(primer);
        Ok(())
    }

    /// Appends several primers at once. The pair is unchanged when the
    /// batch would not fit.
    pub fn extend<I>(&mut self, primers: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = SharedPrimer>,
    {
        let primers = primers.into_iter().collect::<Vec<_>>();

        let free = self.primers.iter().filter(|slot| slot.is_none()).count();

        if primers.len() > free {
            return Err(Error::CapacityExceeded(DEFAULT_CAPACITY));
        }

        for primer in primers {
            self.append(primer)?;
        }

        Ok(())
    }

    /// Flips the slot order and the `reversed` flag.
    pub fn reverse(&mut self) {
        self.primers.reverse();
        self.reversed = !self.reversed;
    }

    /// Borrows both primers, failing when either slot is empty.
    fn both(&self) -> Result<(Ref<'_, Primer>, Ref<'_, Primer>), Error> {
        match &self.primers {
            [Some(first), Some(second)] => Ok((first.borrow(), second.borrow())),
            _ => Err(Error::IncompletePair(self.name.clone())),
        }
    }

    /// Predicts the amplification products within an inclusive size range.
    ///
    /// Every same-contig combination of a mapped locus of slot 0 with a
    /// mapped locus of slot 1 implies a product; those whose length falls
    /// within the range are kept. When nothing is kept and `auto_reverse`
    /// is set, the combinations are retried with the slots swapped; if the
    /// retry yields products, the pair is permanently reversed. This models
    /// primers whose 5'/3' roles were assigned oppositely to genomic
    /// strand.
    pub fn amplicons(
        &mut self,
        size_range: (u64, u64),
        auto_reverse: bool,
    ) -> Result<Vec<Amplicon>, Error> {
        let mut amplicons = self.oriented_amplicons(size_range, false)?;

        if amplicons.is_empty() && auto_reverse {
            amplicons = self.oriented_amplicons(size_range, true)?;

            if !amplicons.is_empty() {
                tracing::debug!(pair = %self.name, "reversing primer order");
                self.reverse();
            }
        }

        Ok(amplicons)
    }

    /// Predicts amplicons with the slots in their current or swapped order.
    fn oriented_amplicons(
        &self,
        size_range: (u64, u64),
        swapped: bool,
    ) -> Result<Vec<Amplicon>, Error> {
        let (first, second) = self.both()?;

        let (forward, reverse) = if swapped {
            (&second, &first)
        } else {
            (&first, &second)
        };

        let mut amplicons = Vec::new();

        for m in forward.loci() {
            for n in reverse.loci() {
                if m.contig() != n.contig() {
                    continue;
                }

                let length = n.end() as i64 - m.offset() as i64;

                if length < size_range.0 as i64 || length > size_range.1 as i64 {
                    continue;
                }

                // SAFETY: the length was checked against the non-negative
                // lower bound of the size range, so the span's start cannot
                // exceed its end.
                let span = Interval::try_new(
                    m.contig(),
                    m.offset(),
                    n.end(),
                    Some(self.name.clone()),
                    Strand::Unknown,
                )
                .unwrap();

                amplicons.push(Amplicon {
                    forward: m.clone(),
                    reverse: n.clone(),
                    span,
                });
            }
        }

        Ok(amplicons)
    }

    /// Counts the extra binding sites beyond the intended one: the larger
    /// of the two primers' mapped-locus counts, minus one, floored at zero.
    pub fn mispriming(&self) -> Result<u64, Error> {
        let (first, second) = self.both()?;

        Ok(first.loci().len().max(second.loci().len()).saturating_sub(1) as u64)
    }

    /// Counts variants in the extension-critical 3' region of either
    /// primer: variants of primer 0 in the 3'-most third of its length,
    /// plus variants of primer 1 whose span ends within the 3'-most third
    /// of its length.
    ///
    /// The thirds are compared as floats, so a variant sitting exactly on a
    /// non-integral boundary is resolved the same way the established
    /// pipeline resolves it.
    pub fn critical_snp_count(&self) -> Result<u64, Error> {
        let (first, second) = self.both()?;

        let first_len = first.len() as f64;
        let second_len = second.len() as f64;

        let in_first = first
            .variants()
            .iter()
            .filter(|variant| variant.offset() as f64 >= 2.0 * first_len / 3.0)
            .count();

        let in_second = second
            .variants()
            .iter()
            .filter(|variant| {
                (variant.offset() + variant.length() as i64) as f64 <= second_len / 3.0
            })
            .count();

        Ok((in_first + in_second) as u64)
    }

    /// Counts the variants across both primers.
    pub fn snp_count(&self) -> Result<u64, Error> {
        let (first, second) = self.both()?;

        Ok((first.variants().len() + second.variants().len()) as u64)
    }

    /// Gets the design-tool rank shared by both primers. A mismatch means
    /// the naming or ranking contract was broken upstream.
    pub fn design_rank(&self) -> Result<i32, Error> {
        let (first, second) = self.both()?;

        if first.rank() != second.rank() {
            return Err(Error::RankMismatch(first.rank(), second.rank()));
        }

        Ok(first.rank())
    }

    /// Computes the composite ranking key. May auto-reverse the pair while
    /// counting amplicons.
    pub fn sort_key(&mut self) -> Result<SortKey, Error> {
        let ambiguity = self.amplicons(DEFAULT_SIZE_RANGE, true)?.len() as i64 - 1;

        Ok(SortKey {
            ambiguity,
            critical_snps: self.critical_snp_count()?,
            mispriming: self.mispriming()?,
            snp_count: self.snp_count()?,
            design_rank: self.design_rank()?,
        })
    }

    /// Scores one named criterion.
    pub fn value(&mut self, criterion: Criterion) -> Result<i64, Error> {
        match criterion {
            Criterion::Amplicons => {
                Ok(self.amplicons(DEFAULT_SIZE_RANGE, true)?.len() as i64)
            }
            Criterion::CriticalSnps => Ok(self.critical_snp_count()? as i64),
            Criterion::Mispriming => Ok(self.mispriming()? as i64),
            Criterion::SnpCount => Ok(self.snp_count()? as i64),
            Criterion::DesignRank => Ok(self.design_rank()?.into()),
        }
    }

    /// Checks the pair against a limits map: every named criterion is
    /// scored and compared against its configured maximum, and any excess
    /// fails the pair.
    pub fn check(&mut self, limits: &Limits) -> Result<bool, Error> {
        for (criterion, max) in limits {
            let value = self.value(*criterion)?;

            if value > *max as i64 {
                tracing::debug!(
                    pair = %self.name,
                    criterion = %criterion,
                    value,
                    max,
                    "limit exceeded"
                );

                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Extracts the design-tool rank embedded in both primer names
    /// (`…_<rank>_LEFT|RIGHT`), assigns it to the primers, and splices the
    /// rank suffix out of the primer names.
    ///
    /// The two embedded ranks must agree and the pair name must end with
    /// `_<rank>`; either violation is a fatal naming-contract error. The
    /// pair's own name is refreshed from the primers' common prefix once
    /// the splice leaves it stale.
    pub fn prune_ranks(&mut self) -> Result<(), Error> {
        let (first_rank, second_rank) = {
            let (first, second) = self.both()?;
            (embedded_rank(first.name())?, embedded_rank(second.name())?)
        };

        if first_rank != second_rank {
            return Err(Error::RankMismatch(first_rank, second_rank));
        }

        let suffix = format!("_{}", first_rank);

        if !self.name.ends_with(&suffix) {
            return Err(Error::MissingRankSuffix(self.name.clone(), suffix));
        }

        let stem = &self.name[..self.name.len() - suffix.len()];

        for primer in self.primers.iter().flatten() {
            let mut primer = primer.borrow_mut();
            primer.set_rank(first_rank);

            let rest = primer
                .name()
                .get(self.name.len()..)
                .unwrap_or_default()
                .to_string();
            primer.set_name(format!("{}{}", stem, rest));
        }

        // The primer names no longer carry the rank suffix, so the pair
        // name is stale; fall back to their common prefix.
        let (first_name, second_name) = {
            let (first, second) = self.both()?;
            (first.name().to_string(), second.name().to_string())
        };

        if !first_name.contains(&self.name) || !second_name.contains(&self.name) {
            if let Some(prefix) = common_prefix(&first_name, &second_name) {
                self.name = prefix;
            }
        }

        Ok(())
    }

    /// Shortens the pair name to the longest common prefix of its two
    /// primer names, trimmed of trailing separators, adopted only when the
    /// result is no shorter than the current name. Returns human-readable
    /// change notifications instead of renaming silently.
    pub fn fix_name(&mut self) -> Result<Vec<String>, Error> {
        let (first_name, second_name) = {
            let (first, second) = self.both()?;
            (first.name().to_string(), second.name().to_string())
        };

        let shared = first_name
            .chars()
            .zip(second_name.chars())
            .take_while(|(a, b)| a == b)
            .count();

        let candidate = first_name
            .chars()
            .take(shared)
            .collect::<String>()
            .trim_end_matches(['_', '-'])
            .to_string();

        let mut messages = Vec::new();

        if candidate != self.name && candidate.len() >= self.name.len() {
            let message = format!("Renamed primer pair {} -> {}", self.name, candidate);
            tracing::info!("{}", message);
            messages.push(message);
            self.name = candidate;
        }

        Ok(messages)
    }

    /// Re-prefixes the pair and both primer names with a new name.
    pub fn rename(&mut self, new_name: &str) {
        let old_name = std::mem::replace(&mut self.name, new_name.to_string());

        for primer in self.primers.iter().flatten() {
            let mut primer = primer.borrow_mut();

            let rest = primer
                .name()
                .strip_prefix(&old_name)
                .map(|rest| rest.to_string());

            if let Some(rest) = rest {
                primer.set_name(format!("{}{}", new_name, rest));
            }
        }
    }

    /// Gets the distance between the primers' intended binding sites, or
    /// the full span including the primers themselves. [`None`] when either
    /// primer or target is missing.
    pub fn target_length(&self, include_primers: bool) -> Option<i64> {
        let (first, second) = self.both().ok()?;

        let first_target = first.target()?.clone();
        let second_target = second.target()?.clone();

        if include_primers {
            Some(second_target.end() as i64 - first_target.offset() as i64)
        } else {
            Some(second_target.offset() as i64 - first_target.end() as i64)
        }
    }

    /// Formats the primers' melting temperatures as an ascending
    /// `lo-hi` range.
    pub fn tm_range(&self) -> String {
        let mut temperatures = self
            .primers
            .iter()
            .flatten()
            .map(|primer| primer.borrow().melting_temperature())
            .collect::<Vec<_>>();

        temperatures.sort_by(|a, b| a.total_cmp(b));

        temperatures
            .iter()
            .map(|tm| format!("{:.1}", tm))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Computes a stable fingerprint of the pair: the SHA-1 hex digest of
    /// both tagged sequences.
    pub fn unique_id(&self) -> Result<String, Error> {
        let (first, second) = self.both()?;

        let fingerprint = format!(
            "{}-{},{}-{}",
            first.tag().unwrap_or("None"),
            first.sequence(),
            second.tag().unwrap_or("None"),
            second.sequence(),
        );

        let digest = Sha1::digest(fingerprint.as_bytes());

        Ok(digest.iter().fold(String::with_capacity(40), |mut hex, byte| {
            // SAFETY: writing to a [`String`] never fails.
            write!(hex, "{:02x}", byte).unwrap();
            hex
        }))
    }
}

impl PartialEq for PrimerPair {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PrimerPair {}

impl std::fmt::Display for PrimerPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let first = self.slot(0).map(|primer| primer.borrow());
        let second = self.slot(1).map(|primer| primer.borrow());

        let location = |primer: &Option<Ref<'_, Primer>>| {
            primer
                .as_ref()
                .and_then(|primer| primer.location())
                .map(|location| location.to_string())
                .unwrap_or_default()
        };

        let sequence = |primer: &Option<Ref<'_, Primer>>| {
            primer
                .as_ref()
                .map(|primer| {
                    format!("{}-{}", primer.tag().unwrap_or("None"), primer.sequence())
                })
                .unwrap_or_else(|| String::from("NO_SEQUENCE"))
        };

        let tm = |primer: &Option<Ref<'_, Primer>>| {
            primer
                .as_ref()
                .map(|primer| primer.melting_temperature())
                .unwrap_or_default()
        };

        let gc = |primer: &Option<Ref<'_, Primer>>| {
            primer
                .as_ref()
                .map(|primer| primer.gc_fraction())
                .unwrap_or_default()
        };

        let complete = first.is_some() && second.is_some();

        let target_contig = if complete {
            // SAFETY: both slots were just checked to be filled.
            first
                .as_ref()
                .unwrap()
                .target()
                .map(|target| target.contig().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let target_start = if complete {
            // SAFETY: both slots were just checked to be filled.
            first
                .as_ref()
                .unwrap()
                .target()
                .map(|target| target.end().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let target_end = if complete {
            // SAFETY: both slots were just checked to be filled.
            second
                .as_ref()
                .unwrap()
                .target()
                .map(|target| target.offset().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };

        write!(
            f,
            "{}\t{}\t{}\t{}\t{:.1}\t{:.1}\t{}\t{:.1}\t{:.1}\t{}\t{}\t{}\t{}",
            self.name,
            location(&first),
            location(&second),
            sequence(&first),
            tm(&first),
            gc(&first),
            sequence(&second),
            tm(&second),
            gc(&second),
            target_contig,
            target_start,
            target_end,
            self.comments,
        )
    }
}

/// Parses the rank embedded second from last in an underscore-delimited
/// primer name.
fn embedded_rank(name: &str) -> Result<i32, Error> {
    name.rsplit('_')
        .nth(1)
        .and_then(|token| token.parse::<i32>().ok())
        .ok_or_else(|| Error::RankParse(name.to_string()))
}

/// Finds the longest shared prefix of two names, trimmed of trailing
/// separators, requiring at least three shared characters.
fn common_prefix(left: &str, right: &str) -> Option<String> {
    let shared = left
        .chars()
        .zip(right.chars())
        .take_while(|(a, b)| a == b)
        .count();

    if shared < 3 {
        return None;
    }

    let prefix = left
        .chars()
        .take(shared)
        .collect::<String>()
        .trim_end_matches(['_', '-', ' '])
        .to_string();

    Some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primer::Check;
    use crate::primer::Policy;
    use crate::variant::store::MemoryStore;
    use crate::variant::Stores;

    fn shared(name: &str, sequence: &str, target: Option<Locus>) -> SharedPrimer {
        Rc::new(RefCell::new(
            Primer::try_new(name, sequence, target, None).unwrap(),
        ))
    }

    fn pair_with_loci(
        first_loci: &[(&str, u64)],
        second_loci: &[(&str, u64)],
    ) -> PrimerPair {
        let first = shared("p_0_LEFT", "ACGTACGTACGTACGTACGT", None);
        let second = shared("p_0_RIGHT", "ACGTACGTACGTACGTACGT", None);

        for (contig, position) in first_loci {
            first.borrow_mut().add_target(*contig, *position, false, None);
        }

        for (contig, position) in second_loci {
            second.borrow_mut().add_target(*contig, *position, true, None);
        }

        PrimerPair::try_new("p_0", vec![first, second]).unwrap()
    }

    #[test]
    fn test_append_to_a_full_pair_fails() -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = PrimerPair::try_new(
            "p",
            vec![shared("a", "ACGT", None), shared("b", "ACGT", None)],
        )?;

        let err = pair.append(shared("c", "ACGT", None)).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(2)));
        assert_eq!(pair.len(), 2);

        let err = pair.extend([shared("c", "ACGT", None)]).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(2)));

        Ok(())
    }

    #[test]
    fn test_set_slot_preserves_the_primer_side() -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = PrimerPair::try_new("p_0", Vec::new())?;
        pair.set_slot(1, shared("p_0_RIGHT", "ACGT", None))?;

        assert_eq!(pair.len(), 1);
        assert!(pair.slot(0).is_none());
        assert_eq!(pair.slot(1).unwrap().borrow().name(), "p_0_RIGHT");

        // Appending fills the first free slot, not the next index.
        pair.append(shared("p_0_LEFT", "ACGT", None))?;
        assert_eq!(pair.slot(0).unwrap().borrow().name(), "p_0_LEFT");

        Ok(())
    }

    #[test]
    fn test_insert_shifts_later_occupants() -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = PrimerPair::try_new("p", vec![shared("a", "ACGT", None)])?;
        pair.insert(0, shared("b", "ACGT", None))?;

        assert_eq!(pair.slot(0).unwrap().borrow().name(), "b");
        assert_eq!(pair.slot(1).unwrap().borrow().name(), "a");

        let err = pair.insert(0, shared("c", "ACGT", None)).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(2)));

        Ok(())
    }

    #[test]
    fn test_extend_is_rejected_whole_when_the_batch_does_not_fit()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = PrimerPair::try_new("p", vec![shared("a", "ACGT", None)])?;

        let batch = vec![shared("b", "ACGT", None), shared("c", "ACGT", None)];
        assert!(pair.extend(batch).is_err());
        assert_eq!(pair.len(), 1);

        Ok(())
    }

    #[test]
    fn test_amplicons_spans_the_two_loci() -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = pair_with_loci(&[("1", 100)], &[("1", 300)]);

        let amplicons = pair.amplicons(DEFAULT_SIZE_RANGE, false)?;
        assert_eq!(amplicons.len(), 1);
        assert_eq!(amplicons[0].span().start(), 100);
        assert_eq!(amplicons[0].span().end(), 320);
        assert_eq!(amplicons[0].span().name(), "p_0");

        Ok(())
    }

    #[test]
    fn test_amplicons_honor_the_size_range() -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = pair_with_loci(&[("1", 100)], &[("1", 300)]);

        // Product length is 220; both bounds are inclusive.
        assert_eq!(pair.amplicons((220, 220), false)?.len(), 1);
        assert_eq!(pair.amplicons((0, 219), false)?.len(), 0);
        assert_eq!(pair.amplicons((221, 10_000), false)?.len(), 0);

        Ok(())
    }

    #[test]
    fn test_amplicons_ignore_cross_contig_combinations()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = pair_with_loci(&[("1", 100)], &[("2", 300)]);
        assert!(pair.amplicons(DEFAULT_SIZE_RANGE, false)?.is_empty());

        Ok(())
    }

    #[test]
    fn test_auto_reverse_permanently_flips_the_pair()
    -> Result<(), Box<dyn std::error::Error>> {
        // Only the swapped orientation yields a product.
        let mut pair = pair_with_loci(&[("1", 300)], &[("1", 100)]);

        assert!(pair.amplicons(DEFAULT_SIZE_RANGE, false)?.is_empty());
        assert!(!pair.reversed());

        let amplicons = pair.amplicons(DEFAULT_SIZE_RANGE, true)?;
        assert_eq!(amplicons.len(), 1);
        assert!(pair.reversed());
        assert_eq!(pair.slot(0).unwrap().borrow().name(), "p_0_RIGHT");

        Ok(())
    }

    #[test]
    fn test_mispriming_counts_extra_binding_sites()
    -> Result<(), Box<dyn std::error::Error>> {
        let pair = pair_with_loci(&[("1", 100)], &[("1", 300)]);
        assert_eq!(pair.mispriming()?, 0);

        let pair = pair_with_loci(&[("1", 100), ("2", 50), ("3", 70)], &[("1", 300)]);
        assert_eq!(pair.mispriming()?, 2);

        let pair = pair_with_loci(&[], &[]);
        assert_eq!(pair.mispriming()?, 0);

        Ok(())
    }

    #[test]
    fn test_critical_snp_count_uses_the_three_prime_thirds()
    -> Result<(), Box<dyn std::error::Error>> {
        // Both primers are 20 bases, so the first primer's critical region
        // starts at fractional offset 13.33 and the second primer's ends at
        // fractional offset 6.67.
        let first = shared(
            "p_0_LEFT",
            "ACGTACGTACGTACGTACGT",
            Some(Locus::new("1", 100, 20, Strand::Forward, None)),
        );
        let second = shared(
            "p_0_RIGHT",
            "ACGTACGTACGTACGTACGT",
            Some(Locus::new("1", 300, 20, Strand::Reverse, None)),
        );

        let mut stores = Stores::new();
        stores.insert(
            "common",
            Box::new(MemoryStore::from_lines([
                // Relative offset 14 for the first primer: critical.
                "1\t115\trs1\tA\tT\t.\t.\tAF=0.01",
                // Relative offset 13: just below the boundary.
                "1\t114\trs2\tA\tT\t.\t.\tAF=0.01",
                // Relative offset 5, length 1, for the second primer:
                // 5 + 1 <= 6.67, critical.
                "1\t306\trs3\tA\tT\t.\t.\tAF=0.01",
                // Relative offset 6, length 1: 7 > 6.67, not critical.
                "1\t307\trs4\tA\tT\t.\t.\tAF=0.01",
            ])?),
        );

        let policy = Policy::Single(Check::new("common", None));
        first.borrow_mut().snp_check(&policy, &mut stores)?;
        second.borrow_mut().snp_check(&policy, &mut stores)?;

        let pair = PrimerPair::try_new("p_0", vec![first, second])?;

        assert_eq!(pair.snp_count()?, 4);
        assert_eq!(pair.critical_snp_count()?, 2);

        Ok(())
    }

    #[test]
    fn test_design_rank_requires_matching_ranks()
    -> Result<(), Box<dyn std::error::Error>> {
        let pair = pair_with_loci(&[], &[]);
        assert_eq!(pair.design_rank()?, -1);

        let pair = pair_with_loci(&[], &[]);
        pair.slot(0).unwrap().borrow_mut().set_rank(3);
        let err = pair.design_rank().unwrap_err();
        assert!(matches!(err, Error::RankMismatch(3, -1)));

        Ok(())
    }

    #[test]
    fn test_sort_keys_order_lexicographically() {
        let better = SortKey {
            ambiguity: 0,
            critical_snps: 0,
            mispriming: 0,
            snp_count: 0,
            design_rank: 1,
        };

        let worse = SortKey {
            ambiguity: 0,
            critical_snps: 0,
            mispriming: 0,
            snp_count: 1,
            design_rank: 2,
        };

        assert!(better < worse);

        // An earlier axis dominates all later axes.
        let ambiguous = SortKey {
            ambiguity: 1,
            critical_snps: 0,
            mispriming: 0,
            snp_count: 0,
            design_rank: 0,
        };

        assert!(worse < ambiguous);
    }

    #[test]
    fn test_check_fails_on_any_exceeded_limit() -> Result<(), Box<dyn std::error::Error>> {
        let mut pair = pair_with_loci(&[("1", 100), ("2", 50)], &[("1", 300)]);

        let mut limits = Limits::new();
        limits.insert(Criterion::Mispriming, 1);
        assert!(pair.check(&limits)?);

        limits.insert(Criterion::Mispriming, 0);
        assert!(!pair.check(&limits)?);

        Ok(())
    }

    #[test]
    fn test_prune_ranks_strips_the_rank_suffix() -> Result<(), Box<dyn std::error::Error>> {
        let first = shared("BRCA1_3_LEFT", "ACGT", None);
        let second = shared("BRCA1_3_RIGHT", "ACGT", None);

        let mut pair = PrimerPair::try_new("BRCA1_3", vec![first, second])?;
        pair.prune_ranks()?;

        assert_eq!(pair.slot(0).unwrap().borrow().rank(), 3);
        assert_eq!(pair.slot(1).unwrap().borrow().rank(), 3);
        assert_eq!(pair.slot(0).unwrap().borrow().name(), "BRCA1_LEFT");
        assert_eq!(pair.slot(1).unwrap().borrow().name(), "BRCA1_RIGHT");
        assert_eq!(pair.name(), "BRCA1");

        Ok(())
    }

    #[test]
    fn test_prune_ranks_rejects_mismatched_ranks()
    -> Result<(), Box<dyn std::error::Error>> {
        let first = shared("BRCA1_3_LEFT", "ACGT", None);
        let second = shared("BRCA1_4_RIGHT", "ACGT", None);

        let mut pair = PrimerPair::try_new("BRCA1_3", vec![first, second])?;
        let err = pair.prune_ranks().unwrap_err();
        assert!(matches!(err, Error::RankMismatch(3, 4)));

        Ok(())
    }

    #[test]
    fn test_prune_ranks_rejects_an_unparseable_name()
    -> Result<(), Box<dyn std::error::Error>> {
        let first = shared("BRCA1_LEFT", "ACGT", None);
        let second = shared("BRCA1_RIGHT", "ACGT", None);

        let mut pair = PrimerPair::try_new("BRCA1", vec![first, second])?;
        let err = pair.prune_ranks().unwrap_err();
        assert!(matches!(err, Error::RankParse(_)));

        Ok(())
    }

    #[test]
    fn test_prune_ranks_requires_the_pair_name_suffix()
    -> Result<(), Box<dyn std::error::Error>> {
        let first = shared("BRCA1_3_LEFT", "ACGT", None);
        let second = shared("BRCA1_3_RIGHT", "ACGT", None);

        let mut pair = PrimerPair::try_new("BRCA1", vec![first, second])?;
        let err = pair.prune_ranks().unwrap_err();
        assert!(matches!(err, Error::MissingRankSuffix(_, _)));

        Ok(())
    }

    #[test]
    fn test_fix_name_adopts_a_longer_common_prefix()
    -> Result<(), Box<dyn std::error::Error>> {
        let first = shared("BRCA1_EX1_LEFT", "ACGT", None);
        let second = shared("BRCA1_EX1_RIGHT", "ACGT", None);

        let mut pair = PrimerPair::try_new("BRCA1", vec![first, second])?;
        let messages = pair.fix_name()?;

        assert_eq!(pair.name(), "BRCA1_EX1");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("BRCA1 -> BRCA1_EX1"));

        // A second pass changes nothing.
        assert!(pair.fix_name()?.is_empty());

        Ok(())
    }

    #[test]
    fn test_rename_reprefixes_the_primers() -> Result<(), Box<dyn std::error::Error>> {
        let first = shared("OLD_0_LEFT", "ACGT", None);
        let second = shared("OLD_0_RIGHT", "ACGT", None);

        let mut pair = PrimerPair::try_new("OLD", vec![first, second])?;
        pair.rename("NEW");

        assert_eq!(pair.name(), "NEW");
        assert_eq!(pair.slot(0).unwrap().borrow().name(), "NEW_0_LEFT");
        assert_eq!(pair.slot(1).unwrap().borrow().name(), "NEW_0_RIGHT");

        Ok(())
    }

    #[test]
    fn test_target_length_with_and_without_primers()
    -> Result<(), Box<dyn std::error::Error>> {
        let first = shared(
            "p_0_LEFT",
            "ACGTACGTACGTACGTACGT",
            Some(Locus::new("1", 100, 20, Strand::Forward, None)),
        );
        let second = shared(
            "p_0_RIGHT",
            "ACGTACGTACGTACGTACGT",
            Some(Locus::new("1", 300, 20, Strand::Reverse, None)),
        );

        let pair = PrimerPair::try_new("p_0", vec![first, second])?;

        assert_eq!(pair.target_length(false), Some(180));
        assert_eq!(pair.target_length(true), Some(220));

        let incomplete = PrimerPair::try_new("p", Vec::new())?;
        assert_eq!(incomplete.target_length(false), None);

        Ok(())
    }

    #[test]
    fn test_unique_id_is_a_stable_fingerprint() -> Result<(), Box<dyn std::error::Error>> {
        let pair = pair_with_loci(&[], &[]);
        let other = pair_with_loci(&[], &[]);

        let id = pair.unique_id()?;
        assert_eq!(id.len(), 40);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, other.unique_id()?);

        Ok(())
    }

    #[test]
    fn test_tm_range_is_ascending() -> Result<(), Box<dyn std::error::Error>> {
        let first = shared("a", "GCGCGCGCGCGCGCGCGCGC", None);
        let second = shared("b", "ATATATATATATATATATAT", None);

        let pair = PrimerPair::try_new("p", vec![first, second])?;
        let range = pair.tm_range();

        let (lo, hi) = range.split_once('-').unwrap();
        assert!(lo.parse::<f64>()? <= hi.parse::<f64>()?);

        Ok(())
    }
}
