//! Ranking and acceptance of candidate primer pairs.
//!
//! Candidate pairs are filtered through a configured [`Limits`] map and
//! totally ordered by their composite sort keys; the first pair that
//! passes its limits after sorting is the selected design.

use std::collections::BTreeMap;

use crate::pair;
use crate::pair::PrimerPair;

/// An error related to pair selection.
#[derive(Debug)]
pub enum Error {
    /// An unrecognized criterion name.
    UnknownCriterion(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnknownCriterion(name) => {
                write!(f, "unknown selection criterion: {}", name)
            }
        }
    }
}

impl std::error::Error for Error {}

/// A named scoring criterion of a primer pair.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Criterion {
    /// The number of predicted amplicons within the plausible size range.
    Amplicons,
    /// Variants in the extension-critical 3' region of either primer.
    CriticalSnps,
    /// Extra binding sites beyond the intended one.
    Mispriming,
    /// Total variant count across both primers.
    SnpCount,
    /// The design-tool rank.
    DesignRank,
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criterion::Amplicons => write!(f, "amplicons"),
            Criterion::CriticalSnps => write!(f, "criticalsnp"),
            Criterion::Mispriming => write!(f, "mispriming"),
            Criterion::SnpCount => write!(f, "snpcount"),
            Criterion::DesignRank => write!(f, "designrank"),
        }
    }
}

impl std::str::FromStr for Criterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amplicons" => Ok(Criterion::Amplicons),
            "criticalsnp" => Ok(Criterion::CriticalSnps),
            "mispriming" => Ok(Criterion::Mispriming),
            "snpcount" => Ok(Criterion::SnpCount),
            "designrank" => Ok(Criterion::DesignRank),
            _ => Err(Error::UnknownCriterion(s.to_string())),
        }
    }
}

/// A map from criterion to the highest acceptable value.
pub type Limits = BTreeMap<Criterion, u64>;

/// Selects the best acceptable pair among candidates.
///
/// All pairs are ordered by their composite sort keys (ties broken by the
/// original position, so the result is deterministic) and the index of the
/// first pair passing its [`Limits`] is returned. Computing a sort key may
/// auto-reverse a pair, so candidates are taken mutably.
///
/// # Examples
///
/// ```
/// use primercheck::selection;
/// use primercheck::selection::Limits;
///
/// let mut pairs = Vec::new();
/// assert_eq!(selection::select(&mut pairs, &Limits::new())?, None);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn select(
    pairs: &mut [PrimerPair],
    limits: &Limits,
) -> Result<Option<usize>, pair::Error> {
    let mut keyed = Vec::with_capacity(pairs.len());

    for (index, pair) in pairs.iter_mut().enumerate() {
        keyed.push((pair.sort_key()?, index));
    }

    keyed.sort();

    for (_, index) in keyed {
        if pairs[index].check(limits)? {
            tracing::debug!(pair = %pairs[index].name(), "selected");
            return Ok(Some(index));
        }
    }

    Ok(None)
}
