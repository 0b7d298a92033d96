//! Ingest of aligner output into primer specificity evidence.
//!
//! Each primer's sequence is aligned genome-wide by an external short-read
//! aligner; the raw hits arrive here as [`Record`]s. A hit only counts as a
//! real potential binding site when the implied heterodimer is stable
//! enough and the extension-critical 3' end matches the reference exactly.
//! Kept hits become the primer's mapped loci; a primer that accumulates the
//! configured maximum is judged non-specific and loses its loci entirely.

use std::collections::HashMap;

use crate::pair::SharedPrimer;
use crate::thermo;

/// The default minimum heterodimer melting temperature for a hit to count.
pub const DEFAULT_TM_THRESHOLD: f64 = 50.0;

/// The default number of 3'-end bases that must match the reference
/// exactly.
pub const DEFAULT_END_MATCH: usize = 6;

/// The default locus count at which a primer is judged non-specific.
pub const DEFAULT_MAX_ALIGNMENTS: usize = 20;

/// One aligner hit for one primer.
#[derive(Clone, Debug)]
pub struct Record {
    /// The aligner's query name; anything after a `|` is ignored when
    /// resolving the primer.
    query_name: String,
    /// The reference sequence name.
    reference: String,
    /// The 0-based position of the hit.
    position: u64,
    /// Whether the hit is on the reverse strand.
    reverse: bool,
    /// The aligned query sequence.
    query_sequence: String,
    /// The aligned reference sequence.
    reference_sequence: String,
}

impl Record {
    /// Creates a new [`Record`].
    pub fn new(
        query_name: impl Into<String>,
        reference: impl Into<String>,
        position: u64,
        reverse: bool,
        query_sequence: impl Into<String>,
        reference_sequence: impl Into<String>,
    ) -> Record {
        Record {
            query_name: query_name.into(),
            reference: reference.into(),
            position,
            reverse,
            query_sequence: query_sequence.into(),
            reference_sequence: reference_sequence.into(),
        }
    }

    /// Gets the primer name the hit belongs to: the query name truncated
    /// at the first `|`.
    pub fn primer_name(&self) -> &str {
        self.query_name
            .split('|')
            .next()
            .unwrap_or(&self.query_name)
    }

    /// Gets the reference sequence name.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Gets the 0-based position of the hit.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Indicates whether the hit is on the reverse strand.
    pub fn reverse(&self) -> bool {
        self.reverse
    }
}

/// The alignment filter settings.
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    /// The minimum heterodimer melting temperature for a hit to count.
    pub tm_threshold: f64,
    /// The number of 3'-end bases that must match the reference exactly.
    pub end_match: usize,
    /// The locus count at which a primer is judged non-specific.
    pub max_alignments: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tm_threshold: DEFAULT_TM_THRESHOLD,
            end_match: DEFAULT_END_MATCH,
            max_alignments: DEFAULT_MAX_ALIGNMENTS,
        }
    }
}

/// Filters aligner hits and assigns the survivors as mapped loci.
///
/// For each record, a heterodimer melting temperature is computed between
/// the query and the reverse complement of the aligned reference. A hit is
/// kept when that temperature exceeds `tm_threshold`, both aligned
/// sequences are longer than `end_match`, and the last `end_match` bases of
/// the query match the reference exactly. Kept hits become mapped loci of
/// the named primer; records naming an unknown primer are skipped.
///
/// After ingest, any primer whose locus count reached `max_alignments` has
/// its loci cleared: it binds in too many places to be usable, and
/// reporting a partial list would understate that.
pub fn assign_loci(primers: &[SharedPrimer], records: &[Record], settings: &Settings) {
    let by_name = primers
        .iter()
        .map(|primer| (primer.borrow().name().to_string(), primer))
        .collect::<HashMap<_, _>>();

    for record in records {
        let primer = match by_name.get(record.primer_name()) {
            Some(primer) => primer,
            None => {
                tracing::warn!(query = record.primer_name(), "hit for unknown primer");
                continue;
            }
        };

        let query = record.query_sequence.to_uppercase();
        let reference = record.reference_sequence.to_uppercase();

        let tm = thermo::heterodimer_tm(&query, &thermo::reverse_complement(&reference));

        if tm <= settings.tm_threshold {
            continue;
        }

        if query.len() <= settings.end_match || reference.len() <= settings.end_match {
            continue;
        }

        let query_end = &query.as_bytes()[query.len() - settings.end_match..];
        let reference_end = &reference.as_bytes()[reference.len() - settings.end_match..];

        if query_end != reference_end {
            continue;
        }

        primer.borrow_mut().add_target(
            record.reference.clone(),
            record.position,
            record.reverse,
            Some(tm),
        );
    }

    for primer in primers {
        let mut primer = primer.borrow_mut();

        if primer.loci().len() >= settings.max_alignments {
            tracing::debug!(
                primer = primer.name(),
                loci = primer.loci().len(),
                "judged non-specific"
            );

            primer.clear_loci();
        }
    }
}
