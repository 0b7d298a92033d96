//! A designed oligonucleotide and its specificity and variant evidence.
//!
//! A [`Primer`] starts as a name and a sequence produced by the external
//! design tool. Two evidence streams are attached as the pipeline runs:
//!
//! - **Mapped loci** — every genome-wide alignment of the sequence that
//!   survived the alignment filter (see [`crate::alignment`]). The count of
//!   mapped loci is the primer's specificity; a primer judged non-specific
//!   has its loci cleared entirely.
//! - **Variants** — known variation overlapping the primer's intended
//!   binding site, gathered by [`Primer::snp_check`] under a configured
//!   [`Policy`].
//!
//! Melting temperature and GC fraction are derived from the sequence at
//! construction time and are immutable thereafter.

pub mod location;

use std::collections::HashMap;

use nonempty::NonEmpty;

use crate::core::Locus;
use crate::core::Strand;
use crate::design;
use crate::thermo;
use crate::variant;
use crate::variant::Stores;
use crate::variant::Variant;

pub use location::Location;

/// The metadata key under which a primer's absolute genomic position is
/// recorded by the design-output parser.
pub const POSITION_KEY: &str = "POSITION";

/// The rank given to a primer before any design rank has been assigned.
pub const UNRANKED: i32 = -1;

/// An error related to a primer.
#[derive(Debug)]
pub enum Error {
    /// The sequence contained a character outside the nucleotide alphabet.
    InvalidSequence(String, char),
    /// A SNP check was requested for a primer with no target locus.
    MissingTargetLocus(String),
    /// A variant query failed.
    Variant(variant::Error),
    /// A store could not be resolved.
    Store(variant::store::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidSequence(name, c) => {
                write!(f, "invalid character {:?} in sequence for primer {}", c, name)
            }
            Error::MissingTargetLocus(name) => {
                write!(f, "primer {} has no target locus to check", name)
            }
            Error::Variant(err) => write!(f, "variant error: {}", err),
            Error::Store(err) => write!(f, "store error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<variant::Error> for Error {
    fn from(err: variant::Error) -> Self {
        Error::Variant(err)
    }
}

impl From<variant::store::Error> for Error {
    fn from(err: variant::store::Error) -> Self {
        Error::Store(err)
    }
}

/// One SNP check: a named variant store and an optional allele-frequency
/// cutoff (a percentage in `0..=100`).
///
/// Without a cutoff, the check only gathers the overlapping variants and
/// always accepts. With a cutoff, any overlapping variant whose population
/// allele frequency exceeds `cutoff / 100` disqualifies the primer.
#[derive(Clone, Debug, PartialEq)]
pub struct Check {
    /// The name of the variant store to query.
    store: String,
    /// The allele-frequency cutoff, as a percentage.
    cutoff: Option<f64>,
}

impl Check {
    /// Creates a new [`Check`].
    pub fn new(store: impl Into<String>, cutoff: Option<f64>) -> Check {
        Check {
            store: store.into(),
            cutoff,
        }
    }

    /// Gets the name of the variant store to query.
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Gets the allele-frequency cutoff, as a percentage.
    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }
}

/// A SNP-checking policy: a single [`Check`] or several applied
/// conjunctively.
#[derive(Clone, Debug, PartialEq)]
pub enum Policy {
    /// A single check.
    Single(Check),
    /// Several checks, all of which must accept.
    Combined(NonEmpty<Check>),
}

/// A designed oligonucleotide.
#[derive(Clone, Debug)]
pub struct Primer {
    /// The primer name.
    name: String,
    /// The uppercased nucleotide sequence.
    sequence: String,
    /// The design-tool rank shared with the primer's mate
    /// ([`UNRANKED`] until assigned).
    rank: i32,
    /// An optional tag sequence prepended at synthesis time.
    tag: Option<String>,
    /// The intended binding site, when known.
    target: Option<Locus>,
    /// Genome-wide mapped loci (specificity hits).
    loci: Vec<Locus>,
    /// Variants overlapping the target locus, in store order.
    variants: Vec<Variant>,
    /// The physical storage location, when ordered.
    location: Option<Location>,
    /// Metadata reported by the design tool.
    meta: HashMap<String, design::Value>,
    /// The melting temperature derived from the sequence at construction.
    melting_temperature: f64,
    /// The GC fraction derived from the sequence at construction.
    gc_fraction: f64,
}

impl Primer {
    /// Attempts to create a new [`Primer`].
    ///
    /// The sequence is uppercased and must consist of `ACGTN` characters
    /// only. The melting temperature and GC fraction are derived here and
    /// never change afterwards.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::primer::Primer;
    ///
    /// let primer = Primer::try_new("BRCA1_3F", "acgtacgtACGTACGTACGT", None, None)?;
    /// assert_eq!(primer.sequence(), "ACGTACGTACGTACGTACGT");
    /// assert_eq!(primer.gc_fraction(), 0.5);
    /// assert_eq!(primer.rank(), -1);
    ///
    /// let err = Primer::try_new("oops", "ACGU", None, None).unwrap_err();
    /// assert_eq!(
    ///     err.to_string(),
    ///     "invalid character 'U' in sequence for primer oops"
    /// );
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        name: impl Into<String>,
        sequence: impl Into<String>,
        target: Option<Locus>,
        tag: Option<String>,
    ) -> Result<Primer, Error> {
        let name = name.into();
        let sequence = sequence.into().to_uppercase();

        if let Some(c) = sequence.chars().find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T' | 'N')) {
            return Err(Error::InvalidSequence(name, c));
        }

        let melting_temperature = thermo::melting_temperature(&sequence);
        let gc_fraction = thermo::gc_fraction(&sequence);

        Ok(Primer {
            name,
            sequence,
            rank: UNRANKED,
            tag,
            target,
            loci: Vec::new(),
            variants: Vec::new(),
            location: None,
            meta: HashMap::new(),
            melting_temperature,
            gc_fraction,
        })
    }

    /// Gets the primer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the primer name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Gets the uppercased nucleotide sequence.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Gets the length of the primer in bases.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.sequence.len() as u64
    }

    /// Gets the design-tool rank ([`UNRANKED`] until assigned).
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Sets the design-tool rank.
    pub fn set_rank(&mut self, rank: i32) {
        self.rank = rank;
    }

    /// Gets the tag sequence, when present.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Gets the intended binding site, when known.
    pub fn target(&self) -> Option<&Locus> {
        self.target.as_ref()
    }

    /// Gets the genome-wide mapped loci.
    pub fn loci(&self) -> &[Locus] {
        &self.loci
    }

    /// Clears the mapped loci. Used when a primer is judged non-specific
    /// (its alignment count reached the configured maximum), after which it
    /// reports no binding sites at all.
    pub fn clear_loci(&mut self) {
        self.loci.clear();
    }

    /// Gets the variants overlapping the target locus, as recorded by the
    /// most recent [`Primer::snp_check`].
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Gets the physical storage location, when ordered.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Sets the physical storage location.
    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    /// Gets the metadata reported by the design tool.
    pub fn meta(&self) -> &HashMap<String, design::Value> {
        &self.meta
    }

    /// Gets a mutable reference to the metadata reported by the design
    /// tool.
    pub fn meta_mut(&mut self) -> &mut HashMap<String, design::Value> {
        &mut self.meta
    }

    /// Gets the melting temperature derived from the sequence.
    pub fn melting_temperature(&self) -> f64 {
        self.melting_temperature
    }

    /// Gets the GC fraction derived from the sequence.
    pub fn gc_fraction(&self) -> f64 {
        self.gc_fraction
    }

    /// Appends a mapped locus of the primer's own length.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::primer::Primer;
    ///
    /// let mut primer = Primer::try_new("p", "ACGTACGTACGTACGTACGT", None, None)?;
    /// primer.add_target("chr1", 100, false, Some(60.1));
    ///
    /// assert_eq!(primer.loci().len(), 1);
    /// assert_eq!(primer.loci()[0].length(), 20);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn add_target(&mut self, contig: impl Into<String>, position: u64, reverse: bool, tm: Option<f64>) {
        self.loci.push(Locus::new(
            contig,
            position,
            self.len(),
            Strand::from_reverse_flag(reverse),
            tm,
        ));
    }

    /// Indicates whether the intended binding site was recovered among the
    /// mapped loci.
    ///
    /// The target's contig is compared after stripping a leading `chr`
    /// prefix (case-insensitively), since design targets and alignment
    /// references frequently disagree on that convention.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Locus;
    /// use primercheck::core::Strand;
    /// use primercheck::primer::Primer;
    ///
    /// let target = Locus::new("chr1", 100, 20, Strand::Forward, None);
    /// let mut primer = Primer::try_new("p", "ACGTACGTACGTACGTACGT", Some(target), None)?;
    ///
    /// assert!(!primer.check_target());
    ///
    /// primer.add_target("1", 100, false, None);
    /// assert!(primer.check_target());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn check_target(&self) -> bool {
        let target = match &self.target {
            Some(target) => target,
            None => return false,
        };

        let target_contig = strip_chr_prefix(target.contig());

        self.loci
            .iter()
            .any(|locus| locus.contig() == target_contig && locus.offset() == target.offset())
    }

    /// Runs a SNP-checking policy against the primer's target locus.
    ///
    /// The overlapping variants found become [`Primer::variants`]; the
    /// return value indicates whether the primer is acceptable under the
    /// policy.
    ///
    /// For a combined policy, every check is evaluated independently and all
    /// must accept. The recorded variant set is the running intersection of
    /// the per-check overlap sets, except that the set only narrows while
    /// fewer than two sub-results have been combined — a third and further
    /// check contributes to acceptance but never narrows the recorded set.
    /// That accumulation rule is deliberate and matched to the established
    /// pipeline behavior.
    pub fn snp_check(&mut self, policy: &Policy, stores: &mut Stores) -> Result<bool, Error> {
        match policy {
            Policy::Single(check) => self.run_check(check, stores),
            Policy::Combined(checks) => {
                let mut accept = true;
                let mut accumulated: Option<Vec<Variant>> = None;

                for (combined, check) in checks.iter().enumerate() {
                    let check_accept = self.run_check(check, stores)?;
                    accept = accept && check_accept;

                    match accumulated.as_mut() {
                        None => accumulated = Some(self.variants.clone()),
                        Some(kept) => {
                            if combined < 2 {
                                kept.retain(|variant| self.variants.contains(variant));
                            }
                        }
                    }
                }

                // SAFETY: the policy holds at least one check, so at least
                // one result was accumulated.
                self.variants = accumulated.unwrap();

                tracing::debug!(
                    primer = %self.name,
                    accept,
                    variants = self.variants.len(),
                    "combined snp check"
                );

                Ok(accept)
            }
        }
    }

    /// Runs one [`Check`], replacing the recorded variant set.
    fn run_check(&mut self, check: &Check, stores: &mut Stores) -> Result<bool, Error> {
        let target = self
            .target
            .clone()
            .ok_or_else(|| Error::MissingTargetLocus(self.name.clone()))?;

        let store = stores.get_mut(check.store())?;

        match check.cutoff() {
            None => {
                self.variants = variant::overlapping(store, &target)?;
                Ok(true)
            }
            Some(cutoff) => {
                let (all, outliers) = variant::frequency_filtered(store, &target, cutoff)?;
                self.variants = all;
                Ok(outliers.is_empty())
            }
        }
    }

    /// Renders the primer as a FASTA entry.
    ///
    /// When the design metadata carries the primer's absolute genomic
    /// position, the header is suffixed `|contig:start-end:strand` so that
    /// the intended target survives the round trip through the aligner.
    pub fn fasta(&self, name_override: Option<&str>) -> String {
        let mut header = name_override.unwrap_or(&self.name).to_string();

        if let Some(design::Value::Position(contig, start, end)) = self.meta.get(POSITION_KEY) {
            let strand = if self.name.ends_with("RIGHT") { '-' } else { '+' };
            header.push_str(&format!("|{}:{}-{}:{}", contig, start, end, strand));
        }

        format!(">{}\n{}", header, self.sequence)
    }
}

impl std::fmt::Display for Primer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<20}\t{}-{}\t{:.2}\t{:.1}\t{}",
            self.name,
            self.tag.as_deref().unwrap_or("None"),
            self.sequence,
            self.melting_temperature,
            self.gc_fraction,
            self.target
                .as_ref()
                .map(|target| target.to_string())
                .unwrap_or_else(|| String::from("None")),
        )
    }
}

/// Strips a leading `chr` prefix (case-insensitively) from a contig name.
fn strip_chr_prefix(contig: &str) -> &str {
    if contig.len() >= 3 && contig[..3].eq_ignore_ascii_case("chr") {
        &contig[3..]
    } else {
        contig
    }
}
