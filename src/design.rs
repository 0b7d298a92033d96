//! The contract with the external thermodynamic design tool.
//!
//! The tool is handed a template sequence and an allowed primer region and
//! returns a flat key-value map describing candidate primers. This module
//! builds the input payload and parses the output map into [`PrimerPair`]s
//! with absolute genomic coordinates, leaving the tool invocation itself to
//! the caller.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::Locus;
use crate::core::Strand;
use crate::pair;
use crate::pair::PrimerPair;
use crate::pair::SharedPrimer;
use crate::primer;
use crate::primer::Primer;
use crate::primer::POSITION_KEY;
use crate::thermo;

/// An error related to the design-tool contract.
#[derive(Debug)]
pub enum Error {
    /// A primer could not be constructed from the output.
    Primer(primer::Error),
    /// A pair could not be assembled from the output.
    Pair(pair::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Primer(err) => write!(f, "primer error: {}", err),
            Error::Pair(err) => write!(f, "pair error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<primer::Error> for Error {
    fn from(err: primer::Error) -> Self {
        Error::Primer(err)
    }
}

impl From<pair::Error> for Error {
    fn from(err: pair::Error) -> Self {
        Error::Pair(err)
    }
}

/// A value in the design tool's flat key-value output (or a derived
/// position recorded back into primer metadata).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A `(start, length)` position pair relative to the template.
    Span(u64, u64),
    /// A named numeric metric (melting temperature, GC%, and so on).
    Number(f64),
    /// A free-text value.
    Text(String),
    /// An absolute genomic position derived from a span.
    Position(String, u64, u64),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Span(start, length) => write!(f, "{},{}", start, length),
            Value::Number(number) => write!(f, "{}", number),
            Value::Text(text) => write!(f, "{}", text),
            Value::Position(contig, start, end) => {
                write!(f, "{}:{}-{}", contig, start, end)
            }
        }
    }
}

/// The input handed to the design tool: a template sequence and the flank
/// width within which each primer must fall.
#[derive(Clone, Debug)]
pub struct Input {
    /// The sequence identifier.
    id: String,
    /// The template sequence.
    template: String,
    /// The width of the allowed primer region at either end of the
    /// template.
    ok_region_flank: u64,
}

impl Input {
    /// Creates a new [`Input`].
    pub fn new(
        id: impl Into<String>,
        template: impl Into<String>,
        ok_region_flank: u64,
    ) -> Input {
        Input {
            id: id.into(),
            template: template.into(),
            ok_region_flank,
        }
    }

    /// Gets the sequence identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the template sequence.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Builds the sequence-argument payload for the design tool: the left
    /// primer must fall within the leading flank and the right primer
    /// within the trailing flank.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::design::Input;
    ///
    /// let input = Input::new("target", "ACGT".repeat(200), 300);
    /// let payload = input.payload();
    ///
    /// assert_eq!(payload["SEQUENCE_ID"], "target");
    /// assert_eq!(
    ///     payload["SEQUENCE_PRIMER_PAIR_OK_REGION_LIST"],
    ///     serde_json::json!([0, 300, 500, 300])
    /// );
    /// ```
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "SEQUENCE_ID": self.id,
            "SEQUENCE_TEMPLATE": self.template,
            "SEQUENCE_PRIMER_PAIR_OK_REGION_LIST": [
                0,
                self.ok_region_flank,
                self.template.len() as u64 - self.ok_region_flank,
                self.ok_region_flank,
            ],
        })
    }
}

/// The genomic origin of a design template: template-relative spans are
/// offset by `start` on `contig` to become absolute.
#[derive(Clone, Debug)]
pub struct Region {
    /// The contig the template was taken from.
    contig: String,
    /// The absolute position of the template's first base.
    start: u64,
}

impl Region {
    /// Creates a new [`Region`].
    pub fn new(contig: impl Into<String>, start: u64) -> Region {
        Region {
            contig: contig.into(),
            start,
        }
    }

    /// Gets the contig the template was taken from.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Gets the absolute position of the template's first base.
    pub fn start(&self) -> u64 {
        self.start
    }
}

/// The parsed result of one design-tool invocation.
#[derive(Debug)]
pub struct Output {
    /// The assembled candidate pairs, in ascending design order.
    pairs: Vec<PrimerPair>,
    /// The tool's free-text explanation lines.
    diagnostics: Vec<String>,
}

impl Output {
    /// Gets the assembled candidate pairs, in ascending design order.
    pub fn pairs(&self) -> &[PrimerPair] {
        &self.pairs
    }

    /// Consumes `self` and returns the assembled candidate pairs.
    pub fn into_pairs(self) -> Vec<PrimerPair> {
        self.pairs
    }

    /// Gets the tool's free-text explanation lines.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

/// One primer's accumulated design output.
#[derive(Debug, Default)]
struct Entry {
    /// The named metrics keyed by suffix.
    meta: BTreeMap<String, Value>,
    /// The derived absolute position, when the span key was seen.
    position: Option<(u64, u64)>,
}

/// Gets the regex matching a per-primer design output key.
fn key_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();

    REGEX.get_or_init(|| {
        // SAFETY: this is a hardcoded pattern known to compile.
        Regex::new(r"^PRIMER_(RIGHT|LEFT)_(\d+)(.*)$").unwrap()
    })
}

/// Parses the design tool's output map into candidate pairs.
///
/// Keys matching `PRIMER_(RIGHT|LEFT)_<index><suffix>` are grouped by
/// primer; an empty suffix carries the primer's `(start, length)` span
/// relative to the template, and non-empty suffixes carry named metrics
/// kept in the primer's metadata. Spans are converted to absolute
/// coordinates through `region`: a right primer's span is anchored at its
/// 3' end, so its absolute interval runs from `start + v0 − (v1 − 1)` to
/// `start + v0`; a left primer's runs from `start + v0` to
/// `start + v0 + v1`. The absolute position is recorded under the
/// `POSITION` metadata key and becomes the primer's target locus.
///
/// Primers are named `<name>_<index>_<LEFT|RIGHT>` and deduplicated by
/// sequence, so a sequence designed at several indices is shared between
/// the resulting pairs, and each primer keeps its side slot even when its
/// mate is missing. Keys ending in `EXPLAIN` are collected into the
/// output's diagnostics in key order. Entries without a reported sequence,
/// and spans whose arithmetic does not produce a valid interval, are
/// skipped.
pub fn parse_output(
    name: &str,
    region: &Region,
    raw: &HashMap<String, Value>,
) -> Result<Output, Error> {
    let mut entries: BTreeMap<(u32, &'static str), Entry> = BTreeMap::new();
    let mut diagnostics = Vec::new();

    // Walking the map in key order keeps the diagnostics stable from run
    // to run.
    let mut items = raw.iter().collect::<Vec<_>>();
    items.sort_by(|(a, _), (b, _)| a.cmp(b));

    // (1) Group the flat output by primer index and side.
    for (key, value) in items {
        let captures = match key_regex().captures(key) {
            Some(captures) => captures,
            None => {
                if key.ends_with("EXPLAIN") {
                    diagnostics.push(value.to_string());
                }

                continue;
            }
        };

        let side = if &captures[1] == "RIGHT" { "RIGHT" } else { "LEFT" };
        let index = match captures[2].parse::<u32>() {
            Ok(index) => index,
            Err(_) => continue,
        };
        let suffix = &captures[3];

        let entry = entries.entry((index, side)).or_default();

        if suffix.is_empty() {
            if let Value::Span(v0, v1) = value {
                entry.position = Some((*v0, *v1));
            }
        } else {
            entry
                .meta
                .insert(suffix.trim_start_matches('_').to_string(), value.clone());
        }
    }

    // (2) Build primers, deduplicating by sequence, and group them into
    // pairs by index.
    let mut by_sequence: HashMap<String, SharedPrimer> = HashMap::new();
    let mut pairs: BTreeMap<u32, (Option<SharedPrimer>, Option<SharedPrimer>)> =
        BTreeMap::new();

    for ((index, side), entry) in entries {
        let sequence = match entry.meta.get("SEQUENCE") {
            Some(Value::Text(sequence)) => sequence.clone(),
            _ => {
                tracing::warn!(name, index, side, "design output carries no sequence");
                continue;
            }
        };

        let primer = match by_sequence.get(&sequence) {
            Some(primer) => primer.clone(),
            None => {
                let primer_name = format!("{}_{}_{}", name, index, side);
                let primer = build_primer(&primer_name, &sequence, side, region, entry)?;
                by_sequence.insert(sequence, primer.clone());
                primer
            }
        };

        let slots = pairs.entry(index).or_default();

        match side {
            "LEFT" => slots.0 = Some(primer),
            _ => slots.1 = Some(primer),
        }
    }

    // (3) Emit pairs in ascending design order. Each primer keeps its side
    // slot, so a right primer is never promoted to the forward slot when
    // its mate was skipped.
    let mut assembled = Vec::with_capacity(pairs.len());

    for (index, (left, right)) in pairs {
        let mut pair = PrimerPair::try_new(format!("{}_{}", name, index), Vec::new())?;

        if let Some(left) = left {
            pair.set_slot(0, left)?;
        }

        if let Some(right) = right {
            pair.set_slot(1, right)?;
        }

        assembled.push(pair);
    }

    Ok(Output {
        pairs: assembled,
        diagnostics,
    })
}

/// Builds one primer from its accumulated design output.
fn build_primer(
    primer_name: &str,
    sequence: &str,
    side: &str,
    region: &Region,
    entry: Entry,
) -> Result<SharedPrimer, Error> {
    let absolute = entry.position.and_then(|(v0, v1)| {
        if side == "RIGHT" {
            // The span is anchored at the primer's 3' end.
            let end = region.start + v0;
            end.checked_sub(v1.saturating_sub(1)).map(|start| (start, end))
        } else {
            Some((region.start + v0, region.start + v0 + v1))
        }
    });

    let target = absolute.map(|(start, end)| {
        Locus::new(
            region.contig(),
            start,
            end - start,
            if side == "RIGHT" {
                Strand::Reverse
            } else {
                Strand::Forward
            },
            Some(thermo::melting_temperature(&sequence.to_uppercase())),
        )
    });

    let mut primer = Primer::try_new(primer_name, sequence, target, None)?;

    primer.meta_mut().extend(entry.meta);

    if let Some((start, end)) = absolute {
        primer.meta_mut().insert(
            POSITION_KEY.to_string(),
            Value::Position(region.contig().to_string(), start, end),
        );
    }

    Ok(Rc::new(RefCell::new(primer)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_output() -> HashMap<String, Value> {
        let mut raw = HashMap::new();

        raw.insert("PRIMER_LEFT_0".to_string(), Value::Span(100, 20));
        raw.insert(
            "PRIMER_LEFT_0_SEQUENCE".to_string(),
            Value::Text("ACGTACGTACGTACGTACGT".to_string()),
        );
        raw.insert("PRIMER_LEFT_0_TM".to_string(), Value::Number(60.2));

        raw.insert("PRIMER_RIGHT_0".to_string(), Value::Span(399, 20));
        raw.insert(
            "PRIMER_RIGHT_0_SEQUENCE".to_string(),
            Value::Text("TTTTACGTACGTACGTACGT".to_string()),
        );
        raw.insert("PRIMER_RIGHT_0_TM".to_string(), Value::Number(59.8));

        raw.insert(
            "PRIMER_LEFT_EXPLAIN".to_string(),
            Value::Text("considered 100, ok 4".to_string()),
        );
        raw.insert("PRIMER_PAIR_NUM_RETURNED".to_string(), Value::Number(1.0));

        raw
    }

    #[test]
    fn test_parse_output_assembles_a_pair() -> Result<(), Box<dyn std::error::Error>> {
        let region = Region::new("chr1", 1000);
        let output = parse_output("BRCA1", &region, &raw_output())?;

        assert_eq!(output.pairs().len(), 1);
        assert_eq!(output.diagnostics().len(), 1);

        let pair = &output.pairs()[0];
        assert_eq!(pair.name(), "BRCA1_0");

        let left = pair.slot(0).unwrap().borrow();
        assert_eq!(left.name(), "BRCA1_0_LEFT");
        assert_eq!(left.sequence(), "ACGTACGTACGTACGTACGT");
        assert_eq!(left.meta().get("TM"), Some(&Value::Number(60.2)));

        // Left spans are anchored at the 5' end.
        assert_eq!(
            left.meta().get("POSITION"),
            Some(&Value::Position("chr1".to_string(), 1100, 1120))
        );
        assert_eq!(left.target().unwrap().offset(), 1100);

        // Right spans are anchored at the 3' end.
        let right = pair.slot(1).unwrap().borrow();
        assert_eq!(right.name(), "BRCA1_0_RIGHT");
        assert_eq!(
            right.meta().get("POSITION"),
            Some(&Value::Position("chr1".to_string(), 1380, 1399))
        );

        Ok(())
    }

    #[test]
    fn test_parse_output_deduplicates_by_sequence()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut raw = raw_output();

        // A second design index reusing the same left sequence.
        raw.insert("PRIMER_LEFT_1".to_string(), Value::Span(100, 20));
        raw.insert(
            "PRIMER_LEFT_1_SEQUENCE".to_string(),
            Value::Text("ACGTACGTACGTACGTACGT".to_string()),
        );
        raw.insert("PRIMER_RIGHT_1".to_string(), Value::Span(450, 20));
        raw.insert(
            "PRIMER_RIGHT_1_SEQUENCE".to_string(),
            Value::Text("GGGGACGTACGTACGTACGT".to_string()),
        );

        let region = Region::new("chr1", 1000);
        let output = parse_output("BRCA1", &region, &raw)?;

        assert_eq!(output.pairs().len(), 2);

        let first_left = output.pairs()[0].slot(0).unwrap().clone();
        let second_left = output.pairs()[1].slot(0).unwrap().clone();
        assert!(Rc::ptr_eq(&first_left, &second_left));

        Ok(())
    }

    #[test]
    fn test_parse_output_skips_entries_without_a_sequence()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut raw = raw_output();
        raw.remove("PRIMER_RIGHT_0_SEQUENCE");

        let region = Region::new("chr1", 1000);
        let output = parse_output("BRCA1", &region, &raw)?;

        assert_eq!(output.pairs().len(), 1);
        assert_eq!(output.pairs()[0].len(), 1);

        let pair = &output.pairs()[0];
        assert_eq!(pair.slot(0).unwrap().borrow().name(), "BRCA1_0_LEFT");
        assert!(pair.slot(1).is_none());

        Ok(())
    }

    #[test]
    fn test_a_lone_right_primer_keeps_the_reverse_slot()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut raw = HashMap::new();
        raw.insert("PRIMER_RIGHT_0".to_string(), Value::Span(399, 20));
        raw.insert(
            "PRIMER_RIGHT_0_SEQUENCE".to_string(),
            Value::Text("TTTTACGTACGTACGTACGT".to_string()),
        );

        let region = Region::new("chr1", 1000);
        let output = parse_output("BRCA1", &region, &raw)?;

        assert_eq!(output.pairs().len(), 1);

        let pair = &output.pairs()[0];
        assert!(pair.slot(0).is_none());
        assert_eq!(pair.slot(1).unwrap().borrow().name(), "BRCA1_0_RIGHT");

        Ok(())
    }

    #[test]
    fn test_diagnostics_are_reported_in_key_order()
    -> Result<(), Box<dyn std::error::Error>> {
        let mut raw = HashMap::new();
        raw.insert(
            "PRIMER_PAIR_EXPLAIN".to_string(),
            Value::Text("considered 0, ok 0".to_string()),
        );
        raw.insert(
            "PRIMER_LEFT_EXPLAIN".to_string(),
            Value::Text("considered 100, ok 4".to_string()),
        );

        let region = Region::new("chr1", 1000);
        let output = parse_output("BRCA1", &region, &raw)?;

        assert_eq!(
            output.diagnostics(),
            ["considered 100, ok 4", "considered 0, ok 0"]
        );

        Ok(())
    }

    #[test]
    fn test_parse_output_with_no_candidates() -> Result<(), Box<dyn std::error::Error>> {
        let mut raw = HashMap::new();
        raw.insert(
            "PRIMER_PAIR_EXPLAIN".to_string(),
            Value::Text("considered 0, ok 0".to_string()),
        );

        let region = Region::new("chr1", 1000);
        let output = parse_output("BRCA1", &region, &raw)?;

        assert!(output.pairs().is_empty());
        assert_eq!(output.diagnostics().len(), 1);

        Ok(())
    }

    #[test]
    fn test_payload_flanks_the_template() {
        let input = Input::new("t", "A".repeat(1000), 400);
        let payload = input.payload();

        assert_eq!(
            payload["SEQUENCE_PRIMER_PAIR_OK_REGION_LIST"],
            serde_json::json!([0, 400, 600, 400])
        );
    }
}
