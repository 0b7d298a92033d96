//! Quick thermodynamic estimates for oligonucleotides.
//!
//! The external design tool computes authoritative thermodynamics for the
//! candidates it emits; the estimates here exist so that the engine can (a)
//! derive a melting temperature and GC fraction for any sequence handed to
//! it and (b) score raw alignment hits against a melting temperature
//! threshold without another round trip to the tool. They use the standard
//! quick rules (the Wallace rule for short oligos and the GC-content formula
//! for longer ones) and should not be mistaken for nearest-neighbor values.

/// The melting temperature penalty applied per mismatched base when
/// estimating a heterodimer melting temperature.
const MISMATCH_PENALTY: f64 = 5.0;

/// The length at and below which the Wallace rule is used.
const WALLACE_RULE_MAX_LEN: usize = 13;

/// Gets the fraction of G/C bases in a sequence.
///
/// # Examples
///
/// ```
/// use primercheck::thermo;
///
/// assert_eq!(thermo::gc_fraction("ACGT"), 0.5);
/// assert_eq!(thermo::gc_fraction("AATT"), 0.0);
/// assert_eq!(thermo::gc_fraction(""), 0.0);
/// ```
pub fn gc_fraction(sequence: &str) -> f64 {
    if sequence.is_empty() {
        return 0.0;
    }

    let gc = sequence
        .chars()
        .filter(|c| matches!(c, 'G' | 'C' | 'g' | 'c'))
        .count();

    gc as f64 / sequence.len() as f64
}

/// Estimates the melting temperature of a sequence in degrees Celsius.
///
/// Sequences of up to 13 nt use the Wallace rule, `2(A+T) + 4(G+C)`; longer
/// sequences use the GC-content formula `64.9 + 41 * (GC - 16.4) / N`.
///
/// # Examples
///
/// ```
/// use primercheck::thermo;
///
/// // Wallace rule: 2 * 2 + 4 * 2
/// assert_eq!(thermo::melting_temperature("ACGT"), 12.0);
/// ```
pub fn melting_temperature(sequence: &str) -> f64 {
    let n = sequence.len();

    if n == 0 {
        return 0.0;
    }

    let gc = sequence
        .chars()
        .filter(|c| matches!(c, 'G' | 'C' | 'g' | 'c'))
        .count();

    if n <= WALLACE_RULE_MAX_LEN {
        let at = n - gc;
        (2 * at + 4 * gc) as f64
    } else {
        64.9 + 41.0 * (gc as f64 - 16.4) / n as f64
    }
}

/// Estimates the melting temperature of a query sequence hybridized against
/// a candidate binding-partner strand, penalizing each mispaired base.
///
/// The query is compared position-wise against the reverse complement of
/// the partner; the estimate starts from the melting temperature of the
/// query and loses a fixed amount per mispairing (a length difference
/// counts each unpaired base as a mispairing).
///
/// # Examples
///
/// ```
/// use primercheck::thermo;
///
/// let perfect = thermo::heterodimer_tm("ACGTACGTACGTACGTACGT", "ACGTACGTACGTACGTACGT");
/// let one_off = thermo::heterodimer_tm("ACGTACGTACGTACGTACGT", "ACGTACGTACGTACGTACGA");
///
/// assert!(perfect > one_off);
/// ```
pub fn heterodimer_tm(query: &str, partner: &str) -> f64 {
    let template = reverse_complement(partner);

    let paired = query
        .chars()
        .zip(template.chars())
        .filter(|(q, r)| q.eq_ignore_ascii_case(r))
        .count();

    let mismatches = query.len().max(template.len()) - paired;

    melting_temperature(query) - MISMATCH_PENALTY * mismatches as f64
}

/// Gets the reverse complement of a sequence.
///
/// Bases outside the `ACGTN` alphabet are passed through unchanged.
///
/// # Examples
///
/// ```
/// use primercheck::thermo;
///
/// assert_eq!(thermo::reverse_complement("ATGC"), "GCAT");
/// assert_eq!(thermo::reverse_complement("AAAN"), "NTTT");
/// ```
pub fn reverse_complement(sequence: &str) -> String {
    sequence
        .chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'C' => 'G',
            'G' => 'C',
            'T' => 'A',
            'a' => 't',
            'c' => 'g',
            'g' => 'c',
            't' => 'a',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_melting_temperature_switches_formulas_by_length() {
        // 13 nt: Wallace rule.
        assert_eq!(melting_temperature("ACGTACGTACGTA"), 38.0);

        // 20 nt, 10 GC: GC-content formula.
        let tm = melting_temperature("ACGTACGTACGTACGTACGT");
        assert!((tm - (64.9 + 41.0 * (10.0 - 16.4) / 20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_heterodimer_tm_penalizes_mismatches() {
        let a = "ACGTACGTACGTACGTACGT";
        let perfect = heterodimer_tm(a, a);
        let two_off = heterodimer_tm(a, "TCGTACGTACGTACGTACGA");

        assert!((perfect - two_off - 2.0 * MISMATCH_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn test_reverse_complement_round_trips() {
        let seq = "ACGTTGCA";
        assert_eq!(reverse_complement(&reverse_complement(seq)), seq);
    }
}
