//! A named, closed interval upon a contig.
//!
//! ```text
//! ================ seq0 ===============
//!
//! | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 |
//! -------------------------------------
//! |   |   | X | X | X | X |   |   |   |  <= seq0:3-6
//! ```
//!
//! Intervals are the foundation of every designable and reportable region in
//! this crate: design targets, variant annotations, and predicted amplicon
//! spans are all intervals. An interval carries a display name (defaulting to
//! its positional name, `contig:start-end`), a [`Strand`], and an optional
//! list of subintervals (e.g., the exons of a targeted transcript).
//!
//! Equality, ordering, and hashing are all defined over the
//! `(contig, start, end)` tuple alone; names, strands, and subintervals do
//! not participate.

use std::cmp::Ordering;
use std::hash::Hash;
use std::hash::Hasher;

use crate::core::Strand;

/// An error related to an interval.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The start position was greater than the end position.
    StartAfterEnd(u64, u64),
    /// Attempted to tile an interval with a tile size that does not exceed
    /// the requested overlap.
    InvalidTileSize(u64, u64),
    /// Attempted to tile an empty interval.
    EmptyInterval,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::StartAfterEnd(start, end) => {
                write!(f, "start position ({}) is after end position ({})", start, end)
            }
            Error::InvalidTileSize(tile_size, overlap) => write!(
                f,
                "tile size ({}) must be greater than the tile overlap ({})",
                tile_size, overlap
            ),
            Error::EmptyInterval => write!(f, "cannot tile an empty interval"),
        }
    }
}

impl std::error::Error for Error {}

/// A named, closed interval upon a contig.
#[derive(Clone, Debug)]
pub struct Interval {
    /// The contig upon which the interval is located.
    contig: String,
    /// The 0-based start position.
    start: u64,
    /// The end position.
    end: u64,
    /// The display name.
    name: String,
    /// The strand upon which the interval is located.
    strand: Strand,
    /// Subintervals contained within this interval (kept sorted).
    subintervals: Vec<Interval>,
}

impl Interval {
    /// Attempts to create a new [`Interval`].
    ///
    /// When no name is provided, the interval takes its positional name
    /// (`contig:start-end`).
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let interval = Interval::try_new("chr1", 100, 200, None, Strand::Unknown)?;
    /// assert_eq!(interval.name(), "chr1:100-200");
    /// assert_eq!(interval.len(), 100);
    ///
    /// let err = Interval::try_new("chr1", 200, 100, None, Strand::Unknown).unwrap_err();
    /// assert_eq!(
    ///     err.to_string(),
    ///     "start position (200) is after end position (100)"
    /// );
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        contig: impl Into<String>,
        start: u64,
        end: u64,
        name: Option<String>,
        strand: Strand,
    ) -> Result<Interval, Error> {
        if start > end {
            return Err(Error::StartAfterEnd(start, end));
        }

        let contig = contig.into();
        let name = name.unwrap_or_else(|| format!("{}:{}-{}", contig, start, end));

        Ok(Interval {
            contig,
            start,
            end,
            name,
            strand,
            subintervals: Vec::new(),
        })
    }

    /// Gets the contig upon which the interval is located.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Gets the 0-based start position.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Gets the end position.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Gets the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Gets the strand upon which the interval is located.
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Gets the subintervals contained within this interval.
    pub fn subintervals(&self) -> &[Interval] {
        &self.subintervals
    }

    /// Gets the length of the interval.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let interval = Interval::try_new("chr1", 100, 250, None, Strand::Unknown)?;
    /// assert_eq!(interval.len(), 150);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Indicates whether the interval is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Gets the midpoint of the interval.
    pub fn midpoint(&self) -> u64 {
        self.start + (self.end - self.start) / 2
    }

    /// Gets the positional name of the interval (`contig:start-end`),
    /// regardless of its current display name.
    pub fn name_by_range(&self) -> String {
        format!("{}:{}-{}", self.contig, self.start, self.end)
    }

    /// Indicates whether this interval overlaps another.
    ///
    /// Two intervals overlap when they share a contig and their ranges are
    /// not strictly disjoint; bookended (touching) intervals count as
    /// overlapping. This relation is symmetric.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let a = Interval::try_new("chr1", 100, 200, None, Strand::Unknown)?;
    /// let b = Interval::try_new("chr1", 200, 300, None, Strand::Unknown)?;
    /// let c = Interval::try_new("chr1", 201, 300, None, Strand::Unknown)?;
    /// let d = Interval::try_new("chr2", 100, 200, None, Strand::Unknown)?;
    ///
    /// assert!(a.overlap(&b));
    /// assert!(b.overlap(&a));
    /// assert!(!a.overlap(&c));
    /// assert!(!a.overlap(&d));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn overlap(&self, other: &Interval) -> bool {
        self.contig == other.contig && !(other.end < self.start || other.start > self.end)
    }

    /// Merges another interval into this one.
    ///
    /// The bounds expand to the union bound when the two intervals share a
    /// contig and strand; otherwise this is a no-op. When the names differ,
    /// the merged name concatenates them. When `merge_subintervals` is set
    /// and either side carries subintervals, the other side's subintervals
    /// are appended and the list is re-flattened.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let mut a = Interval::try_new("chr1", 100, 200, Some("a".into()), Strand::Forward)?;
    /// let b = Interval::try_new("chr1", 150, 300, Some("b".into()), Strand::Forward)?;
    ///
    /// a.merge(&b, false);
    /// assert_eq!(a.start(), 100);
    /// assert_eq!(a.end(), 300);
    /// assert_eq!(a.name(), "a_b");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn merge(&mut self, other: &Interval, merge_subintervals: bool) {
        if self.contig != other.contig || self.strand != other.strand {
            return;
        }

        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);

        if other.name != self.name {
            self.name = format!("{}_{}", self.name, other.name);
        }

        if merge_subintervals && !(self.subintervals.is_empty() && other.subintervals.is_empty()) {
            self.subintervals.extend(other.subintervals.iter().cloned());
            self.flatten_subintervals();
        }
    }

    /// Unions another interval into this one.
    ///
    /// Like [`Interval::merge`], but when both sides carried their
    /// positional names before the union, the result takes the recomputed
    /// positional name of the widened bounds; otherwise the result takes the
    /// joined name `self_U_other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let mut a = Interval::try_new("chr1", 100, 200, None, Strand::Forward)?;
    /// let b = Interval::try_new("chr1", 150, 300, None, Strand::Forward)?;
    ///
    /// a.union_with(&b, false);
    /// assert_eq!(a.name(), "chr1:100-300");
    ///
    /// let mut a = Interval::try_new("chr1", 100, 200, Some("a".into()), Strand::Forward)?;
    /// a.union_with(&b, false);
    /// assert_eq!(a.name(), "a_U_chr1:150-300");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn union_with(&mut self, other: &Interval, union_subintervals: bool) {
        if self.contig != other.contig || self.strand != other.strand {
            return;
        }

        let both_positional =
            self.name == self.name_by_range() && other.name == other.name_by_range();

        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);

        if other.name != self.name {
            if both_positional {
                self.name = self.name_by_range();
            } else {
                self.name = format!("{}_U_{}", self.name, other.name);
            }
        }

        if union_subintervals && !(self.subintervals.is_empty() && other.subintervals.is_empty()) {
            self.subintervals.extend(other.subintervals.iter().cloned());
            self.union_subintervals();
        }
    }

    /// Adds subintervals, widening this interval's bounds to cover each one
    /// and keeping the subinterval list sorted.
    pub fn add_subintervals(&mut self, subintervals: impl IntoIterator<Item = Interval>) {
        for subinterval in subintervals {
            self.start = self.start.min(subinterval.start);
            self.end = self.end.max(subinterval.end);
            self.subintervals.push(subinterval);
        }

        self.subintervals.sort();
    }

    /// Flattens the subinterval list: sorts ascending by
    /// `(contig, start, end)`, then sweeps left to right merging adjacent
    /// overlapping entries. Idempotent.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let mut interval = Interval::try_new("chr1", 0, 1000, None, Strand::Forward)?;
    /// interval.add_subintervals([
    ///     Interval::try_new("chr1", 300, 400, None, Strand::Forward)?,
    ///     Interval::try_new("chr1", 100, 200, None, Strand::Forward)?,
    ///     Interval::try_new("chr1", 150, 250, None, Strand::Forward)?,
    /// ]);
    ///
    /// interval.flatten_subintervals();
    /// assert_eq!(interval.subintervals().len(), 2);
    /// assert_eq!(interval.subintervals()[0].start(), 100);
    /// assert_eq!(interval.subintervals()[0].end(), 250);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn flatten_subintervals(&mut self) {
        self.subintervals = Self::sweep(std::mem::take(&mut self.subintervals), |kept, next| {
            kept.merge(next, false)
        });
    }

    /// Unions the subinterval list: like
    /// [`Interval::flatten_subintervals`], but adjacent overlapping entries
    /// are combined with [`Interval::union_with`].
    pub fn union_subintervals(&mut self) {
        self.subintervals = Self::sweep(std::mem::take(&mut self.subintervals), |kept, next| {
            kept.union_with(next, false)
        });
    }

    /// The classic interval-merge sweep: sort, then fold each entry into the
    /// previous when they overlap.
    fn sweep(
        mut subintervals: Vec<Interval>,
        mut combine: impl FnMut(&mut Interval, &Interval),
    ) -> Vec<Interval> {
        if subintervals.is_empty() {
            return subintervals;
        }

        subintervals.sort();

        let mut swept: Vec<Interval> = Vec::with_capacity(subintervals.len());

        for subinterval in subintervals {
            match swept.last_mut() {
                Some(kept) if kept.overlap(&subinterval) => combine(kept, &subinterval),
                _ => swept.push(subinterval),
            }
        }

        swept
    }

    /// Splits the interval into the minimum number of equally-sized tiles
    /// such that their union covers the interval with consecutive tiles
    /// overlapping by `overlap`.
    ///
    /// The tile count is `ceil((len - overlap) / (tile_size - overlap))` and
    /// every tile has the optimal size
    /// `ceil((len + count * overlap - overlap) / count)` except possibly the
    /// last, which is clamped to the interval end. Tiles are numbered 5'→3'
    /// (i.e., descending when the interval is on the reverse strand); when
    /// `suffix_names` is set, each tile is named `<name>_<number>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let interval = Interval::try_new("chr1", 0, 1000, Some("amp".into()), Strand::Forward)?;
    /// let tiles = interval.tile(400, 50, true)?;
    ///
    /// assert_eq!(tiles.len(), 3);
    /// assert_eq!(tiles[0].name(), "amp_1");
    /// assert_eq!(tiles[0].start(), 0);
    /// assert_eq!(tiles.last().unwrap().end(), 1000);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn tile(
        &self,
        tile_size: u64,
        overlap: u64,
        suffix_names: bool,
    ) -> Result<Vec<Interval>, Error> {
        if tile_size <= overlap {
            return Err(Error::InvalidTileSize(tile_size, overlap));
        }

        if self.is_empty() {
            return Err(Error::EmptyInterval);
        }

        let count = ceil_div(self.len().saturating_sub(overlap), tile_size - overlap).max(1);
        let optimal = ceil_div(self.len() + count * overlap - overlap, count);

        let mut spans = Vec::new();
        let mut tile_start = self.start;

        while tile_start < self.end {
            let tile_end = (tile_start + optimal).min(self.end);
            spans.push((tile_start, tile_end));

            if tile_end == self.end {
                break;
            }

            tile_start += optimal - overlap;
        }

        let mut tiles = Vec::with_capacity(spans.len());

        for (n, (tile_start, tile_end)) in spans.iter().enumerate() {
            let number = if self.strand.is_reverse() {
                spans.len() - n
            } else {
                n + 1
            };

            let name = suffix_names.then(|| format!("{}_{}", self.name, number));
            let strand = Strand::from_reverse_flag(self.strand.is_reverse());

            tiles.push(Interval::try_new(
                self.contig.clone(),
                *tile_start,
                *tile_end,
                name,
                strand,
            )?);
        }

        Ok(tiles)
    }

    /// Extends both ends of the interval by `flank`, saturating the start at
    /// zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::core::Interval;
    /// use primercheck::core::Strand;
    ///
    /// let mut interval = Interval::try_new("chr1", 100, 200, None, Strand::Unknown)?;
    /// interval.extend(150);
    ///
    /// assert_eq!(interval.start(), 0);
    /// assert_eq!(interval.end(), 350);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn extend(&mut self, flank: u64) {
        self.start = self.start.saturating_sub(flank);
        self.end += flank;
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        (&self.contig, self.start, self.end) == (&other.contig, other.start, other.end)
    }
}

impl Eq for Interval {}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.contig, self.start, self.end).cmp(&(&other.contig, other.start, other.end))
    }
}

impl Hash for Interval {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.contig.hash(state);
        self.start.hash(state);
        self.end.hash(state);
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.contig, self.start, self.end, self.name
        )
    }
}

/// Integer division, rounding up.
fn ceil_div(numerator: u64, denominator: u64) -> u64 {
    numerator.div_ceil(denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(start: u64, end: u64) -> Interval {
        Interval::try_new("chr1", start, end, None, Strand::Forward).unwrap()
    }

    #[test]
    fn test_it_fails_construction_when_start_is_after_end() {
        let err = Interval::try_new("chr1", 10, 0, None, Strand::Unknown).unwrap_err();
        assert_eq!(err, Error::StartAfterEnd(10, 0));
    }

    #[test]
    fn test_overlap_is_symmetric_and_counts_bookended_intervals()
    -> Result<(), Box<dyn std::error::Error>> {
        let a = interval(100, 200);
        let b = interval(200, 300);

        assert!(a.overlap(&b));
        assert!(b.overlap(&a));

        let c = interval(201, 300);
        assert!(!a.overlap(&c));
        assert!(!c.overlap(&a));

        let other = Interval::try_new("chr2", 100, 200, None, Strand::Forward)?;
        assert!(!a.overlap(&other));

        Ok(())
    }

    #[test]
    fn test_equality_and_ordering_ignore_names_and_strands()
    -> Result<(), Box<dyn std::error::Error>> {
        let a = Interval::try_new("chr1", 100, 200, Some("a".into()), Strand::Forward)?;
        let b = Interval::try_new("chr1", 100, 200, Some("b".into()), Strand::Reverse)?;

        assert_eq!(a, b);
        assert!(a < interval(100, 300));
        assert!(a < interval(101, 150));

        Ok(())
    }

    #[test]
    fn test_merge_takes_union_bounds_and_concatenates_names() {
        let mut a = Interval::try_new("chr1", 100, 200, Some("a".into()), Strand::Forward).unwrap();
        let b = Interval::try_new("chr1", 50, 150, Some("b".into()), Strand::Forward).unwrap();

        a.merge(&b, false);

        assert_eq!(a.start(), 50);
        assert_eq!(a.end(), 200);
        assert_eq!(a.name(), "a_b");
    }

    #[test]
    fn test_merge_is_a_no_op_across_contigs_or_strands() {
        let mut a = interval(100, 200);

        let other_contig = Interval::try_new("chr2", 0, 500, None, Strand::Forward).unwrap();
        a.merge(&other_contig, false);
        assert_eq!((a.start(), a.end()), (100, 200));

        let other_strand = Interval::try_new("chr1", 0, 500, None, Strand::Reverse).unwrap();
        a.merge(&other_strand, false);
        assert_eq!((a.start(), a.end()), (100, 200));
    }

    #[test]
    fn test_union_with_recomputes_positional_names() {
        let mut a = interval(100, 200);
        let b = interval(150, 300);

        a.union_with(&b, false);

        assert_eq!(a.start(), 100);
        assert_eq!(a.end(), 300);
        assert_eq!(a.name(), "chr1:100-300");
    }

    #[test]
    fn test_flatten_subintervals_is_idempotent() {
        let mut outer = interval(0, 1000);
        outer.add_subintervals([
            interval(300, 400),
            interval(100, 200),
            interval(150, 250),
            interval(600, 700),
        ]);

        outer.flatten_subintervals();
        let once = outer.subintervals().to_vec();

        outer.flatten_subintervals();
        assert_eq!(outer.subintervals(), &once[..]);

        assert_eq!(once.len(), 3);
        assert_eq!((once[0].start(), once[0].end()), (100, 250));
        assert_eq!((once[1].start(), once[1].end()), (300, 400));
        assert_eq!((once[2].start(), once[2].end()), (600, 700));
    }

    #[test]
    fn test_add_subintervals_widens_the_outer_bounds() {
        let mut outer = interval(100, 200);
        outer.add_subintervals([interval(50, 120), interval(180, 400)]);

        assert_eq!(outer.start(), 50);
        assert_eq!(outer.end(), 400);
        assert_eq!(outer.subintervals().len(), 2);
    }

    #[test]
    fn test_tile_union_reconstructs_the_interval() -> Result<(), Box<dyn std::error::Error>> {
        let overlap = 50;
        let parent = Interval::try_new("chr1", 0, 1000, Some("amp".into()), Strand::Forward)?;
        let tiles = parent.tile(400, overlap, true)?;

        // Consecutive tiles overlap by exactly `overlap` and the union
        // covers the parent.
        assert_eq!(tiles.first().unwrap().start(), parent.start());
        assert_eq!(tiles.last().unwrap().end(), parent.end());

        for pair in tiles.windows(2) {
            assert_eq!(pair[0].end() - pair[1].start(), overlap);
        }

        for tile in &tiles {
            assert!(tile.len() <= 400);
            assert!(tile.len() >= 400 - overlap);
        }

        Ok(())
    }

    #[test]
    fn test_tile_numbering_is_reversed_on_the_reverse_strand()
    -> Result<(), Box<dyn std::error::Error>> {
        let parent = Interval::try_new("chr1", 0, 1000, Some("amp".into()), Strand::Reverse)?;
        let tiles = parent.tile(400, 50, true)?;

        assert_eq!(tiles.first().unwrap().name(), "amp_3");
        assert_eq!(tiles.last().unwrap().name(), "amp_1");

        Ok(())
    }

    #[test]
    fn test_tile_rejects_degenerate_inputs() {
        let parent = interval(0, 1000);
        assert_eq!(parent.tile(50, 50, false).unwrap_err(), Error::InvalidTileSize(50, 50));

        let empty = interval(100, 100);
        assert_eq!(empty.tile(400, 50, false).unwrap_err(), Error::EmptyInterval);
    }

    #[test]
    fn test_extend_saturates_the_start_at_zero() {
        let mut a = interval(100, 200);
        a.extend(150);

        assert_eq!(a.start(), 0);
        assert_eq!(a.end(), 350);
    }
}
