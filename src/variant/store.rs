//! Coordinate-indexed variant stores.
//!
//! A variant store answers one question: which raw variant records overlap a
//! half-open coordinate range on a named contig? Two implementations are
//! provided:
//!
//! - [`TabixStore`], backed by a bgzip-compressed, tabix-indexed variant
//!   text file — the production path for genome-scale datasets.
//! - [`MemoryStore`], which holds its records in per-contig interval trees —
//!   the path for small datasets and tests.
//!
//! Stores hand back *raw lines*; parsing and coordinate relativization
//! happen in [`crate::variant`]. An unknown contig is never an error — the
//! store simply has no data for that target and the query is empty.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::{self};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::bgzf;
use noodles::core::Position;
use noodles::csi::BinningIndex;
use noodles::tabix;
use rust_lapper::Lapper;

/// The filename extension of a tabix index.
const INDEX_EXTENSION: &str = ".tbi";

/// An error related to a variant store.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),
    /// The tabix index carried no textual header, so contig names cannot be
    /// resolved.
    MissingIndexHeader,
    /// A coordinate could not be expressed as a 1-based index position.
    InvalidPosition(u64),
    /// A stored record did not have the expected column layout.
    MalformedRecord(String),
    /// A store name was not registered.
    UnknownStore(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {}", err),
            Error::MissingIndexHeader => write!(f, "tabix index carries no header"),
            Error::InvalidPosition(position) => {
                write!(f, "invalid 1-based position: {}", position)
            }
            Error::MalformedRecord(line) => write!(f, "malformed store record: {}", line),
            Error::UnknownStore(name) => write!(f, "unknown variant store: {}", name),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// A coordinate-range query over raw variant records.
pub trait VariantStore {
    /// Returns the raw record lines overlapping `[start, end)` on the named
    /// contig.
    ///
    /// An unknown contig yields an empty result, not an error.
    fn query(&mut self, contig: &str, start: u64, end: u64) -> Result<Vec<String>, Error>;
}

/// A variant store backed by a bgzip-compressed, tabix-indexed text file.
pub struct TabixStore {
    /// The bgzf reader over the compressed variant text.
    reader: bgzf::Reader<File>,
    /// The tabix index.
    index: tabix::Index,
}

impl TabixStore {
    /// Opens a [`TabixStore`], expecting the tabix index at
    /// `<src>.tbi`.
    pub fn from_path<P>(src: P) -> Result<TabixStore, Error>
    where
        P: AsRef<Path>,
    {
        let src = src.as_ref();
        let reader = File::open(src).map(bgzf::Reader::new)?;

        let mut index_src = src.as_os_str().to_os_string();
        index_src.push(INDEX_EXTENSION);

        let index = File::open(index_src)
            .map(tabix::io::Reader::new)
            .and_then(|mut reader| reader.read_index())?;

        Ok(TabixStore { reader, index })
    }
}

impl std::fmt::Debug for TabixStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabixStore").finish_non_exhaustive()
    }
}

impl VariantStore for TabixStore {
    fn query(&mut self, contig: &str, start: u64, end: u64) -> Result<Vec<String>, Error> {
        if end <= start {
            return Ok(Vec::new());
        }

        let header = self.index.header().ok_or(Error::MissingIndexHeader)?;

        // The index keys its name set by byte string.
        let reference_sequence_id = match header
            .reference_sequence_names()
            .get_index_of(contig.as_bytes())
        {
            Some(id) => id,
            // The store has no data for this contig.
            None => return Ok(Vec::new()),
        };

        // The index is queried with 1-based, inclusive bounds.
        let interval_start =
            Position::new((start + 1) as usize).ok_or(Error::InvalidPosition(start + 1))?;
        let interval_end = Position::new(end as usize).ok_or(Error::InvalidPosition(end))?;

        let chunks = self
            .index
            .query(reference_sequence_id, (interval_start..=interval_end).into())?;

        let mut lines = Vec::new();

        for chunk in chunks {
            self.reader.seek(chunk.start())?;

            let mut buf = String::new();

            while self.reader.virtual_position() < chunk.end() {
                buf.clear();

                if self.reader.read_line(&mut buf)? == 0 {
                    break;
                }

                let line = buf.trim_end();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if record_overlaps(line, contig, start, end)? {
                    lines.push(line.to_string());
                }
            }
        }

        Ok(lines)
    }
}

/// Indicates whether a raw record's span overlaps `[start, end)` on the
/// named contig.
fn record_overlaps(line: &str, contig: &str, start: u64, end: u64) -> Result<bool, Error> {
    let mut fields = line.split_whitespace();

    let record_contig = fields
        .next()
        .ok_or_else(|| Error::MalformedRecord(line.to_string()))?;

    if record_contig != contig {
        return Ok(false);
    }

    let position = fields
        .next()
        .and_then(|field| field.parse::<u64>().ok())
        .ok_or_else(|| Error::MalformedRecord(line.to_string()))?;

    let reference_allele = fields
        .nth(1)
        .ok_or_else(|| Error::MalformedRecord(line.to_string()))?;

    let record_start = position.saturating_sub(1);
    let record_end = record_start + reference_allele.len() as u64;

    Ok(record_start < end && record_end > start)
}

/// A variant store held in memory, indexed per contig.
#[derive(Debug)]
pub struct MemoryStore {
    /// Per-contig interval trees over the stored record lines.
    inner: HashMap<String, Lapper<u64, String>>,
}

impl MemoryStore {
    /// Builds a [`MemoryStore`] from an iterator of raw record lines.
    ///
    /// Comment lines (`#`-prefixed) and blank lines are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::variant::store::MemoryStore;
    /// use primercheck::variant::store::VariantStore;
    ///
    /// let mut store = MemoryStore::from_lines([
    ///     "##fileformat=VCFv4.2",
    ///     "1\t151\trs42\tA\tT\t.\t.\tAF=0.30",
    ///     "2\t500\trs43\tG\tC\t.\t.\tAF=0.01",
    /// ])?;
    ///
    /// assert_eq!(store.query("1", 140, 160)?.len(), 1);
    /// assert!(store.query("1", 200, 300)?.is_empty());
    /// assert!(store.query("unknown", 0, 1000)?.is_empty());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_lines<I, L>(lines: I) -> Result<MemoryStore, Error>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut spans: HashMap<String, Vec<rust_lapper::Interval<u64, String>>> = HashMap::new();

        for line in lines {
            let line = line.as_ref().trim_end();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = line.split_whitespace().collect::<Vec<_>>();

            if fields.len() < 4 {
                return Err(Error::MalformedRecord(line.to_string()));
            }

            let position = fields[1]
                .parse::<u64>()
                .map_err(|_| Error::MalformedRecord(line.to_string()))?;

            let start = position.saturating_sub(1);
            let stop = start + (fields[3].len() as u64).max(1);

            spans
                .entry(fields[0].to_string())
                .or_default()
                .push(rust_lapper::Interval {
                    start,
                    stop,
                    val: line.to_string(),
                });
        }

        let inner = spans
            .into_iter()
            .map(|(contig, intervals)| (contig, Lapper::new(intervals)))
            .collect();

        Ok(MemoryStore { inner })
    }

    /// Builds a [`MemoryStore`] from a reader over raw record lines.
    pub fn from_reader<R>(reader: R) -> Result<MemoryStore, Error>
    where
        R: BufRead,
    {
        let lines = reader.lines().collect::<io::Result<Vec<_>>>()?;
        Self::from_lines(lines)
    }

    /// Builds a [`MemoryStore`] from a file of raw record lines,
    /// transparently decompressing gzip-compressed input (`.gz`/`.bgz`).
    pub fn from_path<P>(src: P) -> Result<MemoryStore, Error>
    where
        P: AsRef<Path>,
    {
        let src = src.as_ref();
        let file = File::open(src)?;

        let compressed = src
            .extension()
            .map(|extension| extension == "gz" || extension == "bgz" || extension == "bgzf")
            .unwrap_or(false);

        if compressed {
            Self::from_reader(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Self::from_reader(BufReader::new(file))
        }
    }

    /// Builds an empty [`MemoryStore`].
    pub fn empty() -> MemoryStore {
        MemoryStore {
            inner: HashMap::new(),
        }
    }
}

impl VariantStore for MemoryStore {
    fn query(&mut self, contig: &str, start: u64, end: u64) -> Result<Vec<String>, Error> {
        if end <= start {
            return Ok(Vec::new());
        }

        let lapper = match self.inner.get(contig) {
            Some(lapper) => lapper,
            None => return Ok(Vec::new()),
        };

        let mut lines = lapper
            .find(start, end)
            .map(|entry| (entry.start, entry.val.clone()))
            .collect::<Vec<_>>();

        lines.sort();

        Ok(lines.into_iter().map(|(_, line)| line).collect())
    }
}

/// A registry of named variant stores.
///
/// Policies refer to stores by name (`"common"`, `"gnomad"`, …); the caller
/// registers each configured store here once and the engine resolves names
/// at query time. Resolving an unregistered name is a configuration error.
#[derive(Default)]
pub struct Stores {
    /// The registered stores, by name.
    inner: HashMap<String, Box<dyn VariantStore>>,
}

impl Stores {
    /// Creates an empty registry.
    pub fn new() -> Stores {
        Stores::default()
    }

    /// Registers a store under a name, replacing any previous registration.
    pub fn insert(&mut self, name: impl Into<String>, store: Box<dyn VariantStore>) {
        self.inner.insert(name.into(), store);
    }

    /// Resolves a store by name.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut dyn VariantStore, Error> {
        match self.inner.get_mut(name) {
            Some(store) => Ok(store.as_mut()),
            None => Err(Error::UnknownStore(name.to_string())),
        }
    }

    /// Indicates whether a store is registered under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("names", &self.inner.keys().collect::<Vec<_>>())
            .finish()
    }
}
