//! Engine configuration.
//!
//! Configuration is a JSON document naming the variant stores, the SNP
//! checking policy, the alignment filter settings, and the design limits.
//! Store names and paths are explicit here; nothing is resolved against a
//! global default location.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::alignment;
use crate::primer::Check;
use crate::primer::Policy;
use crate::selection;
use crate::selection::Criterion;
use crate::selection::Limits;
use crate::variant::store;
use crate::variant::store::MemoryStore;
use crate::variant::store::TabixStore;
use crate::variant::Stores;

/// An error related to configuration.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The document could not be deserialized.
    Parse(serde_json::Error),
    /// A SNP check policy token could not be parsed.
    InvalidPolicy(String),
    /// A design limit names an unknown criterion.
    Selection(selection::Error),
    /// A variant store could not be opened.
    Store(String, store::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {}", err),
            Error::Parse(err) => write!(f, "parse error: {}", err),
            Error::InvalidPolicy(token) => {
                write!(f, "invalid snp check policy token: {}", token)
            }
            Error::Selection(err) => write!(f, "{}", err),
            Error::Store(name, err) => {
                write!(f, "store {} could not be opened: {}", name, err)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err)
    }
}

impl From<selection::Error> for Error {
    fn from(err: selection::Error) -> Self {
        Error::Selection(err)
    }
}

/// The SNP check policy selection: one token or several applied
/// conjunctively.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Used {
    /// One policy token.
    One(String),
    /// Several policy tokens.
    Many(Vec<String>),
}

impl Default for Used {
    fn default() -> Self {
        Used::Many(Vec::new())
    }
}

/// The SNP checking section.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SnpCheck {
    /// The policy tokens in use.
    #[serde(default)]
    used: Used,
    /// The configured variant stores, by name.
    #[serde(default)]
    stores: BTreeMap<String, PathBuf>,
}

/// The engine configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The SNP checking section.
    #[serde(default)]
    snpcheck: SnpCheck,
    /// The locus count at which a primer is judged non-specific.
    #[serde(default = "default_max_alignments")]
    max_alignments: usize,
    /// The number of 3'-end bases that must match for an alignment to
    /// count.
    #[serde(default = "default_end_match")]
    end_match: usize,
    /// The minimum heterodimer melting temperature for an alignment to
    /// count.
    #[serde(default = "default_tm_threshold")]
    tm_threshold: f64,
    /// The design limits, by criterion name.
    #[serde(default)]
    design_limits: BTreeMap<String, u64>,
}

fn default_max_alignments() -> usize {
    alignment::DEFAULT_MAX_ALIGNMENTS
}

fn default_end_match() -> usize {
    alignment::DEFAULT_END_MATCH
}

fn default_tm_threshold() -> f64 {
    alignment::DEFAULT_TM_THRESHOLD
}

impl Default for Config {
    fn default() -> Self {
        Config {
            snpcheck: SnpCheck::default(),
            max_alignments: default_max_alignments(),
            end_match: default_end_match(),
            tm_threshold: default_tm_threshold(),
            design_limits: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parses a configuration from a JSON string.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::config::Config;
    ///
    /// let config = Config::from_str(r#"{
    ///     "snpcheck": {
    ///         "used": "common",
    ///         "stores": { "common": "/data/common.vcf.gz" }
    ///     },
    ///     "design_limits": { "snpcount": 4, "mispriming": 2 }
    /// }"#)?;
    ///
    /// assert_eq!(config.max_alignments(), 20);
    /// assert_eq!(config.limits()?.len(), 2);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Config, Error> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parses a configuration from a reader of JSON.
    pub fn from_reader<R>(reader: R) -> Result<Config, Error>
    where
        R: Read,
    {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parses a configuration from a JSON file.
    pub fn from_path<P>(path: P) -> Result<Config, Error>
    where
        P: AsRef<Path>,
    {
        Config::from_reader(BufReader::new(File::open(path)?))
    }

    /// Gets the locus count at which a primer is judged non-specific.
    pub fn max_alignments(&self) -> usize {
        self.max_alignments
    }

    /// Gets the number of 3'-end bases that must match for an alignment to
    /// count.
    pub fn end_match(&self) -> usize {
        self.end_match
    }

    /// Gets the minimum heterodimer melting temperature for an alignment
    /// to count.
    pub fn tm_threshold(&self) -> f64 {
        self.tm_threshold
    }

    /// Gets the configured store paths, by name.
    pub fn store_paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.snpcheck.stores
    }

    /// Builds the alignment filter settings.
    pub fn alignment_settings(&self) -> alignment::Settings {
        alignment::Settings {
            tm_threshold: self.tm_threshold,
            end_match: self.end_match,
            max_alignments: self.max_alignments,
        }
    }

    /// Parses the configured SNP checking policy.
    ///
    /// A token is either a bare store name (`"common"`, plain mode) or
    /// `"<store>:<percentage>"` selecting frequency-filtered mode. With no
    /// tokens configured there is no policy; several tokens combine
    /// conjunctively.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::config::Config;
    /// use primercheck::primer::Policy;
    ///
    /// let config = Config::from_str(r#"{ "snpcheck": { "used": "gnomad:1.0" } }"#)?;
    ///
    /// match config.policy()? {
    ///     Some(Policy::Single(check)) => {
    ///         assert_eq!(check.store(), "gnomad");
    ///         assert_eq!(check.cutoff(), Some(1.0));
    ///     }
    ///     _ => unreachable!(),
    /// }
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn policy(&self) -> Result<Option<Policy>, Error> {
        let tokens = match &self.snpcheck.used {
            Used::One(token) => std::slice::from_ref(token),
            Used::Many(tokens) => tokens.as_slice(),
        };

        let mut checks = Vec::with_capacity(tokens.len());

        for token in tokens {
            checks.push(parse_check(token)?);
        }

        match NonEmpty::from_vec(checks) {
            None => Ok(None),
            Some(checks) if checks.tail.is_empty() => {
                Ok(Some(Policy::Single(checks.head)))
            }
            Some(checks) => Ok(Some(Policy::Combined(checks))),
        }
    }

    /// Parses the configured design limits.
    pub fn limits(&self) -> Result<Limits, Error> {
        let mut limits = Limits::new();

        for (name, max) in &self.design_limits {
            limits.insert(name.parse::<Criterion>()?, *max);
        }

        Ok(limits)
    }

    /// Opens every configured variant store into a registry.
    ///
    /// A store path with a tabix index alongside (`<path>.tbi`) opens as an
    /// indexed store; anything else is read fully into memory.
    pub fn open_stores(&self) -> Result<Stores, Error> {
        let mut stores = Stores::new();

        for (name, path) in &self.snpcheck.stores {
            let index = PathBuf::from(format!("{}.tbi", path.display()));

            let store: Box<dyn store::VariantStore> = if index.exists() {
                Box::new(
                    TabixStore::from_path(path)
                        .map_err(|err| Error::Store(name.clone(), err))?,
                )
            } else {
                Box::new(
                    MemoryStore::from_path(path)
                        .map_err(|err| Error::Store(name.clone(), err))?,
                )
            };

            tracing::debug!(store = name.as_str(), path = %path.display(), "opened");
            stores.insert(name.clone(), store);
        }

        Ok(stores)
    }
}

/// Parses one policy token.
fn parse_check(token: &str) -> Result<Check, Error> {
    match token.split_once(':') {
        None => Ok(Check::new(token, None)),
        Some((store, percentage)) => {
            let cutoff = percentage
                .parse::<f64>()
                .map_err(|_| Error::InvalidPolicy(token.to_string()))?;

            if store.is_empty() || !(0.0..=100.0).contains(&cutoff) {
                return Err(Error::InvalidPolicy(token.to_string()));
            }

            Ok(Check::new(store, Some(cutoff)))
        }
    }
}
