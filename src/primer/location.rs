//! A physical storage location for an ordered primer.
//!
//! Ordered primers live in numbered vessels (plates or boxes) at one or more
//! wells. Vessel labels arrive in whatever shape the inventory system emits
//! (`"Plate 12"`, `"12"`, …), so the vessel number is extracted rather than
//! parsed strictly.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// An error related to a storage location.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The vessel label carried no number.
    InvalidVessel(String),
    /// A well identifier was not a row letter followed by a column number.
    InvalidWell(String),
    /// Attempted to merge locations in different vessels.
    VesselMismatch(u32, u32),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidVessel(label) => write!(f, "vessel label carries no number: {}", label),
            Error::InvalidWell(well) => write!(f, "invalid well: {}", well),
            Error::VesselMismatch(a, b) => {
                write!(f, "cannot merge locations in different vessels: {} and {}", a, b)
            }
        }
    }
}

impl std::error::Error for Error {}

/// The number embedded in a vessel label.
fn vessel_number_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    // SAFETY: the expression is static and valid.
    REGEX.get_or_init(|| Regex::new(r"(\d+)").unwrap())
}

/// A well identifier: a row letter followed by a column number.
fn well_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    // SAFETY: the expression is static and valid.
    REGEX.get_or_init(|| Regex::new(r"^\w\d+$").unwrap())
}

/// A physical storage location: a vessel number and a set of wells.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    /// The vessel number.
    vessel: u32,
    /// The wells within the vessel (kept sorted).
    wells: BTreeSet<String>,
}

impl Location {
    /// Attempts to create a new [`Location`] from a vessel label and a
    /// comma-separated well list.
    ///
    /// # Examples
    ///
    /// ```
    /// use primercheck::primer::location::Location;
    ///
    /// let location = Location::try_new("Plate 12", "B2,A1")?;
    /// assert_eq!(location.vessel(), 12);
    /// assert_eq!(location.wells(), "A1,B2");
    /// assert_eq!(location.to_string(), "12-A1,B2");
    ///
    /// assert!(Location::try_new("no number here", "A1").is_err());
    /// assert!(Location::try_new("12", "A1,oops").is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(vessel: &str, wells: &str) -> Result<Location, Error> {
        let vessel = vessel_number_regex()
            .captures(vessel)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidVessel(vessel.to_string()))?;

        let wells = wells
            .split(',')
            .map(|well| {
                let well = well.trim();

                if well_regex().is_match(well) {
                    Ok(well.to_string())
                } else {
                    Err(Error::InvalidWell(well.to_string()))
                }
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Location { vessel, wells })
    }

    /// Gets the vessel number.
    pub fn vessel(&self) -> u32 {
        self.vessel
    }

    /// Gets the wells as a sorted, comma-joined string.
    pub fn wells(&self) -> String {
        self.wells.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Merges another location's wells into this one.
    ///
    /// Both locations must refer to the same vessel.
    pub fn merge(&mut self, other: &Location) -> Result<(), Error> {
        if self.vessel != other.vessel {
            return Err(Error::VesselMismatch(self.vessel, other.vessel));
        }

        self.wells.extend(other.wells.iter().cloned());

        Ok(())
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.vessel, self.wells())
    }
}
