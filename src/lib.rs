//! `primercheck` is a crate for scoring PCR primer pairs for genomic
//! specificity and variant safety.
//!
//! Candidate primer pairs are produced by an external thermodynamic design
//! tool and aligned genome-wide by an external short-read aligner; this
//! crate owns everything in between and after: the coordinate model of
//! [intervals](crate::core::Interval) and [mapped loci](crate::core::Locus),
//! the ingest of [aligner hits](crate::alignment) into per-primer
//! specificity evidence, the [variant overlap queries](crate::variant) that
//! surface known variation under a primer's binding site, and the
//! [multi-criterion ranking](crate::selection) that picks the best
//! acceptable pair.
//!
//! ## Scoring a candidate pair
//!
//! A [`Primer`](crate::primer::Primer) carries its sequence, its intended
//! binding site, and two evidence streams: genome-wide mapped loci and
//! overlapping variants. A [`PrimerPair`](crate::pair::PrimerPair)
//! aggregates both into its scoring surface.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use primercheck::pair::PrimerPair;
//! use primercheck::primer::Primer;
//!
//! let left = Rc::new(RefCell::new(Primer::try_new(
//!     "KRAS_0_LEFT",
//!     "ACGTACGTACGTACGTACGT",
//!     None,
//!     None,
//! )?));
//! let right = Rc::new(RefCell::new(Primer::try_new(
//!     "KRAS_0_RIGHT",
//!     "TGCATGCATGCATGCATGCA",
//!     None,
//!     None,
//! )?));
//!
//! left.borrow_mut().add_target("12", 25_398_100, false, None);
//! right.borrow_mut().add_target("12", 25_398_400, true, None);
//!
//! let mut pair = PrimerPair::try_new("KRAS_0", vec![left, right])?;
//!
//! let amplicons = pair.amplicons(primercheck::pair::DEFAULT_SIZE_RANGE, true)?;
//! assert_eq!(amplicons.len(), 1);
//! assert_eq!(pair.mispriming()?, 0);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Checking for underlying variation
//!
//! Variant evidence comes from coordinate-indexed stores registered in a
//! [`Stores`](crate::variant::Stores) registry and queried under a
//! configured [`Policy`](crate::primer::Policy). A policy is a single named
//! store with an optional allele-frequency cutoff, or several such checks
//! applied conjunctively.
//!
//! ```
//! use primercheck::config::Config;
//!
//! let config = Config::from_str(r#"{
//!     "snpcheck": { "used": "common:1.0" },
//!     "design_limits": { "snpcount": 4, "criticalsnp": 0, "mispriming": 2 }
//! }"#)?;
//!
//! assert!(config.policy()?.is_some());
//! assert_eq!(config.limits()?.len(), 3);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The selected design for a target is then
//! [`selection::select`](crate::selection::select) over the candidate
//! pairs.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod alignment;
pub mod config;
pub mod core;
pub mod design;
pub mod pair;
pub mod primer;
pub mod selection;
pub mod thermo;
pub mod variant;

pub use config::Config;
pub use pair::PrimerPair;
pub use primer::Primer;
