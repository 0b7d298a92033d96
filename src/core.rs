//! Core functionality used across the crate.

pub mod interval;
pub mod locus;
pub mod strand;

pub use interval::Interval;
pub use locus::Locus;
pub use strand::Strand;
