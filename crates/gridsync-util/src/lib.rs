//! Small utilities shared across the GridSync crates that don't
//! belong to any one of them: retry backoff for the append conflict
//! loop, and substitution of the legacy `{".sv":
//! "timestamp"}` sentinel some older clients still send in place of a
//! real timestamp.

pub mod backoff;
pub mod sentinel;

pub use backoff::Backoff;
