//! The algorithmic core: integrity checking, duplicate detection, and
//! automation rule application. Everything in here is a pure function over
//! models: no I/O, no clocks beyond the timestamps already on the data.

pub mod dedupe;
pub mod rules;
pub mod validator;

pub use dedupe::{DedupeConfig, DuplicateCandidate, DuplicateDetector};
pub use rules::{RuleOutcome, RuleWarning};
pub use validator::{repair, validate, Severity, Violation};
