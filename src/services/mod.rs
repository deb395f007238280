//! # Service Utilities
//!
//! Helpers the service layer builds on top of the secure conversation:
//! status codes, continuation point paging and numeric range addressing.
//! These report [`StatusCode`] values rather than errors.

pub mod continuation;
pub mod numeric_range;
pub mod status;
pub mod variant;

pub use continuation::{ContinuationPoint, ContinuationPointManager, ContinuationResult};
pub use numeric_range::{Extracted, NumericRange};
pub use status::StatusCode;
pub use variant::{ArrayValue, Variant};
