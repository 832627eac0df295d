//! Declarative job-record validation.
//!
//! A batch of heterogeneous job descriptions is validated record by record:
//! [`validate::validate_records`] checks each record's outer shape, parses and
//! existence-checks every declared input file, and dispatches per-field
//! validators through the explicit [`registry::ValidatorRegistry`]. Records
//! fail independently; the result sequence always matches the input length.

pub mod error;
pub mod record;
pub mod registry;
pub mod validate;
