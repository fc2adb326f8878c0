//! Domain model for timezone history.
//!
//! # Responsibility
//! - Define the canonical record produced for every novel timezone change.
//! - Keep record fields read-only after construction.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - A record's fields never change once built, so it can be shared across
//!   sinks during fan-out without copying.

pub mod timezone_record;
