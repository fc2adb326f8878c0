//! Timezone sensor services.
//!
//! # Responsibility
//! - Detect novel timezone ids and build records for them.
//! - Fan records out to storage, observer and broadcast sinks.
//! - Drive the sensor lifecycle from OS and control signals.

pub mod change_detector;
pub mod fanout;
pub mod record_factory;
pub mod sensor;
pub mod sync_trigger;
