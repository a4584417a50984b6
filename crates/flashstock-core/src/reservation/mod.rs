//! The reservation lifecycle: atomic check-and-decrement, time-bounded
//! holds, and the idempotency layer in front of `reserve`.

mod engine;
mod idempotency;
mod models;
mod scripts;

pub use engine::ReservationEngine;
pub use models::{InventoryStatus, ReservationRecord, ReservationStatus, ReserveOutcome};
