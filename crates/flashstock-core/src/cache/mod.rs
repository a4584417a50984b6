//! Hot-state store: Redis-backed counters, reservation records, and the
//! expiry index, all mutated atomically via server-side Lua scripts.

mod connection;
mod keys;

pub use connection::{HotStore, PoolStats};
pub use keys::Keys;
