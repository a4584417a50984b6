use std::time::Duration;

use tracing::debug;

use crate::cache::{HotStore, Keys};
use crate::error::Result;

use super::models::ReserveOutcome;

const PENDING_SENTINEL: &str = "<pending>";
const POLL_ATTEMPTS: u32 = 20;
const POLL_DELAY_MS: u64 = 50;

/// Outcome of consulting the idempotency mapping before a `reserve` call.
pub enum SlotOutcome {
    /// A prior call already completed; return its cached response.
    Hit(ReserveOutcome),
    /// This call acquired the slot and must perform the reserve itself.
    Acquired,
    /// A concurrent call is still in flight and never finished within the
    /// poll bound; proceed with a fresh reserve (the accepted "two
    /// decrements for one fingerprint" failure mode).
    StillPending,
}

/// Consults, and if necessary acquires, the idempotency slot for a
/// `(user_id, fingerprint)` pair. Must be called before the underlying
/// `reserve`.
pub async fn acquire_slot(
    store: &HotStore,
    user_id: &str,
    fingerprint: &str,
    ttl_seconds: u64,
) -> Result<SlotOutcome> {
    let key = Keys::idempotency(user_id, fingerprint);

    if store.set_nx_ex(&key, PENDING_SENTINEL, ttl_seconds).await? {
        return Ok(SlotOutcome::Acquired);
    }

    for _ in 0..POLL_ATTEMPTS {
        match store.get(&key).await? {
            Some(value) if value == PENDING_SENTINEL => {
                tokio::time::sleep(Duration::from_millis(POLL_DELAY_MS)).await;
            }
            Some(value) => {
                let outcome: ReserveOutcome = serde_json::from_str(&value)?;
                return Ok(SlotOutcome::Hit(outcome));
            }
            None => {
                // slot was abandoned (the original caller's reserve failed);
                // try to take it over.
                if store.set_nx_ex(&key, PENDING_SENTINEL, ttl_seconds).await? {
                    return Ok(SlotOutcome::Acquired);
                }
            }
        }
    }

    debug!(user_id, fingerprint, "idempotency slot still pending after poll bound");
    Ok(SlotOutcome::StillPending)
}

/// Records a successful `reserve` result under the fingerprint slot.
pub async fn complete(
    store: &HotStore,
    user_id: &str,
    fingerprint: &str,
    outcome: &ReserveOutcome,
    ttl_seconds: u64,
) -> Result<()> {
    let key = Keys::idempotency(user_id, fingerprint);
    let value = serde_json::to_string(outcome)?;
    store.setex(&key, ttl_seconds, &value).await
}

/// Releases the fingerprint slot after a failed `reserve` so the client can
/// retry with the same fingerprint.
pub async fn abandon(store: &HotStore, user_id: &str, fingerprint: &str) -> Result<()> {
    let key = Keys::idempotency(user_id, fingerprint);
    store.del(&key).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_shape() {
        assert_eq!(Keys::idempotency("u1", "fp1"), "idempotency:u1:fp1");
    }
}
