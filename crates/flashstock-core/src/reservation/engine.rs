use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::cache::{HotStore, Keys};
use crate::config::ReservationConfig;
use crate::error::{Error, Result};
use crate::ids;
use crate::repository::AuditRepository;

use super::idempotency::{self, SlotOutcome};
use super::models::{InventoryStatus, ReservationRecord, ReservationStatus, ReserveOutcome};
use super::scripts;

/// Owns the per-SKU counters and per-reservation records. Every mutation
/// goes through a server-side script so the check-decrement-record
/// sequence on a single SKU is strictly serialized by the store itself —
/// there is no optimistic-lock retry loop here.
#[derive(Clone)]
pub struct ReservationEngine {
    store: HotStore,
    config: ReservationConfig,
    audit: Arc<dyn AuditRepository>,
}

impl ReservationEngine {
    pub fn new(store: HotStore, config: ReservationConfig, audit: Arc<dyn AuditRepository>) -> Self {
        Self { store, config, audit }
    }

    async fn record_audit(
        &self,
        event_type: &str,
        user_id: &str,
        sku: Option<&str>,
        reservation_id: Option<&str>,
        details: serde_json::Value,
    ) {
        if let Err(e) = self.audit.record(event_type, user_id, sku, reservation_id, details).await {
            warn!(error = %e, event_type, "failed to write audit event");
        }
    }

    /// Sets the SKU counter to `quantity`, overwriting any prior value.
    /// Not idempotent in the sense of "no-op on repeat" — callers are
    /// expected to gate this behind an administrative path.
    pub async fn initialize(&self, sku: &str, quantity: i64) -> Result<i64> {
        if quantity < 0 {
            return Err(Error::invalid_input("quantity must be non-negative"));
        }
        let key = Keys::inventory(sku);
        self.store.set(&key, &quantity.to_string()).await?;
        info!(sku, quantity, "inventory initialized");
        Ok(quantity)
    }

    pub async fn status(&self, sku: &str) -> Result<InventoryStatus> {
        let key = Keys::inventory(sku);
        match self.store.get(&key).await? {
            Some(raw) => {
                let available: i64 = raw
                    .parse()
                    .map_err(|_| Error::Other("corrupt inventory counter".into()))?;
                Ok(InventoryStatus {
                    sku: sku.to_string(),
                    available,
                    uninitialized: false,
                })
            }
            None => Ok(InventoryStatus {
                sku: sku.to_string(),
                available: 0,
                uninitialized: true,
            }),
        }
    }

    /// The hot path: atomic check-and-decrement, record write, and
    /// expiry-index insert in one round trip.
    pub async fn reserve(&self, user_id: &str, sku: &str, quantity: i64) -> Result<ReserveOutcome> {
        if quantity <= 0 || quantity > self.config.max_quantity_per_reservation {
            return Err(Error::invalid_input(format!(
                "quantity must be between 1 and {}",
                self.config.max_quantity_per_reservation
            )));
        }

        let reservation_id = ids::new_reservation_id();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.ttl_seconds as i64);

        let record = ReservationRecord {
            reservation_id: reservation_id.clone(),
            sku: sku.to_string(),
            quantity,
            user_id: user_id.to_string(),
            created_at: now,
            expires_at,
            status: ReservationStatus::Active,
        };
        let record_json = serde_json::to_string(&record)?;

        let inventory_key = Keys::inventory(sku);
        let reservation_key = Keys::reservation(&reservation_id);
        let index_key = Keys::expiring_reservations();
        let expires_at_score = expires_at.timestamp();

        let result: String = self
            .store
            .eval_script(&scripts::RESERVE, |inv| {
                inv.key(inventory_key)
                    .key(reservation_key)
                    .key(index_key)
                    .arg(quantity)
                    .arg(record_json)
                    .arg(expires_at_score)
                    .arg(reservation_id.clone());
            })
            .await?;

        if result == "NOT_INITIALIZED" {
            return Err(Error::NotInitialized);
        }
        if let Some(available) = result.strip_prefix("INSUFFICIENT:") {
            let available: i64 = available.parse().unwrap_or(0);
            self.record_audit(
                "oversell_blocked",
                user_id,
                Some(sku),
                None,
                serde_json::json!({ "requested": quantity, "available": available }),
            )
            .await;
            return Err(Error::Insufficient { available });
        }
        if result != "OK" {
            return Err(Error::Other(format!("unexpected reserve script result: {}", result)));
        }

        self.record_audit(
            "reserve",
            user_id,
            Some(sku),
            Some(&reservation_id),
            serde_json::json!({ "quantity": quantity }),
        )
        .await;

        Ok(ReserveOutcome {
            reservation_id,
            sku: sku.to_string(),
            quantity,
            expires_at,
            ttl_seconds: self.config.ttl_seconds,
        })
    }

    /// `reserve`, but consulting the idempotency mapping first when a
    /// fingerprint is supplied. A fingerprint-less call always performs a
    /// fresh reserve.
    pub async fn reserve_idempotent(
        &self,
        user_id: &str,
        sku: &str,
        quantity: i64,
        fingerprint: Option<&str>,
    ) -> Result<ReserveOutcome> {
        let Some(fingerprint) = fingerprint else {
            return self.reserve(user_id, sku, quantity).await;
        };

        match idempotency::acquire_slot(&self.store, user_id, fingerprint, self.config.ttl_seconds).await? {
            SlotOutcome::Hit(outcome) => Ok(outcome),
            SlotOutcome::Acquired => match self.reserve(user_id, sku, quantity).await {
                Ok(outcome) => {
                    idempotency::complete(
                        &self.store,
                        user_id,
                        fingerprint,
                        &outcome,
                        self.config.idempotency_ttl_seconds,
                    )
                    .await?;
                    Ok(outcome)
                }
                Err(e) => {
                    idempotency::abandon(&self.store, user_id, fingerprint).await?;
                    Err(e)
                }
            },
            SlotOutcome::StillPending => self.reserve(user_id, sku, quantity).await,
        }
    }

    /// Owner-initiated release. Restores the counter and removes the
    /// record and expiry-index entry.
    pub async fn cancel(&self, user_id: &str, reservation_id: &str) -> Result<()> {
        let record = self.release(reservation_id, Some(user_id)).await?;
        match record {
            Some(record) => {
                self.record_audit(
                    "cancel",
                    user_id,
                    Some(&record.sku),
                    Some(reservation_id),
                    serde_json::json!({ "quantity": record.quantity }),
                )
                .await;
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    /// Sweeper-initiated release. No ownership check; absence is a benign
    /// race with a concurrent confirm/cancel, not an error.
    pub async fn expire(&self, reservation_id: &str) -> Result<Option<ReservationRecord>> {
        match self.release(reservation_id, None).await {
            Ok(Some(record)) => {
                self.record_audit(
                    "expire",
                    &record.user_id,
                    Some(&record.sku),
                    Some(reservation_id),
                    serde_json::json!({ "quantity": record.quantity }),
                )
                .await;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(Error::NotFound) => {
                warn!(reservation_id, "expire raced with confirm/cancel, already terminal");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn release(
        &self,
        reservation_id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<ReservationRecord>> {
        let reservation_key = Keys::reservation(reservation_id);
        let index_key = Keys::expiring_reservations();
        let user_id_arg = user_id.unwrap_or("").to_string();
        let reservation_id = reservation_id.to_string();

        let result: String = self
            .store
            .eval_script(&scripts::CANCEL_OR_EXPIRE, |inv| {
                inv.key(reservation_key)
                    .key(index_key)
                    .arg(reservation_id)
                    .arg(user_id_arg);
            })
            .await?;

        if result == "ABSENT" {
            return Err(Error::NotFound);
        }
        if result == "FORBIDDEN" {
            return Err(Error::Forbidden);
        }
        let raw = result
            .strip_prefix("OK:")
            .ok_or_else(|| Error::Other(format!("unexpected release script result: {}", result)))?;
        let record: ReservationRecord = serde_json::from_str(raw)?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_quantity_above_cap() {
        let config = ReservationConfig::default();
        assert!(config.max_quantity_per_reservation > 0);
    }
}
