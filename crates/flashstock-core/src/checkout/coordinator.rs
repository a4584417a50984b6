use std::sync::Arc;

use tracing::warn;

use crate::cache::{HotStore, Keys};
use crate::catalog;
use crate::error::{Error, Result};
use crate::ids;
use crate::repository::{AuditRepository, Order, OrderLine, OrderRepository};
use crate::reservation::ReservationRecord;

use super::scripts;

/// Turns a live reservation into a durable order. The hot-state delete and
/// the durable write are sequenced so a failure after the delete never
/// re-credits stock — once the reservation record is gone, the engine
/// considers the units sold.
pub struct CheckoutCoordinator {
    store: HotStore,
    orders: Arc<dyn OrderRepository>,
    audit: Arc<dyn AuditRepository>,
}

impl CheckoutCoordinator {
    pub fn new(store: HotStore, orders: Arc<dyn OrderRepository>, audit: Arc<dyn AuditRepository>) -> Self {
        Self { store, orders, audit }
    }

    pub async fn confirm(&self, user_id: &str, reservation_id: &str) -> Result<Order> {
        // Resolve price against the peeked record before the atomic delete:
        // once that script runs, the reservation's units are neither
        // available nor held, so a pricing failure afterward would strand
        // them. This peek is not authoritative for ownership/absence --
        // `take_reservation` below re-checks both against the live record.
        let peeked = self.peek_reservation(reservation_id).await?;
        catalog::price_for_sku(&peeked.sku).ok_or(Error::NotInitialized)?;

        let record = self.take_reservation(user_id, reservation_id).await?;
        let price = catalog::price_for_sku(&record.sku).ok_or(Error::NotInitialized)?;
        let items = vec![OrderLine {
            sku: record.sku.clone(),
            quantity: record.quantity,
            price_per_unit: price,
        }];

        let order_id = ids::new_order_id();
        let order = self
            .orders
            .create_order_with_items(&order_id, user_id, &items)
            .await?;

        if let Err(e) = self
            .audit
            .record(
                "confirm",
                user_id,
                Some(&record.sku),
                Some(reservation_id),
                serde_json::json!({ "order_id": order_id, "quantity": record.quantity }),
            )
            .await
        {
            warn!(error = %e, reservation_id, "failed to write confirm audit event");
        }

        Ok(order)
    }

    pub async fn order(&self, order_id: &str) -> Result<Order> {
        self.orders.find_by_id(order_id).await?.ok_or(Error::NotFound)
    }

    /// Read-only lookup, no mutation. Used to validate a reservation is
    /// priceable before committing to the atomic delete that consumes it.
    async fn peek_reservation(&self, reservation_id: &str) -> Result<ReservationRecord> {
        let reservation_key = Keys::reservation(reservation_id);
        let raw = self.store.get(&reservation_key).await?.ok_or(Error::NotFound)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Atomic optimistic delete: the reservation key is read and removed in
    /// one script invocation, so a sweeper that deletes it first causes
    /// this to observe absence rather than racing a separate transaction.
    async fn take_reservation(&self, user_id: &str, reservation_id: &str) -> Result<ReservationRecord> {
        let reservation_key = Keys::reservation(reservation_id);
        let index_key = Keys::expiring_reservations();
        let user_id_arg = user_id.to_string();
        let reservation_id_arg = reservation_id.to_string();

        let result: String = self
            .store
            .eval_script(&scripts::CONFIRM, |inv| {
                inv.key(reservation_key)
                    .key(index_key)
                    .arg(reservation_id_arg)
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
            .ok_or_else(|| Error::Other(format!("unexpected confirm script result: {}", result)))?;
        Ok(serde_json::from_str(raw)?)
    }
}
