use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    Confirmed,
    Cancelled,
    Expired,
}

/// The hot-state record for a single reservation. Only ever stored while
/// `status == Active` — a record present in the store implies its units
/// are subtracted from the SKU counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub reservation_id: String,
    pub sku: String,
    pub quantity: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

/// Response payload for a successful `reserve` call, also what gets cached
/// under the idempotency mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveOutcome {
    pub reservation_id: String,
    pub sku: String,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

/// Response payload for `status(sku)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryStatus {
    pub sku: String,
    pub available: i64,
    #[serde(default)]
    pub uninitialized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn record_round_trips_through_json() {
        let now = Utc::now();
        let record = ReservationRecord {
            reservation_id: "rsv_abc".into(),
            sku: "SKU-1".into(),
            quantity: 2,
            user_id: "user_1".into(),
            created_at: now,
            expires_at: now + Duration::seconds(300),
            status: ReservationStatus::Active,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ReservationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.reservation_id, record.reservation_id);
        assert_eq!(back.quantity, 2);
        assert_eq!(back.status, ReservationStatus::Active);
    }
}
