//! Redis key layout for the hot-state store.

pub struct Keys;

impl Keys {
    /// Remaining-stock counter for a SKU.
    pub fn inventory(sku: &str) -> String {
        format!("inventory:{}", sku)
    }

    /// Serialized reservation record.
    pub fn reservation(reservation_id: &str) -> String {
        format!("reservation:{}", reservation_id)
    }

    /// Sorted set of active reservation ids scored by expiry unix timestamp.
    pub fn expiring_reservations() -> &'static str {
        "expiring_reservations"
    }

    /// Idempotency slot for a user+fingerprint pair.
    pub fn idempotency(user_id: &str, fingerprint: &str) -> String {
        format!("idempotency:{}:{}", user_id, fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(Keys::inventory("SKU-1"), "inventory:SKU-1");
        assert_eq!(Keys::reservation("rsv_abc"), "reservation:rsv_abc");
        assert_eq!(Keys::expiring_reservations(), "expiring_reservations");
        assert_eq!(
            Keys::idempotency("user_1", "fp_1"),
            "idempotency:user_1:fp_1"
        );
    }
}
