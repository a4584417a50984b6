use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Static price list keyed by SKU. Flash-sale SKUs are provisioned ahead of
/// time; there is no admin endpoint to add one at runtime.
static CATALOG: Lazy<HashMap<&'static str, Decimal>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("SKU-WIDGET-001", dec!(19.99));
    m.insert("SKU-WIDGET-002", dec!(24.99));
    m.insert("SKU-GADGET-001", dec!(49.99));
    m.insert("SKU-GADGET-002", dec!(89.99));
    m.insert("SKU-LIMITED-001", dec!(149.99));
    m
});

/// Look up the unit price for a SKU. `None` means the SKU is not part of
/// the flash-sale catalogue and reservations against it should fail with
/// `Error::NotInitialized` upstream.
pub fn price_for_sku(sku: &str) -> Option<Decimal> {
    CATALOG.get(sku).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sku_has_price() {
        assert_eq!(price_for_sku("SKU-WIDGET-001"), Some(dec!(19.99)));
    }

    #[test]
    fn unknown_sku_has_no_price() {
        assert_eq!(price_for_sku("SKU-DOES-NOT-EXIST"), None);
    }
}
