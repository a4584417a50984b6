use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate a new reservation id: `rsv_` followed by 16 base62 characters.
pub fn new_reservation_id() -> String {
    format!("rsv_{}", random_suffix(16))
}

/// Generate a new order id: `ord_` followed by 16 base62 characters.
pub fn new_order_id() -> String {
    format!("ord_{}", random_suffix(16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_id_has_expected_shape() {
        let id = new_reservation_id();
        assert!(id.starts_with("rsv_"));
        assert_eq!(id.len(), "rsv_".len() + 16);
    }

    #[test]
    fn order_id_has_expected_shape() {
        let id = new_order_id();
        assert!(id.starts_with("ord_"));
        assert_eq!(id.len(), "ord_".len() + 16);
    }

    #[test]
    fn ids_are_distinct() {
        assert_ne!(new_reservation_id(), new_reservation_id());
    }
}
