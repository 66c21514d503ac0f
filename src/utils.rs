use chrono::Utc;
use uuid::Uuid;

pub mod money;
pub mod signature;

/// Strips everything but ASCII digits. Used for CPF/CNPJ and phone
/// normalization before hitting the gateway.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalizes a Brazilian phone number to digits with the 55 country prefix.
pub fn normalize_phone(input: &str) -> String {
    let digits = digits_only(input);
    if digits.is_empty() || digits.starts_with("55") {
        digits
    } else {
        format!("55{}", digits)
    }
}

/// Locally unique order id: millisecond timestamp plus a random suffix.
/// Practical collision avoidance only, no global uniqueness claim.
pub fn new_order_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ord_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_strips_punctuation() {
        assert_eq!(digits_only("123.456.789-09"), "12345678909");
        assert_eq!(digits_only("(11) 98765-4321"), "11987654321");
        assert_eq!(digits_only(""), "");
    }

    #[test]
    fn phone_gains_country_prefix_once() {
        assert_eq!(normalize_phone("(11) 98765-4321"), "5511987654321");
        assert_eq!(normalize_phone("5511987654321"), "5511987654321");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn order_ids_carry_prefix_and_differ() {
        let a = new_order_id();
        let b = new_order_id();
        assert!(a.starts_with("ord_"));
        assert_ne!(a, b);
    }
}
