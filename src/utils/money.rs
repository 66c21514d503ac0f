/// Converts a major-unit amount (reais) to integer minor units (centavos).
///
/// Rounds half away from zero (`f64::round` semantics): `to_cents(0.005)`
/// is 1. Applied exactly once per amount, at the point an order leaves for
/// the attribution service; the gateway keeps speaking major units.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_exact_amounts() {
        assert_eq!(to_cents(19.9), 1990);
        assert_eq!(to_cents(49.90), 4990);
        assert_eq!(to_cents(0.0), 0);
        assert_eq!(to_cents(100.0), 10000);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(to_cents(0.005), 1);
        assert_eq!(to_cents(0.004), 0);
        assert_eq!(to_cents(0.125), 13);
    }
}
