/// Rounds to two decimal places, half away from zero.
///
/// Amounts and averages are stored as `DOUBLE PRECISION` and always pass
/// through here before being persisted or compared.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.346), 12.35);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(0.0), 0.0);
    }
}
