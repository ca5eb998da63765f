//! Human-readable sequence numbers.
//!
//! Registration numbers look like `ETU2025007` (prefix, year, 3+ digits) and
//! receipts or invoices like `REC-2025-000042` (prefix, year, 6 digits). The
//! next number is derived from the highest one already issued for the stem.

/// Sequence following `last`, which must start with `stem`.
///
/// Returns 1 when nothing has been issued yet or the suffix is not numeric.
pub fn next_sequence(stem: &str, last: Option<&str>) -> u32 {
    last.and_then(|value| value.strip_prefix(stem))
        .and_then(|suffix| suffix.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1)
}

/// `ETU` + `2025` → stem `ETU2025`.
pub fn registration_stem(prefix: &str, year: i32) -> String {
    format!("{}{}", prefix, year)
}

pub fn registration_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}{:03}", registration_stem(prefix, year), sequence)
}

/// `REC` + `2025` → stem `REC-2025-`.
pub fn document_stem(prefix: &str, year: i32) -> String {
    format!("{}-{}-", prefix, year)
}

pub fn document_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}{:06}", document_stem(prefix, year), sequence)
}

pub const STUDENT_PREFIX: &str = "ETU";
pub const TEACHER_PREFIX: &str = "ENS";
pub const RECEIPT_PREFIX: &str = "REC";
pub const INVOICE_PREFIX: &str = "FACT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_number_of_the_year() {
        let stem = registration_stem(STUDENT_PREFIX, 2025);
        assert_eq!(next_sequence(&stem, None), 1);
        assert_eq!(registration_number(STUDENT_PREFIX, 2025, 1), "ETU2025001");
    }

    #[test]
    fn test_increments_last_issued() {
        let stem = registration_stem(TEACHER_PREFIX, 2024);
        assert_eq!(next_sequence(&stem, Some("ENS2024041")), 42);
        assert_eq!(registration_number(TEACHER_PREFIX, 2024, 42), "ENS2024042");
    }

    #[test]
    fn test_widens_past_three_digits() {
        let stem = registration_stem(STUDENT_PREFIX, 2025);
        let next = next_sequence(&stem, Some("ETU2025999"));
        assert_eq!(registration_number(STUDENT_PREFIX, 2025, next), "ETU20251000");
        assert_eq!(next_sequence(&stem, Some("ETU20251000")), 1001);
    }

    #[test]
    fn test_document_numbers() {
        let stem = document_stem(RECEIPT_PREFIX, 2025);
        assert_eq!(stem, "REC-2025-");
        assert_eq!(next_sequence(&stem, Some("REC-2025-000041")), 42);
        assert_eq!(document_number(INVOICE_PREFIX, 2025, 7), "FACT-2025-000007");
    }

    #[test]
    fn test_foreign_stem_restarts() {
        assert_eq!(next_sequence("REC-2025-", Some("REC-2024-000300")), 1);
        assert_eq!(next_sequence("ETU2025", Some("ETU2025abc")), 1);
    }
}
