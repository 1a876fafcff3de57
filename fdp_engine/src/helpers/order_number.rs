use chrono::{DateTime, Utc};
use rand::Rng;

/// Generates a human-readable order number, `ORD-<unix millis>-<4 random digits>`.
///
/// Order numbers are not guaranteed unique. The database enforces uniqueness, so two orders placed in the same
/// millisecond that also draw the same digits will have the second one rejected.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD-{}-{suffix:04}", now.timestamp_millis())
}

pub fn is_valid_order_number(s: &str) -> bool {
    let mut parts = s.split('-');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some("ORD"), Some(millis), Some(digits), None)
            if !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit())
                && digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit())
    )
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn format() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let number = generate_order_number(now);
        assert!(number.starts_with("ORD-1700000000123-"), "{number}");
        assert!(is_valid_order_number(&number), "{number}");
    }

    #[test]
    fn validation() {
        assert!(is_valid_order_number("ORD-1-0042"));
        assert!(!is_valid_order_number("ORD-1-42"));
        assert!(!is_valid_order_number("ORD--0042"));
        assert!(!is_valid_order_number("INV-1-0042"));
        assert!(!is_valid_order_number("ORD-1-0042-1"));
    }
}
