//! # Sequence Scopes
//!
//! Counter scope keys and the human formats built from issued values.
//! The atomic increment itself lives in `rxdesk-db`.
//!
//! | Scope key           | Used for              | Format            |
//! |---------------------|-----------------------|-------------------|
//! | `productId`         | product sequential id | plain integer     |
//! | `batchNumber`       | batch numbers         | `B000042`         |
//! | `invoice-YYYYMMDD`  | daily invoice numbers | `20251001-0007`   |

use chrono::{DateTime, Utc};

use crate::clock::BusinessClock;

pub const PRODUCT_ID_SCOPE: &str = "productId";
pub const BATCH_NUMBER_SCOPE: &str = "batchNumber";
const INVOICE_SCOPE_PREFIX: &str = "invoice-";

/// Counter scope for invoices issued on the business day containing `now`.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use rxdesk_core::clock::BusinessClock;
/// use rxdesk_core::sequence::invoice_scope;
///
/// let clock = BusinessClock::from_offset_str("+05:00").unwrap();
/// let now = Utc.with_ymd_and_hms(2025, 10, 1, 21, 30, 0).unwrap();
/// assert_eq!(invoice_scope(&clock, now), "invoice-20251002");
/// ```
pub fn invoice_scope(clock: &BusinessClock, now: DateTime<Utc>) -> String {
    format!("{}{}", INVOICE_SCOPE_PREFIX, clock.day_key(now))
}

/// Formats an invoice number from its scope and counter value.
///
/// Values above 9999 keep all their digits (`20251001-10000`).
pub fn format_invoice_number(scope: &str, seq: i64) -> String {
    let day = scope.strip_prefix(INVOICE_SCOPE_PREFIX).unwrap_or(scope);
    format!("{}-{:04}", day, seq)
}

/// `B` followed by the zero-padded counter value.
pub fn format_batch_number(seq: i64) -> String {
    format!("B{:06}", seq)
}

/// Splits `YYYYMMDD-NNNN` into its day and sequence parts.
pub fn parse_invoice_number(invoice: &str) -> Option<(&str, i64)> {
    let (day, seq) = invoice.split_once('-')?;
    if day.len() != 8 || !day.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((day, seq.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_formatting() {
        assert_eq!(format_invoice_number("invoice-20251001", 7), "20251001-0007");
        assert_eq!(format_invoice_number("invoice-20251001", 12345), "20251001-12345");
        assert_eq!(parse_invoice_number("20251001-0007"), Some(("20251001", 7)));
        assert_eq!(parse_invoice_number("2025-0007"), None);
    }

    #[test]
    fn test_batch_number_format() {
        assert_eq!(format_batch_number(42), "B000042");
        assert!(format_batch_number(1) < format_batch_number(10));
    }
}
