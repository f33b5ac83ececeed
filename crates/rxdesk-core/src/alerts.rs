//! # Stock Alerts
//!
//! Classifies batches by expiry and products by summed stock.
//!
//! ```text
//!  past ◄─────────── today ───────────── today + 30d ──────────► future
//!        EXPIRED      │    EXPIRING SOON      │        (no alert)
//!     expiry < today  │ today ≤ expiry ≤ +30d │
//!
//!  LOW STOCK: Σ batch.quantity (expired included) ≤ threshold
//! ```

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Batch, ProductStock};
use crate::{DEFAULT_EXPIRING_WITHIN_DAYS, DEFAULT_LOW_STOCK_THRESHOLD};

/// Tunables for [`build_alerts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    pub low_stock: i64,
    pub expiring_within_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        AlertThresholds {
            low_stock: DEFAULT_LOW_STOCK_THRESHOLD,
            expiring_within_days: DEFAULT_EXPIRING_WITHIN_DAYS,
        }
    }
}

/// A batch flagged for expiry, with its product's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BatchAlert {
    #[serde(flatten)]
    pub batch: Batch,
    pub product_name: String,
    /// Negative once expired.
    pub days_until_expiry: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockAlert {
    pub product_id: String,
    pub sequential_id: i64,
    pub product_name: String,
    pub total_quantity: i64,
}

/// Dashboard alert payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Alerts {
    pub expired_batches: Vec<BatchAlert>,
    pub expiring_soon_batches: Vec<BatchAlert>,
    pub low_stock_products: Vec<LowStockAlert>,
}

/// Builds the alert payload.
///
/// `batches` pairs every batch with its product name. Batches with no
/// units left raise no expiry alert.
pub fn build_alerts(
    batches: Vec<(Batch, String)>,
    products: &[ProductStock],
    today: NaiveDate,
    thresholds: AlertThresholds,
) -> Alerts {
    let horizon = Duration::try_days(thresholds.expiring_within_days.max(0))
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(NaiveDate::MAX);
    let mut alerts = Alerts::default();

    for (batch, product_name) in batches {
        if batch.quantity <= 0 {
            continue;
        }
        let days_until_expiry = (batch.expiry_date - today).num_days();
        let alert = BatchAlert {
            batch,
            product_name,
            days_until_expiry,
        };
        if alert.batch.expiry_date < today {
            alerts.expired_batches.push(alert);
        } else if alert.batch.expiry_date <= horizon {
            alerts.expiring_soon_batches.push(alert);
        }
    }

    alerts.expired_batches.sort_by_key(|a| a.batch.expiry_date);
    alerts.expiring_soon_batches.sort_by_key(|a| a.batch.expiry_date);

    alerts.low_stock_products = products
        .iter()
        .filter(|p| p.total_quantity <= thresholds.low_stock)
        .map(|p| LowStockAlert {
            product_id: p.product.id.clone(),
            sequential_id: p.product.sequential_id,
            product_name: p.product.name.clone(),
            total_quantity: p.total_quantity,
        })
        .collect();
    alerts.low_stock_products.sort_by_key(|a| a.total_quantity);

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::Product;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(id: &str, expiry: NaiveDate, qty: i64) -> (Batch, String) {
        (
            Batch {
                id: id.into(),
                product_id: "p1".into(),
                batch_number: format!("B-{}", id),
                supplier: None,
                expiry_date: expiry,
                quantity: qty,
                cost_price: Money::from_cents(100),
                created_at: Utc::now(),
            },
            "Cetirizine".into(),
        )
    }

    fn product(id: &str, total: i64) -> ProductStock {
        let now = Utc::now();
        ProductStock {
            product: Product {
                id: id.into(),
                sequential_id: 1,
                name: format!("Product {}", id),
                category: "General".into(),
                price: Money::from_cents(100),
                description: None,
                created_at: now,
                updated_at: now,
            },
            total_quantity: total,
        }
    }

    #[test]
    fn test_huge_window_saturates() {
        let today = date(2025, 10, 1);
        let alerts = build_alerts(
            vec![batch("far", date(2200, 1, 1), 3)],
            &[],
            today,
            AlertThresholds {
                low_stock: 10,
                expiring_within_days: 1_000_000_000,
            },
        );
        assert_eq!(alerts.expiring_soon_batches.len(), 1);

        let alerts = build_alerts(
            vec![batch("far", date(2200, 1, 1), 3)],
            &[],
            today,
            AlertThresholds {
                low_stock: 10,
                expiring_within_days: i64::MAX,
            },
        );
        assert_eq!(alerts.expiring_soon_batches.len(), 1);
    }

    #[test]
    fn test_expiry_boundaries() {
        let today = date(2025, 10, 1);
        let alerts = build_alerts(
            vec![
                batch("yesterday", date(2025, 9, 30), 3),
                batch("today", today, 3),
                batch("day30", date(2025, 10, 31), 3),
                batch("day31", date(2025, 11, 1), 3),
                batch("empty", date(2025, 9, 1), 0),
            ],
            &[],
            today,
            AlertThresholds::default(),
        );

        let ids = |list: &[BatchAlert]| -> Vec<String> {
            list.iter().map(|a| a.batch.id.clone()).collect()
        };
        let expired = ids(alerts.expired_batches.as_slice());
        let soon = ids(alerts.expiring_soon_batches.as_slice());
        assert_eq!(expired, vec!["yesterday"]);
        assert_eq!(soon, vec!["today", "day30"]);
        assert_eq!(alerts.expired_batches[0].days_until_expiry, -1);
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        let alerts = build_alerts(
            vec![],
            &[product("a", 10), product("b", 11), product("c", 0)],
            date(2025, 10, 1),
            AlertThresholds::default(),
        );
        let ids: Vec<_> = alerts.low_stock_products.iter().map(|a| a.product_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }
}
