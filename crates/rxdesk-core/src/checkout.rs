//! # Checkout Engine (pure half)
//!
//! Everything checkout decides before touching storage: cart merging,
//! FEFO allocation, pricing, change, and refund slicing.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart [{P1, 3}, {P2, 1}, {P1, 4}]                                       │
//! │     │                                                                   │
//! │     ▼  merge_cart_lines          → [{P1, 7}, {P2, 1}]                  │
//! │     ▼  allocate_fefo (per line)  → P1: B1×5, B2×2   (earliest expiry)  │
//! │     ▼  price at product.price    → line totals, subTotal, total        │
//! │     ▼  settle_payment            → change (cash) or 0 (card)           │
//! │     │                                                                   │
//! │  CheckoutPlan ──► rxdesk-db runs it in one transaction:                │
//! │                   invoice number, sale insert, conditional decrements  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentDetails, PaymentType, Sale, SaleItem};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Inputs
// =============================================================================

/// One requested cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Payment as tendered by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentRequest {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub cash_received: Option<Money>,
}

impl PaymentRequest {
    pub fn cash(received: Money) -> Self {
        PaymentRequest {
            payment_type: PaymentType::Cash,
            cash_received: Some(received),
        }
    }

    pub fn card() -> Self {
        PaymentRequest {
            payment_type: PaymentType::Card,
            cash_received: None,
        }
    }
}

/// A batch as seen by the allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLot {
    pub batch_id: String,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
}

impl StockLot {
    pub fn new(
        batch_id: impl Into<String>,
        batch_number: impl Into<String>,
        expiry_date: NaiveDate,
        quantity: i64,
    ) -> Self {
        StockLot {
            batch_id: batch_id.into(),
            batch_number: batch_number.into(),
            expiry_date,
            quantity,
        }
    }
}

/// A product with its current price and every batch it owns.
#[derive(Debug, Clone)]
pub struct StockedProduct {
    pub product_id: String,
    pub name: String,
    pub price: Money,
    pub lots: Vec<StockLot>,
}

impl StockedProduct {
    pub fn available(&self) -> i64 {
        self.lots.iter().map(|l| l.quantity.max(0)).sum()
    }
}

// =============================================================================
// Cart Merging
// =============================================================================

/// Validates a cart and merges repeated products.
///
/// Quantities of the same product are summed; first-seen order is kept.
///
/// ```rust
/// use rxdesk_core::checkout::{merge_cart_lines, CartLine};
///
/// let merged = merge_cart_lines(&[
///     CartLine::new("p1", 3),
///     CartLine::new("p2", 1),
///     CartLine::new("p1", 4),
/// ]).unwrap();
/// assert_eq!(merged, vec![CartLine::new("p1", 7), CartLine::new("p2", 1)]);
/// ```
pub fn merge_cart_lines(lines: &[CartLine]) -> CoreResult<Vec<CartLine>> {
    validate_cart_size(lines.len())?;

    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::required("productId").into());
        }
        validate_quantity(line.quantity)?;

        match index.get(line.product_id.as_str()) {
            Some(&i) => merged[i].quantity += line.quantity,
            None => {
                index.insert(line.product_id.as_str(), merged.len());
                merged.push(line.clone());
            }
        }
    }

    for line in &merged {
        if line.quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            }
            .into());
        }
    }

    Ok(merged)
}

// =============================================================================
// FEFO Allocation
// =============================================================================

/// Quantity drawn from one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedSlice {
    pub batch_id: String,
    pub batch_number: String,
    pub quantity: i64,
}

/// Not enough stock across all lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortage {
    pub available: i64,
    pub requested: i64,
}

/// First-Expiring-First-Out allocation.
///
/// Lots are drained in `expiry_date` order (ties by batch number). Empty
/// lots are skipped. Expired lots are still sellable.
///
/// ## Example
/// ```text
/// B1 exp 2025-01-01 qty 5  ─┐
/// B2 exp 2025-06-01 qty 5  ─┼─ request 7 ─► [B1×5, B2×2]
/// ```
pub fn allocate_fefo(lots: &[StockLot], requested: i64) -> Result<Vec<AllocatedSlice>, Shortage> {
    let available: i64 = lots.iter().map(|l| l.quantity.max(0)).sum();
    if requested <= 0 || available < requested {
        return Err(Shortage { available, requested });
    }

    let mut ordered: Vec<&StockLot> = lots.iter().filter(|l| l.quantity > 0).collect();
    ordered.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.batch_number.cmp(&b.batch_number))
    });

    let mut remaining = requested;
    let mut slices = Vec::new();
    for lot in ordered {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(lot.quantity);
        slices.push(AllocatedSlice {
            batch_id: lot.batch_id.clone(),
            batch_number: lot.batch_number.clone(),
            quantity: take,
        });
        remaining -= take;
    }

    Ok(slices)
}

// =============================================================================
// Payment
// =============================================================================

/// Settles a payment against a total.
///
/// - Card: `cashReceived` is ignored and change is zero.
/// - Cash: `cashReceived` is required and must cover the total.
pub fn settle_payment(total: Money, payment: &PaymentRequest) -> CoreResult<PaymentDetails> {
    match payment.payment_type {
        PaymentType::Card => Ok(PaymentDetails {
            payment_type: PaymentType::Card,
            cash_received: None,
            change: Some(Money::zero()),
        }),
        PaymentType::Cash => {
            let received = payment.cash_received.ok_or_else(|| CoreError::InvalidPayment {
                reason: "cashReceived is required for cash payments".to_string(),
            })?;
            if received.is_negative() {
                return Err(CoreError::InvalidPayment {
                    reason: "cashReceived must not be negative".to_string(),
                });
            }
            let change = received - total;
            if change.is_negative() {
                return Err(CoreError::cash_short(total, received));
            }
            Ok(PaymentDetails {
                payment_type: PaymentType::Cash,
                cash_received: Some(received),
                change: Some(change),
            })
        }
    }
}

// =============================================================================
// Checkout Plan
// =============================================================================

/// Everything a sale needs except its id, invoice number and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub items: Vec<SaleItem>,
    pub sub_total: Money,
    pub total: Money,
    pub payment: PaymentDetails,
}

impl CheckoutPlan {
    /// Units to take from each batch, one entry per slice.
    pub fn decrements(&self) -> impl Iterator<Item = (&str, i64)> {
        self.items.iter().map(|i| (i.batch_id.as_str(), i.quantity))
    }
}

/// Prices and allocates an already-merged cart.
///
/// `products` must hold every product the cart names, each with all of its
/// batches. Fails on the first line that cannot be satisfied; nothing
/// partial is returned.
pub fn plan_checkout(
    lines: &[CartLine],
    products: &[StockedProduct],
    payment: &PaymentRequest,
) -> CoreResult<CheckoutPlan> {
    let mut items = Vec::new();

    for line in lines {
        let product = products
            .iter()
            .find(|p| p.product_id == line.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let slices = allocate_fefo(&product.lots, line.quantity).map_err(|s| {
            CoreError::InsufficientStock {
                product_id: product.product_id.clone(),
                product_name: product.name.clone(),
                available: s.available,
                requested: s.requested,
            }
        })?;

        for slice in slices {
            let line_total = product
                .price
                .checked_multiply_quantity(slice.quantity)
                .ok_or_else(|| CoreError::amount_overflow("lineTotal"))?;
            items.push(SaleItem {
                product_id: product.product_id.clone(),
                product_name: product.name.clone(),
                batch_id: slice.batch_id,
                batch_number: slice.batch_number,
                quantity: slice.quantity,
                unit_price: product.price,
                line_total,
            });
        }
    }

    let sub_total = Money::checked_sum(items.iter().map(|i| i.line_total))
        .ok_or_else(|| CoreError::amount_overflow("total"))?;
    let total = sub_total;
    let payment = settle_payment(total, payment)?;

    Ok(CheckoutPlan {
        items,
        sub_total,
        total,
        payment,
    })
}

// =============================================================================
// Refunds
// =============================================================================

/// A partial refund request for one batch slice of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefundLine {
    pub batch_id: String,
    pub quantity: i64,
}

/// Builds the negative items of a refund record.
///
/// `already_refunded` maps batch id to units refunded by earlier refund
/// records of the same sale. With `lines = None` everything still
/// refundable is refunded.
pub fn plan_refund(
    original: &Sale,
    already_refunded: &HashMap<String, i64>,
    lines: Option<&[RefundLine]>,
) -> CoreResult<Vec<SaleItem>> {
    if original.is_refund() || original.refund_of.is_some() {
        return Err(CoreError::NotRefundable {
            sale_id: original.id.clone(),
            reason: "refund records cannot be refunded".to_string(),
        });
    }

    let refundable = |item: &SaleItem| {
        item.quantity - already_refunded.get(&item.batch_id).copied().unwrap_or(0)
    };

    let mut items = Vec::new();
    match lines {
        None => {
            for item in &original.items {
                let qty = refundable(item);
                if qty > 0 {
                    items.push(negated(item, qty));
                }
            }
        }
        Some(lines) => {
            let mut requested: Vec<(&str, i64)> = Vec::new();
            for line in lines {
                if line.quantity <= 0 {
                    return Err(ValidationError::MustBePositive {
                        field: "quantity".to_string(),
                    }
                    .into());
                }
                match requested.iter_mut().find(|(b, _)| *b == line.batch_id) {
                    Some(entry) => entry.1 += line.quantity,
                    None => requested.push((line.batch_id.as_str(), line.quantity)),
                }
            }

            for (batch_id, qty) in requested {
                let item = original
                    .items
                    .iter()
                    .find(|i| i.batch_id == batch_id)
                    .ok_or_else(|| CoreError::RefundExceedsSale {
                        batch_id: batch_id.to_string(),
                        requested: qty,
                        refundable: 0,
                    })?;
                let left = refundable(item);
                if qty > left {
                    return Err(CoreError::RefundExceedsSale {
                        batch_id: batch_id.to_string(),
                        requested: qty,
                        refundable: left.max(0),
                    });
                }
                items.push(negated(item, qty));
            }
        }
    }

    if items.is_empty() {
        return Err(CoreError::NotRefundable {
            sale_id: original.id.clone(),
            reason: "nothing left to refund".to_string(),
        });
    }

    Ok(items)
}

fn negated(item: &SaleItem, qty: i64) -> SaleItem {
    SaleItem {
        product_id: item.product_id.clone(),
        product_name: item.product_name.clone(),
        batch_id: item.batch_id.clone(),
        batch_number: item.batch_number.clone(),
        quantity: -qty,
        unit_price: item.unit_price,
        line_total: -item.unit_price.multiply_quantity(qty),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_CART_ITEMS;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paracetamol() -> StockedProduct {
        StockedProduct {
            product_id: "p1".into(),
            name: "Paracetamol 500mg".into(),
            price: Money::from_cents(425),
            lots: vec![
                StockLot::new("b2", "B000002", date(2025, 6, 1), 5),
                StockLot::new("b1", "B000001", date(2025, 1, 1), 5),
            ],
        }
    }

    #[test]
    fn test_fefo_draws_earliest_expiry_first() {
        let slices = allocate_fefo(&paracetamol().lots, 7).unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!((slices[0].batch_id.as_str(), slices[0].quantity), ("b1", 5));
        assert_eq!((slices[1].batch_id.as_str(), slices[1].quantity), ("b2", 2));
    }

    #[test]
    fn test_fefo_skips_empty_lots_and_breaks_ties_by_number() {
        let lots = vec![
            StockLot::new("empty", "B000001", date(2024, 1, 1), 0),
            StockLot::new("late", "B000009", date(2025, 3, 1), 4),
            StockLot::new("early", "B000003", date(2025, 3, 1), 4),
        ];
        let slices = allocate_fefo(&lots, 5).unwrap();
        assert_eq!(slices[0].batch_id, "early");
        assert_eq!(slices[0].quantity, 4);
        assert_eq!(slices[1].batch_id, "late");
        assert_eq!(slices[1].quantity, 1);
    }

    #[test]
    fn test_fefo_includes_expired_lots() {
        let lots = vec![StockLot::new("old", "B000001", date(2020, 1, 1), 2)];
        assert_eq!(allocate_fefo(&lots, 2).unwrap()[0].batch_id, "old");
    }

    #[test]
    fn test_fefo_shortage() {
        let err = allocate_fefo(&paracetamol().lots, 11).unwrap_err();
        assert_eq!(err, Shortage { available: 10, requested: 11 });
        assert!(allocate_fefo(&[], 1).is_err());
    }

    #[test]
    fn test_merge_cart_lines_rejects_bad_input() {
        assert!(matches!(merge_cart_lines(&[]), Err(CoreError::Validation(_))));
        assert!(merge_cart_lines(&[CartLine::new("p1", 0)]).is_err());
        assert!(merge_cart_lines(&[CartLine::new("", 1)]).is_err());
        assert!(merge_cart_lines(&[CartLine::new("p1", 600), CartLine::new("p1", 600)]).is_err());

        let too_many: Vec<CartLine> =
            (0..101).map(|i| CartLine::new(format!("p{}", i), 1)).collect();
        assert_eq!(
            merge_cart_lines(&too_many).unwrap_err(),
            CoreError::Validation(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: MAX_CART_ITEMS as i64,
            })
        );
    }

    #[test]
    fn test_cash_change() {
        let total = Money::from_cents(4250);
        let ok = settle_payment(total, &PaymentRequest::cash(Money::from_cents(5000))).unwrap();
        assert_eq!(ok.change, Some(Money::from_cents(750)));

        let short = PaymentRequest::cash(Money::from_cents(4000));
        let err = settle_payment(total, &short).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayment { .. }));

        let missing = PaymentRequest {
            payment_type: PaymentType::Cash,
            cash_received: None,
        };
        assert!(settle_payment(total, &missing).is_err());
    }

    #[test]
    fn test_card_ignores_cash_received() {
        let payment = PaymentRequest {
            payment_type: PaymentType::Card,
            cash_received: Some(Money::from_cents(1)),
        };
        let details = settle_payment(Money::from_cents(4250), &payment).unwrap();
        assert_eq!(details.cash_received, None);
        assert_eq!(details.change, Some(Money::zero()));
    }

    #[test]
    fn test_plan_checkout_prices_each_slice() {
        let plan = plan_checkout(
            &[CartLine::new("p1", 7)],
            &[paracetamol()],
            &PaymentRequest::cash(Money::from_cents(5000)),
        )
        .unwrap();

        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].line_total, Money::from_cents(2125));
        assert_eq!(plan.items[1].line_total, Money::from_cents(850));
        assert_eq!(plan.total, Money::from_cents(2975));
        assert_eq!(plan.payment.change, Some(Money::from_cents(2025)));
        let decrements: Vec<_> = plan.decrements().collect();
        assert_eq!(decrements, vec![("b1", 5), ("b2", 2)]);
    }

    #[test]
    fn test_plan_checkout_failures() {
        let card = PaymentRequest::card();
        let err = plan_checkout(&[CartLine::new("nope", 1)], &[paracetamol()], &card).unwrap_err();
        assert_eq!(err, CoreError::ProductNotFound("nope".into()));

        let err = plan_checkout(&[CartLine::new("p1", 12)], &[paracetamol()], &card).unwrap_err();
        assert_eq!(err.shortfall(), Some(2));
    }

    #[test]
    fn test_plan_checkout_overflowing_total_is_an_error() {
        let pricey = StockedProduct {
            product_id: "p1".into(),
            name: "Imported biologic".into(),
            price: Money::from_cents(i64::MAX / 10),
            lots: vec![StockLot::new("b1", "B000001", date(2030, 1, 1), 999)],
        };
        let card = PaymentRequest::card();
        let err = plan_checkout(&[CartLine::new("p1", 999)], &[pricey.clone()], &card).unwrap_err();
        assert_eq!(err, CoreError::amount_overflow("lineTotal"));

        let two_lines = [
            StockedProduct {
                product_id: "p2".into(),
                ..pricey.clone()
            },
            pricey,
        ];
        let err = plan_checkout(
            &[CartLine::new("p1", 9), CartLine::new("p2", 9)],
            &two_lines,
            &card,
        )
        .unwrap_err();
        assert_eq!(err, CoreError::amount_overflow("total"));
    }

    fn sold_sale() -> Sale {
        let card = PaymentRequest::card();
        let plan = plan_checkout(&[CartLine::new("p1", 7)], &[paracetamol()], &card).unwrap();
        Sale {
            id: "s1".into(),
            invoice_number: "20251001-0001".into(),
            items: plan.items,
            sub_total: plan.sub_total,
            total: plan.total,
            payment: plan.payment,
            cashier_id: "u1".into(),
            notes: None,
            refund_of: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_refund_negates_everything() {
        let items = plan_refund(&sold_sale(), &HashMap::new(), None).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.quantity < 0 && i.line_total.is_negative()));
        let total: Money = items.iter().map(|i| i.line_total).sum();
        assert_eq!(total, Money::from_cents(-2975));
    }

    #[test]
    fn test_partial_refund_respects_prior_refunds() {
        let sale = sold_sale();
        let mut prior = HashMap::new();
        prior.insert("b1".to_string(), 4);

        let line = |batch: &str, quantity: i64| {
            vec![RefundLine { batch_id: batch.into(), quantity }]
        };

        let ok = plan_refund(&sale, &prior, Some(line("b1", 1).as_slice())).unwrap();
        assert_eq!(ok[0].quantity, -1);

        let err = plan_refund(&sale, &prior, Some(line("b1", 2).as_slice())).unwrap_err();
        assert_eq!(
            err,
            CoreError::RefundExceedsSale { batch_id: "b1".into(), requested: 2, refundable: 1 }
        );

        let err = plan_refund(&sale, &prior, Some(line("zz", 1).as_slice())).unwrap_err();
        assert!(matches!(err, CoreError::RefundExceedsSale { refundable: 0, .. }));
    }

    #[test]
    fn test_nothing_left_to_refund() {
        let sale = sold_sale();
        let mut prior = HashMap::new();
        prior.insert("b1".to_string(), 5);
        prior.insert("b2".to_string(), 2);
        assert!(matches!(plan_refund(&sale, &prior, None), Err(CoreError::NotRefundable { .. })));
    }
}
