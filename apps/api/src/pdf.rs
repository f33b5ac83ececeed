//! One-page PDF rendering of a financial summary.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ <Pharmacy>                           │
//! │ Financial summary (monthly)          │
//! │ 2025-10-01 to 2025-10-31             │
//! │ ──────────────────────────────────── │
//! │ Gross sales                12345.00  │
//! │ Refunds                      120.00  │
//! │ ...                                  │
//! │ ──────────────────────────────────── │
//! │ Net profit                  4210.00  │
//! │                                      │
//! │ Sales by day / month                 │
//! │ 2025-10-01    8 sales       1020.00  │
//! └──────────────────────────────────────┘
//! ```

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use rxdesk_core::report::{FinancialSummary, SummaryPeriod};
use rxdesk_core::Money;

use crate::error::ApiError;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 20.0;
const AMOUNT_X: f32 = 150.0;
const BOTTOM_Y: f32 = 20.0;

/// Renders `summary` as an A4 page and returns the PDF bytes.
pub fn render_summary(pharmacy: &str, summary: &FinancialSummary) -> Result<Vec<u8>, ApiError> {
    let title = format!("{} financial summary", pharmacy);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let pdf_err = |e: printpdf::Error| ApiError::internal(format!("PDF rendering failed: {}", e));

    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut y = PAGE_H - 25.0;

    layer.use_text(pharmacy, 18.0, Mm(MARGIN_X), Mm(y), &bold);
    y -= 8.0;
    layer.use_text(
        format!("Financial summary ({})", summary.period),
        12.0,
        Mm(MARGIN_X),
        Mm(y),
        &regular,
    );
    y -= 6.0;
    layer.use_text(
        format!("{} to {}", summary.from, summary.to),
        10.0,
        Mm(MARGIN_X),
        Mm(y),
        &regular,
    );
    y -= 5.0;
    rule(&layer, y);
    y -= 8.0;

    let rows = [
        ("Gross sales", summary.gross_sales),
        ("Refunds", summary.refunds),
        ("Net sales", summary.total_sales),
        ("Expenses", summary.total_expenses),
        ("Payroll paid", summary.total_payroll_paid),
    ];
    for (label, amount) in rows {
        amount_row(&layer, &regular, y, label, amount);
        y -= 7.0;
    }
    layer.use_text(
        format!("Sales count: {}", summary.sales_count),
        10.0,
        Mm(MARGIN_X),
        Mm(y),
        &regular,
    );
    y -= 4.0;
    rule(&layer, y);
    y -= 8.0;
    amount_row(&layer, &bold, y, "Net profit", summary.net_profit);
    y -= 14.0;

    let has_sales = summary.buckets.iter().any(|b| b.count > 0);
    let heading = match (has_sales, summary.period) {
        (false, _) => "No sales",
        (true, SummaryPeriod::Yearly) => "Net sales by month",
        (true, _) => "Net sales by day",
    };
    layer.use_text(heading, 12.0, Mm(MARGIN_X), Mm(y), &bold);
    y -= 7.0;

    for bucket in summary.buckets.iter().filter(|b| b.count > 0) {
        if y < BOTTOM_Y {
            layer.use_text("(truncated)", 9.0, Mm(MARGIN_X), Mm(y), &regular);
            break;
        }
        layer.use_text(bucket.start.to_string(), 9.0, Mm(MARGIN_X), Mm(y), &regular);
        layer.use_text(
            format!("{} sales", bucket.count),
            9.0,
            Mm(MARGIN_X + 45.0),
            Mm(y),
            &regular,
        );
        layer.use_text(bucket.net.to_string(), 9.0, Mm(AMOUNT_X), Mm(y), &regular);
        y -= 5.0;
    }

    doc.save_to_bytes().map_err(pdf_err)
}

fn amount_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    y: f32,
    label: &str,
    amount: Money,
) {
    layer.use_text(label, 11.0, Mm(MARGIN_X), Mm(y), font);
    layer.use_text(amount.to_string(), 11.0, Mm(AMOUNT_X), Mm(y), font);
}

fn rule(layer: &PdfLayerReference, y: f32) {
    let line = Line::from_iter(vec![
        (Point::new(Mm(MARGIN_X), Mm(y)), false),
        (Point::new(Mm(PAGE_W - MARGIN_X), Mm(y)), false),
    ]);
    layer.add_line(line);
}
