//! Quote composition in integer rupiah.

use crate::constants::{BOOKING_FEE, PLATFORM_FEE};
use thiserror::Error;
use uuid::Uuid;

/// One priced cart entry. `unit_price` is the server's current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedItem {
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteLine {
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub ticket_total: i64,
    pub items_total: i64,
    pub fees: i64,
    pub total_price: i64,
    pub lines: Vec<QuoteLine>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("price must not be negative")]
    NegativePrice,
    #[error("booking total is too large")]
    Overflow,
}

/// `ticket_price × headcount × slot_count + Σ items + fees`, exactly.
pub fn quote(
    ticket_price: i64,
    headcount: i32,
    slot_count: u32,
    items: &[PricedItem],
) -> Result<Quote, PricingError> {
    if ticket_price < 0 {
        return Err(PricingError::NegativePrice);
    }

    let ticket_total = ticket_price
        .checked_mul(i64::from(headcount))
        .and_then(|v| v.checked_mul(i64::from(slot_count)))
        .ok_or(PricingError::Overflow)?;

    let mut lines = Vec::with_capacity(items.len());
    let mut items_total: i64 = 0;
    for item in items {
        if item.quantity <= 0 {
            return Err(PricingError::NonPositiveQuantity);
        }
        if item.unit_price < 0 {
            return Err(PricingError::NegativePrice);
        }
        let line_total = item
            .unit_price
            .checked_mul(i64::from(item.quantity))
            .ok_or(PricingError::Overflow)?;
        items_total = items_total
            .checked_add(line_total)
            .ok_or(PricingError::Overflow)?;
        lines.push(QuoteLine {
            item_id: item.item_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total,
        });
    }

    let fees = PLATFORM_FEE + BOOKING_FEE;
    let total_price = ticket_total
        .checked_add(items_total)
        .and_then(|v| v.checked_add(fees))
        .ok_or(PricingError::Overflow)?;

    Ok(Quote {
        ticket_total,
        items_total,
        fees,
        total_price,
        lines,
    })
}
