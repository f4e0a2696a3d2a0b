use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::prelude::entity::{DestructPurchase, Purchase, PurchaseStatus};

#[derive(Debug, Clone)]
pub struct PurchaseDto {
    pub id: Uuid,
    pub book_id: Uuid,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total_price: Decimal,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

impl From<Purchase> for PurchaseDto {
    fn from(value: Purchase) -> Self {
        let total_price = value.total_price();
        let DestructPurchase {
            id,
            book_id,
            buyer_id,
            buyer_name,
            buyer_email,
            quantity,
            price,
            status,
            notes,
            payment_method,
            transaction_id,
            created_at,
            completed_at,
        } = value.into_destruct();
        Self {
            id: id.into(),
            book_id: book_id.into(),
            buyer_id: buyer_id.into(),
            buyer_name: buyer_name.into(),
            buyer_email: buyer_email.into(),
            quantity: quantity.into(),
            price: price.into(),
            total_price,
            status,
            notes: notes.map(Into::into),
            payment_method: payment_method.map(Into::into),
            transaction_id: transaction_id.map(Into::into),
            created_at: *created_at.as_ref(),
            completed_at: completed_at.map(|at| *at.as_ref()),
        }
    }
}

pub struct GetPurchaseDto {
    pub id: Uuid,
}

pub struct CreatePurchaseDto {
    pub book_id: Uuid,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: String,
    pub quantity: i32,
    /// Unit price the client saw; accepted within 1% of the current price.
    pub price: Decimal,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug)]
pub struct CompletePurchaseDto {
    pub id: Uuid,
    pub transaction_id: Option<String>,
}

#[derive(Debug)]
pub struct CancelPurchaseDto {
    pub id: Uuid,
}

pub struct BulkCompleteDto {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct BulkCompletionErrorDto {
    pub id: Uuid,
    pub message: String,
}

/// Best-effort batch outcome; failures never abort the remainder.
#[derive(Debug, Clone)]
pub struct BulkCompletionDto {
    pub completed: Vec<PurchaseDto>,
    pub errors: Vec<BulkCompletionErrorDto>,
}
