mod buyer;
mod id;
mod notes;
mod payment;
mod price;
mod quantity;
mod status;

pub use self::{buyer::*, id::*, notes::*, payment::*, price::*, quantity::*, status::*};
use crate::entity::book::BookId;
use crate::entity::common::{CompletedAt, CreatedAt};
use destructure::{Destructure, Mutation};
use vodca::References;

/// A purchase order against a single book. The price is the unit price the
/// buyer agreed to at creation time; later edits to the book do not touch it.
#[derive(Debug, Clone, Eq, PartialEq, References, Destructure, Mutation)]
pub struct Purchase {
    id: PurchaseId,
    book_id: BookId,
    buyer_id: BuyerId,
    buyer_name: BuyerName,
    buyer_email: BuyerEmail,
    quantity: PurchaseQuantity,
    price: PurchasePrice,
    status: PurchaseStatus,
    notes: Option<PurchaseNotes>,
    payment_method: Option<PaymentMethod>,
    transaction_id: Option<TransactionId>,
    created_at: CreatedAt<Purchase>,
    completed_at: Option<CompletedAt<Purchase>>,
}

impl Purchase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PurchaseId,
        book_id: BookId,
        buyer_id: BuyerId,
        buyer_name: BuyerName,
        buyer_email: BuyerEmail,
        quantity: PurchaseQuantity,
        price: PurchasePrice,
        status: PurchaseStatus,
        notes: Option<PurchaseNotes>,
        payment_method: Option<PaymentMethod>,
        transaction_id: Option<TransactionId>,
        created_at: CreatedAt<Purchase>,
        completed_at: Option<CompletedAt<Purchase>>,
    ) -> Self {
        Self {
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
        }
    }

    pub fn total_price(&self) -> rust_decimal::Decimal {
        self.price.as_ref() * rust_decimal::Decimal::from(*self.quantity.as_ref())
    }
}
