use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::database::Transaction;
use crate::entity::{
    BookId, BuyerId, OwnerId, Purchase, PurchaseId, PurchaseStatus, SelectLimit,
};
use crate::query::SortOrder;
use crate::KernelError;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum PurchaseSortKey {
    #[default]
    CreatedAt,
    CompletedAt,
    TotalPrice,
    Quantity,
    Status,
}

/// Recognized ledger filters; conjunctive. The seller scope resolves through
/// the owning book. Price bounds apply to the order total
/// (`price * quantity`), not the unit price.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFilter {
    pub buyer_id: Option<BuyerId>,
    pub seller_id: Option<OwnerId>,
    pub book_id: Option<BookId>,
    pub status: Option<PurchaseStatus>,
    pub created_from: Option<OffsetDateTime>,
    pub created_to: Option<OffsetDateTime>,
    pub total_min: Option<Decimal>,
    pub total_max: Option<Decimal>,
    pub sort_by: PurchaseSortKey,
    pub sort_order: SortOrder,
    pub limit: Option<SelectLimit>,
}

#[async_trait::async_trait]
pub trait PurchaseQuery<Connection: Transaction>: Sync + Send + 'static {
    async fn find_by_id(
        &self,
        con: &mut Connection,
        id: &PurchaseId,
    ) -> error_stack::Result<Option<Purchase>, KernelError>;
    async fn find_by_buyer(
        &self,
        con: &mut Connection,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError>;
    async fn find_by_seller(
        &self,
        con: &mut Connection,
        seller_id: &OwnerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError>;
    async fn find_by_book(
        &self,
        con: &mut Connection,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError>;
    async fn find_by_status(
        &self,
        con: &mut Connection,
        status: &PurchaseStatus,
    ) -> error_stack::Result<Vec<Purchase>, KernelError>;
    async fn find_with_filters(
        &self,
        con: &mut Connection,
        filter: &PurchaseFilter,
    ) -> error_stack::Result<Vec<Purchase>, KernelError>;
}

pub trait DependOnPurchaseQuery<Connection: Transaction>: Sync + Send + 'static {
    type PurchaseQuery: PurchaseQuery<Connection>;
    fn purchase_query(&self) -> &Self::PurchaseQuery;
}
