use rust_decimal::Decimal;

use crate::database::Transaction;
use crate::entity::{BuyerId, OwnerId};
use crate::KernelError;

/// Read-side rollups. A scope with no matching ledger rows yields the
/// `Default` (zeroed) aggregate, never an error.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BuyerStatistics {
    pub total_purchases: i64,
    pub total_books: i64,
    pub total_spent: Decimal,
    pub completed_purchases: i64,
    pub pending_purchases: i64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SellerStatistics {
    pub total_sales: i64,
    pub total_books_sold: i64,
    pub total_revenue: Decimal,
    pub completed_sales: i64,
    pub pending_sales: i64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PlatformStatistics {
    pub total_purchases: i64,
    pub total_books: i64,
    pub total_revenue: Decimal,
    pub completed_purchases: i64,
    pub pending_purchases: i64,
    pub cancelled_purchases: i64,
    pub total_buyers: i64,
}

#[async_trait::async_trait]
pub trait PurchaseStatisticsQuery<Connection: Transaction>: Sync + Send + 'static {
    async fn buyer_statistics(
        &self,
        con: &mut Connection,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<BuyerStatistics, KernelError>;
    async fn seller_statistics(
        &self,
        con: &mut Connection,
        seller_id: &OwnerId,
    ) -> error_stack::Result<SellerStatistics, KernelError>;
    async fn platform_statistics(
        &self,
        con: &mut Connection,
    ) -> error_stack::Result<PlatformStatistics, KernelError>;
}

pub trait DependOnPurchaseStatisticsQuery<Connection: Transaction>:
    Sync + Send + 'static
{
    type PurchaseStatisticsQuery: PurchaseStatisticsQuery<Connection>;
    fn purchase_statistics_query(&self) -> &Self::PurchaseStatisticsQuery;
}
