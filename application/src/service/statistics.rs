use uuid::Uuid;

use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{
    BuyerStatistics, DependOnPurchaseStatisticsQuery, PlatformStatistics,
    PurchaseStatisticsQuery, SellerStatistics,
};
use kernel::prelude::entity::{BuyerId, OwnerId};
use kernel::KernelError;

#[async_trait::async_trait]
pub trait PurchaseStatisticsService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnPurchaseStatisticsQuery<Connection>
{
    async fn buyer_statistics(
        &self,
        buyer_id: Uuid,
    ) -> error_stack::Result<BuyerStatistics, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        self.purchase_statistics_query()
            .buyer_statistics(&mut connection, &BuyerId::new(buyer_id))
            .await
    }

    async fn seller_statistics(
        &self,
        seller_id: Uuid,
    ) -> error_stack::Result<SellerStatistics, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        self.purchase_statistics_query()
            .seller_statistics(&mut connection, &OwnerId::new(seller_id))
            .await
    }

    async fn platform_statistics(&self) -> error_stack::Result<PlatformStatistics, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        self.purchase_statistics_query()
            .platform_statistics(&mut connection)
            .await
    }
}

impl<Connection: Transaction + Send, T> PurchaseStatisticsService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnPurchaseStatisticsQuery<Connection>
{
}
