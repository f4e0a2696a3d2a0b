use std::ops::{Deref, DerefMut};

use sqlx::{PgConnection, Pool, Postgres};

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::interface::query::{
    DependOnBookQuery, DependOnPurchaseQuery, DependOnPurchaseStatisticsQuery,
};
use kernel::interface::update::{DependOnBookModifier, DependOnPurchaseModifier};
use kernel::KernelError;

use crate::env;
use crate::error::ConvertError;

pub use self::{book::*, purchase::*};

mod book;
mod purchase;

static POSTGRES_URL: &str = "POSTGRES_URL";

pub struct PostgresDatabase {
    pool: Pool<Postgres>,
}

impl PostgresDatabase {
    pub async fn new() -> error_stack::Result<Self, KernelError> {
        let url = env(POSTGRES_URL)?;
        let pool = Pool::connect(&url).await.convert_error()?;
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .convert_error()?;
        Ok(Self { pool })
    }
}

/// One unit of work against Postgres. The purchase workflow relies on this:
/// the stock decrement and the ledger insert ride the same transaction.
pub struct PgTransaction(sqlx::Transaction<'static, Postgres>);

impl Deref for PgTransaction {
    type Target = PgConnection;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PgTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[async_trait::async_trait]
impl DatabaseConnection<PgTransaction> for PostgresDatabase {
    async fn transact(&self) -> error_stack::Result<PgTransaction, KernelError> {
        let con = self.pool.begin().await.convert_error()?;
        Ok(PgTransaction(con))
    }
}

#[async_trait::async_trait]
impl Transaction for PgTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        self.0.commit().await.convert_error()
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        self.0.rollback().await.convert_error()
    }
}

impl DependOnBookQuery<PgTransaction> for PostgresDatabase {
    type BookQuery = PostgresBookRepository;
    fn book_query(&self) -> &Self::BookQuery {
        &PostgresBookRepository
    }
}

impl DependOnBookModifier<PgTransaction> for PostgresDatabase {
    type BookModifier = PostgresBookRepository;
    fn book_modifier(&self) -> &Self::BookModifier {
        &PostgresBookRepository
    }
}

impl DependOnPurchaseQuery<PgTransaction> for PostgresDatabase {
    type PurchaseQuery = PostgresPurchaseRepository;
    fn purchase_query(&self) -> &Self::PurchaseQuery {
        &PostgresPurchaseRepository
    }
}

impl DependOnPurchaseModifier<PgTransaction> for PostgresDatabase {
    type PurchaseModifier = PostgresPurchaseRepository;
    fn purchase_modifier(&self) -> &Self::PurchaseModifier {
        &PostgresPurchaseRepository
    }
}

impl DependOnPurchaseStatisticsQuery<PgTransaction> for PostgresDatabase {
    type PurchaseStatisticsQuery = PostgresPurchaseRepository;
    fn purchase_statistics_query(&self) -> &Self::PurchaseStatisticsQuery {
        &PostgresPurchaseRepository
    }
}
