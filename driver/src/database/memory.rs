use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::interface::query::{
    DependOnBookQuery, DependOnPurchaseQuery, DependOnPurchaseStatisticsQuery,
};
use kernel::interface::update::{DependOnBookModifier, DependOnPurchaseModifier};
use kernel::prelude::entity::{Book, Purchase};
use kernel::KernelError;

pub use self::{book::*, purchase::*};

mod book;
mod purchase;

/// In-memory twin of the Postgres adapter: same interface, no durability.
/// Tests substitute it for the real store. Mutations apply in place under
/// the map locks; the stock decrement stays a single guarded step, which is
/// the contract the purchase workflow leans on.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    books: Arc<RwLock<HashMap<Uuid, Book>>>,
    purchases: Arc<RwLock<HashMap<Uuid, Purchase>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTransaction {
    books: Arc<RwLock<HashMap<Uuid, Book>>>,
    purchases: Arc<RwLock<HashMap<Uuid, Purchase>>>,
}

impl MemoryTransaction {
    pub(in crate::database::memory) fn books(&self) -> &RwLock<HashMap<Uuid, Book>> {
        &self.books
    }

    pub(in crate::database::memory) fn purchases(&self) -> &RwLock<HashMap<Uuid, Purchase>> {
        &self.purchases
    }
}

#[async_trait::async_trait]
impl DatabaseConnection<MemoryTransaction> for MemoryDatabase {
    async fn transact(&self) -> error_stack::Result<MemoryTransaction, KernelError> {
        Ok(MemoryTransaction {
            books: Arc::clone(&self.books),
            purchases: Arc::clone(&self.purchases),
        })
    }
}

#[async_trait::async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }
}

impl DependOnBookQuery<MemoryTransaction> for MemoryDatabase {
    type BookQuery = MemoryBookRepository;
    fn book_query(&self) -> &Self::BookQuery {
        &MemoryBookRepository
    }
}

impl DependOnBookModifier<MemoryTransaction> for MemoryDatabase {
    type BookModifier = MemoryBookRepository;
    fn book_modifier(&self) -> &Self::BookModifier {
        &MemoryBookRepository
    }
}

impl DependOnPurchaseQuery<MemoryTransaction> for MemoryDatabase {
    type PurchaseQuery = MemoryPurchaseRepository;
    fn purchase_query(&self) -> &Self::PurchaseQuery {
        &MemoryPurchaseRepository
    }
}

impl DependOnPurchaseModifier<MemoryTransaction> for MemoryDatabase {
    type PurchaseModifier = MemoryPurchaseRepository;
    fn purchase_modifier(&self) -> &Self::PurchaseModifier {
        &MemoryPurchaseRepository
    }
}

impl DependOnPurchaseStatisticsQuery<MemoryTransaction> for MemoryDatabase {
    type PurchaseStatisticsQuery = MemoryPurchaseRepository;
    fn purchase_statistics_query(&self) -> &Self::PurchaseStatisticsQuery {
        &MemoryPurchaseRepository
    }
}
