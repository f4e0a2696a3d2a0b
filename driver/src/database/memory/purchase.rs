use std::cmp::Ordering;
use std::collections::HashSet;

use error_stack::Report;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::query::{
    BuyerStatistics, PlatformStatistics, PurchaseFilter, PurchaseQuery, PurchaseSortKey,
    PurchaseStatisticsQuery, SellerStatistics, SortOrder,
};
use kernel::interface::update::{PurchaseModifier, PurchaseTransition};
use kernel::prelude::entity::{
    BookId, BuyerId, OwnerId, Purchase, PurchaseId, PurchaseStatus,
};
use kernel::{KernelError, KernelErrorAttachments};

use crate::database::memory::MemoryTransaction;

pub struct MemoryPurchaseRepository;

fn created(purchase: &Purchase) -> OffsetDateTime {
    let at: &OffsetDateTime = purchase.created_at().as_ref();
    *at
}

fn completed(purchase: &Purchase) -> Option<OffsetDateTime> {
    purchase.completed_at().as_ref().map(|at| {
        let at: &OffsetDateTime = at.as_ref();
        *at
    })
}

fn compare(a: &Purchase, b: &Purchase, key: PurchaseSortKey) -> Ordering {
    match key {
        PurchaseSortKey::CreatedAt => created(a).cmp(&created(b)),
        PurchaseSortKey::CompletedAt => completed(a).cmp(&completed(b)),
        PurchaseSortKey::TotalPrice => a.total_price().cmp(&b.total_price()),
        PurchaseSortKey::Quantity => a.quantity().as_ref().cmp(b.quantity().as_ref()),
        PurchaseSortKey::Status => a.status().as_str().cmp(b.status().as_str()),
    }
}

fn newest_first(mut purchases: Vec<Purchase>) -> Vec<Purchase> {
    purchases.sort_by(|a, b| created(b).cmp(&created(a)));
    purchases
}

#[async_trait::async_trait]
impl PurchaseQuery<MemoryTransaction> for MemoryPurchaseRepository {
    async fn find_by_id(
        &self,
        con: &mut MemoryTransaction,
        id: &PurchaseId,
    ) -> error_stack::Result<Option<Purchase>, KernelError> {
        let purchases = con.purchases().read().await;
        Ok(purchases.get(id.as_ref()).cloned())
    }

    async fn find_by_buyer(
        &self,
        con: &mut MemoryTransaction,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let purchases = con.purchases().read().await;
        let found = purchases
            .values()
            .filter(|purchase| purchase.buyer_id() == buyer_id)
            .cloned()
            .collect();
        Ok(newest_first(found))
    }

    async fn find_by_seller(
        &self,
        con: &mut MemoryTransaction,
        seller_id: &OwnerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let owned = owned_books(con, seller_id).await;
        let purchases = con.purchases().read().await;
        let found = purchases
            .values()
            .filter(|purchase| owned.contains(purchase.book_id().as_ref()))
            .cloned()
            .collect();
        Ok(newest_first(found))
    }

    async fn find_by_book(
        &self,
        con: &mut MemoryTransaction,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let purchases = con.purchases().read().await;
        let found = purchases
            .values()
            .filter(|purchase| purchase.book_id() == book_id)
            .cloned()
            .collect();
        Ok(newest_first(found))
    }

    async fn find_by_status(
        &self,
        con: &mut MemoryTransaction,
        status: &PurchaseStatus,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let purchases = con.purchases().read().await;
        let found = purchases
            .values()
            .filter(|purchase| purchase.status() == status)
            .cloned()
            .collect();
        Ok(newest_first(found))
    }

    async fn find_with_filters(
        &self,
        con: &mut MemoryTransaction,
        filter: &PurchaseFilter,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let owned = match &filter.seller_id {
            Some(seller_id) => Some(owned_books(con, seller_id).await),
            None => None,
        };
        let purchases = con.purchases().read().await;
        let mut found: Vec<Purchase> = purchases
            .values()
            .filter(|purchase| {
                if let Some(buyer_id) = &filter.buyer_id {
                    if purchase.buyer_id() != buyer_id {
                        return false;
                    }
                }
                if let Some(owned) = &owned {
                    if !owned.contains(purchase.book_id().as_ref()) {
                        return false;
                    }
                }
                if let Some(book_id) = &filter.book_id {
                    if purchase.book_id() != book_id {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if *purchase.status() != status {
                        return false;
                    }
                }
                if let Some(created_from) = filter.created_from {
                    if created(purchase) < created_from {
                        return false;
                    }
                }
                if let Some(created_to) = filter.created_to {
                    if created(purchase) > created_to {
                        return false;
                    }
                }
                if let Some(total_min) = filter.total_min {
                    if purchase.total_price() < total_min {
                        return false;
                    }
                }
                if let Some(total_max) = filter.total_max {
                    if purchase.total_price() > total_max {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            let ordering = compare(a, b, filter.sort_by);
            match filter.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        if let Some(limit) = &filter.limit {
            found.truncate(*limit.as_ref() as usize);
        }
        Ok(found)
    }
}

async fn owned_books(con: &MemoryTransaction, seller_id: &OwnerId) -> HashSet<Uuid> {
    let books = con.books().read().await;
    books
        .values()
        .filter(|book| book.owner_id() == seller_id)
        .map(|book| *book.id().as_ref())
        .collect()
}

#[async_trait::async_trait]
impl PurchaseModifier<MemoryTransaction> for MemoryPurchaseRepository {
    async fn create(
        &self,
        con: &mut MemoryTransaction,
        purchase: &Purchase,
    ) -> error_stack::Result<(), KernelError> {
        let mut purchases = con.purchases().write().await;
        purchases.insert(*purchase.id().as_ref(), purchase.clone());
        Ok(())
    }

    async fn transition(
        &self,
        con: &mut MemoryTransaction,
        id: &PurchaseId,
        transition: &PurchaseTransition,
    ) -> error_stack::Result<Purchase, KernelError> {
        // The pending check happens under the write guard, mirroring the
        // conditional UPDATE of the Postgres adapter.
        let mut purchases = con.purchases().write().await;
        let purchase = purchases.get_mut(id.as_ref()).ok_or_else(|| {
            Report::new(KernelError::NotFound).attach_missing_record("purchase", *id.as_ref())
        })?;
        let current = *purchase.status();
        if current != PurchaseStatus::Pending {
            return Err(Report::new(KernelError::InvalidState)
                .attach_status_conflict(current, *transition.status()));
        }
        purchase.substitute(|p| {
            *p.status = *transition.status();
            if let Some(completed_at) = transition.completed_at() {
                *p.completed_at = Some(completed_at.clone());
            }
            if let Some(transaction_id) = transition.transaction_id() {
                *p.transaction_id = Some(transaction_id.clone());
            }
        });
        Ok(purchase.clone())
    }
}

fn count_status(purchases: &[&Purchase], status: PurchaseStatus) -> i64 {
    purchases
        .iter()
        .filter(|purchase| *purchase.status() == status)
        .count() as i64
}

fn sum_units(purchases: &[&Purchase]) -> i64 {
    purchases
        .iter()
        .map(|purchase| i64::from(*purchase.quantity().as_ref()))
        .sum()
}

fn sum_totals(purchases: &[&Purchase]) -> Decimal {
    purchases
        .iter()
        .map(|purchase| purchase.total_price())
        .sum()
}

#[async_trait::async_trait]
impl PurchaseStatisticsQuery<MemoryTransaction> for MemoryPurchaseRepository {
    async fn buyer_statistics(
        &self,
        con: &mut MemoryTransaction,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<BuyerStatistics, KernelError> {
        let purchases = con.purchases().read().await;
        let scope: Vec<&Purchase> = purchases
            .values()
            .filter(|purchase| purchase.buyer_id() == buyer_id)
            .collect();
        Ok(BuyerStatistics {
            total_purchases: scope.len() as i64,
            total_books: sum_units(&scope),
            total_spent: sum_totals(&scope),
            completed_purchases: count_status(&scope, PurchaseStatus::Completed),
            pending_purchases: count_status(&scope, PurchaseStatus::Pending),
        })
    }

    async fn seller_statistics(
        &self,
        con: &mut MemoryTransaction,
        seller_id: &OwnerId,
    ) -> error_stack::Result<SellerStatistics, KernelError> {
        let owned = owned_books(con, seller_id).await;
        let purchases = con.purchases().read().await;
        let scope: Vec<&Purchase> = purchases
            .values()
            .filter(|purchase| owned.contains(purchase.book_id().as_ref()))
            .collect();
        Ok(SellerStatistics {
            total_sales: scope.len() as i64,
            total_books_sold: sum_units(&scope),
            total_revenue: sum_totals(&scope),
            completed_sales: count_status(&scope, PurchaseStatus::Completed),
            pending_sales: count_status(&scope, PurchaseStatus::Pending),
        })
    }

    async fn platform_statistics(
        &self,
        con: &mut MemoryTransaction,
    ) -> error_stack::Result<PlatformStatistics, KernelError> {
        let purchases = con.purchases().read().await;
        let scope: Vec<&Purchase> = purchases.values().collect();
        let buyers: HashSet<Uuid> = scope
            .iter()
            .map(|purchase| *purchase.buyer_id().as_ref())
            .collect();
        Ok(PlatformStatistics {
            total_purchases: scope.len() as i64,
            total_books: sum_units(&scope),
            total_revenue: sum_totals(&scope),
            completed_purchases: count_status(&scope, PurchaseStatus::Completed),
            pending_purchases: count_status(&scope, PurchaseStatus::Pending),
            cancelled_purchases: count_status(&scope, PurchaseStatus::Cancelled),
            total_buyers: buyers.len() as i64,
        })
    }
}
