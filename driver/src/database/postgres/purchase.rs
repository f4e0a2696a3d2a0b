use std::str::FromStr;

use error_stack::Report;
use rust_decimal::Decimal;
use sqlx::{PgConnection, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::query::{
    BuyerStatistics, PlatformStatistics, PurchaseFilter, PurchaseQuery, PurchaseSortKey,
    PurchaseStatisticsQuery, SellerStatistics, SortOrder,
};
use kernel::interface::update::{PurchaseModifier, PurchaseTransition};
use kernel::prelude::entity::{
    BookId, BuyerEmail, BuyerId, BuyerName, CompletedAt, CreatedAt, OwnerId, PaymentMethod,
    Purchase, PurchaseId, PurchaseNotes, PurchasePrice, PurchaseQuantity, PurchaseStatus,
    TransactionId,
};
use kernel::{KernelError, KernelErrorAttachments};

use crate::database::postgres::PgTransaction;
use crate::error::ConvertError;

pub struct PostgresPurchaseRepository;

#[async_trait::async_trait]
impl PurchaseQuery<PgTransaction> for PostgresPurchaseRepository {
    async fn find_by_id(
        &self,
        con: &mut PgTransaction,
        id: &PurchaseId,
    ) -> error_stack::Result<Option<Purchase>, KernelError> {
        PgPurchaseInternal::find_by_id(con, id).await
    }

    async fn find_by_buyer(
        &self,
        con: &mut PgTransaction,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        PgPurchaseInternal::find_by_buyer(con, buyer_id).await
    }

    async fn find_by_seller(
        &self,
        con: &mut PgTransaction,
        seller_id: &OwnerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        PgPurchaseInternal::find_by_seller(con, seller_id).await
    }

    async fn find_by_book(
        &self,
        con: &mut PgTransaction,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        PgPurchaseInternal::find_by_book(con, book_id).await
    }

    async fn find_by_status(
        &self,
        con: &mut PgTransaction,
        status: &PurchaseStatus,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        PgPurchaseInternal::find_by_status(con, status).await
    }

    async fn find_with_filters(
        &self,
        con: &mut PgTransaction,
        filter: &PurchaseFilter,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        PgPurchaseInternal::find_with_filters(con, filter).await
    }
}

#[async_trait::async_trait]
impl PurchaseModifier<PgTransaction> for PostgresPurchaseRepository {
    async fn create(
        &self,
        con: &mut PgTransaction,
        purchase: &Purchase,
    ) -> error_stack::Result<(), KernelError> {
        PgPurchaseInternal::create(con, purchase).await
    }

    async fn transition(
        &self,
        con: &mut PgTransaction,
        id: &PurchaseId,
        transition: &PurchaseTransition,
    ) -> error_stack::Result<Purchase, KernelError> {
        PgPurchaseInternal::transition(con, id, transition).await
    }
}

#[async_trait::async_trait]
impl PurchaseStatisticsQuery<PgTransaction> for PostgresPurchaseRepository {
    async fn buyer_statistics(
        &self,
        con: &mut PgTransaction,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<BuyerStatistics, KernelError> {
        PgPurchaseInternal::buyer_statistics(con, buyer_id).await
    }

    async fn seller_statistics(
        &self,
        con: &mut PgTransaction,
        seller_id: &OwnerId,
    ) -> error_stack::Result<SellerStatistics, KernelError> {
        PgPurchaseInternal::seller_statistics(con, seller_id).await
    }

    async fn platform_statistics(
        &self,
        con: &mut PgTransaction,
    ) -> error_stack::Result<PlatformStatistics, KernelError> {
        PgPurchaseInternal::platform_statistics(con).await
    }
}

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    book_id: Uuid,
    buyer_id: Uuid,
    buyer_name: String,
    buyer_email: String,
    quantity: i32,
    price: Decimal,
    status: String,
    notes: Option<String>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
    created_at: OffsetDateTime,
    completed_at: Option<OffsetDateTime>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = Report<KernelError>;
    fn try_from(value: PurchaseRow) -> Result<Self, Self::Error> {
        let status = PurchaseStatus::from_str(&value.status)
            .map_err(|report| report.change_context(KernelError::Internal))?;
        Ok(Purchase::new(
            PurchaseId::new(value.id),
            BookId::new(value.book_id),
            BuyerId::new(value.buyer_id),
            BuyerName::new(value.buyer_name),
            BuyerEmail::new(value.buyer_email),
            PurchaseQuantity::new(value.quantity),
            PurchasePrice::new(value.price),
            status,
            value.notes.map(PurchaseNotes::new),
            value.payment_method.map(PaymentMethod::new),
            value.transaction_id.map(TransactionId::new),
            CreatedAt::new(value.created_at),
            value.completed_at.map(CompletedAt::new),
        ))
    }
}

const PURCHASE_COLUMNS: &str = "bp.id, bp.book_id, bp.buyer_id, bp.buyer_name, bp.buyer_email, bp.quantity, bp.price, bp.status, bp.notes, bp.payment_method, bp.transaction_id, bp.created_at, bp.completed_at";

fn sort_expression(key: PurchaseSortKey) -> &'static str {
    match key {
        PurchaseSortKey::CreatedAt => "bp.created_at",
        PurchaseSortKey::CompletedAt => "bp.completed_at",
        PurchaseSortKey::TotalPrice => "(bp.price * bp.quantity)",
        PurchaseSortKey::Quantity => "bp.quantity",
        PurchaseSortKey::Status => "bp.status",
    }
}

fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

fn collect(rows: Vec<PurchaseRow>) -> error_stack::Result<Vec<Purchase>, KernelError> {
    rows.into_iter().map(Purchase::try_from).collect()
}

pub(in crate::database) struct PgPurchaseInternal;

impl PgPurchaseInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        id: &PurchaseId,
    ) -> error_stack::Result<Option<Purchase>, KernelError> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, buyer_id, buyer_name, buyer_email, quantity, price, status, notes, payment_method, transaction_id, created_at, completed_at
            FROM book_purchases
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Purchase::try_from).transpose()
    }

    async fn find_by_buyer(
        con: &mut PgConnection,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, buyer_id, buyer_name, buyer_email, quantity, price, status, notes, payment_method, transaction_id, created_at, completed_at
            FROM book_purchases
            WHERE buyer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(buyer_id.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        collect(rows)
    }

    async fn find_by_seller(
        con: &mut PgConnection,
        seller_id: &OwnerId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            // language=postgresql
            r#"
            SELECT bp.id, bp.book_id, bp.buyer_id, bp.buyer_name, bp.buyer_email, bp.quantity, bp.price, bp.status, bp.notes, bp.payment_method, bp.transaction_id, bp.created_at, bp.completed_at
            FROM book_purchases bp
            JOIN books b ON b.id = bp.book_id
            WHERE b.owner_id = $1
            ORDER BY bp.created_at DESC
            "#,
        )
        .bind(seller_id.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        collect(rows)
    }

    async fn find_by_book(
        con: &mut PgConnection,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, buyer_id, buyer_name, buyer_email, quantity, price, status, notes, payment_method, transaction_id, created_at, completed_at
            FROM book_purchases
            WHERE book_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(book_id.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        collect(rows)
    }

    async fn find_by_status(
        con: &mut PgConnection,
        status: &PurchaseStatus,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, buyer_id, buyer_name, buyer_email, quantity, price, status, notes, payment_method, transaction_id, created_at, completed_at
            FROM book_purchases
            WHERE status = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(con)
        .await
        .convert_error()?;
        collect(rows)
    }

    async fn find_with_filters(
        con: &mut PgConnection,
        filter: &PurchaseFilter,
    ) -> error_stack::Result<Vec<Purchase>, KernelError> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {PURCHASE_COLUMNS} FROM book_purchases bp LEFT JOIN books b ON b.id = bp.book_id WHERE TRUE"
        ));
        if let Some(buyer_id) = &filter.buyer_id {
            query.push(" AND bp.buyer_id = ");
            query.push_bind(buyer_id.as_ref());
        }
        if let Some(seller_id) = &filter.seller_id {
            query.push(" AND b.owner_id = ");
            query.push_bind(seller_id.as_ref());
        }
        if let Some(book_id) = &filter.book_id {
            query.push(" AND bp.book_id = ");
            query.push_bind(book_id.as_ref());
        }
        if let Some(status) = filter.status {
            query.push(" AND bp.status = ");
            query.push_bind(status.as_str());
        }
        if let Some(created_from) = filter.created_from {
            query.push(" AND bp.created_at >= ");
            query.push_bind(created_from);
        }
        if let Some(created_to) = filter.created_to {
            query.push(" AND bp.created_at <= ");
            query.push_bind(created_to);
        }
        if let Some(total_min) = filter.total_min {
            query.push(" AND (bp.price * bp.quantity) >= ");
            query.push_bind(total_min);
        }
        if let Some(total_max) = filter.total_max {
            query.push(" AND (bp.price * bp.quantity) <= ");
            query.push_bind(total_max);
        }
        query.push(format!(
            " ORDER BY {} {}",
            sort_expression(filter.sort_by),
            sort_direction(filter.sort_order)
        ));
        if let Some(limit) = &filter.limit {
            query.push(" LIMIT ");
            query.push_bind(*limit.as_ref());
        }

        let rows = query
            .build_query_as::<PurchaseRow>()
            .fetch_all(con)
            .await
            .convert_error()?;
        collect(rows)
    }

    async fn create(
        con: &mut PgConnection,
        purchase: &Purchase,
    ) -> error_stack::Result<(), KernelError> {
        let created_at: &OffsetDateTime = purchase.created_at().as_ref();
        let completed_at: Option<&OffsetDateTime> =
            purchase.completed_at().as_ref().map(|at| at.as_ref());
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO book_purchases (id, book_id, buyer_id, buyer_name, buyer_email, quantity, price, status, notes, payment_method, transaction_id, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(purchase.id().as_ref())
        .bind(purchase.book_id().as_ref())
        .bind(purchase.buyer_id().as_ref())
        .bind(purchase.buyer_name().as_ref())
        .bind(purchase.buyer_email().as_ref())
        .bind(purchase.quantity().as_ref())
        .bind(purchase.price().as_ref())
        .bind(purchase.status().as_str())
        .bind(purchase.notes().as_ref().map(AsRef::<String>::as_ref))
        .bind(
            purchase
                .payment_method()
                .as_ref()
                .map(AsRef::<String>::as_ref),
        )
        .bind(
            purchase
                .transaction_id()
                .as_ref()
                .map(AsRef::<String>::as_ref),
        )
        .bind(created_at)
        .bind(completed_at)
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn transition(
        con: &mut PgConnection,
        id: &PurchaseId,
        transition: &PurchaseTransition,
    ) -> error_stack::Result<Purchase, KernelError> {
        let completed_at: Option<&OffsetDateTime> =
            transition.completed_at().as_ref().map(|at| at.as_ref());
        // Guarded on the row still being pending, so racing callers cannot
        // both move it.
        let row = sqlx::query_as::<_, PurchaseRow>(
            // language=postgresql
            r#"
            UPDATE book_purchases
            SET status = $2,
                completed_at = COALESCE($3, completed_at),
                transaction_id = COALESCE($4, transaction_id)
            WHERE id = $1 AND status = 'pending'
            RETURNING id, book_id, buyer_id, buyer_name, buyer_email, quantity, price, status, notes, payment_method, transaction_id, created_at, completed_at
            "#,
        )
        .bind(id.as_ref())
        .bind(transition.status().as_str())
        .bind(completed_at)
        .bind(
            transition
                .transaction_id()
                .as_ref()
                .map(AsRef::<String>::as_ref),
        )
        .fetch_optional(&mut *con)
        .await
        .convert_error()?;

        match row {
            Some(row) => Purchase::try_from(row),
            None => {
                let current = sqlx::query_scalar::<_, String>(
                    // language=postgresql
                    r#"
                    SELECT status
                    FROM book_purchases
                    WHERE id = $1
                    "#,
                )
                .bind(id.as_ref())
                .fetch_optional(con)
                .await
                .convert_error()?;
                match current {
                    Some(status) => {
                        let status = PurchaseStatus::from_str(&status)
                            .map_err(|report| report.change_context(KernelError::Internal))?;
                        Err(Report::new(KernelError::InvalidState)
                            .attach_status_conflict(status, *transition.status()))
                    }
                    None => Err(Report::new(KernelError::NotFound)
                        .attach_missing_record("purchase", *id.as_ref())),
                }
            }
        }
    }

    async fn buyer_statistics(
        con: &mut PgConnection,
        buyer_id: &BuyerId,
    ) -> error_stack::Result<BuyerStatistics, KernelError> {
        let row = sqlx::query_as::<_, BuyerStatisticsRow>(
            // language=postgresql
            r#"
            SELECT COUNT(*)                                          AS total_purchases,
                   COALESCE(SUM(quantity), 0)::BIGINT                AS total_books,
                   COALESCE(SUM(price * quantity), 0)                AS total_spent,
                   COUNT(*) FILTER (WHERE status = 'completed')      AS completed_purchases,
                   COUNT(*) FILTER (WHERE status = 'pending')        AS pending_purchases
            FROM book_purchases
            WHERE buyer_id = $1
            "#,
        )
        .bind(buyer_id.as_ref())
        .fetch_one(con)
        .await
        .convert_error()?;
        Ok(BuyerStatistics {
            total_purchases: row.total_purchases,
            total_books: row.total_books,
            total_spent: row.total_spent,
            completed_purchases: row.completed_purchases,
            pending_purchases: row.pending_purchases,
        })
    }

    async fn seller_statistics(
        con: &mut PgConnection,
        seller_id: &OwnerId,
    ) -> error_stack::Result<SellerStatistics, KernelError> {
        let row = sqlx::query_as::<_, SellerStatisticsRow>(
            // language=postgresql
            r#"
            SELECT COUNT(*)                                          AS total_sales,
                   COALESCE(SUM(bp.quantity), 0)::BIGINT             AS total_books_sold,
                   COALESCE(SUM(bp.price * bp.quantity), 0)          AS total_revenue,
                   COUNT(*) FILTER (WHERE bp.status = 'completed')   AS completed_sales,
                   COUNT(*) FILTER (WHERE bp.status = 'pending')     AS pending_sales
            FROM book_purchases bp
            JOIN books b ON b.id = bp.book_id
            WHERE b.owner_id = $1
            "#,
        )
        .bind(seller_id.as_ref())
        .fetch_one(con)
        .await
        .convert_error()?;
        Ok(SellerStatistics {
            total_sales: row.total_sales,
            total_books_sold: row.total_books_sold,
            total_revenue: row.total_revenue,
            completed_sales: row.completed_sales,
            pending_sales: row.pending_sales,
        })
    }

    async fn platform_statistics(
        con: &mut PgConnection,
    ) -> error_stack::Result<PlatformStatistics, KernelError> {
        let row = sqlx::query_as::<_, PlatformStatisticsRow>(
            // language=postgresql
            r#"
            SELECT COUNT(*)                                          AS total_purchases,
                   COALESCE(SUM(quantity), 0)::BIGINT                AS total_books,
                   COALESCE(SUM(price * quantity), 0)                AS total_revenue,
                   COUNT(*) FILTER (WHERE status = 'completed')      AS completed_purchases,
                   COUNT(*) FILTER (WHERE status = 'pending')        AS pending_purchases,
                   COUNT(*) FILTER (WHERE status = 'cancelled')      AS cancelled_purchases,
                   COUNT(DISTINCT buyer_id)                          AS total_buyers
            FROM book_purchases
            "#,
        )
        .fetch_one(con)
        .await
        .convert_error()?;
        Ok(PlatformStatistics {
            total_purchases: row.total_purchases,
            total_books: row.total_books,
            total_revenue: row.total_revenue,
            completed_purchases: row.completed_purchases,
            pending_purchases: row.pending_purchases,
            cancelled_purchases: row.cancelled_purchases,
            total_buyers: row.total_buyers,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BuyerStatisticsRow {
    total_purchases: i64,
    total_books: i64,
    total_spent: Decimal,
    completed_purchases: i64,
    pending_purchases: i64,
}

#[derive(sqlx::FromRow)]
struct SellerStatisticsRow {
    total_sales: i64,
    total_books_sold: i64,
    total_revenue: Decimal,
    completed_sales: i64,
    pending_sales: i64,
}

#[derive(sqlx::FromRow)]
struct PlatformStatisticsRow {
    total_purchases: i64,
    total_books: i64,
    total_revenue: Decimal,
    completed_purchases: i64,
    pending_purchases: i64,
    cancelled_purchases: i64,
    total_buyers: i64,
}

#[cfg(test)]
mod test {
    use time::OffsetDateTime;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::query::PurchaseQuery;
    use kernel::interface::update::{BookModifier, PurchaseModifier, PurchaseTransition};
    use kernel::prelude::entity::{
        Book, BookId, BookPrice, BookQuantity, BookTitle, BuyerEmail, BuyerId, BuyerName,
        CompletedAt, CreatedAt, OwnerId, OwnerName, Purchase, PurchaseId, PurchasePrice,
        PurchaseQuantity, PurchaseStatus,
    };
    use kernel::KernelError;
    use rust_decimal_macros::dec;

    use crate::database::postgres::book::PostgresBookRepository;
    use crate::database::postgres::purchase::PostgresPurchaseRepository;
    use crate::database::postgres::PostgresDatabase;

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn pending_only_transition() -> Result<(), error_stack::Report<KernelError>> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;

        let book_id = BookId::new(uuid::Uuid::new_v4());
        let book = Book::new(
            book_id.clone(),
            BookTitle::new("test".to_string()),
            None,
            BookPrice::new(dec!(10.00)),
            BookQuantity::new(2),
            None,
            OwnerId::new(uuid::Uuid::new_v4()),
            OwnerName::new("owner".to_string()),
            CreatedAt::new(OffsetDateTime::now_utc()),
            None,
        );
        PostgresBookRepository.create(&mut con, &book).await?;

        let id = PurchaseId::new(uuid::Uuid::new_v4());
        let purchase = Purchase::new(
            id.clone(),
            book_id,
            BuyerId::new(uuid::Uuid::new_v4()),
            BuyerName::new("buyer".to_string()),
            BuyerEmail::new("buyer@example.com".to_string()),
            PurchaseQuantity::new(1),
            PurchasePrice::new(dec!(10.00)),
            PurchaseStatus::Pending,
            None,
            None,
            None,
            CreatedAt::new(OffsetDateTime::now_utc()),
            None,
        );
        PostgresPurchaseRepository.create(&mut con, &purchase).await?;

        let found = PostgresPurchaseRepository.find_by_id(&mut con, &id).await?;
        assert_eq!(found, Some(purchase));

        let transition = PurchaseTransition::new(
            PurchaseStatus::Completed,
            Some(CompletedAt::new(OffsetDateTime::now_utc())),
            None,
        );
        let completed = PostgresPurchaseRepository
            .transition(&mut con, &id, &transition)
            .await?;
        assert_eq!(completed.status(), &PurchaseStatus::Completed);
        assert!(completed.completed_at().is_some());

        let again = PostgresPurchaseRepository
            .transition(&mut con, &id, &transition)
            .await;
        assert!(matches!(
            again.unwrap_err().current_context(),
            KernelError::InvalidState
        ));

        con.roll_back().await?;
        Ok(())
    }
}
