use error_stack::Report;
use rust_decimal::Decimal;
use sqlx::{PgConnection, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::query::{BookFilter, BookQuery, BookSortKey, SortOrder};
use kernel::interface::update::BookModifier;
use kernel::prelude::entity::{
    Book, BookCategory, BookDescription, BookId, BookPrice, BookQuantity, BookTitle, CreatedAt,
    OwnerId, OwnerName, UpdatedAt,
};
use kernel::{KernelError, KernelErrorAttachments};

use crate::database::postgres::PgTransaction;
use crate::error::ConvertError;

pub struct PostgresBookRepository;

#[async_trait::async_trait]
impl BookQuery<PgTransaction> for PostgresBookRepository {
    async fn find_by_id(
        &self,
        con: &mut PgTransaction,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        PgBookInternal::find_by_id(con, id).await
    }

    async fn find_with_filters(
        &self,
        con: &mut PgTransaction,
        filter: &BookFilter,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        PgBookInternal::find_with_filters(con, filter).await
    }

    async fn categories(
        &self,
        con: &mut PgTransaction,
    ) -> error_stack::Result<Vec<BookCategory>, KernelError> {
        PgBookInternal::categories(con).await
    }
}

#[async_trait::async_trait]
impl BookModifier<PgTransaction> for PostgresBookRepository {
    async fn create(
        &self,
        con: &mut PgTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        PgBookInternal::create(con, book).await
    }

    async fn update(
        &self,
        con: &mut PgTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        PgBookInternal::update(con, book).await
    }

    async fn delete(
        &self,
        con: &mut PgTransaction,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        PgBookInternal::delete(con, book_id).await
    }

    async fn decrease_stock(
        &self,
        con: &mut PgTransaction,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError> {
        PgBookInternal::decrease_stock(con, book_id, amount).await
    }

    async fn increase_stock(
        &self,
        con: &mut PgTransaction,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError> {
        PgBookInternal::increase_stock(con, book_id, amount).await
    }
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    price: Decimal,
    quantity: i32,
    category: Option<String>,
    owner_id: Uuid,
    owner_name: String,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
}

impl From<BookRow> for Book {
    fn from(value: BookRow) -> Self {
        Book::new(
            BookId::new(value.id),
            BookTitle::new(value.title),
            value.description.map(BookDescription::new),
            BookPrice::new(value.price),
            BookQuantity::new(value.quantity),
            value.category.map(BookCategory::new),
            OwnerId::new(value.owner_id),
            OwnerName::new(value.owner_name),
            CreatedAt::new(value.created_at),
            value.updated_at.map(UpdatedAt::new),
        )
    }
}

const BOOK_COLUMNS: &str =
    "id, title, description, price, quantity, category, owner_id, owner_name, created_at, updated_at";

fn sort_column(key: BookSortKey) -> &'static str {
    match key {
        BookSortKey::CreatedAt => "created_at",
        BookSortKey::Price => "price",
        BookSortKey::Title => "title",
        BookSortKey::Quantity => "quantity",
    }
}

fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

pub(in crate::database) struct PgBookInternal;

impl PgBookInternal {
    async fn find_by_id(con: &mut PgConnection, id: &BookId) -> error_stack::Result<Option<Book>, KernelError> {
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT id, title, description, price, quantity, category, owner_id, owner_name, created_at, updated_at
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        let found = row.map(Book::from);
        Ok(found)
    }

    async fn find_with_filters(
        con: &mut PgConnection,
        filter: &BookFilter,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        let mut query = QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE TRUE"));
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            query.push(" AND (title ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR description ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR owner_name ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        if let Some(category) = &filter.category {
            query.push(" AND category = ");
            query.push_bind(category.as_ref());
        }
        if let Some(owner_id) = &filter.owner_id {
            query.push(" AND owner_id = ");
            query.push_bind(owner_id.as_ref());
        }
        if filter.available_only {
            query.push(" AND quantity > 0");
        }
        if let Some(price_min) = filter.price_min {
            query.push(" AND price >= ");
            query.push_bind(price_min);
        }
        if let Some(price_max) = filter.price_max {
            query.push(" AND price <= ");
            query.push_bind(price_max);
        }
        query.push(format!(
            " ORDER BY {} {}",
            sort_column(filter.sort_by),
            sort_direction(filter.sort_order)
        ));
        query.push(" LIMIT ");
        query.push_bind(*filter.limit.as_ref());
        query.push(" OFFSET ");
        query.push_bind(*filter.offset.as_ref());

        let rows = query
            .build_query_as::<BookRow>()
            .fetch_all(con)
            .await
            .convert_error()?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn categories(con: &mut PgConnection) -> error_stack::Result<Vec<BookCategory>, KernelError> {
        let rows = sqlx::query_scalar::<_, String>(
            // language=postgresql
            r#"
            SELECT DISTINCT category
            FROM books
            WHERE category IS NOT NULL
            ORDER BY category
            "#,
        )
        .fetch_all(con)
        .await
        .convert_error()?;
        Ok(rows.into_iter().map(BookCategory::new).collect())
    }

    async fn create(con: &mut PgConnection, book: &Book) -> error_stack::Result<(), KernelError> {
        let created_at: &OffsetDateTime = book.created_at().as_ref();
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO books (id, title, description, price, quantity, category, owner_id, owner_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL)
            "#,
        )
        .bind(book.id().as_ref())
        .bind(book.title().as_ref())
        .bind(book.description().as_ref().map(AsRef::<String>::as_ref))
        .bind(book.price().as_ref())
        .bind(book.quantity().as_ref())
        .bind(book.category().as_ref().map(AsRef::<String>::as_ref))
        .bind(book.owner_id().as_ref())
        .bind(book.owner_name().as_ref())
        .bind(created_at)
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn update(con: &mut PgConnection, book: &Book) -> error_stack::Result<(), KernelError> {
        let updated_at: Option<&OffsetDateTime> =
            book.updated_at().as_ref().map(|at| at.as_ref());
        // language=postgresql
        sqlx::query(
            r#"
            UPDATE books
            SET title = $2, description = $3, price = $4, quantity = $5, category = $6, owner_name = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(book.id().as_ref())
        .bind(book.title().as_ref())
        .bind(book.description().as_ref().map(AsRef::<String>::as_ref))
        .bind(book.price().as_ref())
        .bind(book.quantity().as_ref())
        .bind(book.category().as_ref().map(AsRef::<String>::as_ref))
        .bind(book.owner_name().as_ref())
        .bind(updated_at)
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn delete(con: &mut PgConnection, book_id: &BookId) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        sqlx::query(
            r#"
            DELETE FROM books
            WHERE id = $1
            "#,
        )
        .bind(book_id.as_ref())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn decrease_stock(
        con: &mut PgConnection,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError> {
        // Check and decrement in one statement; this row-level guard is what
        // keeps two buyers from sharing the last copy.
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            UPDATE books
            SET quantity = quantity - $2
            WHERE id = $1 AND quantity >= $2
            RETURNING id, title, description, price, quantity, category, owner_id, owner_name, created_at, updated_at
            "#,
        )
        .bind(book_id.as_ref())
        .bind(amount.as_ref())
        .fetch_optional(&mut *con)
        .await
        .convert_error()?;

        match row {
            Some(row) => {
                tracing::debug!("book {} stock decreased by {}", row.id, amount.as_ref());
                Ok(Book::from(row))
            }
            None => {
                let current = sqlx::query_scalar::<_, i32>(
                    // language=postgresql
                    r#"
                    SELECT quantity
                    FROM books
                    WHERE id = $1
                    "#,
                )
                .bind(book_id.as_ref())
                .fetch_optional(con)
                .await
                .convert_error()?;
                match current {
                    Some(quantity) => Err(Report::new(KernelError::BookNotAvailable)
                        .attach_stock_shortage(quantity, *amount.as_ref())),
                    None => Err(Report::new(KernelError::NotFound)
                        .attach_missing_record("book", *book_id.as_ref())),
                }
            }
        }
    }

    async fn increase_stock(
        con: &mut PgConnection,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError> {
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            UPDATE books
            SET quantity = quantity + $2
            WHERE id = $1
            RETURNING id, title, description, price, quantity, category, owner_id, owner_name, created_at, updated_at
            "#,
        )
        .bind(book_id.as_ref())
        .bind(amount.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;

        match row {
            Some(row) => {
                tracing::debug!("book {} stock increased by {}", row.id, amount.as_ref());
                Ok(Book::from(row))
            }
            None => Err(Report::new(KernelError::NotFound)
                .attach_missing_record("book", *book_id.as_ref())),
        }
    }
}

#[cfg(test)]
mod test {
    use time::OffsetDateTime;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::query::BookQuery;
    use kernel::interface::update::BookModifier;
    use kernel::prelude::entity::{
        Book, BookId, BookPrice, BookQuantity, BookTitle, CreatedAt, OwnerId, OwnerName,
    };
    use kernel::KernelError;
    use rust_decimal_macros::dec;

    use crate::database::postgres::book::PostgresBookRepository;
    use crate::database::postgres::PostgresDatabase;

    fn sample_book(id: &BookId, quantity: i32) -> Book {
        Book::new(
            id.clone(),
            BookTitle::new("test".to_string()),
            None,
            BookPrice::new(dec!(12.50)),
            BookQuantity::new(quantity),
            None,
            OwnerId::new(uuid::Uuid::new_v4()),
            OwnerName::new("owner".to_string()),
            CreatedAt::new(OffsetDateTime::now_utc()),
            None,
        )
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn round_trip() -> Result<(), error_stack::Report<KernelError>> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;
        let id = BookId::new(uuid::Uuid::new_v4());

        let book = sample_book(&id, 4);
        PostgresBookRepository.create(&mut con, &book).await?;

        let found = PostgresBookRepository.find_by_id(&mut con, &id).await?;
        assert_eq!(found, Some(book.clone()));

        let decremented = PostgresBookRepository
            .decrease_stock(&mut con, &id, &BookQuantity::new(3))
            .await?;
        assert_eq!(decremented.quantity(), &BookQuantity::new(1));

        let short = PostgresBookRepository
            .decrease_stock(&mut con, &id, &BookQuantity::new(2))
            .await;
        assert!(matches!(
            short.unwrap_err().current_context(),
            KernelError::BookNotAvailable
        ));

        let restocked = PostgresBookRepository
            .increase_stock(&mut con, &id, &BookQuantity::new(5))
            .await?;
        assert_eq!(restocked.quantity(), &BookQuantity::new(6));

        PostgresBookRepository.delete(&mut con, &id).await?;
        let found = PostgresBookRepository.find_by_id(&mut con, &id).await?;
        assert!(found.is_none());

        con.roll_back().await?;
        Ok(())
    }
}
