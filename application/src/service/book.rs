use error_stack::Report;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{BookFilter, BookQuery, DependOnBookQuery};
use kernel::interface::query::{DependOnPurchaseQuery, PurchaseQuery};
use kernel::interface::update::{BookModifier, DependOnBookModifier};
use kernel::prelude::entity::{
    Book, BookCategory, BookDescription, BookId, BookPrice, BookQuantity, BookTitle, CreatedAt,
    OwnerId, OwnerName, UpdatedAt,
};
use kernel::{KernelError, KernelErrorAttachments};

use crate::transfer::{
    BookDto, CreateBookDto, DeleteBookDto, GetBookDto, RestockBookDto, UpdateBookDto,
};

const TITLE_MAX: usize = 255;
const DESCRIPTION_MAX: usize = 1000;
const CATEGORY_MAX: usize = 100;
const OWNER_NAME_MAX: usize = 255;
const QUANTITY_MAX: i32 = 999;

fn price_ceiling() -> Decimal {
    // NUMERIC(10, 2) listing cap: 9999.99
    Decimal::new(999_999, 2)
}

fn validate_title(title: &str) -> error_stack::Result<(), KernelError> {
    if title.trim().is_empty() {
        return Err(
            Report::new(KernelError::Validation).attach_field_violation("title", "must not be empty")
        );
    }
    if title.len() > TITLE_MAX {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("title", format!("must not exceed {TITLE_MAX} characters")));
    }
    Ok(())
}

fn validate_description(description: &str) -> error_stack::Result<(), KernelError> {
    if description.len() > DESCRIPTION_MAX {
        return Err(Report::new(KernelError::Validation).attach_field_violation(
            "description",
            format!("must not exceed {DESCRIPTION_MAX} characters"),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> error_stack::Result<(), KernelError> {
    if price <= Decimal::ZERO {
        return Err(
            Report::new(KernelError::Validation).attach_field_violation("price", "must be positive")
        );
    }
    if price > price_ceiling() {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("price", format!("must not exceed {}", price_ceiling())));
    }
    Ok(())
}

fn validate_quantity(quantity: i32) -> error_stack::Result<(), KernelError> {
    if quantity < 0 {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("quantity", "must not be negative"));
    }
    if quantity > QUANTITY_MAX {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("quantity", format!("must not exceed {QUANTITY_MAX}")));
    }
    Ok(())
}

fn validate_category(category: &str) -> error_stack::Result<(), KernelError> {
    if category.len() > CATEGORY_MAX {
        return Err(Report::new(KernelError::Validation).attach_field_violation(
            "category",
            format!("must not exceed {CATEGORY_MAX} characters"),
        ));
    }
    Ok(())
}

fn validate_owner_name(owner_name: &str) -> error_stack::Result<(), KernelError> {
    if owner_name.trim().is_empty() {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("owner_name", "must not be empty"));
    }
    if owner_name.len() > OWNER_NAME_MAX {
        return Err(Report::new(KernelError::Validation).attach_field_violation(
            "owner_name",
            format!("must not exceed {OWNER_NAME_MAX} characters"),
        ));
    }
    Ok(())
}

fn validate_create(dto: &CreateBookDto) -> error_stack::Result<(), KernelError> {
    validate_title(&dto.title)?;
    if let Some(description) = &dto.description {
        validate_description(description)?;
    }
    validate_price(dto.price)?;
    validate_quantity(dto.quantity)?;
    if let Some(category) = &dto.category {
        validate_category(category)?;
    }
    validate_owner_name(&dto.owner_name)?;
    Ok(())
}

fn validate_update(dto: &UpdateBookDto) -> error_stack::Result<(), KernelError> {
    if let Some(title) = &dto.title {
        validate_title(title)?;
    }
    if let Some(description) = &dto.description {
        validate_description(description)?;
    }
    if let Some(price) = dto.price {
        validate_price(price)?;
    }
    if let Some(quantity) = dto.quantity {
        validate_quantity(quantity)?;
    }
    if let Some(category) = &dto.category {
        validate_category(category)?;
    }
    if let Some(owner_name) = &dto.owner_name {
        validate_owner_name(owner_name)?;
    }
    Ok(())
}

#[async_trait::async_trait]
pub trait GetBookService<Connection: Transaction + Send>:
    'static + Sync + Send + DependOnDatabaseConnection<Connection> + DependOnBookQuery<Connection>
{
    async fn get_book(&self, dto: GetBookDto) -> error_stack::Result<BookDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let id = BookId::new(dto.id);
        let book = self
            .book_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_missing_record("book", dto.id)
            })?;

        Ok(BookDto::from(book))
    }
}

impl<Connection: Transaction + Send, T> GetBookService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnBookQuery<Connection>
{
}

#[async_trait::async_trait]
pub trait SearchBookService<Connection: Transaction + Send>:
    'static + Sync + Send + DependOnDatabaseConnection<Connection> + DependOnBookQuery<Connection>
{
    async fn search_books(
        &self,
        filter: BookFilter,
    ) -> error_stack::Result<Vec<BookDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let books = self
            .book_query()
            .find_with_filters(&mut connection, &filter)
            .await?;

        Ok(books.into_iter().map(BookDto::from).collect())
    }

    async fn book_categories(&self) -> error_stack::Result<Vec<String>, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let categories = self.book_query().categories(&mut connection).await?;

        Ok(categories.into_iter().map(Into::into).collect())
    }
}

impl<Connection: Transaction + Send, T> SearchBookService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnBookQuery<Connection>
{
}

#[async_trait::async_trait]
pub trait CreateBookService<Connection: Transaction + Send>:
    'static + Sync + Send + DependOnDatabaseConnection<Connection> + DependOnBookModifier<Connection>
{
    async fn create_book(&self, dto: CreateBookDto) -> error_stack::Result<BookDto, KernelError> {
        validate_create(&dto)?;

        let mut connection = self.database_connection().transact().await?;

        let book = Book::new(
            BookId::new(Uuid::new_v4()),
            BookTitle::new(dto.title),
            dto.description.map(BookDescription::new),
            BookPrice::new(dto.price),
            BookQuantity::new(dto.quantity),
            dto.category.map(BookCategory::new),
            OwnerId::new(dto.owner_id),
            OwnerName::new(dto.owner_name),
            CreatedAt::new(OffsetDateTime::now_utc()),
            None,
        );
        self.book_modifier().create(&mut connection, &book).await?;
        connection.commit().await?;

        Ok(BookDto::from(book))
    }
}

impl<Connection: Transaction + Send, T> CreateBookService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnBookModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait UpdateBookService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnBookQuery<Connection>
    + DependOnBookModifier<Connection>
{
    async fn update_book(&self, dto: UpdateBookDto) -> error_stack::Result<BookDto, KernelError> {
        validate_update(&dto)?;

        let mut connection = self.database_connection().transact().await?;

        let id = BookId::new(dto.id);
        let mut book = self
            .book_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_missing_record("book", dto.id)
            })?;

        book.substitute(|b| {
            if let Some(title) = dto.title {
                *b.title = BookTitle::new(title);
            }
            if let Some(description) = dto.description {
                *b.description = Some(BookDescription::new(description));
            }
            if let Some(price) = dto.price {
                *b.price = BookPrice::new(price);
            }
            if let Some(quantity) = dto.quantity {
                *b.quantity = BookQuantity::new(quantity);
            }
            if let Some(category) = dto.category {
                *b.category = Some(BookCategory::new(category));
            }
            if let Some(owner_name) = dto.owner_name {
                *b.owner_name = OwnerName::new(owner_name);
            }
            *b.updated_at = Some(UpdatedAt::new(OffsetDateTime::now_utc()));
        });

        self.book_modifier().update(&mut connection, &book).await?;
        connection.commit().await?;

        Ok(BookDto::from(book))
    }
}

impl<Connection: Transaction + Send, T> UpdateBookService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnBookQuery<Connection>
        + DependOnBookModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait DeleteBookService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnBookQuery<Connection>
    + DependOnPurchaseQuery<Connection>
    + DependOnBookModifier<Connection>
{
    /// Removal is refused while any purchase references the book; the ledger
    /// keeps its history.
    async fn delete_book(&self, dto: DeleteBookDto) -> error_stack::Result<(), KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let id = BookId::new(dto.id);
        self.book_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_missing_record("book", dto.id)
            })?;

        let history = self
            .purchase_query()
            .find_by_book(&mut connection, &id)
            .await?;
        if !history.is_empty() {
            return Err(Report::new(KernelError::InvalidState).attach_printable(format!(
                "book `{}` has {} purchase record(s) and cannot be deleted",
                dto.id,
                history.len()
            )));
        }

        self.book_modifier().delete(&mut connection, &id).await?;
        connection.commit().await?;

        Ok(())
    }
}

impl<Connection: Transaction + Send, T> DeleteBookService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnBookQuery<Connection>
        + DependOnPurchaseQuery<Connection>
        + DependOnBookModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait RestockBookService<Connection: Transaction + Send>:
    'static + Sync + Send + DependOnDatabaseConnection<Connection> + DependOnBookModifier<Connection>
{
    /// Manual restock. Cancelled orders do not return stock on their own;
    /// this is the explicit path back into inventory. The catalog ceiling is
    /// not re-checked here.
    async fn restock_book(&self, dto: RestockBookDto) -> error_stack::Result<BookDto, KernelError> {
        if dto.amount <= 0 {
            return Err(Report::new(KernelError::Validation)
                .attach_field_violation("amount", "must be positive"));
        }

        let mut connection = self.database_connection().transact().await?;

        let id = BookId::new(dto.id);
        let book = self
            .book_modifier()
            .increase_stock(&mut connection, &id, &BookQuantity::new(dto.amount))
            .await?;
        connection.commit().await?;

        Ok(BookDto::from(book))
    }
}

impl<Connection: Transaction + Send, T> RestockBookService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnBookModifier<Connection>
{
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use kernel::KernelError;

    use crate::service::book::{validate_create, validate_update};
    use crate::transfer::{CreateBookDto, UpdateBookDto};

    fn create_dto() -> CreateBookDto {
        CreateBookDto {
            title: "The Art of Computer Programming".to_string(),
            description: None,
            price: dec!(120.00),
            quantity: 3,
            category: Some("science".to_string()),
            owner_id: Uuid::new_v4(),
            owner_name: "Addison".to_string(),
        }
    }

    #[test]
    fn accepts_valid_listing() {
        assert!(validate_create(&create_dto()).is_ok());
    }

    #[test]
    fn rejects_empty_title() {
        let dto = CreateBookDto {
            title: "   ".to_string(),
            ..create_dto()
        };
        let report = validate_create(&dto).unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Validation));
    }

    #[test]
    fn rejects_price_out_of_range() {
        for price in [dec!(0.00), dec!(-1.00), dec!(10000.00)] {
            let dto = CreateBookDto {
                price,
                ..create_dto()
            };
            assert!(validate_create(&dto).is_err());
        }
        let dto = CreateBookDto {
            price: dec!(9999.99),
            ..create_dto()
        };
        assert!(validate_create(&dto).is_ok());
    }

    #[test]
    fn rejects_quantity_out_of_range() {
        for quantity in [-1, 1000] {
            let dto = CreateBookDto {
                quantity,
                ..create_dto()
            };
            assert!(validate_create(&dto).is_err());
        }
        for quantity in [0, 999] {
            let dto = CreateBookDto {
                quantity,
                ..create_dto()
            };
            assert!(validate_create(&dto).is_ok());
        }
    }

    #[test]
    fn rejects_oversized_patch_fields() {
        let dto = UpdateBookDto {
            id: Uuid::new_v4(),
            title: Some("x".repeat(256)),
            description: None,
            price: None,
            quantity: None,
            category: None,
            owner_name: None,
        };
        assert!(validate_update(&dto).is_err());

        let dto = UpdateBookDto {
            id: Uuid::new_v4(),
            title: None,
            description: Some("x".repeat(1001)),
            price: None,
            quantity: None,
            category: None,
            owner_name: None,
        };
        assert!(validate_update(&dto).is_err());
    }
}
