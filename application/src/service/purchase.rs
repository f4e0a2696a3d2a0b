use error_stack::Report;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{
    BookQuery, DependOnBookQuery, DependOnPurchaseQuery, PurchaseFilter, PurchaseQuery,
    PurchaseSortKey, SortOrder,
};
use kernel::interface::update::{
    BookModifier, DependOnBookModifier, DependOnPurchaseModifier, PurchaseModifier,
    PurchaseTransition,
};
use kernel::prelude::entity::{
    BookId, BookQuantity, BuyerEmail, BuyerId, BuyerName, CompletedAt, CreatedAt, OwnerId,
    PaymentMethod, Purchase, PurchaseId, PurchaseNotes, PurchasePrice, PurchaseQuantity,
    PurchaseStatus, SelectLimit, TransactionId,
};
use kernel::{KernelError, KernelErrorAttachments};

use crate::transfer::{
    BulkCompleteDto, BulkCompletionDto, BulkCompletionErrorDto, CancelPurchaseDto,
    CompletePurchaseDto, CreatePurchaseDto, GetPurchaseDto, PurchaseDto,
};

const BUYER_NAME_MAX: usize = 255;
const BUYER_EMAIL_MAX: usize = 255;
const NOTES_MAX: usize = 1000;
const PAYMENT_METHOD_MAX: usize = 50;
const TRANSACTION_ID_MAX: usize = 100;
const QUANTITY_MAX: i32 = 999;

fn price_ceiling() -> Decimal {
    Decimal::new(999_999, 2)
}

fn failure_message(report: &Report<KernelError>) -> String {
    let mut message = report.current_context().to_string();
    for detail in kernel::report_details(report) {
        message.push_str(": ");
        message.push_str(&detail);
    }
    message
}

/// Allowed absolute deviation between the proposed and the current unit
/// price: 1% of the current price, computed in decimal arithmetic.
fn price_tolerance(current: Decimal) -> Decimal {
    current * Decimal::new(1, 2)
}

fn within_price_tolerance(current: Decimal, proposed: Decimal) -> bool {
    (current - proposed).abs() <= price_tolerance(current)
}

fn validate_create(dto: &CreatePurchaseDto) -> error_stack::Result<(), KernelError> {
    if dto.quantity <= 0 {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("quantity", "must be positive"));
    }
    if dto.quantity > QUANTITY_MAX {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("quantity", format!("must not exceed {QUANTITY_MAX}")));
    }
    if dto.price <= Decimal::ZERO {
        return Err(
            Report::new(KernelError::Validation).attach_field_violation("price", "must be positive")
        );
    }
    if dto.price > price_ceiling() {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("price", format!("must not exceed {}", price_ceiling())));
    }
    if dto.buyer_name.trim().is_empty() {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("buyer_name", "must not be empty"));
    }
    if dto.buyer_name.len() > BUYER_NAME_MAX {
        return Err(Report::new(KernelError::Validation).attach_field_violation(
            "buyer_name",
            format!("must not exceed {BUYER_NAME_MAX} characters"),
        ));
    }
    if dto.buyer_email.trim().is_empty() || !dto.buyer_email.contains('@') {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("buyer_email", "must be a valid email address"));
    }
    if dto.buyer_email.len() > BUYER_EMAIL_MAX {
        return Err(Report::new(KernelError::Validation).attach_field_violation(
            "buyer_email",
            format!("must not exceed {BUYER_EMAIL_MAX} characters"),
        ));
    }
    if dto.notes.as_ref().is_some_and(|notes| notes.len() > NOTES_MAX) {
        return Err(Report::new(KernelError::Validation)
            .attach_field_violation("notes", format!("must not exceed {NOTES_MAX} characters")));
    }
    if dto
        .payment_method
        .as_ref()
        .is_some_and(|method| method.len() > PAYMENT_METHOD_MAX)
    {
        return Err(Report::new(KernelError::Validation).attach_field_violation(
            "payment_method",
            format!("must not exceed {PAYMENT_METHOD_MAX} characters"),
        ));
    }
    if dto
        .transaction_id
        .as_ref()
        .is_some_and(|id| id.len() > TRANSACTION_ID_MAX)
    {
        return Err(Report::new(KernelError::Validation).attach_field_violation(
            "transaction_id",
            format!("must not exceed {TRANSACTION_ID_MAX} characters"),
        ));
    }
    Ok(())
}

#[async_trait::async_trait]
pub trait CreatePurchaseService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnBookQuery<Connection>
    + DependOnBookModifier<Connection>
    + DependOnPurchaseModifier<Connection>
{
    /// Creates a purchase order in `Pending` and takes its quantity out of
    /// stock as one unit: the ledger insert and the decrement commit
    /// together or not at all. The conditional decrement, not the preceding
    /// read, decides whether stock suffices.
    async fn create_purchase(
        &self,
        dto: CreatePurchaseDto,
    ) -> error_stack::Result<PurchaseDto, KernelError> {
        validate_create(&dto)?;

        let mut connection = self.database_connection().transact().await?;

        let book_id = BookId::new(dto.book_id);
        let book = self
            .book_query()
            .find_by_id(&mut connection, &book_id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_missing_record("book", dto.book_id)
            })?;

        let current = *book.price().as_ref();
        if !within_price_tolerance(current, dto.price) {
            return Err(Report::new(KernelError::PriceMismatch)
                .attach_price_deviation(current, dto.price));
        }

        let available = *book.quantity().as_ref();
        if available < dto.quantity {
            return Err(Report::new(KernelError::BookNotAvailable)
                .attach_stock_shortage(available, dto.quantity));
        }

        // The read above can go stale under concurrent buyers; the store
        // re-checks inside the decrement and its verdict is final.
        if let Err(report) = self
            .book_modifier()
            .decrease_stock(&mut connection, &book_id, &BookQuantity::new(dto.quantity))
            .await
        {
            connection.roll_back().await?;
            return Err(report);
        }

        let purchase = Purchase::new(
            PurchaseId::new(Uuid::new_v4()),
            book_id,
            BuyerId::new(dto.buyer_id),
            BuyerName::new(dto.buyer_name),
            BuyerEmail::new(dto.buyer_email),
            PurchaseQuantity::new(dto.quantity),
            PurchasePrice::new(dto.price),
            PurchaseStatus::Pending,
            dto.notes.map(PurchaseNotes::new),
            dto.payment_method.map(PaymentMethod::new),
            dto.transaction_id.map(TransactionId::new),
            CreatedAt::new(OffsetDateTime::now_utc()),
            None,
        );
        if let Err(report) = self
            .purchase_modifier()
            .create(&mut connection, &purchase)
            .await
        {
            connection.roll_back().await?;
            return Err(report);
        }

        connection.commit().await?;

        Ok(PurchaseDto::from(purchase))
    }
}

impl<Connection: Transaction + Send, T> CreatePurchaseService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnBookQuery<Connection>
        + DependOnBookModifier<Connection>
        + DependOnPurchaseModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait CompletePurchaseService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnPurchaseQuery<Connection>
    + DependOnPurchaseModifier<Connection>
{
    async fn complete_purchase(
        &self,
        dto: CompletePurchaseDto,
    ) -> error_stack::Result<PurchaseDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let id = PurchaseId::new(dto.id);
        let purchase = self
            .purchase_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_missing_record("purchase", dto.id)
            })?;

        let current = *purchase.status();
        if !current.can_transition_to(PurchaseStatus::Completed) {
            return Err(Report::new(KernelError::InvalidState)
                .attach_status_conflict(current, PurchaseStatus::Completed)
                .attach_printable("only pending purchases can be completed"));
        }

        let transition = PurchaseTransition::new(
            PurchaseStatus::Completed,
            Some(CompletedAt::new(OffsetDateTime::now_utc())),
            dto.transaction_id.map(TransactionId::new),
        );
        let completed = self
            .purchase_modifier()
            .transition(&mut connection, &id, &transition)
            .await?;
        connection.commit().await?;

        Ok(PurchaseDto::from(completed))
    }
}

impl<Connection: Transaction + Send, T> CompletePurchaseService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnPurchaseQuery<Connection>
        + DependOnPurchaseModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait CancelPurchaseService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnPurchaseQuery<Connection>
    + DependOnPurchaseModifier<Connection>
{
    /// Cancels a pending purchase. Stock is not returned here; restocking is
    /// a separate, explicit catalog operation.
    async fn cancel_purchase(
        &self,
        dto: CancelPurchaseDto,
    ) -> error_stack::Result<PurchaseDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let id = PurchaseId::new(dto.id);
        let purchase = self
            .purchase_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_missing_record("purchase", dto.id)
            })?;

        let current = *purchase.status();
        if !current.can_transition_to(PurchaseStatus::Cancelled) {
            return Err(Report::new(KernelError::InvalidState)
                .attach_status_conflict(current, PurchaseStatus::Cancelled)
                .attach_printable("only pending purchases can be cancelled"));
        }

        let transition = PurchaseTransition::new(PurchaseStatus::Cancelled, None, None);
        let cancelled = self
            .purchase_modifier()
            .transition(&mut connection, &id, &transition)
            .await?;
        connection.commit().await?;

        Ok(PurchaseDto::from(cancelled))
    }
}

impl<Connection: Transaction + Send, T> CancelPurchaseService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnPurchaseQuery<Connection>
        + DependOnPurchaseModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait BulkCompletePurchaseService<Connection: Transaction + Send>:
    CompletePurchaseService<Connection>
{
    /// Completes each id independently; one bad order never aborts the
    /// batch. Every id lands either in `completed` or in `errors`.
    async fn bulk_complete_purchases(
        &self,
        dto: BulkCompleteDto,
    ) -> error_stack::Result<BulkCompletionDto, KernelError> {
        let mut completed = Vec::new();
        let mut errors = Vec::new();

        for id in dto.ids {
            let request = CompletePurchaseDto {
                id,
                transaction_id: None,
            };
            match self.complete_purchase(request).await {
                Ok(purchase) => completed.push(purchase),
                Err(report) => errors.push(BulkCompletionErrorDto {
                    id,
                    message: failure_message(&report),
                }),
            }
        }

        Ok(BulkCompletionDto { completed, errors })
    }
}

impl<Connection: Transaction + Send, T> BulkCompletePurchaseService<Connection> for T where
    T: CompletePurchaseService<Connection>
{
}

#[async_trait::async_trait]
pub trait GetPurchaseService<Connection: Transaction + Send>:
    'static + Sync + Send + DependOnDatabaseConnection<Connection> + DependOnPurchaseQuery<Connection>
{
    async fn get_purchase(
        &self,
        dto: GetPurchaseDto,
    ) -> error_stack::Result<PurchaseDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let id = PurchaseId::new(dto.id);
        let purchase = self
            .purchase_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_missing_record("purchase", dto.id)
            })?;

        Ok(PurchaseDto::from(purchase))
    }

    async fn purchases_by_buyer(
        &self,
        buyer_id: Uuid,
    ) -> error_stack::Result<Vec<PurchaseDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let purchases = self
            .purchase_query()
            .find_by_buyer(&mut connection, &BuyerId::new(buyer_id))
            .await?;

        Ok(purchases.into_iter().map(PurchaseDto::from).collect())
    }

    async fn purchases_by_seller(
        &self,
        seller_id: Uuid,
    ) -> error_stack::Result<Vec<PurchaseDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let purchases = self
            .purchase_query()
            .find_by_seller(&mut connection, &OwnerId::new(seller_id))
            .await?;

        Ok(purchases.into_iter().map(PurchaseDto::from).collect())
    }

    async fn purchases_by_book(
        &self,
        book_id: Uuid,
    ) -> error_stack::Result<Vec<PurchaseDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let purchases = self
            .purchase_query()
            .find_by_book(&mut connection, &BookId::new(book_id))
            .await?;

        Ok(purchases.into_iter().map(PurchaseDto::from).collect())
    }

    async fn purchases_by_status(
        &self,
        status: PurchaseStatus,
    ) -> error_stack::Result<Vec<PurchaseDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let purchases = self
            .purchase_query()
            .find_by_status(&mut connection, &status)
            .await?;

        Ok(purchases.into_iter().map(PurchaseDto::from).collect())
    }

    async fn purchases_with_filters(
        &self,
        filter: PurchaseFilter,
    ) -> error_stack::Result<Vec<PurchaseDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let purchases = self
            .purchase_query()
            .find_with_filters(&mut connection, &filter)
            .await?;

        Ok(purchases.into_iter().map(PurchaseDto::from).collect())
    }

    /// Oldest-first queue of orders still waiting on completion.
    async fn pending_purchases(&self) -> error_stack::Result<Vec<PurchaseDto>, KernelError> {
        let filter = PurchaseFilter {
            status: Some(PurchaseStatus::Pending),
            sort_by: PurchaseSortKey::CreatedAt,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        self.purchases_with_filters(filter).await
    }

    async fn recent_purchases(
        &self,
        limit: i32,
    ) -> error_stack::Result<Vec<PurchaseDto>, KernelError> {
        let filter = PurchaseFilter {
            status: Some(PurchaseStatus::Completed),
            sort_by: PurchaseSortKey::CompletedAt,
            sort_order: SortOrder::Desc,
            limit: Some(SelectLimit::new(limit)),
            ..Default::default()
        };
        self.purchases_with_filters(filter).await
    }
}

impl<Connection: Transaction + Send, T> GetPurchaseService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnPurchaseQuery<Connection>
{
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use kernel::KernelError;

    use crate::service::purchase::{validate_create, within_price_tolerance};
    use crate::transfer::CreatePurchaseDto;

    fn create_dto() -> CreatePurchaseDto {
        CreatePurchaseDto {
            book_id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            buyer_name: "Ada".to_string(),
            buyer_email: "ada@example.com".to_string(),
            quantity: 1,
            price: dec!(20.00),
            notes: None,
            payment_method: None,
            transaction_id: None,
        }
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        // 1% of 100.00 is exactly 1.00
        assert!(within_price_tolerance(dec!(100.00), dec!(101.00)));
        assert!(within_price_tolerance(dec!(100.00), dec!(99.00)));
        assert!(!within_price_tolerance(dec!(100.00), dec!(101.01)));
        assert!(!within_price_tolerance(dec!(100.00), dec!(98.99)));
    }

    #[test]
    fn tolerance_uses_exact_decimals() {
        // 0.1 + 0.2 style cases must not flake at the boundary
        assert!(within_price_tolerance(dec!(0.30), dec!(0.303)));
        assert!(!within_price_tolerance(dec!(0.30), dec!(0.3031)));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        for quantity in [0, -2] {
            let dto = CreatePurchaseDto {
                quantity,
                ..create_dto()
            };
            let report = validate_create(&dto).unwrap_err();
            assert!(matches!(report.current_context(), KernelError::Validation));
        }
    }

    #[test]
    fn rejects_malformed_buyer_email() {
        for email in ["", "   ", "not-an-email"] {
            let dto = CreatePurchaseDto {
                buyer_email: email.to_string(),
                ..create_dto()
            };
            assert!(validate_create(&dto).is_err());
        }
    }

    #[test]
    fn accepts_optional_fields_within_bounds() {
        let dto = CreatePurchaseDto {
            notes: Some("leave at the door".to_string()),
            payment_method: Some("card".to_string()),
            transaction_id: Some("tx-1".to_string()),
            ..create_dto()
        };
        assert!(validate_create(&dto).is_ok());

        let dto = CreatePurchaseDto {
            payment_method: Some("x".repeat(51)),
            ..create_dto()
        };
        assert!(validate_create(&dto).is_err());
    }
}
