use error_stack::Report;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use application::transfer::{
    BulkCompleteDto, CancelPurchaseDto, CompletePurchaseDto, CreatePurchaseDto, GetPurchaseDto,
};
use kernel::interface::query::{PurchaseFilter, PurchaseSortKey, SortOrder};
use kernel::prelude::entity::{BookId, BuyerId, OwnerId, PurchaseStatus, SelectLimit};
use kernel::{KernelError, KernelErrorAttachments};

use crate::controller::{Intake, TryIntake};

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    book_id: Uuid,
    buyer_id: Uuid,
    buyer_name: String,
    buyer_email: String,
    quantity: i32,
    price: Decimal,
    notes: Option<String>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    status: String,
    transaction_id: Option<String>,
}

#[derive(Debug)]
pub struct CancelRequest {
    id: Uuid,
}

impl CancelRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct GetRequest {
    id: Uuid,
}

impl GetRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkCompleteRequest {
    ids: Vec<Uuid>,
}

#[derive(Debug)]
pub struct BuyerStatisticsRequest {
    id: Uuid,
}

impl BuyerStatisticsRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct SellerStatisticsRequest {
    id: Uuid,
}

impl SellerStatisticsRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRequest {
    buyer_id: Option<Uuid>,
    seller_id: Option<Uuid>,
    book_id: Option<Uuid>,
    status: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    date_from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    date_to: Option<OffsetDateTime>,
    price_min: Option<Decimal>,
    price_max: Option<Decimal>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    limit: Option<SelectLimit>,
}

/// The destination of a `PUT /purchases/:id/status` request, resolved
/// against the transition table before any service runs.
#[derive(Debug)]
pub enum StatusChange {
    Complete(CompletePurchaseDto),
    Cancel(CancelPurchaseDto),
}

// Unknown sort fields fall back to the defaults, as does an unparseable
// status filter.
fn sort_key(value: Option<&str>) -> PurchaseSortKey {
    match value {
        Some("completed_at") => PurchaseSortKey::CompletedAt,
        Some("total_price") => PurchaseSortKey::TotalPrice,
        Some("quantity") => PurchaseSortKey::Quantity,
        Some("status") => PurchaseSortKey::Status,
        _ => PurchaseSortKey::CreatedAt,
    }
}

fn sort_order(value: Option<&str>) -> SortOrder {
    match value {
        Some("asc") | Some("ASC") => SortOrder::Asc,
        _ => SortOrder::Desc,
    }
}

pub struct Transformer;

impl Intake<CreateRequest> for Transformer {
    type To = CreatePurchaseDto;
    fn emit(&self, input: CreateRequest) -> Self::To {
        CreatePurchaseDto {
            book_id: input.book_id,
            buyer_id: input.buyer_id,
            buyer_name: input.buyer_name,
            buyer_email: input.buyer_email,
            quantity: input.quantity,
            price: input.price,
            notes: input.notes,
            payment_method: input.payment_method,
            transaction_id: input.transaction_id,
        }
    }
}

impl Intake<(Uuid, CompleteRequest)> for Transformer {
    type To = CompletePurchaseDto;
    fn emit(&self, input: (Uuid, CompleteRequest)) -> Self::To {
        let (id, input) = input;
        CompletePurchaseDto {
            id,
            transaction_id: input.transaction_id,
        }
    }
}

impl TryIntake<(Uuid, UpdateStatusRequest)> for Transformer {
    type To = StatusChange;
    type Error = Report<KernelError>;
    fn emit(&self, input: (Uuid, UpdateStatusRequest)) -> Result<Self::To, Self::Error> {
        let (id, input) = input;
        let status = input.status.parse::<PurchaseStatus>()?;
        match status {
            PurchaseStatus::Completed => Ok(StatusChange::Complete(CompletePurchaseDto {
                id,
                transaction_id: input.transaction_id,
            })),
            PurchaseStatus::Cancelled => Ok(StatusChange::Cancel(CancelPurchaseDto { id })),
            PurchaseStatus::Pending => Err(Report::new(KernelError::Validation)
                .attach_field_violation("status", "purchases cannot be reset to pending")),
        }
    }
}

impl Intake<CancelRequest> for Transformer {
    type To = CancelPurchaseDto;
    fn emit(&self, input: CancelRequest) -> Self::To {
        CancelPurchaseDto { id: input.id }
    }
}

impl Intake<GetRequest> for Transformer {
    type To = GetPurchaseDto;
    fn emit(&self, input: GetRequest) -> Self::To {
        GetPurchaseDto { id: input.id }
    }
}

impl Intake<BulkCompleteRequest> for Transformer {
    type To = BulkCompleteDto;
    fn emit(&self, input: BulkCompleteRequest) -> Self::To {
        BulkCompleteDto { ids: input.ids }
    }
}

impl Intake<BuyerStatisticsRequest> for Transformer {
    type To = Uuid;
    fn emit(&self, input: BuyerStatisticsRequest) -> Self::To {
        input.id
    }
}

impl Intake<SellerStatisticsRequest> for Transformer {
    type To = Uuid;
    fn emit(&self, input: SellerStatisticsRequest) -> Self::To {
        input.id
    }
}

impl Intake<ListRequest> for Transformer {
    type To = PurchaseFilter;
    fn emit(&self, input: ListRequest) -> Self::To {
        PurchaseFilter {
            buyer_id: input.buyer_id.map(BuyerId::new),
            seller_id: input.seller_id.map(OwnerId::new),
            book_id: input.book_id.map(BookId::new),
            status: input
                .status
                .as_deref()
                .and_then(|status| status.parse::<PurchaseStatus>().ok()),
            created_from: input.date_from,
            created_to: input.date_to,
            total_min: input.price_min,
            total_max: input.price_max,
            sort_by: sort_key(input.sort_by.as_deref()),
            sort_order: sort_order(input.sort_order.as_deref()),
            limit: input.limit,
        }
    }
}
